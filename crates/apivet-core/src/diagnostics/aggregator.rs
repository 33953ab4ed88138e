//! Merging structural and style diagnostics into one ordered set

use super::fingerprint::{Fingerprint, FingerprintPolicy};
use super::{Diagnostic, DiagnosticOrigin, Severity, Verdict};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Per-severity counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub hint: usize,
}

impl Summary {
    fn count(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
            Severity::Hint => self.hint += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
            Severity::Hint => self.hint,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info + self.hint
    }
}

/// Diagnostics of one top-level document section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticGroup {
    pub section: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticGroup {
    /// Severity of the most severe entry
    pub fn worst(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).min()
    }
}

/// Deduplicated, ordered diagnostics of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSet {
    groups: Vec<DiagnosticGroup>,
    summary: Summary,
}

impl DiagnosticSet {
    pub fn groups(&self) -> &[DiagnosticGroup] {
        &self.groups
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// All diagnostics in report order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.groups.iter().flat_map(|group| group.diagnostics.iter())
    }

    pub fn len(&self) -> usize {
        self.summary.total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_errors(&self) -> bool {
        self.summary.error > 0
    }

    /// `Pass` iff there is no error entry
    pub fn verdict(&self) -> Verdict {
        if self.has_errors() {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }

    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.iter().cloned().collect()
    }

    /// Set the source line of every entry from `locate`
    pub fn locate_lines<F>(&mut self, mut locate: F)
    where
        F: FnMut(&Diagnostic) -> Option<usize>,
    {
        for diagnostic in self.groups.iter_mut().flat_map(|group| group.diagnostics.iter_mut()) {
            diagnostic.line = locate(diagnostic);
        }
    }
}

struct Candidate {
    diagnostic: Diagnostic,
    index: usize,
}

impl Candidate {
    /// Lower wins a fingerprint collision
    fn precedence(&self) -> (Severity, DiagnosticOrigin, usize) {
        (self.diagnostic.severity, self.diagnostic.origin, self.index)
    }
}

/// Normalizes, deduplicates and orders diagnostics
#[derive(Debug, Clone, Default)]
pub struct DiagnosticAggregator {
    policy: FingerprintPolicy,
}

impl DiagnosticAggregator {
    pub fn new(policy: FingerprintPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FingerprintPolicy {
        &self.policy
    }

    /// Merge both producers' output into one [`DiagnosticSet`]
    ///
    /// Of fingerprint-equal entries the most severe survives rather than the
    /// first seen, so the result does not depend on input order.
    pub fn aggregate(&self, structural: Vec<Diagnostic>, style: Vec<Diagnostic>) -> DiagnosticSet {
        let mut survivors: Vec<Candidate> = Vec::new();
        let mut slots: HashMap<Fingerprint, usize> = HashMap::new();
        let mut dropped = 0usize;

        for (index, diagnostic) in structural.into_iter().chain(style).enumerate() {
            let candidate = Candidate { diagnostic, index };
            let fingerprint = self.policy.fingerprint(&candidate.diagnostic);
            match slots.get(&fingerprint) {
                Some(&slot) => {
                    dropped += 1;
                    if candidate.precedence() < survivors[slot].precedence() {
                        survivors[slot] = candidate;
                    }
                }
                None => {
                    slots.insert(fingerprint, survivors.len());
                    survivors.push(candidate);
                }
            }
        }
        if dropped > 0 {
            debug!(dropped, "merged duplicate diagnostics");
        }

        let mut sections: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        for candidate in survivors {
            sections
                .entry(candidate.diagnostic.section())
                .or_default()
                .push(candidate);
        }

        let mut summary = Summary::default();
        let mut groups: Vec<DiagnosticGroup> = sections
            .into_iter()
            .map(|(section, mut candidates)| {
                candidates.sort_by(|a, b| {
                    let (a_diag, b_diag) = (&a.diagnostic, &b.diagnostic);
                    a_diag
                        .severity
                        .cmp(&b_diag.severity)
                        .then_with(|| a_diag.path.cmp(&b_diag.path))
                        .then_with(|| a_diag.code.cmp(&b_diag.code))
                        .then_with(|| a_diag.message.cmp(&b_diag.message))
                        .then_with(|| a_diag.document.cmp(&b_diag.document))
                        .then_with(|| a_diag.origin.cmp(&b_diag.origin))
                        .then_with(|| a.index.cmp(&b.index))
                });
                let diagnostics: Vec<Diagnostic> = candidates
                    .into_iter()
                    .map(|candidate| {
                        summary.count(candidate.diagnostic.severity);
                        candidate.diagnostic
                    })
                    .collect();
                DiagnosticGroup {
                    section,
                    diagnostics,
                }
            })
            .collect();

        groups.sort_by(|a, b| a.worst().cmp(&b.worst()).then_with(|| a.section.cmp(&b.section)));

        DiagnosticSet { groups, summary }
    }
}
