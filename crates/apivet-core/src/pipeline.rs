//! The validation pipeline
//!
//! load → prefetch externals → resolve (stop on cycles) → structural and
//! style checks side by side → aggregate.
//!
//! A [`ValidationPipeline`] holds configuration and collaborators only. Each
//! run builds its own document cache and resolver, so one pipeline can
//! validate any number of documents without state leaking between them.

use crate::config::ValidationConfig;
use crate::diagnostics::{DiagnosticAggregator, DiagnosticSet, Verdict};
use crate::error::{PipelineError, PipelineResult};
use crate::fetch::{prefetch, DefaultSource, ExternalSource};
use crate::structural;
use crate::style::{LintInput, RuleEngine, StyleLintAdapter};
use apivet_schemas::{
    CircularReferenceReport, Document, DocumentLoader, DocumentSet, LineIndex, ReferenceResolver,
    Resolution, StructuralValidator,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of one completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Resolution succeeded and both validators ran
    Completed {
        diagnostics: DiagnosticSet,
        verdict: Verdict,
    },
    /// Reference cycles stopped the run before validation
    Circular(CircularReferenceReport),
}

impl RunOutcome {
    /// `None` when the run stopped on cycles
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            RunOutcome::Completed { verdict, .. } => Some(*verdict),
            RunOutcome::Circular(_) => None,
        }
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticSet> {
        match self {
            RunOutcome::Completed { diagnostics, .. } => Some(diagnostics),
            RunOutcome::Circular(_) => None,
        }
    }

    pub fn circular(&self) -> Option<&CircularReferenceReport> {
        match self {
            RunOutcome::Circular(report) => Some(report),
            RunOutcome::Completed { .. } => None,
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, RunOutcome::Circular(_))
    }
}

/// Validates documents under one configuration
pub struct ValidationPipeline {
    config: Arc<ValidationConfig>,
    structural: StructuralValidator,
    style: StyleLintAdapter,
    aggregator: DiagnosticAggregator,
    source: Arc<dyn ExternalSource>,
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("config", &self.config)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl ValidationPipeline {
    /// Compile the meta-schemas and wire the collaborators
    pub fn new(config: ValidationConfig, engine: Arc<dyn RuleEngine>) -> PipelineResult<Self> {
        let aggregator = DiagnosticAggregator::new(config.fingerprint.clone());
        Ok(Self {
            config: Arc::new(config),
            structural: StructuralValidator::new()?,
            style: StyleLintAdapter::new(engine),
            aggregator,
            source: Arc::new(DefaultSource::new()),
        })
    }

    /// Replace where external documents are fetched from
    pub fn with_source(mut self, source: Arc<dyn ExternalSource>) -> Self {
        self.source = source;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate an already parsed document
    #[instrument(skip_all, fields(document = %document.display_location()))]
    pub async fn run(&self, document: Document) -> PipelineResult<RunOutcome> {
        let mut set = DocumentSet::new(document);
        let fetched = prefetch(&mut set, Arc::clone(&self.source)).await?;
        if fetched > 0 {
            debug!(fetched, "external documents loaded");
        }

        let resolved = match ReferenceResolver::new().resolve_set(&set)? {
            Resolution::Resolved(resolved) => resolved,
            Resolution::Circular(report) => {
                warn!(chains = report.len(), "circular references found");
                return Ok(RunOutcome::Circular(report));
            }
        };

        let raw = set.root();
        let config = self.config.as_ref();
        let structural_task = async { structural::check_detected(&self.structural, resolved.document()) };
        let style_task = async {
            let input = LintInput {
                raw,
                resolved: resolved.document(),
            };
            self.style.check(&input, config)
        };
        let (structural, style) = tokio::join!(structural_task, style_task);
        debug!(structural = structural.len(), style = style.len(), "validators finished");

        let mut diagnostics = self.aggregator.aggregate(structural, style);
        locate_lines(&mut diagnostics, &set);
        let verdict = diagnostics.verdict();
        info!(%verdict, total = diagnostics.len(), "validation finished");
        Ok(RunOutcome::Completed {
            diagnostics,
            verdict,
        })
    }

    /// Load a file and validate it
    pub async fn run_file(&self, path: &Path) -> PipelineResult<RunOutcome> {
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || DocumentLoader::new().load_file(&owned))
            .await
            .map_err(PipelineError::from)??;
        self.run(document).await
    }

    /// Validate several files in order
    ///
    /// A failure is recorded against its file and never stops the others.
    pub async fn run_many(&self, paths: &[PathBuf]) -> Vec<(PathBuf, PipelineResult<RunOutcome>)> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = self.run_file(path).await;
            if let Err(err) = &outcome {
                warn!(path = %path.display(), error = %err, "document could not be validated");
            }
            outcomes.push((path.clone(), outcome));
        }
        outcomes
    }
}

/// Attach the line each diagnostic's node is written on, for documents
/// parsed from text
fn locate_lines(diagnostics: &mut DiagnosticSet, set: &DocumentSet) {
    let mut indexes: HashMap<Option<String>, Option<LineIndex>> = HashMap::new();
    diagnostics.locate_lines(|diagnostic| {
        indexes
            .entry(diagnostic.document.clone())
            .or_insert_with(|| {
                set.by_origin(diagnostic.document.as_deref())
                    .and_then(Document::source_text)
                    .map(LineIndex::new)
            })
            .as_ref()
            .and_then(|index| index.line_of(&diagnostic.path))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::style::{builtin_catalog, BuiltinEngine};
    use serde_json::json;

    fn pipeline() -> ValidationPipeline {
        let config = ConfigResolver::new(builtin_catalog()).defaults();
        ValidationPipeline::new(config, Arc::new(BuiltinEngine::new())).unwrap()
    }

    #[tokio::test]
    async fn test_clean_document_passes() {
        let document = Document::from_value(
            &json!({
                "openapi": "3.0.3",
                "info": {"title": "Pets", "version": "1.0.0", "contact": {"name": "API team"}},
                "paths": {"/pets": {"get": {"operationId": "listPets", "responses": {"200": {"description": "ok"}}}}}
            }),
            None,
        );
        let outcome = pipeline().run(document).await.unwrap();
        assert_eq!(outcome.verdict(), Some(Verdict::Pass));
        assert!(outcome.diagnostics().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_target_is_an_input_error() {
        let document = Document::from_value(
            &json!({"openapi": "3.0.3", "info": {"$ref": "#/components/missing"}}),
            None,
        );
        let err = pipeline().run(document).await.unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_diagnostics_carry_source_lines() {
        let text = "\
openapi: 3.0.3
info:
  title: Pets
  version: '1'
paths:
  /pets/:
    get:
      responses:
        '200':
          description: ok
";
        let document = DocumentLoader::new()
            .parse_str(text, apivet_schemas::Format::Yaml, None)
            .unwrap();
        let outcome = pipeline().run(document).await.unwrap();
        let diagnostics = outcome.diagnostics().unwrap();

        let line_of = |code: &str| diagnostics.iter().find(|d| d.code == code).and_then(|d| d.line);
        assert_eq!(line_of("info-contact"), Some(2));
        assert_eq!(line_of("path-keys-no-trailing-slash"), Some(6));
        assert_eq!(line_of("operation-operationId"), Some(7));

        let parsed_from_value = Document::from_value(&json!({"openapi": "3.0.3", "paths": {}}), None);
        let outcome = pipeline().run(parsed_from_value).await.unwrap();
        assert!(outcome.diagnostics().unwrap().iter().all(|d| d.line.is_none()));
    }

    #[tokio::test]
    async fn test_run_many_continues_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        std::fs::write(
            &good,
            "openapi: 3.0.3\ninfo:\n  title: t\n  version: '1'\n  contact: {}\npaths: {}\n",
        )
        .unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "[1, 2]").unwrap();

        let outcomes = pipeline()
            .run_many(&[broken.clone(), dir.path().join("absent.yaml"), good.clone()])
            .await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_err());
        assert!(outcomes[1].1.is_err());
        assert_eq!(outcomes[2].1.as_ref().unwrap().verdict(), Some(Verdict::Pass));
    }
}
