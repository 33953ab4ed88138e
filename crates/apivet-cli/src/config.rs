//! Configuration file discovery and loading
//!
//! Looks for the configuration in this order:
//! - the `--config` argument or `APIVET_CONFIG`
//! - `.apivet.yaml`, `.apivet.yml`, `.apivet.json` in the current directory
//! - `config.yaml`, `config.yml`, `config.json` in the user config directory
//!
//! The file's contents are resolved by [`ConfigResolver`], which never fails:
//! problems come back as notices and the affected settings keep defaults.

use crate::error::{Error, Result};
use apivet_core::{builtin_catalog, ConfigNotice, ConfigResolver, ConfigError, ResolvedConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File names checked in the working directory
const PROJECT_FILES: [&str; 3] = [".apivet.yaml", ".apivet.yml", ".apivet.json"];
/// File names checked in the user config directory
const USER_FILES: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

/// A resolved configuration and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub resolved: ResolvedConfig,
}

impl LoadedConfig {
    /// Notices worth showing to the user
    pub fn warnings(&self) -> Vec<&ConfigNotice> {
        self.resolved.warnings().collect()
    }
}

/// A resolver over the built-in rule catalog
pub fn resolver() -> ConfigResolver {
    ConfigResolver::new(builtin_catalog())
}

/// Load the configuration
///
/// With `default_mode` no file is read. An explicit path that does not exist
/// is a usage error; everything else degrades to defaults.
pub fn load(explicit: Option<&Path>, default_mode: bool) -> Result<LoadedConfig> {
    let resolver = resolver();
    if default_mode {
        debug!("default mode, configuration files ignored");
        return Ok(LoadedConfig {
            path: None,
            resolved: resolver.resolve_defaults(),
        });
    }

    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Some(path) => Some(path.to_path_buf()),
        None => discover(Path::new("."), dirs::config_dir().as_deref()),
    };

    let Some(path) = path else {
        return Ok(LoadedConfig {
            path: None,
            resolved: resolver.resolve(None),
        });
    };

    info!(path = %path.display(), "loading configuration");
    let resolved = match std::fs::read_to_string(&path) {
        Ok(text) if is_json(&path) => match serde_json::from_str(&text) {
            Ok(value) => resolver.resolve_value(value),
            Err(e) => unparsable(&resolver, e.to_string()),
        },
        Ok(text) => resolver.resolve_text(&text),
        Err(e) => unparsable(&resolver, format!("cannot read {}: {}", path.display(), e)),
    };

    Ok(LoadedConfig {
        path: Some(path),
        resolved,
    })
}

/// First existing configuration file under `project_dir`, then `user_dir/apivet`
pub fn discover(project_dir: &Path, user_dir: Option<&Path>) -> Option<PathBuf> {
    let project = PROJECT_FILES.iter().map(|name| project_dir.join(name));
    let user = user_dir
        .map(|dir| dir.join("apivet"))
        .into_iter()
        .flat_map(|dir| USER_FILES.iter().map(move |name| dir.join(name)));
    project.chain(user).find(|path| path.is_file())
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

fn unparsable(resolver: &ConfigResolver, reason: String) -> ResolvedConfig {
    let mut resolved = resolver.resolve_defaults();
    resolved
        .notices
        .push(ConfigNotice::Unparsable(ConfigError::Parse { reason }));
    resolved
}
