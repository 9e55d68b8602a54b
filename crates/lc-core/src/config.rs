//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and then
//! overlaid with environment variables (see [`Config::apply_env`]). Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Default upstream chunk size, one MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load a config file strictly: a missing or unparsable file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Recognized keys: `HOST`, `PORT`, `BASE_URL`, `LINKCAST_UPSTREAM_ROOT`,
    /// `LINKCAST_CHUNK_SIZE`. Values that fail to parse are logged and
    /// skipped.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(e) => tracing::warn!("Ignoring PORT={port:?}: {e}"),
            }
        }
        if let Some(base) = lookup("BASE_URL").filter(|b| !b.is_empty()) {
            self.server.base_url = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(root) = lookup("LINKCAST_UPSTREAM_ROOT").filter(|r| !r.is_empty()) {
            self.upstream.root = PathBuf::from(root);
        }
        if let Some(size) = lookup("LINKCAST_CHUNK_SIZE") {
            match size.trim().parse() {
                Ok(s) => self.upstream.chunk_size = s,
                Err(e) => tracing::warn!("Ignoring LINKCAST_CHUNK_SIZE={size:?}: {e}"),
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !(self.server.base_url.starts_with("http://")
            || self.server.base_url.starts_with("https://"))
        {
            warnings.push(format!(
                "server.base_url '{}' has no http(s) scheme; share links will not be clickable",
                self.server.base_url
            ));
        }

        if self.upstream.chunk_size == 0 {
            warnings.push(format!(
                "upstream.chunk_size is 0; {DEFAULT_CHUNK_SIZE} will be used"
            ));
        }

        if self.upstream.backend == UpstreamBackend::Local && !self.upstream.root.exists() {
            warnings.push(format!(
                "upstream.root {} does not exist",
                self.upstream.root.display()
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL, used only for human-facing share links.
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            base_url: "http://localhost:8080".into(),
        }
    }
}

/// Which upstream repository implementation to serve from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamBackend {
    /// Directory tree on local disk.
    #[default]
    Local,
    /// Process-local in-memory store (starts empty).
    Memory,
}

/// Upstream repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub backend: UpstreamBackend,
    /// Root directory of the local repository.
    pub root: PathBuf,
    /// Size of the chunks the upstream yields.
    pub chunk_size: usize,
}

impl UpstreamConfig {
    /// Chunk size with the zero case replaced by the default.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            backend: UpstreamBackend::Local,
            root: PathBuf::from("./media"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.base_url, "http://localhost:8080");
        assert_eq!(cfg.upstream.backend, UpstreamBackend::Local);
        assert_eq!(cfg.upstream.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "upstream": {"backend": "memory"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.upstream.backend, UpstreamBackend::Memory);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkcast.json");
        std::fs::write(&path, r#"{"upstream": {"chunk_size": 4096}}"#).unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.upstream.chunk_size, 4096);
    }

    #[test]
    fn env_overlay() {
        let mut cfg = Config::default();
        cfg.apply_vars(vars(&[
            ("PORT", "9000"),
            ("BASE_URL", "https://cast.example.com/"),
            ("LINKCAST_UPSTREAM_ROOT", "/srv/media"),
            ("LINKCAST_CHUNK_SIZE", "65536"),
        ]));
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.base_url, "https://cast.example.com");
        assert_eq!(cfg.upstream.root, PathBuf::from("/srv/media"));
        assert_eq!(cfg.upstream.chunk_size, 65536);
        assert_eq!(cfg.server.host, "0.0.0.0");
    }

    #[test]
    fn env_overlay_skips_bad_values() {
        let mut cfg = Config::default();
        cfg.apply_vars(vars(&[("PORT", "eighty"), ("LINKCAST_CHUNK_SIZE", "-1")]));
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.upstream.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        cfg.server.base_url = "cast.example.com".into();
        cfg.upstream.chunk_size = 0;
        cfg.upstream.root = PathBuf::from("/nonexistent/linkcast-root");
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("server.port")));
        assert!(warnings.iter().any(|w| w.contains("base_url")));
        assert!(warnings.iter().any(|w| w.contains("chunk_size")));
        assert!(warnings.iter().any(|w| w.contains("upstream.root")));
        assert_eq!(cfg.upstream.effective_chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn memory_backend_skips_root_check() {
        let mut cfg = Config::default();
        cfg.upstream.backend = UpstreamBackend::Memory;
        cfg.upstream.root = PathBuf::from("/nonexistent/linkcast-root");
        assert!(cfg.validate().is_empty());
    }
}
