//! Ambient parser configuration: whitelisted remote-backend hosts, the
//! default-filename erasure list, and the symlink-loop ancestor-walk depth.
//! Loadable from a TOML file the same way the teacher workspace loads its
//! own project-level `.toml` config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Hosts an entry may point at even when it isn't the directory's own
    /// host (Google-Drive, Blitzfiles, IPFS gateways by default).
    pub whitelisted_backend_hosts: Vec<String>,
    /// Default index filenames erased before comparing two local paths.
    pub default_filenames: Vec<String>,
    /// How many ancestor levels the sanitizer's symlink/loop check walks.
    pub symlink_ancestor_depth: usize,
    /// Whether the sanitizer enforces parent-scope containment by default.
    pub check_parents: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            whitelisted_backend_hosts: crate::remote_gate::WHITELISTED_BACKEND_HOSTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_filenames: vec!["index.php".to_string(), "index.shtml".to_string(), "DirectoryList.asp".to_string()],
            symlink_ancestor_depth: 8,
            check_parents: true,
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn is_whitelisted_host(&self, host: &str) -> bool {
        self.whitelisted_backend_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_depth() {
        let cfg = ParserConfig::default();
        assert_eq!(cfg.symlink_ancestor_depth, 8);
        assert!(cfg.check_parents);
    }

    #[test]
    fn loads_partial_overrides_from_toml() {
        let cfg = ParserConfig::from_toml_str("symlink_ancestor_depth = 3\n").unwrap();
        assert_eq!(cfg.symlink_ancestor_depth, 3);
        assert!(cfg.is_whitelisted_host("drive.google.com"));
    }
}
