//! Data directory layout for Citebase.

use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "CITEBASE_HOME";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `CITEBASE_HOME` environment variable
/// 2. `~/.citebase`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".citebase");
    }

    // Last resort: current directory
    PathBuf::from(".citebase")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is the only one touching CITEBASE_HOME and restores it immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-citebase");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-citebase"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }

    #[test]
    fn test_default_data_dir_is_dot_citebase() {
        if std::env::var_os(DATA_DIR_ENV).is_some() {
            return;
        }
        assert!(resolve_data_dir().ends_with(".citebase"));
    }
}
