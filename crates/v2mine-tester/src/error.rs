use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop a whole run. Anything that only concerns one
/// configuration is reported through [`crate::TestOutcome`] instead.
#[derive(Debug, Error)]
pub enum TesterError {
    #[error(
        "tester executable '{name}' not found (searched: {}); place a pre-built \
         binary in one of these directories and make it executable",
        display_dirs(.searched)
    )]
    ExecutableNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Invalid pass pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, TesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_every_directory() {
        let err = TesterError::ExecutableNotFound {
            name: "v2ray-tester".to_string(),
            searched: vec![PathBuf::from("vendor"), PathBuf::from("bin")],
        };
        let message = err.to_string();
        assert!(message.contains("'v2ray-tester'"));
        assert!(message.contains("vendor, bin"));
        assert!(message.contains("place a pre-built binary"));
    }
}
