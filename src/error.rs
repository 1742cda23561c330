//! Error taxonomy for a single command run
//!
//! "Nothing to do" is not an error: an empty diff or an empty file set
//! travels as [`crate::resolve::Resolution::NoChanges`] and exits 0.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Every variant ends the process with a non-zero exit code.
#[derive(Debug, Error)]
pub enum RewerError {
    /// Missing or malformed command-line input.
    #[error("{0}")]
    Usage(String),

    /// A required credential is absent from the environment.
    #[error("{var} environment variable is not set.")]
    MissingCredential { var: &'static str },

    /// A file named on the command line does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A version-control or filesystem query failed.
    #[error("{0:#}")]
    Resolution(#[from] anyhow::Error),

    /// The model call failed (transport error or non-2xx response).
    #[error("{0}")]
    Remote(String),

    /// Writing the rendered output failed.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl RewerError {
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Extra guidance printed under the error line, when there is any.
    pub fn remediation(&self) -> Option<String> {
        match self {
            RewerError::MissingCredential { var } => {
                Some(format!("Set it with: export {}=sk-ant-...", var))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_path() {
        let err = RewerError::NotFound(PathBuf::from("/tmp/missing.rs"));
        assert_eq!(err.to_string(), "File not found: /tmp/missing.rs");
    }

    #[test]
    fn test_missing_credential_has_remediation() {
        let err = RewerError::MissingCredential {
            var: "ANTHROPIC_API_KEY",
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
        assert!(err.remediation().unwrap().contains("export ANTHROPIC_API_KEY"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_resolution_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("revspec 'main' not found").context("Failed to diff against main");
        let err = RewerError::from(inner);
        let text = err.to_string();
        assert!(text.contains("Failed to diff against main"));
        assert!(text.contains("revspec 'main' not found"));
    }
}
