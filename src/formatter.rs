//! External formatter collaborator.
//!
//! Extracted bodies are piped through `clang-format` before they land in the
//! companion file. The call is blocking, never retried, and its output fully
//! replaces the input.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to run {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    Failed {
        binary: String,
        status: String,
        stderr: String,
    },

    #[error("{binary} produced no output")]
    EmptyOutput { binary: String },
}

/// Anything that can reformat a chunk of C++ source.
pub trait Reformat {
    fn reformat(&self, source: &str) -> Result<String, FormatError>;
}

/// Pipes text through a `clang-format` child process.
pub struct ClangFormat {
    binary: PathBuf,
}

impl ClangFormat {
    /// Use `clang-format` from PATH, or the binary named by the
    /// `CLANG_FORMAT` environment variable.
    pub fn new() -> Self {
        let binary = std::env::var_os("CLANG_FORMAT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("clang-format"));
        Self { binary }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ClangFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Reformat for ClangFormat {
    fn reformat(&self, source: &str) -> Result<String, FormatError> {
        let name = self.binary.display().to_string();
        let launch = |source: std::io::Error| FormatError::Launch {
            binary: name.clone(),
            source,
        };

        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(launch)?;

        if let Some(mut stdin) = child.stdin.take() {
            // Dropping stdin at the end of the scope signals EOF.
            stdin.write_all(source.as_bytes()).map_err(launch)?;
        }

        let output = child.wait_with_output().map_err(launch)?;
        if !output.status.success() {
            return Err(FormatError::Failed {
                binary: name,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let formatted = String::from_utf8_lossy(&output.stdout).into_owned();
        if formatted.is_empty() {
            return Err(FormatError::EmptyOutput { binary: name });
        }

        debug!(
            "formatted {} bytes into {} with {}",
            source.len(),
            formatted.len(),
            name
        );
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipes_through_the_external_binary() {
        // `cat` stands in for clang-format: same plumbing, identity output.
        let formatter = ClangFormat::with_binary("cat");
        assert_eq!(formatter.reformat("int x;\n").unwrap(), "int x;\n");
    }

    #[test]
    fn missing_binary_is_a_launch_error() {
        let formatter = ClangFormat::with_binary("no-such-formatter-binary");
        assert!(matches!(
            formatter.reformat("int x;\n"),
            Err(FormatError::Launch { .. })
        ));
    }

    #[test]
    fn empty_output_is_rejected() {
        let formatter = ClangFormat::with_binary("cat");
        assert!(matches!(
            formatter.reformat(""),
            Err(FormatError::EmptyOutput { .. })
        ));
    }
}
