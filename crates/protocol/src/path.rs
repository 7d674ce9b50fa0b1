//! Signal path validation.
//!
//! A signal path is a dotted identifier such as
//! `Signal.Emulator.telemetry.lat`. A segment may be `*` to subscribe to
//! every signal under a branch.

/// Reasons a signal path is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty signal path")]
    Empty,

    #[error("empty segment in signal path {0:?}")]
    EmptySegment(String),

    #[error("invalid character {ch:?} in signal path {path:?}")]
    InvalidChar { path: String, ch: char },
}

/// Checks that `path` is a well-formed signal path.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        if segment == "*" {
            continue;
        }
        if let Some(ch) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(PathError::InvalidChar {
                path: path.to_string(),
                ch,
            });
        }
    }

    Ok(())
}

/// Whether the path contains a wildcard segment.
pub fn is_wildcard(path: &str) -> bool {
    path.split('.').any(|s| s == "*")
}
