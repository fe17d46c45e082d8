//! Transient operation feedback published alongside state changes.

use serde::{Deserialize, Serialize};

/// Severity of an [`OperationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The requested change was fully applied.
    Success,
    /// Nothing changed, but nothing went wrong either (e.g. duplicate add).
    Info,
    /// Part of the requested change was applied.
    Warning,
    /// The requested change was not applied.
    Error,
}

/// Outcome notification for a state-changing operation.
///
/// This is a toast, not persisted state: it auto-expires after a fixed
/// display duration and never blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub severity: Severity,
    pub message: String,
}

impl OperationResult {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Whether this result reports a fully or partially applied change.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self.severity, Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ok() {
        assert!(OperationResult::new(Severity::Success, "added").is_ok());
        assert!(OperationResult::new(Severity::Warning, "partial").is_ok());
        assert!(OperationResult::new(Severity::Info, "no-op").is_ok());
        assert!(!OperationResult::new(Severity::Error, "failed").is_ok());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            r#""warning""#
        );
    }
}
