//! Diagnostics boundary
//!
//! The host that delivers save events also knows the document's
//! diagnostics; the engine only asks for the worst severity on a path.
//! Headless hosts wire `NoDiagnostics`.

use async_trait::async_trait;
use savepoint_foundation::ValidationLevel;
use std::path::Path;

/// Severity of a diagnostic reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Hint,
    Info,
    Warning,
    Error,
}

/// Source of per-document diagnostics
#[async_trait]
pub trait DiagnosticsProvider: Send + Sync {
    /// Worst diagnostic currently attached to `path`, if any
    async fn max_severity(&self, path: &Path) -> Option<DiagnosticSeverity>;
}

/// Host with no diagnostics: every document is clean
pub struct NoDiagnostics;

#[async_trait]
impl DiagnosticsProvider for NoDiagnostics {
    async fn max_severity(&self, _path: &Path) -> Option<DiagnosticSeverity> {
        None
    }
}

/// Whether a save passes the configured validation gate
pub fn passes_validation(level: ValidationLevel, worst: Option<DiagnosticSeverity>) -> bool {
    let Some(worst) = worst else {
        return true;
    };
    match level {
        ValidationLevel::None => true,
        ValidationLevel::Error => worst < DiagnosticSeverity::Error,
        ValidationLevel::Warning => worst < DiagnosticSeverity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_gate() {
        use DiagnosticSeverity::*;

        assert!(passes_validation(ValidationLevel::Error, None));
        assert!(passes_validation(ValidationLevel::Error, Some(Warning)));
        assert!(!passes_validation(ValidationLevel::Error, Some(Error)));

        assert!(passes_validation(ValidationLevel::Warning, Some(Info)));
        assert!(!passes_validation(ValidationLevel::Warning, Some(Warning)));
        assert!(!passes_validation(ValidationLevel::Warning, Some(Error)));

        assert!(passes_validation(ValidationLevel::None, Some(Error)));
    }
}
