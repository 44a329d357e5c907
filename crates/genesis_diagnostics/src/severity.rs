//! Diagnostic severity levels ordered from least to most severe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic.
///
/// `Error` means the problem was recovered from locally and the surrounding
/// construct is still in the tree. `Fatal` means a whole construct was
/// abandoned (or tokenizing stopped) and output is missing as a result.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A suggestion that doesn't indicate a problem.
    Help,
    /// Additional context.
    Note,
    /// Accepted input that probably isn't what was meant.
    Warning,
    /// A recovered problem.
    Error,
    /// An unrecovered problem; some input was dropped.
    Fatal,
}

impl Severity {
    /// Returns `true` for [`Severity::Error`] and [`Severity::Fatal`].
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Help => write!(f, "help"),
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(Severity::Help < Severity::Note);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn is_error() {
        assert!(Severity::Fatal.is_error());
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
    }

    #[test]
    fn display_and_serde_agree() {
        for sev in [Severity::Warning, Severity::Error, Severity::Fatal] {
            let json = serde_json::to_string(&sev).unwrap();
            assert_eq!(json, format!("\"{sev}\""));
        }
    }
}
