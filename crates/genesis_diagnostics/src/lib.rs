//! Diagnostic creation, severity management, and terminal rendering.
//!
//! Every problem found in user input becomes a structured [`Diagnostic`]
//! rather than an `Err`. Producers push them into a [`DiagnosticSink`];
//! callers (CLI, editor integration) render them with a
//! [`DiagnosticRenderer`] without re-deriving any context.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
