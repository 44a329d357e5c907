//! Rendering diagnostics for humans.

use crate::diagnostic::Diagnostic;
use crate::label::Label;
use genesis_source::{SourceDb, SourceFile};

/// Formats a diagnostic into a string.
pub trait DiagnosticRenderer {
    /// Renders one diagnostic.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;

    /// Renders a batch, separated by blank lines.
    fn render_all(&self, diags: &[Diagnostic], source_db: &SourceDb) -> String {
        diags
            .iter()
            .map(|d| self.render(d, source_db))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders diagnostics in a rustc-like terminal format:
///
/// ```text
/// error[E101]: expected function name, found '{'
///   --> app.gen:3:10
///    |
///  3 | function { invalid syntax here }
///    |          ^ expected identifier
///    = note: while parsing function (in program)
/// ```
pub struct TerminalRenderer {
    /// Maximum width of the echoed source line before it is truncated.
    pub width: u16,
}

impl TerminalRenderer {
    /// Creates a renderer that truncates source lines at `width` characters.
    pub fn new(width: u16) -> Self {
        Self { width }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(100)
    }
}

impl TerminalRenderer {
    /// Echoes the labeled source line and underlines the label's span.
    fn snippet(&self, out: &mut String, file: &SourceFile, label: &Label, gutter: usize) {
        let line = label.position.line;
        let text: String = file.line_text(line).chars().take(self.width as usize).collect();
        let width = (label.span.len().max(1) as usize).min(self.width as usize);
        let marks = label.style.underline().to_string().repeat(width);
        let indent = " ".repeat((label.position.column as usize).saturating_sub(1));
        let pad = " ".repeat(gutter);
        let message = if label.message.is_empty() {
            String::new()
        } else {
            format!(" {}", label.message)
        };
        out.push_str(&format!("{line:>gutter$} | {text}\n"));
        out.push_str(&format!("{pad} | {indent}{marks}{message}\n"));
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = format!("{}[{}]: {}\n", diag.severity, diag.code, diag.message);

        let line = diag.line();
        let col = diag.column();
        let file = if diag.primary_span.is_dummy() {
            None
        } else {
            source_db.file(diag.primary_span.file)
        };

        match file {
            Some(file) => {
                out.push_str(&format!("  --> {}:{line}:{col}\n", file.path.display()));
                let message = diag
                    .labels
                    .iter()
                    .find(|l| l.is_primary())
                    .map(|l| l.message.as_str())
                    .unwrap_or_default();
                let mut labels = vec![Label::primary(diag.primary_span, diag.position, message)];
                labels.extend(
                    diag.labels
                        .iter()
                        .filter(|l| !l.is_primary() && l.span.file == diag.primary_span.file)
                        .cloned(),
                );
                labels.sort_by_key(|l| l.position.line);
                let gutter = labels
                    .iter()
                    .map(|l| l.position.line.to_string().len())
                    .max()
                    .unwrap_or(1);

                out.push_str(&format!("{} |\n", " ".repeat(gutter)));
                for label in &labels {
                    self.snippet(&mut out, file, label, gutter);
                }
            }
            None => out.push_str(&format!("  --> {line}:{col}\n")),
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}
