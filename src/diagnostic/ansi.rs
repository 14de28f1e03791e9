use super::{Diagnostic, Severity};
use crate::source::SourceMap;

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, codes: &str, s: &str) -> String {
        if self.use_color { format!("\x1b[{codes}m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    fn bold_red(&self, s: &str) -> String {
        self.paint("1;31", s)
    }

    fn bold_yellow(&self, s: &str) -> String {
        self.paint("1;33", s)
    }

    fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[BRF-R001]: message"
        let severity = match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let heading = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        let heading = match d.severity {
            Severity::Error => self.bold_red(&heading),
            Severity::Warning => self.bold_yellow(&heading),
        };
        out.push_str(&format!("{}: {}\n", heading, self.bold(&d.message)));

        let primary = d.labels.iter().find(|l| l.is_primary);
        if let (Some(label), Some(source)) = (primary, &d.source) {
            let map = SourceMap::new(source);
            let (line, col) = map.lookup(label.span.start);
            let line_text = map.line_text(source, line);

            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));

            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);

            out.push_str(&format!("{pad} {pipe}\n"));
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

            let indent = " ".repeat(col.saturating_sub(1));
            let span_len = label.span.end.saturating_sub(label.span.start).max(1);
            let carets = self.bold_red(&"^".repeat(span_len));
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                out.push_str(&format!(
                    "{pad} {pipe} {indent}{carets} {}\n",
                    self.bold_red(&label.message)
                ));
            }
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    const SOURCE: &str = "[dup *] 'sq define\n3 sq frobnicate";

    fn make_diag(start: usize, end: usize) -> Diagnostic {
        Diagnostic::error("unknown word: frobnicate")
            .with_code("BRF-R001")
            .with_span(Span { start, end }, "here")
            .with_source(SOURCE)
            .with_note("stack depth 1")
            .with_suggestion("define it first")
    }

    #[test]
    fn render_heading_carries_code() {
        let out = AnsiRenderer { use_color: false }.render(&make_diag(24, 34));
        assert!(out.starts_with("error[BRF-R001]: unknown word: frobnicate"), "got:\n{out}");
    }

    #[test]
    fn render_points_at_second_line() {
        let out = AnsiRenderer { use_color: false }.render(&make_diag(24, 34));
        assert!(out.contains("--> 2:6"), "missing location in:\n{out}");
        assert!(out.contains("3 sq frobnicate"), "missing source line in:\n{out}");
        assert!(out.contains(&format!("{}{} here", " ".repeat(5), "^".repeat(10))), "got:\n{out}");
    }

    #[test]
    fn render_contains_note_and_suggestion() {
        let out = AnsiRenderer { use_color: false }.render(&make_diag(24, 34));
        assert!(out.contains("note: stack depth 1"), "missing note in:\n{out}");
        assert!(out.contains("suggestion: define it first"), "missing suggestion in:\n{out}");
    }

    #[test]
    fn render_without_source_has_no_snippet() {
        let out = AnsiRenderer { use_color: false }.render(&Diagnostic::error("something bad"));
        assert_eq!(out, "error: something bad\n");
    }

    #[test]
    fn color_toggles_escape_codes() {
        let d = make_diag(0, 1);
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b["));
        assert!(!AnsiRenderer { use_color: false }.render(&d).contains("\x1b["));
    }

    #[test]
    fn warnings_are_labelled() {
        let out = AnsiRenderer { use_color: false }.render(&Diagnostic::warning("careful"));
        assert!(out.starts_with("warning: careful"));
    }
}
