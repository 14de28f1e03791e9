pub mod ansi;
pub mod json;
pub mod registry;

use crate::image::ImageError;
use crate::interpreter::{Fault, RuntimeError};
use crate::lexer::LexError;
use crate::parser::{ParseError, ReadError};
use crate::source::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, ..Diagnostic::error(message) }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for error types ----

impl From<&LexError> for Diagnostic {
    fn from(e: &LexError) -> Self {
        let span = Span { start: e.span.start, end: e.span.end.max(e.span.start + 1) };
        Diagnostic::error(format!("cannot read '{}'", e.snippet))
            .with_code(e.code)
            .with_span(span, "here")
            .with_suggestion(e.suggestion.clone())
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_span(e.span, "here")
    }
}

impl From<&ReadError> for Diagnostic {
    fn from(e: &ReadError) -> Self {
        match e {
            ReadError::Lex(e) => e.into(),
            ReadError::Parse(e) => e.into(),
        }
    }
}

pub fn runtime_code(e: &RuntimeError) -> &'static str {
    match e {
        RuntimeError::UnknownWord { .. } => "BRF-R001",
        RuntimeError::StackUnderflow { .. } => "BRF-R002",
        RuntimeError::TypeMismatch { .. } => "BRF-R003",
        RuntimeError::MalformedScope => "BRF-R004",
        RuntimeError::InvalidArgument { .. } => "BRF-R005",
        RuntimeError::Host { .. } => "BRF-R006",
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(runtime_code(e));
        match e {
            RuntimeError::UnknownWord { name } => {
                d.with_suggestion(format!("define it first, e.g. `[ ... ] '{name} define`"))
            }
            _ => d,
        }
    }
}

/// Runtime faults carry no span; the notes describe the machine instead.
impl From<&Fault> for Diagnostic {
    fn from(f: &Fault) -> Self {
        let m = &f.machine;
        let mut d = Diagnostic::from(&f.error);
        if let Some(head) = m.head() {
            d = d.with_note(format!("while executing `{head}`"));
        }
        d.with_note(format!("stack depth {}, scope depth {}", m.stack().len(), m.scope().depth()))
            .with_note(format!("{} unit(s) pending", m.continuation().len()))
    }
}

impl From<&ImageError> for Diagnostic {
    fn from(e: &ImageError) -> Self {
        let d = Diagnostic::error(e.to_string());
        match e {
            ImageError::UnknownPrimitive { .. } => d
                .with_code("BRF-I001")
                .with_suggestion("load the image with the same primitives it was saved with"),
            ImageError::InvalidImage { .. } => d.with_code("BRF-I002"),
            ImageError::Io(_) => d.with_code("BRF-I003"),
        }
    }
}
