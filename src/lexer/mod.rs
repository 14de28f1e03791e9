use logos::Logos;

use crate::source::Span;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"#[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token("[")]
    Open,
    #[token("]")]
    Close,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    Text(String),

    // Anything else up to whitespace, a bracket, a quote or a comment.
    // Numbers are told apart from symbols by the parser.
    #[regex(r##"[^ \t\r\n\f\[\]"#]+"##, |lex| lex.slice().to_string())]
    Word(String),
}

/// Strips the quotes and resolves escapes. `None` on an unknown escape.
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            _ => return None,
        });
    }
    Some(out)
}

/// Lex source into tokens with their spans.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, Span::from(lexer.span()))),
            Err(()) => {
                let span = lexer.span();
                let snippet = source[span.clone()].to_string();
                let (code, suggestion) = suggest_fix(&snippet);
                return Err(LexError {
                    code,
                    position: span.start,
                    span: Span::from(span),
                    snippet,
                    suggestion,
                });
            }
        }
    }

    Ok(tokens)
}

/// Error code and a suggested fix for the offending text.
fn suggest_fix(bad: &str) -> (&'static str, String) {
    if is_closed_string(bad) {
        ("BRF-L002", "Supported escapes are \\n \\t \\r \\0 \\\\ and \\\".".to_string())
    } else if bad.starts_with('"') {
        ("BRF-L001", "Close the string with a matching '\"'.".to_string())
    } else {
        ("BRF-L003", format!("Unexpected character(s): '{bad}'."))
    }
}

fn is_closed_string(text: &str) -> bool {
    let Some(body) = text.strip_prefix('"') else {
        return false;
    };
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return true,
            _ => {}
        }
    }
    false
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lex error at byte {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub snippet: String,
    pub suggestion: String,
}
