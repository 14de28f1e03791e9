/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str, // one-line description
    pub long: &'static str,  // full explanation for `brief explain`
}

/// All stable error codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRF-L001",
        short: "unterminated string",
        long: r#"## BRF-L001: unterminated string

A string literal was opened with `"` but never closed.

**Example:**

    "hello print

**Fix:**

    "hello" print
"#,
    },
    ErrorEntry {
        code: "BRF-L002",
        short: "unknown escape in string",
        long: r#"## BRF-L002: unknown escape in string

Inside a string, a backslash must be followed by one of
`n`, `t`, `r`, `0`, `\` or `"`.

**Example that triggers this:**

    "C:\temp\x"

**Fix:** double the backslash to get a literal one: `"C:\\temp\\x"`.
"#,
    },
    ErrorEntry {
        code: "BRF-L003",
        short: "unexpected character",
        long: r#"## BRF-L003: unexpected character

The reader met text it cannot turn into a token. Words may contain
anything except whitespace, brackets, `"` and `#`.
"#,
    },
    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRF-P001",
        short: "unclosed '['",
        long: r#"## BRF-P001: unclosed '['

A quotation was opened with `[` and the source ended before the
matching `]`. The label points at the opening bracket.

**Example:**

    [dup * 'sq define

**Fix:**

    [dup *] 'sq define
"#,
    },
    ErrorEntry {
        code: "BRF-P002",
        short: "']' without a matching '['",
        long: r#"## BRF-P002: ']' without a matching '['

A closing bracket appeared with no quotation open. Usually a stray
`]` or one `[` too few.
"#,
    },
    ErrorEntry {
        code: "BRF-P003",
        short: "brackets nested too deeply",
        long: r#"## BRF-P003: brackets nested too deeply

Quotations may nest at most 510 levels deep. Deeper programs could
not be saved as an image, so the reader refuses them. The label points
at the first bracket past the limit.

**Fix:** flatten the program by naming inner quotations with `define`.
"#,
    },
    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRF-R001",
        short: "unknown word",
        long: r#"## BRF-R001: unknown word

A symbol was executed but no frame of the current dictionary binds it.
The machine stops with the symbol still at the head of the
continuation and the stack untouched.

**Example:**

    3 square

**Fix:** define the word before using it:

    [dup *] 'square define
    3 square
"#,
    },
    ErrorEntry {
        code: "BRF-R002",
        short: "stack underflow",
        long: r#"## BRF-R002: stack underflow

A primitive needed more values than the stack held.

**Example:**

    1 +

`+` takes two numbers. Push both before calling it.
"#,
    },
    ErrorEntry {
        code: "BRF-R003",
        short: "type mismatch",
        long: r#"## BRF-R003: type mismatch

A primitive received a value of the wrong type, for example a string
where a number was expected, or a number where `if` wanted a quotation.

**Example:**

    1 "a" +
"#,
    },
    ErrorEntry {
        code: "BRF-R004",
        short: "malformed scope",
        long: r#"## BRF-R004: malformed scope

The machine tried to leave the outermost dictionary frame. This only
happens when a continuation was edited by hand (for example through
`set-continuation` or a doctored image) so that scope markers no
longer pair up.
"#,
    },
    ErrorEntry {
        code: "BRF-R005",
        short: "invalid argument",
        long: r#"## BRF-R005: invalid argument

A primitive got a value of the right type but outside its domain:
an index past the end of a list, `first` of an empty list, a missing
map key, or a number that is not a character code.
"#,
    },
    ErrorEntry {
        code: "BRF-R006",
        short: "host error",
        long: r#"## BRF-R006: host error

A host primitive such as `read-file`, `write-file` or `print` failed
in the operating system. The message carries the underlying error.
"#,
    },
    // ── Images ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BRF-I001",
        short: "unknown primitive in image",
        long: r#"## BRF-I001: unknown primitive in image

Images store primitives by name only. This image names a primitive
that the loading program does not register. Load it with the same
primitive set it was saved with. Nothing is loaded.
"#,
    },
    ErrorEntry {
        code: "BRF-I002",
        short: "invalid image",
        long: r#"## BRF-I002: invalid image

The bytes are not a machine image: truncated data, an unknown tag,
trailing bytes, nesting too deep, or a root map that does not hold
exactly `stack`, `continuation` and `dictionary`. Nothing is loaded.
"#,
    },
    ErrorEntry {
        code: "BRF-I003",
        short: "cannot read or write image file",
        long: r#"## BRF-I003: cannot read or write image file

The image file could not be opened, read or written. Check the path
and permissions.
"#,
    },
];

/// Look up an error entry by code (e.g. `"BRF-R001"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
