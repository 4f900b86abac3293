//! Shared scanner for quoted tokens and comments.
//!
//! Several passes must ignore the content of string literals, quoted
//! identifiers, and comments: template tag expansion, debug parameter
//! substitution, named-to-positional conversion, and the MSSQL national
//! string prefix pass. They all run off the same alternation so a token
//! recognized as quoted by one pass is quoted for all of them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Alternation matching one quoted token or comment:
/// `'…'` (with `''`), `"…"` (with `""`), `` `…` `` (with ` `` `),
/// `[…]` (with `]]`), `--`/`#` line comments, `/* … */` block comments.
pub(crate) const QUOTED_TOKEN: &str = r#"'(?:[^']+|'')*'|"(?:[^"]+|"")*"|`(?:[^`]+|``)*`|\[(?:[^\]]+|\]\])*\]|(?:--|\#)[^\n]*|/\*[^*]*\*+(?:[^/*][^*]*\*+)*/"#;

/// Matches a quoted token, or a template tag: `{{name}}`, `{name}`.
/// Bracket tags `[name]` are caught by the bracket-quoted alternative and
/// told apart by [`bracket_is_tag`].
pub(crate) static TEMPLATE_SCAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)(?:{QUOTED_TOKEN})|\{{\{{\w*\}}\}}|\{{\w*\}}"))
        .unwrap_or_else(|e| unreachable!("template scan regex: {e}"))
});

/// Matches a quoted token, a `::type` cast (kept verbatim), or a `:name`
/// parameter reference.
pub(crate) static PARAM_SCAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)(?:{QUOTED_TOKEN})|::\w+|:\w+"))
        .unwrap_or_else(|e| unreachable!("param scan regex: {e}"))
});

/// Matches a quoted token alone, for passes that rewrite everything else
/// or the tokens themselves.
pub(crate) static QUOTED_SCAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s){QUOTED_TOKEN}"))
        .unwrap_or_else(|e| unreachable!("quoted scan regex: {e}"))
});

/// Returns `true` when a scanner match is a quoted token or comment rather
/// than a tag or parameter. Bracket matches count as quoted unless their
/// interior is a plain word, which makes them a `[name]` template tag.
pub(crate) fn is_quoted(m: &str) -> bool {
    match m.as_bytes().first() {
        Some(b'\'' | b'"' | b'`' | b'#' | b'/') => true,
        Some(b'-') => m.starts_with("--"),
        Some(b'[') => !bracket_is_tag(m),
        _ => false,
    }
}

/// Returns `true` when a bracket match is a `[name]` template tag,
/// i.e. its interior consists of word characters only.
pub(crate) fn bracket_is_tag(m: &str) -> bool {
    m.len() >= 2
        && m[1..m.len() - 1]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
