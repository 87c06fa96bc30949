//! Source specifications: what text an edit puts in place of its target.
//!
//! A source spec is scheme-prefixed, like a target spec:
//!
//! - `text:"literal"` — a quoted string with standard backslash escapes,
//!   yielding de novo replacement text.
//! - `copy:targetspec` — a nested target specification resolved against the
//!   *same* document state; the addressed substring becomes the replacement.
//!   Copying a range onto itself is a no-op edit.
//!
//! Both parse into the closed [`SourceSpec`] enum. Failures share
//! [`ResolveError`] with the target resolver and are per-edit recoverable.

use std::fmt;

use super::target::{ResolveError, TargetSpec, char_to_byte};

// ---------------------------------------------------------------------------
// SourceSpec
// ---------------------------------------------------------------------------

/// A parsed source specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    /// `text:"…"` — literal replacement text, quotes stripped and escapes
    /// already expanded.
    Text {
        /// The replacement text.
        literal: String,
    },

    /// `copy:targetspec` — replacement text copied from elsewhere in the
    /// same document state.
    Copy {
        /// The nested target to copy from.
        target: TargetSpec,
    },
}

impl SourceSpec {
    /// Parse a scheme-prefixed source specification.
    ///
    /// # Errors
    /// `UnknownScheme` for an unrecognized prefix, `BadSpec` for a missing
    /// quote pair or a malformed escape in a `text` literal, or any error
    /// from parsing a nested `copy` target.
    pub fn parse(spec: &str) -> Result<Self, ResolveError> {
        let (scheme, rest) = match spec.split_once(':') {
            Some((scheme, rest)) if !scheme.is_empty() => (scheme, rest),
            _ => {
                return Err(ResolveError::BadSpec {
                    spec: spec.to_owned(),
                    reason: "expected 'scheme:rest'".to_owned(),
                });
            }
        };
        match scheme {
            "text" => {
                let quoted = rest.trim_end();
                let inner = unquote(quoted).ok_or_else(|| ResolveError::BadSpec {
                    spec: spec.to_owned(),
                    reason: "text takes a quoted string, e.g. text:\"hello\"".to_owned(),
                })?;
                let literal = unescape(inner).map_err(|reason| ResolveError::BadSpec {
                    spec: spec.to_owned(),
                    reason,
                })?;
                Ok(Self::Text { literal })
            }
            "copy" => Ok(Self::Copy {
                target: TargetSpec::parse(rest)?,
            }),
            _ => Err(ResolveError::UnknownScheme {
                scheme: scheme.to_owned(),
                spec: spec.to_owned(),
            }),
        }
    }

    /// Resolve this spec against a document, returning the replacement text.
    ///
    /// # Errors
    /// For `copy`, any error from resolving the nested target.
    pub fn resolve(&self, doc: &str) -> Result<String, ResolveError> {
        match self {
            Self::Text { literal } => Ok(literal.clone()),
            Self::Copy { target } => {
                let (start, end) = target.resolve(doc)?;
                let (b0, b1) = (char_to_byte(doc, start), char_to_byte(doc, end));
                Ok(doc[b0..b1].to_owned())
            }
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { literal } => write!(f, "text:{}", quote_literal(literal)),
            Self::Copy { target } => write!(f, "copy:{target}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quoting and escapes
// ---------------------------------------------------------------------------

/// Strip one matching outer quote pair (`"…"` or `'…'`). `None` if absent.
fn unquote(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    let last = s.chars().next_back()?;
    if s.len() >= 2 && first == last && matches!(first, '"' | '\'') {
        Some(&s[first.len_utf8()..s.len() - last.len_utf8()])
    } else {
        None
    }
}

/// Expand standard backslash escapes.
///
/// Supported: `\n` `\t` `\r` `\0` `\\` `\'` `\"` `\xNN` `\uXXXX` `\u{…}`.
/// Anything else after a backslash is an error, as is a trailing backslash.
fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => out.push(hex_escape(&mut chars, 2)?),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => return Err(format!("unsupported escape '\\{other}'")),
            None => return Err("trailing backslash".to_owned()),
        }
    }
    Ok(out)
}

/// Read exactly `digits` hex digits and convert to a char.
fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
    let mut code = 0u32;
    for _ in 0..digits {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| format!("escape needs {digits} hex digits"))?;
        code = code * 16 + d;
    }
    char::from_u32(code).ok_or_else(|| format!("\\u{code:04x} is not a valid character"))
}

/// `\uXXXX` (exactly four digits) or `\u{…}` (1–6 digits).
fn unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<char, String> {
    let rest = chars.as_str();
    if rest.starts_with('{') {
        chars.next();
        let mut code = 0u32;
        let mut seen = 0usize;
        loop {
            match chars.next() {
                Some('}') if seen > 0 => break,
                Some(c) => {
                    let d = c
                        .to_digit(16)
                        .ok_or_else(|| format!("bad digit '{c}' in \\u{{…}}"))?;
                    code = code * 16 + d;
                    seen += 1;
                    if seen > 6 {
                        return Err("\\u{…} takes at most six hex digits".to_owned());
                    }
                }
                None => return Err("unterminated \\u{…} escape".to_owned()),
            }
        }
        char::from_u32(code).ok_or_else(|| format!("\\u{{{code:x}}} is not a valid character"))
    } else {
        hex_escape(chars, 4)
    }
}

/// Quote and escape a literal for a `text:` spec — the inverse of parsing.
///
/// Used when formatting records back out (saving, importing). Control
/// characters are escaped so a record always stays on one line.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{{{:x}}}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
