//! Target specifications: where in the document an edit applies.
//!
//! A target spec is a scheme-prefixed string (`END:`, `chars:0:5`,
//! `match:\bfiles\b`, `attr:id="x"`, `xptr:…`) naming a contiguous character
//! range of the *current* document state. Specs are parsed into the closed
//! [`TargetSpec`] enum by a dedicated parser, so adding a scheme is an
//! exhaustiveness-checked change rather than a string comparison falling
//! through.
//!
//! Resolution is position-dependent: `chars:100:200` refers to different
//! text in every version of a document, so every call re-scans the supplied
//! text and nothing is cached across calls.
//!
//! All offsets are in **characters**, end-exclusive, with
//! `0 <= start <= end <= doc.chars().count()`.

use std::fmt;

use regex::Regex;

// ---------------------------------------------------------------------------
// TargetSpec
// ---------------------------------------------------------------------------

/// A parsed target specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSpec {
    /// `END:` — the empty range at the very end of the document (pure append).
    End,

    /// `chars:from:to` — an end-exclusive character-offset range.
    Chars {
        /// First character to replace (0-based).
        from: i64,
        /// One past the last character to replace.
        to: i64,
    },

    /// `match:regex` — the first match of a regex, default case-sensitive
    /// semantics. A surrounding matching quote pair is stripped before the
    /// pattern is compiled.
    Match {
        /// The pattern text, quotes already stripped.
        pattern: String,
    },

    /// `attr:name="value"` — the first element start-tag carrying the
    /// attribute, located by a best-effort pattern match over the raw text
    /// rather than a structural parse. Only the start-tag span is targeted.
    Attr {
        /// Attribute name.
        name: String,
        /// Attribute value, quotes already stripped.
        value: String,
    },

    /// `xptr:…` — reserved; resolution always fails.
    Xptr {
        /// The unparsed locator, kept for diagnostics.
        locator: String,
    },
}

impl TargetSpec {
    /// Parse a scheme-prefixed target specification.
    ///
    /// # Errors
    /// `UnknownScheme` for an unrecognized prefix, `BadSpec` for a malformed
    /// body (e.g. non-numeric `chars` offsets, unquoted `attr` value).
    pub fn parse(spec: &str) -> Result<Self, ResolveError> {
        let (scheme, rest) = split_scheme(spec)?;
        match scheme {
            "END" => Ok(Self::End),
            "chars" => {
                let (from, to) = rest.split_once(':').ok_or_else(|| ResolveError::BadSpec {
                    spec: spec.to_owned(),
                    reason: "chars takes two offsets, 'chars:from:to'".to_owned(),
                })?;
                let parse = |s: &str| {
                    s.trim().parse::<i64>().map_err(|_| ResolveError::BadSpec {
                        spec: spec.to_owned(),
                        reason: format!("'{s}' is not an integer offset"),
                    })
                };
                Ok(Self::Chars {
                    from: parse(from)?,
                    to: parse(to)?,
                })
            }
            "match" => Ok(Self::Match {
                pattern: strip_quote_pair(rest).to_owned(),
            }),
            "attr" => parse_attr(spec, rest),
            "xptr" => Ok(Self::Xptr {
                locator: rest.to_owned(),
            }),
            _ => Err(ResolveError::UnknownScheme {
                scheme: scheme.to_owned(),
                spec: spec.to_owned(),
            }),
        }
    }

    /// Resolve this spec against a document, returning the end-exclusive
    /// character range `(start, end)` to replace.
    ///
    /// # Errors
    /// `Range` for an out-of-bounds or inverted `chars` range, `NoMatch`
    /// when a `match`/`attr` pattern finds nothing, `Unimplemented` for
    /// `xptr`, `BadSpec` if a pattern fails to compile.
    pub fn resolve(&self, doc: &str) -> Result<(usize, usize), ResolveError> {
        let doc_chars = doc.chars().count();
        match self {
            Self::End => Ok((doc_chars, doc_chars)),
            Self::Chars { from, to } => {
                let len = i64::try_from(doc_chars).unwrap_or(i64::MAX);
                let range_err = || ResolveError::Range {
                    from: *from,
                    to: *to,
                    len: doc_chars,
                };
                if *from < 0 || *from > *to || *to > len {
                    return Err(range_err());
                }
                match (usize::try_from(*from), usize::try_from(*to)) {
                    (Ok(f), Ok(t)) => Ok((f, t)),
                    _ => Err(range_err()),
                }
            }
            Self::Match { pattern } => {
                let re = compile(pattern)?;
                let m = re.find(doc).ok_or_else(|| ResolveError::NoMatch {
                    pattern: pattern.clone(),
                })?;
                Ok(byte_span_to_chars(doc, m.start(), m.end()))
            }
            Self::Attr { name, value } => {
                let pattern = start_tag_pattern(name, value);
                let re = compile(&pattern)?;
                let m = re.find(doc).ok_or_else(|| ResolveError::NoMatch {
                    pattern: format!("{name}={value}"),
                })?;
                Ok(byte_span_to_chars(doc, m.start(), m.end()))
            }
            Self::Xptr { .. } => Err(ResolveError::Unimplemented {
                scheme: "xptr".to_owned(),
            }),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "END:"),
            Self::Chars { from, to } => write!(f, "chars:{from}:{to}"),
            Self::Match { pattern } => write!(f, "match:{pattern}"),
            Self::Attr { name, value } => write!(f, "attr:{name}=\"{value}\""),
            Self::Xptr { locator } => write!(f, "xptr:{locator}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Split `scheme:rest`, requiring a non-empty scheme.
fn split_scheme(spec: &str) -> Result<(&str, &str), ResolveError> {
    match spec.split_once(':') {
        Some((scheme, rest)) if !scheme.is_empty() => Ok((scheme, rest)),
        _ => Err(ResolveError::BadSpec {
            spec: spec.to_owned(),
            reason: "expected 'scheme:rest'".to_owned(),
        }),
    }
}

/// Strip one surrounding matching quote pair, if present.
fn strip_quote_pair(s: &str) -> &str {
    let mut chars = s.chars();
    match (chars.next(), s.chars().next_back()) {
        (Some(q @ ('"' | '\'')), Some(last)) if q == last && s.len() >= 2 => {
            &s[q.len_utf8()..s.len() - last.len_utf8()]
        }
        _ => s,
    }
}

/// Parse `name="value"` (single or double quotes) for the `attr` scheme.
fn parse_attr(spec: &str, rest: &str) -> Result<TargetSpec, ResolveError> {
    let bad = |reason: &str| ResolveError::BadSpec {
        spec: spec.to_owned(),
        reason: reason.to_owned(),
    };
    let (name, value) = rest
        .split_once('=')
        .ok_or_else(|| bad("attr takes 'name=\"value\"'"))?;
    let name = name.trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | ':' | '.' | '_'))
    {
        return Err(bad("attribute name must be a name token"));
    }
    let value = value.trim();
    let stripped = strip_quote_pair(value);
    if stripped.len() == value.len() {
        return Err(bad("attribute value must be quoted"));
    }
    Ok(TargetSpec::Attr {
        name: name.to_owned(),
        value: stripped.to_owned(),
    })
}

fn compile(pattern: &str) -> Result<Regex, ResolveError> {
    Regex::new(pattern).map_err(|e| ResolveError::BadSpec {
        spec: pattern.to_owned(),
        reason: format!("regex failed to compile: {e}"),
    })
}

/// Regex matching the full start tag that carries `name="value"`.
///
/// The regex crate has no backreferences, so both quote styles are spelled
/// out as alternatives.
fn start_tag_pattern(name: &str, value: &str) -> String {
    let name = regex::escape(name);
    let value = regex::escape(value);
    format!(r#"<\w[^>]*\s{name}\s*=\s*("{value}"|'{value}')[^>]*>"#)
}

/// Convert a byte span (from the regex engine) to character offsets.
fn byte_span_to_chars(doc: &str, start: usize, end: usize) -> (usize, usize) {
    let start_chars = doc[..start].chars().count();
    let span_chars = doc[start..end].chars().count();
    (start_chars, start_chars + span_chars)
}

/// Map a character offset to a byte offset. `pos` may equal the char count
/// (one past the end). Callers guarantee `pos` is in bounds.
pub(crate) fn char_to_byte(doc: &str, pos: usize) -> usize {
    doc.char_indices()
        .nth(pos)
        .map_or_else(|| doc.len(), |(byte, _)| byte)
}

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

/// A target or source specification failed to parse or resolve.
///
/// These are per-edit, recoverable failures: one malformed edit must not
/// prevent inspecting the rest of the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The scheme prefix is not recognized.
    UnknownScheme {
        /// The unrecognized prefix.
        scheme: String,
        /// The full specification, for diagnostics.
        spec: String,
    },

    /// The spec body is malformed (bad offsets, bad quoting, bad pattern).
    BadSpec {
        /// The full specification.
        spec: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// A `chars` range is negative, inverted, or out of bounds.
    Range {
        /// Requested start offset.
        from: i64,
        /// Requested end offset.
        to: i64,
        /// Character length of the document resolved against.
        len: usize,
    },

    /// A `match` or `attr` pattern found nothing in the document.
    NoMatch {
        /// The pattern (or `name=value` pair) that failed to match.
        pattern: String,
    },

    /// The scheme is reserved but not implemented.
    Unimplemented {
        /// The reserved scheme.
        scheme: String,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScheme { scheme, spec } => {
                write!(
                    f,
                    "unknown scheme '{scheme}' in '{spec}'.\n  Supported target schemes: END, chars, match, attr; source schemes: text, copy."
                )
            }
            Self::BadSpec { spec, reason } => {
                write!(f, "malformed specification '{spec}': {reason}")
            }
            Self::Range { from, to, len } => {
                write!(
                    f,
                    "character range {from}:{to} is invalid for a document of length {len}.\n  Offsets must satisfy 0 <= from <= to <= length."
                )
            }
            Self::NoMatch { pattern } => {
                write!(f, "no match for '{pattern}' in the current document state")
            }
            Self::Unimplemented { scheme } => {
                write!(f, "scheme '{scheme}' is reserved but not implemented")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
