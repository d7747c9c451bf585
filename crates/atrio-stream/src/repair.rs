//! Heuristic recovery of a JSON object from a truncated buffer (Format B).
//!
//! The answer service streams one top-level JSON object, so mid-stream the
//! buffer is almost always invalid JSON. Recovery runs in tiers, strictest
//! first:
//!
//! 1. strict `serde_json` parse of the whole buffer;
//! 2. structural repair: strip markdown fences, trim to the outermost
//!    object, quote bare keys, then close unmatched delimiters with a
//!    scanner that tracks in-string and escape state;
//! 3. the same closing by naive brace counting, which ignores string
//!    contents. Best-effort only, kept as the last structural resort;
//! 4. targeted extraction of a complete `intro` string value.
//!
//! A buffer that ends inside an unterminated string is never force-closed:
//! half a string value must not leak into the UI as if it were complete.
//! When every tier misses the result is `None`, which callers treat as
//! "nothing new to show yet", not as an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

/// Which tier recovered the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairTier {
    /// The buffer parsed as-is; the object is complete.
    Strict,
    /// Structural repair with the string-aware delimiter closer.
    Structural,
    /// Structural repair by naive delimiter counting.
    NaiveClose,
    /// Only the `intro` string value could be extracted.
    IntroOnly,
}

/// A recovered JSON object plus how it was recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub value: Value,
    pub tier: RepairTier,
}

impl Repaired {
    /// Whether the recovered object may be missing data from the buffer.
    pub fn is_partial(&self) -> bool {
        self.tier != RepairTier::Strict
    }
}

static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("bare key pattern")
});

static INTRO_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    // Requires the closing quote: an unterminated intro is not extracted.
    Regex::new(r#""intro"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("intro pattern")
});

/// Runs the repair chain over the whole buffer.
pub fn repair_json(buffer: &str) -> Option<Repaired> {
    if let Ok(value) = serde_json::from_str::<Value>(buffer)
        && value.is_object()
    {
        return Some(Repaired {
            value,
            tier: RepairTier::Strict,
        });
    }

    let stripped = strip_code_fences(buffer);
    if let Some(trimmed) = trim_to_object(stripped) {
        // Key quoting is blind pattern substitution and can mangle string
        // values containing ", word:" sequences, so the untouched text gets
        // the first shot.
        for candidate in [trimmed.to_string(), quote_bare_keys(trimmed)] {
            if let Some(closed) = close_delimiters(&candidate)
                && let Ok(value) = serde_json::from_str::<Value>(&closed)
                && value.is_object()
            {
                tracing::trace!(len = buffer.len(), "json recovered structurally");
                return Some(Repaired {
                    value,
                    tier: RepairTier::Structural,
                });
            }
        }
        let keyed = quote_bare_keys(trimmed);

        let naive = naive_close(&keyed);
        if let Ok(value) = serde_json::from_str::<Value>(&naive)
            && value.is_object()
        {
            tracing::trace!(len = buffer.len(), "json recovered by naive count");
            return Some(Repaired {
                value,
                tier: RepairTier::NaiveClose,
            });
        }
    }

    extract_intro(stripped).map(|intro| Repaired {
        value: json!({ "intro": intro }),
        tier: RepairTier::IntroOnly,
    })
}

/// Removes a wrapping markdown code fence, if present.
fn strip_code_fences(buffer: &str) -> &str {
    let trimmed = buffer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    rest.trim().trim_end_matches("```").trim()
}

/// Trims to the substring from the first `{` to the last `}` (or to the end
/// of the buffer when no `}` has arrived yet).
fn trim_to_object(buffer: &str) -> Option<&str> {
    let start = buffer.find('{')?;
    let end = match buffer.rfind('}') {
        Some(pos) if pos >= start => pos + 1,
        _ => buffer.len(),
    };
    Some(&buffer[start..end])
}

/// Quotes unquoted object keys (`{intro: "hi"}` → `{"intro": "hi"}`).
fn quote_bare_keys(input: &str) -> String {
    BARE_KEY.replace_all(input, "$1\"$2\":").into_owned()
}

/// Appends the closers for unmatched `{`/`[`, tracking string and escape
/// state while scanning. Returns `None` when the buffer ends inside a string
/// or the existing delimiters are mismatched.
fn close_delimiters(input: &str) -> Option<String> {
    let base = trim_dangling_tail(input);

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    for ch in base.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }
    if in_string {
        return None;
    }

    let mut out = base.to_string();
    while let Some(close) = stack.pop() {
        out.push(close);
    }
    Some(out)
}

/// Appends closers by counting delimiters without excluding string contents.
/// Known limitation: braces inside string literals skew the count.
fn naive_close(input: &str) -> String {
    let mut out = trim_dangling_tail(input).to_string();
    let open_braces = out.matches('{').count() as i64 - out.matches('}').count() as i64;
    let open_brackets = out.matches('[').count() as i64 - out.matches(']').count() as i64;
    for _ in 0..open_brackets.max(0) {
        out.push(']');
    }
    for _ in 0..open_braces.max(0) {
        out.push('}');
    }
    out
}

/// Strips a syntactically dangling tail: trailing commas and half-delivered
/// `"key":` fragments that would make the closed text unparseable.
fn trim_dangling_tail(mut s: &str) -> &str {
    loop {
        s = s.trim_end();
        if let Some(rest) = s.strip_suffix(',') {
            s = rest;
            continue;
        }
        if let Some(rest) = s.strip_suffix(':') {
            let rest = rest.trim_end();
            if let Some(body) = rest.strip_suffix('"') {
                // Quoted key with no value yet: drop the whole key token.
                if let Some(open) = body.rfind('"') {
                    s = &body[..open];
                    continue;
                }
            }
            s = rest;
            continue;
        }
        return s;
    }
}

/// Extracts a complete `intro` string value, unescaping it via serde.
fn extract_intro(buffer: &str) -> Option<String> {
    let raw = INTRO_VALUE.captures(buffer)?.get(1)?.as_str();
    match serde_json::from_str::<String>(&format!("\"{raw}\"")) {
        Ok(unescaped) => Some(unescaped),
        Err(_) => Some(raw.to_string()),
    }
}
