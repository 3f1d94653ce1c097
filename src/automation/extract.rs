//! Pull structured payloads out of free-text model output.
//!
//! Models wrap JSON in prose, markdown fences, or trail off mid-object. The
//! extractor tries the widest span first (first opener to last closer), then
//! each balanced group in order, and returns the first candidate that parses.

use serde::de::DeserializeOwned;

use crate::error::ParseMiss;

/// Which delimiter pair bounds the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `[ ... ]`
    Bracket,
    /// `{ ... }`
    Brace,
}

impl Delimiter {
    fn open(self) -> char {
        match self {
            Self::Bracket => '[',
            Self::Brace => '{',
        }
    }

    fn close(self) -> char {
        match self {
            Self::Bracket => ']',
            Self::Brace => '}',
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Bracket => "bracket",
            Self::Brace => "brace",
        }
    }
}

/// Extract and deserialize the first `delimiter`-bounded payload in `text`.
pub fn extract_structured<T: DeserializeOwned>(
    text: &str,
    delimiter: Delimiter,
) -> Result<T, ParseMiss> {
    let candidates = candidates(text, delimiter);
    if candidates.is_empty() {
        return Err(ParseMiss::NotFound(delimiter.label()));
    }

    let mut last_err = String::new();
    for candidate in candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(ParseMiss::Malformed(last_err))
}

/// First bracketed list in `text`.
pub fn extract_list<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, ParseMiss> {
    extract_structured(text, Delimiter::Bracket)
}

/// First brace-delimited object in `text`.
pub fn extract_object<T: DeserializeOwned>(text: &str) -> Result<T, ParseMiss> {
    extract_structured(text, Delimiter::Brace)
}

/// Candidate substrings, widest first, then balanced groups left to right.
fn candidates(text: &str, delimiter: Delimiter) -> Vec<&str> {
    let (open, close) = (delimiter.open(), delimiter.close());
    let mut out = Vec::new();

    let Some(first) = text.find(open) else {
        return out;
    };
    if let Some(last) = text.rfind(close)
        && last > first
    {
        out.push(&text[first..=last]);
    }

    for (start, _) in text.match_indices(open) {
        if let Some(end) = balanced_end(text, start, open, close) {
            let group = &text[start..=end];
            if !out.contains(&group) {
                out.push(group);
            }
        }
    }
    out
}

/// Byte index of the closer matching the opener at `start`, skipping
/// delimiters inside JSON string literals. `None` if the group never closes.
fn balanced_end(text: &str, start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
