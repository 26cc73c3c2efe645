// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Tagged-text protocol.
//!
//! Oracle responses are free text; structured fields live between
//! case-sensitive XML-like markers such as `<analysis>...</analysis>`.
//! Nothing from a response is trusted until it has been pulled out here.
//!
//! ```
//! use promptloop::tags;
//!
//! let text = "noise <new_prompt>Classify: {text}</new_prompt> trailing";
//! assert_eq!(tags::extract_first("new_prompt", text).unwrap(), "Classify: {text}");
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Extract every region between `<tag>` and `</tag>`.
///
/// Regions are returned in order of appearance and are not nested: the first
/// closing marker after an opening marker ends the region. Text is returned
/// verbatim unless `strip` is set. A missing tag yields an empty vector.
pub fn extract<'a>(tag: &str, text: &'a str, strip: bool) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut results = Vec::new();
    let mut search_start = 0;

    while let Some(start_idx) = text[search_start..].find(&open) {
        let content_start = search_start + start_idx + open.len();
        match text[content_start..].find(&close) {
            Some(content_len) => {
                let content = &text[content_start..content_start + content_len];
                results.push(if strip { content.trim() } else { content });
                search_start = content_start + content_len + close.len();
            }
            None => break,
        }
    }

    results
}

/// Extract the first region for `tag`, failing with a protocol error when
/// the response does not contain one.
pub fn extract_first<'a>(tag: &str, text: &'a str) -> Result<&'a str> {
    extract(tag, text, false)
        .into_iter()
        .next()
        .ok_or_else(|| Error::tag_not_found(tag))
}

/// Extract exactly one region for `tag`.
///
/// Zero or multiple matches are protocol errors.
pub fn extract_one<'a>(tag: &str, text: &'a str, strip: bool) -> Result<&'a str> {
    let found = extract(tag, text, strip);
    match found.len() {
        0 => Err(Error::tag_not_found(tag)),
        1 => Ok(found[0]),
        n => Err(Error::protocol(
            tag,
            format!("expected exactly one match, found {}", n),
        )),
    }
}

fn empty_pair() -> &'static Regex {
    static EMPTY_PAIR: OnceLock<Regex> = OnceLock::new();
    EMPTY_PAIR.get_or_init(|| Regex::new(r"<(\w+)>\s*</(\w+)>").expect("invalid regex pattern"))
}

/// Remove every `<tag>` / `</tag>` pair that encloses only whitespace.
///
/// One call removes one nesting level: `<a><b></b></a>` becomes `<a></a>`.
/// Callers that need nested empties gone call this twice.
pub fn remove_empty(text: &str) -> String {
    empty_pair()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            if caps[1] == caps[2] {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Wrap `content` in `<tag>` markers on their own lines.
pub fn wrap(tag: &str, content: &str) -> String {
    format!("<{tag}>\n{content}\n</{tag}>")
}
