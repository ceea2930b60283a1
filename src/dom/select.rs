//! Compound selector matching.
//!
//! Supports a single compound selector: optional tag name followed by any
//! number of `.class`, `#id` and `[attr]` / `[attr=value]` parts.
//! Combinators (descendant, child, sibling) are rejected.

use std::fmt;

use thiserror::Error;

use super::Element;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported selector `{0}` (only compound selectors like `div.result` are allowed)")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }
        let unsupported = || SelectorError::Unsupported(source.to_string());

        let mut selector = Selector {
            source: source.to_string(),
            tag: None,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        let mut rest = source;
        let tag_len = rest.find(|c| !is_ident_char(c)).unwrap_or(rest.len());
        if tag_len > 0 {
            selector.tag = Some(rest[..tag_len].to_ascii_lowercase());
            rest = &rest[tag_len..];
        }

        while let Some(first) = rest.chars().next() {
            match first {
                '.' | '#' => {
                    let body = &rest[1..];
                    let len = body.find(|c| !is_ident_char(c)).unwrap_or(body.len());
                    if len == 0 {
                        return Err(unsupported());
                    }
                    let ident = body[..len].to_string();
                    if first == '.' {
                        selector.classes.push(ident);
                    } else {
                        selector.id = Some(ident);
                    }
                    rest = &body[len..];
                }
                '[' => {
                    let end = rest.find(']').ok_or_else(unsupported)?;
                    let inner = rest[1..end].trim();
                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                            (name.trim(), Some(value.to_string()))
                        }
                        None => (inner, None),
                    };
                    if name.is_empty() || !name.chars().all(is_ident_char) {
                        return Err(unsupported());
                    }
                    selector.attrs.push((name.to_ascii_lowercase(), value));
                    rest = &rest[end + 1..];
                }
                _ => return Err(unsupported()),
            }
        }

        Ok(selector)
    }

    pub fn matches(&self, el: &Element) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != el.tag) {
            return false;
        }
        if self.id.as_deref().is_some_and(|id| el.attr("id") != Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|class| el.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| match (el.attr(name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
