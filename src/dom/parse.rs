//! Markup parsing via `tl`.
//!
//! `tl` tokenizes `<script>` and `<style>` bodies as markup, so those bodies
//! are cut out of the source before parsing and reattached in document order.

use std::collections::VecDeque;

use super::{Document, DomError, Element, NodeId};
use crate::utils::html::{is_raw_text_element, unescape};

impl Document {
    /// Parse a page or fragment into an owned tree.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let (masked, mut bodies) = split_raw_text(html);
        let dom = tl::parse(&masked, tl::ParserOptions::default())
            .map_err(|e| DomError::Parse(format!("{e:?}")))?;

        let mut doc = Document::new();
        let parser = dom.parser();
        let root = doc.root();
        for handle in dom.children() {
            doc.convert(*handle, parser, root, &mut bodies);
        }
        Ok(doc)
    }

    /// Convert one tl node (recursively) and append it under `parent`.
    fn convert(
        &mut self,
        handle: tl::NodeHandle,
        parser: &tl::Parser,
        parent: NodeId,
        bodies: &mut VecDeque<String>,
    ) {
        let Some(node) = handle.get(parser) else {
            return;
        };

        match node {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                // <!DOCTYPE> and friends carry no content
                if name.starts_with('!') {
                    return;
                }

                let mut element = Element::new(name);
                for (key, value) in tag.attributes().iter() {
                    let key: &str = key.as_ref();
                    let value = value.map(|v| unescape(&v).into_owned()).unwrap_or_default();
                    element.set_attr(key, value);
                }

                let raw = is_raw_text_element(&element.tag);
                let id = self.create_element(element);
                self.append_child(parent, id);

                if raw {
                    if let Some(body) = bodies.pop_front().filter(|b| !b.is_empty()) {
                        let text = self.create_text(body);
                        self.append_child(id, text);
                    }
                    return;
                }
                for child in tag.children().top().iter() {
                    self.convert(*child, parser, id, bodies);
                }
            }
            tl::Node::Raw(bytes) => {
                let text = unescape(&bytes.as_utf8_str()).into_owned();
                if text.is_empty() {
                    return;
                }
                let id = self.create_text(text);
                self.append_child(parent, id);
            }
            tl::Node::Comment(bytes) => {
                let text = bytes.as_utf8_str();
                let inner = text
                    .trim_start_matches("<!--")
                    .trim_end_matches("-->")
                    .to_string();
                let id = self.create_comment(inner);
                self.append_child(parent, id);
            }
        }
    }
}

/// Empty every `<script>`/`<style>` body in `html`, returning the emptied
/// markup and the bodies in source order.
///
/// A body runs from the end of the open tag to the next case-insensitive
/// `</script` (or `</style`), or to the end of input when unclosed.
fn split_raw_text(html: &str) -> (String, VecDeque<String>) {
    // ASCII lowering keeps byte offsets identical to `html`
    let lower = html.to_ascii_lowercase();
    let mut masked = String::with_capacity(html.len());
    let mut bodies = VecDeque::new();
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find('<') {
        let start = pos + rel;
        let rest = &lower[start..];

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map_or(lower.len(), |e| start + e + 3);
            masked.push_str(&html[pos..end]);
            pos = end;
            continue;
        }

        let Some(tag) = raw_text_open(rest) else {
            masked.push_str(&html[pos..=start]);
            pos = start + 1;
            continue;
        };

        let body_start = open_tag_end(&lower, start);
        masked.push_str(&html[pos..body_start]);

        let close = format!("</{tag}");
        let body_end = lower[body_start..]
            .find(&close)
            .map_or(lower.len(), |e| body_start + e);
        bodies.push_back(html[body_start..body_end].to_string());
        pos = body_end;
    }

    masked.push_str(&html[pos..]);
    (masked, bodies)
}

/// Raw-text tag name when `rest` (lowercased, starting at `<`) opens one.
fn raw_text_open(rest: &str) -> Option<&'static str> {
    ["script", "style"].into_iter().find(|tag| {
        rest[1..].starts_with(tag)
            && rest[1 + tag.len()..]
                .bytes()
                .next()
                .is_some_and(|b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
    })
}

/// Offset just past the `>` closing the open tag at `start`. Quoted
/// attribute values may contain `>`.
fn open_tag_end(lower: &str, start: usize) -> usize {
    let mut quote = None;
    for (i, b) in lower.bytes().enumerate().skip(start) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return i + 1,
            _ => {}
        }
    }
    lower.len()
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, NodeKind, Selector};

    fn script_source(html: &str) -> String {
        let doc = Document::parse(html).unwrap();
        let script = doc.find(&Selector::parse("script").unwrap()).unwrap();
        doc.raw_text(script)
    }

    #[test]
    fn test_parse_nested_with_attrs() {
        let doc = Document::parse(r#"<div class="result big" data-x="1"><span>hi</span></div>"#)
            .unwrap();
        let div = doc.find(&Selector::parse("div").unwrap()).unwrap();
        let el = doc.element(div).unwrap();
        assert!(el.has_class("result"));
        assert!(el.has_class("big"));
        assert_eq!(el.attr("data-x"), Some("1"));
        assert_eq!(doc.text_content(div), "hi");
    }

    #[test]
    fn test_parse_decodes_text_entities() {
        let doc = Document::parse("<p>fish &amp; chips</p>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "fish & chips");
    }

    #[test]
    fn test_parse_keeps_script_source_raw() {
        let doc = Document::parse("<script>window.flag = 'a &amp; b';</script>").unwrap();
        let script = doc.find(&Selector::parse("script").unwrap()).unwrap();
        let child = doc.children(script)[0];
        match doc.kind(child) {
            NodeKind::Text(src) => assert_eq!(src, "window.flag = 'a &amp; b';"),
            other => panic!("expected raw text, got {other:?}"),
        }
    }

    #[test]
    fn test_script_with_angle_brackets_survives() {
        for src in [
            "if (a < b) { go(); }",
            "for (var i=0;i<n;i++){}",
            "var s = '<b>x</b>';",
        ] {
            let html = format!(r#"<div class="result"><script>{src}</script><p>after</p></div>"#);
            assert_eq!(script_source(&html), src);

            let doc = Document::parse(&html).unwrap();
            assert!(doc.find(&Selector::parse("p").unwrap()).is_some());
            assert_eq!(doc.to_html(), html);
        }
    }

    #[test]
    fn test_style_body_and_uppercase_close() {
        let doc = Document::parse("<STYLE>a > b { color: red }</STYLE><p>x</p>").unwrap();
        let style = doc.find(&Selector::parse("style").unwrap()).unwrap();
        assert_eq!(doc.raw_text(style), "a > b { color: red }");
        assert_eq!(doc.text_content(doc.root()), "x");
    }

    #[test]
    fn test_several_scripts_keep_their_own_bodies() {
        let html = r#"<script src="a.js"></script><script type="text/javascript">x<1</script><!-- <script>no</script> -->"#;
        let doc = Document::parse(html).unwrap();
        let scripts = doc.find_all(&Selector::parse("script").unwrap());
        assert_eq!(scripts.len(), 2);
        assert_eq!(doc.raw_text(scripts[0]), "");
        assert_eq!(doc.raw_text(scripts[1]), "x<1");
    }

    #[test]
    fn test_quoted_gt_in_open_tag() {
        let src = script_source(r#"<script data-x="a>b">go(1<2)</script>"#);
        assert_eq!(src, "go(1<2)");
    }
}
