//! Tree to markup.

use super::{Document, NodeId, NodeKind};
use crate::utils::html::{escape, escape_attr, is_raw_text_element, is_void_element};

impl Document {
    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.outer_html(self.root())
    }

    /// Serialize one node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out, false);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String, raw: bool) {
        match self.kind(id) {
            NodeKind::Root => self.write_children(id, out, false),
            NodeKind::Text(text) if raw => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&escape(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                out.push('>');

                if is_void_element(&el.tag) {
                    return;
                }
                self.write_children(id, out, is_raw_text_element(&el.tag));
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String, raw: bool) {
        for &child in self.children(id) {
            self.write_node(child, out, raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, Element};

    #[test]
    fn test_serialize_void_and_boolean_attrs() {
        let doc = Document::parse("<input disabled><br>").unwrap();
        assert_eq!(doc.to_html(), "<input disabled><br>");
    }

    #[test]
    fn test_serialize_escapes_text_not_scripts() {
        let mut doc = Document::new();
        let p = doc.create_element(Element::new("p"));
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(p, text);
        let script = doc.create_element(Element::new("script"));
        let src = doc.create_text("if (a && b) {}");
        doc.append_child(script, src);
        let root = doc.root();
        doc.append_child(root, p);
        doc.append_child(root, script);

        assert_eq!(
            doc.to_html(),
            "<p>1 &lt; 2 &amp; 3</p><script>if (a && b) {}</script>"
        );
    }

    #[test]
    fn test_serialize_escapes_attr_quotes() {
        let mut doc = Document::new();
        let div = doc.create_element(Element::new("div").with_attr("title", "say \"hi\""));
        let root = doc.root();
        doc.append_child(root, div);
        assert_eq!(doc.to_html(), r#"<div title="say &quot;hi&quot;"></div>"#);
    }
}
