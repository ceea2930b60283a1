//! Result region patching.
//!
//! A server response is parsed into a detached document, its result node is
//! copied into the live document (replacing the current result node or
//! landing right after the anchor), and the inserted subtree is handed to
//! the `Activator` so its scripts and stylesheets come alive.

use parking_lot::Mutex;
use thiserror::Error;

use crate::activate::{ActivationReport, Activator};
use crate::dom::{Document, NodeId, Selector};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum PatchError {
    /// The fragment has no result node. The live document is untouched.
    #[error("response fragment has no `{selector}` node")]
    MalformedFragment { selector: String },
}

/// Where the new result node went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Replaced,
    InsertedAfterAnchor,
    /// Neither a result node nor the anchor existed.
    Appended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub op: PatchOp,
    pub node: NodeId,
    pub activation: ActivationReport,
}

pub struct ResultPatcher {
    result: Selector,
    anchor: Selector,
    activator: Activator,
}

impl ResultPatcher {
    pub fn new(result: Selector, anchor: Selector, activator: Activator) -> Self {
        Self {
            result,
            anchor,
            activator,
        }
    }

    /// Splice the fragment's result node into `document` and activate it.
    pub async fn patch(
        &self,
        document: &Mutex<Document>,
        fragment: &str,
    ) -> Result<PatchReport, PatchError> {
        let malformed = || PatchError::MalformedFragment {
            selector: self.result.to_string(),
        };

        let parsed = Document::parse(fragment).map_err(|e| {
            debug!("patch"; "{}", e);
            malformed()
        })?;
        let Some(incoming) = parsed.find(&self.result) else {
            log!("patch"; "response has no `{}` node; page left unchanged", self.result);
            return Err(malformed());
        };

        let (op, node) = {
            let mut doc = document.lock();
            let node = doc.import(&parsed, incoming);
            let op = self.splice(&mut doc, node);
            (op, node)
        };
        debug!("patch"; "result node {:?}", op);

        let activation = self.activator.activate(document, node).await;
        if !activation.failures.is_empty() {
            log!(
                "patch"; "{} resource(s) failed to load; result shown without them",
                activation.failures.len()
            );
        }

        Ok(PatchReport {
            op,
            node,
            activation,
        })
    }

    fn splice(&self, doc: &mut Document, node: NodeId) -> PatchOp {
        if let Some(current) = doc.find(&self.result) {
            doc.replace(current, node);
            PatchOp::Replaced
        } else if let Some(anchor) = doc.find(&self.anchor) {
            doc.insert_after(anchor, node);
            PatchOp::InsertedAfterAnchor
        } else {
            let body = doc.body();
            doc.append_child(body, node);
            PatchOp::Appended
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::activate::{LoadOutcome, ScriptLoadRegistry};
    use crate::testing::FakeHost;

    const PAGE: &str = r#"<html><head></head><body><main><form id="analyze-form"><input name="image"></form><div class="result">pending</div><p class="note">keep me</p></main></body></html>"#;

    fn patcher(host: &Arc<FakeHost>) -> ResultPatcher {
        let activator = Activator::new(
            Arc::new(ScriptLoadRegistry::new()),
            host.clone(),
            Url::parse("http://shrooms.test/analyze/").unwrap(),
            Vec::new(),
        );
        ResultPatcher::new(
            Selector::parse(".result").unwrap(),
            Selector::parse("#analyze-form").unwrap(),
            activator,
        )
    }

    fn live(html: &str) -> Mutex<Document> {
        Mutex::new(Document::parse(html).unwrap())
    }

    #[tokio::test]
    async fn test_replaces_result_and_keeps_siblings() {
        let host = Arc::new(FakeHost::new());
        let doc = live(PAGE);

        let report = patcher(&host)
            .patch(&doc, r#"<html><body><div class="result">EDIBLE</div></body></html>"#)
            .await
            .unwrap();

        assert_eq!(report.op, PatchOp::Replaced);
        let doc = doc.lock();
        let result = doc.find(&Selector::parse(".result").unwrap()).unwrap();
        assert_eq!(doc.text_content(result), "EDIBLE");
        assert_eq!(doc.find_all(&Selector::parse(".result").unwrap()).len(), 1);
        let note = doc.find(&Selector::parse("p.note").unwrap()).unwrap();
        assert_eq!(doc.text_content(note), "keep me");
    }

    #[tokio::test]
    async fn test_inserts_after_anchor_when_result_absent() {
        let host = Arc::new(FakeHost::new());
        let doc = live(r#"<body><form id="analyze-form"></form><footer></footer></body>"#);

        let report = patcher(&host)
            .patch(&doc, r#"<div class="result">EDIBLE</div>"#)
            .await
            .unwrap();

        assert_eq!(report.op, PatchOp::InsertedAfterAnchor);
        let doc = doc.lock();
        let form = doc.find(&Selector::parse("#analyze-form").unwrap()).unwrap();
        let parent = doc.parent(form).unwrap();
        let siblings = doc.children(parent);
        let pos = siblings.iter().position(|&c| c == form).unwrap();
        assert_eq!(siblings[pos + 1], report.node);
    }

    #[tokio::test]
    async fn test_appends_to_body_without_anchor() {
        let host = Arc::new(FakeHost::new());
        let doc = live("<html><body><h1>MushGuard</h1></body></html>");

        let report = patcher(&host)
            .patch(&doc, r#"<div class="result">EDIBLE</div>"#)
            .await
            .unwrap();

        assert_eq!(report.op, PatchOp::Appended);
        let doc = doc.lock();
        assert_eq!(doc.children(doc.body()).last(), Some(&report.node));
    }

    #[tokio::test]
    async fn test_malformed_fragment_leaves_document_unchanged() {
        let host = Arc::new(FakeHost::new());
        let doc = live(PAGE);
        let before = doc.lock().to_html();

        let err = patcher(&host)
            .patch(&doc, "<p>Internal error</p>")
            .await
            .unwrap_err();

        assert!(matches!(err, PatchError::MalformedFragment { .. }));
        assert_eq!(doc.lock().to_html(), before);
    }

    #[tokio::test]
    async fn test_script_fetched_once_and_inline_sees_its_global() {
        let leaflet = "http://shrooms.test/static/leaflet.js";
        let host = Arc::new(FakeHost::new().defines(leaflet, "L"));
        let patcher = patcher(&host);
        let doc = live(PAGE);
        let fragment = r#"<div class="result"><div id="map"></div><script src="/static/leaflet.js"></script><script>L.map('map')</script></div>"#;

        let first = patcher.patch(&doc, fragment).await.unwrap();
        let second = patcher.patch(&doc, fragment).await.unwrap();

        assert_eq!(host.fetch_count(leaflet), 1);
        assert_eq!(first.activation.external[0].1, LoadOutcome::Fetched);
        assert_eq!(second.activation.external[0].1, LoadOutcome::Cached);

        let observed = host.inline_globals();
        assert_eq!(observed.len(), 2);
        assert!(observed.iter().all(|globals| globals.contains(&"L".to_string())));
    }
}
