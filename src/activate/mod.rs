//! Activation of freshly inserted markup.
//!
//! Markup spliced into the document is inert: its `<script>` elements never
//! ran and its stylesheets may duplicate ones already on the page. The
//! `Activator` walks the inserted subtree in document order and
//!
//! 1. makes every stylesheet the subtree needs present exactly once in
//!    `<head>` (including stylesheets that known libraries depend on),
//! 2. runs external scripts through the `ScriptLoadRegistry`, waiting for
//!    each one before moving on,
//! 3. recreates inline scripts as fresh nodes at the end of `<body>` and runs
//!    them once everything before them has finished.
//!
//! Individual failures are logged and skipped.
//!
//! # Module Structure
//!
//! - `host` - `ScriptHost` execution seam and `ScriptLoadError`
//! - `registry` - `ScriptLoadRegistry` (fetch-once cache)

pub mod host;
pub mod registry;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use url::Url;

pub use host::{HttpScriptHost, ScriptHost, ScriptLoadError};
pub use registry::{LoadOutcome, ScriptLoadRegistry};

use crate::dom::{Document, Element, NodeId};
use crate::{debug, log};

/// Stylesheet that must accompany any script whose file name contains
/// `script` (e.g. Leaflet's CSS for `leaflet.js`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesheetDependency {
    pub script: String,
    pub href: String,
}

/// What one activation pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub stylesheets_injected: usize,
    pub external: Vec<(String, LoadOutcome)>,
    pub inline_run: usize,
    pub failures: Vec<String>,
}

#[derive(Debug)]
enum Step {
    Stylesheet { href: Url, node: Option<NodeId> },
    External { url: Url },
    Inline { node: NodeId, source: String },
}

/// Sequential loader over an inserted subtree.
pub struct Activator {
    registry: Arc<ScriptLoadRegistry>,
    host: Arc<dyn ScriptHost>,
    base_url: Url,
    dependencies: Vec<StylesheetDependency>,
}

impl Activator {
    pub fn new(
        registry: Arc<ScriptLoadRegistry>,
        host: Arc<dyn ScriptHost>,
        base_url: Url,
        dependencies: Vec<StylesheetDependency>,
    ) -> Self {
        Self {
            registry,
            host,
            base_url,
            dependencies,
        }
    }

    /// Activate everything under `subtree`, which must already be attached.
    ///
    /// The document lock is only taken between suspension points.
    pub async fn activate(&self, document: &Mutex<Document>, subtree: NodeId) -> ActivationReport {
        let steps = self.plan(&document.lock(), subtree);
        let mut report = ActivationReport::default();

        for step in steps {
            match step {
                Step::Stylesheet { href, node } => {
                    if self.ensure_stylesheet(&mut document.lock(), &href, node) {
                        debug!("activate"; "stylesheet injected: {}", href);
                        report.stylesheets_injected += 1;
                    }
                }
                Step::External { url } => {
                    match self.registry.ensure(&url, self.host.as_ref()).await {
                        Ok(outcome) => report.external.push((url.to_string(), outcome)),
                        Err(e) => {
                            log!("activate"; "script skipped: {}", e);
                            report.failures.push(e.to_string());
                        }
                    }
                }
                Step::Inline { node, source } => {
                    reinsert_inline(&mut document.lock(), node, &source);
                    match self.host.run_inline(&source) {
                        Ok(()) => report.inline_run += 1,
                        Err(e) => {
                            log!("activate"; "inline script failed: {}", e);
                            report.failures.push(e.to_string());
                        }
                    }
                }
            }
        }

        report
    }

    fn resolve(&self, reference: &str) -> Option<Url> {
        match self.base_url.join(reference.trim()) {
            Ok(url) => Some(url),
            Err(e) => {
                log!("activate"; "ignoring unresolvable reference `{}`: {}", reference, e);
                None
            }
        }
    }

    /// Stylesheets first, then scripts, each group in document order.
    fn plan(&self, doc: &Document, subtree: NodeId) -> Vec<Step> {
        let mut sheets = Vec::new();
        let mut scripts = Vec::new();
        let mut implied = FxHashSet::default();

        for id in doc.subtree(subtree) {
            let Some(el) = doc.element(id) else {
                continue;
            };
            match el.tag.as_str() {
                "link" if is_stylesheet(el) => {
                    if let Some(href) = el.attr("href").and_then(|h| self.resolve(h)) {
                        sheets.push(Step::Stylesheet {
                            href,
                            node: Some(id),
                        });
                    }
                }
                "script" if is_executable(el) => match el.attr("src") {
                    Some(src) => {
                        let Some(url) = self.resolve(src) else {
                            continue;
                        };
                        for dep in self.dependencies_of(&url) {
                            if let Some(href) = self.resolve(&dep.href)
                                && implied.insert(href.clone())
                            {
                                sheets.push(Step::Stylesheet { href, node: None });
                            }
                        }
                        scripts.push(Step::External { url });
                    }
                    None => scripts.push(Step::Inline {
                        node: id,
                        source: doc.raw_text(id),
                    }),
                },
                _ => {}
            }
        }

        sheets.extend(scripts);
        sheets
    }

    fn dependencies_of<'a>(&'a self, script: &Url) -> impl Iterator<Item = &'a StylesheetDependency> {
        let file = script
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.dependencies
            .iter()
            .filter(move |dep| file.contains(&dep.script.to_ascii_lowercase()))
    }

    /// Returns true if the stylesheet had to be added to `<head>`.
    ///
    /// `node` is the fragment's own `<link>`, if any: it is moved into the
    /// head when new and dropped when the page already has that resource.
    fn ensure_stylesheet(&self, doc: &mut Document, href: &Url, node: Option<NodeId>) -> bool {
        let present = doc
            .subtree(doc.root())
            .into_iter()
            .filter(|&id| Some(id) != node)
            .filter_map(|id| doc.element(id))
            .filter(|el| el.tag == "link" && is_stylesheet(el))
            .filter_map(|el| el.attr("href"))
            .any(|existing| self.base_url.join(existing).is_ok_and(|u| u == *href));

        if present {
            if let Some(dup) = node {
                doc.remove(dup);
            }
            return false;
        }

        let head = doc.head();
        let link = match node {
            Some(id) => id,
            None => doc.create_element(
                Element::new("link")
                    .with_attr("rel", "stylesheet")
                    .with_attr("href", href.as_str()),
            ),
        };
        doc.append_child(head, link);
        true
    }
}

/// Swap an inert inline script for a fresh copy at the end of `<body>`.
fn reinsert_inline(doc: &mut Document, node: NodeId, source: &str) {
    let element = doc
        .element(node)
        .cloned()
        .unwrap_or_else(|| Element::new("script"));
    doc.remove(node);

    let fresh = doc.create_element(element);
    if !source.is_empty() {
        let text = doc.create_text(source);
        doc.append_child(fresh, text);
    }
    let body = doc.body();
    doc.append_child(body, fresh);
}

fn is_stylesheet(el: &Element) -> bool {
    el.attr("rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|r| r.eq_ignore_ascii_case("stylesheet"))
    })
}

/// Data blocks (`application/json`, templates, ...) are not executed.
fn is_executable(el: &Element) -> bool {
    match el.attr("type").map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "module" | "text/javascript" | "application/javascript" | "text/ecmascript"
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================
