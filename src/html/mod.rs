//! DOM handling for marker insertion.
//!
//! Parses HTML with html5ever into an rcdom tree, collects the leaf block
//! containers that hold the document's running text, and provides the splice
//! primitives that insert page-number spans into text nodes.

pub mod inserter;
pub mod locator;

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::SerializeOpts;
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, QualName, local_name, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use crate::error::{Error, Result};

/// CSS class carried by every inserted marker span.
pub const MARKER_CLASS: &str = "page-number";

/// Default stylesheet for marker spans, injected unless the caller opts out.
pub const DEFAULT_MARKER_CSS: &str = "\n\
    span.page-number {\n\
    \x20\x20display: inline-block;\n\
    \x20\x20font-size: 0.75em;\n\
    \x20\x20color: #888;\n\
    \x20\x20vertical-align: super;\n\
    \x20\x20margin: 0 0.2em;\n\
    }\n";

/// Block elements whose text is searched for snippets. A container is a
/// "leaf" when no descendant element is itself on this list.
const CONTAINER_TAGS: [&str; 17] = [
    "p", "div", "td", "th", "li", "dd", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "aside", "article", "section",
];

/// Elements whose text never belongs to the document's running text.
const SKIP_TAGS: [&str; 3] = ["script", "style", "head"];

/// A leaf block container and its flattened text.
///
/// The text is the raw concatenation of every text node under the container,
/// skipping marker spans, so a byte offset into it maps directly onto a
/// position in some text node.
pub struct Container {
    pub node: Handle,
    pub text: String,
}

/// A parsed HTML document with its container list cached.
pub struct HtmlDocument {
    dom: RcDom,
    containers: Vec<Container>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Result<Self> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| Error::Html(format!("parse failed: {e}")))?;

        let mut containers = Vec::new();
        collect_containers(&dom.document, &mut containers);
        Ok(HtmlDocument { dom, containers })
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Full running text of the document, containers joined with newlines.
    pub fn text(&self) -> String {
        let texts: Vec<&str> = self.containers.iter().map(|c| c.text.as_str()).collect();
        texts.join("\n")
    }

    /// Insert a marker span for `page` at a byte offset into the flattened
    /// text of container `index`. Marker text is skipped when flattening, so
    /// offsets computed before the insertion stay valid after it.
    pub fn insert_marker(&self, index: usize, offset: usize, page: &str) -> Result<()> {
        let container = self
            .containers
            .get(index)
            .ok_or_else(|| Error::Html(format!("container index {index} out of range")))?;
        let (text_node, local_offset) = locate_text_node(&container.node, offset)
            .ok_or_else(|| Error::Html(format!("offset {offset} outside container text")))?;
        splice_marker(&text_node, local_offset, make_marker(page))
    }

    /// All marker spans currently in the document, in document order.
    pub fn markers(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        collect_markers(&self.dom.document, &mut out);
        out
    }

    /// Append a `<style>` block to `<head>` (or the document root when the
    /// source has no head element).
    pub fn inject_css(&self, css: &str) {
        let style = Node::new(NodeData::Element {
            name: QualName::new(None, ns!(html), local_name!("style")),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        });
        append_child(&style, new_text(css));

        let target = find_element(&self.dom.document, "head").unwrap_or_else(|| {
            find_element(&self.dom.document, "html").unwrap_or_else(|| self.dom.document.clone())
        });
        append_child(&target, style);
    }

    pub fn serialize(&self) -> Result<String> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.dom.document.clone().into();
        html5ever::serialize::serialize(&mut out, &handle, SerializeOpts::default())
            .map_err(|e| Error::Html(format!("serialize failed: {e}")))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

fn element_tag(node: &Handle) -> Option<&QualName> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    if let NodeData::Element { ref attrs, .. } = node.data {
        attrs.borrow().iter().any(|a| {
            a.name.local.as_ref() == "class"
                && a.value.split_ascii_whitespace().any(|c| c == class)
        })
    } else {
        false
    }
}

/// True for marker spans inserted by this tool.
pub fn is_marker(node: &Handle) -> bool {
    element_tag(node).is_some_and(|name| name.local.as_ref() == "span") && has_class(node, MARKER_CLASS)
}

/// Page label of a marker span, from its text content.
pub fn marker_label(node: &Handle) -> Option<String> {
    if !is_marker(node) {
        return None;
    }
    let mut label = String::new();
    flatten_text(node, &mut label);
    Some(label)
}

fn contains_container(node: &Handle) -> bool {
    node.children.borrow().iter().any(|child| {
        element_tag(child)
            .is_some_and(|name| CONTAINER_TAGS.contains(&name.local.as_ref()))
            || contains_container(child)
    })
}

fn collect_containers(node: &Handle, out: &mut Vec<Container>) {
    for child in node.children.borrow().iter() {
        let Some(name) = element_tag(child) else {
            collect_containers(child, out);
            continue;
        };
        let tag = name.local.as_ref();
        if SKIP_TAGS.contains(&tag) {
            continue;
        }
        if CONTAINER_TAGS.contains(&tag) && !contains_container(child) {
            let mut text = String::new();
            flatten_text(child, &mut text);
            if !text.trim().is_empty() {
                out.push(Container {
                    node: child.clone(),
                    text,
                });
            }
        } else {
            collect_containers(child, out);
        }
    }
}

/// Concatenate the raw text under `node`, skipping marker spans so repeated
/// runs over a marked document see the same text as the first run.
fn flatten_text(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            NodeData::Element { ref name, .. } => {
                let tag = name.local.as_ref();
                if SKIP_TAGS.contains(&tag) || is_marker(child) {
                    continue;
                }
                flatten_text(child, out);
            }
            _ => {}
        }
    }
}

/// Walk the text nodes under `container` to find the one holding byte
/// `offset` of the flattened text, returning the node and the offset inside
/// it. An offset on the boundary between two text nodes resolves to the end
/// of the earlier one, so the marker stays outside any inline element that
/// opens at the boundary.
fn locate_text_node(container: &Handle, offset: usize) -> Option<(Handle, usize)> {
    fn walk(node: &Handle, remaining: &mut usize) -> Option<(Handle, usize)> {
        for child in node.children.borrow().iter() {
            match child.data {
                NodeData::Text { ref contents } => {
                    let len = contents.borrow().len();
                    if *remaining <= len {
                        return Some((child.clone(), *remaining));
                    }
                    *remaining -= len;
                }
                NodeData::Element { ref name, .. } => {
                    let tag = name.local.as_ref();
                    if SKIP_TAGS.contains(&tag) || is_marker(child) {
                        continue;
                    }
                    if let Some(found) = walk(child, remaining) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }

    let mut remaining = offset;
    walk(container, &mut remaining)
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

fn node_parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    node.parent.set(weak.clone());
    weak.and_then(|w| w.upgrade())
}

fn child_position(parent: &Handle, child: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, child))
}

/// Build a marker span: `<span class="page-number" role="note"
/// aria-label="Page N">N</span>`.
pub fn make_marker(page: &str) -> Handle {
    let attr = |name: &str, value: &str| Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: value.into(),
    };
    let span = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), local_name!("span")),
        attrs: RefCell::new(vec![
            attr("class", MARKER_CLASS),
            attr("role", "note"),
            attr("aria-label", &format!("Page {page}")),
        ]),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    append_child(&span, new_text(page));
    span
}

/// Split `text_node` at `offset` and put `marker` into the gap. Offsets at
/// either end insert the marker as a sibling without splitting.
fn splice_marker(text_node: &Handle, offset: usize, marker: Handle) -> Result<()> {
    let parent = node_parent(text_node)
        .ok_or_else(|| Error::Html("text node has no parent".into()))?;
    let position = child_position(&parent, text_node)
        .ok_or_else(|| Error::Html("text node not among parent's children".into()))?;

    let content = match text_node.data {
        NodeData::Text { ref contents } => contents.borrow().to_string(),
        _ => return Err(Error::Html("marker target is not a text node".into())),
    };
    if offset > content.len() || !content.is_char_boundary(offset) {
        return Err(Error::Html(format!("offset {offset} splits a character")));
    }

    marker.parent.set(Some(Rc::downgrade(&parent)));
    let mut children = parent.children.borrow_mut();
    if offset == 0 {
        children.insert(position, marker);
    } else if offset == content.len() {
        children.insert(position + 1, marker);
    } else {
        let before = new_text(&content[..offset]);
        let after = new_text(&content[offset..]);
        before.parent.set(Some(Rc::downgrade(&parent)));
        after.parent.set(Some(Rc::downgrade(&parent)));
        children.splice(position..=position, [before, marker, after]);
    }
    Ok(())
}

/// Detach a marker span from its parent.
pub fn remove_marker(marker: &Handle) -> Result<()> {
    let parent = node_parent(marker)
        .ok_or_else(|| Error::Html("marker has no parent".into()))?;
    let position = child_position(&parent, marker)
        .ok_or_else(|| Error::Html("marker not among parent's children".into()))?;
    parent.children.borrow_mut().remove(position);
    marker.parent.set(None);
    Ok(())
}

fn collect_markers(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if is_marker(child) {
            out.push(child.clone());
        } else {
            collect_markers(child, out);
        }
    }
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if element_tag(child).is_some_and(|name| name.local.as_ref() == tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_leaf_containers_only() {
        let doc = HtmlDocument::parse(
            "<html><body><div><p>first para</p><p>second para</p></div></body></html>",
        )
        .unwrap();
        let texts: Vec<&str> = doc.containers().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first para", "second para"]);
    }

    #[test]
    fn div_without_nested_containers_is_a_leaf() {
        let doc =
            HtmlDocument::parse("<html><body><div>bare <em>text</em> here</div></body></html>")
                .unwrap();
        assert_eq!(doc.containers().len(), 1);
        assert_eq!(doc.containers()[0].text, "bare text here");
    }

    #[test]
    fn script_and_style_text_excluded() {
        let doc = HtmlDocument::parse(
            "<html><head><style>p{}</style></head><body><p>visible</p><script>var x;</script></body></html>",
        )
        .unwrap();
        assert_eq!(doc.containers().len(), 1);
        assert_eq!(doc.containers()[0].text, "visible");
    }

    #[test]
    fn marker_inserted_mid_text_node() {
        let doc = HtmlDocument::parse("<html><body><p>hello world</p></body></html>").unwrap();
        doc.insert_marker(0, 5, "12").unwrap();
        let out = doc.serialize().unwrap();
        assert!(out.contains(
            "hello<span class=\"page-number\" role=\"note\" aria-label=\"Page 12\">12</span> world"
        ));
    }

    #[test]
    fn marker_at_container_end() {
        let doc = HtmlDocument::parse("<html><body><p>hello</p></body></html>").unwrap();
        doc.insert_marker(0, 5, "3").unwrap();
        let out = doc.serialize().unwrap();
        assert!(out.contains("hello<span"));
    }

    #[test]
    fn boundary_offset_stays_outside_opening_inline() {
        let doc = HtmlDocument::parse(
            "<html><body><p>closing word<i>Italic opening of the next</i></p></body></html>",
        )
        .unwrap();
        // "closing word" is 12 bytes; offset 12 sits on the text-node boundary
        doc.insert_marker(0, 12, "5").unwrap();
        let out = doc.serialize().unwrap();
        let marker = out.find("<span").unwrap();
        let italic = out.find("<i>").unwrap();
        assert!(marker < italic, "marker spliced inside the inline element: {out}");
    }

    #[test]
    fn marker_text_skipped_when_flattening() {
        let doc = HtmlDocument::parse("<html><body><p>hello world</p></body></html>").unwrap();
        doc.insert_marker(0, 5, "12").unwrap();
        let reparsed = HtmlDocument::parse(&doc.serialize().unwrap()).unwrap();
        assert_eq!(reparsed.containers()[0].text, "hello world");
    }

    #[test]
    fn markers_listed_in_document_order() {
        let doc =
            HtmlDocument::parse("<html><body><p>one two</p><p>three four</p></body></html>")
                .unwrap();
        doc.insert_marker(0, 3, "1").unwrap();
        doc.insert_marker(1, 5, "2").unwrap();
        let labels: Vec<String> = doc.markers().iter().filter_map(marker_label).collect();
        assert_eq!(labels, vec!["1", "2"]);
    }

    #[test]
    fn remove_marker_restores_text() {
        let doc = HtmlDocument::parse("<html><body><p>hello world</p></body></html>").unwrap();
        doc.insert_marker(0, 5, "7").unwrap();
        let markers = doc.markers();
        remove_marker(&markers[0]).unwrap();
        let reparsed = HtmlDocument::parse(&doc.serialize().unwrap()).unwrap();
        assert_eq!(reparsed.containers()[0].text, "hello world");
        assert!(reparsed.markers().is_empty());
    }

    #[test]
    fn css_lands_in_head() {
        let doc = HtmlDocument::parse("<html><head></head><body><p>x</p></body></html>").unwrap();
        doc.inject_css(DEFAULT_MARKER_CSS);
        let out = doc.serialize().unwrap();
        let head_end = out.find("</head>").unwrap();
        let style_at = out.find("span.page-number").unwrap();
        assert!(style_at < head_end);
    }

    #[test]
    fn offset_past_text_rejected() {
        let doc = HtmlDocument::parse("<html><body><p>short</p></body></html>").unwrap();
        assert!(doc.insert_marker(0, 99, "1").is_err());
    }
}
