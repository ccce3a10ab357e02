//! In-memory mutable document
//!
//! HTML is parsed once with `scraper` and copied into an arena of nodes that
//! can be mutated in place. Live properties (checked, selected, value,
//! scroll offsets) are tracked apart from attributes, the way a browser
//! separates the two.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use scraper::{ElementRef, Html};
use serde_json::Value;

use super::selector::SelectorList;
use super::{DispatchOutcome, Document, DomError, DomEvent, NodeId};

/// Event listener attached to a node
pub type Listener = Arc<dyn Fn(&mut DomEvent) + Send + Sync>;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const BOOLEAN_PROPS: &[&str] = &["checked", "selected", "disabled", "multiple", "readonly"];

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
enum NodeData {
    Root,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    props: HashMap<String, Value>,
}

#[derive(Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    /// Arena slots released by `detach_children`, reused by `push_node`
    free: Vec<NodeId>,
    listeners: HashMap<(NodeId, String), Vec<Listener>>,
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &(self.nodes.len() - self.free.len()))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Empty document with only a root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
            free: Vec::new(),
            listeners: HashMap::new(),
        }
    }

    /// Parse HTML into a document
    ///
    /// Input containing an `<html>` tag or a doctype is parsed as a full
    /// document; anything else is treated as a body fragment whose top-level
    /// nodes become children of the root.
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_html(root, html);
        doc
    }

    /// Attach a listener for events of `kind` dispatched at or below `node`
    pub fn add_listener<F>(&mut self, node: NodeId, kind: &str, listener: F)
    where
        F: Fn(&mut DomEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry((node, kind.to_string()))
            .or_default()
            .push(Arc::new(listener));
    }

    /// First element matching `selector` anywhere in the document
    pub fn select_first(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query(self.root(), selector)?.into_iter().next())
    }

    fn append_html(&mut self, parent: NodeId, html: &str) {
        let lowered = html.to_ascii_lowercase();
        if lowered.contains("<html") || lowered.contains("<!doctype") {
            let parsed = Html::parse_document(html);
            let root_element = parsed.root_element();
            let id = self.push_element(parent, root_element);
            self.import_children(id, root_element);
        } else {
            let parsed = Html::parse_fragment(html);
            self.import_children(parent, parsed.root_element());
        }
    }

    fn import_children(&mut self, parent: NodeId, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                scraper::Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        let id = self.push_element(parent, child_element);
                        self.import_children(id, child_element);
                    }
                }
                scraper::Node::Text(text) => {
                    self.push_node(parent, NodeData::Text(String::from(&**text)));
                }
                _ => {}
            }
        }
    }

    fn push_element(&mut self, parent: NodeId, element: ElementRef<'_>) -> NodeId {
        let value = element.value();
        let data = ElementData {
            tag: value.name().to_ascii_lowercase(),
            attrs: value
                .attrs()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect(),
            props: HashMap::new(),
        };
        self.push_node(parent, NodeData::Element(data))
    }

    fn push_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let node = Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        };
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        id
    }

    /// Remove every node below `node` and release their slots
    fn detach_children(&mut self, node: NodeId) {
        let removed = self.descendants(node);
        if let Some(parent) = self.nodes.get_mut(node.0) {
            parent.children.clear();
        }
        for id in removed {
            self.nodes[id.0] = Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Text(String::new()),
            };
            self.free.push(id);
        }
        let free = &self.free;
        self.listeners.retain(|(id, _), _| !free.contains(id));
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Pre-order walk of every node strictly below `node`
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(node.0) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.nodes.get(id.0) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(|e| e.tag == "option"))
            .collect()
    }

    fn is_selected(&self, option: NodeId) -> bool {
        self.prop(option, "selected").as_bool().unwrap_or(false)
    }

    fn style(&self, node: NodeId) -> Vec<(String, String)> {
        self.attr(node, "style")
            .map(|style| parse_style(&style))
            .unwrap_or_default()
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else {
            return;
        };
        match &n.data {
            NodeData::Root => {
                for child in &n.children {
                    self.serialize(*child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(data) => {
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&data.tag.as_str()) {
                    return;
                }
                for child in &n.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn query(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect())
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|e| e.tag.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|child| self.element(*child).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match element.attrs.iter_mut().find(|(attr, _)| *attr == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name, value.to_string())),
        }
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attrs.retain(|(attr, _)| !attr.eq_ignore_ascii_case(name));
        }
    }

    fn prop(&self, node: NodeId, name: &str) -> Value {
        let Some(element) = self.element(node) else {
            return Value::Null;
        };
        if let Some(value) = element.props.get(name) {
            return value.clone();
        }

        match name {
            _ if BOOLEAN_PROPS.contains(&name) => Value::Bool(self.attr(node, name).is_some()),
            "value" => Value::String(self.value(node)),
            "tagName" | "nodeName" => Value::String(element.tag.to_ascii_uppercase()),
            "className" => Value::String(self.attr(node, "class").unwrap_or_default()),
            "id" => Value::String(self.attr(node, "id").unwrap_or_default()),
            "type" if element.tag == "input" => Value::String(
                self.attr(node, "type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string()),
            ),
            "textContent" | "innerText" => Value::String(self.text(node)),
            "innerHTML" => Value::String(self.inner_html(node)),
            "scrollTop" | "scrollLeft" => Value::from(0),
            _ => self.attr(node, name).map(Value::String).unwrap_or(Value::Null),
        }
    }

    fn set_prop(&mut self, node: NodeId, name: &str, value: Value) {
        if self.element(node).is_none() {
            return;
        }
        let as_text = || match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        match name {
            "value" => self.set_value(node, &as_text()),
            "className" => self.set_attr(node, "class", &as_text()),
            "id" => self.set_attr(node, "id", &as_text()),
            "textContent" | "innerText" => self.set_text(node, &as_text()),
            "innerHTML" => self.set_inner_html(node, &as_text()),
            _ => {
                if let Some(element) = self.element_mut(node) {
                    element.props.insert(name.to_string(), value);
                }
            }
        }
    }

    fn css(&self, node: NodeId, name: &str) -> Option<String> {
        self.style(node)
            .into_iter()
            .find(|(property, _)| property.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    fn set_css(&mut self, node: NodeId, name: &str, value: &str) {
        if self.element(node).is_none() {
            return;
        }
        let mut style = self.style(node);
        let name = name.to_ascii_lowercase();
        match style.iter_mut().find(|(property, _)| *property == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => style.push((name, value.to_string())),
        }
        self.set_attr(node, "style", &render_style(&style));
    }

    fn text(&self, node: NodeId) -> String {
        match self.nodes.get(node.0).map(|n| &n.data) {
            Some(NodeData::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(node)
                .into_iter()
                .filter_map(|id| match &self.nodes[id.0].data {
                    NodeData::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if self.element(node).is_none() {
            return;
        }
        self.detach_children(node);
        self.push_node(node, NodeData::Text(text.to_string()));
    }

    fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.nodes.get(node.0) {
            for child in &n.children {
                self.serialize(*child, &mut out);
            }
        }
        out
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) {
        if self.element(node).is_none() {
            return;
        }
        self.detach_children(node);
        self.append_html(node, html);
    }

    fn value(&self, node: NodeId) -> String {
        let Some(element) = self.element(node) else {
            return String::new();
        };
        if let Some(Value::String(value)) = element.props.get("value") {
            return value.clone();
        }

        match element.tag.as_str() {
            "input" => self.attr(node, "value").unwrap_or_else(|| {
                let kind = self.attr(node, "type").unwrap_or_default().to_ascii_lowercase();
                if kind == "checkbox" || kind == "radio" {
                    "on".to_string()
                } else {
                    String::new()
                }
            }),
            "textarea" => self.text(node),
            "option" => self
                .attr(node, "value")
                .unwrap_or_else(|| self.text(node).trim().to_string()),
            "select" => {
                let options = self.options(node);
                let selected = options.iter().find(|option| self.is_selected(**option));
                let multiple = self.attr(node, "multiple").is_some();
                match (selected, options.first()) {
                    (Some(option), _) => self.value(*option),
                    (None, Some(first)) if !multiple => self.value(*first),
                    _ => String::new(),
                }
            }
            _ => String::new(),
        }
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        let Some(tag) = self.tag_name(node) else {
            return;
        };
        if tag == "select" {
            for option in self.options(node) {
                let selected = self.value(option) == value;
                self.set_prop(option, "selected", Value::Bool(selected));
            }
            return;
        }
        if let Some(element) = self.element_mut(node) {
            element
                .props
                .insert("value".to_string(), Value::String(value.to_string()));
        }
    }

    fn dispatch(&mut self, node: NodeId, kind: &str) -> DispatchOutcome {
        let mut event = DomEvent::new(kind, node);
        let mut current = Some(node);

        while let Some(id) = current {
            let listeners = self
                .listeners
                .get(&(id, kind.to_string()))
                .cloned()
                .unwrap_or_default();
            event.current = id;
            for listener in listeners {
                listener(&mut event);
            }
            if event.propagation_stopped() {
                break;
            }
            current = self.parent(id);
        }

        DispatchOutcome {
            default_prevented: event.default_prevented(),
        }
    }
}

/// Parse an inline `style` attribute into ordered declarations
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            (!name.is_empty()).then(|| (name, value.to_string()))
        })
        .collect()
}

fn render_style(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_fragment_and_query() {
        let doc = MemoryDocument::parse("<ul><li>a</li><li>b</li></ul><span>c</span>");
        let items = doc.query(doc.root(), "ul li").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(doc.text(items[0]), "a");
        assert_eq!(doc.text(items[1]), "b");
        assert_eq!(doc.query(doc.root(), "span").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_full_document() {
        let doc = MemoryDocument::parse("<!DOCTYPE html><html><body><p id='x'>hi</p></body></html>");
        let p = doc.select_first("#x").unwrap().unwrap();
        assert_eq!(doc.text(p), "hi");
        assert_eq!(doc.query(doc.root(), "html body p").unwrap(), vec![p]);
    }

    #[test]
    fn test_query_is_scoped_to_descendants() {
        let doc = MemoryDocument::parse(
            r#"<div id="a"><span>1</span></div><div id="b"><span>2</span></div>"#,
        );
        let b = doc.select_first("#b").unwrap().unwrap();
        let spans = doc.query(b, "span").unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.text(spans[0]), "2");
    }

    #[test]
    fn test_escaped_attribute_selector() {
        let doc = MemoryDocument::parse(r#"<input ng:model="test.input" value="x">"#);
        let found = doc.query(doc.root(), r#":input[ng\:model="test.input"]"#).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(doc.value(found[0]), "x");
    }

    #[test]
    fn test_replacing_content_reuses_arena_slots() {
        let mut doc = MemoryDocument::parse(r#"<div id="d"><p>one</p><p>two</p></div>"#);
        let div = doc.select_first("#d").unwrap().unwrap();
        doc.set_inner_html(div, "<span>a</span><span>b</span>");
        let size = doc.nodes.len();

        for i in 0..10 {
            doc.set_inner_html(div, &format!("<span>{}</span><span>b</span>", i));
            doc.set_text(div, "plain");
            doc.set_inner_html(div, "<span>a</span><span>b</span>");
        }

        assert_eq!(doc.nodes.len(), size);
        assert_eq!(doc.inner_html(div), "<span>a</span><span>b</span>");
        assert_eq!(doc.query(doc.root(), "p").unwrap().len(), 0);
        assert_eq!(doc.query(div, "span").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let doc = MemoryDocument::parse("<div></div>");
        assert!(matches!(
            doc.query(doc.root(), "div["),
            Err(DomError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_attributes_and_css() {
        let mut doc = MemoryDocument::parse(r#"<div id="test" style="height: 30px; color: red"></div>"#);
        let div = doc.select_first("#test").unwrap().unwrap();

        assert_eq!(doc.css(div, "height").as_deref(), Some("30px"));
        doc.set_css(div, "height", "42px");
        assert_eq!(doc.css(div, "height").as_deref(), Some("42px"));
        assert_eq!(doc.css(div, "color").as_deref(), Some("red"));

        doc.set_attr(div, "data-role", "panel");
        assert_eq!(doc.attr(div, "data-role").as_deref(), Some("panel"));
        doc.remove_attr(div, "data-role");
        assert_eq!(doc.attr(div, "data-role"), None);
    }

    #[test]
    fn test_props_fall_back_to_attributes() {
        let mut doc = MemoryDocument::parse(r#"<input type="checkbox" checked class="c">"#);
        let input = doc.select_first("input").unwrap().unwrap();

        assert_eq!(doc.prop(input, "checked"), json!(true));
        assert_eq!(doc.prop(input, "className"), json!("c"));
        assert_eq!(doc.prop(input, "type"), json!("checkbox"));

        doc.set_prop(input, "checked", json!(false));
        assert_eq!(doc.prop(input, "checked"), json!(false));
        assert!(doc.query(doc.root(), ":checked").unwrap().is_empty());
    }

    #[test]
    fn test_text_and_inner_html() {
        let mut doc = MemoryDocument::parse(r#"<div id="d"><b>bold</b> text</div>"#);
        let div = doc.select_first("#d").unwrap().unwrap();
        assert_eq!(doc.text(div), "bold text");
        assert_eq!(doc.inner_html(div), "<b>bold</b> text");

        doc.set_inner_html(div, "<i>new</i>");
        assert_eq!(doc.inner_html(div), "<i>new</i>");
        assert_eq!(doc.query(doc.root(), "b").unwrap().len(), 0);

        doc.set_text(div, "a < b");
        assert_eq!(doc.text(div), "a < b");
        assert_eq!(doc.inner_html(div), "a &lt; b");
    }

    #[test]
    fn test_select_value() {
        let mut doc = MemoryDocument::parse(
            r#"<select><option value="A">one</option><option value="B">two</option></select>"#,
        );
        let select = doc.select_first("select").unwrap().unwrap();
        assert_eq!(doc.value(select), "A");

        doc.set_value(select, "B");
        assert_eq!(doc.value(select), "B");
        assert_eq!(doc.query(select, ":selected").unwrap().len(), 1);
    }

    #[test]
    fn test_dispatch_bubbles_and_prevents_default() {
        let mut doc = MemoryDocument::parse(r##"<div id="outer"><a id="link" href="#x">go</a></div>"##);
        let outer = doc.select_first("#outer").unwrap().unwrap();
        let link = doc.select_first("#link").unwrap().unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        doc.add_listener(outer, "click", move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            event.prevent_default();
        });

        let outcome = doc.dispatch(link, "click");
        assert!(outcome.default_prevented);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        let outcome = doc.dispatch(outer, "change");
        assert!(!outcome.default_prevented);
    }

    #[test]
    fn test_parse_style() {
        assert_eq!(
            parse_style("top: 1px;; LEFT:2px"),
            vec![
                ("top".to_string(), "1px".to_string()),
                ("left".to_string(), "2px".to_string())
            ]
        );
    }
}
