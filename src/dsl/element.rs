//! `element(selector)` chains
//!
//! Property accessors and key/value accessors are described by two static
//! tables. Every getter enqueues `element '<label>' <verb>`, every setter
//! `element '<label>' set <verb>`, so the future log tells them apart.

use std::fmt;
use std::str::FromStr;

use futures::FutureExt;
use serde_json::{json, Value};

use super::{locator::Locator, notify, number, text_of};
use crate::dom::{Document, NodeId, SharedDocument};
use crate::engine::{ActionEnv, Done, DslError, ExecutionContext, FutureHandle, Outcome};

type Getter = fn(&dyn Document, NodeId) -> Value;
type Setter = fn(&mut dyn Document, NodeId, &Value);

/// Property accessors available on an element chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Val,
    Text,
    Html,
    Height,
    InnerHeight,
    OuterHeight,
    Width,
    InnerWidth,
    OuterWidth,
    Position,
    ScrollLeft,
    ScrollTop,
    Offset,
}

struct PropertyMethod {
    property: Property,
    name: &'static str,
    get: Getter,
    set: Option<Setter>,
}

/// Indexed by `Property as usize`
static PROPERTY_METHODS: [PropertyMethod; 13] = [
    PropertyMethod { property: Property::Val, name: "val", get: get_val, set: Some(set_val) },
    PropertyMethod { property: Property::Text, name: "text", get: get_text, set: Some(set_text) },
    PropertyMethod { property: Property::Html, name: "html", get: get_html, set: Some(set_html) },
    PropertyMethod { property: Property::Height, name: "height", get: get_height, set: Some(set_height) },
    PropertyMethod { property: Property::InnerHeight, name: "innerHeight", get: get_inner_height, set: Some(set_inner_height) },
    PropertyMethod { property: Property::OuterHeight, name: "outerHeight", get: get_outer_height, set: Some(set_outer_height) },
    PropertyMethod { property: Property::Width, name: "width", get: get_width, set: Some(set_width) },
    PropertyMethod { property: Property::InnerWidth, name: "innerWidth", get: get_inner_width, set: Some(set_inner_width) },
    PropertyMethod { property: Property::OuterWidth, name: "outerWidth", get: get_outer_width, set: Some(set_outer_width) },
    PropertyMethod { property: Property::Position, name: "position", get: get_position, set: None },
    PropertyMethod { property: Property::ScrollLeft, name: "scrollLeft", get: get_scroll_left, set: Some(set_scroll_left) },
    PropertyMethod { property: Property::ScrollTop, name: "scrollTop", get: get_scroll_top, set: Some(set_scroll_top) },
    PropertyMethod { property: Property::Offset, name: "offset", get: get_offset, set: Some(set_offset) },
];

impl Property {
    pub const ALL: [Property; 13] = [
        Property::Val,
        Property::Text,
        Property::Html,
        Property::Height,
        Property::InnerHeight,
        Property::OuterHeight,
        Property::Width,
        Property::InnerWidth,
        Property::OuterWidth,
        Property::Position,
        Property::ScrollLeft,
        Property::ScrollTop,
        Property::Offset,
    ];

    fn method(self) -> &'static PropertyMethod {
        &PROPERTY_METHODS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.method().name
    }

    pub fn is_settable(self) -> bool {
        self.method().set.is_some()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PROPERTY_METHODS
            .iter()
            .find(|method| method.name == s)
            .map(|method| method.property)
            .ok_or_else(|| format!("unknown element property '{}'", s))
    }
}

/// Accessors taking a key: attributes, inline CSS and live properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Attr,
    Css,
    Prop,
}

impl KeyValue {
    pub const ALL: [KeyValue; 3] = [KeyValue::Attr, KeyValue::Css, KeyValue::Prop];

    pub fn name(self) -> &'static str {
        match self {
            KeyValue::Attr => "attr",
            KeyValue::Css => "css",
            KeyValue::Prop => "prop",
        }
    }

    fn get(self, doc: &dyn Document, node: NodeId, key: &str) -> Value {
        match self {
            KeyValue::Attr => doc.attr(node, key).map(Value::String).unwrap_or(Value::Null),
            KeyValue::Css => doc.css(node, key).map(Value::String).unwrap_or(Value::Null),
            KeyValue::Prop => doc.prop(node, key),
        }
    }

    fn set(self, doc: &mut dyn Document, node: NodeId, key: &str, value: &Value) {
        match self {
            KeyValue::Attr if value.is_null() => doc.remove_attr(node, key),
            KeyValue::Attr => doc.set_attr(node, key, &text_of(value)),
            KeyValue::Css => doc.set_css(node, key, &css_text(value)),
            KeyValue::Prop => doc.set_prop(node, key, value.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyValue::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| format!("unknown element accessor '{}'", s))
    }
}

macro_rules! property_methods {
    ($($get:ident / $set:ident => $property:ident),* $(,)?) => {
        $(
            pub fn $get(&self) -> FutureHandle {
                self.get(Property::$property)
            }

            pub fn $set(&self, value: impl Into<Value>) -> FutureHandle {
                self.set(Property::$property, value)
            }
        )*
    };
}

/// Chain over the elements matching a selector
#[derive(Debug, Clone)]
pub struct Element {
    ctx: ExecutionContext,
    locator: Locator,
}

impl Element {
    pub(crate) fn new(ctx: ExecutionContext, locator: Locator) -> Self {
        Self { ctx, locator }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.locator = self.locator.labeled(label);
        self
    }

    pub fn label(&self) -> &str {
        self.locator.label()
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Read `property` from the first match; `null` when nothing matches
    pub fn get(&self, property: Property) -> FutureHandle {
        let name = format!("element '{}' {}", self.label(), property);
        let locator = self.locator.clone();
        self.ctx
            .add_future_action(name, move |env| get_property(env, locator, property))
    }

    /// Write `property` on every match
    pub fn set(&self, property: Property, value: impl Into<Value>) -> FutureHandle {
        let name = format!("element '{}' set {}", self.label(), property);
        let locator = self.locator.clone();
        let value = value.into();
        self.ctx
            .add_future_action(name, move |env| set_property(env, locator, property, value))
    }

    pub fn get_key(&self, method: KeyValue, key: &str) -> FutureHandle {
        let name = format!("element '{}' get {} '{}'", self.label(), method, key);
        let locator = self.locator.clone();
        let key = key.to_string();
        self.ctx.add_future_action(name, move |env| async move {
            let nodes = locator.find(&env)?;
            let doc = env.document.read();
            let value = nodes
                .first()
                .map(|node| method.get(&*doc, *node, &key))
                .unwrap_or(Value::Null);
            Ok(Outcome::Resolved(value))
        })
    }

    pub fn set_key(&self, method: KeyValue, key: &str, value: impl Into<Value>) -> FutureHandle {
        let value = value.into();
        let name = format!(
            "element '{}' set {} '{}' to '{}'",
            self.label(),
            method,
            key,
            text_of(&value)
        );
        let locator = self.locator.clone();
        let key = key.to_string();
        self.ctx.add_future_action(name, move |env| async move {
            let nodes = locator.find(&env)?;
            let mut doc = env.document.write();
            for node in nodes {
                method.set(&mut *doc, node, &key, &value);
            }
            Ok(Outcome::Resolved(Value::Null))
        })
    }

    pub fn attr(&self, key: &str) -> FutureHandle {
        self.get_key(KeyValue::Attr, key)
    }

    pub fn set_attr(&self, key: &str, value: impl Into<Value>) -> FutureHandle {
        self.set_key(KeyValue::Attr, key, value)
    }

    pub fn css(&self, key: &str) -> FutureHandle {
        self.get_key(KeyValue::Css, key)
    }

    pub fn set_css(&self, key: &str, value: impl Into<Value>) -> FutureHandle {
        self.set_key(KeyValue::Css, key, value)
    }

    pub fn prop(&self, key: &str) -> FutureHandle {
        self.get_key(KeyValue::Prop, key)
    }

    pub fn set_prop(&self, key: &str, value: impl Into<Value>) -> FutureHandle {
        self.set_key(KeyValue::Prop, key, value)
    }

    property_methods! {
        val / set_val => Val,
        text / set_text => Text,
        html / set_html => Html,
        height / set_height => Height,
        inner_height / set_inner_height => InnerHeight,
        outer_height / set_outer_height => OuterHeight,
        width / set_width => Width,
        inner_width / set_inner_width => InnerWidth,
        outer_width / set_outer_width => OuterWidth,
        position / set_position => Position,
        scroll_left / set_scroll_left => ScrollLeft,
        scroll_top / set_scroll_top => ScrollTop,
        offset / set_offset => Offset,
    }

    /// Click every match, then follow the first match if it is a link
    /// whose click was not cancelled
    pub fn click(&self) -> FutureHandle {
        let name = format!("element '{}' click", self.label());
        let locator = self.locator.clone();
        self.ctx
            .add_future_action(name, move |env| click(env, locator))
    }

    /// Number of matches; zero is not an error
    pub fn count(&self) -> FutureHandle {
        let name = format!("element '{}' count", self.label());
        let locator = self.locator.clone();
        self.ctx.add_future_action(name, move |env| async move {
            let count = locator.find(&env)?.len();
            Ok(Outcome::Resolved(Value::from(count)))
        })
    }

    /// Hand the matches to custom code that settles the future itself
    pub fn query<F>(&self, f: F) -> FutureHandle
    where
        F: FnOnce(Vec<NodeId>, SharedDocument, Done) + Send + 'static,
    {
        let name = format!("element '{}' custom query", self.label());
        let locator = self.locator.clone();
        self.ctx.add_future(name, move |ctx, done| {
            async move {
                let env = ActionEnv::new(ctx);
                let nodes = locator.find(&env)?;
                f(nodes, env.document.clone(), done);
                Ok(())
            }
            .boxed()
        })
    }
}

async fn get_property(
    env: ActionEnv,
    locator: Locator,
    property: Property,
) -> Result<Outcome, DslError> {
    let nodes = locator.find(&env)?;
    let doc = env.document.read();
    let value = nodes
        .first()
        .map(|node| (property.method().get)(&*doc, *node))
        .unwrap_or(Value::Null);
    Ok(Outcome::Resolved(value))
}

async fn set_property(
    env: ActionEnv,
    locator: Locator,
    property: Property,
    value: Value,
) -> Result<Outcome, DslError> {
    let Some(setter) = property.method().set else {
        return Ok(Outcome::Failed(format!("{} cannot be set", property)));
    };

    let nodes = locator.find(&env)?;
    {
        let mut doc = env.document.write();
        for node in &nodes {
            setter(&mut *doc, *node, &value);
        }
    }
    if property == Property::Val && !nodes.is_empty() {
        notify(env.app.as_ref());
    }
    Ok(Outcome::Resolved(Value::Null))
}

async fn click(env: ActionEnv, locator: Locator) -> Result<Outcome, DslError> {
    let nodes = locator.find(&env)?;
    let Some(&first) = nodes.first() else {
        return Ok(Outcome::Resolved(Value::Null));
    };

    let follow = {
        let mut doc = env.document.write();
        let mut prevented = false;
        for node in &nodes {
            let outcome = doc.dispatch(*node, "click");
            if *node == first {
                prevented = outcome.default_prevented;
            }
        }
        let is_anchor = doc.tag_name(first).as_deref() == Some("a");
        match doc.attr(first, "href") {
            Some(href) if is_anchor && !prevented => Some(href),
            _ => None,
        }
    };

    let Some(href) = follow else {
        return Ok(Outcome::Resolved(Value::Null));
    };
    let target = same_document_target(env.app.location().without_fragment(), &href);
    match env.app.navigate_to(&target).await {
        Ok(_) => Ok(Outcome::Resolved(Value::Null)),
        Err(e) => Ok(Outcome::Failed(e.to_string())),
    }
}

/// Reduce an href pointing into the current document to its fragment
fn same_document_target(current: &str, href: &str) -> String {
    match href.split_once('#') {
        Some((base, fragment)) if base.is_empty() || base == current => format!("#{}", fragment),
        _ => href.to_string(),
    }
}

fn get_val(doc: &dyn Document, node: NodeId) -> Value {
    if doc.tag_name(node).as_deref() == Some("select") && doc.attr(node, "multiple").is_some() {
        let selected = doc
            .query(node, "option")
            .unwrap_or_default()
            .into_iter()
            .filter(|option| doc.prop(*option, "selected").as_bool().unwrap_or(false))
            .map(|option| Value::String(doc.value(option)))
            .collect();
        return Value::Array(selected);
    }
    Value::String(doc.value(node))
}

fn set_val(doc: &mut dyn Document, node: NodeId, value: &Value) {
    if let Value::Array(values) = value {
        let wanted: Vec<String> = values.iter().map(text_of).collect();
        for option in doc.query(node, "option").unwrap_or_default() {
            let selected = wanted.contains(&doc.value(option));
            doc.set_prop(option, "selected", Value::Bool(selected));
        }
        return;
    }
    doc.set_value(node, &text_of(value));
}

fn get_text(doc: &dyn Document, node: NodeId) -> Value {
    Value::String(doc.text(node))
}

fn set_text(doc: &mut dyn Document, node: NodeId, value: &Value) {
    doc.set_text(node, &text_of(value));
}

fn get_html(doc: &dyn Document, node: NodeId) -> Value {
    Value::String(doc.inner_html(node))
}

fn set_html(doc: &mut dyn Document, node: NodeId, value: &Value) {
    doc.set_inner_html(node, &text_of(value));
}

/// Pixel value of an inline style declaration, 0 when absent
fn px(doc: &dyn Document, node: NodeId, name: &str) -> f64 {
    doc.css(node, name)
        .and_then(|value| value.trim().trim_end_matches("px").trim().parse().ok())
        .unwrap_or(0.0)
}

fn css_text(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{}px", n),
        other => text_of(other),
    }
}

fn padding(doc: &dyn Document, node: NodeId, sides: [&str; 2]) -> f64 {
    sides
        .iter()
        .map(|side| px(doc, node, &format!("padding-{}", side)))
        .sum()
}

fn border(doc: &dyn Document, node: NodeId, sides: [&str; 2]) -> f64 {
    sides
        .iter()
        .map(|side| px(doc, node, &format!("border-{}-width", side)))
        .sum()
}

const VERTICAL: [&str; 2] = ["top", "bottom"];
const HORIZONTAL: [&str; 2] = ["left", "right"];

/// Write a dimension after removing the extra box space
fn set_dimension(doc: &mut dyn Document, node: NodeId, name: &str, value: &Value, extra: f64) {
    match value.as_f64() {
        Some(size) => doc.set_css(node, name, &format!("{}px", (size - extra).max(0.0))),
        None => doc.set_css(node, name, &text_of(value)),
    }
}

fn get_height(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "height"))
}

fn set_height(doc: &mut dyn Document, node: NodeId, value: &Value) {
    set_dimension(doc, node, "height", value, 0.0);
}

fn get_inner_height(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "height") + padding(doc, node, VERTICAL))
}

fn set_inner_height(doc: &mut dyn Document, node: NodeId, value: &Value) {
    let extra = padding(doc, node, VERTICAL);
    set_dimension(doc, node, "height", value, extra);
}

fn get_outer_height(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "height") + padding(doc, node, VERTICAL) + border(doc, node, VERTICAL))
}

fn set_outer_height(doc: &mut dyn Document, node: NodeId, value: &Value) {
    let extra = padding(doc, node, VERTICAL) + border(doc, node, VERTICAL);
    set_dimension(doc, node, "height", value, extra);
}

fn get_width(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "width"))
}

fn set_width(doc: &mut dyn Document, node: NodeId, value: &Value) {
    set_dimension(doc, node, "width", value, 0.0);
}

fn get_inner_width(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "width") + padding(doc, node, HORIZONTAL))
}

fn set_inner_width(doc: &mut dyn Document, node: NodeId, value: &Value) {
    let extra = padding(doc, node, HORIZONTAL);
    set_dimension(doc, node, "width", value, extra);
}

fn get_outer_width(doc: &dyn Document, node: NodeId) -> Value {
    number(px(doc, node, "width") + padding(doc, node, HORIZONTAL) + border(doc, node, HORIZONTAL))
}

fn set_outer_width(doc: &mut dyn Document, node: NodeId, value: &Value) {
    let extra = padding(doc, node, HORIZONTAL) + border(doc, node, HORIZONTAL);
    set_dimension(doc, node, "width", value, extra);
}

fn get_position(doc: &dyn Document, node: NodeId) -> Value {
    json!({ "top": number(px(doc, node, "top")), "left": number(px(doc, node, "left")) })
}

fn get_scroll_left(doc: &dyn Document, node: NodeId) -> Value {
    doc.prop(node, "scrollLeft")
}

fn set_scroll_left(doc: &mut dyn Document, node: NodeId, value: &Value) {
    doc.set_prop(node, "scrollLeft", number(value.as_f64().unwrap_or(0.0)));
}

fn get_scroll_top(doc: &dyn Document, node: NodeId) -> Value {
    doc.prop(node, "scrollTop")
}

fn set_scroll_top(doc: &mut dyn Document, node: NodeId, value: &Value) {
    doc.set_prop(node, "scrollTop", number(value.as_f64().unwrap_or(0.0)));
}

/// Position relative to the document: inline offsets summed up the tree
fn get_offset(doc: &dyn Document, node: NodeId) -> Value {
    let (mut top, mut left) = (0.0, 0.0);
    let mut current = Some(node);
    while let Some(id) = current {
        top += px(doc, id, "top");
        left += px(doc, id, "left");
        current = doc.parent(id);
    }
    json!({ "top": number(top), "left": number(left) })
}

fn set_offset(doc: &mut dyn Document, node: NodeId, value: &Value) {
    let Some(coords) = value.as_object() else {
        return;
    };
    let parent_offset = doc
        .parent(node)
        .map(|parent| get_offset(&*doc, parent))
        .unwrap_or_else(|| json!({ "top": 0, "left": 0 }));

    for side in ["top", "left"] {
        if let Some(target) = coords.get(side).and_then(Value::as_f64) {
            let base = parent_offset[side].as_f64().unwrap_or(0.0);
            doc.set_css(node, side, &format!("{}px", target - base));
        }
    }
    if doc.css(node, "position").is_none() {
        doc.set_css(node, "position", "relative");
    }
}
