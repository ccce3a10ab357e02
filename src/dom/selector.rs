//! CSS selector parsing and matching
//!
//! Supports type, universal, id, class and attribute selectors (with
//! backslash escapes such as `ng\:model`), a handful of form pseudo-classes,
//! descendant and child combinators, and comma-separated selector lists.
//! Matching is done against any [`Document`], right to left.

use super::{Document, DomError, NodeId};

/// Comma-separated list of selectors; matches if any member matches
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, stored left to right.
///
/// The combinator on each part links it to the part before it; the first
/// part's combinator is unused.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub parts: Vec<(Combinator, CompoundSelector)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
    pub pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSelector {
    pub name: String,
    pub op: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
    DashMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    Input,
    Checked,
    Selected,
    Disabled,
    Radio,
    Checkbox,
    FirstChild,
    LastChild,
}

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self, DomError> {
        Parser::new(selector).parse_list()
    }

    pub fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        self.0.iter().any(|complex| complex.matches(doc, node))
    }
}

impl ComplexSelector {
    pub fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        matches_parts(doc, node, &self.parts)
    }
}

fn matches_parts(doc: &dyn Document, node: NodeId, parts: &[(Combinator, CompoundSelector)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return false;
    };
    if !compound.matches(doc, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match combinator {
        Combinator::Child => doc
            .parent(node)
            .map_or(false, |parent| matches_parts(doc, parent, rest)),
        Combinator::Descendant => {
            let mut current = doc.parent(node);
            while let Some(ancestor) = current {
                if matches_parts(doc, ancestor, rest) {
                    return true;
                }
                current = doc.parent(ancestor);
            }
            false
        }
    }
}

impl CompoundSelector {
    pub fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };

        if let Some(expected) = &self.tag {
            if *expected != tag {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = doc.attr(node, "id");
            if !self.ids.iter().all(|expected| id.as_deref() == Some(expected.as_str())) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class = doc.attr(node, "class").unwrap_or_default();
            let has_class = |name: &String| class.split_whitespace().any(|c| c == name);
            if !self.classes.iter().all(has_class) {
                return false;
            }
        }

        self.attrs.iter().all(|attr| attr.matches(doc, node))
            && self
                .pseudos
                .iter()
                .all(|pseudo| pseudo.matches(doc, node, &tag))
    }
}

impl AttrSelector {
    fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        let Some(actual) = doc.attr(node, &self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.op else {
            return true;
        };

        match op {
            AttrOp::Equals => actual == *expected,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
            AttrOp::DashMatch => {
                actual == *expected || actual.starts_with(&format!("{}-", expected))
            }
        }
    }
}

impl Pseudo {
    fn matches(&self, doc: &dyn Document, node: NodeId, tag: &str) -> bool {
        let input_type = || {
            doc.attr(node, "type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string())
        };

        match self {
            Pseudo::Input => matches!(tag, "input" | "textarea" | "select" | "button"),
            Pseudo::Checked => doc.prop(node, "checked").as_bool().unwrap_or(false),
            Pseudo::Selected => doc.prop(node, "selected").as_bool().unwrap_or(false),
            Pseudo::Disabled => doc.attr(node, "disabled").is_some(),
            Pseudo::Radio => tag == "input" && input_type() == "radio",
            Pseudo::Checkbox => tag == "input" && input_type() == "checkbox",
            Pseudo::FirstChild => siblings(doc, node).first() == Some(&node),
            Pseudo::LastChild => siblings(doc, node).last() == Some(&node),
        }
    }
}

fn siblings(doc: &dyn Document, node: NodeId) -> Vec<NodeId> {
    doc.parent(node)
        .map(|parent| doc.children(parent))
        .unwrap_or_default()
}

/// Escape a string for use as a quoted attribute value
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Escape an identifier (attribute or tag name) for use in a selector
pub fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for c in ident.chars() {
        if !(c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::InvalidSelector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> Result<(), DomError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Returns true if any whitespace was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<SelectorList, DomError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                None => break,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(SelectorList(list))
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, DomError> {
        let mut parts = vec![(Combinator::Descendant, self.parse_compound()?)];

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            parts.push((combinator, self.parse_compound()?));
        }

        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, DomError> {
        let mut compound = CompoundSelector::default();
        let mut empty = true;

        if self.peek() == Some('*') {
            self.bump();
            empty = false;
        } else if self.at_ident_start() {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            empty = false;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.bump();
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn at_ident_start(&self) -> bool {
        matches!(self.peek(), Some(c) if is_ident_char(c) || c == '\\')
    }

    fn parse_ident(&mut self) -> Result<String, DomError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                let escaped = self
                    .bump()
                    .ok_or_else(|| self.error("dangling escape"))?;
                ident.push(escaped);
            } else if is_ident_char(c) {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, DomError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("dangling escape"))?;
                    value.push(escaped);
                }
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, DomError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.bump() {
            Some(']') => return Ok(AttrSelector { name, op: None }),
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '^' | '$' | '*' | '|')) => {
                self.eat('=')?;
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => AttrOp::DashMatch,
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.parse_quoted(q)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_ws();
        self.eat(']')?;

        Ok(AttrSelector {
            name,
            op: Some((op, value)),
        })
    }

    fn parse_pseudo(&mut self) -> Result<Pseudo, DomError> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "input" => Ok(Pseudo::Input),
            "checked" => Ok(Pseudo::Checked),
            "selected" => Ok(Pseudo::Selected),
            "disabled" => Ok(Pseudo::Disabled),
            "radio" => Ok(Pseudo::Radio),
            "checkbox" => Ok(Pseudo::Checkbox),
            "first-child" => Ok(Pseudo::FirstChild),
            "last-child" => Ok(Pseudo::LastChild),
            other => Err(self.error(format!("unsupported pseudo-class ':{}'", other))),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
