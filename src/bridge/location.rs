//! Raw browser location

use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use super::BridgeError;

/// A location href as the browser reports it
///
/// Absolute hrefs are parsed with `url`; relative ones (as seen in frames
/// that were never navigated) are split by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    href: String,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl Location {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    fn parsed(&self) -> Option<Url> {
        Url::parse(&self.href).ok()
    }

    pub fn pathname(&self) -> String {
        match self.parsed() {
            Some(url) => url.path().to_string(),
            None => {
                let end = self.href.find(|c: char| c == '?' || c == '#').unwrap_or(self.href.len());
                self.href[..end].to_string()
            }
        }
    }

    /// Query string including the leading `?`, or empty
    pub fn search(&self) -> String {
        match self.parsed() {
            Some(url) => url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
            None => {
                let without_hash = strip_fragment(&self.href);
                without_hash
                    .find('?')
                    .map(|start| without_hash[start..].to_string())
                    .unwrap_or_default()
            }
        }
    }

    /// Fragment without the leading `#`
    pub fn hash(&self) -> String {
        match self.parsed() {
            Some(url) => url.fragment().unwrap_or_default().to_string(),
            None => self
                .href
                .split_once('#')
                .map(|(_, hash)| hash.to_string())
                .unwrap_or_default(),
        }
    }

    /// Query parameters as a JSON object; repeated keys keep the last value
    pub fn query_object(&self) -> Value {
        let search = self.search();
        let pairs = url::form_urlencoded::parse(search.trim_start_matches('?').as_bytes());
        let map: Map<String, Value> = pairs
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        Value::Object(map)
    }

    /// Href with any fragment removed
    pub fn without_fragment(&self) -> &str {
        strip_fragment(&self.href)
    }

    /// Resolve `target` against this location
    ///
    /// Absolute targets are kept exactly as given.
    pub fn resolve(&self, target: &str) -> Result<Location, BridgeError> {
        let target = target.trim();
        if target.is_empty() {
            return Ok(self.clone());
        }
        if Url::parse(target).is_ok() {
            return Ok(Location::new(target));
        }

        match self.parsed() {
            Some(base) => base
                .join(target)
                .map(|url| Location::new(url.as_str()))
                .map_err(|e| {
                    BridgeError::Navigation(format!(
                        "cannot resolve '{}' against '{}': {}",
                        target, self.href, e
                    ))
                }),
            None => Ok(Location::new(resolve_relative(&self.href, target))),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.href)
    }
}

fn strip_fragment(href: &str) -> &str {
    href.split_once('#').map_or(href, |(base, _)| base)
}

fn resolve_relative(base: &str, target: &str) -> String {
    let without_hash = strip_fragment(base);
    if target.starts_with('#') {
        return format!("{}{}", without_hash, target);
    }

    let without_query = without_hash
        .split_once('?')
        .map_or(without_hash, |(path, _)| path);
    if target.starts_with('?') {
        format!("{}{}", without_query, target)
    } else if target.starts_with('/') {
        target.to_string()
    } else {
        match without_query.rfind('/') {
            Some(slash) => format!("{}{}", &without_query[..=slash], target),
            None => target.to_string(),
        }
    }
}
