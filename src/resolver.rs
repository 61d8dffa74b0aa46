//! Composable predicates over resources.
//!
//! Every variant satisfies the single [`Resolver`] contract; combinators
//! are used by lookup and validation code through
//! [`crate::graph::Graph::resolve_resources`].

use regex::Regex;

use crate::resource::Resource;
use crate::schema::PropertyValue;

pub trait Resolver {
    fn matches(&self, resource: &Resource) -> bool;
}

/// True iff the resource kind equals `kind`.
pub struct ByType {
    pub kind: String,
}

impl ByType {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
        }
    }
}

impl Resolver for ByType {
    fn matches(&self, resource: &Resource) -> bool {
        resource.kind() == self.kind
    }
}

/// True iff the decoded property equals the value (string compare for
/// strings, exact equality otherwise).
pub struct ByProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl ByProperty {
    pub fn new(name: &str, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.to_owned(),
            value: value.into(),
        }
    }
}

impl Resolver for ByProperty {
    fn matches(&self, resource: &Resource) -> bool {
        resource.properties.get(&self.name) == Some(&self.value)
    }
}

/// True iff the printed property value contains the needle,
/// case-insensitively.
pub struct ByPropertyMatch {
    name: String,
    pattern: Regex,
}

impl ByPropertyMatch {
    pub fn new(name: &str, needle: &str) -> Self {
        Self {
            name: name.to_owned(),
            pattern: Regex::new(&format!("(?i){}", regex::escape(needle))).unwrap(),
        }
    }
}

impl Resolver for ByPropertyMatch {
    fn matches(&self, resource: &Resource) -> bool {
        resource
            .properties
            .get(&self.name)
            .map(|value| self.pattern.is_match(&value.to_string()))
            .unwrap_or(false)
    }
}

/// True iff every child resolver matches. An empty set is vacuously true;
/// callers compose at least one child to get a useful predicate.
pub struct And {
    pub resolvers: Vec<Box<dyn Resolver>>,
}

impl And {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }
}

impl Resolver for And {
    fn matches(&self, resource: &Resource) -> bool {
        self.resolvers.iter().all(|r| r.matches(resource))
    }
}
