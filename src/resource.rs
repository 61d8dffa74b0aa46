//! Typed cloud entities and their property bags.
//!
//! A [`Resource`] is identified by `(id, kind)` and nothing else: two
//! resources are the same iff both match, regardless of property content.
//! `properties` holds business data and `meta` holds engine-internal
//! annotations; the two bags never mix and each resource owns its bags
//! exclusively (snapshots copy, they never share).

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::schema::{self, PropertyValue};
use crate::store::{Triple, TripleStore, CLASS_PREFIX, META_PREFIX, TYPE_PREDICATE};

// ------------- Properties -------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    /// The pairs present here that are absent or different in `other`.
    pub fn subtract(&self, other: &Properties) -> Properties {
        let mut sub = Properties::new();
        for (key, value) in &self.0 {
            if other.0.get(key) != Some(value) {
                sub.0.insert(key.clone(), value.clone());
            }
        }
        sub
    }
}

impl From<BTreeMap<String, PropertyValue>> for Properties {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        Properties(map)
    }
}

// ------------- Resource -------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: String,
    kind: String,
    pub properties: Properties,
    pub meta: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: Properties::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Builder-style property assignment, handy when seeding graphs.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Identity comparison on `(id, kind)` only.
    pub fn same(&self, other: &Resource) -> bool {
        self.id == other.id && self.kind == other.kind
    }

    /// Statements for this resource: its type statement, then one or more
    /// statements per property and meta entry.
    pub fn marshal_triples(&self) -> Result<Vec<Triple>> {
        let mut triples = vec![Triple::node(
            &self.id,
            TYPE_PREDICATE,
            format!("{}{}", CLASS_PREFIX, kind_to_class(&self.kind)),
        )];
        for (key, value) in self.properties.iter() {
            triples.extend(schema::encode(&self.id, key, value)?);
        }
        for (key, value) in &self.meta {
            triples.push(Triple::text(&self.id, format!("{}{}", META_PREFIX, key), value));
        }
        Ok(triples)
    }

    /// Rebuilds the resource from the statements held by a store. The
    /// caller is responsible for having checked the type statement.
    pub fn unmarshal_from(store: &TripleStore, id: &str, kind: &str) -> Result<Resource> {
        let (properties, meta) = schema::decode_properties(store, id)?;
        Ok(Resource {
            id: id.to_owned(),
            kind: kind.to_owned(),
            properties: Properties(properties),
            meta,
        })
    }
}

/// Identity comparison tolerating absent resources, as lookups return
/// options: both absent compare equal, one absent never does.
pub fn same(a: Option<&Resource>, b: Option<&Resource>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same(b),
        _ => false,
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.id.is_empty() && self.kind.is_empty() {
            return write!(f, "[none]");
        }
        match self.properties.get("Name") {
            Some(PropertyValue::Text(name)) if !name.is_empty() => {
                write!(f, "@{}[{}]", name, self.kind)
            }
            _ => write!(f, "{}[{}]", self.id, self.kind),
        }
    }
}

pub fn sort_by_id(resources: &mut [Resource]) {
    resources.sort_by(|a, b| a.id().cmp(b.id()));
}

// ------------- Kind <-> class naming -------------

pub fn kind_to_class(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn class_to_kind(class: &str) -> String {
    let mut chars = class.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
