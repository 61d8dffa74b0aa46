//! The resource graph: typed resources and relations over a triple store.
//!
//! A graph always carries an implicit region root resource, so an empty
//! graph marshals to exactly one statement typing that root. Two relation
//! kinds exist: `parent_of` for structural containment (region → vpc →
//! subnet → instance) and `applies_on` for cross-resource association
//! (a security group applies on an instance). Relations reference
//! resources by id only; an edge to a resource the graph does not hold is
//! storable, and traversal over it simply yields nothing.
//!
//! Graphs are single-writer while being built and read-mostly afterwards;
//! that contract is the caller's, the graph itself holds no locks.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::error::{Result, StratusError};
use crate::resolver::Resolver;
use crate::resource::{class_to_kind, kind_to_class, Resource};
use crate::schema::PropertyValue;
use crate::store::{Triple, TripleStore, APPLIES_ON, CLASS_PREFIX, PARENT_OF, TYPE_PREDICATE};

pub const REGION_KIND: &str = "region";
pub const DEFAULT_REGION: &str = "default";

// The containment model is intended to be acyclic; the bound is there so
// cyclic data cannot wedge a walk.
const MAX_TRAVERSAL_DEPTH: usize = 128;

/// Predicate over resources used by [`Graph::filter`].
pub type FilterFn = Box<dyn Fn(&Resource) -> bool>;

/// Lookup of the live graph to resolve against, keyed by resource kind.
pub type GraphLookup<'a> = &'a dyn Fn(&str) -> Option<&'a Graph>;

#[derive(Debug)]
pub struct Graph {
    store: TripleStore,
    region: String,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Graph {
        Graph::in_region(DEFAULT_REGION)
    }

    pub fn in_region(region: &str) -> Graph {
        let mut store = TripleStore::new();
        store.add([region_type_triple(region)]);
        Graph {
            store,
            region: region.to_owned(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn root_resource(&self) -> Resource {
        Resource::new(&self.region, REGION_KIND)
    }

    pub fn store(&self) -> &TripleStore {
        &self.store
    }

    // ------------- Populating -------------

    pub fn add_resource(&mut self, resource: &Resource) -> Result<()> {
        let triples = resource.marshal_triples()?;
        debug!(id = resource.id(), kind = resource.kind(), statements = triples.len(), "adding resource");
        self.store.add(triples);
        Ok(())
    }

    pub fn add_resources<'r, I: IntoIterator<Item = &'r Resource>>(&mut self, resources: I) -> Result<()> {
        for resource in resources {
            self.add_resource(resource)?;
        }
        Ok(())
    }

    /// Structural containment. Not exclusive: a resource may have several
    /// parents.
    pub fn add_parent_relation(&mut self, parent: &Resource, child: &Resource) {
        self.store
            .add([Triple::node(parent.id(), PARENT_OF, child.id())]);
    }

    /// Cross-resource association from an actor onto a target.
    pub fn add_applies_on_relation(&mut self, actor: &Resource, target: &Resource) {
        self.store
            .add([Triple::node(actor.id(), APPLIES_ON, target.id())]);
    }

    /// Adds every statement of `other` into this graph; duplicates are
    /// no-ops, which makes merging the serialization point for concurrent
    /// collectors.
    pub fn merge(&mut self, other: &Graph) {
        self.store.add(other.store.iter().cloned());
    }

    // ------------- Lookups -------------

    /// Exact lookup; absent resources and type statements contradicting
    /// the requested kind are both "not found".
    pub fn get_resource(&self, kind: &str, id: &str) -> Result<Resource> {
        if !self.store.has_triple(&type_triple(id, kind)) {
            return Err(StratusError::NotFound {
                kind: kind.to_owned(),
                id: id.to_owned(),
            });
        }
        Resource::unmarshal_from(&self.store, id, kind)
    }

    /// Lookup by id alone across all kinds. Data holding two resources
    /// with one id under different kinds is undefined here; the first
    /// type statement wins.
    pub fn find_resource(&self, id: &str) -> Result<Option<Resource>> {
        for t in self.store.triples_for_subject(id) {
            if t.predicate() != TYPE_PREDICATE {
                continue;
            }
            if let Some(kind) = kind_of_class_node(t) {
                return Resource::unmarshal_from(&self.store, id, &kind).map(Some);
            }
        }
        Ok(None)
    }

    /// Linear scan over every resource of any kind; order is unspecified.
    pub fn find_resources_by_property(&self, key: &str, value: &PropertyValue) -> Result<Vec<Resource>> {
        let mut found = Vec::new();
        for (id, kind) in self.typed_subjects() {
            let resource = Resource::unmarshal_from(&self.store, &id, &kind)?;
            if resource.properties.get(key) == Some(value) {
                found.push(resource);
            }
        }
        Ok(found)
    }

    /// Every resource whose kind is in the requested set, fully decoded.
    pub fn get_all_resources(&self, kinds: &[&str]) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for (id, kind) in self.typed_subjects() {
            if kinds.contains(&kind.as_str()) {
                resources.push(Resource::unmarshal_from(&self.store, &id, &kind)?);
            }
        }
        Ok(resources)
    }

    /// Resources from which `applies_on` edges terminate at `target`.
    pub fn list_resources_applied_on(&self, target: &Resource) -> Result<Vec<Resource>> {
        let mut actors = Vec::new();
        for t in self.store.iter() {
            if t.predicate() == APPLIES_ON && t.object_node() == Some(target.id()) {
                if let Some(actor) = self.find_resource(t.subject())? {
                    actors.push(actor);
                }
            }
        }
        Ok(actors)
    }

    /// All resources satisfying the resolver; order is unspecified.
    pub fn resolve_resources(&self, resolver: &dyn Resolver) -> Result<Vec<Resource>> {
        let mut matching = Vec::new();
        for (id, kind) in self.typed_subjects() {
            let resource = Resource::unmarshal_from(&self.store, &id, &kind)?;
            if resolver.matches(&resource) {
                matching.push(resource);
            }
        }
        Ok(matching)
    }

    // ------------- Traversal -------------

    /// Direct children over `parent_of` edges. Edges to resources the
    /// graph does not hold yield nothing.
    pub fn children(&self, of: &Resource) -> Result<Vec<Resource>> {
        let mut children = Vec::new();
        for t in self.store.triples_for_subject(of.id()) {
            if t.predicate() != PARENT_OF {
                continue;
            }
            if let Some(child_id) = t.object_node() {
                if let Some(child) = self.find_resource(child_id)? {
                    children.push(child);
                }
            }
        }
        Ok(children)
    }

    /// Depth-first walk of `parent_of` edges; the root is depth 0 and is
    /// reported only when `include_root` is set. Already-visited nodes
    /// are not descended into again.
    pub fn visit_children<F>(&self, root: &Resource, include_root: bool, visit: &mut F) -> Result<()>
    where
        F: FnMut(&Resource, usize) -> Result<()>,
    {
        let mut visited = HashSet::new();
        self.visit_rec(root, 0, include_root, &mut visited, visit)
    }

    fn visit_rec<F>(
        &self,
        node: &Resource,
        depth: usize,
        report: bool,
        visited: &mut HashSet<String>,
        visit: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Resource, usize) -> Result<()>,
    {
        if depth > MAX_TRAVERSAL_DEPTH {
            return Err(StratusError::Invariant(format!(
                "parent_of traversal exceeded depth {}",
                MAX_TRAVERSAL_DEPTH
            )));
        }
        if !visited.insert(node.id().to_owned()) {
            return Ok(());
        }
        if report {
            visit(node, depth)?;
        }
        for child in self.children(node)? {
            self.visit_rec(&child, depth + 1, true, visited, visit)?;
        }
        Ok(())
    }

    // ------------- Sub-graphs -------------

    /// A new graph holding only resources whose kind is in `kinds` and
    /// that satisfy every predicate. Relations between retained resources
    /// are preserved; relations touching an excluded resource are dropped.
    pub fn filter(&self, kinds: &[&str], predicates: &[FilterFn]) -> Result<Graph> {
        let mut filtered = Graph::in_region(&self.region);
        let mut retained: HashSet<String> = HashSet::new();
        retained.insert(self.region.clone());
        for (id, kind) in self.typed_subjects() {
            if id == self.region && kind == REGION_KIND {
                continue;
            }
            if !kinds.contains(&kind.as_str()) {
                continue;
            }
            let resource = Resource::unmarshal_from(&self.store, &id, &kind)?;
            if predicates.iter().all(|p| p(&resource)) {
                filtered.add_resource(&resource)?;
                retained.insert(id);
            }
        }
        for t in self.store.iter() {
            if t.predicate() != PARENT_OF && t.predicate() != APPLIES_ON {
                continue;
            }
            let target = match t.object_node() {
                Some(id) => id,
                None => continue,
            };
            if retained.contains(t.subject()) && retained.contains(target) {
                filtered.store.add([t.clone()]);
            }
        }
        Ok(filtered)
    }

    // ------------- Text form -------------

    pub fn marshal(&self) -> String {
        self.store.marshal()
    }

    pub fn unmarshal(text: &str) -> Result<Graph> {
        let store = TripleStore::unmarshal(text)?;
        let mut region = None;
        for t in store.iter() {
            if t.predicate() == TYPE_PREDICATE {
                if let Some(kind) = kind_of_class_node(t) {
                    if kind == REGION_KIND {
                        region = Some(t.subject().to_owned());
                        break;
                    }
                }
            }
        }
        let mut graph = Graph {
            store,
            region: region.clone().unwrap_or_else(|| DEFAULT_REGION.to_owned()),
        };
        if region.is_none() {
            graph.store.add([region_type_triple(DEFAULT_REGION)]);
        }
        Ok(graph)
    }

    // ------------- Internals -------------

    fn typed_subjects(&self) -> Vec<(String, String)> {
        let mut subjects = Vec::new();
        for t in self.store.iter() {
            if t.predicate() != TYPE_PREDICATE {
                continue;
            }
            if let Some(kind) = kind_of_class_node(t) {
                subjects.push((t.subject().to_owned(), kind));
            }
        }
        subjects
    }
}

fn type_triple(id: &str, kind: &str) -> Triple {
    Triple::node(
        id,
        TYPE_PREDICATE,
        format!("{}{}", CLASS_PREFIX, kind_to_class(kind)),
    )
}

fn region_type_triple(region: &str) -> Triple {
    type_triple(region, REGION_KIND)
}

fn kind_of_class_node(t: &Triple) -> Option<String> {
    t.object_node()
        .and_then(|class| class.strip_prefix(CLASS_PREFIX))
        .map(class_to_kind)
}

// ------------- Alias -------------

/// A friendly name resolving to a resource id within one kind, through
/// the "Name" property. Zero matches is an error, and so is more than
/// one: ambiguity is surfaced, never collapsed into not-found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias(pub String);

impl Alias {
    pub fn resolve_to_id(&self, graph: &Graph, kind: &str) -> Result<String> {
        let mut ids = Vec::new();
        for resource in graph.get_all_resources(&[kind])? {
            if matches!(resource.properties.get("Name"), Some(PropertyValue::Text(name)) if name == &self.0)
            {
                ids.push(resource.id().to_owned());
            }
        }
        match ids.len() {
            0 => Err(StratusError::AliasNotFound {
                kind: kind.to_owned(),
                name: self.0.clone(),
            }),
            1 => Ok(ids.remove(0)),
            count => Err(StratusError::AmbiguousAlias {
                kind: kind.to_owned(),
                name: self.0.clone(),
                count,
            }),
        }
    }
}

/// Filter predicate matching a property whose printed value contains the
/// needle, case-insensitively.
pub fn property_contains_filter(key: &str, needle: &str) -> FilterFn {
    let key = key.to_owned();
    let pattern = Regex::new(&format!("(?i){}", regex::escape(needle))).unwrap();
    Box::new(move |resource| {
        resource
            .properties
            .get(&key)
            .map(|value| pattern.is_match(&value.to_string()))
            .unwrap_or(false)
    })
}
