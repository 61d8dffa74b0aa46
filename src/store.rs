//! Append-only, in-memory store of subject–predicate–object statements.
//!
//! The store is the leaf dependency of everything else: resource typing,
//! property encoding and relations are all statements. Statements are
//! deduplicated on insert (re-adding an identical statement is a no-op)
//! and indexed by subject. The canonical text form is line-oriented, one
//! statement per line, and round-trips through [`TripleStore::marshal`] /
//! [`TripleStore::unmarshal`].

// used for the subject index and the duplicate set
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::BuildHasherDefault;

use pest::Parser;
use pest_derive::Parser;
use seahash::SeaHasher;

use crate::error::{Result, StratusError};

pub type StoreHasher = BuildHasherDefault<SeaHasher>;

// Reserved predicates: typing and the two relation kinds.
pub const TYPE_PREDICATE: &str = "rdf:type";
pub const PARENT_OF: &str = "parent_of";
pub const APPLIES_ON: &str = "applies_on";
// Resource classes live in their own namespace, e.g. /node<cloud-owl:Instance>.
pub const CLASS_PREFIX: &str = "cloud-owl:";
// Engine-internal annotations are kept apart from business properties.
pub const META_PREFIX: &str = "meta:";

pub fn is_reserved_predicate(predicate: &str) -> bool {
    predicate == TYPE_PREDICATE || predicate == PARENT_OF || predicate == APPLIES_ON
}

#[derive(Parser)]
#[grammar = "triples.pest"]
struct TripleParser;

/// Datatype tag carried by a literal object, e.g. `"redis"^^type:text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralTag {
    Text,
    Int,
    Bool,
    DateTime,
    IpNet,
}

impl LiteralTag {
    pub fn suffix(&self) -> &'static str {
        match self {
            LiteralTag::Text => "text",
            LiteralTag::Int => "int",
            LiteralTag::Bool => "bool",
            LiteralTag::DateTime => "dateTime",
            LiteralTag::IpNet => "ipnet",
        }
    }
    pub fn from_suffix(suffix: &str) -> Option<LiteralTag> {
        match suffix {
            "text" => Some(LiteralTag::Text),
            "int" => Some(LiteralTag::Int),
            "bool" => Some(LiteralTag::Bool),
            "dateTime" => Some(LiteralTag::DateTime),
            "ipnet" => Some(LiteralTag::IpNet),
            _ => None,
        }
    }
}

/// The object position of a statement: a node reference or a tagged literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Node(String),
    Literal { lexical: String, tag: LiteralTag },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    subject: String,
    predicate: String,
    object: Object,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
    pub fn node(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Object::Node(target.into()))
    }
    pub fn literal(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        lexical: impl Into<String>,
        tag: LiteralTag,
    ) -> Self {
        Self::new(
            subject,
            predicate,
            Object::Literal {
                lexical: lexical.into(),
                tag,
            },
        )
    }
    pub fn text(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        lexical: impl Into<String>,
    ) -> Self {
        Self::literal(subject, predicate, lexical, LiteralTag::Text)
    }
    pub fn subject(&self) -> &str {
        &self.subject
    }
    pub fn predicate(&self) -> &str {
        &self.predicate
    }
    pub fn object(&self) -> &Object {
        &self.object
    }
    pub fn object_node(&self) -> Option<&str> {
        match &self.object {
            Object::Node(id) => Some(id),
            Object::Literal { .. } => None,
        }
    }
    pub fn object_lexical(&self) -> Option<&str> {
        match &self.object {
            Object::Node(_) => None,
            Object::Literal { lexical, .. } => Some(lexical),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/node<{}>\t\"{}\"@[]\t", self.subject, self.predicate)?;
        match &self.object {
            Object::Node(id) => write!(f, "/node<{}>", id),
            Object::Literal { lexical, tag } => {
                write!(f, "\"{}\"^^type:{}", lexical, tag.suffix())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TripleStore {
    triples: Vec<Triple>,
    by_subject: HashMap<String, Vec<usize>, StoreHasher>,
    kept: HashSet<Triple, StoreHasher>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends statements; a statement already in the store is skipped.
    pub fn add<I: IntoIterator<Item = Triple>>(&mut self, statements: I) {
        for triple in statements {
            if self.kept.contains(&triple) {
                continue;
            }
            self.by_subject
                .entry(triple.subject.clone())
                .or_default()
                .push(self.triples.len());
            self.kept.insert(triple.clone());
            self.triples.push(triple);
        }
    }

    /// Exact-match existence check.
    pub fn has_triple(&self, triple: &Triple) -> bool {
        self.kept.contains(triple)
    }

    /// All statements with the given subject, in insertion order.
    pub fn triples_for_subject(&self, id: &str) -> Vec<&Triple> {
        match self.by_subject.get(id) {
            Some(positions) => positions.iter().map(|&i| &self.triples[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Canonical text form: one statement per line, lines sorted so the
    /// output is stable regardless of insertion order.
    pub fn marshal(&self) -> String {
        let mut lines: Vec<String> = self.triples.iter().map(|t| t.to_string()).collect();
        lines.sort();
        lines.join("\n")
    }

    /// Parses the canonical text form. Leading/trailing whitespace and
    /// blank lines are tolerated; a malformed line fails the whole parse
    /// with its line number, and no partial store is returned.
    pub fn unmarshal(text: &str) -> Result<TripleStore> {
        let mut store = TripleStore::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let triple = parse_statement(line, number + 1)?;
            store.add([triple]);
        }
        Ok(store)
    }
}

fn parse_statement(line: &str, number: usize) -> Result<Triple> {
    let mut pairs =
        TripleParser::parse(Rule::statement, line).map_err(|e| StratusError::Parse {
            message: format!("malformed statement '{}': {}", line, e.variant.message()),
            line: number,
        })?;
    let mut inner = pairs.next().unwrap().into_inner();
    let subject = inner.next().unwrap().into_inner().next().unwrap().as_str();
    let predicate = inner.next().unwrap().into_inner().next().unwrap().as_str();
    let object_pair = inner.next().unwrap().into_inner().next().unwrap();
    let object = match object_pair.as_rule() {
        Rule::node_object => {
            Object::Node(object_pair.into_inner().next().unwrap().as_str().to_owned())
        }
        Rule::literal => {
            let mut parts = object_pair.into_inner();
            let lexical = parts.next().unwrap().as_str().to_owned();
            let suffix = parts.next().unwrap().as_str();
            let tag = LiteralTag::from_suffix(suffix).ok_or_else(|| StratusError::Parse {
                message: format!("unknown literal datatype 'type:{}'", suffix),
                line: number,
            })?;
            Object::Literal { lexical, tag }
        }
        _ => unreachable!(),
    };
    Ok(Triple::new(subject, predicate, object))
}
