//! Schema-driven property codec.
//!
//! Every property key maps to exactly one [`PropertyDef`] describing its
//! semantic kind (scalar literal, typed reference, list, list of structured
//! records) and datatype. Encoding and decoding consult only that table,
//! never the runtime shape of a value, so a snapshot round-trips
//! identically no matter who produced it. A value whose shape disagrees
//! with its declared kind is a descriptive error, not a coercion.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StratusError};
use crate::store::{is_reserved_predicate, LiteralTag, Triple, TripleStore, META_PREFIX};

// ------------- Schema table -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    FirewallRule,
    Route,
    Grant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Literal(LiteralTag),
    Reference,
    LiteralList(LiteralTag),
    ReferenceList,
    RecordList(RecordKind),
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub key: &'static str,
    pub predicate: &'static str,
    pub kind: PropertyKind,
}

const fn def(key: &'static str, predicate: &'static str, kind: PropertyKind) -> PropertyDef {
    PropertyDef {
        key,
        predicate,
        kind,
    }
}

const DEFS: &[PropertyDef] = &[
    def("ID", "cloud:id", PropertyKind::Literal(LiteralTag::Text)),
    def("Name", "cloud:name", PropertyKind::Literal(LiteralTag::Text)),
    def("Type", "cloud:type", PropertyKind::Literal(LiteralTag::Text)),
    def("State", "cloud:state", PropertyKind::Literal(LiteralTag::Text)),
    def("Arn", "cloud:arn", PropertyKind::Literal(LiteralTag::Text)),
    def("Zone", "cloud:availabilityZone", PropertyKind::Literal(LiteralTag::Text)),
    def("Size", "cloud:size", PropertyKind::Literal(LiteralTag::Int)),
    def("Port", "net:port", PropertyKind::Literal(LiteralTag::Int)),
    def("Default", "cloud:default", PropertyKind::Literal(LiteralTag::Bool)),
    def("Public", "cloud:public", PropertyKind::Literal(LiteralTag::Bool)),
    def("Launched", "cloud:launched", PropertyKind::Literal(LiteralTag::DateTime)),
    def("Created", "cloud:created", PropertyKind::Literal(LiteralTag::DateTime)),
    def("Modified", "cloud:modified", PropertyKind::Literal(LiteralTag::DateTime)),
    def("PublicIP", "net:publicIP", PropertyKind::Literal(LiteralTag::Text)),
    def("PrivateIP", "net:privateIP", PropertyKind::Literal(LiteralTag::Text)),
    def("Cidr", "net:cidr", PropertyKind::Literal(LiteralTag::IpNet)),
    def("Vpc", "cloud:vpc", PropertyKind::Reference),
    def("Subnet", "cloud:subnet", PropertyKind::Reference),
    def("KeyPair", "cloud:keyPair", PropertyKind::Reference),
    def("Owner", "cloud:owner", PropertyKind::Reference),
    def("Actions", "cloud:actions", PropertyKind::LiteralList(LiteralTag::Text)),
    def("IPRanges", "net:ipRanges", PropertyKind::LiteralList(LiteralTag::IpNet)),
    def(
        "SecurityGroups",
        "cloud:securityGroups",
        PropertyKind::ReferenceList,
    ),
    def("Users", "cloud:users", PropertyKind::ReferenceList),
    def(
        "InboundRules",
        "net:inboundRules",
        PropertyKind::RecordList(RecordKind::FirewallRule),
    ),
    def(
        "OutboundRules",
        "net:outboundRules",
        PropertyKind::RecordList(RecordKind::FirewallRule),
    ),
    def("Routes", "net:routes", PropertyKind::RecordList(RecordKind::Route)),
    def("Grants", "cloud:grants", PropertyKind::RecordList(RecordKind::Grant)),
];

lazy_static! {
    static ref BY_KEY: HashMap<&'static str, &'static PropertyDef> =
        DEFS.iter().map(|d| (d.key, d)).collect();
    static ref BY_PREDICATE: HashMap<&'static str, &'static PropertyDef> =
        DEFS.iter().map(|d| (d.predicate, d)).collect();
    // loose CIDR shape check covering v4 and v6 prefixes
    static ref CIDR: Regex = Regex::new(r"^[0-9A-Fa-f:.]+/[0-9]{1,3}$").unwrap();
}

pub fn definition(key: &str) -> Result<&'static PropertyDef> {
    BY_KEY
        .get(key)
        .copied()
        .ok_or_else(|| StratusError::Codec {
            key: key.to_owned(),
            expected: "a schema-registered property".to_owned(),
            actual: "an unknown key".to_owned(),
        })
}

pub fn definition_for_predicate(predicate: &str) -> Option<&'static PropertyDef> {
    BY_PREDICATE.get(predicate).copied()
}

// ------------- Structured records -------------

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirewallRule {
    pub protocol: String,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub ip_ranges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    pub destination: String,
    pub prefix_list: Option<String>,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub permission: String,
    pub grantee_id: String,
    pub grantee_type: String,
    pub grantee_name: String,
}

impl FirewallRule {
    fn encode(&self, id: &str, out: &mut Vec<Triple>) -> Result<()> {
        out.push(Triple::text(id, "net:protocol", &self.protocol));
        if let Some(port) = self.from_port {
            out.push(Triple::literal(id, "net:fromPort", port.to_string(), LiteralTag::Int));
        }
        if let Some(port) = self.to_port {
            out.push(Triple::literal(id, "net:toPort", port.to_string(), LiteralTag::Int));
        }
        for range in &self.ip_ranges {
            out.push(Triple::literal(id, "net:cidr", check_cidr("ip_ranges", range)?, LiteralTag::IpNet));
        }
        Ok(())
    }
    fn decode(store: &TripleStore, id: &str) -> Result<FirewallRule> {
        let mut rule = FirewallRule::default();
        for t in store.triples_for_subject(id) {
            match t.predicate() {
                "net:protocol" => rule.protocol = lexical_of("protocol", t)?.to_owned(),
                "net:fromPort" => rule.from_port = Some(parse_int("from_port", lexical_of("from_port", t)?)?),
                "net:toPort" => rule.to_port = Some(parse_int("to_port", lexical_of("to_port", t)?)?),
                "net:cidr" => rule.ip_ranges.push(lexical_of("ip_ranges", t)?.to_owned()),
                other => return Err(unknown_field("firewall rule", other)),
            }
        }
        Ok(rule)
    }
}

impl Route {
    fn encode(&self, id: &str, out: &mut Vec<Triple>) -> Result<()> {
        out.push(Triple::literal(
            id,
            "net:destination",
            check_cidr("destination", &self.destination)?,
            LiteralTag::IpNet,
        ));
        if let Some(prefix_list) = &self.prefix_list {
            out.push(Triple::text(id, "net:prefixList", prefix_list));
        }
        for target in &self.targets {
            out.push(Triple::text(id, "net:routeTarget", target));
        }
        Ok(())
    }
    fn decode(store: &TripleStore, id: &str) -> Result<Route> {
        let mut route = Route::default();
        for t in store.triples_for_subject(id) {
            match t.predicate() {
                "net:destination" => route.destination = lexical_of("destination", t)?.to_owned(),
                "net:prefixList" => route.prefix_list = Some(lexical_of("prefix_list", t)?.to_owned()),
                "net:routeTarget" => route.targets.push(lexical_of("targets", t)?.to_owned()),
                other => return Err(unknown_field("route", other)),
            }
        }
        Ok(route)
    }
}

impl Grant {
    fn encode(&self, id: &str, out: &mut Vec<Triple>) -> Result<()> {
        out.push(Triple::text(id, "cloud:permission", &self.permission));
        if !self.grantee_id.is_empty() {
            out.push(Triple::text(id, "cloud:granteeId", &self.grantee_id));
        }
        if !self.grantee_type.is_empty() {
            out.push(Triple::text(id, "cloud:granteeType", &self.grantee_type));
        }
        if !self.grantee_name.is_empty() {
            out.push(Triple::text(id, "cloud:granteeName", &self.grantee_name));
        }
        Ok(())
    }
    fn decode(store: &TripleStore, id: &str) -> Result<Grant> {
        let mut grant = Grant::default();
        for t in store.triples_for_subject(id) {
            match t.predicate() {
                "cloud:permission" => grant.permission = lexical_of("permission", t)?.to_owned(),
                "cloud:granteeId" => grant.grantee_id = lexical_of("grantee_id", t)?.to_owned(),
                "cloud:granteeType" => grant.grantee_type = lexical_of("grantee_type", t)?.to_owned(),
                "cloud:granteeName" => grant.grantee_name = lexical_of("grantee_name", t)?.to_owned(),
                other => return Err(unknown_field("grant", other)),
            }
        }
        Ok(grant)
    }
}

// ------------- Property values -------------

/// A decoded property value. The variant must match the schema kind of the
/// property it is stored under; the codec rejects mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
    Ref(String),
    List(Vec<String>),
    Refs(Vec<String>),
    Rules(Vec<FirewallRule>),
    Routes(Vec<Route>),
    Grants(Vec<Grant>),
}

impl PropertyValue {
    pub fn shape(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "a text value",
            PropertyValue::Int(_) => "an integer",
            PropertyValue::Bool(_) => "a boolean",
            PropertyValue::Time(_) => "a timestamp",
            PropertyValue::Ref(_) => "a reference",
            PropertyValue::List(_) => "a list of literals",
            PropertyValue::Refs(_) => "a list of references",
            PropertyValue::Rules(_) => "a list of firewall rules",
            PropertyValue::Routes(_) => "a list of routes",
            PropertyValue::Grants(_) => "a list of grants",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Text(s) | PropertyValue::Ref(s) => write!(f, "{}", s),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Time(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            PropertyValue::List(items) | PropertyValue::Refs(items) => {
                write!(f, "{}", items.join(","))
            }
            PropertyValue::Rules(v) => write!(f, "{}", serde_json::to_string(v).unwrap_or_default()),
            PropertyValue::Routes(v) => write!(f, "{}", serde_json::to_string(v).unwrap_or_default()),
            PropertyValue::Grants(v) => write!(f, "{}", serde_json::to_string(v).unwrap_or_default()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_owned())
    }
}
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}
impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}
impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}
impl From<DateTime<Utc>> for PropertyValue {
    fn from(t: DateTime<Utc>) -> Self {
        PropertyValue::Time(t)
    }
}

// ------------- Encoding -------------

/// Converts one property into its statements. List-of-record properties
/// mint one synthetic identifier per record and recursively encode the
/// record's own fields under it.
pub fn encode(subject: &str, key: &str, value: &PropertyValue) -> Result<Vec<Triple>> {
    let def = definition(key)?;
    let mut triples = Vec::new();
    match (def.kind, value) {
        (PropertyKind::Literal(tag), v) => {
            triples.push(Triple::literal(
                subject,
                def.predicate,
                encode_literal(key, tag, v)?,
                tag,
            ));
        }
        (PropertyKind::Reference, PropertyValue::Ref(id)) => {
            triples.push(Triple::node(subject, def.predicate, id));
        }
        (PropertyKind::LiteralList(tag), PropertyValue::List(items)) => {
            for item in items {
                let value = PropertyValue::Text(item.clone());
                triples.push(Triple::literal(
                    subject,
                    def.predicate,
                    encode_literal(key, tag, &value)?,
                    tag,
                ));
            }
        }
        (PropertyKind::ReferenceList, PropertyValue::Refs(ids)) => {
            for id in ids {
                triples.push(Triple::node(subject, def.predicate, id));
            }
        }
        (PropertyKind::RecordList(RecordKind::FirewallRule), PropertyValue::Rules(rules)) => {
            for (ordinal, rule) in rules.iter().enumerate() {
                let rid = record_id(subject, def.predicate, ordinal);
                triples.push(Triple::node(subject, def.predicate, &rid));
                rule.encode(&rid, &mut triples)?;
            }
        }
        (PropertyKind::RecordList(RecordKind::Route), PropertyValue::Routes(routes)) => {
            for (ordinal, route) in routes.iter().enumerate() {
                let rid = record_id(subject, def.predicate, ordinal);
                triples.push(Triple::node(subject, def.predicate, &rid));
                route.encode(&rid, &mut triples)?;
            }
        }
        (PropertyKind::RecordList(RecordKind::Grant), PropertyValue::Grants(grants)) => {
            for (ordinal, grant) in grants.iter().enumerate() {
                let rid = record_id(subject, def.predicate, ordinal);
                triples.push(Triple::node(subject, def.predicate, &rid));
                grant.encode(&rid, &mut triples)?;
            }
        }
        (kind, v) => {
            return Err(StratusError::Codec {
                key: key.to_owned(),
                expected: kind_shape(kind).to_owned(),
                actual: v.shape().to_owned(),
            });
        }
    }
    Ok(triples)
}

fn encode_literal(key: &str, tag: LiteralTag, value: &PropertyValue) -> Result<String> {
    match (tag, value) {
        (LiteralTag::Text, PropertyValue::Text(s)) => Ok(s.clone()),
        (LiteralTag::Int, PropertyValue::Int(i)) => Ok(i.to_string()),
        (LiteralTag::Bool, PropertyValue::Bool(b)) => Ok(b.to_string()),
        (LiteralTag::DateTime, PropertyValue::Time(t)) => {
            Ok(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        (LiteralTag::IpNet, PropertyValue::Text(s)) => Ok(check_cidr(key, s)?.to_owned()),
        (tag, v) => Err(StratusError::Codec {
            key: key.to_owned(),
            expected: literal_shape(tag).to_owned(),
            actual: v.shape().to_owned(),
        }),
    }
}

// ------------- Decoding -------------

/// Decodes all property and meta statements of one subject. Statements
/// sharing a list predicate accumulate into a single ordered list.
pub fn decode_properties(
    store: &TripleStore,
    subject: &str,
) -> Result<(BTreeMap<String, PropertyValue>, BTreeMap<String, String>)> {
    let mut properties = BTreeMap::new();
    let mut meta = BTreeMap::new();
    for t in store.triples_for_subject(subject) {
        let predicate = t.predicate();
        if is_reserved_predicate(predicate) {
            continue;
        }
        if let Some(key) = predicate.strip_prefix(META_PREFIX) {
            meta.insert(
                key.to_owned(),
                lexical_of(key, t)?.to_owned(),
            );
            continue;
        }
        let def = definition_for_predicate(predicate).ok_or_else(|| StratusError::Codec {
            key: predicate.to_owned(),
            expected: "a schema-registered predicate".to_owned(),
            actual: "an unknown predicate".to_owned(),
        })?;
        match def.kind {
            PropertyKind::Literal(tag) => {
                let value = parse_literal(def.key, tag, lexical_of(def.key, t)?)?;
                properties.insert(def.key.to_owned(), value);
            }
            PropertyKind::Reference => {
                let id = node_of(def.key, t)?;
                properties.insert(def.key.to_owned(), PropertyValue::Ref(id.to_owned()));
            }
            PropertyKind::LiteralList(tag) => {
                let item = parse_literal(def.key, tag, lexical_of(def.key, t)?)?.to_string();
                push_list(&mut properties, def.key, item, false)?;
            }
            PropertyKind::ReferenceList => {
                let id = node_of(def.key, t)?.to_owned();
                push_list(&mut properties, def.key, id, true)?;
            }
            PropertyKind::RecordList(kind) => {
                let rid = node_of(def.key, t)?;
                push_record(store, &mut properties, def.key, kind, rid)?;
            }
        }
    }
    Ok((properties, meta))
}

fn push_list(
    properties: &mut BTreeMap<String, PropertyValue>,
    key: &str,
    item: String,
    reference: bool,
) -> Result<()> {
    let entry = properties.entry(key.to_owned()).or_insert_with(|| {
        if reference {
            PropertyValue::Refs(Vec::new())
        } else {
            PropertyValue::List(Vec::new())
        }
    });
    match entry {
        PropertyValue::List(items) | PropertyValue::Refs(items) => {
            items.push(item);
            Ok(())
        }
        other => Err(StratusError::Codec {
            key: key.to_owned(),
            expected: "an accumulating list".to_owned(),
            actual: other.shape().to_owned(),
        }),
    }
}

fn push_record(
    store: &TripleStore,
    properties: &mut BTreeMap<String, PropertyValue>,
    key: &str,
    kind: RecordKind,
    rid: &str,
) -> Result<()> {
    let entry = properties.entry(key.to_owned()).or_insert_with(|| match kind {
        RecordKind::FirewallRule => PropertyValue::Rules(Vec::new()),
        RecordKind::Route => PropertyValue::Routes(Vec::new()),
        RecordKind::Grant => PropertyValue::Grants(Vec::new()),
    });
    match (entry, kind) {
        (PropertyValue::Rules(items), RecordKind::FirewallRule) => {
            items.push(FirewallRule::decode(store, rid)?);
        }
        (PropertyValue::Routes(items), RecordKind::Route) => {
            items.push(Route::decode(store, rid)?);
        }
        (PropertyValue::Grants(items), RecordKind::Grant) => {
            items.push(Grant::decode(store, rid)?);
        }
        (other, _) => {
            return Err(StratusError::Codec {
                key: key.to_owned(),
                expected: "an accumulating record list".to_owned(),
                actual: other.shape().to_owned(),
            });
        }
    }
    Ok(())
}

fn parse_literal(key: &str, tag: LiteralTag, lexical: &str) -> Result<PropertyValue> {
    match tag {
        LiteralTag::Text => Ok(PropertyValue::Text(lexical.to_owned())),
        LiteralTag::Int => Ok(PropertyValue::Int(parse_int(key, lexical)?)),
        LiteralTag::Bool => match lexical {
            "true" => Ok(PropertyValue::Bool(true)),
            "false" => Ok(PropertyValue::Bool(false)),
            other => Err(StratusError::Codec {
                key: key.to_owned(),
                expected: "a boolean literal".to_owned(),
                actual: format!("'{}'", other),
            }),
        },
        LiteralTag::DateTime => DateTime::parse_from_rfc3339(lexical)
            .map(|t| PropertyValue::Time(t.with_timezone(&Utc)))
            .map_err(|_| StratusError::Codec {
                key: key.to_owned(),
                expected: "an RFC3339 timestamp".to_owned(),
                actual: format!("'{}'", lexical),
            }),
        LiteralTag::IpNet => Ok(PropertyValue::Text(check_cidr(key, lexical)?.to_owned())),
    }
}

// ------------- Shared helpers -------------

/// Synthetic record identifiers are deterministic so a marshaled snapshot
/// is stable; the zero-padded ordinal keeps list order under sorted output.
fn record_id(owner: &str, predicate: &str, ordinal: usize) -> String {
    let digest = blake3::hash(format!("{}|{}|{}", owner, predicate, ordinal).as_bytes());
    let local = predicate.rsplit(':').next().unwrap_or(predicate);
    format!("{}_{:04}_{}", local, ordinal, &digest.to_hex().as_str()[..8])
}

fn check_cidr<'v>(key: &str, value: &'v str) -> Result<&'v str> {
    if CIDR.is_match(value) {
        Ok(value)
    } else {
        Err(StratusError::Codec {
            key: key.to_owned(),
            expected: "a CIDR network".to_owned(),
            actual: format!("'{}'", value),
        })
    }
}

fn lexical_of<'t>(key: &str, t: &'t Triple) -> Result<&'t str> {
    t.object_lexical().ok_or_else(|| StratusError::Codec {
        key: key.to_owned(),
        expected: "a literal object".to_owned(),
        actual: "a node reference".to_owned(),
    })
}

fn node_of<'t>(key: &str, t: &'t Triple) -> Result<&'t str> {
    t.object_node().ok_or_else(|| StratusError::Codec {
        key: key.to_owned(),
        expected: "a node reference".to_owned(),
        actual: "a literal object".to_owned(),
    })
}

fn parse_int(key: &str, lexical: &str) -> Result<i64> {
    lexical.parse::<i64>().map_err(|_| StratusError::Codec {
        key: key.to_owned(),
        expected: "an integer literal".to_owned(),
        actual: format!("'{}'", lexical),
    })
}

fn unknown_field(record: &str, predicate: &str) -> StratusError {
    StratusError::Codec {
        key: predicate.to_owned(),
        expected: format!("a {} field", record),
        actual: "an unknown predicate".to_owned(),
    }
}

fn literal_shape(tag: LiteralTag) -> &'static str {
    match tag {
        LiteralTag::Text => "a text value",
        LiteralTag::Int => "an integer",
        LiteralTag::Bool => "a boolean",
        LiteralTag::DateTime => "a timestamp",
        LiteralTag::IpNet => "a CIDR network",
    }
}

fn kind_shape(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Literal(tag) => literal_shape(tag),
        PropertyKind::Reference => "a reference",
        PropertyKind::LiteralList(_) => "a list of literals",
        PropertyKind::ReferenceList => "a list of references",
        PropertyKind::RecordList(RecordKind::FirewallRule) => "a list of firewall rules",
        PropertyKind::RecordList(RecordKind::Route) => "a list of routes",
        PropertyKind::RecordList(RecordKind::Grant) => "a list of grants",
    }
}
