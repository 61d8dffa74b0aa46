//! Stratus – a relation-aware resource graph and template engine for
//! cloud accounts.
//!
//! Stratus models an account's resource topology as a typed graph backed
//! by a triple store, and drives declarative, reversible mutations
//! against that account through a small line-oriented command language:
//! * A [`store::Triple`] is a subject–predicate–object statement; the
//!   [`store::TripleStore`] keeps them deduplicated and indexed, and
//!   round-trips a canonical text form.
//! * The [`schema`] module maps every property key to a semantic kind and
//!   datatype and converts between native values and statements,
//!   including structured records (firewall rules, routes, grants).
//! * A [`graph::Graph`] exposes typed [`resource::Resource`]s, the
//!   `parent_of` and `applies_on` relations, traversal, filtering, alias
//!   resolution and merging on top of the store.
//! * The [`resolver`] module provides composable predicates used for
//!   lookup and validation.
//! * A [`script::Template`] is an ordered sequence of parsed command
//!   nodes; the [`runner::Runner`] dry-runs and executes them against a
//!   [`driver::DriverRegistry`], collecting per-command outcomes that the
//!   [`printer::Printer`] renders as a revertible execution report.
//!
//! ## Modules
//! * [`store`] – triple statements, the store and its text form.
//! * [`schema`] – the property table, datatypes, records and the codec.
//! * [`resource`] – typed entities and their property bags.
//! * [`graph`] – the resource graph, relations and aliases.
//! * [`resolver`] – composable resource predicates.
//! * [`script`] – the command language and parsed templates.
//! * [`runner`] – the dry-run/execute state machine.
//! * [`driver`] – the `(entity, action)` driver registry and poll helper.
//! * [`validation`] – pre-execution template validators.
//! * [`printer`] – human report rendering.
//! * [`collect`] – concurrent collector fan-in.
//! * [`settings`] – config file and environment settings.
//!
//! ## Quick start
//! ```
//! use stratus::graph::Graph;
//! use stratus::resource::Resource;
//!
//! let mut g = Graph::new();
//! let inst = Resource::new("inst_1", "instance").with_property("Name", "redis");
//! g.add_resource(&inst).unwrap();
//! assert_eq!(g.get_resource("instance", "inst_1").unwrap().id(), "inst_1");
//! ```
//!
//! Graphs are single-writer while being populated and safe for concurrent
//! readers once mutation has ceased; template execution is strictly
//! sequential because later commands may chain on ids produced by earlier
//! ones.

pub mod collect;
pub mod driver;
pub mod error;
pub mod graph;
pub mod printer;
pub mod resolver;
pub mod resource;
pub mod runner;
pub mod schema;
pub mod script;
pub mod settings;
pub mod store;
pub mod validation;
