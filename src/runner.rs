//! The template execution engine.
//!
//! Every command node moves through `Parsed → DryRunChecked →
//! Executed{OK|KO}`. The dry-run pass resolves parameters, runs the local
//! checks and synthesizes fake identifiers so later commands of the same
//! template can chain on ids that do not exist yet. The execute pass then
//! re-resolves against the real ids and performs the side effects, one
//! command at a time: a failing command is recorded on its node and
//! execution continues, so the report afterwards shows partial progress.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::driver::DriverRegistry;
use crate::error::{Result, StratusError};
use crate::graph::{Alias, GraphLookup};
use crate::script::{Action, CmdStatus, CommandNode, ParamValue, Params, Template};
use crate::validation::Validator;

pub struct Runner<'a> {
    registry: &'a DriverRegistry,
    lookup: Option<GraphLookup<'a>>,
    // entity -> id produced by the most recent create in this pass
    produced: HashMap<String, String>,
    fake_count: usize,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a DriverRegistry, lookup: Option<GraphLookup<'a>>) -> Self {
        Self {
            registry,
            lookup,
            produced: HashMap::new(),
            fake_count: 0,
        }
    }

    /// Dry-runs every command. Individual failures are recorded on their
    /// nodes; only a configuration problem (a missing driver) aborts.
    pub fn dry_run(&mut self, template: &mut Template) -> Result<()> {
        self.registry.ensure(template)?;
        self.produced.clear();
        let registry = self.registry;
        for cmd in &mut template.commands {
            let params = match self.resolve_params(cmd) {
                Ok(params) => params,
                Err(e) => {
                    warn!(command = %cmd.line, error = %e, "parameter resolution failed");
                    cmd.err = Some(e);
                    cmd.status = CmdStatus::ExecutedKo;
                    continue;
                }
            };
            let pair = registry.get(&cmd.entity, cmd.action)?;
            match (pair.dry_run)(&params) {
                Ok(value) => {
                    debug!(command = %cmd.line, "dry run ok");
                    cmd.status = CmdStatus::DryRunChecked;
                    if cmd.action == Action::Create {
                        let id = match &value {
                            Value::String(id) if !id.is_empty() => id.clone(),
                            _ => {
                                self.fake_count += 1;
                                format!("fake-{}-{}", cmd.entity, self.fake_count)
                            }
                        };
                        self.produced.insert(cmd.entity.clone(), id);
                    }
                }
                Err(e) => {
                    warn!(command = %cmd.line, error = %e, "dry run failed");
                    cmd.err = Some(e);
                    cmd.status = CmdStatus::ExecutedKo;
                }
            }
        }
        Ok(())
    }

    /// Dry-runs, then executes every command that passed. Failures stay
    /// on their nodes and execution carries on: mutations already made
    /// remotely cannot be silently undone, so partial progress is kept
    /// and reported.
    pub fn run(&mut self, template: &mut Template) -> Result<()> {
        self.dry_run(template)?;
        self.produced.clear();
        let registry = self.registry;
        for cmd in &mut template.commands {
            if cmd.status != CmdStatus::DryRunChecked {
                continue;
            }
            let params = match self.resolve_params(cmd) {
                Ok(params) => params,
                Err(e) => {
                    cmd.err = Some(e);
                    cmd.status = CmdStatus::ExecutedKo;
                    continue;
                }
            };
            let pair = registry.get(&cmd.entity, cmd.action)?;
            match (pair.run)(&params) {
                Ok(value) => {
                    debug!(command = %cmd.line, "executed");
                    if cmd.action == Action::Create {
                        if let Value::String(id) = &value {
                            if !id.is_empty() {
                                self.produced.insert(cmd.entity.clone(), id.clone());
                            }
                        }
                    }
                    cmd.result = Some(value);
                    cmd.status = CmdStatus::ExecutedOk;
                }
                Err(e) => {
                    warn!(command = %cmd.line, error = %e, "execution failed");
                    cmd.err = Some(e);
                    cmd.status = CmdStatus::ExecutedKo;
                }
            }
        }
        Ok(())
    }

    /// Runs the validators first and refuses to start executing while any
    /// of them reports an error.
    pub fn run_validated(
        &mut self,
        template: &mut Template,
        validators: &[&dyn Validator],
    ) -> Result<()> {
        let errs = template.validate(validators);
        if !errs.is_empty() {
            let joined = errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StratusError::Validation(joined));
        }
        self.run(template)
    }

    /// Aliases resolve through the live graph for the parameter's kind;
    /// references resolve through ids produced earlier in this pass.
    fn resolve_params(&self, cmd: &CommandNode) -> Result<Params> {
        let mut resolved = Params::new();
        for (key, value) in &cmd.params {
            let value = match value {
                ParamValue::Alias(name) => {
                    let graph = self.lookup.and_then(|l| l(key)).ok_or_else(|| {
                        StratusError::AliasNotFound {
                            kind: key.clone(),
                            name: name.clone(),
                        }
                    })?;
                    ParamValue::Str(Alias(name.clone()).resolve_to_id(graph, key)?)
                }
                ParamValue::Ref(name) => ParamValue::Str(
                    self.produced
                        .get(name)
                        .cloned()
                        .ok_or_else(|| StratusError::UnresolvedReference { name: name.clone() })?,
                ),
                other => other.clone(),
            };
            resolved.insert(key.clone(), value);
        }
        Ok(resolved)
    }
}
