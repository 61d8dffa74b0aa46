//! Pre-execution template validators.
//!
//! Validators are pure functions of the parsed template plus an external
//! graph lookup; each returns all the errors it can find, and execution
//! does not start while any validator reports one.

use crate::error::StratusError;
use crate::graph::GraphLookup;
use crate::schema::PropertyValue;
use crate::script::{Action, ParamValue, Template};

pub trait Validator {
    fn execute(&self, template: &Template) -> Vec<StratusError>;
}

/// Rejects create commands whose `name` parameter is already taken among
/// resources of that kind in the referenced graph.
pub struct UniqueNameValidator<'a> {
    pub lookup: GraphLookup<'a>,
}

impl Validator for UniqueNameValidator<'_> {
    fn execute(&self, template: &Template) -> Vec<StratusError> {
        let mut errs = Vec::new();
        for cmd in &template.commands {
            if cmd.action != Action::Create {
                continue;
            }
            let name = match cmd.params.get("name") {
                Some(ParamValue::Str(name)) => name.clone(),
                Some(other) => other.to_string(),
                None => continue,
            };
            let graph = match (self.lookup)(&cmd.entity) {
                Some(graph) => graph,
                None => continue,
            };
            match graph.find_resources_by_property("Name", &PropertyValue::Text(name.clone())) {
                Ok(found) if !found.is_empty() => errs.push(StratusError::Validation(format!(
                    "{} {}: name '{}' already exists",
                    cmd.action, cmd.entity, name
                ))),
                Ok(_) => {}
                Err(e) => errs.push(e),
            }
        }
        errs
    }
}

/// Rejects matching commands that are missing a named parameter.
pub struct ParamIsSetValidator {
    pub entity: String,
    pub action: Action,
    pub param: String,
    pub warning: String,
}

impl Validator for ParamIsSetValidator {
    fn execute(&self, template: &Template) -> Vec<StratusError> {
        let mut errs = Vec::new();
        for cmd in &template.commands {
            if cmd.action == self.action
                && cmd.entity == self.entity
                && !cmd.params.contains_key(&self.param)
            {
                errs.push(StratusError::Validation(self.warning.clone()));
            }
        }
        errs
    }
}
