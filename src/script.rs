//! The command language and its parsed form.
//!
//! A template is an ordered sequence of command nodes, one per script
//! line: `action entity key=value ...`. Nodes are created by parsing and
//! mutated only by the execution engine, which attaches their result or
//! error; they are never re-ordered, execution order is lexical script
//! order. Every template is assigned a time-ordered unique identifier at
//! creation, which later serves as its revert id.

use std::collections::BTreeMap;
use std::fmt;

use pest::Parser;
use pest_derive::Parser;
use serde_json::Value;
use ulid::Ulid;

use crate::error::{Result, StratusError};
use crate::validation::Validator;

#[derive(Parser)]
#[grammar = "script.pest"]
struct ScriptParser;

// ------------- Actions -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Create,
    Delete,
    Update,
    Check,
    Attach,
    Detach,
    Start,
    Stop,
}

impl Action {
    pub fn from_name(name: &str) -> Option<Action> {
        match name {
            "create" => Some(Action::Create),
            "delete" => Some(Action::Delete),
            "update" => Some(Action::Update),
            "check" => Some(Action::Check),
            "attach" => Some(Action::Attach),
            "detach" => Some(Action::Detach),
            "start" => Some(Action::Start),
            "stop" => Some(Action::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
            Action::Update => "update",
            Action::Check => "check",
            Action::Attach => "attach",
            Action::Detach => "detach",
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }

    /// The action undoing this one. Deletion cannot be undone, and
    /// neither updates nor checks have a meaningful inverse.
    pub fn inverse(&self) -> Option<Action> {
        match self {
            Action::Create => Some(Action::Delete),
            Action::Start => Some(Action::Stop),
            Action::Stop => Some(Action::Start),
            Action::Attach => Some(Action::Detach),
            Action::Detach => Some(Action::Attach),
            Action::Delete | Action::Update | Action::Check => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ------------- Parameters -------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    /// `@name`, resolved against a live graph before dispatch.
    Alias(String),
    /// `$entity`, resolved to the id produced by an earlier command.
    Ref(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Str(s) if s.chars().any(char::is_whitespace) => write!(f, "\"{}\"", s),
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Alias(a) => write!(f, "@{}", a),
            ParamValue::Ref(r) => write!(f, "${}", r),
        }
    }
}

pub type Params = BTreeMap<String, ParamValue>;

// ------------- Command nodes -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdStatus {
    Parsed,
    DryRunChecked,
    ExecutedOk,
    ExecutedKo,
}

#[derive(Debug)]
pub struct CommandNode {
    pub entity: String,
    pub action: Action,
    pub params: Params,
    /// The original script line, kept verbatim for reporting.
    pub line: String,
    pub status: CmdStatus,
    pub result: Option<Value>,
    pub err: Option<StratusError>,
}

impl CommandNode {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.line)
    }
}

// ------------- Templates -------------

#[derive(Debug)]
pub struct Template {
    pub id: Ulid,
    pub commands: Vec<CommandNode>,
}

impl Template {
    /// Parses a script into an ordered template. Blank lines and `#`
    /// comment lines are skipped; any malformed line fails the whole
    /// parse with its line number.
    pub fn parse(text: &str) -> Result<Template> {
        let mut commands = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            commands.push(parse_command(line, number + 1)?);
        }
        Ok(Template {
            id: Ulid::new(),
            commands,
        })
    }

    /// Runs every validator over the whole template and gathers all their
    /// errors; execution must not start while this is non-empty.
    pub fn validate(&self, validators: &[&dyn Validator]) -> Vec<StratusError> {
        validators.iter().flat_map(|v| v.execute(self)).collect()
    }

    /// A template can be undone iff every one of its actions has an
    /// inverse. An empty template has nothing to revert.
    pub fn is_revertible(&self) -> bool {
        !self.commands.is_empty() && self.commands.iter().all(|c| c.action.inverse().is_some())
    }

    /// Builds the reverse template of an executed one: commands in
    /// reverse order, each action inverted, created ids fed into the
    /// matching delete. Commands that did not execute successfully left
    /// nothing behind and are skipped.
    pub fn revert(&self) -> Result<Template> {
        if !self.is_revertible() {
            return Err(StratusError::Execution(format!(
                "template {} is not revertible",
                self.id
            )));
        }
        let mut commands = Vec::new();
        for cmd in self.commands.iter().rev() {
            if cmd.status != CmdStatus::ExecutedOk {
                continue;
            }
            let action = match cmd.action.inverse() {
                Some(action) => action,
                None => continue,
            };
            let params = match cmd.action {
                Action::Create => {
                    let id = match &cmd.result {
                        Some(Value::String(id)) if !id.is_empty() => id.clone(),
                        _ => {
                            return Err(StratusError::Execution(format!(
                                "create {} produced no identifier to delete",
                                cmd.entity
                            )));
                        }
                    };
                    let mut params = Params::new();
                    params.insert("id".to_owned(), ParamValue::Str(id));
                    params
                }
                _ => cmd.params.clone(),
            };
            let line = render_line(action, &cmd.entity, &params);
            commands.push(CommandNode {
                entity: cmd.entity.clone(),
                action,
                params,
                line,
                status: CmdStatus::Parsed,
                result: None,
                err: None,
            });
        }
        Ok(Template {
            id: Ulid::new(),
            commands,
        })
    }
}

fn render_line(action: Action, entity: &str, params: &Params) -> String {
    let mut line = format!("{} {}", action, entity);
    for (key, value) in params {
        line.push_str(&format!(" {}={}", key, value));
    }
    line
}

fn parse_command(line: &str, number: usize) -> Result<CommandNode> {
    let mut pairs = ScriptParser::parse(Rule::command, line).map_err(|e| StratusError::Parse {
        message: format!("malformed command '{}': {}", line, e.variant.message()),
        line: number,
    })?;
    let mut inner = pairs.next().unwrap().into_inner();
    let action_name = inner.next().unwrap().as_str();
    let action = Action::from_name(action_name).ok_or_else(|| StratusError::Parse {
        message: format!("unknown action '{}'", action_name),
        line: number,
    })?;
    let entity = inner.next().unwrap().as_str().to_owned();
    let mut params = Params::new();
    for pair in inner {
        if pair.as_rule() != Rule::param {
            continue;
        }
        let mut kv = pair.into_inner();
        let key = kv.next().unwrap().as_str().to_owned();
        let value_pair = kv.next().unwrap().into_inner().next().unwrap();
        let value = match value_pair.as_rule() {
            Rule::quoted => {
                ParamValue::Str(value_pair.into_inner().next().unwrap().as_str().to_owned())
            }
            Rule::alias => {
                ParamValue::Alias(value_pair.into_inner().next().unwrap().as_str().to_owned())
            }
            Rule::reference => {
                ParamValue::Ref(value_pair.into_inner().next().unwrap().as_str().to_owned())
            }
            Rule::bare => {
                let text = value_pair.as_str();
                match text.parse::<i64>() {
                    Ok(i) => ParamValue::Int(i),
                    Err(_) => ParamValue::Str(text.to_owned()),
                }
            }
            _ => unreachable!(),
        };
        params.insert(key, value);
    }
    Ok(CommandNode {
        entity,
        action,
        params,
        line: line.to_owned(),
        status: CmdStatus::Parsed,
        result: None,
        err: None,
    })
}
