//! Human report rendering for executed templates.
//!
//! The header carries the creation date decoded from the template's
//! identifier and the revert id (or `<not revertible>`); one tab-aligned
//! row per command follows with status, the result when it is a string,
//! and the original command text. In detailed mode the error text of KO
//! rows is re-indented underneath them.

use chrono::{TimeZone, Utc};
use serde_json::Value;
use ulid::Ulid;

use crate::script::{CommandNode, Template};

pub struct Printer {
    pub include_errs: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            include_errs: false,
        }
    }

    pub fn with_errors() -> Self {
        Self { include_errs: true }
    }

    pub fn print_report(&self, template: &Template) -> String {
        let mut out = String::new();
        out.push_str(&format!("Date: {}", ulid_date(&template.id)));
        if template.is_revertible() {
            out.push_str(&format!(", RevertID: {}", template.id));
        } else {
            out.push_str(", RevertID: <not revertible>");
        }
        out.push('\n');

        let width = template
            .commands
            .iter()
            .map(|cmd| result_string(cmd).len())
            .max()
            .unwrap_or(0);
        for cmd in &template.commands {
            let status = if cmd.is_ok() { "OK" } else { "KO" };
            out.push_str(&format!(
                "{}\t{:<width$}\t{}\n",
                status,
                result_string(cmd),
                cmd.line,
                width = width
            ));
            if self.include_errs && !cmd.is_ok() {
                if let Some(err) = &cmd.err {
                    out.push_str(&indent_err(&err.to_string()));
                }
            }
        }
        out
    }
}

fn result_string(cmd: &CommandNode) -> String {
    match &cmd.result {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn indent_err(msg: &str) -> String {
    let clean = msg.replace('\t', "");
    let mut indented = String::new();
    for line in clean.lines() {
        indented.push_str(&format!("\t\t{}\n", line));
    }
    indented
}

fn ulid_date(id: &Ulid) -> String {
    match Utc.timestamp_millis_opt(id.timestamp_ms() as i64).single() {
        Some(t) => t.format("%b %e %H:%M:%S").to_string(),
        None => "<unknown>".to_owned(),
    }
}
