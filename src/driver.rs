//! Driver registry and blocking-check helpers.
//!
//! For every `(entity, action)` pair the engine expects two functions: a
//! dry-run variant performing validation only and a real variant doing
//! the remote call. The registry is populated explicitly at startup;
//! a missing pair is a configuration error surfaced before any command
//! touches remote state, never mid-template.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StratusError};
use crate::script::{Action, Params, Template};

/// Both driver variants share this shape: parameters in, an arbitrary
/// driver-specific value out.
pub type DriverFn = Box<dyn Fn(&Params) -> Result<Value> + Send + Sync>;

pub struct DriverPair {
    pub dry_run: DriverFn,
    pub run: DriverFn,
}

#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<(String, Action), DriverPair>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both variants for one pair; registering a pair twice is
    /// refused so a typo cannot silently shadow a driver.
    pub fn register(
        &mut self,
        entity: &str,
        action: Action,
        dry_run: DriverFn,
        run: DriverFn,
    ) -> Result<()> {
        let key = (entity.to_owned(), action);
        if self.drivers.contains_key(&key) {
            return Err(StratusError::Registry(format!(
                "driver for '{} {}' registered twice",
                action, entity
            )));
        }
        self.drivers.insert(key, DriverPair { dry_run, run });
        Ok(())
    }

    pub fn get(&self, entity: &str, action: Action) -> Result<&DriverPair> {
        self.drivers
            .get(&(entity.to_owned(), action))
            .ok_or_else(|| {
                StratusError::Registry(format!("no driver registered for '{} {}'", action, entity))
            })
    }

    /// Checks every command of a template against the registry up front.
    pub fn ensure(&self, template: &Template) -> Result<()> {
        for cmd in &template.commands {
            self.get(&cmd.entity, cmd.action)?;
        }
        Ok(())
    }

    /// Plan-mode registry covering exactly the pairs a template uses:
    /// dry runs succeed without side effects, real runs refuse.
    pub fn offline_for(template: &Template) -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        for cmd in &template.commands {
            let key = (cmd.entity.clone(), cmd.action);
            if registry.drivers.contains_key(&key) {
                continue;
            }
            let what = format!("{} {}", cmd.action, cmd.entity);
            let dry_what = what.clone();
            let dry_run: DriverFn = Box::new(move |_params| {
                debug!(command = %dry_what, "offline dry run ok");
                Ok(Value::Null)
            });
            let run: DriverFn = Box::new(move |_params| {
                Err(StratusError::Execution(format!(
                    "'{}' has no offline driver",
                    what
                )))
            });
            registry.drivers.insert(key, DriverPair { dry_run, run });
        }
        registry
    }
}

// ------------- Blocking checks -------------

/// Poll loop for check-style commands ("wait until the instance is
/// running"). The probe reports readiness; a deadline overrun is a
/// [`StratusError::Timeout`], which callers can tell apart from the probe
/// itself breaking.
pub struct Wait {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Wait {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn until<F>(&self, mut probe: F) -> Result<()>
    where
        F: FnMut() -> Result<bool>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if probe()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StratusError::Timeout {
                    after: self.timeout,
                });
            }
            thread::sleep(self.interval);
        }
    }
}
