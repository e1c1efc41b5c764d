//! Runtime configuration shared by circular lag tooling.
//!
//! [`settings`] resolves the threshold and shift schedule for a run from
//! defaults, an optional TOML file and `SPIRAL_LAG_*` variables.
//! [`tracing`] installs the global subscriber that renders the events
//! emitted by `spiral-lag`.

pub mod settings;
pub mod tracing;

pub use settings::{LagSettings, ScheduleMode, ScheduleSettings, SettingsError};
pub use self::tracing::{init_tracing, init_with, InitError, TracingOptions};

#[cfg(test)]
pub(crate) mod test_env {
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
    use std::sync::{Mutex, OnceLock};

    /// Runs `test` with the given variables set (or removed), restoring the
    /// previous values afterwards. Serialised across the crate's tests.
    pub fn with_env(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                match value {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
                ((*key).to_string(), previous)
            })
            .collect();

        let result = catch_unwind(AssertUnwindSafe(test));

        for (key, value) in snapshot {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }

        if let Err(err) = result {
            resume_unwind(err);
        }
    }
}
