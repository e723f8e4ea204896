//! Cached runtime parameters
//!
//! Unlike the parameter structs loaded once at init by [`crate::params`],
//! cached parameters are tuning values which may be edited while the software
//! is running. The executive refreshes the cache at a low rate (1 Hz) from a
//! TOML file under the params directory, and cyclic modules read individual
//! values through non-blocking `get_*` accessors.
//!
//! Reads never fail: a missing file, missing key or mistyped value falls back
//! to the default supplied at the call site. This keeps the control cycle
//! free of error paths for what is only tuning data.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::warn;
use std::fs::read_to_string;
use toml::value::{Table, Value};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cache of runtime tuning parameters backed by a TOML file.
pub struct CachedParams {
    /// Path of the backing file relative to the params dir, `None` for a
    /// cache with no backing file (tests, replay without tuning).
    file_name: Option<String>,

    /// The last successfully parsed parameter tree.
    values: Value,

    /// Whether a load failure has already been reported.
    warned: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CachedParams {
    fn default() -> Self {
        Self::empty()
    }
}

impl CachedParams {
    /// Create an empty cache with no backing file. All reads return their
    /// defaults.
    pub fn empty() -> Self {
        Self {
            file_name: None,
            values: Value::Table(Table::new()),
            warned: false,
        }
    }

    /// Create a cache from a TOML string, with no backing file.
    pub fn from_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        Ok(Self {
            file_name: None,
            values: toml_str.parse::<Value>()?,
            warned: false,
        })
    }

    /// Create a cache backed by the given file (relative to the params dir)
    /// and attempt a first load.
    ///
    /// A missing or unparsable file is not an error, the cache simply serves
    /// defaults until a refresh succeeds.
    pub fn load(file_name: &str) -> Self {
        let mut cache = Self {
            file_name: Some(String::from(file_name)),
            values: Value::Table(Table::new()),
            warned: false,
        };
        cache.refresh();
        cache
    }

    /// Re-read the backing file, keeping the previous values if the read or
    /// parse fails.
    ///
    /// Called by the executive at a low rate, never from cyclic processing.
    pub fn refresh(&mut self) {
        let file_name = match &self.file_name {
            Some(f) => f,
            None => return,
        };

        let mut path = match crate::host::get_dbw_sw_root() {
            Ok(p) => p,
            Err(_) => {
                self.warn_once("software root not set");
                return;
            }
        };
        path.push("params");
        path.push(file_name);

        let toml_str = match read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                self.warn_once(&format!("cannot read {:?}: {}", path, e));
                return;
            }
        };

        match toml_str.parse::<Value>() {
            Ok(v) => {
                self.values = v;
                self.warned = false;
            }
            Err(e) => self.warn_once(&format!("cannot parse {:?}: {}", path, e)),
        }
    }

    /// Get a float parameter by dotted key, or the default if absent.
    ///
    /// Integer values in the file are accepted and widened.
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.lookup(key) {
            Some(Value::Float(f)) => *f,
            Some(Value::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    /// Get a boolean parameter by dotted key, or the default if absent.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key) {
            Some(Value::Boolean(b)) => *b,
            _ => default,
        }
    }

    /// Walk the parameter tree along a dotted key.
    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut value = &self.values;
        for part in key.split('.') {
            value = value.get(part)?;
        }
        Some(value)
    }

    fn warn_once(&mut self, msg: &str) {
        if !self.warned {
            warn!("Cached params unavailable, serving defaults ({})", msg);
            self.warned = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_serves_defaults() {
        let cache = CachedParams::empty();
        assert_eq!(cache.get_f64("long_control.vehicle_mass", 500.0), 500.0);
        assert_eq!(cache.get_bool("settings.auto_resume", false), false);
        assert_eq!(cache.get_bool("settings.min_steer_check", true), true);
    }

    #[test]
    fn test_dotted_lookup() {
        let cache = CachedParams::from_str(
            r#"
            [long_control]
            vehicle_mass = 2326.0
            max_accel_torq = 362

            [settings]
            auto_resume = true
            "#,
        )
        .unwrap();

        assert_eq!(cache.get_f64("long_control.vehicle_mass", 500.0), 2326.0);
        // Integer values widen to floats
        assert_eq!(cache.get_f64("long_control.max_accel_torq", 500.0), 362.0);
        assert_eq!(cache.get_bool("settings.auto_resume", false), true);

        // Missing keys and type mismatches fall back
        assert_eq!(cache.get_f64("long_control.torq_start", 500.0), 500.0);
        assert_eq!(cache.get_bool("long_control.vehicle_mass", false), false);
    }
}
