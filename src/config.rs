// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Enforcement settings.
//!
//! The process default comes from the `PACTA_MODE` environment variable the
//! first time a contract is checked:
//!
//! | `PACTA_MODE`          | Checks                                    |
//! |-----------------------|-------------------------------------------|
//! | unset, `all`          | preconditions, postconditions, invariants |
//! | `pre`, `preconditions`| preconditions only                        |
//! | `off`                 | none (each-call hooks still run)          |
//!
//! [`set`] replaces the default for the whole process; [`scoped`] overrides it
//! on the current thread for the duration of a closure, which is what tests
//! want since they share one process.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Environment variable read for the process default.
pub const ENV_MODE: &str = "PACTA_MODE";

/// Which contracts are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Off,
    #[serde(alias = "pre")]
    Preconditions,
    #[default]
    All,
}

impl Mode {
    pub fn checks_preconditions(self) -> bool {
        matches!(self, Mode::Preconditions | Mode::All)
    }

    /// Postconditions and invariants.
    pub fn checks_postconditions(self) -> bool {
        matches!(self, Mode::All)
    }
}

/// Unrecognised `PACTA_MODE` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contract mode '{0}' (expected off, pre, preconditions or all)")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Mode::Off),
            "pre" | "preconditions" => Ok(Mode::Preconditions),
            "all" | "" => Ok(Mode::All),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Off => f.write_str("off"),
            Mode::Preconditions => f.write_str("preconditions"),
            Mode::All => f.write_str("all"),
        }
    }
}

/// Enforcement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    /// Run `each_call` hooks.
    pub hooks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::All,
            hooks: true,
        }
    }
}

impl Config {
    pub fn with_mode(mode: Mode) -> Self {
        Config {
            mode,
            ..Config::default()
        }
    }

    /// Defaults, with the mode taken from `PACTA_MODE` when it is set and valid.
    pub fn from_env() -> Self {
        match std::env::var(ENV_MODE) {
            Ok(raw) => Self::from_env_value(&raw),
            Err(_) => Config::default(),
        }
    }

    fn from_env_value(raw: &str) -> Self {
        match raw.parse::<Mode>() {
            Ok(mode) => Config::with_mode(mode),
            Err(err) => {
                tracing::warn!(variable = ENV_MODE, "{}; checking all contracts", err);
                Config::default()
            }
        }
    }
}

static PROCESS: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::from_env()));

thread_local! {
    static OVERRIDE: Cell<Option<Config>> = const { Cell::new(None) };
}

/// Settings in effect on this thread.
pub fn current() -> Config {
    OVERRIDE
        .with(Cell::get)
        .unwrap_or_else(|| *PROCESS.read())
}

/// Replace the process-wide default.
pub fn set(config: Config) {
    *PROCESS.write() = config;
}

/// Run `f` with `config` in effect on the current thread only.
pub fn scoped<R>(config: Config, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Config>);

    impl Drop for Restore {
        fn drop(&mut self) {
            OVERRIDE.with(|slot| slot.set(self.0));
        }
    }

    let _restore = Restore(OVERRIDE.with(|slot| slot.replace(Some(config))));
    f()
}
