//! Shared test utilities and fixtures.

#![allow(dead_code)]

use pacta::contracts;

// Re-export canonical test utilities from pacta::testing
pub use pacta::testing::{assert_no_violation, assert_violation, expect_violation, Witness};

// ============================================================================
// FIXTURES
// ============================================================================

/// Carries the witness a test watches. Embedded by fixtures that need to
/// prove whether a body ran.
pub struct Subject {
    pub witness: Witness,
}

#[contracts]
impl Subject {
    pub fn new(witness: Witness) -> Self {
        Subject { witness }
    }

    pub fn notify(&self) {
        self.witness.notify();
    }
}

/// A running total that must stay within `5..=20`.
#[derive(Debug)]
pub struct Tally {
    total: i64,
}

#[contracts(
    invariant(self.total <= 20),
    invariant(self.total >= 5),
)]
impl Tally {
    pub fn new(total: i64) -> Self {
        Tally { total }
    }

    pub fn add(&mut self, x: i64) -> i64 {
        self.total += x;
        self.total
    }

    #[exempt]
    pub fn total(&self) -> i64 {
        self.total
    }
}

/// Range the `Tally` invariants allow.
pub const TALLY_RANGE: std::ops::RangeInclusive<i64> = 5..=20;

/// Stop the panic hook from printing contract violations; other panics are
/// reported as usual. Process-wide, installed once.
pub fn silence_violations() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        let default = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if !info.payload().is::<pacta::ContractError>() {
                default(info);
            }
        }));
    });
}
