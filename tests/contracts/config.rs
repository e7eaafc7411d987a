//! Enforcement settings scoped to the current thread.

use std::cell::Cell;

use super::common::{assert_no_violation, expect_violation, Tally};
use pacta::config::{self, Config, Mode};
use pacta::contracts;

struct Guarded {
    hooks: Cell<u32>,
    value: i64,
}

#[contracts(
    invariant(self.value < 10),
    each_call(before = Self::count, after = Self::count),
)]
impl Guarded {
    #[pre(*amount > 0)]
    #[post(|ret| *ret == self.value)]
    fn add(&mut self, amount: i64) -> i64 {
        self.value += amount;
        self.value
    }

    #[exempt]
    fn count(&self) {
        self.hooks.set(self.hooks.get() + 1);
    }
}

fn guarded() -> Guarded {
    Guarded {
        hooks: Cell::new(0),
        value: 0,
    }
}

#[test]
fn test_off_skips_every_check_but_keeps_hooks() {
    let mut subject = guarded();

    config::scoped(Config::with_mode(Mode::Off), || {
        assert_eq!(assert_no_violation(|| subject.add(-1)), -1);
        assert_eq!(assert_no_violation(|| subject.add(20)), 19);
    });

    assert_eq!(subject.hooks.get(), 4);
}

#[test]
fn test_preconditions_mode_skips_return_side_checks() {
    let mut subject = guarded();

    config::scoped(Config::with_mode(Mode::Preconditions), || {
        assert_eq!(assert_no_violation(|| subject.add(20)), 20);
        let violation = expect_violation(|| subject.add(0));
        assert!(violation.is_precondition());
    });
}

#[test]
fn test_disabling_hooks_keeps_checks() {
    let mut subject = guarded();
    let settings = Config {
        hooks: false,
        ..Config::default()
    };

    config::scoped(settings, || {
        assert_no_violation(|| subject.add(1));
        let violation = expect_violation(|| subject.add(20));
        assert!(violation.is_invariant());
    });

    assert_eq!(subject.hooks.get(), 0);
}

#[test]
fn test_scope_ends_with_the_closure() {
    let before = config::current();

    config::scoped(Config::with_mode(Mode::Off), || {
        assert_eq!(config::current().mode, Mode::Off);
        assert_no_violation(|| Tally::new(100));
    });

    assert_eq!(config::current(), before);
}

#[test]
fn test_scope_is_restored_after_a_violation() {
    let inner = Config::with_mode(Mode::Preconditions);

    config::scoped(inner, || {
        expect_violation(|| {
            config::scoped(Config::default(), || Tally::new(0));
        });
        assert_eq!(config::current(), inner);
    });
}
