//! `each_call` hooks around every instrumented call.

use std::cell::{Cell, RefCell};

use super::common::{assert_no_violation, expect_violation};
use pacta::{contracts, EvalContext};

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

/// Counts hook invocations; `x` and `y` record what the first pair of hooks
/// had done when the second pair ran.
#[derive(Default)]
struct Counters {
    first_before: Cell<u32>,
    first_after: Cell<u32>,
    second_before: Cell<u32>,
    second_after: Cell<u32>,
    x: Cell<u32>,
    y: Cell<u32>,
}

#[contracts(
    each_call(before = Self::first_before_hook, after = Self::first_after_hook),
    each_call(before = Self::second_before_hook, after = Self::second_after_hook),
)]
impl Counters {
    fn new() -> Self {
        Counters::default()
    }

    fn sum(&self, s1: i64, s2: i64) -> i64 {
        s1 + s2
    }

    fn next(&self, n: i64) -> i64 {
        n + 1
    }

    fn first_before_calls_equals(&self, expected: u32) -> bool {
        self.first_before.get() == expected
    }

    fn first_after_calls_equals(&self, expected: u32) -> bool {
        self.first_after.get() == expected
    }

    #[exempt]
    fn first_before_hook(&self) {
        bump(&self.first_before);
    }

    #[exempt]
    fn first_after_hook(&self) {
        bump(&self.first_after);
    }

    #[exempt]
    fn second_before_hook(&self) {
        bump(&self.second_before);
        self.x.set(self.first_before.get());
    }

    #[exempt]
    fn second_after_hook(&self) {
        bump(&self.second_after);
        self.y.set(self.first_after.get());
    }
}

thread_local! {
    static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(stage: &str, ctx: &EvalContext<'_, Doubler>) {
    let line = format!(
        "{} {} arg={:?} ret={:?}",
        stage,
        ctx.method(),
        ctx.arg::<i64>("n"),
        ctx.ret::<i64>()
    );
    CALLS.with(|calls| calls.borrow_mut().push(line));
}

fn recorded() -> Vec<String> {
    CALLS.with(|calls| calls.borrow_mut().drain(..).collect())
}

struct Doubler;

#[contracts(each_call(
    before = |ctx| record("before", ctx),
    after = |ctx| record("after", ctx),
))]
impl Doubler {
    #[pre(*n >= 0)]
    fn double(&self, n: i64) -> i64 {
        n * 2
    }
}

// ============================================================================
// COUNTING
// ============================================================================

#[test]
fn test_hooks_leave_the_return_value_alone() {
    let counters = Counters::new();
    assert_eq!(counters.sum(1, 5), 6);

    // Construction runs the after hooks too
    assert_eq!(counters.first_before.get(), 1);
    assert_eq!(counters.first_after.get(), 2);
}

#[test]
fn test_hooks_run_on_every_instrumented_method() {
    let counters = Counters::new();
    counters.sum(1, 5);
    counters.next(3);

    assert_eq!(counters.first_before.get(), 2);
    assert_eq!(counters.first_after.get(), 3);
}

#[test]
fn test_before_hook_runs_ahead_of_the_body() {
    let counters = Counters::new();
    counters.sum(2, 2);

    assert!(counters.first_before_calls_equals(2));
    assert_eq!(counters.first_before.get(), 2);
}

#[test]
fn test_after_hook_runs_once_the_body_returns() {
    let counters = Counters::new();
    counters.sum(2, 2);

    assert!(counters.first_after_calls_equals(2));
    assert_eq!(counters.first_after.get(), 3);
}

#[test]
fn test_every_registered_pair_runs() {
    let counters = Counters::new();
    counters.sum(4, 4);

    assert_eq!(counters.first_before.get(), 1);
    assert_eq!(counters.first_after.get(), 2);
    assert_eq!(counters.second_before.get(), 1);
    assert_eq!(counters.second_after.get(), 2);
}

#[test]
fn test_pairs_run_in_registration_order() {
    let counters = Counters::new();
    counters.sum(4, 4);

    assert_eq!(counters.x.get(), 1);
    assert_eq!(counters.y.get(), 2);
}

// ============================================================================
// CONTEXT
// ============================================================================

#[test]
fn test_closure_hooks_see_the_call() {
    recorded();
    assert_eq!(Doubler.double(4), 8);

    assert_eq!(
        recorded(),
        vec![
            "before double arg=Some(4) ret=None",
            "after double arg=None ret=Some(8)",
        ]
    );
}

#[test]
fn test_before_hooks_run_even_when_the_precondition_fails() {
    recorded();
    let violation = expect_violation(|| Doubler.double(-1));

    assert!(violation.is_precondition());
    assert_eq!(recorded(), vec!["before double arg=Some(-1) ret=None"]);
}

#[test]
fn test_uninstrumented_methods_skip_hooks() {
    let counters = Counters::new();
    assert_no_violation(|| counters.first_before_hook());

    assert_eq!(counters.first_before.get(), 1);
    assert_eq!(counters.second_before.get(), 0);
}
