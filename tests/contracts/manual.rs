//! Contracts declared by hand through the registry, with methods routed
//! through the interceptor.

use pacta::interceptor::{self, Frame};
use pacta::{ContractError, ContractRegistry, Contracted, Timing, ViolationKind};

#[derive(Debug)]
struct Account {
    cents: i64,
}

impl Contracted for Account {
    fn declare(registry: &mut ContractRegistry<Self>) {
        registry.register_invariant("cents >= 0", |ctx| ctx.cents >= 0);

        registry.stage_precondition("amount > 0", |ctx| match ctx.arg::<i64>("amount") {
            Some(amount) => *amount > 0,
            None => ctx.unbound("amount"),
        });
        registry.stage_postcondition("ret == cents", |ctx| ctx.ret::<i64>() == Some(&ctx.cents));
        registry.on_method_defined("deposit");

        registry.on_method_defined("balance");

        registry.method("withdraw").pre("amount <= cents", |ctx| {
            ctx.arg::<i64>("amount")
                .map_or_else(|| ctx.unbound("amount"), |amount| *amount <= ctx.cents)
        });
    }
}

impl Account {
    fn open(cents: i64) -> Result<Self, ContractError> {
        let frame = Frame::constructor("open").arg("cents", &cents);
        interceptor::construct(frame, || Account { cents })
    }

    fn deposit(&mut self, amount: i64) -> Result<i64, ContractError> {
        let frame = Frame::method("deposit").arg("amount", &amount);
        interceptor::invoke_mut(self, frame, |account| {
            account.cents += amount;
            account.cents
        })
    }

    fn withdraw(&mut self, amount: i64) -> Result<i64, ContractError> {
        let frame = Frame::method("withdraw").arg("amount", &amount);
        interceptor::invoke_mut(self, frame, |account| {
            account.cents -= amount;
            account.cents
        })
    }

    /// Forgets to record its argument.
    fn withdraw_unrecorded(&mut self, amount: i64) -> Result<i64, ContractError> {
        interceptor::invoke_mut(self, Frame::method("withdraw"), |account| {
            account.cents -= amount;
            account.cents
        })
    }

    fn balance(&self) -> Result<i64, ContractError> {
        interceptor::invoke(self, Frame::method("balance"), |account| account.cents)
    }
}

/// Declares nothing before naming its method.
struct Quiet;

impl Contracted for Quiet {
    fn declare(registry: &mut ContractRegistry<Self>) {
        registry.on_method_defined("m");
    }
}

#[test]
fn test_staged_conditions_bind_to_the_next_method() {
    let registry = Account::contracts();

    assert!(registry.has_condition("deposit", Timing::Pre));
    assert!(registry.has_condition("deposit", Timing::Post));
    assert!(registry.conditions("balance").is_some_and(|c| c.is_empty()));
    assert!(registry.has_condition("withdraw", Timing::Pre));
    assert!(!registry.has_condition("withdraw", Timing::Post));

    let mut methods: Vec<_> = registry.methods().collect();
    methods.sort_unstable();
    assert_eq!(methods, vec!["balance", "deposit", "withdraw"]);
}

#[test]
fn test_interceptor_returns_violations_as_errors() {
    let mut account = Account::open(100).unwrap();

    assert_eq!(account.deposit(50).unwrap(), 150);
    assert_eq!(account.withdraw(30).unwrap(), 120);
    assert_eq!(account.balance().unwrap(), 120);

    let err = account.deposit(0).unwrap_err();
    assert_eq!(err.timing(), Some(Timing::Pre));
    assert_eq!(err.method(), "deposit");

    let err = account.withdraw(500).unwrap_err();
    assert_eq!(err.clause(), "amount <= cents");
    assert_eq!(account.balance().unwrap(), 120);
}

#[test]
fn test_constructor_checks_invariants() {
    let err = Account::open(-5).unwrap_err();
    assert_eq!(err.kind(), ViolationKind::Invariant);
    assert_eq!(err.method(), "open");
    assert_eq!(err.clause(), "cents >= 0");
}

#[test]
fn test_unrecorded_argument_fails_the_predicate() {
    let mut account = Account::open(100).unwrap();

    let err = account.withdraw_unrecorded(10).unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(account.balance().unwrap(), 100);
}

#[test]
fn test_registry_is_shared_across_lookups() {
    let first = Account::contracts();
    let second = pacta::registry::of::<Account>();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn test_methods_named_before_enabling_are_ignored() {
    let registry = Quiet::contracts();
    assert!(!registry.is_enabled());
    assert!(registry.conditions("m").is_none());
}
