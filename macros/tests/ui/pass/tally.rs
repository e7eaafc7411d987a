use pacta::contracts;

pub struct Tally {
    total: i64,
}

#[contracts(
    invariant(self.total <= 20),
    invariant(self.total >= 5),
    each_call(before = |ctx| assert!(!ctx.method().is_empty()), after = |_| {}),
)]
impl Tally {
    pub fn new(total: i64) -> Self {
        Tally { total }
    }

    #[pre(amount != &0)]
    #[post(|ret| *ret == self.total)]
    pub fn add(&mut self, amount: i64) -> i64 {
        self.total += amount;
        self.total
    }

    #[exempt]
    pub fn total(&self) -> i64 {
        self.total
    }
}

fn main() {
    let mut tally = Tally::new(5);
    assert_eq!(tally.add(5), 10);

    let err = pacta::catch(|| tally.add(0)).unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(tally.total(), 10);

    let err = pacta::catch(|| tally.add(20)).unwrap_err();
    assert!(err.is_invariant());
    assert_eq!(tally.total(), 30);

    assert!(pacta::catch(|| Tally::new(21)).is_err());
}
