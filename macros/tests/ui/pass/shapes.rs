use std::cell::Cell;

use pacta::contracts;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    limit: u32,
}

pub struct Meter {
    reading: u32,
    config: Config,
    calls: Cell<u32>,
}

#[contracts(
    invariant(self.reading <= self.config.limit),
    each_call(before = Self::count, after = Self::count),
)]
impl Meter {
    // Never evaluated: there is no instance yet.
    #[pre(config.limit > 0)]
    pub fn open(config: &Config) -> Meter {
        Meter {
            reading: 0,
            config: config.clone(),
            calls: Cell::new(0),
        }
    }

    #[pre(amount <= &self.headroom())]
    #[post(|ret| *ret == self.reading)]
    pub fn advance(&mut self, amount: u32) -> u32 {
        self.reading += amount;
        self.reading
    }

    #[post(|ret| ret.reading == 0)]
    pub fn reset(self) -> Self {
        Meter { reading: 0, ..self }
    }

    pub fn into_reading(self) -> u32 {
        self.reading
    }

    #[pre(label.len() < 16)]
    pub fn tag(&self, label: &String, note: &str) -> String {
        format!("{}:{}:{}", label, note, self.reading)
    }

    pub fn headroom(&self) -> u32 {
        self.config.limit - self.reading
    }

    // A borrow-returning `&mut self` method must opt out when there are invariants
    #[exempt]
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    #[exempt]
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

fn main() {
    let mut meter = Meter::open(&Config { limit: 0 });
    assert_eq!(meter.calls(), 1);
    meter.config_mut().limit = 10;

    assert_eq!(meter.advance(4), 4);
    assert!(pacta::catch(|| meter.advance(7)).unwrap_err().is_precondition());
    assert_eq!(meter.tag(&"a".to_string(), "b"), "a:b:4");

    // Exempt methods skip every check
    meter.config_mut().limit = 3;
    let label = "x".to_string();
    assert!(pacta::catch(|| meter.tag(&label, "y")).unwrap_err().is_invariant());
    meter.config_mut().limit = 10;

    let meter = meter.reset();
    assert_eq!(meter.into_reading(), 0);
}
