//! The injected "today" supplied to rules and calculators that compare against now.

use chrono::NaiveDate;

/// Supplies the current calendar date.
///
/// Nothing in the validation or derivation core reads the wall clock directly;
/// a session asks its clock once per pass and threads the date through a `Context`.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date of the machine running the form.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Per-pass inputs that do not live in the form snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub today: NaiveDate,
}

impl Context {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self { today: clock.today() }
    }
}
