//! Derived-field calculators and the pass that keeps them current.
pub mod calendar;
pub mod derived;
pub mod engine;
pub mod ledger;
pub mod money;

pub use derived::{Calculator, CustomCalculator, DerivedField};
pub use engine::Deriver;
pub use ledger::DerivedLedger;
pub use money::Money;
