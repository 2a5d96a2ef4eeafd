use crate::store::{FieldPath, Value};
use chrono::NaiveDate;
use std::collections::HashMap;

/// What a derived value was last computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub inputs: Vec<Option<Value>>,
    /// Only recorded for calculators that read the clock.
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    computed_from: Option<Fingerprint>,
    overridden: bool,
}

/// Per-session bookkeeping for derived fields.
#[derive(Debug, Clone, Default)]
pub struct DerivedLedger {
    entries: HashMap<FieldPath, Entry>,
}

impl DerivedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_overridden(&self, target: &FieldPath) -> bool {
        self.entries.get(target).map_or(false, |e| e.overridden)
    }

    /// The user typed their own value; stop writing to this target.
    pub fn mark_overridden(&mut self, target: &FieldPath) {
        self.entries.entry(target.clone()).or_default().overridden = true;
    }

    /// Forgets both the override and the fingerprint so the next pass recomputes.
    pub fn release(&mut self, target: &FieldPath) {
        self.entries.remove(target);
    }

    pub fn is_fresh(&self, target: &FieldPath, fingerprint: &Fingerprint) -> bool {
        self.entries
            .get(target)
            .and_then(|e| e.computed_from.as_ref())
            .map_or(false, |f| f == fingerprint)
    }

    pub fn record(&mut self, target: &FieldPath, fingerprint: Fingerprint) {
        self.entries.entry(target.clone()).or_default().computed_from = Some(fingerprint);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
