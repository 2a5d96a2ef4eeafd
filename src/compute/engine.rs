//! A synchronous derivation pass over a form snapshot.
use super::ledger::{DerivedLedger, Fingerprint};
use crate::clock::Context;
use crate::store::{FieldPath, FormSchema, FormValue};
use log::{debug, trace, warn};

pub struct Deriver<'a> {
    schema: &'a FormSchema,
}

impl<'a> Deriver<'a> {
    pub fn new(schema: &'a FormSchema) -> Self {
        Self { schema }
    }

    /// Brings every derived field up to date with the snapshot.
    ///
    /// Fields are visited in dependency order, so a derived field that reads
    /// another sees this pass's value. A target is only rewritten when its inputs
    /// changed since the last write, and never while the user has overridden it.
    /// Returns the targets that were written or cleared.
    pub fn derive(&self, values: &mut FormValue, ledger: &mut DerivedLedger, ctx: &Context) -> Vec<FieldPath> {
        let mut written = Vec::new();

        for field in self.schema.derived_in_order() {
            let target = &field.target;
            if ledger.is_overridden(target) {
                trace!("{}: '{}' keeps its manual value", self.schema.name(), target);
                continue;
            }

            let fingerprint = Fingerprint {
                inputs: field.depends_on.iter().map(|p| values.get(p).cloned()).collect(),
                today: field.calculator.reads_clock().then_some(ctx.today),
            };
            if ledger.is_fresh(target, &fingerprint) {
                continue;
            }

            let result = match field.calculator.compute(values, ctx) {
                Some(value) => values.set(target, value).map(|_| ()),
                None => {
                    values.remove(target);
                    Ok(())
                }
            };
            match result {
                Ok(()) => {
                    debug!("{}: derived '{}' = {:?}", self.schema.name(), target, values.get(target));
                    ledger.record(target, fingerprint);
                    written.push(target.clone());
                }
                Err(e) => warn!("{}: cannot write derived field: {}", self.schema.name(), e),
            }
        }

        written
    }

    /// Takes over a pre-filled snapshot, such as a saved record or a submitted payload.
    ///
    /// A value already stored on an overridable target that its inputs would
    /// not produce was picked by hand, so it is marked overridden and kept.
    pub fn adopt(&self, values: &FormValue, ledger: &mut DerivedLedger, ctx: &Context) {
        for field in self.schema.derived_in_order().filter(|f| f.overridable) {
            let Some(stored) = values.get(&field.target).filter(|v| !v.is_blank()) else {
                continue;
            };
            if field.calculator.compute(values, ctx).as_ref() != Some(stored) {
                debug!("{}: keeping saved value of '{}'", self.schema.name(), field.target);
                ledger.mark_overridden(&field.target);
            }
        }
    }

    /// Clears an override on `target` and recomputes it (the explicit "recompute" action).
    pub fn recompute(&self, target: &FieldPath, values: &mut FormValue, ledger: &mut DerivedLedger, ctx: &Context) -> Vec<FieldPath> {
        ledger.release(target);
        self.derive(values, ledger, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::derived::{Calculator, DerivedField};
    use crate::store::Value;
    use chrono::NaiveDate;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn ctx() -> Context {
        Context::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    fn follow_up_schema() -> FormSchema {
        FormSchema::builder("follow_up")
            .field(p("interval"))
            .field(p("unit"))
            .derived(
                DerivedField::new(
                    p("follow_up_date"),
                    Calculator::DateOffset { from: None, amount: p("interval"), unit: p("unit") },
                )
                .overridable(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_manual_override_survives_recomputation() {
        let schema = follow_up_schema();
        let deriver = Deriver::new(&schema);
        let mut ledger = DerivedLedger::new();
        let mut form = FormValue::new().with("interval", 2.0).with("unit", "weeks");

        deriver.derive(&mut form, &mut ledger, &ctx());
        assert_eq!(form.get(&p("follow_up_date")), Some(&Value::text("2025-01-15")));

        // The user picks a date by hand.
        form.set(&p("follow_up_date"), "2025-01-20".into()).unwrap();
        ledger.mark_overridden(&p("follow_up_date"));

        // Same inputs, then changed inputs: the manual choice stands.
        assert!(deriver.derive(&mut form, &mut ledger, &ctx()).is_empty());
        form.set(&p("interval"), Value::Number(3.0)).unwrap();
        assert!(deriver.derive(&mut form, &mut ledger, &ctx()).is_empty());
        assert_eq!(form.get(&p("follow_up_date")), Some(&Value::text("2025-01-20")));

        // Only an explicit recompute resets it.
        deriver.recompute(&p("follow_up_date"), &mut form, &mut ledger, &ctx());
        assert_eq!(form.get(&p("follow_up_date")), Some(&Value::text("2025-01-22")));
    }

    #[test]
    fn test_adopt_keeps_hand_picked_values_only() {
        let schema = follow_up_schema();
        let deriver = Deriver::new(&schema);

        let mut saved = FormValue::new()
            .with("interval", 3.0)
            .with("unit", "weeks")
            .with("follow_up_date", "2025-02-28");
        let mut ledger = DerivedLedger::new();
        deriver.adopt(&saved, &mut ledger, &ctx());
        deriver.derive(&mut saved, &mut ledger, &ctx());
        assert!(ledger.is_overridden(&p("follow_up_date")));
        assert_eq!(saved.get(&p("follow_up_date")), Some(&Value::text("2025-02-28")));

        // A stored value that matches its inputs stays calculated.
        let mut computed = FormValue::new()
            .with("interval", 3.0)
            .with("unit", "weeks")
            .with("follow_up_date", "2025-01-22");
        let mut ledger = DerivedLedger::new();
        deriver.adopt(&computed, &mut ledger, &ctx());
        assert!(!ledger.is_overridden(&p("follow_up_date")));
        computed.set(&p("interval"), Value::Number(1.0)).unwrap();
        deriver.derive(&mut computed, &mut ledger, &ctx());
        assert_eq!(computed.get(&p("follow_up_date")), Some(&Value::text("2025-01-08")));
    }

    #[test]
    fn test_only_recomputes_when_inputs_change() {
        let schema = follow_up_schema();
        let deriver = Deriver::new(&schema);
        let mut ledger = DerivedLedger::new();
        let mut form = FormValue::new().with("interval", 1.0).with("unit", "days");

        assert_eq!(deriver.derive(&mut form, &mut ledger, &ctx()).len(), 1);
        assert!(deriver.derive(&mut form, &mut ledger, &ctx()).is_empty());

        // A new day moves a today-relative preview.
        let tomorrow = Context::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(deriver.derive(&mut form, &mut ledger, &tomorrow).len(), 1);
        assert_eq!(form.get(&p("follow_up_date")), Some(&Value::text("2025-01-03")));
    }

    #[test]
    fn test_incomplete_inputs_clear_the_target() {
        let schema = follow_up_schema();
        let deriver = Deriver::new(&schema);
        let mut ledger = DerivedLedger::new();
        let mut form = FormValue::new().with("interval", 1.0).with("unit", "days");
        deriver.derive(&mut form, &mut ledger, &ctx());

        form.remove(&p("unit"));
        deriver.derive(&mut form, &mut ledger, &ctx());
        assert!(form.get(&p("follow_up_date")).is_none());
    }

    #[test]
    fn test_chained_derived_fields_see_fresh_values() {
        let schema = FormSchema::builder("chain")
            .field(p("balance"))
            .field(p("amount"))
            .derived(DerivedField::new(
                p("label"),
                Calculator::Custom(crate::compute::derived::CustomCalculator {
                    name: "label".into(),
                    inputs: vec![p("remaining")],
                    compute: std::sync::Arc::new(|v: &FormValue, _: &Context| {
                        v.get(&FieldPath::key("remaining"))
                            .and_then(Value::as_text)
                            .map(|r| Value::text(format!("Remaining: {}", r)))
                    }),
                }),
            ))
            .derived(DerivedField::new(
                p("remaining"),
                Calculator::RemainingBalance { balance: p("balance"), amount: p("amount") },
            ))
            .build()
            .unwrap();

        let mut form = FormValue::new().with("balance", "100").with("amount", "40");
        Deriver::new(&schema).derive(&mut form, &mut DerivedLedger::new(), &ctx());
        assert_eq!(form.get(&p("label")), Some(&Value::text("Remaining: 60.00")));
    }
}
