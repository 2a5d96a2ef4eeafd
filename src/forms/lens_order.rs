//! Optical lens order: nested prescription and lens groups, deposit and ready date.
use super::p;
use crate::compute::{Calculator, DerivedField};
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck};
use crate::session::{RevalidateMode, ValidationMode};
use crate::store::FormSchema;

pub const NAME: &str = "lens_order";

pub const LENS_TYPES: [&str; 4] = ["Single vision", "Bifocal", "Progressive", "Other"];
pub const COATINGS: [&str; 5] = ["None", "Anti-reflective", "Blue light", "Photochromic", "Other"];

fn range(min: f64, max: f64) -> FieldCheck {
    FieldCheck::Range { min: Some(min), max: Some(max) }
}

fn options(list: &[&str]) -> FieldCheck {
    FieldCheck::OneOf(list.iter().map(|s| s.to_string()).collect())
}

pub fn schema() -> Result<FormSchema, Vec<SchemaError>> {
    let other_lens = Condition::equals(p("lens.type")?, "Other");
    let other_coating = Condition::equals(p("lens.coating")?, "Other");
    let sphere = "Sphere must be between -20.00 and +20.00";
    let cylinder = "Cylinder must be between -10.00 and +10.00";

    FormSchema::builder(NAME)
        .field(p("patient_name")?)
        .field(p("order_date")?)
        .field(p("lens.type")?)
        .visible_when(p("lens.type_other")?, other_lens.clone())
        .default_value(p("lens.coating")?, "None")
        .visible_when(p("lens.coating_other")?, other_coating.clone())
        .field(p("prescription.right.sphere")?)
        .field(p("prescription.right.cylinder")?)
        .field(p("prescription.left.sphere")?)
        .field(p("prescription.left.cylinder")?)
        .field(p("prescription.pupillary_distance")?)
        .field(p("pricing.total")?)
        .field(p("pricing.deposit")?)
        .default_value(p("turnaround")?, 10.0)
        .default_value(p("turnaround_unit")?, "days")
        .check_with_message(p("patient_name")?, FieldCheck::Required, "Patient name is required")
        .check_with_message(p("order_date")?, FieldCheck::Required, "Order date is required")
        .check(p("order_date")?, FieldCheck::Date)
        .check_with_message(p("lens.type")?, FieldCheck::Required, "Select a lens type")
        .check(p("lens.type")?, options(&LENS_TYPES))
        .rule(CrossFieldRule::required_when(other_lens, p("lens.type_other")?, "Please specify the lens type"))
        .check(p("lens.coating")?, options(&COATINGS))
        .rule(CrossFieldRule::required_when(
            other_coating,
            p("lens.coating_other")?,
            "Please specify the coating",
        ))
        .check_with_message(p("prescription.right.sphere")?, FieldCheck::Required, "Right sphere is required")
        .check_with_message(p("prescription.right.sphere")?, range(-20.0, 20.0), sphere)
        .check_with_message(p("prescription.right.cylinder")?, range(-10.0, 10.0), cylinder)
        .check_with_message(p("prescription.left.sphere")?, FieldCheck::Required, "Left sphere is required")
        .check_with_message(p("prescription.left.sphere")?, range(-20.0, 20.0), sphere)
        .check_with_message(p("prescription.left.cylinder")?, range(-10.0, 10.0), cylinder)
        .check_with_message(
            p("prescription.pupillary_distance")?,
            range(40.0, 80.0),
            "Pupillary distance must be between 40 and 80 mm",
        )
        .check(p("pricing.total")?, FieldCheck::Money)
        .rule(CrossFieldRule::WithinBalance { balance: p("pricing.total")?, amount: p("pricing.deposit")? })
        .derived(DerivedField::new(
            p("pricing.balance_due")?,
            Calculator::RemainingBalance { balance: p("pricing.total")?, amount: p("pricing.deposit")? },
        ))
        .derived(
            DerivedField::new(
                p("ready_date")?,
                Calculator::DateOffset {
                    from: Some(p("order_date")?),
                    amount: p("turnaround")?,
                    unit: p("turnaround_unit")?,
                },
            )
            .overridable(),
        )
        .rule(CrossFieldRule::DateOrder {
            start: p("order_date")?,
            end: p("ready_date")?,
            message: "Ready date cannot be before the order date".into(),
        })
        .mode(ValidationMode::OnTouched)
        .revalidate_mode(RevalidateMode::OnBlur)
        .build()
}
