//! New-patient intake: contact details, insurance, and a repeatable household members group.
use super::p;
use crate::clock::Context;
use crate::compute::{Calculator, CustomCalculator, DerivedField};
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck};
use crate::session::ValidationMode;
use crate::store::{FieldPath, FormSchema, FormValue, Value};
use chrono::Datelike;
use std::sync::Arc;

pub const NAME: &str = "patient_intake";

pub const RELATIONSHIPS: [&str; 5] = ["Spouse", "Child", "Parent", "Sibling", "Other"];

/// Whole years between `dob` and today. Empty for a missing or future date of birth.
fn age_calculator(dob: FieldPath) -> CustomCalculator {
    CustomCalculator {
        name: "age".into(),
        inputs: vec![dob.clone()],
        compute: Arc::new(move |values: &FormValue, ctx: &Context| {
            let born = values.get(&dob)?.as_date()?;
            if born > ctx.today {
                return None;
            }
            let mut years = ctx.today.year() - born.year();
            if (ctx.today.month(), ctx.today.day()) < (born.month(), born.day()) {
                years -= 1;
            }
            Some(Value::Number(f64::from(years)))
        }),
    }
}

pub fn schema() -> Result<FormSchema, Vec<SchemaError>> {
    let insured = Condition::is_true(p("insurance.has_insurance")?);
    let other_relationship = Condition::equals(p("persons[*].relationship")?, "Other");

    FormSchema::builder(NAME)
        .field(p("first_name")?)
        .field(p("last_name")?)
        .field(p("date_of_birth")?)
        .field(p("email")?)
        .field(p("phone")?)
        .default_value(p("insurance.has_insurance")?, false)
        .visible_when(p("insurance.provider")?, insured.clone())
        .visible_when(p("insurance.policy_number")?, insured.clone())
        .field(p("persons[*].name")?)
        .field(p("persons[*].relationship")?)
        .visible_when(p("persons[*].relationship_other")?, other_relationship.clone())
        .field(p("persons[*].phone")?)
        .check_with_message(p("first_name")?, FieldCheck::Required, "First name is required")
        .check_with_message(p("last_name")?, FieldCheck::Required, "Last name is required")
        .check_with_message(p("date_of_birth")?, FieldCheck::Required, "Date of birth is required")
        .check(p("date_of_birth")?, FieldCheck::Date)
        .rule(CrossFieldRule::NotAfterToday {
            path: p("date_of_birth")?,
            message: "Date of birth cannot be in the future".into(),
        })
        .check(p("email")?, FieldCheck::Email)
        .check(p("phone")?, FieldCheck::Phone)
        .rule(CrossFieldRule::required_when(
            Condition::is_true(p("insurance.has_insurance")?),
            p("insurance.provider")?,
            "Enter the insurance provider",
        ))
        .rule(CrossFieldRule::required_when(
            insured,
            p("insurance.policy_number")?,
            "Enter the policy number",
        ))
        .check_with_message(p("persons[*].name")?, FieldCheck::Required, "Name is required")
        .check(p("persons[*].relationship")?, FieldCheck::OneOf(RELATIONSHIPS.iter().map(|s| s.to_string()).collect()))
        .rule(CrossFieldRule::required_when(
            other_relationship,
            p("persons[*].relationship_other")?,
            "Please specify the relationship",
        ))
        .check(p("persons[*].phone")?, FieldCheck::Phone)
        .derived(DerivedField::new(p("age")?, Calculator::Custom(age_calculator(p("date_of_birth")?))))
        .mode(ValidationMode::OnBlur)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::forms::testing::{clock, p};
    use crate::session::FormSession;
    use crate::store::PathError;

    fn filled() -> FormSession {
        let mut s = FormSession::new(Arc::new(schema().unwrap()), clock());
        s.change(&p("first_name"), "Ana").unwrap();
        s.change(&p("last_name"), "Lima").unwrap();
        s.change(&p("date_of_birth"), "1990-01-02").unwrap();
        s
    }

    #[test]
    fn test_age_is_derived_from_date_of_birth() {
        let mut s = filled();
        assert_eq!(s.get(&p("age")), Some(&Value::Number(34.0)));
        s.change(&p("date_of_birth"), "1990-01-01").unwrap();
        assert_eq!(s.get(&p("age")), Some(&Value::Number(35.0)));
        s.clear(&p("date_of_birth")).unwrap();
        assert!(s.get(&p("age")).is_none());
    }

    #[test]
    fn test_household_member_other_relationship_is_scoped_to_that_member() {
        let mut s = filled();
        s.change(&p("persons[0].name"), "Rui Lima").unwrap();
        s.change(&p("persons[0].relationship"), "Spouse").unwrap();
        s.change(&p("persons[1].name"), "Marta Souza").unwrap();
        s.change(&p("persons[1].relationship"), "Other").unwrap();

        assert!(s.is_visible(&p("persons[1].relationship_other")));
        assert!(!s.is_visible(&p("persons[0].relationship_other")));

        let result = s.submit().unwrap_err();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].field_path.to_string(), "persons[1].relationship_other");

        s.change(&p("persons[1].relationship_other"), "Caregiver").unwrap();
        assert!(s.visible_issues().is_empty());
        assert!(s.submit().is_ok());
    }

    #[test]
    fn test_member_index_must_extend_the_list_by_one() {
        let mut s = filled();
        s.change(&p("persons[0].name"), "Rui Lima").unwrap();
        for path in ["persons[5].name", "persons[18446744073709551615].name"] {
            assert!(matches!(s.change(&p(path), "x"), Err(SessionError::Path(PathError::Shape(_)))), "{}", path);
        }
        assert!(s.change(&p("persons[1].name"), "Marta Souza").is_ok());
    }

    #[test]
    fn test_member_without_name() {
        let mut s = filled();
        s.change(&p("persons[0].relationship"), "Child").unwrap();
        let result = s.submit().unwrap_err();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].field_path.to_string(), "persons[0].name");
    }

    #[test]
    fn test_insurance_details_follow_checkbox() {
        let mut s = filled();
        s.change(&p("insurance.has_insurance"), true).unwrap();
        let result = s.submit().unwrap_err();
        let fields: Vec<String> = result.issues.iter().map(|i| i.field_path.to_string()).collect();
        assert_eq!(fields, vec!["insurance.provider", "insurance.policy_number"]);

        s.change(&p("insurance.has_insurance"), false).unwrap();
        assert!(s.visible_issues().is_empty());
    }

    #[test]
    fn test_contact_formats() {
        let mut s = filled();
        s.change(&p("email"), "ana@").unwrap();
        s.change(&p("phone"), "+351 912 345 678").unwrap();
        s.blur(&p("email")).unwrap();
        s.blur(&p("phone")).unwrap();
        let messages: Vec<&str> = s.visible_issues().iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["Enter a valid email address"]);
    }
}
