//! The form schema: declared fields, rules and derived fields, checked once at construction.
use super::path::FieldPath;
use super::types::{FormValue, Value};
use crate::analysis::{topology, validation};
use crate::clock::Context;
use crate::compute::derived::DerivedField;
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck, FieldRule, Rule};
use crate::session::{RevalidateMode, ValidationMode};
use crate::validation::{ValidationResult, Validator};
use log::warn;

/// One declared field (or, for a template path, one field of every group element).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub path: FieldPath,
    /// Value seeded when the form mounts or resets. `None` leaves the field absent.
    pub default: Option<Value>,
    /// The field is only shown (and only validated) while this holds.
    pub visible_when: Option<Condition>,
}

impl FieldSpec {
    pub fn new(path: FieldPath) -> Self {
        Self { path, default: None, visible_when: None }
    }
}

/// An immutable, validated form declaration shared by every session of that form.
#[derive(Debug, Clone)]
pub struct FormSchema {
    name: String,
    fields: Vec<FieldSpec>,
    rules: Vec<Rule>,
    derived: Vec<DerivedField>,
    derived_order: Vec<usize>,
    mode: ValidationMode,
    revalidate_mode: RevalidateMode,
}

impl FormSchema {
    pub fn builder(name: impl Into<String>) -> FormSchemaBuilder {
        FormSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            rules: Vec::new(),
            derived: Vec::new(),
            mode: ValidationMode::default(),
            revalidate_mode: RevalidateMode::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn revalidate_mode(&self) -> RevalidateMode {
        self.revalidate_mode
    }

    /// The declaration a concrete or template path belongs to.
    pub fn field_spec(&self, path: &FieldPath) -> Option<&FieldSpec> {
        let template = path.template();
        self.fields.iter().find(|f| f.path == template)
    }

    pub fn is_declared(&self, path: &FieldPath) -> bool {
        self.field_spec(path).is_some()
    }

    pub fn derived_field(&self, target: &FieldPath) -> Option<&DerivedField> {
        self.derived.iter().find(|d| &d.target == target)
    }

    /// Derived fields in evaluation order (producers before consumers).
    pub fn derived_in_order(&self) -> impl Iterator<Item = &DerivedField> {
        self.derived_order.iter().map(move |&i| &self.derived[i])
    }

    /// A fresh snapshot holding every declared default, in declaration order.
    pub fn defaults(&self) -> FormValue {
        let mut values = FormValue::new();
        for spec in &self.fields {
            if let Some(default) = &spec.default {
                // Template defaults are rejected at build time, so this cannot fail on shape.
                if let Err(e) = values.set(&spec.path, default.clone()) {
                    warn!("{}: skipping default for '{}': {}", self.name, spec.path, e);
                }
            }
        }
        values
    }

    /// Evaluates the field's visibility condition on `values`. Undeclared and
    /// unconditional fields are visible.
    pub fn is_visible(&self, path: &FieldPath, values: &FormValue) -> bool {
        match self.field_spec(path).and_then(|f| f.visible_when.as_ref()) {
            Some(cond) => cond.holds(values, path),
            None => true,
        }
    }

    /// True when `path` decides whether another field is required or shown.
    pub fn is_governing(&self, path: &FieldPath) -> bool {
        let template = path.template();
        let conditions = self
            .rules
            .iter()
            .filter_map(|r| match r {
                Rule::Cross(CrossFieldRule::RequiredWhen { when, .. }) => Some(when),
                _ => None,
            })
            .chain(self.fields.iter().filter_map(|f| f.visible_when.as_ref()));
        conditions.flat_map(Condition::reads).any(|p| p.template() == template)
    }

    /// Validates a snapshot against every declared rule.
    pub fn validate(&self, values: &FormValue, ctx: &Context) -> ValidationResult {
        Validator::new(&self.rules).with_visibility(self).validate(values, ctx)
    }
}

pub struct FormSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    rules: Vec<Rule>,
    derived: Vec<DerivedField>,
    mode: ValidationMode,
    revalidate_mode: RevalidateMode,
}

impl FormSchemaBuilder {
    fn spec_mut(&mut self, path: &FieldPath) -> &mut FieldSpec {
        match self.fields.iter().position(|f| &f.path == path) {
            Some(i) => &mut self.fields[i],
            None => {
                self.fields.push(FieldSpec::new(path.clone()));
                let last = self.fields.len() - 1;
                &mut self.fields[last]
            }
        }
    }

    /// Declares a field with no default.
    pub fn field(mut self, path: FieldPath) -> Self {
        self.fields.push(FieldSpec::new(path));
        self
    }

    pub fn field_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Sets a field's default, declaring the field if needed.
    pub fn default_value(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.spec_mut(&path).default = Some(value.into());
        self
    }

    /// Makes a field conditional, declaring the field if needed.
    pub fn visible_when(mut self, path: FieldPath, condition: Condition) -> Self {
        self.spec_mut(&path).visible_when = Some(condition);
        self
    }

    pub fn check(mut self, path: FieldPath, check: FieldCheck) -> Self {
        self.rules.push(Rule::Field(FieldRule::new(path, check)));
        self
    }

    pub fn check_with_message(mut self, path: FieldPath, check: FieldCheck, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Field(FieldRule::new(path, check).with_message(message)));
        self
    }

    pub fn rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Adds a derived field; its target is declared if it was not already.
    pub fn derived(mut self, field: DerivedField) -> Self {
        self.spec_mut(&field.target);
        self.derived.push(field);
        self
    }

    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn revalidate_mode(mut self, mode: RevalidateMode) -> Self {
        self.revalidate_mode = mode;
        self
    }

    /// Checks the declaration and fixes the derived-field evaluation order.
    ///
    /// # Returns
    /// - `Ok(FormSchema)` when every reference resolves.
    /// - `Err(Vec<SchemaError>)` with every problem found, not just the first.
    pub fn build(self) -> Result<FormSchema, Vec<SchemaError>> {
        let mut errors = match validation::validate(&self.fields, &self.rules, &self.derived) {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };
        let derived_order = match topology::derived_order(&self.derived) {
            Ok(order) => order,
            Err(e) => {
                errors.push(e);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            warn!("Form '{}' failed to build with {} error(s)", self.name, errors.len());
            return Err(errors);
        }

        Ok(FormSchema {
            name: self.name,
            fields: self.fields,
            rules: self.rules,
            derived: self.derived,
            derived_order,
            mode: self.mode,
            revalidate_mode: self.revalidate_mode,
        })
    }
}
