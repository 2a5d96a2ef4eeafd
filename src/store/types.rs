//! The form value snapshot: an ordered map of field names to scalars or nested groups.

use super::path::{FieldPath, PathError, Segment};
use crate::compute::money::Money;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// ISO calendar date format used by every date input in the dashboard.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single field value.
///
/// Serialized untagged, so a submission payload is plain JSON
/// (`{"amount": 120.5, "method": "Card", "persons": [{"name": "…"}]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    /// A repeated group, e.g. `persons[i]`.
    List(Vec<FormValue>),
    /// A nested group, e.g. `lens.*`.
    Group(FormValue),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Blank means "nothing entered": whitespace-only text or an empty group.
    /// `false` and `0` are real answers and are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Group(g) => g.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Checkbox state. Text "true"/"yes"/"on" counts as checked, matching raw HTML form posts.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Parses a calendar date. Only the date components are read; there is no time of day.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match self {
            Value::Number(n) => Money::from_f64(*n),
            Value::Text(s) => Money::parse(s).ok(),
            _ => None,
        }
    }

    /// Literal comparison used by conditions ("payment method == Other").
    /// Text is compared after trimming; numbers compare by value.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.trim() == b.trim(),
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(_), Value::Text(_)) | (Value::Text(_), Value::Bool(_)) => {
                match (self.as_bool(), other.as_bool()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Text(d.format(DATE_FORMAT).to_string())
    }
}

impl From<Money> for Value {
    fn from(m: Money) -> Self {
        Value::Text(m.to_string())
    }
}

/// An insertion-ordered snapshot of every field in a form.
///
/// Fields the user never touched are simply absent; they are never coerced to
/// an empty string, so they stay absent through a payload round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValue(IndexMap<String, Value>);

#[derive(Clone, Copy)]
enum Node<'a> {
    Map(&'a FormValue),
    Leaf(&'a Value),
}

impl<'a> Node<'a> {
    fn key(self, k: &str) -> Option<Node<'a>> {
        match self {
            Node::Map(m) => m.0.get(k).map(Node::Leaf),
            Node::Leaf(Value::Group(g)) => g.0.get(k).map(Node::Leaf),
            Node::Leaf(_) => None,
        }
    }

    fn index(self, i: usize) -> Option<Node<'a>> {
        match self {
            Node::Leaf(Value::List(items)) => items.get(i).map(Node::Map),
            _ => None,
        }
    }
}

impl FormValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Sets a top-level field, returning `self` for chained construction.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut node = Node::Map(self);
        for seg in path.segments() {
            node = match seg {
                Segment::Key(k) => node.key(k)?,
                Segment::Index(i) => node.index(*i)?,
                Segment::Any => return None,
            };
        }
        match node {
            Node::Leaf(v) => Some(v),
            Node::Map(_) => None,
        }
    }

    /// Absent or blank.
    pub fn is_blank(&self, path: &FieldPath) -> bool {
        self.get(path).map_or(true, Value::is_blank)
    }

    /// Writes a value at a concrete path, creating intermediate groups and list
    /// elements as needed. Returns the previous value, if any.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<Option<Value>, PathError> {
        if path.is_template() {
            return Err(PathError::Wildcard(path.to_string()));
        }
        set_in(self, path.segments(), value, path)
    }

    /// Removes the value at a concrete path, leaving the field absent.
    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        remove_in(self, path.segments())
    }

    /// Expands a template path into the concrete paths present in this snapshot.
    ///
    /// `persons[*].name` over a two-element `persons` list yields `persons[0].name`
    /// and `persons[1].name`, whether or not `name` has been filled in yet.
    /// A concrete path expands to itself.
    pub fn expand(&self, template: &FieldPath) -> Vec<FieldPath> {
        if !template.is_template() {
            return vec![template.clone()];
        }
        let mut out = Vec::new();
        let segs = template.segments();
        if let Some(Segment::Key(first)) = segs.first() {
            let node = Node::Map(self).key(first);
            expand_into(node, &segs[1..], FieldPath::key(first.clone()), &mut out);
        }
        out
    }
}

fn expand_into(node: Option<Node<'_>>, segs: &[Segment], prefix: FieldPath, out: &mut Vec<FieldPath>) {
    let Some(seg) = segs.first() else {
        out.push(prefix);
        return;
    };
    let rest = &segs[1..];
    match seg {
        Segment::Key(k) => {
            let next = node.and_then(|n| n.key(k));
            expand_into(next, rest, prefix.child(Segment::Key(k.clone())), out);
        }
        Segment::Index(i) => {
            let next = node.and_then(|n| n.index(*i));
            expand_into(next, rest, prefix.child(Segment::Index(*i)), out);
        }
        Segment::Any => {
            if let Some(Node::Leaf(Value::List(items))) = node {
                for (i, item) in items.iter().enumerate() {
                    expand_into(Some(Node::Map(item)), rest, prefix.child(Segment::Index(i)), out);
                }
            }
        }
    }
}

fn set_in(
    map: &mut FormValue,
    segs: &[Segment],
    value: Value,
    full: &FieldPath,
) -> Result<Option<Value>, PathError> {
    let key = match segs.first() {
        Some(Segment::Key(k)) => k,
        _ => return Err(PathError::Shape(full.to_string())),
    };
    let rest = &segs[1..];
    match rest.first() {
        None => Ok(map.0.insert(key.clone(), value)),
        Some(Segment::Key(_)) => {
            let entry = map
                .0
                .entry(key.clone())
                .or_insert_with(|| Value::Group(FormValue::default()));
            match entry {
                Value::Group(g) => set_in(g, rest, value, full),
                _ => Err(PathError::Shape(full.to_string())),
            }
        }
        Some(Segment::Index(i)) => {
            let entry = map.0.entry(key.clone()).or_insert_with(|| Value::List(Vec::new()));
            match entry {
                Value::List(items) => {
                    // Lists grow one element at a time, like "Add another person".
                    if *i == items.len() {
                        items.push(FormValue::default());
                    }
                    match items.get_mut(*i) {
                        Some(item) => set_in(item, &rest[1..], value, full),
                        None => Err(PathError::Shape(full.to_string())),
                    }
                }
                _ => Err(PathError::Shape(full.to_string())),
            }
        }
        Some(Segment::Any) => Err(PathError::Wildcard(full.to_string())),
    }
}

fn remove_in(map: &mut FormValue, segs: &[Segment]) -> Option<Value> {
    let Some(Segment::Key(key)) = segs.first() else { return None };
    let rest = &segs[1..];
    match rest.first() {
        None => map.0.shift_remove(key),
        Some(Segment::Key(_)) => match map.0.get_mut(key)? {
            Value::Group(g) => remove_in(g, rest),
            _ => None,
        },
        Some(Segment::Index(i)) => match map.0.get_mut(key)? {
            Value::List(items) => remove_in(items.get_mut(*i)?, &rest[1..]),
            _ => None,
        },
        Some(Segment::Any) => None,
    }
}
