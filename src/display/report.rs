use crate::store::{FormSchema, FormValue, Value};
use crate::validation::ValidationResult;
use std::fmt::Write;

/// Renders a validation pass as an indented text block.
///
/// Calculated fields are listed first with their current value, then every
/// issue in rule order, then a one-line status.
pub fn format_report(schema: &FormSchema, values: &FormValue, result: &ValidationResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "VALIDATION REPORT for form '{}':", schema.name());
    let _ = writeln!(output, "--------------------------------------------------");

    let mut derived = schema.derived_in_order().peekable();
    if derived.peek().is_some() {
        let _ = writeln!(output, "Calculated:");
        for field in derived {
            let shown = values.get(&field.target).map_or_else(|| "(empty)".to_string(), render);
            let note = if field.overridable { " [editable]" } else { "" };
            let _ = writeln!(output, "  {} = {}{}", field.target, shown, note);
        }
    }

    if !result.issues.is_empty() {
        let _ = writeln!(output, "Issues:");
        for (i, issue) in result.issues.iter().enumerate() {
            let kind = serde_json::to_value(issue.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let _ = writeln!(output, "  {}. {} [{}]: {}", i + 1, issue.field_path, kind, issue.message);
        }
    }

    let status = if result.valid {
        "OK".to_string()
    } else {
        format!("{} issue(s)", result.issues.len())
    };
    let _ = write!(output, "Status: {}", status);
    output
}

fn render(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => format!("[{} item(s)]", items.len()),
        Value::Group(g) => format!("{{{} field(s)}}", g.len()),
    }
}
