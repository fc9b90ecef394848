use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables.
///
/// Scalar result fields go into one Field/Value table. Ledgers (arrays of
/// rows such as `cash_flows`, `years`, `tiers`) and nested groups such as
/// `gp`, `lp` and `sensitivity` each get their own titled table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                print_result(result);
                print_envelope_notes(map);
            }
            _ => print_fields(map),
        },
        Value::Array(rows) => print_rows(rows),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>) {
    let mut scalars = Map::new();
    let mut sections: Vec<(&str, &Value)> = Vec::new();
    for (key, val) in result {
        match val {
            Value::Array(rows) if rows.iter().any(Value::is_object) => {
                sections.push((key.as_str(), val))
            }
            Value::Object(_) => sections.push((key.as_str(), val)),
            _ => {
                scalars.insert(key.clone(), val.clone());
            }
        }
    }

    if !scalars.is_empty() {
        print_fields(&scalars);
    }
    for (title, section) in sections {
        println!("\n{}", heading(title));
        match section {
            Value::Array(rows) => print_rows(rows),
            Value::Object(group) => print_group(group),
            _ => {}
        }
    }
}

/// A nested object: a field table, or one ledger per array member
/// (e.g. each sensitivity axis).
fn print_group(group: &Map<String, Value>) {
    let all_ledgers = group.values().all(|v| matches!(v, Value::Array(_)));
    if !all_ledgers {
        print_fields(group);
        return;
    }
    for (axis, rows) in group {
        if let Value::Array(rows) = rows {
            println!("{}", axis.replace('_', " "));
            print_rows(rows);
        }
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w.yellow());
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", format_value(item));
        }
        return;
    };

    // Nested arrays (per-year tier allocations) are too wide for a row
    let headers: Vec<String> = first
        .iter()
        .filter(|(_, v)| !v.is_array())
        .map(|(k, _)| k.clone())
        .collect();

    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn heading(key: &str) -> String {
    key.replace('_', " ").to_uppercase().bold().to_string()
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => round_display(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Decimal strings carry up to 28 fractional digits; show 4.
fn round_display(s: &str) -> String {
    match s.parse::<rust_decimal::Decimal>() {
        Ok(d) if d.scale() > 4 => d.round_dp(4).normalize().to_string(),
        _ => s.to_string(),
    }
}
