//! Executes season stat pipelines over in-memory rows.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::config::{Accumulator, Call, Expr, GroupSpec, Stage};

/// Run every stage in order over the rows.
pub fn run(stages: &[Stage], mut rows: Vec<Value>) -> Vec<Value> {
    for stage in stages {
        rows = match stage {
            Stage::Filter(expr) => {
                rows.into_iter().filter(|row| is_truthy(&eval(expr, row))).collect()
            }
            Stage::AddFields(fields) => rows
                .into_iter()
                .map(|mut row| {
                    let computed: Vec<(String, Value)> =
                        fields.iter().map(|(name, expr)| (name.clone(), eval(expr, &row))).collect();
                    if let Value::Object(map) = &mut row {
                        map.extend(computed);
                    }
                    row
                })
                .collect(),
            Stage::Group(spec) => group(spec, &rows),
            Stage::Project(fields) => rows
                .iter()
                .map(|row| {
                    Value::Object(
                        fields.iter().map(|(name, expr)| (name.clone(), eval(expr, row))).collect(),
                    )
                })
                .collect(),
        };
    }
    rows
}

/// Evaluate an expression against one row. Unknown paths evaluate to null;
/// an expression never fails.
pub fn eval(expr: &Expr, row: &Value) -> Value {
    match expr {
        Expr::Lit(Value::String(s)) if s.starts_with('$') => lookup(row, &s[1..]),
        Expr::Lit(value) => value.clone(),
        Expr::Call(call) => eval_call(call, row),
    }
}

/// Dot-path lookup into a row.
pub fn lookup(row: &Value, path: &str) -> Value {
    let mut current = row;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn eval_call(call: &Call, row: &Value) -> Value {
    match call {
        Call::Literal(value) => value.clone(),
        Call::Cond(args) => {
            let (cond, then, otherwise) = args.as_ref();
            if is_truthy(&eval(cond, row)) {
                eval(then, row)
            } else {
                eval(otherwise, row)
            }
        }
        Call::IfNull(args) => {
            let value = eval(&args.0, row);
            if value.is_null() {
                eval(&args.1, row)
            } else {
                value
            }
        }
        Call::Eq(args) => Value::Bool(values_equal(&eval(&args.0, row), &eval(&args.1, row))),
        Call::Ne(args) => Value::Bool(!values_equal(&eval(&args.0, row), &eval(&args.1, row))),
        Call::Gt(args) => compare_bool(args, row, |o| o == Ordering::Greater),
        Call::Gte(args) => compare_bool(args, row, |o| o != Ordering::Less),
        Call::Lt(args) => compare_bool(args, row, |o| o == Ordering::Less),
        Call::Lte(args) => compare_bool(args, row, |o| o != Ordering::Greater),
        Call::And(args) => Value::Bool(args.iter().all(|e| is_truthy(&eval(e, row)))),
        Call::Or(args) => Value::Bool(args.iter().any(|e| is_truthy(&eval(e, row)))),
        Call::Not(arg) => Value::Bool(!is_truthy(&eval(arg, row))),
        Call::Add(args) => {
            number(args.iter().filter_map(|e| as_number(&eval(e, row))).sum())
        }
        Call::Subtract(args) => {
            let a = as_number(&eval(&args.0, row)).unwrap_or(0.0);
            let b = as_number(&eval(&args.1, row)).unwrap_or(0.0);
            number(a - b)
        }
        Call::Multiply(args) => {
            number(args.iter().filter_map(|e| as_number(&eval(e, row))).product())
        }
        Call::Divide(args) => {
            let a = as_number(&eval(&args.0, row));
            let b = as_number(&eval(&args.1, row));
            match (a, b) {
                (Some(a), Some(b)) if b != 0.0 => number(a / b),
                _ => Value::Null,
            }
        }
        Call::Concat(args) => {
            let mut out = String::new();
            for arg in args {
                match eval(arg, row) {
                    Value::Null => {}
                    Value::String(s) => out.push_str(&s),
                    other => out.push_str(&other.to_string()),
                }
            }
            Value::String(out)
        }
        Call::Size(arg) => match eval(arg, row) {
            Value::Array(items) => Value::from(items.len() as i64),
            _ => Value::from(0),
        },
    }
}

fn compare_bool(
    args: &(Expr, Expr),
    row: &Value,
    check: impl Fn(Ordering) -> bool,
) -> Value {
    match compare_values(&eval(&args.0, row), &eval(&args.1, row)) {
        Some(ordering) => Value::Bool(check(ordering)),
        None => Value::Bool(false),
    }
}

/// Null, false, zero, and the empty string are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality with numeric coercion, so `1 == 1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Ordering across numbers and strings; mixed or unordered types compare as
/// `None` and the comparison evaluates false.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(a), as_number(b)) {
        return a.partial_cmp(&b);
    }
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

fn number(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Collapse rows into one per distinct group key, first-seen order.
fn group(spec: &GroupSpec, rows: &[Value]) -> Vec<Value> {
    let mut groups: Vec<(Value, Vec<&Value>)> = Vec::new();
    for row in rows {
        let key = eval(&spec.by, row);
        match groups.iter_mut().find(|(k, _)| values_equal(k, &key)) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for (name, acc) in &spec.fields {
                out.insert(name.clone(), accumulate(acc, &members));
            }
            Value::Object(out)
        })
        .collect()
}

fn accumulate(acc: &Accumulator, members: &[&Value]) -> Value {
    match acc {
        Accumulator::Sum(expr) => {
            number(members.iter().filter_map(|row| as_number(&eval(expr, row))).sum())
        }
        Accumulator::Avg(expr) => {
            let values: Vec<f64> =
                members.iter().filter_map(|row| as_number(&eval(expr, row))).collect();
            if values.is_empty() {
                Value::Null
            } else {
                number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Accumulator::Min(expr) => fold_extreme(expr, members, Ordering::Less),
        Accumulator::Max(expr) => fold_extreme(expr, members, Ordering::Greater),
        Accumulator::First(expr) => {
            members.first().map(|row| eval(expr, row)).unwrap_or(Value::Null)
        }
        Accumulator::Last(expr) => {
            members.last().map(|row| eval(expr, row)).unwrap_or(Value::Null)
        }
        Accumulator::Push(expr) => {
            Value::Array(members.iter().map(|row| eval(expr, row)).collect())
        }
        Accumulator::AddToSet(expr) => {
            let mut seen: Vec<Value> = Vec::new();
            for row in members {
                let value = eval(expr, row);
                if !seen.iter().any(|v| values_equal(v, &value)) {
                    seen.push(value);
                }
            }
            Value::Array(seen)
        }
        Accumulator::Count => Value::from(members.len() as i64),
    }
}

fn fold_extreme(expr: &Expr, members: &[&Value], keep: Ordering) -> Value {
    let mut best = Value::Null;
    for row in members {
        let value = eval(expr, row);
        if value.is_null() {
            continue;
        }
        if best.is_null() || compare_values(&value, &best) == Some(keep) {
            best = value;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stages(spec: Value) -> Vec<Stage> {
        serde_json::from_value(spec).unwrap()
    }

    fn rows(values: Value) -> Vec<Value> {
        values.as_array().unwrap().clone()
    }

    #[test]
    fn filter_keeps_truthy_rows() {
        let out = run(
            &stages(json!([{"filter": {"gt": ["$points", 5]}}])),
            rows(json!([{"points": 3}, {"points": 8}, {"missing": true}])),
        );
        assert_eq!(out, rows(json!([{"points": 8}])));
    }

    #[test]
    fn add_fields_computes_without_dropping() {
        let out = run(
            &stages(json!([{"add_fields": {"total": {"add": ["$auto", "$teleop"]}}}])),
            rows(json!([{"auto": 4, "teleop": 10}])),
        );
        assert_eq!(out[0]["total"], json!(14.0));
        assert_eq!(out[0]["auto"], json!(4));
    }

    #[test]
    fn group_preserves_first_seen_order() {
        let out = run(
            &stages(json!([{"group": {
                "by": "$team",
                "avg": {"avg": "$points"},
                "entries": "count",
                "distinct": {"add_to_set": "$points"}
            }}])),
            rows(json!([
                {"team": "frc254", "points": 10},
                {"team": "frc33", "points": 4},
                {"team": "frc254", "points": 20},
                {"team": "frc254", "points": 20}
            ])),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["_id"], json!("frc254"));
        assert_eq!(out[0]["avg"], json!(50.0 / 3.0));
        assert_eq!(out[0]["entries"], json!(3));
        assert_eq!(out[0]["distinct"], json!([10, 20]));
        assert_eq!(out[1]["_id"], json!("frc33"));
    }

    #[test]
    fn project_replaces_the_row() {
        let out = run(
            &stages(json!([{"project": {"team": "$team", "label": {"concat": ["#", "$team"]}}}])),
            rows(json!([{"team": "frc33", "points": 4}])),
        );
        assert_eq!(out[0], json!({"team": "frc33", "label": "#frc33"}));
    }

    #[test]
    fn avg_ignores_non_numeric_values() {
        let out = run(
            &stages(json!([{"group": {"by": "$team", "avg": {"avg": "$points"}}}])),
            rows(json!([
                {"team": "frc1", "points": 6},
                {"team": "frc1", "points": "dnp"},
                {"team": "frc1"}
            ])),
        );
        assert_eq!(out[0]["avg"], json!(6.0));
    }

    #[test]
    fn cond_and_if_null_branch() {
        let expr: Expr = serde_json::from_value(json!(
            {"cond": [{"gte": ["$points", 10]}, "high", {"if_null": ["$tag", "low"]}]}
        ))
        .unwrap();
        assert_eq!(eval(&expr, &json!({"points": 12})), json!("high"));
        assert_eq!(eval(&expr, &json!({"points": 2})), json!("low"));
        assert_eq!(eval(&expr, &json!({"points": 2, "tag": "meh"})), json!("meh"));
    }

    #[test]
    fn divide_by_zero_is_null() {
        let expr: Expr = serde_json::from_value(json!({"divide": ["$a", "$b"]})).unwrap();
        assert_eq!(eval(&expr, &json!({"a": 10, "b": 0})), Value::Null);
        assert_eq!(eval(&expr, &json!({"a": 10, "b": 4})), json!(2.5));
    }

    #[test]
    fn literal_escapes_field_syntax() {
        let expr: Expr = serde_json::from_value(json!({"literal": "$points"})).unwrap();
        assert_eq!(eval(&expr, &json!({"points": 3})), json!("$points"));
    }

    #[test]
    fn size_counts_arrays_only() {
        let expr: Expr = serde_json::from_value(json!({"size": "$list"})).unwrap();
        assert_eq!(eval(&expr, &json!({"list": [1, 2, 3]})), json!(3));
        assert_eq!(eval(&expr, &json!({"list": "nope"})), json!(0));
    }
}
