//! In-memory evaluation
//!
//! Runs a [`QueryModel`] against JSON records with the same semantics the
//! SQL compiler gives it: numeric comparison for numbers, chronological for
//! instants, lexical for text, case-sensitive `%`/`_` wildcards for LIKE.
//! A missing or null property never matches, as with SQL `NULL`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::condition::{build_conditions, Condition};
use crate::model::{FilterOperator, FilterValue, QueryModel, QueryResponse, SortDirection};

impl Condition {
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Condition::Group { and, or } => {
                and.iter().all(|c| c.matches(record))
                    && (or.is_empty() || or.iter().any(|c| c.matches(record)))
            }
            Condition::Compare {
                property,
                operator,
                value,
            } => match record.get(property.as_str()) {
                None | Some(Value::Null) => false,
                Some(field) => compare_field(field, *operator, value),
            },
        }
    }
}

/// Filter, sort, then page `records`; `default_limit` applies when the model
/// sets no limit
pub fn apply<I>(model: &QueryModel, records: I, default_limit: u64) -> QueryResponse<Value>
where
    I: IntoIterator<Item = Value>,
{
    let condition = build_conditions(model);
    let mut matched: Vec<Value> = records
        .into_iter()
        .filter(|record| condition.matches(record))
        .collect();

    let keys: Vec<(&str, SortDirection)> = model
        .sort_list
        .iter()
        .flat_map(|entry| entry.fields.iter().map(move |f| (f.as_str(), entry.direction)))
        .collect();
    if !keys.is_empty() {
        matched.sort_by(|a, b| {
            keys.iter()
                .map(|(field, direction)| {
                    let ordering = order_values(a.get(*field), b.get(*field));
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let count = matched.len() as u64;
    let offset = model.offset.unwrap_or(0);
    let limit = model.limit_or(default_limit);
    let page: Vec<Value> = matched
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    let mut response = QueryResponse::many(page);
    response.set_count(count).set_offset(offset).set_limit(limit);
    response
}

fn compare_field(field: &Value, operator: FilterOperator, value: &FilterValue) -> bool {
    if operator == FilterOperator::Like {
        let Some(text) = field_text(field) else {
            return false;
        };
        return like_match(&text, &value.as_text());
    }

    let Some(ordering) = compare_value(field, value) else {
        return false;
    };
    match operator {
        FilterOperator::Eq => ordering.is_eq(),
        FilterOperator::Ne => ordering.is_ne(),
        FilterOperator::Gt => ordering.is_gt(),
        FilterOperator::Gte => ordering.is_ge(),
        FilterOperator::Lt => ordering.is_lt(),
        FilterOperator::Lte => ordering.is_le(),
        FilterOperator::Like => false,
    }
}

/// Ordering of the record's field relative to the filter value
fn compare_value(field: &Value, value: &FilterValue) -> Option<Ordering> {
    match (field, value) {
        (Value::Number(n), FilterValue::Integer(i)) => n.as_f64()?.partial_cmp(&(*i as f64)),
        (Value::Number(n), FilterValue::Text(s)) => n.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?),
        (Value::String(s), FilterValue::Integer(i)) => s.parse::<i64>().ok().map(|n| n.cmp(i)),
        (Value::String(s), FilterValue::Date(d)) => parse_instant(s).map(|t| t.cmp(d)),
        (Value::String(s), FilterValue::Text(t)) => Some(s.as_str().cmp(t.as_str())),
        (Value::Bool(b), FilterValue::Text(t)) => match t.as_str() {
            "true" => Some(b.cmp(&true)),
            "false" => Some(b.cmp(&false)),
            _ => None,
        },
        _ => None,
    }
}

fn field_text(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// SQL LIKE: `%` any run, `_` any single character
fn like_match(text: &str, pattern: &str) -> bool {
    let mut expression = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Total order over JSON scalars for sorting; nulls and missing values last
fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}
