//! Maps vendor order payloads onto [`OrderLine`] columns.
//!
//! Each column is looked up through an ordered list of known keys first. A
//! key only counts when its value is truthy (not null, empty or zero), so the
//! next candidate gets a chance. When no known key matches, the flattened
//! payload is searched by substring, which is how unfamiliar vendor payloads
//! still yield dates, amounts and SKUs.

use crate::domain::model::OrderLine;
use crate::utils::parse::{coerce_f64, date_from_json};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Candidate keys per canonical column, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldProfile {
    pub order_id: &'static [&'static str],
    pub date: &'static [&'static str],
    pub status: &'static [&'static str],
    pub sale: &'static [&'static str],
    pub taxes: &'static [&'static str],
    pub commission: &'static [&'static str],
    pub shipping: &'static [&'static str],
    pub lines: &'static [&'static str],
    pub line_sku: &'static [&'static str],
    pub line_name: &'static [&'static str],
    pub line_quantity: &'static [&'static str],
    pub line_sale: &'static [&'static str],
    pub line_taxes: &'static [&'static str],
    pub line_commission: &'static [&'static str],
    pub line_shipping: &'static [&'static str],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub lines: Vec<OrderLine>,
    /// Orders dropped for lacking an id or a parseable date.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guess {
    Date,
    Sale,
    Taxes,
    Commission,
    Shipping,
    Sku,
}

impl Guess {
    fn matches(self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        let leaf = key.rsplit('.').next().unwrap_or(&key);
        match self {
            Guess::Date => key.contains("date"),
            Guess::Sale => matches!(leaf, "total_price" | "sale_price" | "amount" | "price"),
            Guess::Taxes => key.contains("tax"),
            Guess::Commission => key.contains("commission"),
            Guess::Shipping => key.contains("ship"),
            Guess::Sku => leaf.ends_with("sku") || leaf.ends_with("ean"),
        }
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub fn first_truthy<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| is_truthy(v))
}

/// First candidate that is present and not null; zero amounts count.
fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

/// Dotted keys for nested objects; arrays are left out.
pub fn flatten<'a>(object: &'a Map<String, Value>) -> Vec<(String, &'a Value)> {
    fn walk<'a>(prefix: &str, object: &'a Map<String, Value>, out: &mut Vec<(String, &'a Value)>) {
        for (key, value) in object {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                Value::Object(inner) => walk(&path, inner, out),
                Value::Array(_) => {}
                _ => out.push((path, value)),
            }
        }
    }
    let mut out = Vec::new();
    walk("", object, &mut out);
    out
}

fn guess<'a, T>(
    flat: &[(String, &'a Value)],
    kind: Guess,
    convert: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    flat.iter()
        .filter(|(key, _)| kind.matches(key))
        .find_map(|(_, value)| convert(value))
}

/// Sums arrays of amounts (e.g. a list of tax entries), otherwise coerces.
fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Array(items) => {
            let amounts: Vec<f64> = items.iter().filter_map(coerce_f64).collect();
            (!amounts.is_empty()).then(|| amounts.iter().sum())
        }
        other => coerce_f64(other),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn order_amount(
    object: &Map<String, Value>,
    flat: &[(String, &Value)],
    keys: &[&str],
    kind: Guess,
) -> f64 {
    match first_truthy(object, keys) {
        Some(value) => amount_of(value).unwrap_or(0.0),
        None => guess(flat, kind, amount_of).unwrap_or(0.0),
    }
}

struct OrderTotals {
    sale: f64,
    taxes: f64,
    commission: f64,
    shipping: f64,
}

struct OnLines {
    sale: bool,
    taxes: bool,
    commission: bool,
    shipping: bool,
}

fn normalize_order(profile: &FieldProfile, order: &Map<String, Value>) -> Option<Vec<OrderLine>> {
    let flat = flatten(order);

    let order_id = first_truthy(order, profile.order_id).and_then(text_of)?;
    let order_date: NaiveDate = match first_truthy(order, profile.date) {
        Some(value) => date_from_json(value),
        None => guess(&flat, Guess::Date, date_from_json),
    }?;
    let order_status = first_truthy(order, profile.status)
        .and_then(text_of)
        .unwrap_or_default();

    let totals = OrderTotals {
        sale: order_amount(order, &flat, profile.sale, Guess::Sale),
        taxes: order_amount(order, &flat, profile.taxes, Guess::Taxes),
        commission: order_amount(order, &flat, profile.commission, Guess::Commission),
        shipping: order_amount(order, &flat, profile.shipping, Guess::Shipping),
    };

    let lines: Vec<&Map<String, Value>> = first_truthy(order, profile.lines)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    // a column comes from the lines as soon as one line carries it
    let carried = |keys: &[&str]| lines.iter().any(|l| first_present(l, keys).is_some());
    let on_lines = OnLines {
        sale: carried(profile.line_sale),
        taxes: carried(profile.line_taxes),
        commission: carried(profile.line_commission),
        shipping: carried(profile.line_shipping),
    };

    let make_line = |index: usize, line: Option<&Map<String, Value>>| {
        let line_amount = |keys: &[&str], total: f64, from_lines: bool| {
            if from_lines {
                line.and_then(|l| first_present(l, keys))
                    .and_then(amount_of)
                    .unwrap_or(0.0)
            } else if index == 0 {
                // order-level amounts land on the first line only
                total
            } else {
                0.0
            }
        };

        let sku = line
            .and_then(|l| {
                first_truthy(l, profile.line_sku)
                    .and_then(text_of)
                    .or_else(|| guess(&flatten(l), Guess::Sku, text_of))
            })
            .unwrap_or_default();
        let product_name = line
            .and_then(|l| first_truthy(l, profile.line_name))
            .and_then(text_of)
            .unwrap_or_default();
        let quantity = line
            .and_then(|l| first_truthy(l, profile.line_quantity))
            .and_then(coerce_f64)
            .map(|q| q.round() as i64)
            .filter(|q| *q > 0)
            .unwrap_or(1);

        OrderLine {
            order_id: order_id.clone(),
            line_index: index,
            order_date,
            order_status: order_status.clone(),
            sale_price: line_amount(profile.line_sale, totals.sale, on_lines.sale),
            taxes: line_amount(profile.line_taxes, totals.taxes, on_lines.taxes),
            commission: line_amount(profile.line_commission, totals.commission, on_lines.commission),
            shipping: line_amount(profile.line_shipping, totals.shipping, on_lines.shipping),
            sku,
            product_name,
            quantity,
        }
    };

    if lines.is_empty() {
        return Some(vec![make_line(0, None)]);
    }
    Some(
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| make_line(i, Some(line)))
            .collect(),
    )
}

pub fn normalize_orders(profile: &FieldProfile, orders: &[Value]) -> Normalized {
    let mut result = Normalized::default();
    for order in orders {
        match order.as_object().and_then(|o| normalize_order(profile, o)) {
            Some(lines) => result.lines.extend(lines),
            None => {
                result.skipped += 1;
                let id = order
                    .get("order_id")
                    .or_else(|| order.get("id"))
                    .unwrap_or(&Value::Null);
                tracing::warn!("Skipping order without id or date: {}", id);
            }
        }
    }
    result
}
