use std::cmp::Ordering;

use serde_json::Value;

use super::models::Document;
use super::paths::CollectionPath;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, expected) => doc.get(field) == Some(expected),
            Filter::Gte(field, bound) => doc
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .map_or(false, |ord| ord != Ordering::Less),
            Filter::Lte(field, bound) => doc
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .map_or(false, |ord| ord != Ordering::Greater),
            Filter::ArrayContains(field, needle) => match doc.get(field) {
                Some(Value::Array(items)) => items.contains(needle),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn where_gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(field.into(), value.into()));
        self
    }

    pub fn where_lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(field.into(), value.into()));
        self
    }

    pub fn array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Documents lacking the ordering field never match an ordered query.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(order) = &self.order_by {
            if doc.get(&order.field).map_or(true, Value::is_null) {
                return false;
            }
        }
        self.filters.iter().all(|filter| filter.matches(doc))
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let Some(order) = &self.order_by else {
            return Ordering::Equal;
        };
        let ord = match (a.get(&order.field), b.get(&order.field)) {
            (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        match order.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Orders values of the same kind. Values of different kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
