//! Server-side search requests and paginated responses.
//!
//! Every list screen posts `{gradeId, page, pageSize, ...filters}` to a
//! `/search` endpoint. Column filters are merged into the body under the
//! backend's key names; empty text filters are left out entirely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::DbId;

/// Comparison applied to a numeric column filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFilterType {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl NumberFilterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEqual => "notEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
        }
    }

    fn from_operator(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Equals),
            "!=" => Some(Self::NotEqual),
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessThanOrEqual),
            ">" => Some(Self::GreaterThan),
            ">=" => Some(Self::GreaterThanOrEqual),
            _ => None,
        }
    }
}

/// Which search endpoint a filter set is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Bundles,
    Rows,
    Vouchers,
}

impl SearchTarget {
    pub fn text_columns(self) -> &'static [&'static str] {
        match self {
            Self::Bundles => &["name", "description", "type", "status", "createdAt"],
            Self::Rows => &["name", "description", "status", "createdAt"],
            Self::Vouchers => &["code", "bundleName", "status", "createdAt", "usedAt"],
        }
    }

    pub fn number_columns(self) -> &'static [&'static str] {
        match self {
            Self::Bundles => &["price", "discount"],
            Self::Rows => &["id"],
            Self::Vouchers => &[],
        }
    }

    fn column(self, key: &str) -> Option<(&'static str, bool)> {
        if let Some(k) = self.text_columns().iter().find(|k| **k == key) {
            return Some((*k, false));
        }
        self.number_columns()
            .iter()
            .find(|k| **k == key)
            .map(|k| (*k, true))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number {
        value: f64,
        kind: Option<NumberFilterType>,
    },
}

/// Column filters of one list screen, keyed by backend field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnFilters {
    values: BTreeMap<&'static str, FilterValue>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text filter; blank text removes it.
    pub fn set_text(&mut self, key: &'static str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert(key, FilterValue::Text(value.to_string()));
        }
    }

    pub fn set_number(&mut self, key: &'static str, value: f64, kind: Option<NumberFilterType>) {
        self.values.insert(key, FilterValue::Number { value, kind });
    }

    pub fn clear(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FilterValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key=value`, or `key<op>number` for numeric columns
    /// (`=`, `!=`, `<`, `<=`, `>`, `>=`).
    pub fn apply(&mut self, target: SearchTarget, expr: &str) -> Result<(), CoreError> {
        let split = expr
            .find(['=', '<', '>', '!'])
            .ok_or_else(|| CoreError::Validation(format!("Invalid filter '{expr}'")))?;
        let key = expr[..split].trim();
        let rest = &expr[split..];
        let op_len = if rest.starts_with("<=") || rest.starts_with(">=") || rest.starts_with("!=")
        {
            2
        } else {
            1
        };
        let (op, value) = rest.split_at(op_len);

        let (key, numeric) = target.column(key).ok_or_else(|| {
            CoreError::Validation(format!("Unknown filter column '{key}'"))
        })?;

        if numeric {
            let kind = NumberFilterType::from_operator(op)
                .ok_or_else(|| CoreError::Validation(format!("Invalid operator '{op}'")))?;
            let value: f64 = value.trim().parse().map_err(|_| {
                CoreError::Validation(format!("Filter '{key}' needs a number"))
            })?;
            self.set_number(key, value, Some(kind));
        } else {
            if op != "=" {
                return Err(CoreError::Validation(format!(
                    "Filter '{key}' only supports '='"
                )));
            }
            self.set_text(key, value);
        }
        Ok(())
    }

    fn write_into(&self, body: &mut Map<String, Value>) {
        for (key, value) in &self.values {
            match value {
                FilterValue::Text(s) => {
                    body.insert((*key).to_string(), Value::String(s.clone()));
                }
                FilterValue::Number { value, kind } => {
                    body.insert((*key).to_string(), number_value(*value));
                    if let Some(kind) = kind {
                        body.insert(
                            format!("{key}FilterType"),
                            Value::String(kind.as_str().to_string()),
                        );
                    }
                }
            }
        }
    }
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Body of a `POST /{entity}/search` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub grade_id: DbId,
    pub page: u32,
    pub page_size: u32,
    extra: Map<String, Value>,
}

impl SearchQuery {
    pub fn new(grade_id: DbId, page: u32, page_size: u32) -> Self {
        Self {
            grade_id,
            page: page.max(1),
            page_size: page_size.max(1),
            extra: Map::new(),
        }
    }

    pub fn with_filters(mut self, filters: &ColumnFilters) -> Self {
        filters.write_into(&mut self.extra);
        self
    }

    /// Add a key unless a column filter already set it.
    pub fn with_default(mut self, key: &str, value: Option<Value>) -> Self {
        if let Some(value) = value {
            self.extra.entry(key.to_string()).or_insert(value);
        }
        self
    }

    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("gradeId".into(), Value::from(self.grade_id));
        body.insert("page".into(), Value::from(self.page));
        body.insert("pageSize".into(), Value::from(self.page_size));
        for (k, v) in &self.extra {
            body.insert(k.clone(), v.clone());
        }
        Value::Object(body)
    }
}

impl Serialize for SearchQuery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_body().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl Pagination {
    /// Fill zero fields from the request that produced this page.
    pub fn or_request(self, page: u32, page_size: u32) -> Self {
        Self {
            current_page: if self.current_page == 0 { page } else { self.current_page },
            page_size: if self.page_size == 0 { page_size } else { self.page_size },
            ..self
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
        }
    }
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_body_has_base_keys_and_omits_empty_text() {
        let mut filters = ColumnFilters::new();
        filters.set_text("name", "  ");
        filters.set_text("description", "math");
        let body = SearchQuery::new(0, 1, 20).with_filters(&filters).to_body();
        assert_eq!(
            body,
            json!({"gradeId": 0, "page": 1, "pageSize": 20, "description": "math"})
        );
    }

    #[test]
    fn test_number_filter_carries_type() {
        let mut filters = ColumnFilters::new();
        filters.set_number("price", 100.0, Some(NumberFilterType::GreaterThan));
        filters.set_number("discount", 12.5, None);
        let body = SearchQuery::new(4, 2, 10).with_filters(&filters).to_body();
        assert_eq!(body["price"], 100);
        assert_eq!(body["priceFilterType"], "greaterThan");
        assert_eq!(body["discount"], 12.5);
        assert!(body.get("discountFilterType").is_none());
    }

    #[test]
    fn test_column_filter_wins_over_default() {
        let mut filters = ColumnFilters::new();
        filters.set_text("status", "Used");
        let body = SearchQuery::new(4, 1, 20)
            .with_filters(&filters)
            .with_default("status", Some(json!("Available")))
            .to_body();
        assert_eq!(body["status"], "Used");

        let body = SearchQuery::new(4, 1, 20)
            .with_default("status", Some(json!("Available")))
            .with_default("bundleId", None)
            .to_body();
        assert_eq!(body["status"], "Available");
        assert!(body.get("bundleId").is_none());
    }

    #[test]
    fn test_apply_parses_expressions() {
        let mut filters = ColumnFilters::new();
        filters.apply(SearchTarget::Bundles, "price>=50").unwrap();
        filters.apply(SearchTarget::Bundles, "name=Science").unwrap();
        assert_eq!(
            filters.get("price"),
            Some(&FilterValue::Number {
                value: 50.0,
                kind: Some(NumberFilterType::GreaterThanOrEqual)
            })
        );
        assert_eq!(filters.text("name"), Some("Science"));

        assert_matches!(
            filters.apply(SearchTarget::Vouchers, "price=1"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            filters.apply(SearchTarget::Rows, "name>3"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            filters.apply(SearchTarget::Rows, "nothing"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn test_pagination_defaults_from_request() {
        let p: Pagination = serde_json::from_value(json!({"totalRecords": 41})).unwrap();
        let p = p.or_request(3, 20);
        assert_eq!(p.current_page, 3);
        assert_eq!(p.page_size, 20);
        assert_eq!(p.total_records, 41);
    }
}
