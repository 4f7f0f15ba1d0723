// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! List queries: filters, sorting and pagination.
//!
//! Filters compare against an entity's serialized JSON fields, so the same
//! evaluation runs for every repository backend. Field names use the JSON
//! (camelCase) spelling; dotted paths reach into nested objects.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::CourierError;

/// Largest page a caller may request.
pub const MAX_LIMIT: i64 = 1000;

/// Page size used when the caller does not pass one.
pub const DEFAULT_LIMIT: i64 = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Case-insensitive match where `%` stands for any run of characters.
    Like,
    /// Field value equals one element of the array operand.
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(rename = "operator", alias = "op")]
    pub op: FilterOperator,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value.into())
    }

    fn validate(&self) -> Result<(), CourierError> {
        if self.field.trim().is_empty() {
            return Err(CourierError::validation(
                "filters.field",
                "must not be empty",
            ));
        }
        match self.op {
            FilterOperator::In if !self.value.is_array() => Err(CourierError::validation(
                "filters.value",
                format!("`in` on `{}` needs an array operand", self.field),
            )),
            FilterOperator::Like if !self.value.is_string() => Err(CourierError::validation(
                "filters.value",
                format!("`like` on `{}` needs a string operand", self.field),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Filter, sort and page request for a repository `list` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.pagination = Pagination { limit, offset };
        self
    }

    /// Checks bounds: `limit` in `[0, MAX_LIMIT]`, `offset >= 0`, well-formed filters.
    pub fn validate(&self) -> Result<(), CourierError> {
        let Pagination { limit, offset } = self.pagination;
        if !(0..=MAX_LIMIT).contains(&limit) {
            return Err(CourierError::validation(
                "pagination.limit",
                format!("must be between 0 and {MAX_LIMIT}, got {limit}"),
            ));
        }
        if offset < 0 {
            return Err(CourierError::validation(
                "pagination.offset",
                format!("must not be negative, got {offset}"),
            ));
        }
        if let Some(sort) = &self.sort {
            if sort.field.trim().is_empty() {
                return Err(CourierError::validation("sort.field", "must not be empty"));
            }
        }
        self.filters.iter().try_for_each(Filter::validate)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Resolves a dotted field path inside a JSON document.
pub fn lookup<'a>(entity: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(entity, |current, key| current.get(key))
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn like(text: &str, pattern: &str) -> bool {
    let source = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    regex::RegexBuilder::new(&format!("^{source}$"))
        .case_insensitive(true)
        .build()
        .is_ok_and(|re| re.is_match(text))
}

/// Whether a serialized entity satisfies a filter. Missing fields read as `null`.
pub fn matches(entity: &Value, filter: &Filter) -> bool {
    let actual = lookup(entity, &filter.field).unwrap_or(&Value::Null);
    let operand = &filter.value;
    match filter.op {
        FilterOperator::Eq => equals(actual, operand),
        FilterOperator::Ne => !equals(actual, operand),
        FilterOperator::Gt => compare(actual, operand) == Some(Ordering::Greater),
        FilterOperator::Lt => compare(actual, operand) == Some(Ordering::Less),
        FilterOperator::Gte => matches!(
            compare(actual, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Lte => matches!(
            compare(actual, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::Like => match (actual.as_str(), operand.as_str()) {
            (Some(text), Some(pattern)) => like(text, pattern),
            _ => false,
        },
        FilterOperator::In => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(actual, item))),
    }
}

/// Filters, sorts and pages an in-memory collection.
///
/// Items whose serialization fails never match. Without a sort the input
/// order is kept.
pub fn apply_query<T: Serialize>(items: Vec<T>, query: &ListQuery) -> Page<T> {
    let mut matched: Vec<(Value, T)> = items
        .into_iter()
        .filter_map(|item| {
            let json = serde_json::to_value(&item).ok()?;
            query
                .filters
                .iter()
                .all(|f| matches(&json, f))
                .then_some((json, item))
        })
        .collect();

    if let Some(sort) = &query.sort {
        matched.sort_by(|(a, _), (b, _)| {
            let left = lookup(a, &sort.field).unwrap_or(&Value::Null);
            let right = lookup(b, &sort.field).unwrap_or(&Value::Null);
            let ordering = compare(left, right).unwrap_or_else(|| {
                // Missing values sort first.
                match (left.is_null(), right.is_null()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => Ordering::Equal,
                }
            });
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    let total_count = matched.len() as i64;
    let Pagination { limit, offset } = query.pagination;
    let items = matched
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .map(|(_, item)| item)
        .collect();

    Page {
        items,
        total_count,
        limit,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        rank: i64,
        enabled: bool,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Alpha", rank: 3, enabled: true },
            Row { name: "beta", rank: 1, enabled: false },
            Row { name: "gamma", rank: 2, enabled: true },
        ]
    }

    #[test]
    fn limit_bounds() {
        assert!(ListQuery::new().paginate(1000, 0).validate().is_ok());
        assert!(ListQuery::new().paginate(0, 0).validate().is_ok());
        assert!(ListQuery::new().paginate(1001, 0).validate().is_err());
        assert!(ListQuery::new().paginate(10, -1).validate().is_err());
    }

    #[test]
    fn zero_limit_returns_empty_page_with_total() {
        let page = apply_query(rows(), &ListQuery::new().paginate(0, 0));
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn operators() {
        let doc = json!({"name": "Ops Mail", "rank": 2, "settings": {"timeoutMs": 500}});
        assert!(matches(&doc, &Filter::eq("rank", 2.0)));
        assert!(matches(&doc, &Filter::new("rank", FilterOperator::Gte, json!(2))));
        assert!(!matches(&doc, &Filter::new("rank", FilterOperator::Gt, json!(2))));
        assert!(matches(&doc, &Filter::new("name", FilterOperator::Like, json!("ops%"))));
        assert!(!matches(&doc, &Filter::new("name", FilterOperator::Like, json!("mail%"))));
        assert!(matches(
            &doc,
            &Filter::new("rank", FilterOperator::In, json!([1, 2]))
        ));
        assert!(matches(
            &doc,
            &Filter::new("settings.timeoutMs", FilterOperator::Lt, json!(1000))
        ));
        assert!(matches(&doc, &Filter::new("missing", FilterOperator::Ne, json!("x"))));
        assert!(matches(&doc, &Filter::eq("missing", Value::Null)));
    }

    #[test]
    fn sort_and_page() {
        let q = ListQuery::new()
            .filter(Filter::eq("enabled", true))
            .sort_by("rank", SortOrder::Desc)
            .paginate(1, 1);
        let page = apply_query(rows(), &q);
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "gamma");
    }

    #[test]
    fn malformed_filters_rejected() {
        let q = ListQuery::new().filter(Filter::new("a", FilterOperator::In, json!(1)));
        assert!(q.validate().is_err());
        let q = ListQuery::new().filter(Filter::new(" ", FilterOperator::Eq, json!(1)));
        assert!(q.validate().is_err());
    }

    #[test]
    fn query_deserializes_with_defaults() {
        let q: ListQuery = serde_json::from_value(json!({
            "filters": [{"field": "name", "operator": "like", "value": "a%"}],
            "sort": {"field": "createdAt"}
        }))
        .unwrap();
        assert_eq!(q.pagination.limit, DEFAULT_LIMIT);
        assert_eq!(q.sort.unwrap().order, SortOrder::Asc);
        assert!(serde_json::from_value::<ListQuery>(json!({"sort": {"field": "x", "order": "sideways"}})).is_err());
    }
}
