//! Query model
//!
//! The intermediate representation produced by the parameter processor and
//! consumed by the condition builder, the SQL compiler and the hypermedia
//! processor. A model is built fresh for every request and never persisted.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sf_core::traits::Id;

/// Output format for date filter values (millisecond precision, `Z` suffix)
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// How a filter (or filter group) relates to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunctive {
    #[default]
    And,
    Or,
}

/// Comparison operators available in the query-string grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    #[default]
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl FilterOperator {
    /// Parse the bracketed key suffix, e.g. `gte` in `age[gte]`
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "ne" => Some(Self::Ne),
            "like" => Some(Self::Like),
            _ => None,
        }
    }

    /// Key used in the condition tree, e.g. `$gte`
    pub fn condition_key(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Like => "$like",
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// A coerced filter value
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    Date(DateTime<Utc>),
    Text(String),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// The value as it would appear in a query string
    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Date(_) | Self::Text(_) => serializer.serialize_str(&self.as_text()),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A single `property operator value` comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFilter {
    pub property: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    pub conjunctive: Conjunctive,
}

impl ColumnFilter {
    pub fn new(
        property: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
        conjunctive: Conjunctive,
    ) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
            conjunctive,
        }
    }
}

/// Filters produced by one query-string key
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ColumnFilterList {
    /// Relation of this group to the previous group
    pub conjunctive: Conjunctive,
    pub filters: Vec<ColumnFilter>,
}

impl ColumnFilterList {
    pub fn new(conjunctive: Conjunctive, filters: Vec<ColumnFilter>) -> Self {
        Self {
            conjunctive,
            filters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only the lowercase method names of the `sort_by` grammar are accepted
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `asc(a,b)` / `desc(c)` term of `sort_by`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortEntry {
    pub direction: SortDirection,
    pub fields: Vec<String>,
}

impl SortEntry {
    pub fn new(direction: SortDirection, fields: Vec<String>) -> Self {
        Self { direction, fields }
    }
}

/// Parsed representation of a request's query string
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryModel {
    pub filter_list: Vec<ColumnFilterList>,
    pub sort_list: Vec<SortEntry>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_filters(&self) -> bool {
        !self.filter_list.is_empty()
    }

    /// Append an AND group matching a single primary key
    pub fn set_primary_id(&mut self, id: Id) -> &mut Self {
        self.filter_list.push(ColumnFilterList::new(
            Conjunctive::And,
            vec![ColumnFilter::new(
                "id",
                FilterOperator::Eq,
                FilterValue::Integer(id),
                Conjunctive::And,
            )],
        ));
        self
    }

    /// Model for a find-by-id lookup
    pub fn for_id(id: Id) -> Self {
        let mut model = Self::new();
        model.set_primary_id(id);
        model
    }

    /// `limit`, or the given default when the request set none
    pub fn limit_or(&self, default: u64) -> u64 {
        self.limit.unwrap_or(default)
    }
}

/// Data carried by a [`QueryResponse`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> ResponseData<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Result of running a query: data plus pagination counters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    data: ResponseData<T>,
    count: Option<u64>,
    page_count: Option<u64>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl<T> QueryResponse<T> {
    /// A page of rows; `count` and `page_count` default to the number of
    /// rows until a pager overrides them
    pub fn many(items: Vec<T>) -> Self {
        let len = items.len() as u64;
        Self {
            data: ResponseData::Many(items),
            count: Some(len),
            page_count: Some(len),
            offset: None,
            limit: None,
        }
    }

    /// A single entity; carries no offset so it never paginates
    pub fn one(item: T) -> Self {
        Self {
            data: ResponseData::One(item),
            count: Some(1),
            page_count: Some(1),
            offset: None,
            limit: None,
        }
    }

    pub fn set_count(&mut self, count: u64) -> &mut Self {
        self.count = Some(count);
        self
    }

    pub fn set_page_count(&mut self, page_count: u64) -> &mut Self {
        self.page_count = Some(page_count);
        self
    }

    pub fn set_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn count(&self) -> u64 {
        self.count.unwrap_or(0)
    }

    pub fn page_count(&self) -> u64 {
        self.page_count.unwrap_or(0)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(0)
    }

    /// Offset as set, `None` when the response is not paginated
    pub fn offset_opt(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit_opt(&self) -> Option<u64> {
        self.limit
    }

    pub fn data(&self) -> &ResponseData<T> {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> ResponseData<T> {
        self.data
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> QueryResponse<U> {
        let data = match self.data {
            ResponseData::One(item) => ResponseData::One(f(item)),
            ResponseData::Many(items) => ResponseData::Many(items.into_iter().map(f).collect()),
        };
        QueryResponse {
            data,
            count: self.count,
            page_count: self.page_count,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_operator_suffixes() {
        assert_eq!(FilterOperator::from_suffix("gte"), Some(FilterOperator::Gte));
        assert_eq!(FilterOperator::from_suffix("like"), Some(FilterOperator::Like));
        assert_eq!(FilterOperator::from_suffix("eq"), None);
        assert_eq!(FilterOperator::from_suffix("GT"), None);
        assert_eq!(FilterOperator::Ne.sql_operator(), "<>");
        assert_eq!(FilterOperator::Lte.condition_key(), "$lte");
    }

    #[test]
    fn test_filter_value_serialization() {
        let date = Utc.with_ymd_and_hms(2010, 4, 21, 4, 0, 0).unwrap();
        assert_eq!(serde_json::to_value(FilterValue::Integer(25)).unwrap(), serde_json::json!(25));
        assert_eq!(
            serde_json::to_value(FilterValue::Date(date)).unwrap(),
            serde_json::json!("2010-04-21T04:00:00.000Z")
        );
        assert_eq!(
            serde_json::to_value(FilterValue::text("abc")).unwrap(),
            serde_json::json!("abc")
        );
    }

    #[test]
    fn test_set_primary_id() {
        let mut model = QueryModel::new();
        model.set_primary_id(5);

        assert_eq!(model.filter_list.len(), 1);
        let group = &model.filter_list[0];
        assert_eq!(group.conjunctive, Conjunctive::And);
        assert_eq!(
            group.filters,
            vec![ColumnFilter::new("id", FilterOperator::Eq, 5i64, Conjunctive::And)]
        );
    }

    #[test]
    fn test_query_response_defaults() {
        let response: QueryResponse<i32> = QueryResponse::many(vec![1, 2, 3]);
        assert_eq!(response.count(), 3);
        assert_eq!(response.offset(), 0);
        assert_eq!(response.limit(), 0);
        assert_eq!(response.page_count(), 3);
        assert_eq!(response.offset_opt(), None);
    }

    #[test]
    fn test_query_response_setters_and_map() {
        let mut response = QueryResponse::many(vec![1, 2]);
        response.set_count(10).set_offset(4).set_limit(2);

        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.count(), 10);
        assert_eq!(mapped.offset(), 4);
        assert_eq!(mapped.limit(), 2);
        assert_eq!(mapped.into_data().into_vec(), vec![10, 20]);
    }

    #[test]
    fn test_single_response() {
        let response = QueryResponse::one("only");
        assert_eq!(response.offset_opt(), None);
        assert_eq!(response.data().len(), 1);
        assert_eq!(response.into_data().into_vec(), vec!["only"]);
    }
}
