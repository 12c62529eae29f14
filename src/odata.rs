//! OData query construction and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which a response's `etag` header is exposed on the body.
pub const ETAG_FIELD: &str = "_etag";

/// The service's own in-body representation of the concurrency token.
const ODATA_ETAG_FIELD: &str = "@odata.etag";

/// Ordered query parameters, rendered as `?k=v&k=v`.
///
/// Keys are emitted verbatim; values are percent-encoded. Filter expressions
/// are plain text here and must already be valid OData.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryParams {
    params: Vec<(String, Option<String>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    #[allow(dead_code)]
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    /// Append a parameter that is skipped at build time when `None`.
    pub fn set_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    /// Build query string for URL.
    pub fn build(&self) -> String {
        let parts: Vec<String> = self
            .params
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| format!("{}={}", key, urlencoding::encode(v)))
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

/// OData query builder over [`QueryParams`].
#[derive(Debug, Default, Clone)]
pub struct ODataQuery {
    filters: Vec<String>,
    select: Option<String>,
    orderby: Option<String>,
    top: Option<u32>,
}

impl ODataQuery {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a $filter clause; clauses are joined with `and`.
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filters.push(clause.into());
        self
    }

    /// Add a $filter clause when `clause` is `Some`.
    pub fn filter_opt(self, clause: Option<String>) -> Self {
        match clause {
            Some(c) => self.filter(c),
            None => self,
        }
    }

    /// Set $select to a comma-separated field list.
    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    /// Set $orderby (e.g. "TaskStepSeq asc").
    pub fn orderby(mut self, expr: impl Into<String>) -> Self {
        self.orderby = Some(expr.into());
        self
    }

    /// Add $top limit.
    pub fn top(mut self, limit: u32) -> Self {
        self.top = Some(limit);
        self
    }

    pub fn to_params(&self) -> QueryParams {
        let filter = (!self.filters.is_empty()).then(|| self.filters.join(" and "));
        QueryParams::new()
            .set_opt("$select", self.select.as_ref())
            .set_opt("$orderby", self.orderby.as_ref())
            .set_opt("$top", self.top)
            .set_opt("$filter", filter)
    }

    pub fn to_query_string(&self) -> String {
        self.to_params().build()
    }
}

/// Quote a string literal for use inside a $filter expression.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// OData v4 collection response wrapper.
#[derive(Debug, Deserialize, Serialize)]
pub struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,

    #[allow(dead_code)]
    #[serde(rename = "@odata.count", default)]
    pub count: Option<i64>,

    #[allow(dead_code)]
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Concurrency token of a fetched record: the copied `etag` header first,
/// then the in-body `@odata.etag`.
pub fn concurrency_token(record: &Value) -> Option<String> {
    [ETAG_FIELD, ODATA_ETAG_FIELD]
        .iter()
        .find_map(|key| record.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_skips_unset_and_encodes_values() {
        let query = QueryParams::new()
            .set("a", 1)
            .set_opt("b", None::<&str>)
            .set("c", "x y");
        assert_eq!(query.build(), "?a=1&c=x%20y");
    }

    #[test]
    fn test_build_empty_has_no_prefix() {
        assert_eq!(QueryParams::new().build(), "");
        assert_eq!(QueryParams::new().set_opt("$top", None::<u32>).build(), "");
    }

    #[test]
    fn test_keys_are_not_encoded() {
        let query = QueryParams::new().set("$select", "WoNo,Objstate");
        assert_eq!(query.build(), "?$select=WoNo%2CObjstate");
    }

    #[test]
    fn test_odata_query_joins_filters() {
        let query = ODataQuery::new()
            .select("WoNo")
            .orderby("EarliestStartDate asc")
            .top(50)
            .filter("Contract eq '2501'")
            .filter("PriorityId eq '1'");
        assert_eq!(
            query.to_query_string(),
            "?$select=WoNo&$orderby=EarliestStartDate%20asc&$top=50\
             &$filter=Contract%20eq%20%272501%27%20and%20PriorityId%20eq%20%271%27"
        );
    }

    #[test]
    fn test_odata_query_without_filters() {
        let query = ODataQuery::new().top(1).filter_opt(None);
        assert_eq!(query.to_query_string(), "?$top=1");
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_collection_envelope() {
        let collection: ODataCollection<Value> = serde_json::from_value(json!({
            "@odata.context": "$metadata#JtTaskSet",
            "@odata.count": 2,
            "@odata.nextLink": "JtTaskSet?$skip=2",
            "value": [{"TaskSeq": 1}, {"TaskSeq": 2}]
        }))
        .unwrap();
        assert_eq!(collection.value.len(), 2);
        assert_eq!(collection.count, Some(2));
        assert_eq!(collection.next_link.as_deref(), Some("JtTaskSet?$skip=2"));

        let empty: ODataCollection<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.value.is_empty());
    }

    #[test]
    fn test_concurrency_token_prefers_header_copy() {
        let record = json!({"WoNo": 5, "_etag": "W/123", "@odata.etag": "W/old"});
        assert_eq!(concurrency_token(&record).as_deref(), Some("W/123"));

        let record = json!({"WoNo": 5, "@odata.etag": "W/\"abc\""});
        assert_eq!(concurrency_token(&record).as_deref(), Some("W/\"abc\""));

        assert_eq!(concurrency_token(&json!({"WoNo": 5})), None);
    }
}
