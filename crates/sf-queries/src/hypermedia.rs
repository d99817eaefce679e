//! Hypermedia processor
//!
//! Wraps a [`QueryResponse`] into the response envelope:
//!
//! ```json
//! {
//!   "data": [ ... ],
//!   "meta": { "count": 1000, "pageCount": 200, "offset": 0, "limit": 200, "timestamp": "..." },
//!   "links": {
//!     "self": { "href": "https://shop.example/products", "rel": "self", "method": "GET" },
//!     "next": { "href": "https://shop.example/products?limit=200&offset=200", "method": "GET" }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::form_urlencoded;

use crate::model::QueryResponse;
use crate::parser::OFFSET_KEY;

/// The parts of the incoming request that links are derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }

    pub fn get(path: impl Into<String>, query: Option<&str>) -> Self {
        Self::new("GET", path, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfLink {
    pub href: String,
    pub rel: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextLink {
    pub href: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: SelfLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<NextLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub count: u64,
    pub page_count: u64,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Response envelope
#[derive(Debug, Clone, Serialize)]
pub struct HypermediaResponse<T> {
    pub data: Vec<T>,
    pub meta: Meta,
    pub links: Links,
}

/// Builds self/next links relative to a public base URL
#[derive(Debug, Clone)]
pub struct HypermediaProcessor {
    base_url: String,
}

impl HypermediaProcessor {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn respond<T>(&self, response: QueryResponse<T>, request: &RequestInfo) -> HypermediaResponse<T> {
        let links = Links {
            self_link: self.self_link(request),
            next: self.next_link(&response, request),
        };
        let meta = Meta {
            count: response.count(),
            page_count: response.page_count(),
            offset: response.offset_opt(),
            limit: response.limit_opt(),
            timestamp: Utc::now(),
        };

        HypermediaResponse {
            data: response.into_data().into_vec(),
            meta,
            links,
        }
    }

    /// Base URL plus request path, query stripped
    pub fn self_link(&self, request: &RequestInfo) -> SelfLink {
        SelfLink {
            href: self.href(&request.path),
            rel: "self".to_string(),
            method: request.method.clone(),
        }
    }

    /// Present only when the response is paginated and rows remain
    pub fn next_link<T>(&self, response: &QueryResponse<T>, request: &RequestInfo) -> Option<NextLink> {
        let offset = response.offset_opt()?;
        let next_offset = offset + response.page_count();
        if next_offset >= response.count() {
            return None;
        }

        Some(NextLink {
            href: format!(
                "{}?{}",
                self.href(&request.path),
                replace_offset(request.query.as_deref(), next_offset)
            ),
            method: request.method.clone(),
        })
    }

    fn href(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Re-serialize a query string with every `offset` pair replaced
fn replace_offset(query: Option<&str>, offset: u64) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Some(query) = query {
        serializer.extend_pairs(form_urlencoded::parse(query.as_bytes()).filter(|(key, _)| key != OFFSET_KEY));
    }
    serializer.append_pair(OFFSET_KEY, &offset.to_string());
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(count: u64, page_count: u64, offset: Option<u64>) -> QueryResponse<u64> {
        let mut response = QueryResponse::many((0..page_count).collect());
        response.set_count(count).set_page_count(page_count);
        if let Some(offset) = offset {
            response.set_offset(offset);
        }
        response
    }

    fn next_offset(href: &str) -> Option<String> {
        let query = href.split_once('?')?.1;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "offset")
            .map(|(_, value)| value.into_owned())
    }

    #[test]
    fn test_next_link_pagination() {
        let processor = HypermediaProcessor::new("http://shop.test");
        let request = RequestInfo::get("/products", Some("limit=200"));

        let first = processor.next_link(&page(1000, 200, Some(0)), &request).unwrap();
        assert_eq!(next_offset(&first.href).as_deref(), Some("200"));

        let second = processor.next_link(&page(1000, 200, Some(200)), &request).unwrap();
        assert_eq!(next_offset(&second.href).as_deref(), Some("400"));

        assert!(processor.next_link(&page(1000, 200, Some(800)), &request).is_none());
        assert!(processor.next_link(&page(1000, 200, Some(900)), &request).is_none());
    }

    #[test]
    fn test_no_next_link_without_offset() {
        let processor = HypermediaProcessor::new("http://shop.test");
        let request = RequestInfo::get("/products", None);
        assert!(processor.next_link(&page(1000, 200, None), &request).is_none());
    }

    #[test]
    fn test_next_link_preserves_other_params_in_order() {
        let processor = HypermediaProcessor::new("http://shop.test/");
        let request = RequestInfo::get(
            "/products",
            Some("offset=0&name%5Blike%5D=oak&sort_by=desc(price)&offset=5&limit=2"),
        );

        let next = processor.next_link(&page(10, 2, Some(0)), &request).unwrap();
        let (path, query) = next.href.split_once('?').unwrap();
        assert_eq!(path, "http://shop.test/products");

        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("name[like]".to_string(), "oak".to_string()),
                ("sort_by".to_string(), "desc(price)".to_string()),
                ("limit".to_string(), "2".to_string()),
                ("offset".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(next.method, "GET");
    }

    #[test]
    fn test_self_link_strips_query() {
        let processor = HypermediaProcessor::new("https://api.shop.test");
        let request = RequestInfo::new("POST", "/users", Some("x=1"));

        let link = processor.self_link(&request);
        assert_eq!(link.href, "https://api.shop.test/users");
        assert_eq!(link.rel, "self");
        assert_eq!(link.method, "POST");
    }

    #[test]
    fn test_envelope_shape() {
        let processor = HypermediaProcessor::new("http://shop.test");
        let request = RequestInfo::get("/users", Some("limit=2&offset=1"));
        let mut response = QueryResponse::many(vec![json!({"email": "d@x"}), json!({"email": "c@x"})]);
        response.set_count(5).set_offset(1).set_limit(2);

        let body = serde_json::to_value(processor.respond(response, &request)).unwrap();
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["meta"]["count"], json!(5));
        assert_eq!(body["meta"]["pageCount"], json!(2));
        assert_eq!(body["meta"]["offset"], json!(1));
        assert_eq!(body["meta"]["limit"], json!(2));
        assert!(body["meta"]["timestamp"].is_string());
        assert_eq!(body["links"]["self"]["href"], json!("http://shop.test/users"));
        assert_eq!(
            body["links"]["next"]["href"],
            json!("http://shop.test/users?limit=2&offset=3")
        );
    }

    #[test]
    fn test_single_entity_has_no_next_link() {
        let processor = HypermediaProcessor::new("http://shop.test");
        let request = RequestInfo::get("/users/7", None);

        let body = serde_json::to_value(processor.respond(QueryResponse::one(json!({"id": 7})), &request))
            .unwrap();
        assert_eq!(body["data"], json!([{"id": 7}]));
        assert_eq!(body["meta"]["offset"], json!(null));
        assert!(body["links"].get("next").is_none());
    }

    #[test]
    fn test_unpaged_list_counts_its_rows() {
        let processor = HypermediaProcessor::new("http://shop.test");
        let request = RequestInfo::get("/users/7/roles", None);

        let envelope = processor.respond(QueryResponse::many(vec![1, 2, 3]), &request);
        assert_eq!(envelope.meta.count, envelope.data.len() as u64);
        assert_eq!(envelope.meta.page_count, 3);
        assert!(envelope.links.next.is_none());
    }
}
