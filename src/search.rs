use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};

use crate::error::ValidatorError;

pub const DONOR_ID_FIELD: &str = "samples.donor.donorId";
pub const STUDY_ID_FIELD: &str = "studyId";
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
/// Analyses fetched per donor in a single request.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;
const DISTINCT_BUCKETS: usize = 100_000;
const DISTINCT_AGG: &str = "distinct";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Total matches reported by the backend, which may exceed `hits.len()`.
    pub total: Option<u64>,
    pub hits: Vec<Value>,
    pub aggregations: Value,
}

/// Document index operations used by ingestion and validation.
pub trait SearchClient: Send + Sync {
    fn index_exists(&self, index: &str) -> Result<bool, ValidatorError>;
    fn create_index(&self, index: &str, mapping: &Value) -> Result<(), ValidatorError>;
    /// Stores `document` under `id`; an existing document with the same id is replaced.
    fn index_document(&self, index: &str, id: &str, document: &Value)
    -> Result<(), ValidatorError>;
    fn aggregate_distinct(
        &self,
        index: &str,
        field: &str,
        query: &Value,
    ) -> Result<Vec<String>, ValidatorError>;
    fn search(&self, index: &str, body: &Value, size: usize)
    -> Result<SearchResponse, ValidatorError>;
}

pub fn terms_query(field: &str, values: &[&str]) -> Value {
    json!({ "terms": { field: values } })
}

/// Search body for one donor's analyses plus an optional aggregation bundle.
pub fn donor_search_body(donor_id: &str, aggregations: Option<&Value>) -> Value {
    let mut body = aggregations
        .and_then(Value::as_object)
        .cloned()
        .map(Value::Object)
        .unwrap_or_else(|| json!({}));
    body["query"] = terms_query(DONOR_ID_FIELD, &[donor_id]);
    body
}

pub fn parse_search_response(raw: &Value) -> Result<SearchResponse, ValidatorError> {
    let hits = raw
        .get("hits")
        .ok_or_else(|| ValidatorError::SearchResponse("missing hits".to_string()))?;
    let total = match hits.get("total") {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::Object(object)) => object.get("value").and_then(Value::as_u64),
        _ => None,
    };
    let documents = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(|hit| hit.get("_source").cloned())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(SearchResponse {
        total,
        hits: documents,
        aggregations: raw.get("aggregations").cloned().unwrap_or(Value::Null),
    })
}

pub fn parse_distinct_buckets(
    aggregations: &Value,
    name: &str,
) -> Result<Vec<String>, ValidatorError> {
    let buckets = aggregations
        .get(name)
        .and_then(|value| value.get("buckets"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ValidatorError::SearchResponse(format!("missing buckets for aggregation {name}"))
        })?;
    Ok(buckets
        .iter()
        .filter_map(|bucket| match bucket.get("key") {
            Some(Value::String(key)) => Some(key.clone()),
            Some(Value::Number(key)) => Some(key.to_string()),
            _ => None,
        })
        .collect())
}

#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: Url,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str) -> Result<Self, ValidatorError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ValidatorError::SearchHttp(format!("invalid url {base_url}: {err}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("song-validator/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ValidatorError::SearchHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ValidatorError::SearchHttp(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ValidatorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ValidatorError::SearchHttp(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, ValidatorError> {
        request
            .send()
            .map_err(|err| ValidatorError::SearchHttp(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ValidatorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "search request failed".to_string());
        Err(ValidatorError::SearchStatus { status, message })
    }

    fn post_search(&self, index: &str, body: &Value, size: usize) -> Result<Value, ValidatorError> {
        let url = self.url(&[index, "_search"])?;
        let request = self
            .client
            .post(url)
            .query(&[("size", size.to_string())])
            .json(body);
        let response = Self::handle_status(Self::send(request)?)?;
        response
            .json()
            .map_err(|err| ValidatorError::SearchResponse(err.to_string()))
    }
}

impl SearchClient for ElasticsearchClient {
    fn index_exists(&self, index: &str) -> Result<bool, ValidatorError> {
        let url = self.url(&[index])?;
        let response = Self::send(self.client.head(url))?;
        match response.status().as_u16() {
            404 => Ok(false),
            _ => Self::handle_status(response).map(|_| true),
        }
    }

    fn create_index(&self, index: &str, mapping: &Value) -> Result<(), ValidatorError> {
        let url = self.url(&[index])?;
        Self::handle_status(Self::send(self.client.put(url).json(mapping))?)?;
        Ok(())
    }

    fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), ValidatorError> {
        let url = self.url(&[index, "_doc", id])?;
        Self::handle_status(Self::send(self.client.put(url).json(document))?)?;
        Ok(())
    }

    fn aggregate_distinct(
        &self,
        index: &str,
        field: &str,
        query: &Value,
    ) -> Result<Vec<String>, ValidatorError> {
        let body = json!({
            "query": query,
            "aggs": {
                DISTINCT_AGG: { "terms": { "field": field, "size": DISTINCT_BUCKETS } }
            },
            "_source": false
        });
        let raw = self.post_search(index, &body, 0)?;
        let aggregations = raw.get("aggregations").cloned().unwrap_or(Value::Null);
        parse_distinct_buckets(&aggregations, DISTINCT_AGG)
    }

    fn search(
        &self,
        index: &str,
        body: &Value,
        size: usize,
    ) -> Result<SearchResponse, ValidatorError> {
        let raw = self.post_search(index, body, size)?;
        parse_search_response(&raw)
    }
}
