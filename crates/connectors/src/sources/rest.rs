//! REST API data source.
//!
//! Lists records through a paginated `list` endpoint and fetches single
//! records through an optional `show` endpoint. Equality filters on plain
//! keys become query parameters (or fill `{placeholder}` path tokens); other
//! filters run in memory after the fetch.
use crate::sources::pagination::{set_param, unwrap_payload, Paginator};
use crate::sources::transport::{excerpt, HttpRequest, ReqwestTransport, Transport};
use crate::sources::SourceProvider;
use anyquery_common::config::{AppConfig, SourceConfig, MAX_ITERATIONS};
use anyquery_common::{Record, Value};
use anyquery_core::adapter::{resolve_joins, run_pipeline, Adapter, AdapterKind, LoadRequest};
use anyquery_core::filter::fallback_filter;
use anyquery_core::{Condition, Join, Locator, Materialized, ModelSchema, Predicate, Row};
use anyquery_error::{ErrorCode, QueryError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone)]
pub struct RestSourceConfig {
    /// Base URL every endpoint path is appended to
    pub url: String,
    pub endpoints: EndpointsConfig,
    /// Per-source page cap, clamped to the global maximum
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    pub list: EndpointConfig,
    #[serde(default)]
    pub show: Option<EndpointConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    #[serde(default = "default_method")]
    pub method: String,
    /// May contain `{placeholder}` tokens
    pub path: String,
    #[serde(default)]
    pub wrapper: Option<PathConfig>,
    #[serde(default)]
    pub single_wrapper: Option<PathConfig>,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub default_params: DefaultParams,
}

fn default_method() -> String {
    "GET".to_string()
}

/// A key (`items`) or a nested path (`[data, items]`).
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathConfig {
    Key(String),
    Path(Vec<String>),
}

impl From<&PathConfig> for Locator {
    fn from(config: &PathConfig) -> Self {
        match config {
            PathConfig::Key(key) => Locator::key(key.as_str()),
            PathConfig::Path(segments) => Locator::path(segments.iter().cloned()),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationType {
    #[default]
    Page,
    Cursor,
    /// Offset-based; declared but not supported
    Skip,
    None,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationConfig {
    #[serde(rename = "type", default)]
    pub kind: PaginationType,
    #[serde(default)]
    pub starts_from: i64,
    #[serde(default)]
    pub params: PaginationParams,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationParams {
    #[serde(default = "default_number_param")]
    pub number: String,
    #[serde(default = "default_cursor_param")]
    pub cursor: String,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            number: default_number_param(),
            cursor: default_cursor_param(),
        }
    }
}

fn default_number_param() -> String {
    "page".to_string()
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DefaultParams {
    #[serde(default)]
    pub query: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

pub struct RestSourceProvider;

#[async_trait]
impl SourceProvider for RestSourceProvider {
    fn type_name(&self) -> &'static str {
        "http"
    }

    async fn build(&self, config: &SourceConfig, settings: &AppConfig) -> Result<Arc<dyn Adapter>> {
        let rest_config: RestSourceConfig = serde_json::from_value(config.config.clone())
            .map_err(|e| {
                QueryError::new(
                    ErrorCode::InvalidConfig,
                    format!("Failed to parse HTTP source '{}': {}", config.name, e),
                )
            })?;

        let max_iterations = rest_config
            .max_iterations
            .unwrap_or(settings.http.max_iterations)
            .min(settings.http.max_iterations);

        Ok(Arc::new(
            HttpAdapter::new(rest_config, Arc::new(ReqwestTransport::default()))
                .with_max_iterations(max_iterations),
        ))
    }
}

/// Resolved payload locators of one endpoint.
#[derive(Debug, Clone, Default)]
struct Wrappers {
    wrapper: Option<Locator>,
    single_wrapper: Option<Locator>,
}

impl From<&EndpointConfig> for Wrappers {
    fn from(endpoint: &EndpointConfig) -> Self {
        Self {
            wrapper: endpoint.wrapper.as_ref().map(Locator::from),
            single_wrapper: endpoint.single_wrapper.as_ref().map(Locator::from),
        }
    }
}

#[derive(Debug)]
pub struct HttpAdapter {
    config: RestSourceConfig,
    transport: Arc<dyn Transport>,
    max_iterations: usize,
    list_wrappers: Wrappers,
    show_wrapper: Option<Locator>,
}

impl HttpAdapter {
    pub fn new(config: RestSourceConfig, transport: Arc<dyn Transport>) -> Self {
        let list_wrappers = Wrappers::from(&config.endpoints.list);
        let show_wrapper = config
            .endpoints
            .show
            .as_ref()
            .and_then(|show| show.wrapper.as_ref())
            .map(Locator::from);
        Self {
            config,
            transport,
            max_iterations: MAX_ITERATIONS,
            list_wrappers,
            show_wrapper,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Locate the payload inside every list response body.
    pub fn with_list_wrapper(mut self, wrapper: Locator) -> Self {
        self.list_wrappers.wrapper = Some(wrapper);
        self
    }

    /// Locate the record inside every element of a list payload.
    pub fn with_list_single_wrapper(mut self, wrapper: Locator) -> Self {
        self.list_wrappers.single_wrapper = Some(wrapper);
        self
    }

    /// Locate the record inside the show response body.
    pub fn with_show_wrapper(mut self, wrapper: Locator) -> Self {
        self.show_wrapper = Some(wrapper);
        self
    }

    pub fn config(&self) -> &RestSourceConfig {
        &self.config
    }

    /// Build the first list request: default params, then pushed filters.
    fn list_request(
        &self,
        endpoint: &EndpointConfig,
        pushed: &[(String, Condition)],
    ) -> Result<HttpRequest> {
        let mut path_values = BTreeMap::new();
        for (key, condition) in pushed {
            if let Condition::Eq(value) = condition {
                path_values.insert(key.clone(), value.to_param());
            }
        }
        let (url, consumed) = self.endpoint_url(endpoint, &path_values)?;

        let mut request = self.base_request(endpoint, url);
        for (key, condition) in pushed {
            match condition {
                Condition::Eq(_) if consumed.contains(key) => {}
                Condition::Eq(value) => set_param(&mut request.query, key, value.to_param()),
                Condition::In(values) => {
                    let name = format!("{}[]", key);
                    request
                        .query
                        .extend(values.iter().map(|v| (name.clone(), v.to_param())));
                }
            }
        }
        Ok(request)
    }

    fn base_request(&self, endpoint: &EndpointConfig, url: String) -> HttpRequest {
        HttpRequest {
            method: endpoint.method.clone(),
            url,
            query: endpoint
                .default_params
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone()).to_param()))
                .collect(),
            headers: endpoint
                .default_params
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Join the base URL and the endpoint path, filling `{placeholder}`
    /// tokens. Returns the URL and the placeholder names that were filled.
    fn endpoint_url(
        &self,
        endpoint: &EndpointConfig,
        values: &BTreeMap<String, String>,
    ) -> Result<(String, Vec<String>)> {
        let (path, consumed) = fill_placeholders(&endpoint.path, values);
        let joined = format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = url::Url::parse(&joined).map_err(|e| {
            QueryError::new(
                ErrorCode::InvalidConfig,
                format!("Invalid endpoint URL '{}': {}", joined, e),
            )
        })?;
        Ok((url.to_string(), consumed))
    }

    /// Run the paginated list endpoint with `pushed` sent to the server.
    async fn fetch_list(
        &self,
        schema: &ModelSchema,
        pushed: &[(String, Condition)],
    ) -> Result<Vec<Record>> {
        let endpoint = &self.config.endpoints.list;
        let base = self.list_request(endpoint, pushed)?;
        let elements = Paginator::new(endpoint, base, self.max_iterations)
            .with_wrappers(
                self.list_wrappers.wrapper.clone(),
                self.list_wrappers.single_wrapper.clone(),
            )
            .run(self.transport.as_ref())
            .await?;
        elements
            .into_iter()
            .map(|e| into_record(e, &schema.name))
            .collect()
    }

    async fn send(&self, request: &HttpRequest) -> Result<Value> {
        tracing::debug!(
            "Starting request to {} with params {:?}",
            request.url,
            request.query
        );
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(QueryError::transport(
                &request.url,
                response.status,
                excerpt(&response.body),
            ));
        }
        Ok(Value::from(response.json(&request.url)?))
    }
}

/// Replace `{name}` tokens with `values[name]`; unknown tokens stay as-is.
fn fill_placeholders(path: &str, values: &BTreeMap<String, String>) -> (String, Vec<String>) {
    let mut output = String::with_capacity(path.len());
    let mut consumed = Vec::new();
    let mut rest = path;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        output.push_str(&rest[..start]);
        match values.get(name) {
            Some(value) => {
                output.push_str(value);
                consumed.push(name.to_string());
            }
            None => {
                tracing::warn!("No value for path placeholder {{{}}} in {}", name, path);
                output.push_str(&rest[start..=start + len]);
            }
        }
        rest = &rest[start + len + 1..];
    }
    output.push_str(rest);
    (output, consumed)
}

/// Split filters into key conditions sent to the server and the rest.
fn split_filters(filters: &[Predicate]) -> (Vec<(String, Condition)>, Vec<Predicate>) {
    let mut pushed = Vec::new();
    let mut residual = Vec::new();
    for predicate in filters {
        let mut local = Predicate::new();
        for (locator, condition) in &predicate.conditions {
            match locator.as_key() {
                Some(key) => pushed.push((key.to_string(), condition.clone())),
                None => local.conditions.push((locator.clone(), condition.clone())),
            }
        }
        if !local.is_empty() {
            residual.push(local);
        }
    }
    (pushed, residual)
}

fn into_record(element: Value, source: &str) -> Result<Record> {
    match element {
        Value::Record(record) => Ok(record),
        other => Err(QueryError::new(
            ErrorCode::TypeMismatch,
            format!(
                "Expected an object record from {}, got a {} value",
                source,
                other.type_name()
            ),
        )),
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Http
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized> {
        let (pushed, residual) = split_filters(&request.filters);
        let records = self.fetch_list(schema, &pushed).await?;

        run_pipeline(
            self,
            schema,
            records,
            LoadRequest {
                filters: residual,
                ..request
            },
        )
        .await
    }

    async fn load_single(
        &self,
        schema: &ModelSchema,
        id: Value,
        joins: Vec<Join>,
        batch_size: usize,
    ) -> Result<Option<Row>> {
        let Some(endpoint) = &self.config.endpoints.show else {
            // The list endpoint may ignore the id param, so the key is checked here too.
            let pushed = [(schema.primary_key.clone(), Condition::Eq(id.clone()))];
            let records = self.fetch_list(schema, &pushed).await?;
            let matching = fallback_filter(
                records,
                &[Predicate::new().eq(schema.primary_key.as_str(), id)],
            )?;
            let records = resolve_joins(
                self,
                schema,
                matching.into_iter().take(1).collect(),
                &joins,
                batch_size,
            )
            .await?;
            return Ok(records.into_iter().next().map(Row::new));
        };

        let mut values = BTreeMap::new();
        values.insert("id".to_string(), id.to_param());
        values.insert(schema.primary_key.clone(), id.to_param());
        let (url, _) = self.endpoint_url(endpoint, &values)?;

        let body = self.send(&self.base_request(endpoint, url)).await?;
        let record = match unwrap_payload(&body, self.show_wrapper.as_ref())? {
            Value::Null => return Ok(None),
            other => into_record(other, &schema.name)?,
        };
        tracing::debug!("Responded with single record for {} {}", schema.name, id);

        let records = resolve_joins(self, schema, vec![record], &joins, batch_size).await?;
        Ok(records.into_iter().next().map(Row::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_config_parsing() {
        let yaml = r#"
        url: "http://example.com"
        endpoints:
          list:
            path: /articles
            wrapper: [items]
            pagination:
              type: cursor
              params:
                cursor: next
            default_params:
              query:
                some_query_param: 1
              headers:
                Authorization: some
          show:
            method: get
            path: "/articles/{id}"
        "#;
        let config: RestSourceConfig = serde_yaml::from_str(yaml).expect("Failed to parse config");
        let list = &config.endpoints.list;
        assert_eq!(list.method, "GET");
        assert_eq!(list.wrapper, Some(PathConfig::Path(vec!["items".to_string()])));
        assert_eq!(list.pagination.kind, PaginationType::Cursor);
        assert_eq!(list.pagination.params.cursor, "next");
        assert_eq!(list.pagination.params.number, "page");
        assert_eq!(list.default_params.headers["Authorization"], "some");
        assert!(config.endpoints.show.is_some());
    }

    #[test]
    fn test_pagination_defaults_to_page() {
        let endpoint: EndpointConfig = serde_yaml::from_str("path: /x").unwrap();
        assert_eq!(endpoint.pagination.kind, PaginationType::Page);
        assert_eq!(endpoint.pagination.starts_from, 0);
    }

    #[test]
    fn test_fill_placeholders() {
        let mut values = BTreeMap::new();
        values.insert("company_id".to_string(), "42".to_string());
        let (path, consumed) = fill_placeholders("/{company_id}/users/{id}", &values);
        assert_eq!(path, "/42/users/{id}");
        assert_eq!(consumed, vec!["company_id".to_string()]);
    }

    #[test]
    fn test_split_filters() {
        let filters = vec![Predicate::new()
            .eq("status", 1)
            .eq(["meta", "kind"], "a")];
        let (pushed, residual) = split_filters(&filters);
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].0, "status");
        assert_eq!(residual.len(), 1);
        assert_eq!(residual[0].conditions.len(), 1);
    }
}
