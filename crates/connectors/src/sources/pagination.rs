//! Pagination engine for list endpoints.
//!
//! Repeats the list request with page/cursor parameters until the remote
//! sequence ends. The remote length is unknown, so the loop stops on the
//! first of: an identical response, an empty payload, a page that adds no
//! new record, pagination type `none`, or the iteration cap.

use super::rest::{EndpointConfig, PaginationType};
use super::transport::{excerpt, HttpRequest, Transport};
use anyquery_common::config::MAX_ITERATIONS;
use anyquery_common::Value;
use anyquery_core::Locator;
use anyquery_error::{QueryError, Result};
use std::collections::HashSet;

/// Replace every pair named `key`, keeping the position of the first one.
pub fn set_param(query: &mut Vec<(String, String)>, key: &str, value: String) {
    match query.iter().position(|(k, _)| k == key) {
        Some(idx) => {
            query[idx].1 = value;
            let mut seen = false;
            query.retain(|(k, _)| {
                if k != key {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            });
        }
        None => query.push((key.to_string(), value)),
    }
}

/// Resolve an optional wrapper against a response body.
///
/// Without a wrapper the body is the payload. A wrapper over a body that is
/// not an object yields `Null`.
pub fn unwrap_payload(body: &Value, wrapper: Option<&Locator>) -> Result<Value> {
    match (wrapper, body) {
        (None, body) => Ok(body.clone()),
        (Some(locator), Value::Record(record)) => locator.resolve(record),
        (Some(_), _) => Ok(Value::Null),
    }
}

enum Step {
    More,
    Done(&'static str),
}

/// Accumulates the records of one paginated list query.
pub struct Paginator<'a> {
    endpoint: &'a EndpointConfig,
    base: HttpRequest,
    cap: usize,
    wrapper: Option<Locator>,
    single_wrapper: Option<Locator>,
    previous: Option<Value>,
    seen: HashSet<Value>,
    results: Vec<Value>,
}

impl<'a> Paginator<'a> {
    /// `base` carries default params and filters; page params are added per
    /// iteration. `max_iterations` is clamped to [`MAX_ITERATIONS`].
    pub fn new(endpoint: &'a EndpointConfig, base: HttpRequest, max_iterations: usize) -> Self {
        Self {
            endpoint,
            base,
            cap: max_iterations.clamp(1, MAX_ITERATIONS),
            wrapper: endpoint.wrapper.as_ref().map(Locator::from),
            single_wrapper: endpoint.single_wrapper.as_ref().map(Locator::from),
            previous: None,
            seen: HashSet::new(),
            results: Vec::new(),
        }
    }

    /// Override the wrappers read from the endpoint config.
    pub fn with_wrappers(
        mut self,
        wrapper: Option<Locator>,
        single_wrapper: Option<Locator>,
    ) -> Self {
        self.wrapper = wrapper;
        self.single_wrapper = single_wrapper;
        self
    }

    pub async fn run(mut self, transport: &dyn Transport) -> Result<Vec<Value>> {
        if self.endpoint.pagination.kind == PaginationType::Skip {
            return Err(QueryError::unsupported_strategy("skip pagination"));
        }

        for iteration in 0..self.cap {
            let Some(request) = self.request_for(iteration) else {
                tracing::debug!(
                    "Stopping pagination of {}: previous response carried no cursor",
                    self.base.url
                );
                return Ok(self.results);
            };

            match self.step(transport, request).await? {
                Step::More => {}
                Step::Done(reason) => {
                    tracing::debug!(
                        "Stopping pagination of {} after {} requests: {}",
                        self.base.url,
                        iteration + 1,
                        reason
                    );
                    return Ok(self.results);
                }
            }
        }

        tracing::warn!(
            "Reached the pagination cap of {} requests for {}; returning {} records",
            self.cap,
            self.base.url,
            self.results.len()
        );
        Ok(self.results)
    }

    fn request_for(&self, iteration: usize) -> Option<HttpRequest> {
        let pagination = &self.endpoint.pagination;
        let mut request = self.base.clone();
        match pagination.kind {
            PaginationType::Page => {
                let page = pagination.starts_from + iteration as i64;
                set_param(&mut request.query, &pagination.params.number, page.to_string());
            }
            PaginationType::Cursor => {
                if let Some(previous) = &self.previous {
                    let cursor = previous
                        .as_record()
                        .and_then(|body| body.get(&pagination.params.cursor))
                        .filter(|c| !c.is_null())?;
                    set_param(
                        &mut request.query,
                        &pagination.params.cursor,
                        cursor.to_param(),
                    );
                }
            }
            PaginationType::Skip | PaginationType::None => {}
        }
        Some(request)
    }

    async fn step(&mut self, transport: &dyn Transport, request: HttpRequest) -> Result<Step> {
        tracing::debug!(
            "Starting request to {} with params {:?}",
            request.url,
            request.query
        );
        let response = transport.execute(&request).await?;
        if !response.is_success() {
            return Err(QueryError::transport(
                &request.url,
                response.status,
                excerpt(&response.body),
            ));
        }

        let body = Value::from(response.json(&request.url)?);
        if self.previous.as_ref() == Some(&body) {
            return Ok(Step::Done("response identical to the previous one"));
        }

        let payload = unwrap_payload(&body, self.wrapper.as_ref())?;
        self.previous = Some(body);

        let elements = match payload {
            Value::Null => return Ok(Step::Done("empty payload")),
            Value::List(items) if items.is_empty() => return Ok(Step::Done("empty payload")),
            Value::List(items) => items,
            single => vec![single],
        };
        tracing::debug!("Responded with {} records", elements.len());

        let before = self.results.len();
        for element in elements {
            let element = match (&self.single_wrapper, &element) {
                (Some(locator), Value::Record(record)) => locator.resolve(record)?,
                (Some(_), _) => Value::Null,
                (None, _) => element,
            };
            if self.seen.insert(element.clone()) {
                self.results.push(element);
            }
        }
        if self.results.len() == before {
            return Ok(Step::Done("page added no new records"));
        }

        if self.endpoint.pagination.kind == PaginationType::None {
            return Ok(Step::Done("pagination disabled"));
        }
        Ok(Step::More)
    }
}
