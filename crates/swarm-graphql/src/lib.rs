#![warn(missing_docs)]

//! Provides GraphQL Middleware for HTTP Services
//!
//! A [`GraphQLRequest`] carries nothing but a GraphQL document. The
//! [`GraphQLService`] serializes it as `{"query": "<document>"}` and `POST`s it
//! to its endpoint, handing back the raw HTTP response so callers can judge
//! the status code themselves.

use std::{fmt, future::Future, pin::Pin, str::FromStr};

use bytes::Bytes;
use http::{uri::InvalidUri, Method, Uri};
use http_body_util::Full;
use serde::Serialize;
use swarm_http::{HttpRequest, HttpResponse, HttpServiceError};
use swarm_tower::service::replace_ready_service;
use tower::{Layer, Service};
use url::Url;

/// Re-export / renamed type alias for [`graphql_client::Response`]
pub type GraphQLResponse<T> = graphql_client::Response<T>;

/// Re-export / renamed type alias for [`graphql_client::Error`]
pub type GraphQLError = graphql_client::Error;

/// JSON body of a GraphQL request: the document under a single `query` field
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPayload<'a> {
    query: &'a str,
}

impl<'a> QueryPayload<'a> {
    /// Wraps a GraphQL document
    pub const fn new(query: &'a str) -> QueryPayload<'a> {
        QueryPayload { query }
    }

    /// Serializes the payload to JSON bytes
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Errors that may occur from using a [`GraphQLService`]
#[derive(thiserror::Error, Debug)]
pub enum GraphQLServiceError {
    /// Data serialization error
    #[error("Serialization error: {}", .0)]
    Serialization(serde_json::Error),
    /// [`http`]-related error, probably from header-related tasks
    #[error("HTTP error: {:?}", .0)]
    Http(#[from] http::Error),
    /// Error that occurs from a failure to parse a [`Uri`] from a [`Url`]
    #[error("Unable to convert URL to URI.")]
    InvalidUri(#[from] InvalidUri),
    /// Errors that occur as a result of the underlying HTTP service failing
    #[error("Upstream service error: {}", .0)]
    UpstreamService(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl GraphQLServiceError {
    /// The transport error behind this one, if the HTTP layer failed
    pub fn http_service_error(&self) -> Option<&HttpServiceError> {
        match self {
            GraphQLServiceError::UpstreamService(err) => err.downcast_ref::<HttpServiceError>(),
            _ => None,
        }
    }
}

/// A GraphQL document (query or mutation) to send
#[derive(Clone, PartialEq, Eq)]
pub struct GraphQLRequest {
    query: String,
}

impl fmt::Debug for GraphQLRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:?}", self.query.trim())
    }
}

impl GraphQLRequest {
    /// Constructs a new [`GraphQLRequest`]
    pub fn new(query: impl Into<String>) -> GraphQLRequest {
        GraphQLRequest {
            query: query.into(),
        }
    }

    /// The JSON payload this request is sent as
    pub fn payload(&self) -> QueryPayload<'_> {
        QueryPayload::new(&self.query)
    }
}

/// [`Layer`] that wraps a service with GraphQL middleware
pub struct GraphQLLayer {
    endpoint: Url,
}

impl GraphQLLayer {
    /// Constructs a new [`GraphQLLayer`]
    pub fn new(endpoint: Url) -> GraphQLLayer {
        GraphQLLayer { endpoint }
    }
}

impl<S> Layer<S> for GraphQLLayer {
    type Service = GraphQLService<S>;
    fn layer(&self, inner: S) -> Self::Service {
        GraphQLService::new(self.endpoint.clone(), inner)
    }
}

/// Middleware that wraps a service in GraphQL functionality
#[derive(Clone, Debug)]
pub struct GraphQLService<S> {
    inner: S,
    endpoint: Url,
}

impl<S> GraphQLService<S> {
    /// Constructs a new [`GraphQLService`]
    pub fn new(endpoint: Url, inner: S) -> GraphQLService<S> {
        GraphQLService { endpoint, inner }
    }
}

impl<S> Service<GraphQLRequest> for GraphQLService<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = HttpResponse;
    type Error = GraphQLServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        tower::Service::poll_ready(&mut self.inner, cx)
            .map_err(|err| GraphQLServiceError::UpstreamService(Box::new(err)))
    }

    fn call(&mut self, req: GraphQLRequest) -> Self::Future {
        // https://docs.rs/tower/latest/tower/trait.Service.html#be-careful-when-cloning-inner-services
        let mut client = replace_ready_service::<_, HttpRequest>(&mut self.inner);

        let url = self.endpoint.clone();

        let fut = async move {
            let body_bytes = req
                .payload()
                .to_bytes()
                .map_err(GraphQLServiceError::Serialization)?;
            let req = http::Request::builder()
                .uri(Uri::from_str(url.as_str())?)
                .method(Method::POST)
                .body(Full::new(body_bytes))?;
            client
                .call(req)
                .await
                .map_err(|err| GraphQLServiceError::UpstreamService(Box::new(err)))
        };
        Box::pin(fut)
    }
}

/// Extracts the GraphQL `errors` from a response body.
///
/// Bodies that are not a GraphQL response yield no errors.
pub fn graphql_errors(body: &[u8]) -> Vec<GraphQLError> {
    serde_json::from_slice::<GraphQLResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|response| response.errors)
        .unwrap_or_default()
}
