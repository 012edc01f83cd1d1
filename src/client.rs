//! The GraphQL client every virtual user drives

use std::time::Instant;

use derive_getters::Getters;
use http::{header, HeaderMap, HeaderValue};
use swarm_graphql::{graphql_errors, GraphQLLayer, GraphQLRequest, GraphQLServiceError};
use swarm_http::{
    body::body_to_bytes, describe_status, extend_headers::ExtendHeadersLayer, HttpResponse,
    HttpService,
};
use tower::{util::BoxCloneService, Service, ServiceBuilder, ServiceExt};
use url::Url;

use crate::check::{check_name, status_passes, Checks};
use crate::SwarmResult;

/// Endpoint targeted when none is given
pub const DEFAULT_ENDPOINT: &str = "https://localhost";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Where queries go and the headers they carry.
///
/// Fixed at construction; there is no way to change it afterwards.
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct EndpointConfig {
    url: Url,
    headers: HeaderMap,
}

impl EndpointConfig {
    /// Targets `url` with JSON `Content-Type` and `Accept` headers
    pub fn new(url: Url) -> EndpointConfig {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        EndpointConfig { url, headers }
    }
}

type GraphQLClientService = BoxCloneService<GraphQLRequest, HttpResponse, GraphQLServiceError>;

/// Sends GraphQL documents to one endpoint and checks the response status
#[derive(Clone, Debug)]
pub struct LoadTestClient {
    config: EndpointConfig,
    service: GraphQLClientService,
}

impl LoadTestClient {
    /// Builds a client for `url` on top of an [`HttpService`]
    pub fn new(url: Url, http_service: HttpService) -> LoadTestClient {
        let config = EndpointConfig::new(url);
        let service = ServiceBuilder::new()
            .layer(GraphQLLayer::new(config.url().clone()))
            .layer(ExtendHeadersLayer::new(config.headers().clone()))
            .service(http_service)
            .boxed_clone();
        LoadTestClient { config, service }
    }

    /// The endpoint configuration this client was built with
    pub const fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// POSTs `{"query": <query>}` to the endpoint and returns the raw response.
    ///
    /// There is no retry. Failing to get any response at all is an error;
    /// any status code is a response.
    pub async fn send_query(&mut self, query: &str) -> SwarmResult<HttpResponse> {
        let started = Instant::now();
        let response = self
            .service
            .ready()
            .await?
            .call(GraphQLRequest::new(query))
            .await?;
        tracing::trace!(
            status = %describe_status(response.status()),
            elapsed = ?started.elapsed(),
            "received response"
        );
        Ok(response)
    }

    /// Sends `query` and records the check `"<name> status was 200"` in `checks`.
    ///
    /// A non-200 status only fails the check. Transport errors are returned
    /// and leave the check unrecorded.
    pub async fn test_query(
        &mut self,
        name: &str,
        query: &str,
        checks: &Checks,
    ) -> SwarmResult<()> {
        let response = self.send_query(query).await?;
        let status = response.status();
        let passed = status_passes(status);
        checks.record(&check_name(name), passed);
        if !passed {
            tracing::debug!(query = name, status = %describe_status(status), "status check failed");
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let mut body = response.into_body();
            let Ok(bytes) = body_to_bytes(&mut body).await;
            for error in graphql_errors(&bytes) {
                tracing::debug!(query = name, error = %error.message, "GraphQL error in response");
            }
        }
        Ok(())
    }
}
