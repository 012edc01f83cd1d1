use std::pin::Pin;

use buildstructor::buildstructor;
use futures::Future;
use http_body_util::Full;
use reqwest::ClientBuilder;
use swarm_tower::service::replace_ready_service;
use tower::{util::BoxCloneService, Service, ServiceBuilder, ServiceExt};

use crate::{
    body::body_to_bytes, timeout::TimeoutLayer, HttpRequest, HttpResponse, HttpService,
    HttpServiceConfig, HttpServiceError, HttpServiceFactory, DEFAULT_TIMEOUT,
};

/// Constructs [`HttpService`]s that share one [`reqwest::Client`]
#[derive(Clone, Debug)]
pub struct ReqwestServiceFactory {
    config: HttpServiceConfig,
    client: reqwest::Client,
}

#[buildstructor]
impl ReqwestServiceFactory {
    /// Constructs a new [`ReqwestServiceFactory`], building a client from `config` when none is given
    #[builder]
    pub fn new(
        config: Option<HttpServiceConfig>,
        client: Option<reqwest::Client>,
    ) -> Result<ReqwestServiceFactory, HttpServiceError> {
        let config = config.unwrap_or_default();
        let client = match client {
            Some(client) => client,
            None => build_client(&config)?,
        };
        Ok(ReqwestServiceFactory { config, client })
    }
}

impl HttpServiceFactory for ReqwestServiceFactory {
    /// Creates a new [`HttpService`]
    fn create(&self) -> Result<HttpService, HttpServiceError> {
        let service = ReqwestService::builder()
            .config(self.config.clone())
            .client(self.client.clone())
            .build()?;
        Ok(service.boxed_clone())
    }
}

fn build_client(config: &HttpServiceConfig) -> Result<reqwest::Client, HttpServiceError> {
    let accept_invalid_certificates = config.accept_invalid_certificates().unwrap_or_default();
    let accept_invalid_hostnames = config.accept_invalid_hostnames().unwrap_or_default();
    if accept_invalid_certificates || accept_invalid_hostnames {
        tracing::warn!(
            accept_invalid_certificates,
            accept_invalid_hostnames,
            "TLS verification is relaxed for this run"
        );
    }
    ClientBuilder::new()
        .danger_accept_invalid_certs(accept_invalid_certificates)
        .danger_accept_invalid_hostnames(accept_invalid_hostnames)
        .build()
        .map_err(|err| HttpServiceError::Client(Box::new(err)))
}

/// A [`Service`] that wraps a [`reqwest`] client and uses [`http`] constructs for requests and responses
#[derive(Clone, Debug)]
pub struct ReqwestService {
    client: BoxCloneService<reqwest::Request, reqwest::Response, HttpServiceError>,
}

#[buildstructor]
impl ReqwestService {
    /// Constructs a new [`ReqwestService`]
    #[builder]
    pub fn new(
        config: Option<HttpServiceConfig>,
        client: Option<reqwest::Client>,
    ) -> Result<ReqwestService, HttpServiceError> {
        let config = config.unwrap_or_default();
        let client = match client {
            Some(client) => client,
            None => build_client(&config)?,
        };
        let client = ServiceBuilder::new()
            .layer(TimeoutLayer::new(
                (*config.timeout()).unwrap_or(DEFAULT_TIMEOUT),
            ))
            .service(client)
            .boxed_clone();
        Ok(ReqwestService { client })
    }
}

impl From<reqwest::Error> for HttpServiceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_body() {
            HttpServiceError::Body(value.into())
        } else if value.is_connect() {
            HttpServiceError::Connect(value.into())
        } else if value.is_timeout() {
            HttpServiceError::TimedOut(value.into())
        } else if value.is_decode() {
            HttpServiceError::Decode(value.into())
        } else if value.is_builder() {
            HttpServiceError::Client(value.into())
        } else {
            HttpServiceError::Unexpected(value.into())
        }
    }
}

impl Service<HttpRequest> for ReqwestService {
    type Response = HttpResponse;
    type Error = HttpServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.client.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        // https://docs.rs/tower/latest/tower/trait.Service.html#be-careful-when-cloning-inner-services
        let mut client = replace_ready_service::<_, reqwest::Request>(&mut self.client);
        let fut = async move {
            let mut req = req;
            let bytes = body_to_bytes(req.body_mut())
                .await
                .map_err(|err| HttpServiceError::Body(Box::new(err)))?;
            let body = reqwest::Body::from(bytes);
            let req = req.map(move |_| body);
            let req = reqwest::Request::try_from(req)?;
            let mut resp = http::Response::from(client.call(req).await?);
            let bytes = body_to_bytes(resp.body_mut())
                .await
                .map_err(|err| HttpServiceError::Body(Box::new(err)))?;
            Ok(resp.map(|_| Full::new(bytes)))
        };
        Box::pin(fut)
    }
}

impl From<ReqwestService> for HttpService {
    fn from(value: ReqwestService) -> Self {
        value.boxed_clone()
    }
}
