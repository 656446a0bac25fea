//! reqwest-backed client handle and the transport that builds it

use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use reqwest::{Body, Method, Response};
use tracing::debug;

use crate::{
    config::HttpConfig,
    error::{HttpError, Result},
    proxy::ProxyServer,
    tls::TrustContext,
    transport::{ClientHandle, Transport},
};

/// Request surface of a shared client
#[async_trait]
pub trait HttpClientTrait: Send + Sync {
    /// Execute a GET request
    async fn get(&self, url: &str) -> Result<Response>;

    /// Execute a POST request
    async fn post(&self, url: &str, body: Body) -> Result<Response>;

    /// Execute a PUT request
    async fn put(&self, url: &str, body: Body) -> Result<Response>;

    /// Execute a DELETE request
    async fn delete(&self, url: &str) -> Result<Response>;

    /// Execute a custom HTTP request
    async fn request(&self, method: Method, url: &str, body: Option<Body>) -> Result<Response>;
}

/// Production HTTP client handed out by the manager
///
/// Proxy and trust settings are fixed when the client is built. Once closed,
/// every request fails with [`HttpError::Closed`].
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpConfig,
    proxy: Option<ProxyServer>,
    closed: AtomicBool,
}

impl HttpClient {
    /// Build a client for the given proxy and trust context
    pub fn new(config: HttpConfig, proxy: Option<&ProxyServer>, trust: &TrustContext) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(if config.max_redirects > 0 {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            });

        // The host's settings are authoritative; never fall back to HTTP_PROXY.
        builder = match proxy {
            Some(proxy) => builder.proxy(proxy.to_reqwest()?),
            None => builder.no_proxy(),
        };

        if config.pool_enabled {
            builder = builder.pool_idle_timeout(config.pool_idle_timeout);
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        if let TrustContext::Permissive(tls) = trust {
            builder = builder.use_preconfigured_tls(tls.as_ref().clone());
        }

        let inner = builder.build().map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            config,
            proxy: proxy.cloned(),
            closed: AtomicBool::new(false),
        })
    }

    /// Get underlying reqwest client (for advanced usage)
    pub fn inner(&self) -> Result<&reqwest::Client> {
        if self.is_closed() {
            return Err(HttpError::Closed);
        }
        Ok(&self.inner)
    }

    /// Get configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Proxy this client was built with
    pub fn proxy(&self) -> Option<&ProxyServer> {
        self.proxy.as_ref()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("proxy", &self.proxy)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl ClientHandle for HttpClient {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Pooled connections go away when the last clone of `inner` is dropped.
    fn close(&self) -> io::Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closed HTTP client");
        }
        Ok(())
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get(&self, url: &str) -> Result<Response> {
        debug!("HTTP GET: {}", url);
        self.request(Method::GET, url, None).await
    }

    async fn post(&self, url: &str, body: Body) -> Result<Response> {
        debug!("HTTP POST: {}", url);
        self.request(Method::POST, url, Some(body)).await
    }

    async fn put(&self, url: &str, body: Body) -> Result<Response> {
        debug!("HTTP PUT: {}", url);
        self.request(Method::PUT, url, Some(body)).await
    }

    async fn delete(&self, url: &str) -> Result<Response> {
        debug!("HTTP DELETE: {}", url);
        self.request(Method::DELETE, url, None).await
    }

    async fn request(&self, method: Method, url: &str, body: Option<Body>) -> Result<Response> {
        let client = self.inner()?;
        let url = url
            .parse::<url::Url>()
            .map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let mut request = client.request(method, url);

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(HttpError::RequestFailed)?;

        if !response.status().is_success() {
            return Err(HttpError::HttpStatus {
                status: response.status(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string()),
            });
        }

        Ok(response)
    }
}

/// Builds [`HttpClient`]s from a fixed [`HttpConfig`]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    config: HttpConfig,
}

impl ReqwestTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    type Handle = HttpClient;

    fn build(&self, proxy: Option<&ProxyServer>, trust: &TrustContext) -> Result<HttpClient> {
        HttpClient::new(self.config.clone(), proxy, trust)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxySettings;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_string, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn direct_client() -> HttpClient {
        HttpClient::new(HttpConfig::default(), None, &TrustContext::Platform).unwrap()
    }

    #[test]
    fn test_client_creation_with_config() {
        let config = HttpConfig {
            timeout: Duration::from_secs(10),
            ..Default::default()
        };

        let client = HttpClient::new(config, None, &TrustContext::Platform).unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(10));
        assert!(client.proxy().is_none());
        assert!(!client.is_closed());
    }

    #[test]
    fn test_client_with_proxy() {
        let settings = ProxySettings::new("proxy.example.com", 8080).with_credentials("u", "p");
        let proxy = ProxyServer::new(&settings, Some("p".into()));

        let client = HttpClient::new(HttpConfig::default(), Some(&proxy), &TrustContext::Platform);
        assert_eq!(client.unwrap().proxy().unwrap().port, 8080);
    }

    #[test]
    fn test_client_with_permissive_trust() {
        let trust = TrustContext::resolve(true).unwrap();
        assert!(HttpClient::new(HttpConfig::default(), None, &trust).is_ok());
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = direct_client();
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert!(matches!(client.inner(), Err(HttpError::Closed)));
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let client = direct_client();
        let result = client.get("not a url").await;
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_get_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = direct_client();
        let response = client.get(&format!("{}/status", server.uri())).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/job/build"))
            .and(body_string("{\"delay\":0}"))
            .respond_with(ResponseTemplate::new(201).set_body_string("queued"))
            .expect(1)
            .mount(&server)
            .await;

        let client = direct_client();
        let response = client
            .post(&format!("{}/job/build", server.uri()), Body::from("{\"delay\":0}"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        assert_eq!(response.text().await.unwrap(), "queued");
    }

    #[tokio::test]
    async fn test_put_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/job/config.xml"))
            .and(body_string("<project/>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = direct_client();
        let result = client
            .put(&format!("{}/job/config.xml", server.uri()), Body::from("<project/>"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = direct_client();
        let result = client.delete(&format!("{}/job/1", server.uri())).await;
        match result {
            Err(HttpError::HttpStatus { status, message }) => {
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_client_refuses_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = direct_client();
        client.close().unwrap();
        let result = client.get(&server.uri()).await;
        assert!(matches!(result, Err(HttpError::Closed)));
    }

    #[tokio::test]
    async fn test_requests_are_routed_through_proxy() {
        let proxy_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/upstream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
            .expect(1)
            .mount(&proxy_server)
            .await;

        let address = proxy_server.address();
        let settings = ProxySettings::new(address.ip().to_string(), address.port());
        let proxy = ProxyServer::new(&settings, None);
        let client = HttpClient::new(HttpConfig::default(), Some(&proxy), &TrustContext::Platform).unwrap();

        let response = client.get("http://upstream.invalid/upstream").await.unwrap();
        assert_eq!(response.text().await.unwrap(), "via proxy");
    }

    #[tokio::test]
    async fn test_no_proxy_hosts_bypass_proxy() {
        let target = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("direct"))
            .mount(&target)
            .await;

        // Nothing listens on the discard port, so a proxied request would fail.
        let settings = ProxySettings::new("127.0.0.1", 9)
            .with_no_proxy_hosts([target.address().ip().to_string()]);
        let proxy = ProxyServer::new(&settings, None);
        let client = HttpClient::new(HttpConfig::default(), Some(&proxy), &TrustContext::Platform).unwrap();

        let response = client.get(&target.uri()).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "direct");
    }

    #[test]
    fn test_transport_builds_open_handles() {
        let transport = ReqwestTransport::new(HttpConfig::default().with_user_agent("host/2"));
        let handle = transport.build(None, &TrustContext::Platform).unwrap();
        assert_eq!(handle.config().user_agent, "host/2");
        assert!(!handle.is_closed());
    }
}
