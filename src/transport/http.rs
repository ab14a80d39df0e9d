use crate::client::config::{ClientConfig, AUTH_TOKEN_HEADER, AUTH_USER_HEADER};
use crate::error::ErrorContext;
use crate::interceptors::{InterceptorPipeline, RequestContext, RequestFailure};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Proxy, Response};
use url::Url;

/// HTTP client bound to one call site.
///
/// Every request runs through the client's interceptors. Requests that fail
/// (non-2xx, transport error, timeout, malformed URL) resolve to `None`
/// after the interceptors have reported them.
pub struct HttpClient {
    client: reqwest::Client,
    config: ClientConfig,
    pipeline: InterceptorPipeline,
}

impl HttpClient {
    pub(crate) fn new(
        config: ClientConfig,
        proxy_url: Option<&str>,
        pipeline: InterceptorPipeline,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (AUTH_USER_HEADER, &config.auth_user),
            (AUTH_TOKEN_HEADER, &config.auth_token),
        ] {
            let (name, value) = header(name, value)?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers);

        if let Some(proxy_url) = proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid proxy URL",
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_details(e.to_string())
                        .with_source("http_client"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            config,
            pipeline,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of a path relative to the base URL.
    pub fn url_for(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// Send a request through the interceptors.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Option<Response> {
        let ctx = RequestContext::new(method.as_str(), path);
        self.pipeline
            .execute(&ctx, || async move {
                let url = self.url_for(path)?;
                let mut req = self.client.request(method, url);
                if let Some(body) = body {
                    req = req.json(body);
                }
                let resp = req.send().await?;
                Ok::<_, RequestFailure>(resp)
            })
            .await
    }

    pub async fn get(&self, path: &str) -> Option<Response> {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Option<Response> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Option<Response> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: &serde_json::Value) -> Option<Response> {
        self.send(Method::PATCH, path, Some(body)).await
    }
}

fn header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let invalid = |details: String| {
        Error::configuration_with_context(
            "credential is not a valid header value",
            ErrorContext::new()
                .with_field_path(name)
                .with_details(details)
                .with_source("http_client"),
        )
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}
