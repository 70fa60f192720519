//! Thin HTTP wrapper around the LAYA backend.
//!
//! Resolves paths against the configured base URL, attaches the JSON content
//! type and the optional bearer token, and turns any non-2xx answer into
//! [`ClientError::Http`] carrying the raw body. It never retries.

use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{normalize_base_url, Config};
use crate::error::{ClientError, Result};

pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Form),
}

/// Everything about a request except where it goes.
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn post_json<T: Serialize + ?Sized>(body: &T) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            body: Some(RequestBody::Json(serde_json::to_value(body)?)),
            ..Self::default()
        })
    }

    pub fn multipart(form: Form) -> Self {
        Self {
            method: Method::POST,
            body: Some(RequestBody::Multipart(form)),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url),
            token: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = Self::new(&config.api_url());
        match config.api_token() {
            Some(token) => client.with_token(token),
            None => client,
        }
    }

    /// Point an existing client at another backend, e.g. from a command-line flag.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and decode the JSON body into `T`.
    pub async fn request<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        let text = self.request_text(path, options).await?;
        let value = serde_json::from_str(&text)?;
        Ok(value)
    }

    /// Send a request and return the body untouched. Upload endpoints may
    /// answer with anything, so nothing is decoded here.
    pub async fn request_text(&self, path: &str, options: RequestOptions) -> Result<String> {
        let url = self.url(path);
        let method = options.method.clone();
        tracing::debug!(%method, %url, "sending request");

        let mut builder = self.client.request(options.method, &url);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match options.body {
            // .json() also sets Content-Type: application/json
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Multipart(form)) => builder.multipart(form),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "request failed to complete");
            ClientError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%method, %url, status = status.as_u16(), "request rejected");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_with_single_slash() {
        let client = ApiClient::new("https://api.example.org/");
        assert_eq!(client.base_url(), "https://api.example.org");
        assert_eq!(client.url("/projects/"), "https://api.example.org/projects/");
        assert_eq!(client.url("chatlaya/search"), "https://api.example.org/chatlaya/search");
    }

    #[test]
    fn test_default_options_are_get() {
        let opts = RequestOptions::get().query("limit", 5).header("X-Trace", "1");
        assert_eq!(opts.method, Method::GET);
        assert_eq!(opts.query, vec![("limit".to_string(), "5".to_string())]);
        assert_eq!(opts.headers.len(), 1);
        assert!(opts.body.is_none());
    }

    #[test]
    fn test_post_json_sets_method_and_body() {
        let opts = RequestOptions::post_json(&serde_json::json!({"question": "hi"})).unwrap();
        assert_eq!(opts.method, Method::POST);
        assert!(matches!(opts.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_flag_overrides_configured_url() {
        let config = Config {
            api_url: Some("http://from-file:8000/".into()),
            token: Some("secret".into()),
            ..Config::default()
        };
        let client = ApiClient::from_config(&config).with_base_url("http://flag:9000/");
        assert_eq!(client.base_url(), "http://flag:9000");
        assert_eq!(client.token.as_deref(), Some("secret"));
    }
}
