//! Raw HTTP access to the catalog API.

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::CatalogConfig;

use super::error::CatalogError;
use super::params::QueryParams;

/// Something that can execute a GET against the catalog and return JSON.
///
/// The returned future owns everything it needs so it can be shared
/// between callers and outlive the borrow of `self`.
pub trait Transport: Send + Sync + 'static {
  fn get(&self, endpoint: &str, params: &QueryParams) -> BoxFuture<'static, Result<Value, CatalogError>>;
}

/// Catalog transport over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  base_url: String,
  api_key: String,
  language: Option<String>,
}

impl HttpTransport {
  pub fn new(config: &CatalogConfig, api_key: String) -> Result<Self, CatalogError> {
    Url::parse(&config.base_url).map_err(|e| {
      CatalogError::Validation(format!("invalid catalog url {}: {}", config.base_url, e))
    })?;

    let client = Client::builder()
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .connect_timeout(config.timeout())
      .build()
      .map_err(CatalogError::transport)?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      api_key,
      language: config.language.clone(),
    })
  }

  /// Full request URL: base + endpoint, with the API key, the configured
  /// language (unless the caller set one) and the request parameters.
  pub fn url(&self, endpoint: &str, params: &QueryParams) -> Result<Url, CatalogError> {
    let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))
      .map_err(|e| CatalogError::Validation(format!("invalid endpoint {}: {}", endpoint, e)))?;

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("api_key", &self.api_key);
      if let Some(language) = &self.language {
        if !params.contains("language") {
          query.append_pair("language", language);
        }
      }
      query.extend_pairs(params.iter());
    }

    Ok(url)
  }
}

impl Transport for HttpTransport {
  fn get(&self, endpoint: &str, params: &QueryParams) -> BoxFuture<'static, Result<Value, CatalogError>> {
    let client = self.client.clone();
    let url = self.url(endpoint, params);
    let endpoint = endpoint.to_string();

    async move {
      let url = url?;
      debug!(%endpoint, "catalog request");

      let response = client
        .get(url)
        .send()
        .await
        .map_err(CatalogError::transport)?;

      handle_response(response).await
    }
    .boxed()
  }
}

async fn handle_response(response: Response) -> Result<Value, CatalogError> {
  let status = response.status();
  let body = response.text().await.map_err(CatalogError::transport)?;

  if !status.is_success() {
    return Err(CatalogError::Fetch {
      status: Some(status.as_u16()),
      message: error_message(&body, status.canonical_reason()),
    });
  }

  serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
}

/// The catalog reports failures as `{"status_message": "..."}`; fall back
/// to the HTTP reason phrase when the body is anything else.
fn error_message(body: &str, reason: Option<&str>) -> String {
  serde_json::from_str::<Value>(body)
    .ok()
    .and_then(|v| v.get("status_message")?.as_str().map(String::from))
    .or_else(|| reason.map(String::from))
    .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn transport(language: Option<&str>) -> HttpTransport {
    let config = CatalogConfig {
      language: language.map(String::from),
      ..CatalogConfig::default()
    };
    HttpTransport::new(&config, "secret".to_string()).unwrap()
  }

  #[test]
  fn test_url_keeps_base_path_and_adds_key() {
    let url = transport(None)
      .url("/movie/42", &QueryParams::new().with("append_to_response", "videos,credits"))
      .unwrap();

    assert_eq!(url.path(), "/3/movie/42");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![
        ("api_key".to_string(), "secret".to_string()),
        ("append_to_response".to_string(), "videos,credits".to_string()),
      ]
    );
  }

  #[test]
  fn test_language_added_unless_overridden() {
    let t = transport(Some("en-US"));

    let url = t.url("/movie/popular", &QueryParams::page(1)).unwrap();
    assert!(url.query_pairs().any(|(k, v)| k == "language" && v == "en-US"));

    let url = t
      .url("/movie/popular", &QueryParams::page(1).with("language", "hi-IN"))
      .unwrap();
    let languages: Vec<String> = url
      .query_pairs()
      .filter(|(k, _)| k == "language")
      .map(|(_, v)| v.into_owned())
      .collect();
    assert_eq!(languages, vec!["hi-IN".to_string()]);
  }

  #[test]
  fn test_error_message_prefers_status_message() {
    let body = r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key."}"#;
    assert_eq!(
      error_message(body, Some("Unauthorized")),
      "Invalid API key: You must be granted a valid key."
    );
    assert_eq!(error_message("<html>", Some("Bad Gateway")), "Bad Gateway");
    assert_eq!(error_message("", None), "unknown error");
  }
}
