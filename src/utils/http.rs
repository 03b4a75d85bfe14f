// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};

use crate::error::Result;
use crate::models::{FetchConfig, FetchPolicy};

/// Create a configured asynchronous HTTP client.
///
/// `insecure_tls` turns off certificate validation for every request made
/// through the returned client, so callers keep it separate from the
/// validating one.
pub fn create_async_client(config: &FetchConfig, insecure_tls: bool) -> Result<Client> {
    let mut default_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        default_headers.insert(header::ACCEPT_LANGUAGE, value);
    }
    default_headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8"),
    );

    let client = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(default_headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(insecure_tls)
        .build()?;
    Ok(client)
}

/// Attach a target's own headers to a request.
pub fn apply_policy(mut request: RequestBuilder, policy: &FetchPolicy) -> RequestBuilder {
    if let Some(referer) = &policy.referer {
        request = request.header(header::REFERER, referer.as_str());
    }
    for (name, value) in &policy.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

/// Whether a Content-Type header names something we can read as text.
///
/// A missing header is accepted; many small government servers omit it.
pub fn is_textual_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime.is_empty() || mime.starts_with("text/") {
        return true;
    }
    let subtype = mime.split('/').nth(1).unwrap_or("");
    ["html", "xml", "json"]
        .iter()
        .any(|kind| subtype == *kind || subtype.ends_with(&format!("+{kind}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual_content_type(None));
        assert!(is_textual_content_type(Some("text/html; charset=ISO-8859-1")));
        assert!(is_textual_content_type(Some("text/plain")));
        assert!(is_textual_content_type(Some("application/xhtml+xml")));
        assert!(is_textual_content_type(Some("application/json")));
    }

    #[test]
    fn test_binary_content_types() {
        assert!(!is_textual_content_type(Some("application/pdf")));
        assert!(!is_textual_content_type(Some("image/png")));
        assert!(!is_textual_content_type(Some("application/octet-stream")));
    }

    #[test]
    fn test_clients_build_with_both_tls_modes() {
        let config = FetchConfig::default();
        assert!(create_async_client(&config, false).is_ok());
        assert!(create_async_client(&config, true).is_ok());
    }
}
