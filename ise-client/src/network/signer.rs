/// Request signing for the assessment endpoint
///
/// The service authenticates the WebSocket upgrade through query parameters:
/// an HMAC-SHA256 signature over `host`, `date` and the request line, wrapped
/// in a base64 authorization header value.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::network::error::{NetworkError, NetworkResult};

type HmacSha256 = Hmac<Sha256>;

/// Default service host
pub const DEFAULT_HOST: &str = "ise-api.xfyun.cn";

/// Default service path
pub const DEFAULT_PATH: &str = "/v2/open-ise";

/// RFC-1123 date layout expected by the service
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Account credentials issued by the service console
///
/// Immutable once built. The secret is only ever used as the HMAC key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create a credential triple
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Application id, sent in the control frame
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Public API key, embedded in the authorization value
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Where the assessment service lives
///
/// # Example
/// ```
/// use ise_client::network::ServiceEndpoint;
///
/// let endpoint = ServiceEndpoint::default();
/// assert_eq!(endpoint.request_line(), "GET /v2/open-ise HTTP/1.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// URL scheme ("wss" in production, "ws" for local test servers)
    pub scheme: String,

    /// Host, optionally with port
    pub host: String,

    /// Request path
    pub path: String,
}

impl ServiceEndpoint {
    /// Create an endpoint on the given host with the default scheme and path
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set the URL scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the request path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// HTTP request line covered by the signature
    pub fn request_line(&self) -> String {
        format!("GET {} HTTP/1.1", self.path)
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            scheme: "wss".to_string(),
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}

/// Format a timestamp the way the signature expects it
pub fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

/// Build the signed connection URL for a fixed timestamp
///
/// Pure: the same inputs always produce the same URL.
///
/// # Errors
/// Returns `NetworkError::InvalidConfig` if the HMAC key is rejected
pub fn sign(
    credentials: &Credentials,
    endpoint: &ServiceEndpoint,
    timestamp: DateTime<Utc>,
) -> NetworkResult<String> {
    let date = format_date(timestamp);
    let string_to_sign = format!(
        "host: {}\ndate: {}\n{}",
        endpoint.host,
        date,
        endpoint.request_line()
    );

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
        .map_err(|e| NetworkError::InvalidConfig(format!("Invalid signing key: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let auth_header = format!(
        "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{}\"",
        credentials.api_key, signature
    );
    let authorization = STANDARD.encode(auth_header.as_bytes());

    Ok(format!(
        "{}://{}{}?authorization={}&date={}&host={}",
        endpoint.scheme,
        endpoint.host,
        endpoint.path,
        authorization,
        urlencoding::encode(&date),
        endpoint.host
    ))
}

/// Build the signed connection URL for the current time
pub fn sign_now(credentials: &Credentials, endpoint: &ServiceEndpoint) -> NetworkResult<String> {
    sign(credentials, endpoint, Utc::now())
}

/// Strip the query string so a signed URL can be logged
pub fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(fixed_time()), "Mon, 01 Jan 2024 00:00:00 GMT");
    }

    #[test]
    fn test_endpoint_builder() {
        let endpoint = ServiceEndpoint::new("127.0.0.1:9000")
            .with_scheme("ws")
            .with_path("/custom");

        assert_eq!(endpoint.scheme, "ws");
        assert_eq!(endpoint.host, "127.0.0.1:9000");
        assert_eq!(endpoint.request_line(), "GET /custom HTTP/1.1");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let creds = Credentials::new("app", "key", "secret");
        let endpoint = ServiceEndpoint::default();

        let a = sign(&creds, &endpoint, fixed_time()).unwrap();
        let b = sign(&creds, &endpoint, fixed_time()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let endpoint = ServiceEndpoint::default();
        let a = sign(&Credentials::new("app", "key", "one"), &endpoint, fixed_time()).unwrap();
        let b = sign(&Credentials::new("app", "key", "two"), &endpoint, fixed_time()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("wss://host/v2/open-ise?authorization=abc"),
            "wss://host/v2/open-ise"
        );
        assert_eq!(redact_url("ws://plain"), "ws://plain");
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials::new("app", "key", "top-secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
