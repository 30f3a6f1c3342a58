use bon::Builder;
use serde_json::Value;
use std::fmt;

/// How the response body is decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
    Xml,
    Html,
}

impl OutputMode {
    /// Pick a mode from independent flags; json wins over xml, xml over html
    pub fn from_flags(json: bool, xml: bool, html: bool) -> Self {
        if json {
            OutputMode::Json
        } else if xml {
            OutputMode::Xml
        } else if html {
            OutputMode::Html
        } else {
            OutputMode::Text
        }
    }
}

/// Proxy as supplied by a caller or handler config, before validation
///
/// Only an exact `(host, port)` pair with a bare host and a numeric port is usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyArg(Vec<String>);

impl ProxyArg {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn host_port(host: impl Into<String>, port: u16) -> Self {
        Self(vec![host.into(), port.to_string()])
    }

    /// Arrays contribute one part per element, anything else is a single part
    pub fn from_value(value: &Value) -> Self {
        let part = |v: &Value| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        match value {
            Value::Array(items) => Self(items.iter().map(part).collect()),
            other => Self(vec![part(other)]),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// `http://host:port`, or `None` unless there are exactly two parts
    /// forming a bare host and a non-zero port
    pub fn to_url(&self) -> Option<String> {
        let [host, port] = self.0.as_slice() else {
            return None;
        };

        let host = host.trim();
        let bare_host = !host.is_empty()
            && !host
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'));
        let port = port.trim().parse::<u16>().ok().filter(|p| *p != 0)?;

        bare_host.then(|| format!("http://{}:{}", host, port))
    }
}

/// HTTP basic auth credentials
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One GET request through the fetch pipeline
///
/// Every field takes part in equality, so the whole request is the cache key.
///
/// ```
/// use showfetch::fetch::{FetchRequest, OutputMode};
///
/// let request = FetchRequest::builder()
///     .url("https://example.com/feed.rss")
///     .mode(OutputMode::Xml)
///     .user_agent("holo/1.0")
///     .build();
/// assert_eq!(request.mode, OutputMode::Xml);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Builder)]
pub struct FetchRequest {
    #[builder(into)]
    pub url: String,
    #[builder(default)]
    pub mode: OutputMode,
    pub proxy: Option<ProxyArg>,
    #[builder(into)]
    pub user_agent: Option<String>,
    pub auth: Option<BasicAuth>,
}

impl FetchRequest {
    /// Plain-text GET with no extras
    pub fn get(url: impl Into<String>) -> Self {
        Self::builder().url(url).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_output_mode_precedence() {
        let mode = OutputMode::from_flags;
        assert_eq!(mode(true, true, true), OutputMode::Json);
        assert_eq!(mode(false, true, true), OutputMode::Xml);
        assert_eq!(mode(false, false, true), OutputMode::Html);
        assert_eq!(mode(false, false, false), OutputMode::Text);
    }

    fn proxy_url(parts: &[&str]) -> Option<String> {
        ProxyArg::new(parts.iter().copied()).to_url()
    }

    #[test]
    fn test_proxy_pair_becomes_url() {
        let proxy = ProxyArg::host_port("10.0.0.1", 8080);
        assert_eq!(proxy.to_url().as_deref(), Some("http://10.0.0.1:8080"));
    }

    #[test]
    fn test_proxy_wrong_arity_is_unusable() {
        assert!(proxy_url(&["10.0.0.1"]).is_none());
        assert!(proxy_url(&["10.0.0.1", "8080", "extra"]).is_none());
        assert!(proxy_url(&[]).is_none());
    }

    #[test]
    fn test_proxy_pair_must_be_host_and_port() {
        assert!(proxy_url(&["proxy.local", "notaport"]).is_none());
        assert!(proxy_url(&["proxy.local", "70000"]).is_none());
        assert!(proxy_url(&["proxy.local", "0"]).is_none());
        assert!(proxy_url(&["", "8080"]).is_none());
        assert!(proxy_url(&["proxy local", "8080"]).is_none());
        assert!(proxy_url(&["http://proxy.local", "8080"]).is_none());
        assert_eq!(
            proxy_url(&[" proxy.local ", " 8080"]).as_deref(),
            Some("http://proxy.local:8080")
        );
    }

    #[test]
    fn test_proxy_from_value() {
        let proxy = ProxyArg::from_value(&json!(["proxy.local", 3128]));
        assert_eq!(proxy.parts(), ["proxy.local", "3128"]);
        assert_eq!(proxy.to_url().as_deref(), Some("http://proxy.local:3128"));

        let proxy = ProxyArg::from_value(&json!("proxy.local:3128"));
        assert_eq!(proxy.parts().len(), 1);
        assert!(proxy.to_url().is_none());
    }

    #[test]
    fn test_request_identity_covers_every_field() {
        let base = FetchRequest::get("https://example.com");
        let json = FetchRequest::builder()
            .url("https://example.com")
            .mode(OutputMode::Json)
            .build();
        let with_agent = FetchRequest::builder()
            .url("https://example.com")
            .user_agent("holo/1.0")
            .build();
        let with_auth = FetchRequest::builder()
            .url("https://example.com")
            .auth(BasicAuth::new("a", "b"))
            .build();

        let set: HashSet<_> = [
            base.clone(),
            base.clone(),
            json,
            with_agent,
            with_auth,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_basic_auth_debug_hides_password() {
        let auth = BasicAuth::new("holo", "hunter2");
        let printed = format!("{:?}", auth);
        assert!(printed.contains("holo"));
        assert!(!printed.contains("hunter2"));
    }
}
