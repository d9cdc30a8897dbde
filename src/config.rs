use crate::error::{ConfigError, ErrorOutput};
use std::env;

/// Outbound proxy for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    Socks(String),
    Https(String),
}

/// Organization and project used when a tool call omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolDefaults {
    pub organization: Option<String>,
    pub project: Option<String>,
}

impl ToolDefaults {
    pub fn organization(&self, explicit: Option<String>) -> Result<String, ErrorOutput> {
        pick(explicit, self.organization.as_deref())
            .ok_or_else(|| ErrorOutput::not_specified("Organization", "SENTRY_ORG", "organization"))
    }

    pub fn project(&self, explicit: Option<String>) -> Result<String, ErrorOutput> {
        pick(explicit, self.project.as_deref())
            .ok_or_else(|| ErrorOutput::not_specified("Project", "SENTRY_PROJECT", "project"))
    }
}

fn pick(explicit: Option<String>, fallback: Option<&str>) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.map(str::to_string))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub auth_token: String,
    pub defaults: ToolDefaults,
    pub proxy: Option<ProxyConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base_url = match (get("SENTRY_URL"), get("SENTRY_HOST")) {
            (Some(url), _) => url,
            (None, Some(host)) => format!("https://{}", host),
            (None, None) => return Err(ConfigError::MissingUrl),
        };
        let auth_token = get("SENTRY_AUTH_TOKEN").ok_or(ConfigError::MissingAuthToken)?;
        let proxy = if let Some(url) = get("SOCKS_PROXY").or_else(|| get("socks_proxy")) {
            Some(ProxyConfig::Socks(url))
        } else {
            get("HTTPS_PROXY")
                .or_else(|| get("https_proxy"))
                .map(ProxyConfig::Https)
        };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            defaults: ToolDefaults {
                organization: get("SENTRY_ORG"),
                project: get("SENTRY_PROJECT"),
            },
            proxy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = Config::from_lookup(lookup(&[
            ("SENTRY_URL", "https://sentry.example.com/"),
            ("SENTRY_AUTH_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://sentry.example.com");
        assert_eq!(config.auth_token, "tok");
        assert_eq!(config.defaults, ToolDefaults::default());
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_missing_url() {
        let err = Config::from_lookup(lookup(&[("SENTRY_AUTH_TOKEN", "tok")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl));
        assert!(err.to_string().contains("SENTRY_URL"));
    }

    #[test]
    fn test_missing_token() {
        let err = Config::from_lookup(lookup(&[("SENTRY_URL", "https://sentry.io")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthToken));
        assert!(err.to_string().contains("auth-tokens"));
    }

    #[test]
    fn test_empty_token_is_missing() {
        let err = Config::from_lookup(lookup(&[
            ("SENTRY_URL", "https://sentry.io"),
            ("SENTRY_AUTH_TOKEN", ""),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthToken));
    }

    #[test]
    fn test_host_fallback() {
        let config = Config::from_lookup(lookup(&[
            ("SENTRY_HOST", "sentry.internal"),
            ("SENTRY_AUTH_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://sentry.internal");
    }

    #[test]
    fn test_defaults_and_proxy() {
        let config = Config::from_lookup(lookup(&[
            ("SENTRY_URL", "https://sentry.io"),
            ("SENTRY_AUTH_TOKEN", "tok"),
            ("SENTRY_ORG", "acme"),
            ("SENTRY_PROJECT", "web"),
            ("https_proxy", "http://proxy:3128"),
        ]))
        .unwrap();
        assert_eq!(config.defaults.organization.as_deref(), Some("acme"));
        assert_eq!(config.defaults.project.as_deref(), Some("web"));
        assert_eq!(
            config.proxy,
            Some(ProxyConfig::Https("http://proxy:3128".to_string()))
        );
    }

    #[test]
    fn test_socks_proxy_wins() {
        let config = Config::from_lookup(lookup(&[
            ("SENTRY_URL", "https://sentry.io"),
            ("SENTRY_AUTH_TOKEN", "tok"),
            ("SOCKS_PROXY", "socks5://127.0.0.1:1080"),
            ("HTTPS_PROXY", "http://proxy:3128"),
        ]))
        .unwrap();
        assert_eq!(
            config.proxy,
            Some(ProxyConfig::Socks("socks5://127.0.0.1:1080".to_string()))
        );
    }

    #[test]
    fn test_resolve_organization() {
        let defaults = ToolDefaults {
            organization: Some("acme".to_string()),
            project: None,
        };
        assert_eq!(defaults.organization(None).unwrap(), "acme");
        assert_eq!(defaults.organization(Some(String::new())).unwrap(), "acme");
        assert_eq!(
            defaults.organization(Some("other".to_string())).unwrap(),
            "other"
        );
        let err = defaults.project(None).unwrap_err();
        assert_eq!(err.error, "Project not specified");
        assert!(err.suggestion.contains("SENTRY_PROJECT"));
    }
}
