use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::error::LoaderError;
use crate::constants::{
    DEFAULT_API_ENDPOINT, DEFAULT_DOMAIN, ORG_SCOPE_EXCEPTION, ORG_SCOPE_SUFFIX,
};

/// Which slice of the bundle API a loader talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Domain(String),
    Org(String),
}

impl Scope {
    /// Derives the scope from the value a user typed into the domain field.
    ///
    /// `<org>:all` selects org mode, except for the reserved `aem.live:all` which is an
    /// ordinary domain value.
    pub fn from_domain_input(domain: &str) -> Self {
        if domain.ends_with(ORG_SCOPE_SUFFIX) && domain != ORG_SCOPE_EXCEPTION {
            let org = domain.split(':').next().unwrap_or_default();
            return Self::Org(org.to_string());
        }
        Self::Domain(domain.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Domain(name) | Self::Org(name) => name,
        }
    }

    pub fn is_org(&self) -> bool {
        matches!(self, Self::Org(_))
    }
}

/// Request identity shared by every bucket of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub endpoint: Url,
    pub scope: Scope,
    pub api_key: String,
}

impl LoaderConfig {
    pub fn new(endpoint: &str, domain: &str, api_key: &str) -> Result<Self, LoaderError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            scope: Scope::from_domain_input(domain),
            api_key: api_key.to_string(),
        })
    }

    pub fn with_domain(&self, domain: &str) -> Self {
        Self {
            scope: Scope::from_domain_input(domain),
            ..self.clone()
        }
    }

    pub fn with_api_key(&self, api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..self.clone()
        }
    }

    pub fn with_endpoint(&self, endpoint: &str) -> Result<Self, LoaderError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            ..self.clone()
        })
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_API_ENDPOINT).expect("default endpoint"),
            scope: Scope::Domain(DEFAULT_DOMAIN.to_string()),
            api_key: String::new(),
        }
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, LoaderError> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| LoaderError::Configuration(format!("endpoint {endpoint:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(LoaderError::Configuration(format!(
            "endpoint {endpoint:?} cannot carry a path"
        )));
    }
    Ok(url)
}

/// Reduces whatever was typed or pasted into the domain field to a host name.
///
/// Values that do not parse as a host (org markers like `acme:all` among them) pass
/// through trimmed.
pub fn normalize_domain_input(input: &str) -> String {
    let t = input.trim();
    let candidate = if t.contains("://") {
        t.to_string()
    } else {
        format!("https://{t}")
    };
    match Url::parse(&candidate) {
        Ok(u) => match u.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => t.to_string(),
        },
        Err(_) => t.to_string(),
    }
}

/// On-disk settings (`config.toml` in the data directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Upper bound on in-flight bucket requests. 0 lifts the cap.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-request transport timeout. 0 leaves it to the connect timeout only.
    #[serde(default)]
    pub request_timeout_seconds: u64,
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_max_concurrency() -> usize {
    32
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            domain: default_domain(),
            max_concurrency: default_max_concurrency(),
            request_timeout_seconds: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_marker_selects_org_scope() {
        assert_eq!(
            Scope::from_domain_input("acme:all"),
            Scope::Org("acme".to_string())
        );
        assert!(Scope::from_domain_input("acme:all").is_org());
    }

    #[test]
    fn reserved_org_marker_stays_a_domain() {
        assert_eq!(
            Scope::from_domain_input("aem.live:all"),
            Scope::Domain("aem.live:all".to_string())
        );
    }

    #[test]
    fn plain_domain_stays_a_domain() {
        let scope = Scope::from_domain_input("www.example.com");
        assert_eq!(scope, Scope::Domain("www.example.com".to_string()));
        assert_eq!(scope.name(), "www.example.com");
    }

    #[test]
    fn endpoint_must_be_a_hierarchical_url() {
        assert!(matches!(
            LoaderConfig::new("not a url", "example.com", ""),
            Err(LoaderError::Configuration(_))
        ));
        assert!(matches!(
            LoaderConfig::new("mailto:someone@example.com", "example.com", ""),
            Err(LoaderError::Configuration(_))
        ));
        assert!(LoaderConfig::new("http://127.0.0.1:9000/api", "example.com", "").is_ok());
    }

    #[test]
    fn derived_configs_only_touch_one_field() {
        let base = LoaderConfig::new("https://rum.example", "www.example.com", "k1").unwrap();
        let keyed = base.with_api_key("k2");
        assert_eq!(keyed.scope, base.scope);
        assert_eq!(keyed.endpoint, base.endpoint);
        assert_eq!(keyed.api_key, "k2");

        let org = base.with_domain("acme:all");
        assert_eq!(org.scope, Scope::Org("acme".to_string()));
        assert_eq!(org.api_key, "k1");
    }

    #[test]
    fn normalize_domain_input_extracts_host() {
        assert_eq!(
            normalize_domain_input("https://www.example.com/some/page?x=1"),
            "www.example.com"
        );
        assert_eq!(normalize_domain_input("  www.example.com/path "), "www.example.com");
        assert_eq!(normalize_domain_input("acme:all"), "acme:all");
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let s: LoaderSettings = toml::from_str("domain = \"www.example.com\"").unwrap();
        assert_eq!(s.domain, "www.example.com");
        assert_eq!(s.endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(s.max_concurrency, 32);
        assert_eq!(s.request_timeout_seconds, 0);
    }
}
