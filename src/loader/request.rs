use super::bucket::Bucket;
use super::config::{LoaderConfig, Scope};
use super::error::LoaderError;
use crate::constants::API_KEY_PARAM;

/// Resolves the request URL for one bucket. The URL doubles as the cache key.
pub fn build_url(cfg: &LoaderConfig, bucket: &Bucket) -> Result<String, LoaderError> {
    let mut u = cfg.endpoint.clone();
    if u.cannot_be_a_base() {
        return Err(LoaderError::Configuration(format!(
            "endpoint {} cannot carry a path",
            cfg.endpoint
        )));
    }

    let base = u.path().trim_end_matches('/').to_string();
    let scope: Vec<&str> = match &cfg.scope {
        Scope::Domain(domain) => vec!["bundles", domain.as_str()],
        Scope::Org(org) => vec!["orgs", org.as_str(), "bundles"],
    };
    let date = bucket.path_segments();
    let rel = scope
        .into_iter()
        .chain(date.iter().map(String::as_str))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    u.set_path(&format!("{base}/{rel}"));

    let kept: Vec<(String, String)> = u
        .query_pairs()
        .filter(|(k, _)| k != API_KEY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    u.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(API_KEY_PARAM, &cfg.api_key);
    u.set_fragment(None);

    Ok(u.to_string())
}
