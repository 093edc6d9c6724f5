use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SecretsFile {
    /// Domain keys by domain (or org marker) name.
    #[serde(default)]
    domains: BTreeMap<String, String>,
    /// Account-wide token, used for any domain without its own key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bundler_token: Option<String>,
    /// Token written by the forms tooling; read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    forms_bundler_token: Option<String>,
}

/// Keys for the bundle API, kept in `secrets.json` next to `config.toml`.
#[derive(Clone)]
pub struct KeyStore {
    path: PathBuf,
    inner: Arc<Mutex<SecretsFile>>,
}

impl KeyStore {
    pub fn new(path: PathBuf) -> Self {
        let inner = Self::load_from_disk(&path).unwrap_or_default();
        Self {
            path,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn load_from_disk(path: &PathBuf) -> Option<SecretsFile> {
        let txt = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&txt) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("ignoring unreadable {}: {e}", path.display());
                None
            }
        }
    }

    fn persist(&self, data: &SecretsFile) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let txt = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, txt)?;
        Ok(())
    }

    pub fn get_domain_key(&self, domain: &str) -> Option<String> {
        self.inner.lock().domains.get(domain).cloned()
    }

    pub fn set_domain_key(&self, domain: &str, key: &str) -> anyhow::Result<()> {
        let mut data = self.inner.lock();
        data.domains.insert(domain.to_string(), key.to_string());
        self.persist(&data)
    }

    pub fn clear_domain_key(&self, domain: &str) -> anyhow::Result<()> {
        let mut data = self.inner.lock();
        data.domains.remove(domain);
        self.persist(&data)
    }

    pub fn bundler_token(&self) -> Option<String> {
        let data = self.inner.lock();
        data.bundler_token
            .clone()
            .or_else(|| data.forms_bundler_token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn set_bundler_token(&self, token: &str) -> anyhow::Result<()> {
        let mut data = self.inner.lock();
        data.bundler_token = Some(token.to_string());
        self.persist(&data)
    }

    /// Key to send for `domain`: its own key first, then the bundler token, else empty.
    pub fn key_for(&self, domain: &str) -> String {
        self.get_domain_key(domain)
            .or_else(|| self.bundler_token())
            .unwrap_or_default()
    }
}
