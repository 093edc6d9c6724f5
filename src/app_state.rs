use std::path::{Path, PathBuf};

use crate::constants::DATA_DIR_ENV;
use crate::loader::config::LoaderSettings;
use crate::loader::secrets::KeyStore;
use crate::loader::DataLoader;

/// Short, log-safe stand-in for a key: `-` when empty, `set` when too short to show
/// any of it, otherwise the first six and last four characters.
pub fn mask_key_preview(key: &str) -> String {
    let k = key.trim();
    let n = k.chars().count();
    match n {
        0 => "-".to_string(),
        1..=9 => "set".to_string(),
        _ => {
            let head: String = k.chars().take(6).collect();
            let tail: String = k.chars().skip(n - 4).collect();
            format!("{head}******{tail}")
        }
    }
}

pub struct AppState {
    pub config_path: PathBuf,
    pub settings: LoaderSettings,
    pub keys: KeyStore,
    pub loader: DataLoader,
}

/// Resolves the data directory.
///
/// Layout:
/// - config.toml
/// - secrets.json
/// - data/cache (sled store)
pub fn data_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    // A ./user-data next to the binary keeps portable installs self-contained.
    let local = (|| -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let dir = exe.parent()?.join("user-data");
        dir.exists().then_some(dir)
    })();
    if let Some(dir) = local {
        return dir;
    }
    std::env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".rum-loader"))
        .unwrap_or_else(|| PathBuf::from("user-data"))
}

pub fn load_or_init_config(path: &Path) -> anyhow::Result<LoaderSettings> {
    if path.exists() {
        let txt = std::fs::read_to_string(path)?;
        let cfg: LoaderSettings = toml::from_str(&txt)?;
        return Ok(cfg);
    }
    let cfg = LoaderSettings::default();
    save_config(path, &cfg)?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &LoaderSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

pub fn build_state(data_dir: &Path) -> anyhow::Result<AppState> {
    let config_path = data_dir.join("config.toml");
    let settings = load_or_init_config(&config_path)?;
    let keys = KeyStore::new(data_dir.join("secrets.json"));
    let api_key = keys.key_for(&settings.domain);
    log::debug!(
        "loader for {} at {} (key {})",
        settings.domain,
        settings.endpoint,
        mask_key_preview(&api_key)
    );
    let loader =
        DataLoader::from_settings(&settings, &data_dir.join("data").join("cache"), &api_key)?;
    Ok(AppState {
        config_path,
        settings,
        keys,
        loader,
    })
}

impl AppState {
    /// Points the loader at another domain (or org marker), picking up its stored key.
    pub fn switch_domain(&mut self, domain: &str) {
        self.loader.set_domain(domain);
        self.loader.set_domain_key(&self.keys.key_for(domain));
    }
}
