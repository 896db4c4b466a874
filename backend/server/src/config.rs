use std::{
    collections::HashMap,
    env,
    fmt::Display,
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use graph::{AppCredentials, DEFAULT_GRAPH_URL};
use serde_json::Value;
use tracing::{info, warn};

pub const DEFAULT_LOCAL_CONFIG: &str = "config.local.json";

pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(3_000);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(60_000);
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Static page target used when nobody has logged in.
#[derive(Clone, Debug)]
pub struct TokenMode {
    pub page_id: String,
    pub page_access_token: String,
    pub ig_user_id: Option<String>,
    pub ig_access_token: String,
}

pub struct Config {
    pub port: u16,
    pub graph_url: String,
    pub graph_timeout: Duration,
    pub poll_interval: Duration,
    pub static_dir: PathBuf,
    pub app: Option<AppCredentials>,
    pub token_mode: Option<TokenMode>,
}

impl Config {
    /// Reads each key from the local JSON file, then the environment, then `/run/secrets`.
    pub fn load(local_path: &Path) -> Result<Self> {
        let local = read_local(local_path)?;

        Self::from_lookup(|key| {
            local
                .get(key)
                .cloned()
                .or_else(|| var(key))
                .or_else(|| read_secret(key))
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = match (lookup("FB_APP_ID"), lookup("FB_APP_SECRET")) {
            (Some(id), Some(secret)) => Some(AppCredentials { id, secret }),
            _ => {
                warn!("FB_APP_ID/FB_APP_SECRET not configured, login is disabled");
                None
            }
        };

        let token_mode = token_mode(&lookup);
        if let Some(mode) = &token_mode {
            info!("Token mode enabled for page {}", mode.page_id);
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", "3000")?,
            graph_url: try_load(&lookup, "GRAPH_API_URL", DEFAULT_GRAPH_URL)?,
            graph_timeout: Duration::from_millis(try_load(&lookup, "GRAPH_TIMEOUT_MS", "10000")?),
            poll_interval: clamp_interval(Duration::from_millis(try_load(
                &lookup,
                "POLL_INTERVAL_MS",
                "10000",
            )?)),
            static_dir: try_load(&lookup, "STATIC_DIR", "public")?,
            app,
            token_mode,
        })
    }
}

pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
}

fn token_mode<F>(lookup: &F) -> Option<TokenMode>
where
    F: Fn(&str) -> Option<String>,
{
    let page_id = lookup("FB_PAGE_ID")?;
    let page_token = lookup("FB_PAGE_ACCESS_TOKEN");
    let ig_token = lookup("IG_ACCESS_TOKEN");

    let (page_access_token, ig_access_token) = match (page_token, ig_token) {
        (Some(page), Some(ig)) => (page, ig),
        (Some(page), None) => (page.clone(), page),
        (None, Some(ig)) => (ig.clone(), ig),
        (None, None) => return None,
    };

    Some(TokenMode {
        page_id,
        page_access_token,
        ig_user_id: lookup("IG_USER_ID"),
        ig_access_token,
    })
}

fn read_local(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let raw = read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values: HashMap<String, Value> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    info!("Loaded local configuration from {}", path.display());

    Ok(values
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("Environment misconfigured: invalid {key}: {e}")
        })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
}
