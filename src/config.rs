use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const BOT_ID_VAR: &str = "BOT_ID";
pub const WEBHOOK_VAR: &str = "N8N_WEBHOOK";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Optional on-disk configuration. Every value can also come from the
/// environment, which takes precedence.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub webhook: WebhookSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiscordSection {
    pub bot_token: Option<String>,
    pub bot_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookSection {
    pub url: Option<String>,
}

/// Resolved startup configuration. Built once and never mutated.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub target_bot_id: u64,
    pub webhook_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("target_bot_id", &self.target_bot_id)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl Config {
    /// Load from `path` (or `config.toml` when present) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Self::read_file(p)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::read_file(&default)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn read_file(path: &Path) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Merge file values with environment lookups and validate the result.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, fallback: Option<String>| {
            env(key)
                .or(fallback)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = pick(TOKEN_VAR, file.discord.bot_token);
        let bot_id = pick(BOT_ID_VAR, file.discord.bot_id);
        let webhook = pick(WEBHOOK_VAR, file.webhook.url);

        let (bot_token, bot_id, webhook_url) = match (token, bot_id, webhook) {
            (Some(token), Some(bot_id), Some(webhook)) => (token, bot_id, webhook),
            (token, bot_id, webhook) => {
                let missing: Vec<&str> = [
                    (TOKEN_VAR, token.is_none()),
                    (BOT_ID_VAR, bot_id.is_none()),
                    (WEBHOOK_VAR, webhook.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
                anyhow::bail!(
                    "Missing configuration: set {} (environment, .env or config file)",
                    missing.join(", ")
                );
            }
        };

        let target_bot_id = bot_id
            .parse::<u64>()
            .with_context(|| format!("{} must be a numeric user id, got '{}'", BOT_ID_VAR, bot_id))?;

        let url = reqwest::Url::parse(&webhook_url)
            .with_context(|| format!("{} is not a valid URL: {}", WEBHOOK_VAR, webhook_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", WEBHOOK_VAR, webhook_url);
        }

        Ok(Self {
            bot_token,
            target_bot_id,
            webhook_url,
        })
    }
}
