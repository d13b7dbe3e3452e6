use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_BIND: &str = "0.0.0.0:8443";
const DEFAULT_METRICS_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_PG_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5000;
// Well under the 3 s the platform waits for an interaction response.
const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_ROLE_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_ELEVATED_ROLE: &str = "PacePingBoss";

// PacePing configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct PacePingConfig {
    // Interactions endpoint listener.
    pub bind_addr: SocketAddr,
    // Metrics HTTP listener.
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    // Channel receiving announcements and pings.
    pub ping_channel_id: String,
    // Role allowed to run admin commands, besides owner and modo.
    pub elevated_role: String,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "pg" => Ok(Self::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: Option<String>,
    // Hex Ed25519 key used to verify interaction signatures.
    pub public_key: String,
    pub application_id: Option<String>,
    // Commands are registered on this guild only when set.
    pub guild_id: Option<String>,
    pub api_base: String,
    pub register_commands: bool,
    pub role_cache_ttl_secs: u64,
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .field("api_base", &self.api_base)
            .field("register_commands", &self.register_commands)
            .field("role_cache_ttl_secs", &self.role_cache_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PacePingConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    database_url: Option<String>,
    pg_max_connections: Option<u32>,
    ping_channel_id: Option<String>,
    elevated_role: Option<String>,
    discord_public_key: Option<String>,
    discord_application_id: Option<String>,
    discord_guild_id: Option<String>,
    discord_api_base: Option<String>,
    register_commands: Option<bool>,
    role_cache_ttl_secs: Option<u64>,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|value| value.parse::<T>().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    env_non_empty(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Build a connection URL from the `DB_PP*` variables, escaping credentials.
fn compose_database_url(
    host: &str,
    port: u16,
    database: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<String> {
    let mut url = reqwest::Url::parse(&format!("postgres://{host}:{port}"))
        .with_context(|| format!("invalid database host: {host}"))?;
    url.set_path(database);
    if let Some(user) = user
        && url.set_username(user).is_err()
    {
        bail!("database user cannot be set on url");
    }
    if password.is_some() && url.set_password(password).is_err() {
        bail!("database password cannot be set on url");
    }
    Ok(url.to_string())
}

fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("redacted"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

impl PostgresConfig {
    fn from_env() -> Result<Option<Self>> {
        let url = match env_non_empty("PACEPING_DATABASE_URL") {
            Some(url) => url,
            None => {
                // Credentials layout of the historical deployment.
                let Some(database) = env_non_empty("DB_PP") else {
                    return Ok(None);
                };
                let host = env_non_empty("DB_PP_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
                let port = env_parsed::<u16>("DB_PP_PORT").unwrap_or(DEFAULT_DB_PORT);
                compose_database_url(
                    &host,
                    port,
                    &database,
                    env_non_empty("DB_PP_USER").as_deref(),
                    env_non_empty("DB_PP_USER_PWD").as_deref(),
                )?
            }
        };
        Ok(Some(Self::with_url(url)))
    }

    fn with_url(url: String) -> Self {
        Self {
            url,
            max_connections: env_parsed::<u32>("PACEPING_PG_MAX_CONNECTIONS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_PG_MAX_CONNECTIONS),
            connect_timeout_ms: env_parsed::<u64>("PACEPING_PG_CONNECT_TIMEOUT_MS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_PG_CONNECT_TIMEOUT_MS),
            acquire_timeout_ms: env_parsed::<u64>("PACEPING_PG_ACQUIRE_TIMEOUT_MS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_PG_ACQUIRE_TIMEOUT_MS),
        }
    }
}

impl DiscordConfig {
    fn from_env() -> Self {
        Self {
            token: env_non_empty("DISCORD_TOKEN"),
            public_key: env_non_empty("DISCORD_PUBLIC_KEY").unwrap_or_default(),
            application_id: env_non_empty("DISCORD_APPLICATION_ID"),
            guild_id: env_non_empty("DISCORD_GUILD_ID"),
            api_base: env_non_empty("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            register_commands: env_flag("PACEPING_REGISTER_COMMANDS", true),
            role_cache_ttl_secs: env_parsed::<u64>("PACEPING_ROLE_CACHE_TTL_SECS")
                .unwrap_or(DEFAULT_ROLE_CACHE_TTL_SECS),
        }
    }
}

impl PacePingConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_non_empty("PACEPING_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse PACEPING_BIND")?;
        let metrics_bind = env_non_empty("PACEPING_METRICS_BIND")
            .unwrap_or_else(|| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse PACEPING_METRICS_BIND")?;
        let storage = match env_non_empty("PACEPING_STORAGE") {
            Some(value) => value.parse().with_context(|| "parse PACEPING_STORAGE")?,
            None => StorageBackend::Postgres,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres: PostgresConfig::from_env()?,
            ping_channel_id: env_non_empty("PING_CHANNEL_ID").unwrap_or_default(),
            elevated_role: env_non_empty("PACEPING_ELEVATED_ROLE")
                .unwrap_or_else(|| DEFAULT_ELEVATED_ROLE.to_string()),
            discord: DiscordConfig::from_env(),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("PACEPING_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read PACEPING_CONFIG: {path}"))?;
            let override_cfg: PacePingConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse paceping config yaml")?;
            config.apply(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, override_cfg: PacePingConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value.parse().with_context(|| "parse storage")?;
        }
        if let Some(value) = override_cfg.database_url {
            self.postgres = Some(PostgresConfig::with_url(value));
        }
        if let Some(value) = override_cfg.pg_max_connections
            && value > 0
            && let Some(pg) = self.postgres.as_mut()
        {
            pg.max_connections = value;
        }
        if let Some(value) = override_cfg.ping_channel_id {
            self.ping_channel_id = value;
        }
        if let Some(value) = override_cfg.elevated_role {
            self.elevated_role = value;
        }
        if let Some(value) = override_cfg.discord_public_key {
            self.discord.public_key = value;
        }
        if let Some(value) = override_cfg.discord_application_id {
            self.discord.application_id = Some(value);
        }
        if let Some(value) = override_cfg.discord_guild_id {
            self.discord.guild_id = Some(value);
        }
        if let Some(value) = override_cfg.discord_api_base {
            self.discord.api_base = value;
        }
        if let Some(value) = override_cfg.register_commands {
            self.discord.register_commands = value;
        }
        if let Some(value) = override_cfg.role_cache_ttl_secs {
            self.discord.role_cache_ttl_secs = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.ping_channel_id.trim().is_empty() {
            bail!("PING_CHANNEL_ID is required");
        }
        if self.discord.public_key.trim().is_empty() {
            bail!("DISCORD_PUBLIC_KEY is required");
        }
        Ok(())
    }
}
