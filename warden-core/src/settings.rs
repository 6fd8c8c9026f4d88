use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "warden:prod";

/// How slash commands are registered at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Register in the configured guild only.
    Dev,
    /// Register globally and clear guild-scoped commands.
    Production,
}

impl RunMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("dev") => Self::Dev,
            _ => Self::Production,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisSettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub key_prefix: String,
}

/// Process-level settings read from the environment. The bot token is read
/// separately so it never ends up in `Debug` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub guild_id: u64,
    pub run_mode: RunMode,
    pub data_dir: PathBuf,
    pub auto_run_migrations: bool,
    pub sweep_interval: Duration,
    pub redis: RedisSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let guild_id = lookup("DISCORD_GUILD_ID")
            .context("DISCORD_GUILD_ID is not set")?
            .trim()
            .parse::<u64>()
            .context("DISCORD_GUILD_ID is not a valid id")?;

        Ok(Self {
            guild_id,
            run_mode: RunMode::parse(lookup("RUN_MODE").as_deref()),
            data_dir: lookup("DATA_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map_or_else(|| PathBuf::from("data"), PathBuf::from),
            auto_run_migrations: parse_bool(lookup("AUTO_RUN_MIGRATIONS"), true),
            sweep_interval: Duration::from_secs(
                parse_u64(lookup("SWEEP_INTERVAL_SECONDS"), DEFAULT_SWEEP_INTERVAL_SECONDS).max(1),
            ),
            redis: RedisSettings {
                enabled: parse_bool(lookup("REDIS_ENABLED"), false),
                url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
                key_prefix: lookup("REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            },
        })
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

fn parse_u64(value: Option<String>, default: u64) -> u64 {
    match value {
        Some(value) => value.trim().parse::<u64>().unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{RunMode, Settings};

    fn settings(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let settings = settings(&[("DISCORD_GUILD_ID", "42")]).unwrap();

        assert_eq!(settings.guild_id, 42);
        assert_eq!(settings.run_mode, RunMode::Production);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert!(settings.auto_run_migrations);
        assert_eq!(settings.sweep_interval, Duration::from_secs(10));
        assert!(!settings.redis.enabled);
        assert_eq!(settings.redis.key_prefix, "warden:prod");
    }

    #[test]
    fn overrides_apply() {
        let settings = settings(&[
            ("DISCORD_GUILD_ID", " 42 "),
            ("RUN_MODE", "DEV"),
            ("DATA_DIR", "/var/lib/warden"),
            ("AUTO_RUN_MIGRATIONS", "off"),
            ("SWEEP_INTERVAL_SECONDS", "30"),
            ("REDIS_ENABLED", "yes"),
            ("REDIS_URL", "redis://localhost"),
        ])
        .unwrap();

        assert_eq!(settings.run_mode, RunMode::Dev);
        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/warden"));
        assert!(!settings.auto_run_migrations);
        assert_eq!(settings.sweep_interval, Duration::from_secs(30));
        assert!(settings.redis.enabled);
        assert_eq!(settings.redis.url.as_deref(), Some("redis://localhost"));
    }

    #[test]
    fn guild_id_is_required() {
        assert!(settings(&[]).is_err());
        assert!(settings(&[("DISCORD_GUILD_ID", "abc")]).is_err());
    }
}
