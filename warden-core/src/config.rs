use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Per-guild configuration, read from `<data_dir>/<guild_id>.config.json`.
///
/// Ids may be written as JSON strings or numbers. Unset keys disable the
/// feature that reads them.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GuildConfig {
    #[serde(rename = "moderation_mutedRole", default, deserialize_with = "optional_id")]
    pub muted_role: Option<u64>,
    #[serde(rename = "moderation_modlogChannel", default, deserialize_with = "optional_id")]
    pub modlog_channel: Option<u64>,
    #[serde(rename = "tickets_ticketChannel", default, deserialize_with = "optional_id")]
    pub ticket_channel: Option<u64>,
    #[serde(rename = "verification_questions", default)]
    pub verification_questions: Vec<String>,
    #[serde(
        rename = "verification_verificationChannel",
        default,
        deserialize_with = "optional_id"
    )]
    pub verification_channel: Option<u64>,
    #[serde(rename = "verification_verifiedRole", default, deserialize_with = "optional_id")]
    pub verified_role: Option<u64>,
    #[serde(rename = "verification_welcomeChannel", default, deserialize_with = "optional_id")]
    pub verification_welcome_channel: Option<u64>,
    #[serde(rename = "verification_welcomeMessage", default)]
    pub verification_welcome_message: Option<Value>,
    #[serde(default)]
    pub welcome_message: Option<Value>,
    #[serde(default, deserialize_with = "optional_id")]
    pub welcome_channel: Option<u64>,
    #[serde(default)]
    pub goodbye_message: Option<Value>,
    #[serde(default, deserialize_with = "optional_id")]
    pub goodbye_channel: Option<u64>,
}

impl GuildConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("failed to parse guild config")
    }

    /// Read the config file, falling back to defaults when it does not exist.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Self::from_json(&raw)
                .with_context(|| format!("invalid guild config `{}`", path.display())),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(source)
                .with_context(|| format!("failed to read guild config `{}`", path.display())),
        }
    }
}

/// `<data_dir>/<guild_id>.config.json`
pub fn guild_config_path(data_dir: &Path, guild_id: u64) -> PathBuf {
    data_dir.join(format!("{guild_id}.config.json"))
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid snowflake `{text}`"))),
    }
}
