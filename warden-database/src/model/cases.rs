use serde::{Deserialize, Serialize};

/// Punitive action recorded by a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    Ban,
    Kick,
    Mute,
    Warn,
    Unban,
    Unmute,
}

impl CaseKind {
    /// Stored `type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Mute => "mute",
            Self::Warn => "warn",
            Self::Unban => "unban",
            Self::Unmute => "unmute",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ban" => Some(Self::Ban),
            "kick" => Some(Self::Kick),
            "mute" => Some(Self::Mute),
            "warn" => Some(Self::Warn),
            "unban" => Some(Self::Unban),
            "unmute" => Some(Self::Unmute),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ban => "Ban",
            Self::Kick => "Kick",
            Self::Mute => "Mute",
            Self::Warn => "Warn",
            Self::Unban => "Unban",
            Self::Unmute => "Unmute",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Case {
    pub case_id: String,
    pub case_number: u64,
    pub user_id: u64,
    pub issuer_id: u64,
    pub reason: String,
    pub timestamp_ms: i64,
    pub kind: CaseKind,
    /// Seconds, `-1` for permanent.
    pub duration_seconds: Option<i64>,
    pub link: Option<String>,
}
