/// Sanctions with an active/inactive lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SanctionKind {
    Ban,
    Mute,
}

impl SanctionKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Ban => "bans",
            Self::Mute => "mutes",
        }
    }

    pub(crate) fn id_column(self) -> &'static str {
        match self {
            Self::Ban => "ban_id",
            Self::Mute => "mute_id",
        }
    }
}

/// Duration value marking a sanction that never expires.
pub const PERMANENT_DURATION: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sanction {
    pub id: String,
    pub kind: SanctionKind,
    pub user_id: u64,
    pub issuer_id: u64,
    pub reason: String,
    pub timestamp_ms: i64,
    pub duration_seconds: i64,
    pub ends_at_ms: i64,
    pub permanent: bool,
    pub active: bool,
}

impl Sanction {
    /// Whether the sweep should lift this sanction at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.active
            && !self.permanent
            && self.duration_seconds != PERMANENT_DURATION
            && self.ends_at_ms < now_ms
    }

    /// Milliseconds left before expiry, zero once elapsed.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.ends_at_ms - now_ms).max(0)
    }
}
