/// Audit-log reasons are capped by the platform.
pub const AUDIT_REASON_LIMIT: usize = 500;

pub fn user_mention(user_id: u64) -> String {
    format!("<@{user_id}>")
}

pub fn role_mention(role_id: u64) -> String {
    format!("<@&{role_id}>")
}

/// Discord relative timestamp markup, e.g. `<t:1700000000:R>`.
pub fn relative_timestamp(unix_secs: i64) -> String {
    format!("<t:{unix_secs}:R>")
}

pub fn message_url(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}

/// Author line of a case log entry.
pub fn case_heading(case_number: u64, kind_display: &str, user_tag: &str) -> String {
    format!("Case #{case_number} || {kind_display} || {user_tag}")
}

/// Truncate on a char boundary to at most `limit` bytes.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }

    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Reason passed to the platform audit log.
pub fn audit_reason(reason: &str) -> &str {
    truncate_chars(reason, AUDIT_REASON_LIMIT)
}
