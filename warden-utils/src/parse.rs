/// Channel and message ids pulled out of a message link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLink {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Parse `https://discord.com/channels/<guild>/<channel>/<message>` by taking
/// the last two non-empty path segments.
pub fn parse_message_link(raw: &str) -> Option<MessageLink> {
    let mut segments = raw.trim().split('/').filter(|segment| !segment.is_empty()).rev();

    let message_id = segments.next()?.parse::<u64>().ok()?;
    let channel_id = segments.next()?.parse::<u64>().ok()?;

    Some(MessageLink {
        channel_id,
        message_id,
    })
}

/// Strip all whitespace from a user-supplied emoji.
pub fn normalize_emoji(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// The suffix after `prefix` in a component custom id, e.g. the ticket id of
/// `ticket_close_<id>`.
pub fn custom_id_suffix<'a>(custom_id: &'a str, prefix: &str) -> Option<&'a str> {
    custom_id
        .strip_prefix(prefix)
        .filter(|suffix| !suffix.is_empty())
}
