/// Shared confirmation prompt helpers.
pub mod confirmation;
/// Duration grammar, parsing and formatting.
pub mod duration;
/// Generic embed builders shared across commands.
pub mod embed;
/// Shared formatting helpers (mentions, links, case headings).
pub mod formatting;
/// Moderation permission and role-hierarchy guard.
pub mod guard;
/// Shared pagination helper utilities.
pub mod pagination;
/// Pure parser helpers.
pub mod parse;
/// Configured message payloads (content and embeds as JSON).
pub mod payload;
/// Permission helper utilities.
pub mod permissions;
/// Reaction-role decisions.
pub mod reaction;
/// Placeholder substitution for configured messages.
pub mod template;
/// Shared time helpers.
pub mod time;
