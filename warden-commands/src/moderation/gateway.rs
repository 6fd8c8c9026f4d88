use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use warden_utils::formatting::{audit_reason, message_url};
use warden_utils::guard::is_operable;
use warden_utils::permissions::member_standing;

/// A user as the executors see them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetUser {
    pub id: u64,
    pub tag: String,
    pub avatar_url: Option<String>,
}

impl TargetUser {
    pub fn from_user(user: &serenity::User) -> Self {
        Self {
            id: user.id.get(),
            tag: user.tag(),
            avatar_url: Some(user.face()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Embed content that does not depend on serenity builders, so test doubles
/// can inspect what would have been sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notice {
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_icon_url: Option<String>,
    pub fields: Vec<NoticeField>,
    pub footer: Option<String>,
    pub color: u32,
    pub timestamp_ms: Option<i64>,
}

impl Notice {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn to_embed(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new().color(self.color);

        if let Some(title) = &self.title {
            embed = embed.title(title);
        }

        if let Some(author) = &self.author {
            let mut author = serenity::CreateEmbedAuthor::new(author);
            if let Some(icon_url) = &self.author_icon_url {
                author = author.icon_url(icon_url);
            }
            embed = embed.author(author);
        }

        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }

        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
        }

        if let Some(timestamp) = self
            .timestamp_ms
            .and_then(|millis| serenity::Timestamp::from_millis(millis).ok())
        {
            embed = embed.timestamp(timestamp);
        }

        embed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildProfile {
    pub name: String,
    pub icon_url: Option<String>,
}

/// A target's presence in the guild, resolved for one capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberState {
    pub timed_out: bool,
    /// Whether the bot outranks the member and holds the capability.
    pub operable: bool,
}

/// Everything the executors and the expiry sweep need from the platform.
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    fn bot_user_id(&self) -> u64;

    async fn guild_profile(&self) -> GuildProfile;

    async fn resolve_user(&self, user_id: u64) -> TargetUser;

    async fn bot_has_permission(&self, permission: serenity::Permissions) -> anyhow::Result<bool>;

    /// `None` when the user is not a member.
    async fn member_state(
        &self,
        user_id: u64,
        permission: serenity::Permissions,
    ) -> anyhow::Result<Option<MemberState>>;

    async fn send_dm(&self, user_id: u64, notice: &Notice) -> anyhow::Result<()>;

    async fn ban(&self, user_id: u64, reason: &str) -> anyhow::Result<()>;

    async fn unban(&self, user_id: u64) -> anyhow::Result<()>;

    async fn kick(&self, user_id: u64, reason: &str) -> anyhow::Result<()>;

    /// Returns `false` when the role does not exist.
    async fn add_role(&self, user_id: u64, role_id: u64, reason: &str) -> anyhow::Result<bool>;

    /// Returns `false` when the role does not exist.
    async fn remove_role(&self, user_id: u64, role_id: u64, reason: &str) -> anyhow::Result<bool>;

    /// Time the member out until `until_unix_secs`, or clear the timeout.
    async fn set_timeout(
        &self,
        user_id: u64,
        until_unix_secs: Option<i64>,
        reason: &str,
    ) -> anyhow::Result<()>;

    /// Post a log entry and return its message URL.
    async fn post_log(&self, channel_id: u64, notice: &Notice) -> anyhow::Result<String>;

    /// Replace the embed of a previously posted log entry.
    async fn edit_log(&self, channel_id: u64, message_id: u64, notice: &Notice) -> anyhow::Result<()>;
}

pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
    bot_user_id: serenity::UserId,
}

impl SerenityGateway {
    pub fn new(ctx: &serenity::Context, guild_id: serenity::GuildId) -> Self {
        Self {
            http: ctx.http.clone(),
            guild_id,
            bot_user_id: ctx.cache.current_user().id,
        }
    }

    async fn has_role(&self, role_id: serenity::RoleId) -> anyhow::Result<bool> {
        let guild = self.guild_id.to_partial_guild(&self.http).await?;
        Ok(guild.roles.contains_key(&role_id))
    }
}

pub fn is_unknown_member_error(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
                || response.error.code == 10007
                || response.error.code == 10013
    )
}

#[async_trait]
impl ModerationGateway for SerenityGateway {
    fn bot_user_id(&self) -> u64 {
        self.bot_user_id.get()
    }

    async fn guild_profile(&self) -> GuildProfile {
        match self.guild_id.to_partial_guild(&self.http).await {
            Ok(guild) => GuildProfile {
                icon_url: guild.icon_url(),
                name: guild.name,
            },
            Err(_) => GuildProfile {
                name: format!("Server {}", self.guild_id.get()),
                icon_url: None,
            },
        }
    }

    async fn resolve_user(&self, user_id: u64) -> TargetUser {
        match self.http.get_user(serenity::UserId::new(user_id)).await {
            Ok(user) => TargetUser::from_user(&user),
            Err(_) => TargetUser {
                id: user_id,
                tag: user_id.to_string(),
                avatar_url: None,
            },
        }
    }

    async fn bot_has_permission(&self, permission: serenity::Permissions) -> anyhow::Result<bool> {
        let guild = self.guild_id.to_partial_guild(&self.http).await?;
        let bot = self.guild_id.member(&self.http, self.bot_user_id).await?;

        Ok(member_standing(&guild, &bot).has(permission))
    }

    async fn member_state(
        &self,
        user_id: u64,
        permission: serenity::Permissions,
    ) -> anyhow::Result<Option<MemberState>> {
        let member = match self
            .guild_id
            .member(&self.http, serenity::UserId::new(user_id))
            .await
        {
            Ok(member) => member,
            Err(source) if is_unknown_member_error(&source) => return Ok(None),
            Err(source) => return Err(source.into()),
        };

        let guild = self.guild_id.to_partial_guild(&self.http).await?;
        let bot = self.guild_id.member(&self.http, self.bot_user_id).await?;
        let bot_standing = member_standing(&guild, &bot);
        let target_standing = member_standing(&guild, &member);

        // Administrators cannot be timed out.
        let exempt = permission == serenity::Permissions::MODERATE_MEMBERS
            && target_standing
                .permissions
                .contains(serenity::Permissions::ADMINISTRATOR);

        let timed_out = member
            .communication_disabled_until
            .is_some_and(|until| until.unix_timestamp() > serenity::Timestamp::now().unix_timestamp());

        Ok(Some(MemberState {
            timed_out,
            operable: !exempt
                && is_operable(
                    bot_standing.highest_role_position,
                    target_standing.highest_role_position,
                    target_standing.is_owner,
                    bot_standing.has(permission),
                ),
        }))
    }

    async fn send_dm(&self, user_id: u64, notice: &Notice) -> anyhow::Result<()> {
        let channel = serenity::UserId::new(user_id)
            .create_dm_channel(&self.http)
            .await?;
        channel
            .id
            .send_message(&self.http, serenity::CreateMessage::new().embed(notice.to_embed()))
            .await?;

        Ok(())
    }

    async fn ban(&self, user_id: u64, reason: &str) -> anyhow::Result<()> {
        self.guild_id
            .ban_with_reason(&self.http, serenity::UserId::new(user_id), 0, audit_reason(reason))
            .await?;
        Ok(())
    }

    async fn unban(&self, user_id: u64) -> anyhow::Result<()> {
        self.guild_id
            .unban(&self.http, serenity::UserId::new(user_id))
            .await?;
        Ok(())
    }

    async fn kick(&self, user_id: u64, reason: &str) -> anyhow::Result<()> {
        self.guild_id
            .kick_with_reason(&self.http, serenity::UserId::new(user_id), audit_reason(reason))
            .await?;
        Ok(())
    }

    async fn add_role(&self, user_id: u64, role_id: u64, reason: &str) -> anyhow::Result<bool> {
        let role_id = serenity::RoleId::new(role_id);
        if !self.has_role(role_id).await? {
            return Ok(false);
        }

        self.http
            .add_member_role(
                self.guild_id,
                serenity::UserId::new(user_id),
                role_id,
                Some(audit_reason(reason)),
            )
            .await?;
        Ok(true)
    }

    async fn remove_role(&self, user_id: u64, role_id: u64, reason: &str) -> anyhow::Result<bool> {
        let role_id = serenity::RoleId::new(role_id);
        if !self.has_role(role_id).await? {
            return Ok(false);
        }

        self.http
            .remove_member_role(
                self.guild_id,
                serenity::UserId::new(user_id),
                role_id,
                Some(audit_reason(reason)),
            )
            .await?;
        Ok(true)
    }

    async fn set_timeout(
        &self,
        user_id: u64,
        until_unix_secs: Option<i64>,
        reason: &str,
    ) -> anyhow::Result<()> {
        let edit = match until_unix_secs {
            Some(until_unix) => {
                let until = serenity::Timestamp::from_unix_timestamp(until_unix)
                    .context("timeout end out of range")?;
                serenity::EditMember::new().disable_communication_until_datetime(until)
            }
            None => serenity::EditMember::new().enable_communication(),
        };

        self.guild_id
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                edit.audit_log_reason(audit_reason(reason)),
            )
            .await?;
        Ok(())
    }

    async fn post_log(&self, channel_id: u64, notice: &Notice) -> anyhow::Result<String> {
        let channel_id = serenity::ChannelId::new(channel_id);
        let message = channel_id
            .send_message(&self.http, serenity::CreateMessage::new().embed(notice.to_embed()))
            .await?;

        Ok(message_url(
            self.guild_id.get(),
            channel_id.get(),
            message.id.get(),
        ))
    }

    async fn edit_log(&self, channel_id: u64, message_id: u64, notice: &Notice) -> anyhow::Result<()> {
        serenity::ChannelId::new(channel_id)
            .edit_message(
                &self.http,
                serenity::MessageId::new(message_id),
                serenity::EditMessage::new().embed(notice.to_embed()),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use anyhow::bail;
    use async_trait::async_trait;
    use poise::serenity_prelude as serenity;

    use super::{GuildProfile, MemberState, ModerationGateway, Notice, TargetUser};

    /// Platform call recorded by [`FakeGateway`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Call {
        Dm(u64),
        Ban(u64),
        Unban(u64),
        Kick(u64),
        AddRole(u64, u64),
        RemoveRole(u64, u64),
        Timeout(u64, Option<i64>),
        Log(u64),
        EditLog(u64, u64),
    }

    /// In-memory gateway with scripted members and failures.
    pub struct FakeGateway {
        pub bot_id: u64,
        pub members: HashMap<u64, MemberState>,
        pub roles: HashSet<u64>,
        pub bot_permissions: serenity::Permissions,
        pub dm_closed: HashSet<u64>,
        pub calls: Mutex<Vec<Call>>,
        pub notices: Mutex<Vec<Notice>>,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self {
                bot_id: 1000,
                members: HashMap::new(),
                roles: HashSet::new(),
                bot_permissions: serenity::Permissions::ADMINISTRATOR,
                dm_closed: HashSet::new(),
                calls: Mutex::new(Vec::new()),
                notices: Mutex::new(Vec::new()),
            }
        }

        pub fn with_member(mut self, user_id: u64, state: MemberState) -> Self {
            self.members.insert(user_id, state);
            self
        }

        pub fn with_role(mut self, role_id: u64) -> Self {
            self.roles.insert(role_id);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ModerationGateway for FakeGateway {
        fn bot_user_id(&self) -> u64 {
            self.bot_id
        }

        async fn guild_profile(&self) -> GuildProfile {
            GuildProfile {
                name: "Test Guild".to_owned(),
                icon_url: None,
            }
        }

        async fn resolve_user(&self, user_id: u64) -> TargetUser {
            TargetUser {
                id: user_id,
                tag: format!("user{user_id}"),
                avatar_url: None,
            }
        }

        async fn bot_has_permission(&self, permission: serenity::Permissions) -> anyhow::Result<bool> {
            Ok(self.bot_permissions.contains(serenity::Permissions::ADMINISTRATOR)
                || self.bot_permissions.contains(permission))
        }

        async fn member_state(
            &self,
            user_id: u64,
            _permission: serenity::Permissions,
        ) -> anyhow::Result<Option<MemberState>> {
            Ok(self.members.get(&user_id).copied())
        }

        async fn send_dm(&self, user_id: u64, notice: &Notice) -> anyhow::Result<()> {
            if self.dm_closed.contains(&user_id) {
                bail!("cannot send messages to this user");
            }
            self.record(Call::Dm(user_id));
            self.notices.lock().unwrap().push(notice.clone());
            Ok(())
        }

        async fn ban(&self, user_id: u64, _reason: &str) -> anyhow::Result<()> {
            self.record(Call::Ban(user_id));
            Ok(())
        }

        async fn unban(&self, user_id: u64) -> anyhow::Result<()> {
            self.record(Call::Unban(user_id));
            Ok(())
        }

        async fn kick(&self, user_id: u64, _reason: &str) -> anyhow::Result<()> {
            self.record(Call::Kick(user_id));
            Ok(())
        }

        async fn add_role(&self, user_id: u64, role_id: u64, _reason: &str) -> anyhow::Result<bool> {
            if !self.roles.contains(&role_id) {
                return Ok(false);
            }
            self.record(Call::AddRole(user_id, role_id));
            Ok(true)
        }

        async fn remove_role(&self, user_id: u64, role_id: u64, _reason: &str) -> anyhow::Result<bool> {
            if !self.roles.contains(&role_id) {
                return Ok(false);
            }
            self.record(Call::RemoveRole(user_id, role_id));
            Ok(true)
        }

        async fn set_timeout(
            &self,
            user_id: u64,
            until_unix_secs: Option<i64>,
            _reason: &str,
        ) -> anyhow::Result<()> {
            self.record(Call::Timeout(user_id, until_unix_secs));
            Ok(())
        }

        async fn post_log(&self, channel_id: u64, notice: &Notice) -> anyhow::Result<String> {
            self.record(Call::Log(channel_id));
            self.notices.lock().unwrap().push(notice.clone());
            Ok(format!("https://discord.com/channels/1/{channel_id}/42"))
        }

        async fn edit_log(&self, channel_id: u64, message_id: u64, notice: &Notice) -> anyhow::Result<()> {
            self.record(Call::EditLog(channel_id, message_id));
            self.notices.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }
}
