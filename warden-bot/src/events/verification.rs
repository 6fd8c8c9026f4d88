use std::time::Duration;

use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_core::Data;
use warden_database::impls::applications::{
    create_application, decide_application, get_application,
};
use warden_database::impls::tickets::{NewTicket, create_ticket, find_open_ticket_for_user};
use warden_database::model::applications::{ApplicationAnswer, ApplicationResult};
use warden_utils::embed::{DEFAULT_EMBED_COLOR, FAILURE_EMBED_COLOR, SUCCESS_EMBED_COLOR};
use warden_utils::formatting::truncate_chars;
use warden_utils::parse::custom_id_suffix;

use crate::events::members::{guild_summary, render_configured_message, send_configured_message};
use crate::events::tickets::{close_modmail_ticket, close_ticket_thread};
use crate::events::{component_custom_id, modal_text_value, reason_modal};

pub const BEGIN_ID: &str = "verification_begin";
const CONTINUE_PREFIX: &str = "verification_continue_";
const ACCEPT_PREFIX: &str = "verification_accept_";
const DENY_PREFIX: &str = "verification_deny_";

const CONTINUE_TIMEOUT: Duration = Duration::from_secs(60 * 10);
const ANSWER_WINDOW: Duration = Duration::from_secs(60 * 60);
const DENY_MODAL_TIMEOUT: Duration = Duration::from_secs(60 * 10);

const DM_FAILED: &str =
    "I was unable to send you a DM. Please make sure you have DMs enabled and try again.";
const SUPERSEDED_TICKET: &str = "Verification application submitted";
const NO_REASON: &str = "No reason provided";

const FIELD_NAME_LIMIT: usize = 256;
const FIELD_VALUE_LIMIT: usize = 1024;

pub(crate) fn is_begin_button(event: &serenity::FullEvent) -> bool {
    component_custom_id(event) == Some(BEGIN_ID)
}

pub(crate) fn is_accept_button(event: &serenity::FullEvent) -> bool {
    component_custom_id(event).is_some_and(|id| id.starts_with(ACCEPT_PREFIX))
}

pub(crate) fn is_deny_button(event: &serenity::FullEvent) -> bool {
    component_custom_id(event).is_some_and(|id| id.starts_with(DENY_PREFIX))
}

/// Pair each configured question with the answer given for it.
pub fn pair_answers(questions: &[String], responses: Vec<String>) -> Vec<ApplicationAnswer> {
    questions
        .iter()
        .zip(responses)
        .map(|(question, answer)| ApplicationAnswer {
            question: question.clone(),
            answer,
        })
        .collect()
}

/// What staff see about an applicant.
pub struct Applicant {
    pub tag: String,
    pub user_id: u64,
    pub avatar_url: String,
    pub created_secs: i64,
    pub joined_secs: Option<i64>,
}

pub fn application_embed(applicant: &Applicant, answers: &[ApplicationAnswer]) -> serenity::CreateEmbed {
    let joined = applicant
        .joined_secs
        .map_or_else(|| "Unknown".to_owned(), |secs| format!("<t:{secs}:R>"));

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{}'s verification application", applicant.tag))
        .color(DEFAULT_EMBED_COLOR)
        .author(
            serenity::CreateEmbedAuthor::new(&applicant.tag).icon_url(&applicant.avatar_url),
        )
        .thumbnail(&applicant.avatar_url)
        .field("User", format!("<@{}>", applicant.user_id), true)
        .field("Account Created", format!("<t:{}:R>", applicant.created_secs), true)
        .field("Joined Server", joined, true)
        .field("\u{200b}", "\u{200b}", false);

    for answer in answers {
        let value = if answer.answer.trim().is_empty() {
            "*No answer*"
        } else {
            truncate_chars(&answer.answer, FIELD_VALUE_LIMIT)
        };
        embed = embed.field(truncate_chars(&answer.question, FIELD_NAME_LIMIT), value, true);
    }

    embed
}

fn decision_buttons(application_id: &str, disabled: bool) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{ACCEPT_PREFIX}{application_id}"))
            .label("Accept")
            .emoji('✅')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(disabled),
        serenity::CreateButton::new(format!("{DENY_PREFIX}{application_id}"))
            .label("Deny")
            .emoji('❌')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(disabled),
    ])]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision<'a> {
    Accepted { reviewer_id: u64 },
    Denied { reviewer_id: u64, reason: &'a str },
}

/// Restyle a submitted application embed once staff decided on it.
pub fn decided_embed(original: &serenity::Embed, decision: Decision<'_>) -> serenity::CreateEmbed {
    let title = original.title.clone().unwrap_or_default();
    let description = original.description.clone().unwrap_or_default();
    let embed = serenity::CreateEmbed::from(original.clone());

    match decision {
        Decision::Accepted { reviewer_id } => embed
            .color(SUCCESS_EMBED_COLOR)
            .title(format!("{title} - Accepted"))
            .description(format!("*Accepted by <@{reviewer_id}>*\n{description}")),
        Decision::Denied {
            reviewer_id,
            reason,
        } => embed
            .color(FAILURE_EMBED_COLOR)
            .title(format!("{title} - Denied"))
            .description(format!("**Denied by:** <@{reviewer_id}>\n**Reason:** {reason}")),
    }
}

fn question_embed(user: &serenity::User, index: usize, question: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("Question {}", index + 1))
        .description(question)
        .color(DEFAULT_EMBED_COLOR)
        .author(serenity::CreateEmbedAuthor::new(user.tag()).icon_url(user.face()))
        .timestamp(serenity::Timestamp::now())
}

async fn respond_ephemeral(
    ctx: &serenity::Context,
    press: &serenity::ComponentInteraction,
    content: &str,
) -> anyhow::Result<()> {
    press
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// DM the verification intro and run the questionnaire in the background.
pub fn on_begin<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::InteractionCreate { interaction } = event else {
            return Ok(());
        };
        let Some(press) = interaction.as_message_component() else {
            return Ok(());
        };
        let Some(guild_id) = press.guild_id else {
            return Ok(());
        };

        let application_id = Uuid::new_v4().to_string();
        let guild_name = guild_summary(ctx, guild_id)
            .await
            .map(|guild| guild.name)
            .unwrap_or_else(|_| "the server".to_owned());

        let intro = serenity::CreateMessage::new()
            .embed(
                serenity::CreateEmbed::new()
                    .title(format!("Verifying for {guild_name}"))
                    .description("To begin verification, press the button below. This process should take around ten minutes. The bot will message you a series of questions. Please answer them to the best of your abilities, and avoid one word or extremely vague responses.\n\n*More detailed responses will be processed faster.*")
                    .color(DEFAULT_EMBED_COLOR)
                    .author(serenity::CreateEmbedAuthor::new(press.user.tag()).icon_url(press.user.face()))
                    .timestamp(serenity::Timestamp::now()),
            )
            .components(vec![serenity::CreateActionRow::Buttons(vec![
                serenity::CreateButton::new(format!("{CONTINUE_PREFIX}{application_id}"))
                    .label("Continue")
                    .style(serenity::ButtonStyle::Success),
            ])]);

        let intro = match press.user.direct_message(&ctx.http, intro).await {
            Ok(message) => message,
            Err(source) => {
                warn!(?source, user_id = press.user.id.get(), "failed to DM verification intro");
                return respond_ephemeral(ctx, press, DM_FAILED).await;
            }
        };
        respond_ephemeral(ctx, press, "Check your DMs!").await?;

        let (ctx, data, user) = (ctx.clone(), data.clone(), press.user.clone());
        tokio::spawn(async move {
            let user_id = user.id.get();
            if let Err(source) =
                run_questionnaire(ctx, data, user, guild_id, intro, application_id).await
            {
                warn!(?source, user_id, "verification questionnaire failed");
            }
        });
        Ok(())
    })
}

async fn run_questionnaire(
    ctx: serenity::Context,
    data: Data,
    user: serenity::User,
    guild_id: serenity::GuildId,
    mut intro: serenity::Message,
    application_id: String,
) -> anyhow::Result<()> {
    let continue_id = format!("{CONTINUE_PREFIX}{application_id}");
    let press = intro
        .await_component_interaction(&ctx)
        .author_id(user.id)
        .filter(move |press| press.data.custom_id == continue_id)
        .timeout(CONTINUE_TIMEOUT)
        .await;

    let Some(press) = press else {
        intro
            .edit(&ctx.http, serenity::EditMessage::new().components(vec![]))
            .await?;
        return Ok(());
    };

    press
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new().components(vec![]),
            ),
        )
        .await?;

    let bot_user = ctx.cache.current_user().clone();
    if let Some(ticket) = find_open_ticket_for_user(&data.db, user.id.get()).await? {
        close_modmail_ticket(&ctx, &data.db, &ticket.ticket_id, &bot_user, SUPERSEDED_TICKET).await?;
    }

    let questions = data.config.verification_questions.clone();
    let deadline = Instant::now() + ANSWER_WINDOW;
    let mut responses = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        intro
            .channel_id
            .send_message(
                &ctx.http,
                serenity::CreateMessage::new().embed(question_embed(&user, index, question)),
            )
            .await?;

        let answer = serenity::MessageCollector::new(&ctx)
            .channel_id(intro.channel_id)
            .author_id(user.id)
            .timeout(deadline.saturating_duration_since(Instant::now()))
            .await;

        let Some(answer) = answer else {
            info!(user_id = user.id.get(), answered = index, "verification questionnaire timed out");
            return Ok(());
        };
        responses.push(answer.content);
    }

    submit_application(&ctx, &data, &user, guild_id, &application_id, pair_answers(&questions, responses)).await
}

async fn submit_application(
    ctx: &serenity::Context,
    data: &Data,
    user: &serenity::User,
    guild_id: serenity::GuildId,
    application_id: &str,
    answers: Vec<ApplicationAnswer>,
) -> anyhow::Result<()> {
    let Some(channel_id) = data.config.verification_channel else {
        warn!("verification submitted but verification_verificationChannel is not configured");
        return Ok(());
    };
    let channel_id = serenity::ChannelId::new(channel_id);

    let joined_secs = match guild_id.member(&ctx.http, user.id).await {
        Ok(member) => member.joined_at.map(|joined| joined.unix_timestamp()),
        Err(_) => None,
    };
    let applicant = Applicant {
        tag: user.tag(),
        user_id: user.id.get(),
        avatar_url: user.face(),
        created_secs: user.id.created_at().unix_timestamp(),
        joined_secs,
    };

    let posted = channel_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .embed(application_embed(&applicant, &answers))
                .components(decision_buttons(application_id, false)),
        )
        .await?;
    create_application(&data.db, application_id, user.id.get(), "verification", &answers).await?;

    let thread = channel_id
        .create_thread_from_message(
            &ctx.http,
            posted.id,
            serenity::CreateThread::new(format!("{}'s verification application", applicant.tag))
                .auto_archive_duration(serenity::AutoArchiveDuration::OneWeek),
        )
        .await;

    let submitted = serenity::CreateEmbed::new()
        .title("Verification Application Submitted!")
        .description("All done! Your verification application has been placed in a queue and will be reviewed by staff. You will be automatically notified once this is finished. If staff wish to ask you questions about your verification, you can communicate with them privately here.")
        .color(DEFAULT_EMBED_COLOR)
        .author(serenity::CreateEmbedAuthor::new(&applicant.tag).icon_url(&applicant.avatar_url))
        .thumbnail(&applicant.avatar_url)
        .timestamp(serenity::Timestamp::now());
    if let Err(source) = user
        .direct_message(&ctx.http, serenity::CreateMessage::new().embed(submitted))
        .await
    {
        warn!(?source, user_id = user.id.get(), "failed to DM verification receipt");
    }

    let thread = match thread {
        Ok(thread) => thread,
        Err(source) => {
            warn!(?source, application_id, "failed to open verification thread");
            return Ok(());
        }
    };

    create_ticket(
        &data.db,
        NewTicket {
            ticket_id: application_id,
            user_id: user.id.get(),
            channel_id: channel_id.get(),
            thread_id: thread.id.get(),
        },
    )
    .await?;

    info!(application_id, user_id = user.id.get(), "verification application submitted");
    Ok(())
}

const ALREADY_REVIEWED: &str = "This application has already been reviewed.";

/// Close the application's ticket if it is still open. The review stands
/// either way.
async fn close_review_ticket(
    ctx: &serenity::Context,
    data: &Data,
    application_id: &str,
    reason: &str,
) {
    let bot_user = ctx.cache.current_user().clone();
    match close_ticket_thread(ctx, &data.db, application_id, &bot_user, reason).await {
        Ok(Some(_)) => {}
        Ok(None) => debug!(application_id, "verification ticket was already closed"),
        Err(source) => warn!(?source, application_id, "failed to close verification ticket"),
    }
}

/// Reply and return `false` when the application was already decided.
async fn ensure_pending(
    ctx: &serenity::Context,
    data: &Data,
    press: &serenity::ComponentInteraction,
    application_id: &str,
) -> anyhow::Result<bool> {
    match get_application(&data.db, application_id).await? {
        Some(application) if application.result == ApplicationResult::Pending => Ok(true),
        Some(_) => {
            respond_ephemeral(ctx, press, ALREADY_REVIEWED).await?;
            Ok(false)
        }
        None => {
            respond_ephemeral(ctx, press, "This application no longer exists.").await?;
            Ok(false)
        }
    }
}

pub fn on_accept<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::InteractionCreate { interaction } = event else {
            return Ok(());
        };
        let Some(press) = interaction.as_message_component() else {
            return Ok(());
        };
        let (Some(guild_id), Some(application_id)) =
            (press.guild_id, custom_id_suffix(&press.data.custom_id, ACCEPT_PREFIX))
        else {
            return Ok(());
        };
        let Some(original) = press.message.embeds.first() else {
            return Ok(());
        };

        if !ensure_pending(ctx, data, press, application_id).await? {
            return Ok(());
        }
        let Some(user_id) =
            decide_application(&data.db, application_id, ApplicationResult::Approved).await?
        else {
            return respond_ephemeral(ctx, press, ALREADY_REVIEWED).await;
        };

        press
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(decided_embed(
                            original,
                            Decision::Accepted {
                                reviewer_id: press.user.id.get(),
                            },
                        ))
                        .components(decision_buttons(application_id, true)),
                ),
            )
            .await?;

        close_review_ticket(ctx, data, application_id, "Application accepted").await;
        info!(application_id, reviewer_id = press.user.id.get(), "verification accepted");

        let user = serenity::UserId::new(user_id).to_user(ctx).await?;

        if let Some(template) = &data.config.welcome_message {
            let dm = match guild_summary(ctx, guild_id).await {
                Ok(guild) => render_configured_message(template, &guild, &user),
                Err(source) => Err(source),
            };
            let sent = match dm {
                Ok(message) => user.direct_message(&ctx.http, message).await.map_err(Into::into),
                Err(source) => Err(source),
            };
            if let Err(source) = sent {
                warn!(?source, user_id = user.id.get(), "failed to DM welcome message");
            }
        }

        if let Some(role_id) = data.config.verified_role {
            ctx.http
                .add_member_role(
                    guild_id,
                    user.id,
                    serenity::RoleId::new(role_id),
                    Some("Verification accepted"),
                )
                .await?;
        }

        if let (Some(channel_id), Some(template)) = (
            data.config.verification_welcome_channel,
            &data.config.verification_welcome_message,
        ) {
            send_configured_message(ctx, guild_id, channel_id, template, &user).await?;
        }

        Ok(())
    })
}

pub fn on_deny<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::InteractionCreate { interaction } = event else {
            return Ok(());
        };
        let Some(press) = interaction.as_message_component() else {
            return Ok(());
        };
        let Some(application_id) = custom_id_suffix(&press.data.custom_id, DENY_PREFIX) else {
            return Ok(());
        };
        let Some(original) = press.message.embeds.first() else {
            return Ok(());
        };

        if !ensure_pending(ctx, data, press, application_id).await? {
            return Ok(());
        }

        let modal_id = format!("{DENY_PREFIX}{application_id}_{}", press.id);
        press
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Modal(reason_modal(
                    &modal_id,
                    "Deny Verification",
                    "Enter a reason for denying this application",
                    serenity::InputTextStyle::Paragraph,
                )),
            )
            .await?;

        let submit = serenity::ModalInteractionCollector::new(ctx)
            .author_id(press.user.id)
            .filter(move |submit| submit.data.custom_id == modal_id)
            .timeout(DENY_MODAL_TIMEOUT)
            .await;
        let Some(submit) = submit else {
            return Ok(());
        };

        let reason = modal_text_value(&submit, "reason").unwrap_or_else(|| NO_REASON.to_owned());
        let Some(user_id) =
            decide_application(&data.db, application_id, ApplicationResult::Denied).await?
        else {
            submit
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(ALREADY_REVIEWED)
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        };

        submit
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(decided_embed(
                            original,
                            Decision::Denied {
                                reviewer_id: press.user.id.get(),
                                reason: &reason,
                            },
                        ))
                        .components(decision_buttons(application_id, true)),
                ),
            )
            .await?;

        close_review_ticket(ctx, data, application_id, &reason).await;
        info!(application_id, reviewer_id = press.user.id.get(), "verification denied");

        let notice = serenity::CreateEmbed::new()
            .title("🔒 Verification Closed")
            .description("Your verification application was denied.")
            .color(DEFAULT_EMBED_COLOR)
            .field("Reason", &reason, false)
            .timestamp(serenity::Timestamp::now());
        let dm = serenity::UserId::new(user_id)
            .create_dm_channel(&ctx.http)
            .await;
        let sent = match dm {
            Ok(dm) => dm
                .send_message(&ctx.http, serenity::CreateMessage::new().embed(notice))
                .await
                .map(|_| ()),
            Err(source) => Err(source),
        };
        if let Err(source) = sent {
            warn!(?source, application_id, "failed to DM verification denial");
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;
    use serde_json::json;

    use super::{Applicant, Decision, application_embed, decided_embed, pair_answers};

    fn applicant() -> Applicant {
        Applicant {
            tag: "ada".to_owned(),
            user_id: 77,
            avatar_url: "https://cdn.example/ada.png".to_owned(),
            created_secs: 1_600_000_000,
            joined_secs: None,
        }
    }

    #[test]
    fn answers_pair_with_their_questions() {
        let questions = vec!["Why join?".to_owned(), "Age?".to_owned()];
        let answers = pair_answers(&questions, vec!["Friends".to_owned(), "30".to_owned()]);

        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].question, "Age?");
        assert_eq!(answers[1].answer, "30");
    }

    #[test]
    fn application_embed_lists_profile_then_answers() {
        let answers = pair_answers(&["Why join?".to_owned()], vec![String::new()]);
        let embed = serde_json::to_value(application_embed(&applicant(), &answers)).unwrap();

        assert_eq!(embed["title"], "ada's verification application");
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0]["value"], "<@77>");
        assert_eq!(fields[2]["value"], "Unknown");
        assert_eq!(fields[4]["name"], "Why join?");
        assert_eq!(fields[4]["value"], "*No answer*");
    }

    #[test]
    fn decisions_retitle_the_application() {
        let original: serenity::Embed =
            serde_json::from_value(json!({ "title": "ada's verification application" })).unwrap();

        let accepted = serde_json::to_value(decided_embed(
            &original,
            Decision::Accepted { reviewer_id: 5 },
        ))
        .unwrap();
        assert_eq!(accepted["title"], "ada's verification application - Accepted");
        assert_eq!(accepted["description"], "*Accepted by <@5>*\n");

        let denied = serde_json::to_value(decided_embed(
            &original,
            Decision::Denied {
                reviewer_id: 5,
                reason: "Too vague",
            },
        ))
        .unwrap();
        assert_eq!(
            denied["description"],
            "**Denied by:** <@5>\n**Reason:** Too vague"
        );
    }
}
