pub mod members;
pub mod reaction_roles;
pub mod tickets;
pub mod verification;

use poise::serenity_prelude as serenity;

use warden_core::{EventKind, EventRegistry};

/// Wire every listener to its event. Order within a kind is dispatch order.
pub fn build_registry() -> EventRegistry {
    let mut registry = EventRegistry::new();

    registry
        .on(
            EventKind::Message,
            "ticket_relay_dm",
            vec![is_from_human, is_direct_message],
            tickets::on_direct_message,
        )
        .on(
            EventKind::Message,
            "ticket_relay_thread",
            vec![is_from_human, is_guild_message, tickets::is_not_staff_note],
            tickets::on_thread_message,
        )
        .on(
            EventKind::InteractionCreate,
            "ticket_close",
            vec![tickets::is_close_button],
            tickets::on_close_button,
        )
        .on(
            EventKind::InteractionCreate,
            "verification_begin",
            vec![verification::is_begin_button],
            verification::on_begin,
        )
        .on(
            EventKind::InteractionCreate,
            "verification_accept",
            vec![verification::is_accept_button],
            verification::on_accept,
        )
        .on(
            EventKind::InteractionCreate,
            "verification_deny",
            vec![verification::is_deny_button],
            verification::on_deny,
        )
        .on(
            EventKind::ReactionAdd,
            "reaction_role_add",
            vec![],
            reaction_roles::on_reaction_add,
        )
        .on(
            EventKind::ReactionRemove,
            "reaction_role_remove",
            vec![],
            reaction_roles::on_reaction_remove,
        )
        .on(
            EventKind::GuildMemberAddition,
            "welcome_message",
            vec![],
            members::on_member_join,
        )
        .on(
            EventKind::GuildMemberAddition,
            "mute_role_reapply",
            vec![],
            members::on_member_rejoin_muted,
        )
        .on(
            EventKind::GuildMemberRemoval,
            "goodbye_message",
            vec![],
            members::on_member_leave,
        );

    registry
}

fn is_from_human(event: &serenity::FullEvent) -> bool {
    match event {
        serenity::FullEvent::Message { new_message } => {
            !new_message.author.bot && new_message.webhook_id.is_none()
        }
        _ => false,
    }
}

fn is_direct_message(event: &serenity::FullEvent) -> bool {
    matches!(event, serenity::FullEvent::Message { new_message } if new_message.guild_id.is_none())
}

fn is_guild_message(event: &serenity::FullEvent) -> bool {
    matches!(event, serenity::FullEvent::Message { new_message } if new_message.guild_id.is_some())
}

/// The custom id of a button or select press, if the event is one.
pub(crate) fn component_custom_id(event: &serenity::FullEvent) -> Option<&str> {
    match event {
        serenity::FullEvent::InteractionCreate { interaction } => interaction
            .as_message_component()
            .map(|component| component.data.custom_id.as_str()),
        _ => None,
    }
}

/// Value of the text input `input_id` in a submitted modal.
pub(crate) fn modal_text_value(submit: &serenity::ModalInteraction, input_id: &str) -> Option<String> {
    submit
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            serenity::ActionRowComponent::InputText(input) if input.custom_id == input_id => {
                input.value.clone()
            }
            _ => None,
        })
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// A single-input reason modal.
pub(crate) fn reason_modal(
    custom_id: &str,
    title: &str,
    placeholder: &str,
    style: serenity::InputTextStyle,
) -> serenity::CreateModal {
    serenity::CreateModal::new(custom_id, title).components(vec![
        serenity::CreateActionRow::InputText(
            serenity::CreateInputText::new(style, "Reason", "reason")
                .placeholder(placeholder)
                .max_length(1000)
                .required(false),
        ),
    ])
}
