use std::collections::HashMap;

use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use tracing::{debug, error};

use crate::Data;

/// Gateway events the bot listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    ReactionAdd,
    ReactionRemove,
    InteractionCreate,
    GuildMemberAddition,
    GuildMemberRemoval,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::Message,
        Self::ReactionAdd,
        Self::ReactionRemove,
        Self::InteractionCreate,
        Self::GuildMemberAddition,
        Self::GuildMemberRemoval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::ReactionAdd => "reaction_add",
            Self::ReactionRemove => "reaction_remove",
            Self::InteractionCreate => "interaction_create",
            Self::GuildMemberAddition => "guild_member_addition",
            Self::GuildMemberRemoval => "guild_member_removal",
        }
    }

    pub fn of(event: &serenity::FullEvent) -> Option<Self> {
        match event {
            serenity::FullEvent::Message { .. } => Some(Self::Message),
            serenity::FullEvent::ReactionAdd { .. } => Some(Self::ReactionAdd),
            serenity::FullEvent::ReactionRemove { .. } => Some(Self::ReactionRemove),
            serenity::FullEvent::InteractionCreate { .. } => Some(Self::InteractionCreate),
            serenity::FullEvent::GuildMemberAddition { .. } => Some(Self::GuildMemberAddition),
            serenity::FullEvent::GuildMemberRemoval { .. } => Some(Self::GuildMemberRemoval),
            _ => None,
        }
    }
}

/// Predicate that must hold for a listener to run.
pub type EventFilter = fn(&serenity::FullEvent) -> bool;

pub type EventHandler = for<'a> fn(
    &'a serenity::Context,
    &'a serenity::FullEvent,
    &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>>;

pub struct Listener {
    pub name: &'static str,
    pub filters: Vec<EventFilter>,
    pub handler: EventHandler,
}

impl Listener {
    pub fn accepts(&self, event: &serenity::FullEvent) -> bool {
        self.filters.iter().all(|filter| filter(event))
    }
}

/// Ordered listeners per event kind, built once at startup.
#[derive(Default)]
pub struct EventRegistry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let names = self.listener_names(kind);
            if !names.is_empty() {
                map.entry(&kind.name(), &names);
            }
        }
        map.finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &mut self,
        kind: EventKind,
        name: &'static str,
        filters: Vec<EventFilter>,
        handler: EventHandler,
    ) -> &mut Self {
        self.listeners.entry(kind).or_default().push(Listener {
            name,
            filters,
            handler,
        });
        self
    }

    pub fn listener_names(&self, kind: EventKind) -> Vec<&'static str> {
        self.listeners
            .get(&kind)
            .map(|listeners| listeners.iter().map(|listener| listener.name).collect())
            .unwrap_or_default()
    }

    /// Run every matching listener for `event` in registration order. A
    /// failing listener is logged and does not stop the rest.
    pub async fn dispatch(&self, ctx: &serenity::Context, event: &serenity::FullEvent, data: &Data) {
        let Some(kind) = EventKind::of(event) else {
            return;
        };
        let Some(listeners) = self.listeners.get(&kind) else {
            return;
        };

        for listener in listeners {
            if !listener.accepts(event) {
                continue;
            }

            debug!(listener = listener.name, event = kind.name(), "dispatching event");
            if let Err(source) = (listener.handler)(ctx, event, data).await {
                error!(?source, listener = listener.name, event = kind.name(), "event listener failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use poise::serenity_prelude as serenity;

    use super::{EventKind, EventRegistry};
    use crate::Data;

    fn noop<'a>(
        _ctx: &'a serenity::Context,
        _event: &'a serenity::FullEvent,
        _data: &'a Data,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn never(_event: &serenity::FullEvent) -> bool {
        false
    }

    #[test]
    fn listeners_keep_registration_order() {
        let mut registry = EventRegistry::new();
        registry
            .on(EventKind::Message, "ticket_relay_dm", vec![], noop)
            .on(EventKind::Message, "ticket_create", vec![never], noop)
            .on(EventKind::ReactionAdd, "reaction_role_add", vec![], noop);

        assert_eq!(
            registry.listener_names(EventKind::Message),
            vec!["ticket_relay_dm", "ticket_create"]
        );
        assert_eq!(
            registry.listener_names(EventKind::ReactionAdd),
            vec!["reaction_role_add"]
        );
        assert!(registry.listener_names(EventKind::GuildMemberRemoval).is_empty());
    }
}
