pub mod config;
pub mod events;
pub mod settings;

use std::sync::Arc;

use warden_database::Database;

pub use config::GuildConfig;
pub use events::{EventKind, EventRegistry};
pub use settings::{RunMode, Settings};

pub type Error = anyhow::Error;

/// Application state shared by every command and listener.
#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub config: Arc<GuildConfig>,
    pub settings: Settings,
    pub events: Arc<EventRegistry>,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, Error>;
