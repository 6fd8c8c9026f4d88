mod events;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use warden_commands::moderation::gateway::SerenityGateway;
use warden_commands::moderation::sweep::run_expiry_sweep;
use warden_core::config::guild_config_path;
use warden_core::{Data, Error, GuildConfig, RunMode, Settings};
use warden_database::{CacheService, Database, MIGRATOR};
use warden_utils::embed::failure_embed;
use warden_utils::time::now_unix_millis;

const TICKET_REOPEN_INTERVAL: Duration = Duration::from_secs(60);
const UNEXPECTED_ERROR: &str = "An unexpected error occurred while running this command.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN")?;
    let settings = Settings::from_env()?;
    let guild_id = serenity::GuildId::new(settings.guild_id);

    let config_path = guild_config_path(&settings.data_dir, settings.guild_id);
    let config = Arc::new(GuildConfig::load(&config_path).await?);
    info!(path = %config_path.display(), "Guild config loaded.");

    let pool = Database::open_guild_pool(&settings.data_dir, settings.guild_id).await?;
    info!(data_dir = %settings.data_dir.display(), "SQLite database opened.");

    let cache = build_cache(&settings).await;
    let db = Database::with_cache(pool, cache);

    if settings.auto_run_migrations {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let events = Arc::new(events::build_registry());
    info!(listeners = ?events, "Event listeners registered.");

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: warden_commands::commands(),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.events.dispatch(ctx, event, data).await;
                    Ok(())
                })
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Warden is online.");

                match settings.run_mode {
                    RunMode::Dev => {
                        poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                            .await?;
                        info!(guild_id = guild_id.get(), "Commands registered in guild.");
                    }
                    RunMode::Production => {
                        guild_id.set_commands(&ctx.http, Vec::new()).await?;
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        info!("Commands registered globally.");
                    }
                }

                let data = Data {
                    db,
                    config,
                    settings,
                    events,
                };

                spawn_expiry_sweep(ctx.clone(), data.clone(), guild_id);
                spawn_ticket_reopener(ctx.clone(), data.clone());

                Ok(data)
            })
        })
        .build();

    info!("Warden is connecting...");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}

async fn build_cache(settings: &Settings) -> CacheService {
    let redis = &settings.redis;
    let key_prefix = redis.key_prefix.clone();

    if !redis.enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(key_prefix);
    }

    let Some(redis_url) = &redis.url else {
        warn!(key_prefix = %key_prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
        return CacheService::disabled(key_prefix);
    };

    let cache = match CacheService::redis(redis_url, key_prefix.clone()) {
        Ok(cache) => cache,
        Err(err) => {
            warn!(?err, key_prefix = %key_prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
            return CacheService::disabled(key_prefix);
        }
    };

    match cache.ping().await {
        Ok(()) => info!(key_prefix = %key_prefix, "Redis cache enabled."),
        Err(err) => warn!(
            ?err,
            "Redis cache ping failed; cache operations will continue with fallback behavior."
        ),
    }

    cache
}

fn spawn_expiry_sweep(ctx: serenity::Context, data: Data, guild_id: serenity::GuildId) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(data.settings.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let gateway = SerenityGateway::new(&ctx, guild_id);
            run_expiry_sweep(&data.db, &gateway, &data.config, now_unix_millis()).await;
        }
    });
}

fn spawn_ticket_reopener(ctx: serenity::Context, data: Data) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICKET_REOPEN_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match events::tickets::reopen_archived_tickets(&ctx, &data.db).await {
                Ok(0) => {}
                Ok(reopened) => info!(reopened, "Reopened archived ticket threads."),
                Err(source) => warn!(?source, "failed to reopen archived ticket threads"),
            }
        }
    });
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(?error, command = %ctx.command().qualified_name, "command error");

            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .ephemeral(true)
                        .embed(failure_embed(UNEXPECTED_ERROR)),
                )
                .await;
        }
        other => {
            if let Err(source) = poise::builtins::on_error(other).await {
                error!(?source, "failed to handle framework error");
            }
        }
    }
}
