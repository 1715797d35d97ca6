// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and the maintenance task

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::crosspost::CrosspostDetector;
use crate::core::settings::SettingsService;
use crate::core::warnings::WarningService;
use crate::discord::moderation::crosspost_handler::handle_message_for_crossposts;
use crate::discord::moderation::interactions::handle_component;
use crate::discord::{Data, Error};
use crate::infra::crosspost::{SqliteIncidentLedger, SqliteMessageCache};
use crate::infra::database::open_pool;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::warnings::SqliteWarningStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            // A failed check must not take the event loop down with it.
            if let Err(e) = handle_message_for_crossposts(ctx, new_message, data).await {
                tracing::error!(
                    message_id = new_message.id.get(),
                    "Error checking message for crossposts: {}",
                    e
                );
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Some(component) = interaction.as_message_component() {
                if let Err(e) = handle_component(ctx, component, data).await {
                    tracing::error!(
                        custom_id = %component.data.custom_id,
                        "Error handling button: {}",
                        e
                    );
                }
            }
        }

        _ => {}
    }

    Ok(())
}

/// Sweep the message cache and lapsed confirmations forever.
fn spawn_maintenance(data: &Data) {
    let crosspost = Arc::clone(&data.crosspost);
    let warnings = Arc::clone(&data.warnings);
    let retention = chrono::Duration::hours(data.config.cache_retention_hours as i64);
    let every = std::time::Duration::from_secs(data.config.cache_sweep_minutes as u64 * 60);

    tokio::spawn(async move {
        loop {
            match crosspost.expire_cache(chrono::Utc::now(), retention).await {
                Ok(removed) => tracing::debug!(removed, "Message cache sweep finished"),
                Err(e) => tracing::error!("Message cache sweep failed: {}", e),
            }
            let lapsed = warnings.purge_expired_pending();
            if lapsed > 0 {
                tracing::debug!(lapsed, "Purged expired pending actions");
            }

            tokio::time::sleep(every).await;
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    let config = Arc::new(BotConfig::from_env()?);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = open_pool(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    let settings_store = SqliteSettingsStore::new(pool.clone());
    settings_store.migrate().await?;
    let warning_store = SqliteWarningStore::new(pool.clone());
    warning_store.migrate().await?;
    let message_cache = SqliteMessageCache::new(pool.clone());
    message_cache.migrate().await?;
    let incident_ledger = SqliteIncidentLedger::new(pool);
    incident_ledger.migrate().await?;

    let settings = Arc::new(SettingsService::new(settings_store));
    let warnings = Arc::new(WarningService::new(warning_store));
    let crosspost = Arc::new(CrosspostDetector::new(
        message_cache,
        incident_ledger,
        Arc::clone(&settings),
        Arc::clone(&warnings),
    ));

    // Create the data structure that will be shared across all commands
    let data = Data {
        crosspost,
        warnings,
        settings,
        config: Arc::clone(&config),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let dev_guild_id = config.dev_guild_id;
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::warnings::warn(),
                discord::commands::warnings::warn_user(),
                discord::commands::warnings::warnings(),
                discord::commands::warnings::mywarnings(),
                discord::commands::warnings::clearwarning(),
                discord::commands::warnings::clearwarnings(),
                discord::commands::crosspost::crosspost(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                match dev_guild_id {
                    // Guild registration shows up instantly; global can take up to an hour.
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }
                tracing::info!("Commands registered");

                spawn_maintenance(&data);

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
