// streampinger-server/src/server.rs

use std::sync::Arc;

use tracing::{error, info, warn};

use streampinger_core::Config;
use streampinger_core::platforms::discord::{DiscordGatewayEvent, DiscordPlatform};

use crate::Args;
use crate::context::ServerContext;

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    info!(
        "Loaded {} streamer(s) and {} Discord server(s)",
        config.streamers.len(),
        config.discord.servers.len()
    );

    let mut discord = DiscordPlatform::new(config.discord.token.clone());
    discord.connect().await?;
    let discord = Arc::new(discord);

    let mut ctx = ServerContext::new(config, discord.clone())?;
    let mut poller_tasks = Vec::new();
    let mut wired = false;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    error!("Error waiting for Ctrl-C: {:?}", e);
                }
                info!("Ctrl-C detected; shutting down.");
                break;
            }
            evt = discord.next_event() => match evt {
                Some(DiscordGatewayEvent::Ready { guild_count }) => {
                    if wired {
                        info!("Discord session resumed ({} guild(s))", guild_count);
                        continue;
                    }
                    info!("Discord ready in {} guild(s); registering accounts", guild_count);
                    ctx.wire().await?;
                    wired = true;
                    poller_tasks = ctx.spawn_pollers();
                }
                Some(DiscordGatewayEvent::MemberJoined { guild_id, user_id, is_bot }) => {
                    for hub in ctx.hubs_for(guild_id) {
                        if let Err(e) = hub.on_member_joined(user_id, is_bot).await {
                            warn!("Could not welcome {} in guild {}: {}", user_id, guild_id, e);
                        }
                    }
                }
                None => {
                    warn!("Discord gateway closed; shutting down.");
                    break;
                }
            }
        }
    }

    discord.close();
    for task in poller_tasks {
        task.abort();
    }
    Ok(())
}
