use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_reset_sessions(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let reset = state
        .sessions
        .reset_inactive(config.session_retention())
        .await?;
    let purged = state.search_cache.purge_expired().await?;

    println!(
        "✓ Reset {} sessions idle for more than {} days",
        reset, config.sessions.retention_days
    );
    println!("✓ Purged {purged} expired search cache entries");

    Ok(())
}
