use crate::api::validate_user_id;
use crate::config::Config;
use crate::domain::UserContext;
use crate::state::SharedState;

pub async fn cmd_refresh_user(config: &Config, user: &str) -> anyhow::Result<()> {
    let user = match validate_user_id(user) {
        Ok(user) => user,
        Err(e) => {
            println!("Invalid user id: {e}");
            return Ok(());
        }
    };

    let state = SharedState::new(config.clone()).await?;
    let run = state.freshness.refresh_user(&UserContext::new(user)).await?;

    println!("Freshness check for {user}:");
    super::print_run(&run);

    if run.total_checked == 0 {
        println!();
        println!(
            "No saved items older than {} hours.",
            config.freshness.staleness_hours
        );
    }

    Ok(())
}
