use tracing::info;

use crate::state::Context;

/// Clear cached responses (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn cache(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    let removed = ctx.data().cache.clear().await?;
    info!(user = %ctx.author().name, removed, "response cache cleared");
    ctx.say(format!("Cache cleared ({} entries removed).", removed))
        .await?;
    Ok(())
}
