use tracing::info;

use super::render::render_agent;
use super::send_chunked;
use crate::prompt::{Domain, RequestDescriptor};
use crate::state::Context;

/// Hand a research task to the agent and get back what it did
#[poise::command(slash_command, guild_only)]
pub async fn agent(
    ctx: Context<'_>,
    #[description = "Task to carry out"] task: String,
) -> Result<(), anyhow::Error> {
    // Agent runs are slow; acknowledge so the user isn't staring at a spinner
    let user_mention = format!("<@{}>", ctx.author().id);
    ctx.say(format!(
        "Got it, working on that task. I'll ping you when it's done, {}",
        user_mention
    ))
    .await?;

    info!(user = %ctx.author().name, task = %task, "agent task started");

    let descriptor = RequestDescriptor::new(Domain::AgentTask, task.as_str())
        .with_instructions(ctx.data().instructions.as_str());
    let report = ctx.data().scout.agent(&descriptor, &[]).await?;

    let full = format!("{} here's the report:\n\n{}", user_mention, render_agent(&task, &report));
    send_chunked(&ctx, &full).await
}
