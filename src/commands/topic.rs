use tracing::info;

use super::render::render_topic;
use super::{download, send_chunked};
use crate::prompt::{Domain, RequestDescriptor};
use crate::state::Context;
use poise::serenity_prelude as serenity;

/// Research a topic, optionally comparing it with another
#[poise::command(slash_command, guild_only)]
pub async fn topic(
    ctx: Context<'_>,
    #[description = "Topic or claim to analyze"] query: String,
    #[description = "Second topic to compare against"] compare_with: Option<String>,
    #[description = "Image or document for context"] attachment: Option<serenity::Attachment>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(
        user = %ctx.author().name,
        query = %query,
        compare_with = compare_with.as_deref().unwrap_or(""),
        "topic report started"
    );

    let mut descriptor = RequestDescriptor::new(Domain::TopicReport, query.as_str())
        .with_instructions(ctx.data().instructions.as_str());
    if let Some(other) = compare_with {
        descriptor = descriptor.comparing(other);
    }
    let attachments = download(attachment).await?;

    let report = ctx.data().scout.topic(&descriptor, &attachments).await?;
    send_chunked(&ctx, &render_topic(&report)).await
}
