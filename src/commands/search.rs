use tracing::info;

use super::render::render_search;
use super::{download, filter_tags, send_chunked};
use crate::prompt::{Domain, RequestDescriptor};
use crate::state::Context;
use poise::serenity_prelude as serenity;

/// Search the web for videos, audio, books and more
#[poise::command(slash_command, guild_only)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to look for"] query: String,
    #[description = "Categories, comma-separated (e.g. video, book)"] categories: Option<String>,
    #[description = "Regions, comma-separated"] regions: Option<String>,
    #[description = "Preferred sources, comma-separated"] sources: Option<String>,
    #[description = "Image or document to search with"] attachment: Option<serenity::Attachment>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = %ctx.author().name, query = %query, "search started");

    let tags = filter_tags(
        categories.as_deref(),
        regions.as_deref(),
        sources.as_deref(),
    );
    let descriptor = RequestDescriptor::new(Domain::WebResult, query.as_str())
        .with_filters(tags)
        .with_instructions(ctx.data().instructions.as_str());
    let attachments = download(attachment).await?;

    let outcome = ctx.data().scout.search(&descriptor, &attachments).await?;
    send_chunked(&ctx, &render_search(&query, &outcome)).await
}
