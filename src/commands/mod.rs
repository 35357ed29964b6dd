mod agent;
mod cache;
mod config;
pub mod render;
mod search;
mod topic;

use poise::serenity_prelude as serenity;

use crate::llm::Attachment;
use crate::prompt::FilterTags;
use crate::state::Context;

/// FactScout - grounded search, topic reports and agent tasks
#[poise::command(
    slash_command,
    subcommands(
        "search::search",
        "topic::topic",
        "agent::agent",
        "config::config",
        "cache::cache"
    )
)]
pub async fn scout(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a message in Discord-safe chunks.
/// Uses ctx.say() for all chunks: poise routes follow-ups through the
/// interaction webhook, which doesn't require Send Messages channel permission.
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in render::chunks(text, render::CHUNK_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Comma-separated option values, in order.
fn split_tags(value: Option<&str>) -> impl Iterator<Item = &str> {
    value.unwrap_or("").split(',')
}

fn filter_tags(
    categories: Option<&str>,
    regions: Option<&str>,
    sources: Option<&str>,
) -> FilterTags {
    let mut tags = FilterTags::default();
    split_tags(categories).for_each(|t| tags.add_category(t));
    split_tags(regions).for_each(|t| tags.add_region(t));
    split_tags(sources).for_each(|t| tags.add_source(t));
    tags
}

async fn download(
    attachment: Option<serenity::Attachment>,
) -> Result<Vec<Attachment>, anyhow::Error> {
    let Some(attachment) = attachment else {
        return Ok(vec![]);
    };
    let data = attachment.download().await?;
    let mime_type = attachment
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(vec![Attachment { mime_type, data }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_tags_from_options() {
        let tags = filter_tags(Some("video, book,video"), None, Some(" bbc ,"));
        assert_eq!(tags.categories(), ["video".to_string(), "book".to_string()]);
        assert!(tags.regions().is_empty());
        assert_eq!(tags.sources(), ["bbc".to_string()]);
    }
}
