use crate::state::Context;

/// Configure the search pipeline (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "grounding | fallback_min_len | cache_ttl_secs"] param: Option<String>,
    #[description = "New value (grounding: 1 = on, 0 = off)"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = *ctx.data().config.read().await;
            ctx.say(format!(
                "**Scout Configuration:**\n\
                 `grounding`: {}\n\
                 `fallback_min_len`: {}\n\
                 `cache_ttl_secs`: {}",
                config.grounding, config.fallback_min_len, config.cache_ttl_secs
            ))
            .await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let reply = {
                let mut config = ctx.data().config.write().await;
                match key {
                    "grounding" => {
                        config.grounding = val != 0;
                        format!("`grounding` set to {}", config.grounding)
                    }
                    "fallback_min_len" => {
                        config.fallback_min_len = val as usize;
                        format!("`fallback_min_len` set to {}", val)
                    }
                    "cache_ttl_secs" => {
                        config.cache_ttl_secs = u64::from(val);
                        format!("`cache_ttl_secs` set to {}", val)
                    }
                    _ => format!(
                        "Unknown param `{}`. Valid: `grounding`, `fallback_min_len`, `cache_ttl_secs`",
                        key
                    ),
                }
            };
            ctx.say(reply).await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/scout config fallback_min_len 80`")
                .await?;
        }
    }

    Ok(())
}
