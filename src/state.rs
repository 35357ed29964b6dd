use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::ResponseCache;
use crate::normalize::results::DEFAULT_FALLBACK_MIN_LEN;
use crate::normalize::FallbackPolicy;
use crate::scout::Scout;

/// Configurable pipeline parameters (admins can modify at runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoutConfig {
    /// Web retrieval on: text grammars plus citations. Off: schema-validated JSON.
    pub grounding: bool,
    pub fallback_min_len: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            grounding: true,
            fallback_min_len: DEFAULT_FALLBACK_MIN_LEN,
            cache_ttl_secs: 3600,
        }
    }
}

impl ScoutConfig {
    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            min_len: self.fallback_min_len,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

pub struct AppState {
    pub scout: Arc<Scout>,
    pub cache: Arc<ResponseCache>,
    pub admin_ids: HashSet<u64>,
    pub config: Arc<RwLock<ScoutConfig>>,
    /// Instruction text prepended to every prompt.
    pub instructions: String,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
