use tracing::{debug, warn};

use super::sections::{key_value, split_blocks, split_section};
use super::types::{ResultRecord, SuggestionList};
use crate::prompt::templates::{RESULT_MARKER, SUGGESTIONS_MARKER};

/// Results region length (in chars) above which unstructured prose is kept as a single record.
pub const DEFAULT_FALLBACK_MIN_LEN: usize = 50;
/// Non-navigable link placed on synthesized records.
pub const FALLBACK_LINK: &str = "#";
pub const FALLBACK_SOURCE: &str = "FactScout AI Search";

/// When to synthesize a record from an answer that ignored the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub min_len: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_FALLBACK_MIN_LEN,
        }
    }
}

/// Fields collected for one `--- RESULT ---` block before validation.
#[derive(Debug, Default)]
struct RecordDraft {
    title: Option<String>,
    link: Option<String>,
    source: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
}

impl RecordDraft {
    fn from_block(block: &str) -> Self {
        let mut draft = Self::default();
        for (key, value) in block.lines().filter_map(key_value) {
            let slot = match key {
                "title" => &mut draft.title,
                "link" => &mut draft.link,
                "source" => &mut draft.source,
                "description" => &mut draft.description,
                "imageUrl" => &mut draft.image_url,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        draft
    }

    /// `None` unless every required field is present and non-blank.
    fn finish(self) -> Option<ResultRecord> {
        let required = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(ResultRecord {
            title: required(self.title)?,
            link: required(self.link)?,
            source: required(self.source)?,
            description: required(self.description)?,
            image_url: required(self.image_url),
        })
    }
}

/// Parse the flat result grammar into records and follow-up suggestions.
///
/// Never fails: invalid blocks are dropped, and a prose answer longer than
/// `policy.min_len` becomes one synthesized record titled after `query`.
pub fn parse_results(
    body: &str,
    query: &str,
    policy: FallbackPolicy,
) -> (Vec<ResultRecord>, SuggestionList) {
    let (results_region, suggestions_region) = split_section(body, SUGGESTIONS_MARKER);

    let blocks: Vec<&str> = split_blocks(results_region, RESULT_MARKER).collect();
    let mut records: Vec<ResultRecord> = blocks
        .iter()
        .filter_map(|block| RecordDraft::from_block(block).finish())
        .collect();
    debug!(
        blocks = blocks.len(),
        records = records.len(),
        "result blocks parsed"
    );

    let suggestions = suggestions_region.map(parse_suggestions).unwrap_or_default();

    if records.is_empty() {
        if let Some(record) = fallback_record(results_region, query, policy) {
            warn!(
                query,
                body_len = body.len(),
                "response ignored result grammar, synthesizing fallback record"
            );
            records.push(record);
        }
    }

    (records, suggestions)
}

/// Comma separated suggestions, blanks dropped, order kept.
fn parse_suggestions(region: &str) -> SuggestionList {
    region
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn fallback_record(region: &str, query: &str, policy: FallbackPolicy) -> Option<ResultRecord> {
    let text = region.trim();
    if text.chars().count() <= policy.min_len {
        return None;
    }
    Some(ResultRecord {
        title: format!("AI answer for \"{}\"", query.trim()),
        link: FALLBACK_LINK.to_string(),
        source: FALLBACK_SOURCE.to_string(),
        description: text.to_string(),
        image_url: None,
    })
}

/// True for records produced by the fallback policy rather than the grammar.
pub fn is_fallback(record: &ResultRecord) -> bool {
    record.link == FALLBACK_LINK && record.source == FALLBACK_SOURCE
}
