use serde::{Deserialize, Serialize};

/// A grounding source returned out-of-band by the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// Raw text plus citations from a retrieval-augmented upstream call.
/// Citations are already filtered to ones carrying both `uri` and `title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUpstreamResponse {
    pub body: String,
    pub citations: Vec<Citation>,
}

/// One web-result item (video, audio, book, article...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub title: String,
    pub link: String,
    pub source: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Follow-up queries, most relevant first.
pub type SuggestionList = Vec<String>;

/// A `<label>: <text>` entry: a key point of a topic report or an agent step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledItem {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPoint {
    pub aspect: String,
    pub analysis_a: String,
    pub analysis_b: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonBlock {
    pub topic_a: String,
    pub topic_b: String,
    pub points: Vec<ComparisonPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicReport {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<LabeledItem>,
    /// `None` is a valid terminal state: the model reported no comparison.
    pub comparison: Option<ComparisonBlock>,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentExecutionReport {
    pub summary: String,
    pub steps: Vec<LabeledItem>,
    pub citations: Vec<Citation>,
}
