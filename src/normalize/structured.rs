use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::report::{fallback_title, NO_SUMMARY};
use super::types::{
    AgentExecutionReport, ComparisonBlock, ComparisonPoint, LabeledItem, ResultRecord,
    SuggestionList, TopicReport,
};
use crate::prompt::OutputGrammar;

fn string_field() -> Value {
    json!({ "type": "STRING" })
}

fn labeled_array() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": { "title": string_field(), "description": string_field() },
            "required": ["title", "description"]
        }
    })
}

/// Response schema sent with a structured request for `grammar`.
pub fn response_schema(grammar: OutputGrammar) -> Value {
    match grammar {
        OutputGrammar::Results => json!({
            "type": "OBJECT",
            "properties": {
                "results": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": string_field(),
                            "link": string_field(),
                            "source": string_field(),
                            "description": string_field(),
                            "imageUrl": string_field()
                        },
                        "required": ["title", "link", "source", "description"]
                    }
                },
                "suggestions": { "type": "ARRAY", "items": string_field() }
            },
            "required": ["results", "suggestions"]
        }),
        OutputGrammar::TopicReport => json!({
            "type": "OBJECT",
            "properties": {
                "title": string_field(),
                "summary": string_field(),
                "keyPoints": labeled_array(),
                "comparison": {
                    "type": "OBJECT",
                    "nullable": true,
                    "properties": {
                        "topicA": string_field(),
                        "topicB": string_field(),
                        "points": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "aspect": string_field(),
                                    "analysisA": string_field(),
                                    "analysisB": string_field()
                                },
                                "required": ["aspect", "analysisA", "analysisB"]
                            }
                        }
                    },
                    "required": ["topicA", "topicB", "points"]
                }
            },
            "required": ["title", "summary", "keyPoints"]
        }),
        OutputGrammar::AgentReport => json!({
            "type": "OBJECT",
            "properties": {
                "summary": string_field(),
                "steps": labeled_array()
            },
            "required": ["summary", "steps"]
        }),
    }
}

// Loose mirrors of the schema: every field optional so one bad item never
// fails the whole payload.

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LooseRecord {
    title: Option<String>,
    link: Option<String>,
    source: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseResults {
    results: Vec<LooseRecord>,
    suggestions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseItem {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoosePoint {
    aspect: Option<String>,
    analysis_a: Option<String>,
    analysis_b: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LooseComparison {
    topic_a: Option<String>,
    topic_b: Option<String>,
    points: Vec<LoosePoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LooseTopic {
    title: Option<String>,
    summary: Option<String>,
    key_points: Vec<LooseItem>,
    comparison: Option<LooseComparison>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseAgent {
    summary: Option<String>,
    steps: Vec<LooseItem>,
}

fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn decode<T: Default + for<'de> Deserialize<'de>>(payload: Value, what: &str) -> T {
    serde_json::from_value(payload).unwrap_or_else(|e| {
        warn!(error = %e, what, "structured payload did not match schema");
        T::default()
    })
}

fn labeled(items: Vec<LooseItem>) -> Vec<LabeledItem> {
    items
        .into_iter()
        .filter_map(|i| {
            Some(LabeledItem {
                title: filled(i.title)?,
                description: filled(i.description)?,
            })
        })
        .collect()
}

pub fn from_structured_results(payload: Value) -> (Vec<ResultRecord>, SuggestionList) {
    let loose: LooseResults = decode(payload, "results");
    let records = loose
        .results
        .into_iter()
        .filter_map(|r| {
            Some(ResultRecord {
                title: filled(r.title)?,
                link: filled(r.link)?,
                source: filled(r.source)?,
                description: filled(r.description)?,
                image_url: filled(r.image_url),
            })
        })
        .collect();
    let suggestions = loose
        .suggestions
        .into_iter()
        .filter_map(|s| filled(Some(s)))
        .collect();
    (records, suggestions)
}

pub fn from_structured_topic(payload: Value, query: &str) -> TopicReport {
    let loose: LooseTopic = decode(payload, "topic report");
    let comparison = loose.comparison.and_then(|c| {
        Some(ComparisonBlock {
            topic_a: filled(c.topic_a)?,
            topic_b: filled(c.topic_b)?,
            points: c
                .points
                .into_iter()
                .filter_map(|p| {
                    Some(ComparisonPoint {
                        aspect: filled(p.aspect)?,
                        analysis_a: filled(p.analysis_a)?,
                        analysis_b: filled(p.analysis_b)?,
                    })
                })
                .collect(),
        })
    });
    TopicReport {
        title: filled(loose.title).unwrap_or_else(|| fallback_title(query)),
        summary: filled(loose.summary).unwrap_or_else(|| NO_SUMMARY.to_string()),
        key_points: labeled(loose.key_points),
        comparison,
        citations: vec![],
    }
}

pub fn from_structured_agent(payload: Value) -> AgentExecutionReport {
    let loose: LooseAgent = decode(payload, "agent report");
    AgentExecutionReport {
        summary: filled(loose.summary).unwrap_or_else(|| NO_SUMMARY.to_string()),
        steps: labeled(loose.steps),
        citations: vec![],
    }
}
