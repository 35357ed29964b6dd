use tracing::debug;

use super::sections::{
    field_line, field_span, head_until, labeled_items, split_blocks, split_section,
};
use super::types::{AgentExecutionReport, Citation, ComparisonBlock, ComparisonPoint, TopicReport};
use crate::prompt::templates::{
    COMPARISON_MARKER, COMPARISON_NULL, KEY_POINTS_MARKER, POINT_MARKER, STEPS_MARKER,
};

pub const NO_SUMMARY: &str = "No summary available.";

pub fn fallback_title(query: &str) -> String {
    format!("Report: {}", query.trim())
}

/// Parse the topic report grammar.
///
/// Each level fails locally: a missing scalar falls back to its default, a
/// malformed key point or comparison point is skipped, and an absent or
/// `comparison: null` section yields `comparison: None`.
pub fn parse_topic_report(body: &str, citations: Vec<Citation>, query: &str) -> TopicReport {
    let header = head_until(body, &[KEY_POINTS_MARKER, COMPARISON_MARKER]);
    let title = field_line(header, "title")
        .map(str::to_string)
        .unwrap_or_else(|| fallback_title(query));
    let summary = field_span(header, "summary").unwrap_or(NO_SUMMARY).to_string();

    let key_points = split_section(body, KEY_POINTS_MARKER)
        .1
        .map(|rest| labeled_items(head_until(rest, &[COMPARISON_MARKER])))
        .unwrap_or_default();

    let comparison = split_section(body, COMPARISON_MARKER)
        .1
        .and_then(parse_comparison);

    debug!(
        key_points = key_points.len(),
        comparison_points = ?comparison.as_ref().map(|c| c.points.len()),
        citations = citations.len(),
        "topic report parsed"
    );

    TopicReport {
        title,
        summary,
        key_points,
        comparison,
        citations,
    }
}

fn parse_comparison(section: &str) -> Option<ComparisonBlock> {
    if section.contains(COMPARISON_NULL) {
        return None;
    }
    let header = head_until(section, &[POINT_MARKER]);
    let topic_a = field_line(header, "topicA")?;
    let topic_b = field_line(header, "topicB")?;
    let points = split_blocks(section, POINT_MARKER)
        .filter_map(parse_point)
        .collect();
    Some(ComparisonBlock {
        topic_a: topic_a.to_string(),
        topic_b: topic_b.to_string(),
        points,
    })
}

fn parse_point(block: &str) -> Option<ComparisonPoint> {
    Some(ComparisonPoint {
        aspect: field_line(block, "aspect")?.to_string(),
        analysis_a: field_line(block, "analysisA")?.to_string(),
        analysis_b: field_line(block, "analysisB")?.to_string(),
    })
}

/// Parse the agent execution grammar: a summary, then `<label>: <text>` steps.
pub fn parse_agent_report(body: &str, citations: Vec<Citation>) -> AgentExecutionReport {
    let (header, steps_region) = split_section(body, STEPS_MARKER);
    let summary = field_span(header, "summary").unwrap_or(NO_SUMMARY).to_string();
    let steps = steps_region.map(labeled_items).unwrap_or_default();

    debug!(steps = steps.len(), citations = citations.len(), "agent report parsed");

    AgentExecutionReport {
        summary,
        steps,
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cites() -> Vec<Citation> {
        vec![
            Citation {
                uri: "https://a.test".to_string(),
                title: "A".to_string(),
            },
            Citation {
                uri: "https://b.test".to_string(),
                title: "B".to_string(),
            },
        ]
    }

    const REPORT: &str = "title: Solar vs Wind
summary: Both are renewable.
They differ in cost and footprint.
--- KEY POINTS ---
Cost: Solar panels keep getting cheaper.

Land use: Wind farms share land with agriculture.
a line without the separator
--- COMPARISON ---
topicA: Solar
topicB: Wind
-- Point --
aspect: Reliability
analysisA: Daytime only
analysisB: Weather dependent
-- Point --
aspect: Maintenance
analysisA: Low
analysisB: Moderate, moving parts
";

    #[test]
    fn test_topic_report_full() {
        let report = parse_topic_report(REPORT, cites(), "solar");
        assert_eq!(report.title, "Solar vs Wind");
        assert_eq!(
            report.summary,
            "Both are renewable.\nThey differ in cost and footprint."
        );
        assert_eq!(report.key_points.len(), 2);
        assert_eq!(report.key_points[0].title, "Cost");
        assert_eq!(report.key_points[1].title, "Land use");
        assert_eq!(
            report.key_points[1].description,
            "Wind farms share land with agriculture."
        );
        assert_eq!(report.citations, cites());
    }

    #[test]
    fn test_comparison_reconstruction() {
        let report = parse_topic_report(REPORT, vec![], "solar");
        let comparison = report.comparison.unwrap();
        assert_eq!(comparison.topic_a, "Solar");
        assert_eq!(comparison.topic_b, "Wind");
        assert_eq!(
            comparison.points,
            vec![
                ComparisonPoint {
                    aspect: "Reliability".to_string(),
                    analysis_a: "Daytime only".to_string(),
                    analysis_b: "Weather dependent".to_string(),
                },
                ComparisonPoint {
                    aspect: "Maintenance".to_string(),
                    analysis_a: "Low".to_string(),
                    analysis_b: "Moderate, moving parts".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_comparison_null() {
        let body = "title: T\nsummary: S\n--- KEY POINTS ---\nA: a\n--- COMPARISON ---\ncomparison: null\n";
        let report = parse_topic_report(body, vec![], "q");
        assert!(report.comparison.is_none());
        assert_eq!(report.key_points.len(), 1);
    }

    #[test]
    fn test_comparison_section_absent() {
        let body = "title: T\nsummary: S\n--- KEY POINTS ---\nA: a\nB: b\n";
        let report = parse_topic_report(body, vec![], "q");
        assert!(report.comparison.is_none());
        assert_eq!(report.key_points.len(), 2);
    }

    #[test]
    fn test_incomplete_point_dropped() {
        let body = "--- COMPARISON ---
topicA: X
topicB: Y
-- Point --
aspect: Speed
analysisA: fast
-- Point --
aspect: Price
analysisA: high
analysisB: low
";
        let comparison = parse_topic_report(body, vec![], "q").comparison.unwrap();
        assert_eq!(comparison.points.len(), 1);
        assert_eq!(comparison.points[0].aspect, "Price");
    }

    #[test]
    fn test_comparison_without_topics_is_none() {
        let body = "--- COMPARISON ---\ntopicA: X\n-- Point --\naspect: a\nanalysisA: b\nanalysisB: c\n";
        assert!(parse_topic_report(body, vec![], "q").comparison.is_none());
    }

    #[test]
    fn test_topic_defaults() {
        let report = parse_topic_report("nothing structured here", vec![], "heat pumps");
        assert_eq!(report.title, fallback_title("heat pumps"));
        assert_eq!(report.summary, NO_SUMMARY);
        assert!(report.key_points.is_empty());
        assert!(report.comparison.is_none());
    }

    #[test]
    fn test_summary_without_key_points_marker() {
        let body = "title: T\nsummary: runs on\nto here\n--- COMPARISON ---\ncomparison: null";
        let report = parse_topic_report(body, vec![], "q");
        assert_eq!(report.summary, "runs on\nto here");
        assert!(report.key_points.is_empty());
    }

    #[test]
    fn test_agent_report() {
        let body = "summary: Booked a table for two.
--- STEPS ---
Search: Looked up restaurants nearby.
Compare: Checked reviews at 19:00 slots.

Book: Reserved the table.
";
        let report = parse_agent_report(body, cites());
        assert_eq!(report.summary, "Booked a table for two.");
        let titles: Vec<_> = report.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Search", "Compare", "Book"]);
        assert_eq!(report.steps[1].description, "Checked reviews at 19:00 slots.");
        assert_eq!(report.citations.len(), 2);
    }

    #[test]
    fn test_agent_report_defaults() {
        let report = parse_agent_report("", vec![]);
        assert_eq!(report.summary, NO_SUMMARY);
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(
            parse_topic_report(REPORT, cites(), "solar"),
            parse_topic_report(REPORT, cites(), "solar")
        );
    }

    #[test]
    fn test_agent_report_idempotent() {
        let body = "summary: Done.\n--- STEPS ---\nSearch: found it\nnot a step\nBook: booked";
        let first = parse_agent_report(body, cites());
        assert_eq!(first, parse_agent_report(body, cites()));
        assert_eq!(first.steps.len(), 2);
    }
}
