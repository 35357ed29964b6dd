use std::fmt::Write;

use crate::normalize::{is_fallback, AgentExecutionReport, Citation, TopicReport};
use crate::scout::SearchOutcome;

/// Discord rejects messages over 2000 chars; leave headroom.
pub const CHUNK_LIMIT: usize = 1990;

pub fn render_search(query: &str, outcome: &SearchOutcome) -> String {
    let mut out = format!("**Search:** {}\n", query);
    if outcome.cached {
        out.push_str("_(cached)_\n");
    }

    if outcome.records.is_empty() {
        out.push_str("\nNo results found. Try a broader query or fewer filters.\n");
    }
    for (i, record) in outcome.records.iter().enumerate() {
        if is_fallback(record) {
            let _ = write!(
                out,
                "\n**{}** ({})\n{}\n",
                record.title, record.source, record.description
            );
        } else {
            let _ = write!(
                out,
                "\n**{}.** [{}](<{}>) · {}\n{}\n",
                i + 1,
                record.title,
                record.link,
                record.source,
                record.description
            );
        }
    }

    if !outcome.suggestions.is_empty() {
        let _ = write!(out, "\n**Related:** {}\n", outcome.suggestions.join(" · "));
    }
    out.push_str(&render_sources(&outcome.citations));
    out
}

pub fn render_topic(report: &TopicReport) -> String {
    let mut out = format!("## {}\n\n{}\n", report.title, report.summary);

    if !report.key_points.is_empty() {
        out.push_str("\n**Key points**\n");
        for point in &report.key_points {
            let _ = writeln!(out, "- **{}**: {}", point.title, point.description);
        }
    }

    if let Some(comparison) = &report.comparison {
        let _ = write!(
            out,
            "\n**{} vs {}**\n",
            comparison.topic_a, comparison.topic_b
        );
        for point in &comparison.points {
            let _ = write!(
                out,
                "- **{}**\n  • {}: {}\n  • {}: {}\n",
                point.aspect,
                comparison.topic_a,
                point.analysis_a,
                comparison.topic_b,
                point.analysis_b
            );
        }
    }

    out.push_str(&render_sources(&report.citations));
    out
}

pub fn render_agent(task: &str, report: &AgentExecutionReport) -> String {
    let mut out = format!("**Task:** {}\n\n{}\n", task, report.summary);
    if !report.steps.is_empty() {
        out.push_str("\n**Steps**\n");
        for (i, step) in report.steps.iter().enumerate() {
            let _ = writeln!(out, "{}. **{}**: {}", i + 1, step.title, step.description);
        }
    }
    out.push_str(&render_sources(&report.citations));
    out
}

/// Numbered source list; empty string when there are no citations.
pub fn render_sources(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n**Sources:**\n");
    for (i, c) in citations.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}](<{}>)", i + 1, c.title, c.uri);
    }
    out
}

/// Split into chunks of at most `limit` bytes, preferring line then word boundaries.
pub fn chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= limit {
            out.push(remaining);
            break;
        }
        let mut end = limit;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let split_at = remaining[..end]
            .rfind('\n')
            .or_else(|| remaining[..end].rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(end);
        out.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    out
}
