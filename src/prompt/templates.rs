pub const RESULT_MARKER: &str = "--- RESULT ---";
pub const SUGGESTIONS_MARKER: &str = "--- SUGGESTIONS ---";
pub const KEY_POINTS_MARKER: &str = "--- KEY POINTS ---";
pub const COMPARISON_MARKER: &str = "--- COMPARISON ---";
pub const POINT_MARKER: &str = "-- Point --";
pub const STEPS_MARKER: &str = "--- STEPS ---";
pub const COMPARISON_NULL: &str = "comparison: null";

/// Used when neither the caller nor `SCOUT_INSTRUCTIONS` supplies instruction text.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a careful research assistant with live web search. \
Ground every statement in sources you actually found, prefer primary sources, and never invent links. \
If the web has nothing relevant, say so plainly instead of guessing.";

pub const RESULTS_FORMAT: &str = r#"OUTPUT FORMAT (follow exactly, no markdown, no extra commentary):
Start every result with the line "--- RESULT ---" and put each field on its own line:
--- RESULT ---
title: <title of the item>
link: <direct URL to the item>
source: <name of the site or publisher>
description: <one or two sentences describing the item>
imageUrl: <URL of a thumbnail image, omit the line if there is none>
Repeat the block for every result.
After the last result write the line "--- SUGGESTIONS ---" followed by one line of related search queries separated by commas:
--- SUGGESTIONS ---
<suggestion>, <suggestion>, <suggestion>"#;

pub const TOPIC_FORMAT: &str = r#"OUTPUT FORMAT (follow exactly, no markdown, no extra commentary):
title: <short title for the report>
summary: <a summary of the topic, may span several lines>
--- KEY POINTS ---
<key point label>: <explanation>
<key point label>: <explanation>
--- COMPARISON ---
topicA: <first topic>
topicB: <second topic>
-- Point --
aspect: <aspect being compared>
analysisA: <how the first topic handles this aspect>
analysisB: <how the second topic handles this aspect>
Repeat the "-- Point --" block for every aspect compared."#;

pub const AGENT_FORMAT: &str = r#"OUTPUT FORMAT (follow exactly, no markdown, no extra commentary):
summary: <what was accomplished and the outcome>
--- STEPS ---
<step title>: <what was done in this step>
<step title>: <what was done in this step>"#;

pub const STRUCTURED_FORMAT: &str = "OUTPUT FORMAT: respond only with JSON matching the response schema attached to this request. \
Leave out items you cannot fill completely instead of leaving fields empty.";
