pub mod templates;

use templates::{AGENT_FORMAT, RESULTS_FORMAT, STRUCTURED_FORMAT, TOPIC_FORMAT};

/// What kind of answer a request is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    WebResult,
    TopicReport,
    AgentTask,
}

impl Domain {
    /// The text convention requested by default for this domain.
    pub fn grammar(self) -> OutputGrammar {
        match self {
            Domain::WebResult => OutputGrammar::Results,
            Domain::TopicReport => OutputGrammar::TopicReport,
            Domain::AgentTask => OutputGrammar::AgentReport,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::WebResult => "web-result",
            Domain::TopicReport => "topic-report",
            Domain::AgentTask => "agent-task",
        }
    }
}

/// Output convention the upstream model is asked to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputGrammar {
    Results,
    TopicReport,
    AgentReport,
}

impl OutputGrammar {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputGrammar::Results => "results",
            OutputGrammar::TopicReport => "topic-report",
            OutputGrammar::AgentReport => "agent-report",
        }
    }

    fn format_block(self) -> &'static str {
        match self {
            OutputGrammar::Results => RESULTS_FORMAT,
            OutputGrammar::TopicReport => TOPIC_FORMAT,
            OutputGrammar::AgentReport => AGENT_FORMAT,
        }
    }
}

/// Ordered, duplicate-free filter sets. Blank tags are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTags {
    categories: Vec<String>,
    regions: Vec<String>,
    sources: Vec<String>,
}

impl FilterTags {
    pub fn add_category(&mut self, tag: &str) {
        push_unique(&mut self.categories, tag);
    }

    pub fn add_region(&mut self, tag: &str) {
        push_unique(&mut self.regions, tag);
    }

    pub fn add_source(&mut self, tag: &str) {
        push_unique(&mut self.sources, tag);
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

fn push_unique(set: &mut Vec<String>, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() && !set.iter().any(|t| t == tag) {
        set.push(tag.to_string());
    }
}

/// One user action, turned into exactly one upstream prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub domain: Domain,
    pub query_text: String,
    pub filter_tags: FilterTags,
    pub comparison_topic: Option<String>,
    pub instruction_text: String,
}

impl RequestDescriptor {
    pub fn new(domain: Domain, query_text: impl Into<String>) -> Self {
        Self {
            domain,
            query_text: query_text.into(),
            filter_tags: FilterTags::default(),
            comparison_topic: None,
            instruction_text: String::new(),
        }
    }

    pub fn with_filters(mut self, filter_tags: FilterTags) -> Self {
        self.filter_tags = filter_tags;
        self
    }

    pub fn comparing(mut self, topic: impl Into<String>) -> Self {
        self.comparison_topic = Some(topic.into());
        self
    }

    pub fn with_instructions(mut self, instruction_text: impl Into<String>) -> Self {
        self.instruction_text = instruction_text.into();
        self
    }

    /// The comparison topic, if one was given and is not blank.
    pub fn comparison(&self) -> Option<&str> {
        self.comparison_topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Build the prompt for the retrieval-augmented path, requesting `grammar`.
pub fn compile(descriptor: &RequestDescriptor, grammar: OutputGrammar) -> String {
    assemble(
        descriptor,
        &task_description(descriptor, false),
        grammar.format_block(),
    )
}

/// Build the prompt for the schema-constrained path (no retrieval).
pub fn compile_structured(descriptor: &RequestDescriptor) -> String {
    assemble(
        descriptor,
        &task_description(descriptor, true),
        STRUCTURED_FORMAT,
    )
}

fn assemble(descriptor: &RequestDescriptor, task: &str, format: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    let instructions = descriptor.instruction_text.trim();
    if !instructions.is_empty() {
        parts.push(instructions);
    }
    parts.push(task);
    parts.push(format);
    parts.join("\n\n")
}

fn task_description(descriptor: &RequestDescriptor, structured: bool) -> String {
    let query = descriptor.query_text.trim();
    match descriptor.domain {
        Domain::WebResult => {
            let mut lines = vec![format!(
                "Search the web for items matching \"{}\" and return up to 10 of the best results.",
                query
            )];
            let tags = &descriptor.filter_tags;
            if !tags.categories().is_empty() {
                lines.push(format!(
                    "Only include these categories: {}.",
                    tags.categories().join(", ")
                ));
            }
            if !tags.regions().is_empty() {
                lines.push(format!(
                    "Focus on these regions: {}.",
                    tags.regions().join(", ")
                ));
            }
            if !tags.sources().is_empty() {
                lines.push(format!(
                    "Prefer these sources: {}.",
                    tags.sources().join(", ")
                ));
            }
            lines.push(
                "Also suggest 3 to 5 related search queries, most relevant first.".to_string(),
            );
            lines.join("\n")
        }
        Domain::TopicReport => {
            let mut lines = vec![format!(
                "Research the topic \"{}\" and write a report with a short title, a summary and at most 5 key points.",
                query
            )];
            match (descriptor.comparison(), structured) {
                (Some(other), _) => lines.push(format!(
                    "Compare \"{}\" with \"{}\" in the comparison section, one point per important aspect.",
                    query, other
                )),
                (None, false) => lines.push(format!(
                    "No comparison was requested: the comparison section must contain only the line `{}`.",
                    templates::COMPARISON_NULL
                )),
                (None, true) => {
                    lines.push("No comparison was requested: set `comparison` to null.".to_string())
                }
            }
            lines.join("\n")
        }
        Domain::AgentTask => format!(
            "Carry out the following task using web search where needed: \"{}\".\n\
             Then report a summary of the outcome and every step you took, in order.",
            query
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(comparison: Option<&str>) -> RequestDescriptor {
        let mut d = RequestDescriptor::new(Domain::TopicReport, "solar power");
        d.comparison_topic = comparison.map(|s| s.to_string());
        d
    }

    #[test]
    fn test_compile_order_instruction_task_format() {
        let d = RequestDescriptor::new(Domain::WebResult, "rust talks")
            .with_instructions("Be concise.");
        let prompt = compile(&d, OutputGrammar::Results);
        let instr = prompt.find("Be concise.").unwrap();
        let task = prompt.find("\"rust talks\"").unwrap();
        let format = prompt.find(templates::RESULT_MARKER).unwrap();
        assert!(instr < task && task < format);
        assert!(prompt.contains(templates::SUGGESTIONS_MARKER));
    }

    #[test]
    fn test_blank_instructions_omitted() {
        let d = RequestDescriptor::new(Domain::AgentTask, "book a table").with_instructions("  ");
        let prompt = compile(&d, OutputGrammar::AgentReport);
        assert!(prompt.starts_with("Carry out the following task"));
        assert!(prompt.contains(templates::STEPS_MARKER));
    }

    #[test]
    fn test_filter_clauses() {
        let mut tags = FilterTags::default();
        tags.add_category("video");
        tags.add_category("book");
        tags.add_region("Europe");
        let d = RequestDescriptor::new(Domain::WebResult, "jazz").with_filters(tags);
        let prompt = compile(&d, OutputGrammar::Results);
        assert!(prompt.contains("Only include these categories: video, book."));
        assert!(prompt.contains("Focus on these regions: Europe."));
        assert!(!prompt.contains("Prefer these sources"));
    }

    #[test]
    fn test_filter_tags_dedup_and_order() {
        let mut tags = FilterTags::default();
        tags.add_source("bbc");
        tags.add_source(" ");
        tags.add_source("npr");
        tags.add_source("bbc ");
        assert_eq!(tags.sources(), ["bbc".to_string(), "npr".to_string()]);
    }

    #[test]
    fn test_comparison_clause() {
        let prompt = compile(&topic(Some("wind power")), OutputGrammar::TopicReport);
        assert!(prompt.contains("Compare \"solar power\" with \"wind power\""));
        assert!(!prompt.contains("No comparison was requested"));
        assert!(prompt.contains(templates::POINT_MARKER));
    }

    #[test]
    fn test_empty_comparison_omitted() {
        for d in [topic(None), topic(Some("   "))] {
            let prompt = compile(&d, OutputGrammar::TopicReport);
            assert!(!prompt.contains("Compare "));
            assert!(prompt.contains(templates::COMPARISON_NULL));
        }
    }

    #[test]
    fn test_structured_prompt_has_no_text_grammar() {
        let prompt = compile_structured(&topic(None));
        assert!(prompt.contains("set `comparison` to null"));
        assert!(!prompt.contains(templates::KEY_POINTS_MARKER));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_domain_default_grammar() {
        assert_eq!(Domain::WebResult.grammar(), OutputGrammar::Results);
        assert_eq!(Domain::TopicReport.grammar(), OutputGrammar::TopicReport);
        assert_eq!(Domain::AgentTask.grammar(), OutputGrammar::AgentReport);
    }
}
