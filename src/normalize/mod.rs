pub mod report;
pub mod results;
pub mod sections;
pub mod structured;
pub mod types;

pub use report::{parse_agent_report, parse_topic_report};
pub use results::{is_fallback, parse_results, FallbackPolicy};
pub use structured::{
    from_structured_agent, from_structured_results, from_structured_topic, response_schema,
};
pub use types::{
    AgentExecutionReport, Citation, RawUpstreamResponse, ResultRecord, SuggestionList, TopicReport,
};
