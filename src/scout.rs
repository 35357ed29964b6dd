use std::sync::Arc;

use anyhow::{ensure, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::llm::{Attachment, LlmClient};
use crate::normalize::{
    self, AgentExecutionReport, Citation, RawUpstreamResponse, ResultRecord, SuggestionList,
    TopicReport,
};
use crate::prompt::{self, Domain, OutputGrammar, RequestDescriptor};
use crate::state::ScoutConfig;

/// Normalized answer to a web-result request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub records: Vec<ResultRecord>,
    pub suggestions: SuggestionList,
    pub citations: Vec<Citation>,
    /// Served from the response cache rather than a fresh upstream call.
    #[serde(skip)]
    pub cached: bool,
}

/// Prompt and grammar for one request, decided before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub grammar: OutputGrammar,
    pub prompt: String,
    pub grounded: bool,
}

impl PreparedRequest {
    /// The fallback threshold only shapes grounded result lists, so it is part of their key alone.
    pub fn cache_key(&self, config: &ScoutConfig, attachments: &[Attachment]) -> String {
        let fallback = (self.grounded && self.grammar == OutputGrammar::Results)
            .then(|| config.fallback_policy());
        cache_key(
            self.grammar,
            self.grounded,
            fallback,
            &self.prompt,
            attachments,
        )
    }
}

pub fn prepare(
    descriptor: &RequestDescriptor,
    expected: Domain,
    grounded: bool,
) -> Result<PreparedRequest> {
    ensure!(
        descriptor.domain == expected,
        "{} request sent to the {} pipeline",
        descriptor.domain.as_str(),
        expected.as_str()
    );
    let grammar = descriptor.domain.grammar();
    let prompt = if grounded {
        prompt::compile(descriptor, grammar)
    } else {
        prompt::compile_structured(descriptor)
    };
    Ok(PreparedRequest {
        grammar,
        prompt,
        grounded,
    })
}

/// Descriptor → prompt → cache → upstream → normalizer.
pub struct Scout {
    llm: Arc<LlmClient>,
    cache: Arc<ResponseCache>,
    config: Arc<RwLock<ScoutConfig>>,
}

impl Scout {
    pub fn new(
        llm: Arc<LlmClient>,
        cache: Arc<ResponseCache>,
        config: Arc<RwLock<ScoutConfig>>,
    ) -> Self {
        Self { llm, cache, config }
    }

    pub async fn search(
        &self,
        descriptor: &RequestDescriptor,
        attachments: &[Attachment],
    ) -> Result<SearchOutcome> {
        let query = descriptor.query_text.as_str();
        let (mut outcome, cached) = self
            .run(
                descriptor,
                Domain::WebResult,
                attachments,
                |raw, config| {
                    let (records, suggestions) =
                        normalize::parse_results(&raw.body, query, config.fallback_policy());
                    SearchOutcome {
                        records,
                        suggestions,
                        citations: raw.citations,
                        cached: false,
                    }
                },
                |json| {
                    let (records, suggestions) = normalize::from_structured_results(json);
                    SearchOutcome {
                        records,
                        suggestions,
                        citations: vec![],
                        cached: false,
                    }
                },
            )
            .await?;
        outcome.cached = cached;
        info!(
            query,
            records = outcome.records.len(),
            suggestions = outcome.suggestions.len(),
            citations = outcome.citations.len(),
            cached,
            "search complete"
        );
        Ok(outcome)
    }

    pub async fn topic(
        &self,
        descriptor: &RequestDescriptor,
        attachments: &[Attachment],
    ) -> Result<TopicReport> {
        let query = descriptor.query_text.as_str();
        let (report, cached) = self
            .run(
                descriptor,
                Domain::TopicReport,
                attachments,
                |raw, _| normalize::parse_topic_report(&raw.body, raw.citations, query),
                |json| normalize::from_structured_topic(json, query),
            )
            .await?;
        info!(
            query,
            key_points = report.key_points.len(),
            comparison = report.comparison.is_some(),
            citations = report.citations.len(),
            cached,
            "topic report complete"
        );
        Ok(report)
    }

    pub async fn agent(
        &self,
        descriptor: &RequestDescriptor,
        attachments: &[Attachment],
    ) -> Result<AgentExecutionReport> {
        let (report, cached) = self
            .run(
                descriptor,
                Domain::AgentTask,
                attachments,
                |raw, _| normalize::parse_agent_report(&raw.body, raw.citations),
                normalize::from_structured_agent,
            )
            .await?;
        info!(
            task = %descriptor.query_text,
            steps = report.steps.len(),
            citations = report.citations.len(),
            cached,
            "agent task complete"
        );
        Ok(report)
    }

    /// Returns the normalized value and whether it came from the cache.
    async fn run<T, F, G>(
        &self,
        descriptor: &RequestDescriptor,
        expected: Domain,
        attachments: &[Attachment],
        from_text: F,
        from_json: G,
    ) -> Result<(T, bool)>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(RawUpstreamResponse, &ScoutConfig) -> T,
        G: FnOnce(Value) -> T,
    {
        let config = *self.config.read().await;
        let request = prepare(descriptor, expected, config.grounding)?;
        let key = request.cache_key(&config, attachments);

        match self.cache.get::<T>(&key).await {
            Ok(Some(value)) => return Ok((value, true)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache lookup failed"),
        }

        info!(
            domain = descriptor.domain.as_str(),
            grounded = request.grounded,
            prompt_len = request.prompt.len(),
            attachments = attachments.len(),
            model = self.llm.model(),
            "calling upstream"
        );

        let value = if request.grounded {
            let raw = self
                .llm
                .generate_grounded(&request.prompt, attachments)
                .await?;
            from_text(raw, &config)
        } else {
            let schema = normalize::response_schema(request.grammar);
            let json = self
                .llm
                .generate_structured(&request.prompt, attachments, schema)
                .await?;
            from_json(json)
        };

        if let Err(e) = self.cache.set(&key, &value, config.cache_ttl()).await {
            warn!(error = %e, "cache store failed");
        }
        Ok((value, false))
    }
}
