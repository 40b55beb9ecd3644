//! Structured analysis pipeline
//!
//! One run: validate, build the prompt, make exactly one gateway call while a
//! timer walks the progress table, then extract and normalize the JSON.

use std::time::Duration;

use oitiva_core::AnalysisResult;
use oitiva_llm::{
    models, CallOptions, Gateway, HttpTransport, LlmError, Message, ReqwestTransport, UsageSink,
};
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::normalize::parse_response;
use crate::progress::ProgressReporter;
use crate::prompts::{build_analysis_message, SYSTEM_PROMPT};
use crate::state::AnalysisState;

/// Default time between progress steps while the provider is working
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(6);

/// Analysis pipeline over a provider gateway. Holds no state across runs.
pub struct AnalysisPipeline<T = ReqwestTransport> {
    gateway: Gateway<T>,
    tick_interval: Duration,
}

impl<T: HttpTransport + Sync> AnalysisPipeline<T> {
    pub fn new(gateway: Gateway<T>) -> Self {
        Self {
            gateway,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// Analyze one hearing transcript.
    ///
    /// Drives `reporter` through preparing, sent, processing and done, or into
    /// error on failure. Token usage of the call is added to `usage`.
    pub async fn analyze<U>(
        &self,
        transcript: &str,
        case_summary: &str,
        usage: &mut U,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        U: UsageSink + Send + ?Sized,
    {
        reporter.enter(AnalysisState::Preparing);

        match self.run(transcript, case_summary, usage, reporter).await {
            Ok(result) => {
                reporter.enter(AnalysisState::Done);
                Ok(result)
            }
            Err(e) => {
                warn!(state = %reporter.state(), "Analysis failed: {}", e);
                reporter.enter(AnalysisState::Error);
                Err(e)
            }
        }
    }

    async fn run<U>(
        &self,
        transcript: &str,
        case_summary: &str,
        usage: &mut U,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        U: UsageSink + Send + ?Sized,
    {
        if transcript.trim().is_empty() {
            return Err(AnalysisError::Validation("transcript is empty".to_string()));
        }

        let provider = self.gateway.active_provider();
        let config = self.gateway.settings().config(provider);
        let options = config
            .call_options(models::max_output_tokens(&config.model))
            .with_system_prompt(SYSTEM_PROMPT);
        let messages = [Message::user(build_analysis_message(transcript, case_summary))];

        info!(
            provider = %provider,
            model = %options.model,
            max_tokens = options.max_tokens,
            transcript_chars = transcript.chars().count(),
            "Starting analysis"
        );
        reporter.enter(AnalysisState::Sent);

        let response = self.call_with_progress(&messages, &options, usage, reporter).await?;
        debug!(response_chars = response.chars().count(), "Model response received");

        reporter.enter(AnalysisState::Processing);
        let result = parse_response(&response)?;

        info!(
            deponents = result.deponents.len(),
            contradictions = result.contradictions.len(),
            admissions = result.admissions.len(),
            "Analysis complete"
        );
        Ok(result)
    }

    /// Await the single gateway call, stepping progress on every tick
    async fn call_with_progress<U>(
        &self,
        messages: &[Message],
        options: &CallOptions,
        usage: &mut U,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<String, LlmError>
    where
        U: UsageSink + Send + ?Sized,
    {
        let call = self.gateway.call_ai(messages, options, usage);
        tokio::pin!(call);

        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut ticker = tokio::time::interval_at(start, self.tick_interval);

        loop {
            tokio::select! {
                result = &mut call => return result,
                _ = ticker.tick() => {
                    reporter.advance();
                }
            }
        }
    }
}
