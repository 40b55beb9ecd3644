//! Caller-facing analysis session
//!
//! Wraps the pipeline with the state a UI needs between runs: the current
//! lifecycle state, the last error message, cumulative token usage and a
//! guard against overlapping runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use oitiva_core::AnalysisResult;
use oitiva_llm::{HttpTransport, ReqwestTransport, TokenUsage};
use tracing::{debug, error, warn};

use crate::error::AnalysisError;
use crate::pipeline::AnalysisPipeline;
use crate::progress::ProgressReporter;
use crate::state::AnalysisState;

/// Error slot message for a run whose future was dropped mid-flight
const CANCELLED: &str = "analysis was cancelled before completion";

#[derive(Debug, Default)]
struct Status {
    state: AnalysisState,
    error: Option<String>,
    usage: TokenUsage,
    analyzing: bool,
}

pub struct AnalysisSession<T = ReqwestTransport> {
    pipeline: AnalysisPipeline<T>,
    status: Mutex<Status>,
}

impl<T: HttpTransport + Sync> AnalysisSession<T> {
    pub fn new(pipeline: AnalysisPipeline<T>) -> Self {
        Self {
            pipeline,
            status: Mutex::new(Status::default()),
        }
    }

    pub fn pipeline(&self) -> &AnalysisPipeline<T> {
        &self.pipeline
    }

    pub fn state(&self) -> AnalysisState {
        self.lock().state
    }

    /// Message of the last failed run, cleared when a new run starts
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Tokens consumed by every run on this session
    pub fn usage(&self) -> TokenUsage {
        self.lock().usage
    }

    pub fn is_analyzing(&self) -> bool {
        self.lock().analyzing
    }

    /// Run an analysis, reporting failure through [`AnalysisSession::error`].
    ///
    /// Returns `None` on any failure; a result is never partially filled. A call
    /// rejected as busy is logged on its own and leaves the error slot to the
    /// run that owns it.
    pub async fn analyze<F>(
        &self,
        transcript: &str,
        case_summary: &str,
        on_progress: F,
    ) -> Option<AnalysisResult>
    where
        F: FnMut(u8, &str) + Send,
    {
        match self.try_analyze(transcript, case_summary, on_progress).await {
            Ok(result) => Some(result),
            Err(AnalysisError::Busy) => {
                warn!(state = %self.state(), "Analysis skipped, another run is in progress");
                None
            }
            Err(e) => {
                error!("Analysis failed: {}", e);
                None
            }
        }
    }

    /// Run an analysis and return the error itself.
    ///
    /// Fails with [`AnalysisError::Busy`] while another run is in flight; that
    /// rejection leaves the running analysis' state and error slot untouched.
    pub async fn try_analyze<F>(
        &self,
        transcript: &str,
        case_summary: &str,
        on_progress: F,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        F: FnMut(u8, &str) + Send,
    {
        let run = {
            let mut status = self.lock();
            if status.analyzing {
                debug!("Analysis requested while another is running");
                return Err(AnalysisError::Busy);
            }
            status.analyzing = true;
            status.error = None;
            RunGuard {
                status: &self.status,
            }
        };

        let mut usage = TokenUsage::default();
        let outcome = {
            let mut reporter =
                ProgressReporter::new(on_progress).on_state(|state| self.lock().state = state);
            self.pipeline
                .analyze(transcript, case_summary, &mut usage, &mut reporter)
                .await
        };

        {
            let mut status = self.lock();
            status.usage += usage;
            if let Err(e) = &outcome {
                status.error = Some(e.to_string());
            }
        }
        drop(run);
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        lock(&self.status)
    }
}

fn lock(status: &Mutex<Status>) -> MutexGuard<'_, Status> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a session busy for the lifetime of one run.
///
/// Dropping it releases the session. If the run's future was dropped before a
/// terminal state, the session moves to error so the next call starts clean.
struct RunGuard<'a> {
    status: &'a Mutex<Status>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut status = lock(self.status);
        status.analyzing = false;
        if status.state.is_active() {
            warn!(state = %status.state, "Analysis abandoned before completion");
            status.state = AnalysisState::Error;
            status.error = Some(CANCELLED.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use oitiva_llm::testing::ScriptedTransport;
    use oitiva_llm::{Gateway, ProviderSettings};
    use serde_json::json;

    fn claude_body(text: &str) -> String {
        json!({
            "content": [{ "type": "text", "text": text }],
            "usage": { "input_tokens": 100, "output_tokens": 40 }
        })
        .to_string()
    }

    fn session(transport: ScriptedTransport) -> AnalysisSession<ScriptedTransport> {
        let settings = ProviderSettings::default().with_keys_from(|_| Some("test-key".to_string()));
        AnalysisSession::new(AnalysisPipeline::new(Gateway::with_transport(settings, transport)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_error_and_accumulates_usage() {
        let session = session(
            ScriptedTransport::new()
                .respond(200, claude_body("nada"))
                .respond(200, claude_body("{\"depoentes\": []}")),
        );

        assert!(session.analyze("transcrição", "", |_, _| {}).await.is_none());
        assert_eq!(session.state(), AnalysisState::Error);
        assert!(session.error().is_some_and(|e| e.contains("not valid JSON")));

        let result = session.analyze("transcrição", "", |_, _| {}).await;
        assert!(result.is_some());
        assert_eq!(session.state(), AnalysisState::Done);
        assert_eq!(session.error(), None);
        assert_eq!(session.usage().input, 200);
        assert!(!session.is_analyzing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_failure_sets_error_slot() {
        let session = session(ScriptedTransport::new());

        assert!(session.analyze("", "resumo", |_, _| {}).await.is_none());
        assert!(session.error().is_some_and(|e| e.contains("transcript is empty")));
        assert_eq!(session.pipeline().gateway().transport().request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_run_is_busy() {
        let session = session(
            ScriptedTransport::new()
                .respond(429, "slow down")
                .respond(200, claude_body("{}")),
        );

        let first = session.try_analyze("transcrição", "", |_, _| {});
        tokio::pin!(first);

        // Park the first run inside the gateway's backoff sleep
        tokio::select! {
            biased;
            _ = &mut first => panic!("first run finished before backoff"),
            _ = async {
                tokio::task::yield_now().await;
            } => {}
        }
        assert!(session.is_analyzing());
        assert_eq!(session.state(), AnalysisState::Sent);

        let second = session.try_analyze("outra", "", |_, _| {}).await;
        assert!(matches!(second, Err(AnalysisError::Busy)));

        assert!(first.await.is_ok());
        assert_eq!(session.state(), AnalysisState::Done);
        assert_eq!(session.pipeline().gateway().transport().request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_call_leaves_running_error_slot_alone() {
        let session = session(
            ScriptedTransport::new()
                .respond(503, "overloaded")
                .respond(200, claude_body("{}")),
        );

        let first = session.try_analyze("transcrição", "", |_, _| {});
        tokio::pin!(first);
        tokio::select! {
            biased;
            _ = &mut first => panic!("first run finished before backoff"),
            _ = tokio::task::yield_now() => {}
        }

        assert!(session.analyze("outra", "", |_, _| {}).await.is_none());
        assert_eq!(session.error(), None);
        assert_eq!(session.state(), AnalysisState::Sent);

        assert!(first.await.is_ok());
        assert_eq!(session.error(), None);
        assert_eq!(session.pipeline().gateway().transport().request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_run_releases_session() {
        let session = session(
            ScriptedTransport::new()
                .respond(503, "overloaded")
                .respond(200, claude_body("{}")),
        );

        // The first retry waits 3 s, so this drops the run mid-backoff
        let timed_out = tokio::time::timeout(
            Duration::from_secs(1),
            session.try_analyze("transcrição", "", |_, _| {}),
        )
        .await;
        assert!(timed_out.is_err());

        assert!(!session.is_analyzing());
        assert_eq!(session.state(), AnalysisState::Error);
        assert_eq!(session.error().as_deref(), Some(CANCELLED));

        let rerun = session.try_analyze("transcrição", "", |_, _| {}).await;
        assert!(rerun.is_ok());
        assert_eq!(session.state(), AnalysisState::Done);
        assert_eq!(session.error(), None);
        assert_eq!(session.usage().input, 100);
        assert_eq!(session.pipeline().gateway().transport().request_count(), 2);
    }
}
