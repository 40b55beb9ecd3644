//! Analysis lifecycle

use std::fmt;

use serde::Serialize;

/// Where one analysis run currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    #[default]
    Idle,
    /// Validating input and assembling the prompt
    Preparing,
    /// Waiting on the provider
    Sent,
    /// Extracting and normalizing the response
    Processing,
    Done,
    Error,
}

impl AnalysisState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisState::Idle => "idle",
            AnalysisState::Preparing => "preparing",
            AnalysisState::Sent => "sent",
            AnalysisState::Processing => "processing",
            AnalysisState::Done => "done",
            AnalysisState::Error => "error",
        }
    }

    /// Done and Error end a run; only a new run leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisState::Done | AnalysisState::Error)
    }

    /// True while a run is between Preparing and its terminal state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AnalysisState::Preparing | AnalysisState::Sent | AnalysisState::Processing
        )
    }

    pub fn can_transition_to(&self, next: AnalysisState) -> bool {
        use AnalysisState::*;

        match (self, next) {
            (Idle | Done | Error, Preparing) => true,
            (Preparing, Sent) | (Sent, Processing) | (Processing, Done) => true,
            (Preparing | Sent | Processing, Error) => true,
            _ => false,
        }
    }

    /// Progress value announced on entering this state
    pub fn checkpoint(&self) -> Option<u8> {
        match self {
            AnalysisState::Preparing => Some(5),
            AnalysisState::Sent => Some(10),
            AnalysisState::Processing => Some(95),
            AnalysisState::Done => Some(100),
            AnalysisState::Idle | AnalysisState::Error => None,
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
