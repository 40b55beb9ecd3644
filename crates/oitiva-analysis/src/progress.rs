//! Progress reporting for a running analysis
//!
//! The provider call is not streamed, so progress is a UX approximation: a
//! static table of checkpoints walked through on a timer while the request is
//! outstanding. Nothing here is derived from token counts.

use tracing::{debug, warn};

use crate::state::AnalysisState;

/// A contiguous slice of the 0-100 progress range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisPhase {
    pub id: &'static str,
    pub start: u8,
    pub end: u8,
}

/// Message shown when progress reaches a given value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressMessage {
    pub phase: &'static str,
    pub progress: u8,
    pub message: &'static str,
}

pub const PHASES: [AnalysisPhase; 3] = [
    AnalysisPhase { id: "extraction", start: 0, end: 35 },
    AnalysisPhase { id: "classification", start: 35, end: 70 },
    AnalysisPhase { id: "evaluation", start: 70, end: 100 },
];

const fn message(phase: &'static str, progress: u8, message: &'static str) -> ProgressMessage {
    ProgressMessage { phase, progress, message }
}

/// Ascending by progress
pub const MESSAGES: [ProgressMessage; 12] = [
    message("extraction", 5, "Preparando transcrição..."),
    message("extraction", 10, "Enviando para análise..."),
    message("extraction", 15, "Identificando depoentes..."),
    message("extraction", 25, "Extraindo declarações..."),
    message("classification", 40, "Agrupando declarações por tema..."),
    message("classification", 50, "Elaborando sínteses..."),
    message("classification", 60, "Analisando posições das partes..."),
    message("evaluation", 72, "Detectando contradições..."),
    message("evaluation", 80, "Identificando confissões..."),
    message("evaluation", 88, "Avaliando credibilidade..."),
    message("evaluation", 95, "Validando resultado..."),
    message("evaluation", 100, "Análise concluída"),
];

/// Highest value the wait timer may reach before the response arrives
pub const TICK_CEILING: u8 = 88;

/// Phase owning a progress value. 100 belongs to the last phase.
pub fn phase_for(progress: u8) -> Option<&'static AnalysisPhase> {
    PHASES
        .iter()
        .find(|phase| progress >= phase.start && progress < phase.end)
        .or_else(|| PHASES.last().filter(|phase| progress == phase.end))
}

/// Message registered for exactly this progress value
pub fn message_for(progress: u8) -> Option<&'static str> {
    MESSAGES
        .iter()
        .find(|m| m.progress == progress)
        .map(|m| m.message)
}

/// First table entry strictly after `progress`
pub fn next_after(progress: u8) -> Option<&'static ProgressMessage> {
    MESSAGES.iter().find(|m| m.progress > progress)
}

/// Progress sink called with `(percent, message)`
pub type ProgressCallback<'a> = Box<dyn FnMut(u8, &str) + Send + 'a>;

/// State sink called on every accepted transition
pub type StateCallback<'a> = Box<dyn FnMut(AnalysisState) + Send + 'a>;

/// Drives the state machine for one run and forwards progress to the caller.
///
/// Emitted values strictly increase; anything at or below the last value is
/// dropped.
pub struct ProgressReporter<'a> {
    on_progress: ProgressCallback<'a>,
    on_state: Option<StateCallback<'a>>,
    state: AnalysisState,
    last: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(on_progress: impl FnMut(u8, &str) + Send + 'a) -> Self {
        Self {
            on_progress: Box::new(on_progress),
            on_state: None,
            state: AnalysisState::Idle,
            last: None,
        }
    }

    /// Reporter that only tracks state
    pub fn silent() -> Self {
        Self::new(|_, _| {})
    }

    pub fn on_state(mut self, on_state: impl FnMut(AnalysisState) + Send + 'a) -> Self {
        self.on_state = Some(Box::new(on_state));
        self
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn last_progress(&self) -> Option<u8> {
        self.last
    }

    /// Move to `next` and emit its checkpoint.
    ///
    /// Returns false, leaving everything unchanged, for a transition the
    /// lifecycle does not allow.
    pub fn enter(&mut self, next: AnalysisState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "Ignoring invalid analysis state transition");
            return false;
        }

        debug!(from = %self.state, to = %next, "Analysis state changed");
        if next == AnalysisState::Preparing {
            self.last = None;
        }
        self.state = next;
        if let Some(on_state) = self.on_state.as_mut() {
            on_state(next);
        }
        if let Some(progress) = next.checkpoint() {
            self.emit(progress);
        }
        true
    }

    /// Step to the next table message while waiting, up to [`TICK_CEILING`]
    pub fn advance(&mut self) -> bool {
        match next_after(self.last.unwrap_or(0)) {
            Some(next) if next.progress <= TICK_CEILING => self.emit(next.progress),
            _ => false,
        }
    }

    fn emit(&mut self, progress: u8) -> bool {
        if self.last.is_some_and(|last| progress <= last) {
            return false;
        }
        self.last = Some(progress);
        (self.on_progress)(progress, message_for(progress).unwrap_or_default());
        true
    }
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &self.state)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
