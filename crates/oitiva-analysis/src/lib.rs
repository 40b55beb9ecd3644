//! Structured testimony analysis for oitiva
//!
//! Builds the analysis prompt, makes one gateway call, and turns the model's
//! answer into a schema-complete [`AnalysisResult`] while reporting progress.

pub mod error;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod state;

pub use error::AnalysisError;
pub use extract::extract_json;
pub use normalize::{normalize, parse_response};
pub use oitiva_core::AnalysisResult;
pub use pipeline::{AnalysisPipeline, DEFAULT_TICK_INTERVAL};
pub use progress::{phase_for, AnalysisPhase, ProgressMessage, ProgressReporter, PHASES};
pub use session::AnalysisSession;
pub use state::AnalysisState;
