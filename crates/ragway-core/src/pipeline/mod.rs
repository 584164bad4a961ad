//! Chat pipeline orchestration.
//!
//! [`ChatPipeline::prepare`] runs quota, model resolution, budgeting,
//! retrieval and stream opening; [`PreparedCompletion::into_body_stream`]
//! relays the generated text and settles usage through a [`StreamSession`].

mod orchestrator;
mod session;
mod span;

pub use orchestrator::{BodyStream, ChatPipeline, PipelineSettings, PreparedCompletion};
pub use session::{SessionOutcome, StreamSession};
pub use span::StreamInSpan;
