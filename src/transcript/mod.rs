//! Transcript message model and accumulation
//!
//! Each ASR (user) or LLM (agent) line is built from text chunks sharing a
//! message id. The [`TranscriptTable`] owns the in-flight [`Accumulator`]s.

mod accumulator;
mod model;
mod table;

pub use accumulator::{Accumulator, AccumulatorState, MergeMode};
pub use model::{ChunkOrder, LayoutBounds, SpeakerSide, TranscriptMessage};
pub use table::{AppliedChunk, OrderRegression, TableOptions, TranscriptTable};
