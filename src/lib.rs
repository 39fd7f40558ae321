//! Subtitles - streaming ASR/LLM subtitles for real-time AI voice-agent calls
//!
//! This crate decodes the JSON events an agent call delivers over the RTC
//! SDK's content channel and fans them out to UI handlers: session state
//! changes, user speech lines (ASR), agent reply lines (LLM), and raw content
//! that did not decode.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transcript;

// Re-export error types
pub use error::{DecodeError, Result, SubtitlesError};

pub use config::SubtitlesConfig;
pub use dispatcher::{
    ChannelHandler, Diagnostic, DispatchOutcome, DispatchReport, ListenerId, LoggingHandler,
    MessageDispatcher, SubtitlesEvent, SubtitlesEventHandler,
};
pub use protocol::{
    decode, CommandPayload, CommandType, DecodedCommand, SpeakStatus, SpeakStatusPayload,
    TextPayload,
};
pub use session::SessionState;
pub use transcript::{AccumulatorState, MergeMode, SpeakerSide, TranscriptMessage};
