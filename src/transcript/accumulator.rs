//! Per-message accumulation state machine
//!
//! `Empty → Streaming → Final`. A chunk with `end_flag` seals the line; any
//! later chunk is rejected with [`SubtitlesError::SealedAccumulatorWrite`]
//! and leaves the content untouched.

use super::model::{ChunkOrder, LayoutBounds, SpeakerSide, TranscriptMessage};
use crate::error::{Result, SubtitlesError};
use crate::protocol::TextPayload;
use serde::Deserialize;

/// Lifecycle of one transcript line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccumulatorState {
    /// No chunk applied yet
    #[default]
    Empty,
    /// At least one partial chunk applied
    Streaming,
    /// End flag received; content is sealed
    Final,
}

impl AccumulatorState {
    pub fn is_final(&self) -> bool {
        matches!(self, AccumulatorState::Final)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, AccumulatorState::Streaming)
    }
}

impl std::fmt::Display for AccumulatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccumulatorState::Empty => write!(f, "Empty"),
            AccumulatorState::Streaming => write!(f, "Streaming"),
            AccumulatorState::Final => write!(f, "Final"),
        }
    }
}

/// How a chunk's text combines with the content so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Chunks are deltas; concatenate in arrival order
    #[default]
    Append,
    /// Chunks are full snapshots of the line so far
    Replace,
}

/// In-flight transcript line
#[derive(Clone, Debug)]
pub struct Accumulator {
    state: AccumulatorState,
    merge: MergeMode,
    first_order: Option<ChunkOrder>,
    message: TranscriptMessage,
}

impl Accumulator {
    pub fn new(side: SpeakerSide, message_id: impl Into<String>, merge: MergeMode) -> Self {
        Self {
            state: AccumulatorState::Empty,
            merge,
            first_order: None,
            message: TranscriptMessage::new(side, message_id),
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn message(&self) -> &TranscriptMessage {
        &self.message
    }

    pub fn side(&self) -> SpeakerSide {
        self.message.side()
    }

    /// Order of the chunk that opened the line
    pub fn first_order(&self) -> Option<ChunkOrder> {
        self.first_order
    }

    /// Apply one chunk and return the updated line
    pub fn apply(
        &mut self,
        timestamp: i64,
        order: ChunkOrder,
        payload: &TextPayload,
    ) -> Result<&TranscriptMessage> {
        if self.state.is_final() {
            return Err(SubtitlesError::SealedAccumulatorWrite {
                message_id: self.message.message_id.clone(),
            });
        }

        let msg = &mut self.message;
        match (self.state, self.merge) {
            (AccumulatorState::Empty, _) | (_, MergeMode::Replace) => {
                msg.content.clear();
                msg.content.push_str(&payload.text);
            }
            (_, MergeMode::Append) => msg.content.push_str(&payload.text),
        }

        if self.first_order.is_none() {
            self.first_order = Some(order);
            msg.timestamp_ms = timestamp;
        }
        msg.elapsed_ms = (timestamp - msg.timestamp_ms).max(0);
        msg.round = order.round;
        msg.seq_id = order.seq_id;
        msg.end_flag = payload.end_flag;

        self.state = if payload.end_flag {
            AccumulatorState::Final
        } else {
            AccumulatorState::Streaming
        };

        Ok(&self.message)
    }

    /// Store UI-computed bounds on the line
    pub fn set_layout_bounds(&mut self, bounds: LayoutBounds) {
        self.message.layout_bounds = bounds;
    }
}
