//! Transcript line types
//!
//! A [`TranscriptMessage`] is the snapshot handlers receive for one user or
//! agent line.

use serde::{Deserialize, Serialize};

/// Which track a transcript line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpeakerSide {
    /// Local user, recognized by ASR
    User,
    /// AI agent, produced by the LLM
    Agent,
}

impl SpeakerSide {
    pub fn is_user(&self) -> bool {
        matches!(self, SpeakerSide::User)
    }
}

impl std::fmt::Display for SpeakerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeakerSide::User => write!(f, "user"),
            SpeakerSide::Agent => write!(f, "agent"),
        }
    }
}

/// Position of a chunk in the conversation: `round` first, then `seq_id`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkOrder {
    pub round: i64,
    pub seq_id: i64,
}

impl ChunkOrder {
    pub fn new(round: i64, seq_id: i64) -> Self {
        Self { round, seq_id }
    }
}

impl std::fmt::Display for ChunkOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(round {}, seq {})", self.round, self.seq_id)
    }
}

/// Rectangle owned by the UI; stored, never computed here
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One logical line of transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Sequence id of the latest applied chunk
    pub seq_id: i64,
    /// Round of the latest applied chunk
    pub round: i64,
    /// True for the local user's recognized speech
    pub is_mine: bool,
    pub content: String,
    /// Envelope timestamp of the first chunk
    pub timestamp_ms: i64,
    /// Time between the first and the latest chunk
    pub elapsed_ms: i64,
    pub message_id: String,
    pub end_flag: bool,
    pub layout_bounds: LayoutBounds,
}

impl TranscriptMessage {
    pub fn new(side: SpeakerSide, message_id: impl Into<String>) -> Self {
        Self {
            seq_id: 0,
            round: 0,
            is_mine: side.is_user(),
            content: String::new(),
            timestamp_ms: 0,
            elapsed_ms: 0,
            message_id: message_id.into(),
            end_flag: false,
            layout_bounds: LayoutBounds::default(),
        }
    }

    pub fn side(&self) -> SpeakerSide {
        if self.is_mine {
            SpeakerSide::User
        } else {
            SpeakerSide::Agent
        }
    }

    pub fn order(&self) -> ChunkOrder {
        ChunkOrder::new(self.round, self.seq_id)
    }
}

impl std::fmt::Display for TranscriptMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} {}{}] {}",
            self.side(),
            self.message_id,
            self.order(),
            if self.end_flag { " final" } else { "" },
            self.content
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_side() {
        let mine = TranscriptMessage::new(SpeakerSide::User, "m1");
        assert!(mine.is_mine);
        assert_eq!(mine.side(), SpeakerSide::User);

        let agent = TranscriptMessage::new(SpeakerSide::Agent, "r1");
        assert!(!agent.is_mine);
        assert_eq!(agent.side(), SpeakerSide::Agent);
        assert!(agent.content.is_empty());
    }

    #[test]
    fn test_chunk_order_round_first() {
        assert!(ChunkOrder::new(1, 50) < ChunkOrder::new(2, 1));
        assert!(ChunkOrder::new(2, 1) < ChunkOrder::new(2, 2));
        assert_eq!(ChunkOrder::new(3, 3), ChunkOrder::new(3, 3));
    }

    #[test]
    fn test_display() {
        let mut msg = TranscriptMessage::new(SpeakerSide::Agent, "r1");
        msg.content = "hello".to_string();
        msg.round = 1;
        msg.seq_id = 4;
        msg.end_flag = true;
        assert_eq!(msg.to_string(), "[agent r1 (round 1, seq 4) final] hello");
    }
}
