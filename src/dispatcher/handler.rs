//! Listener capability set and stock handlers

use crate::error::DecodeError;
use crate::session::SessionState;
use crate::transcript::{OrderRegression, SpeakerSide, TranscriptMessage};
use anyhow::anyhow;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{info, warn};

/// Anomalies the dispatcher observed while handling content
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Content could not be decoded and was forwarded raw
    DecodeFailure(DecodeError),
    /// A chunk arrived for a finalized line and was ignored
    SealedWrite {
        side: SpeakerSide,
        message_id: String,
    },
    /// A chunk went backwards in `(round, seqId)` on its side; it was applied
    OutOfOrder {
        side: SpeakerSide,
        message_id: String,
        regression: OrderRegression,
    },
    /// A line that never received its final chunk was dropped to bound memory
    StreamingEvicted {
        side: SpeakerSide,
        message_id: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DecodeFailure(err) => write!(f, "undecodable content: {}", err),
            Diagnostic::SealedWrite { side, message_id } => {
                write!(f, "write to sealed {} message {}", side, message_id)
            }
            Diagnostic::OutOfOrder {
                side,
                message_id,
                regression,
            } => write!(
                f,
                "{} message {} out of order: {} after {}",
                side, message_id, regression.received, regression.previous
            ),
            Diagnostic::StreamingEvicted { side, message_id } => {
                write!(f, "dropped unfinished {} message {}", side, message_id)
            }
        }
    }
}

/// Callbacks a UI collaborator implements to follow the call
///
/// Every method defaults to a no-op so a handler only overrides what it
/// needs. Errors and panics are contained by the dispatcher and never reach
/// other handlers.
///
/// Callbacks run after the dispatcher lock is released, so when several
/// threads feed the same line, snapshots can arrive out of order (`"he"`
/// after `"hello"`). A handler that renders lines should keep the snapshot
/// with the greatest [`TranscriptMessage::order`] per message id.
pub trait SubtitlesEventHandler: Send + Sync {
    fn on_session_state_change(&self, _state: SessionState) -> anyhow::Result<()> {
        Ok(())
    }

    /// User speech line created or updated
    fn on_asr_message(&self, _message: &TranscriptMessage) -> anyhow::Result<()> {
        Ok(())
    }

    /// Agent reply line created or updated
    fn on_llm_message(&self, _message: &TranscriptMessage) -> anyhow::Result<()> {
        Ok(())
    }

    /// Content that did not decode, verbatim
    fn on_raw_content(&self, _content: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_diagnostic(&self, _diagnostic: &Diagnostic) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Callback, as a value
#[derive(Clone, Debug, PartialEq)]
pub enum SubtitlesEvent {
    SessionStateChanged(SessionState),
    AsrMessage(TranscriptMessage),
    LlmMessage(TranscriptMessage),
    RawContent(String),
    Diagnostic(Diagnostic),
}

/// Handler that queues events for a UI thread to poll
///
/// Sends never block: a full or disconnected queue fails the callback.
pub struct ChannelHandler {
    event_tx: Sender<SubtitlesEvent>,
}

impl ChannelHandler {
    /// Create a handler and the receiver that drains it
    pub fn new(capacity: usize) -> (Self, Receiver<SubtitlesEvent>) {
        let (event_tx, event_rx) = bounded(capacity);
        (Self { event_tx }, event_rx)
    }

    fn send(&self, event: SubtitlesEvent) -> anyhow::Result<()> {
        self.event_tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => anyhow!("event queue full"),
            TrySendError::Disconnected(_) => anyhow!("event receiver dropped"),
        })
    }
}

impl SubtitlesEventHandler for ChannelHandler {
    fn on_session_state_change(&self, state: SessionState) -> anyhow::Result<()> {
        self.send(SubtitlesEvent::SessionStateChanged(state))
    }

    fn on_asr_message(&self, message: &TranscriptMessage) -> anyhow::Result<()> {
        self.send(SubtitlesEvent::AsrMessage(message.clone()))
    }

    fn on_llm_message(&self, message: &TranscriptMessage) -> anyhow::Result<()> {
        self.send(SubtitlesEvent::LlmMessage(message.clone()))
    }

    fn on_raw_content(&self, content: &str) -> anyhow::Result<()> {
        self.send(SubtitlesEvent::RawContent(content.to_string()))
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) -> anyhow::Result<()> {
        self.send(SubtitlesEvent::Diagnostic(diagnostic.clone()))
    }
}

/// Handler that writes every event to the tracing log
#[derive(Debug, Default)]
pub struct LoggingHandler;

impl SubtitlesEventHandler for LoggingHandler {
    fn on_session_state_change(&self, state: SessionState) -> anyhow::Result<()> {
        info!("Session state: {}", state);
        Ok(())
    }

    fn on_asr_message(&self, message: &TranscriptMessage) -> anyhow::Result<()> {
        info!("ASR {}", message);
        Ok(())
    }

    fn on_llm_message(&self, message: &TranscriptMessage) -> anyhow::Result<()> {
        info!("LLM {}", message);
        Ok(())
    }

    fn on_raw_content(&self, content: &str) -> anyhow::Result<()> {
        info!("Raw content: {}", content);
        Ok(())
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) -> anyhow::Result<()> {
        warn!("Diagnostic: {}", diagnostic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChunkOrder;

    struct Silent;
    impl SubtitlesEventHandler for Silent {}

    #[test]
    fn test_default_methods_are_noops() {
        let handler = Silent;
        assert!(handler
            .on_session_state_change(SessionState::AgentSpeaking)
            .is_ok());
        assert!(handler.on_raw_content("{}").is_ok());
    }

    #[test]
    fn test_channel_handler_forwards() {
        let (handler, rx) = ChannelHandler::new(4);
        handler
            .on_session_state_change(SessionState::AgentThinking)
            .unwrap();
        handler.on_raw_content("hello").unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SubtitlesEvent::SessionStateChanged(SessionState::AgentThinking)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SubtitlesEvent::RawContent("hello".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_handler_full_queue_fails() {
        let (handler, _rx) = ChannelHandler::new(1);
        handler.on_raw_content("a").unwrap();
        let err = handler.on_raw_content("b").unwrap_err();
        assert_eq!(err.to_string(), "event queue full");
    }

    #[test]
    fn test_channel_handler_disconnected_fails() {
        let (handler, rx) = ChannelHandler::new(1);
        drop(rx);
        assert!(handler.on_raw_content("a").is_err());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::OutOfOrder {
            side: SpeakerSide::Agent,
            message_id: "r1".to_string(),
            regression: OrderRegression {
                previous: ChunkOrder::new(1, 5),
                received: ChunkOrder::new(1, 2),
            },
        };
        assert_eq!(
            diag.to_string(),
            "agent message r1 out of order: (round 1, seq 2) after (round 1, seq 5)"
        );
    }
}
