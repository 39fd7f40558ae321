//! Conversational session state
//!
//! The coarse phase of the call as seen by the agent, derived only from
//! speak-status events:
//! - user starts talking → the agent listens
//! - user stops talking → the agent thinks (LLM inference)
//! - agent starts talking → the agent speaks
//! - agent stops talking → the agent listens again

use crate::protocol::SpeakStatus;
use crate::transcript::SpeakerSide;

/// Session phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No speak-status event received yet
    #[default]
    Uninitialized,
    /// Agent audio is playing
    AgentSpeaking,
    /// User finished, agent is generating a reply
    AgentThinking,
    /// Agent is listening to the user
    UserListening,
}

impl SessionState {
    /// Compute the state that follows a speak-status event
    ///
    /// The result depends only on the event, not on the current state.
    pub fn next(side: SpeakerSide, status: SpeakStatus) -> Self {
        match (side, status) {
            (SpeakerSide::User, SpeakStatus::Start) => SessionState::UserListening,
            (SpeakerSide::User, SpeakStatus::End) => SessionState::AgentThinking,
            (SpeakerSide::Agent, SpeakStatus::Start) => SessionState::AgentSpeaking,
            (SpeakerSide::Agent, SpeakStatus::End) => SessionState::UserListening,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }

    /// Check if the agent is talking
    pub fn is_speaking(&self) -> bool {
        matches!(self, SessionState::AgentSpeaking)
    }

    /// Check if the agent is generating a reply
    pub fn is_thinking(&self) -> bool {
        matches!(self, SessionState::AgentThinking)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, SessionState::UserListening)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "Uninitialized"),
            SessionState::AgentSpeaking => write!(f, "AgentSpeaking"),
            SessionState::AgentThinking => write!(f, "AgentThinking"),
            SessionState::UserListening => write!(f, "UserListening"),
        }
    }
}
