//! Typed protocol commands
//!
//! Wire codes follow the agent service: commands 1..=4, speak status 1..=2.

use serde::{Serialize, Serializer};

/// Command carried in the envelope's `cmdType` field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandType {
    UserSpeakStatus = 1,
    AgentSpeakStatus = 2,
    AsrText = 3,
    LlmText = 4,
}

impl CommandType {
    /// Map a wire code to a command, `None` if the code is unknown
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(CommandType::UserSpeakStatus),
            2 => Some(CommandType::AgentSpeakStatus),
            3 => Some(CommandType::AsrText),
            4 => Some(CommandType::LlmText),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Check if the command carries a speak status
    pub fn is_status(self) -> bool {
        matches!(
            self,
            CommandType::UserSpeakStatus | CommandType::AgentSpeakStatus
        )
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandType::UserSpeakStatus => write!(f, "UserSpeakStatus"),
            CommandType::AgentSpeakStatus => write!(f, "AgentSpeakStatus"),
            CommandType::AsrText => write!(f, "AsrText"),
            CommandType::LlmText => write!(f, "LlmText"),
        }
    }
}

impl Serialize for CommandType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

/// Whether a speaker started or stopped talking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpeakStatus {
    Start = 1,
    End = 2,
}

impl SpeakStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SpeakStatus::Start),
            2 => Some(SpeakStatus::End),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

impl Serialize for SpeakStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

/// Payload of user/agent speak-status commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakStatusPayload {
    pub speak_status: SpeakStatus,
}

/// Payload shared by ASR and LLM text commands
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    /// Text chunk carried by this event
    pub text: String,
    /// Identifies the transcript line the chunk belongs to
    pub message_id: String,
    /// Marks the last chunk of the line
    pub end_flag: bool,
}

impl TextPayload {
    pub fn new(text: impl Into<String>, message_id: impl Into<String>, end_flag: bool) -> Self {
        Self {
            text: text.into(),
            message_id: message_id.into(),
            end_flag,
        }
    }
}

/// Typed payload, tagged by command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandPayload {
    UserSpeakStatus(SpeakStatusPayload),
    AgentSpeakStatus(SpeakStatusPayload),
    AsrText(TextPayload),
    LlmText(TextPayload),
}

impl CommandPayload {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandPayload::UserSpeakStatus(_) => CommandType::UserSpeakStatus,
            CommandPayload::AgentSpeakStatus(_) => CommandType::AgentSpeakStatus,
            CommandPayload::AsrText(_) => CommandType::AsrText,
            CommandPayload::LlmText(_) => CommandType::LlmText,
        }
    }
}

/// A fully decoded envelope: routing metadata plus typed payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCommand {
    pub timestamp: i64,
    pub seq_id: i64,
    pub round: i64,
    pub payload: CommandPayload,
}

impl DecodedCommand {
    pub fn new(timestamp: i64, seq_id: i64, round: i64, payload: CommandPayload) -> Self {
        Self {
            timestamp,
            seq_id,
            round,
            payload,
        }
    }

    pub fn command_type(&self) -> CommandType {
        self.payload.command_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        for code in 1..=4 {
            let cmd = CommandType::from_code(code).unwrap();
            assert_eq!(cmd.code(), code);
        }
        assert_eq!(CommandType::from_code(0), None);
        assert_eq!(CommandType::from_code(99), None);
    }

    #[test]
    fn test_status_commands() {
        assert!(CommandType::UserSpeakStatus.is_status());
        assert!(CommandType::AgentSpeakStatus.is_status());
        assert!(!CommandType::AsrText.is_status());
        assert!(!CommandType::LlmText.is_status());
    }

    #[test]
    fn test_speak_status_codes() {
        assert_eq!(SpeakStatus::from_code(1), Some(SpeakStatus::Start));
        assert_eq!(SpeakStatus::from_code(2), Some(SpeakStatus::End));
        assert_eq!(SpeakStatus::from_code(3), None);
    }

    #[test]
    fn test_text_payload_serializes_camel_case() {
        let payload = TextPayload::new("hi", "m1", true);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"text":"hi","messageId":"m1","endFlag":true}"#);
    }

    #[test]
    fn test_speak_status_serializes_as_code() {
        let payload = SpeakStatusPayload {
            speak_status: SpeakStatus::End,
        };
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"speakStatus":2}"#);
    }
}
