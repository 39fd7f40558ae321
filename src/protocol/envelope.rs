//! Envelope decoding and encoding
//!
//! Decoding runs in two stages: [`RawEnvelope::from_map`] validates the routing
//! metadata, then [`RawEnvelope::into_command`] decodes `data` for the command.
//! Field names are canonical camelCase; the snake_case / short names seen in
//! older layers are accepted as aliases, and the canonical name wins when both
//! are present. Encoding always emits canonical names.

use super::command::{
    CommandPayload, CommandType, DecodedCommand, SpeakStatus, SpeakStatusPayload, TextPayload,
};
use crate::error::DecodeError;
use serde_json::{Map, Value};

type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// A wire field: canonical name plus an optional legacy alias
#[derive(Clone, Copy)]
struct Field {
    name: &'static str,
    alias: Option<&'static str>,
}

const TIMESTAMP: Field = Field { name: "timestamp", alias: None };
const SEQ_ID: Field = Field { name: "seqId", alias: Some("seq_id") };
const ROUND: Field = Field { name: "round", alias: None };
const CMD_TYPE: Field = Field { name: "cmdType", alias: Some("cmd") };
const DATA: Field = Field { name: "data", alias: None };

const SPEAK_STATUS: Field = Field { name: "speakStatus", alias: Some("speak_status") };
const TEXT: Field = Field { name: "text", alias: None };
const MESSAGE_ID: Field = Field { name: "messageId", alias: Some("message_id") };
const END_FLAG: Field = Field { name: "endFlag", alias: Some("end_flag") };

const ENVELOPE_FIELDS: &[Field] = &[TIMESTAMP, SEQ_ID, ROUND, CMD_TYPE, DATA];
const STATUS_FIELDS: &[Field] = &[SPEAK_STATUS];
const TEXT_FIELDS: &[Field] = &[TEXT, MESSAGE_ID, END_FLAG];

/// Decoder behavior switches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail on keys the decoder does not recognize
    pub reject_unknown_fields: bool,
    /// Fail when `timestamp`, `seqId` or `round` is absent instead of reading 0
    pub require_metadata: bool,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            reject_unknown_fields: true,
            require_metadata: true,
        }
    }
}

/// Envelope with validated routing metadata and still-undecoded `data`
#[derive(Clone, Debug, PartialEq)]
pub struct RawEnvelope {
    pub timestamp: i64,
    pub seq_id: i64,
    pub round: i64,
    pub cmd_type: CommandType,
    pub data: Map<String, Value>,
}

impl RawEnvelope {
    /// Validate the envelope fields of a JSON object
    pub fn from_map(raw: &Map<String, Value>, options: &DecodeOptions) -> DecodeResult<Self> {
        if options.reject_unknown_fields {
            check_known(raw, ENVELOPE_FIELDS)?;
        }

        let timestamp = metadata_i64(raw, TIMESTAMP, options)?;
        let seq_id = metadata_i64(raw, SEQ_ID, options)?;
        let round = metadata_i64(raw, ROUND, options)?;

        let code = require_i64(raw, CMD_TYPE)?;
        let cmd_type = CommandType::from_code(code).ok_or(DecodeError::UnknownCommand(code))?;

        let data = match require(raw, DATA)? {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(DecodeError::InvalidType {
                    field: DATA.name,
                    expected: "object",
                })
            }
        };

        Ok(Self {
            timestamp,
            seq_id,
            round,
            cmd_type,
            data,
        })
    }

    /// Decode `data` according to `cmd_type`
    pub fn into_command(self, options: &DecodeOptions) -> DecodeResult<DecodedCommand> {
        let payload = match self.cmd_type {
            CommandType::UserSpeakStatus => {
                CommandPayload::UserSpeakStatus(decode_speak_status(&self.data, options)?)
            }
            CommandType::AgentSpeakStatus => {
                CommandPayload::AgentSpeakStatus(decode_speak_status(&self.data, options)?)
            }
            CommandType::AsrText => CommandPayload::AsrText(decode_text(&self.data, options)?),
            CommandType::LlmText => CommandPayload::LlmText(decode_text(&self.data, options)?),
        };

        Ok(DecodedCommand::new(
            self.timestamp,
            self.seq_id,
            self.round,
            payload,
        ))
    }
}

/// Decode a JSON object into a typed command with default options
pub fn decode(raw: &Map<String, Value>) -> DecodeResult<DecodedCommand> {
    decode_with(raw, &DecodeOptions::default())
}

/// Decode a JSON object into a typed command
pub fn decode_with(
    raw: &Map<String, Value>,
    options: &DecodeOptions,
) -> DecodeResult<DecodedCommand> {
    RawEnvelope::from_map(raw, options)?.into_command(options)
}

/// Parse a JSON string into an object map
pub fn parse_object(content: &str) -> DecodeResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DecodeError::MalformedJson(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(DecodeError::MalformedJson(e.to_string())),
    }
}

/// Parse and decode a JSON string in one step
pub fn parse_content(content: &str, options: &DecodeOptions) -> DecodeResult<DecodedCommand> {
    decode_with(&parse_object(content)?, options)
}

impl DecodedCommand {
    /// Encode back into the canonical wire object
    pub fn to_map(&self) -> Map<String, Value> {
        // Payloads hold only strings, integers and bools, so serialization cannot fail.
        let data = match &self.payload {
            CommandPayload::UserSpeakStatus(p) | CommandPayload::AgentSpeakStatus(p) => {
                serde_json::to_value(p)
            }
            CommandPayload::AsrText(p) | CommandPayload::LlmText(p) => serde_json::to_value(p),
        }
        .unwrap_or_else(|_| Value::Object(Map::new()));

        let mut map = Map::new();
        map.insert(TIMESTAMP.name.to_string(), Value::from(self.timestamp));
        map.insert(SEQ_ID.name.to_string(), Value::from(self.seq_id));
        map.insert(ROUND.name.to_string(), Value::from(self.round));
        map.insert(
            CMD_TYPE.name.to_string(),
            Value::from(self.command_type().code()),
        );
        map.insert(DATA.name.to_string(), data);
        map
    }

    /// Encode as a JSON string
    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

fn decode_speak_status(
    data: &Map<String, Value>,
    options: &DecodeOptions,
) -> DecodeResult<SpeakStatusPayload> {
    if options.reject_unknown_fields {
        check_known(data, STATUS_FIELDS)?;
    }

    let code = require_i64(data, SPEAK_STATUS)?;
    let speak_status = SpeakStatus::from_code(code).ok_or(DecodeError::InvalidEnum {
        field: SPEAK_STATUS.name,
        value: code,
    })?;

    Ok(SpeakStatusPayload { speak_status })
}

fn decode_text(data: &Map<String, Value>, options: &DecodeOptions) -> DecodeResult<TextPayload> {
    if options.reject_unknown_fields {
        check_known(data, TEXT_FIELDS)?;
    }

    let text = require_string(data, TEXT)?;
    let message_id = require_string(data, MESSAGE_ID)?;
    let end_flag = match lookup(data, END_FLAG) {
        Some(value) => coerce_bool(END_FLAG, value)?,
        None => false,
    };

    Ok(TextPayload {
        text,
        message_id,
        end_flag,
    })
}

/// Find a field by canonical name, then alias. `null` counts as absent.
fn lookup<'a>(map: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
    let found = map
        .get(field.name)
        .filter(|v| !v.is_null())
        .or_else(|| field.alias.and_then(|alias| map.get(alias)));
    found.filter(|v| !v.is_null())
}

fn require<'a>(map: &'a Map<String, Value>, field: Field) -> DecodeResult<&'a Value> {
    lookup(map, field).ok_or(DecodeError::MissingField(field.name))
}

fn require_i64(map: &Map<String, Value>, field: Field) -> DecodeResult<i64> {
    coerce_i64(field, require(map, field)?)
}

/// Routing metadata: absent reads as 0 unless the options require it
fn metadata_i64(
    map: &Map<String, Value>,
    field: Field,
    options: &DecodeOptions,
) -> DecodeResult<i64> {
    match lookup(map, field) {
        Some(value) => coerce_i64(field, value),
        None if options.require_metadata => Err(DecodeError::MissingField(field.name)),
        None => Ok(0),
    }
}

fn require_string(map: &Map<String, Value>, field: Field) -> DecodeResult<String> {
    match require(map, field)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(DecodeError::InvalidType {
            field: field.name,
            expected: "string",
        }),
    }
}

/// Accept integers, integral floats and numeric strings
fn coerce_i64(field: Field, value: &Value) -> DecodeResult<i64> {
    let invalid = DecodeError::InvalidType {
        field: field.name,
        expected: "integer",
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            // Unsigned beyond i64::MAX
            if n.is_u64() {
                return Err(invalid);
            }
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(invalid),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid),
        _ => Err(invalid),
    }
}

fn coerce_bool(field: Field, value: &Value) -> DecodeResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(DecodeError::InvalidType {
                field: field.name,
                expected: "boolean",
            }),
        },
        _ => Err(DecodeError::InvalidType {
            field: field.name,
            expected: "boolean",
        }),
    }
}

fn check_known(map: &Map<String, Value>, fields: &[Field]) -> DecodeResult<()> {
    for key in map.keys() {
        let known = fields
            .iter()
            .any(|f| f.name == key || f.alias == Some(key.as_str()));
        if !known {
            return Err(DecodeError::UnknownField(key.clone()));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
