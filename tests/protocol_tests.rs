//! Wire-level decoding tests against captured envelope shapes

use serde_json::{json, Map, Value};
use subtitles::protocol::{decode_with, parse_content, parse_object, DecodeOptions};
use subtitles::{
    decode, CommandPayload, CommandType, DecodeError, DecodedCommand, SpeakStatus,
    SpeakStatusPayload, TextPayload,
};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

#[test]
fn test_all_commands_decode_to_tagged_variants() {
    let cases = vec![
        (1, json!({"speakStatus": 1}), CommandType::UserSpeakStatus),
        (2, json!({"speakStatus": 2}), CommandType::AgentSpeakStatus),
        (3, json!({"text": "hi", "messageId": "m1", "endFlag": false}), CommandType::AsrText),
        (4, json!({"text": "yo", "messageId": "r1", "endFlag": true}), CommandType::LlmText),
    ];

    for (code, data, expected) in cases {
        let raw = object(json!({
            "timestamp": 1_717_000_000_123i64,
            "seqId": 11,
            "round": 3,
            "cmdType": code,
            "data": data,
        }));
        let cmd = decode(&raw).unwrap();
        assert_eq!(cmd.command_type(), expected);
        assert_eq!(cmd.timestamp, 1_717_000_000_123);
        assert_eq!(cmd.seq_id, 11);
        assert_eq!(cmd.round, 3);
    }
}

#[test]
fn test_captured_asr_envelope() {
    let content = r#"{
        "timestamp": 1717000000500,
        "seq_id": 42,
        "round": 5,
        "cmd": 3,
        "data": {"text": "what's the weather", "message_id": "asr-5-1", "end_flag": false}
    }"#;

    let cmd = parse_content(content, &DecodeOptions::default()).unwrap();
    assert_eq!(cmd.seq_id, 42);
    assert_eq!(
        cmd.payload,
        CommandPayload::AsrText(TextPayload::new("what's the weather", "asr-5-1", false))
    );
}

#[test]
fn test_missing_text_for_asr() {
    let raw = object(json!({
        "timestamp": 1, "seqId": 1, "round": 1, "cmdType": 3,
        "data": {"messageId": "m1", "endFlag": false},
    }));
    assert_eq!(decode(&raw), Err(DecodeError::MissingField("text")));
}

#[test]
fn test_unknown_command_99() {
    let raw = object(json!({
        "timestamp": 1, "seqId": 1, "round": 1, "cmdType": 99, "data": {},
    }));
    assert_eq!(decode(&raw), Err(DecodeError::UnknownCommand(99)));
}

#[test]
fn test_out_of_range_speak_status() {
    let raw = object(json!({
        "timestamp": 1, "seqId": 1, "round": 1, "cmdType": 2,
        "data": {"speakStatus": 0},
    }));
    assert_eq!(
        decode(&raw),
        Err(DecodeError::InvalidEnum {
            field: "speakStatus",
            value: 0
        })
    );
}

#[test]
fn test_text_must_be_string() {
    let raw = object(json!({
        "timestamp": 1, "seqId": 1, "round": 1, "cmdType": 4,
        "data": {"text": 12, "messageId": "r1"},
    }));
    assert_eq!(
        decode(&raw),
        Err(DecodeError::InvalidType {
            field: "text",
            expected: "string"
        })
    );
}

#[test]
fn test_malformed_content() {
    let opts = DecodeOptions::default();
    assert!(matches!(
        parse_content("{\"cmdType\": 3,", &opts),
        Err(DecodeError::MalformedJson(_))
    ));
    assert!(matches!(
        parse_content("\"just a string\"", &opts),
        Err(DecodeError::MalformedJson(_))
    ));
}

#[test]
fn test_strict_decoding_accepts_canonical_and_aliases() {
    let raw = parse_object(
        r#"{"timestamp":1,"seq_id":2,"round":3,"cmd":1,"data":{"speak_status":1}}"#,
    )
    .unwrap();
    let cmd = decode_with(&raw, &DecodeOptions::strict()).unwrap();
    assert_eq!(
        cmd.payload,
        CommandPayload::UserSpeakStatus(SpeakStatusPayload {
            speak_status: SpeakStatus::Start
        })
    );
}

#[test]
fn test_encode_then_decode_is_identity() {
    let values = vec![
        DecodedCommand::new(
            0,
            0,
            0,
            CommandPayload::AgentSpeakStatus(SpeakStatusPayload {
                speak_status: SpeakStatus::Start,
            }),
        ),
        DecodedCommand::new(
            1_717_000_000_000,
            99,
            12,
            CommandPayload::LlmText(TextPayload::new("line one\nline two", "r-12", true)),
        ),
        DecodedCommand::new(
            i64::MIN,
            -1,
            i64::MAX,
            CommandPayload::AsrText(TextPayload::new("\u{1F600} emoji", "", false)),
        ),
    ];

    for value in values {
        assert_eq!(decode(&value.to_map()), Ok(value.clone()));
        assert_eq!(
            parse_content(&value.to_json(), &DecodeOptions::default()),
            Ok(value)
        );
    }
}
