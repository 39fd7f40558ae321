//! Message protocol decoder
//!
//! Turns the JSON objects delivered over the call's content channel into
//! typed [`DecodedCommand`]s, and encodes them back. Pure functions, no I/O.

mod command;
mod envelope;

pub use command::{
    CommandPayload, CommandType, DecodedCommand, SpeakStatus, SpeakStatusPayload, TextPayload,
};
pub use envelope::{decode, decode_with, parse_content, parse_object, DecodeOptions, RawEnvelope};
