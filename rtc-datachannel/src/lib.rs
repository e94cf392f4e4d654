#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod data_channel;
pub mod message;
pub mod payload_protocol_identifier;
pub mod reliability;

pub use payload_protocol_identifier::PayloadProtocolIdentifier;
pub use reliability::{ReliabilityParameters, ReliabilityType};
