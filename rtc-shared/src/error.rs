#![allow(dead_code)]

use std::num::ParseIntError;
use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer: short")]
    ErrBufferShort,

    //SCTP
    #[error("outbound packet larger than maximum message size")]
    ErrOutboundPacketTooLarge,
    #[error("Stream closed")]
    ErrStreamClosed,
    #[error("Stream not existed")]
    ErrStreamNotExisted,
    #[error("Association not existed")]
    ErrAssociationNotExisted,

    //Data Channel
    #[error(
        "DataChannel message is not long enough to determine type: (expected: {expected}, actual: {actual})"
    )]
    UnexpectedEndOfBuffer { expected: usize, actual: usize },
    #[error("Unknown MessageType {0}")]
    InvalidMessageType(u8),
    #[error("Unknown ChannelType {0}")]
    InvalidChannelType(u8),
    #[error("Unknown PayloadProtocolIdentifier {0}")]
    InvalidPayloadProtocolIdentifier(u8),
    #[error("Max Data Channel ID")]
    ErrMaxDataChannelID,
    #[error("data channel id allocation failed: {0}")]
    ErrDataChannelIdAllocation(Box<Error>),

    /// ErrRetransmitsOrPacketLifeTime indicates that both max_packet_life_time
    /// and max_retransmits were set, which is forbidden.
    #[error("both max_packet_life_time and max_retransmits was set")]
    ErrRetransmitsOrPacketLifeTime,

    /// ErrDuplicateDataChannel indicates the remote peer announced a data
    /// channel on a stream identifier which is already in use.
    #[error("data channel {0} already exists")]
    ErrDuplicateDataChannel(u16),

    /// ErrDataChannelParametersMismatch indicates the remote description
    /// carried a locally created channel with different parameters.
    #[error("data channel {0} parameters differ from the remote description")]
    ErrDataChannelParametersMismatch(u16),

    //RTC
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrDataChannelNotOpen indicates an operation executed when the data
    /// channel is not (yet) open or already closing.
    #[error("data channel is not open")]
    ErrDataChannelNotOpen,

    /// ErrDataChannelNotExisted indicates an operation executed when the data
    /// channel not existed.
    #[error("data channel not existed")]
    ErrDataChannelNotExisted,

    /// ErrTransportWrite wraps a failure reported by the underlying stream.
    #[error("transport write: {0}")]
    ErrTransportWrite(String),

    /// ErrDtlsRoleUnspecified indicates that data channel identifiers were
    /// requested before the DTLS role was known.
    #[error("DTLS role must be client or server")]
    ErrDtlsRoleUnspecified,

    /// ErrProtocolTooLarge indicates that value given for a DataChannelInit protocol is
    /// longer then 65535 bytes
    #[error("protocol is larger then 65535 bytes")]
    ErrProtocolTooLarge,

    /// ErrLabelTooLarge indicates that the label of a DataChannel is longer
    /// then 65535 bytes
    #[error("label is larger then 65535 bytes")]
    ErrLabelTooLarge,

    //SDP
    #[error("SdpInvalidSyntax: {0}")]
    SdpInvalidSyntax(String),
    #[error("SdpInvalidValue: {0}")]
    SdpInvalidValue(String),

    //Third Party Error
    #[error("parse int: {0}")]
    ParseInt(#[from] ParseIntError),
    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("{0}")]
    Other(String),
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}
