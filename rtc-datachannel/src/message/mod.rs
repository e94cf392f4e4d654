
pub mod message_channel_ack;
pub mod message_channel_open;
pub mod message_type;

use bytes::{Buf, BufMut};
use message_channel_ack::*;
use message_channel_open::*;
use message_type::*;
use shared::error::{Error, Result};
use shared::marshal::*;

/// Message is one DCEP message ([RFC 8832 section 5]), carried on a stream
/// with the `WebRTC DCEP` payload protocol identifier.
///
/// [RFC 8832 section 5]: https://datatracker.ietf.org/doc/html/rfc8832#section-5
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Message {
    DataChannelAck(DataChannelAck),
    DataChannelOpen(DataChannelOpen),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::DataChannelAck(_) => MessageType::DataChannelAck,
            Self::DataChannelOpen(_) => MessageType::DataChannelOpen,
        }
    }

    fn body_size(&self) -> usize {
        match self {
            Self::DataChannelAck(ack) => ack.marshal_size(),
            Self::DataChannelOpen(open) => open.marshal_size(),
        }
    }
}

impl MarshalSize for Message {
    fn marshal_size(&self) -> usize {
        MESSAGE_TYPE_LEN + self.body_size()
    }
}

impl Marshal for Message {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let n = self.message_type().marshal_to(buf)?;
        let body = &mut buf[n..];

        let m = match self {
            Self::DataChannelAck(ack) => ack.marshal_to(body)?,
            Self::DataChannelOpen(open) => open.marshal_to(body)?,
        };

        Ok(n + m)
    }
}

impl Unmarshal for Message {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let message = match MessageType::unmarshal(buf)? {
            MessageType::DataChannelAck => Self::DataChannelAck(DataChannelAck::unmarshal(buf)?),
            MessageType::DataChannelOpen => {
                Self::DataChannelOpen(DataChannelOpen::unmarshal(buf)?)
            }
        };

        Ok(message)
    }
}
