use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use datachannel::{PayloadProtocolIdentifier, ReliabilityParameters, ReliabilityType};
use shared::error::Result;

/// SctpStreamConfig carries the delivery contract a stream is opened with.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SctpStreamConfig {
    pub unordered: bool,
    pub reliability_type: ReliabilityType,
    /// Retransmission count for `Rexmit`, lifetime in milliseconds for
    /// `Timed`, ignored for `Reliable`.
    pub reliability_value: u32,
}

impl From<&ReliabilityParameters> for SctpStreamConfig {
    fn from(reliability: &ReliabilityParameters) -> Self {
        Self {
            unordered: !reliability.ordered(),
            reliability_type: reliability.reliability_type(),
            reliability_value: reliability.reliability_value(),
        }
    }
}

/// SctpAssociation is the message-oriented transport the data channels run on.
#[async_trait]
pub trait SctpAssociation: Send + Sync {
    /// open_stream opens the outgoing half of a numbered stream.
    async fn open_stream(
        &self,
        stream_id: u16,
        config: SctpStreamConfig,
    ) -> Result<Arc<dyn SctpStream>>;
}

/// SctpStream is one numbered, message-framed stream of an association.
#[async_trait]
pub trait SctpStream: Send + Sync {
    fn stream_identifier(&self) -> u16;

    /// write sends one user message and returns the number of bytes accepted.
    async fn write(&self, data: Bytes, ppi: PayloadProtocolIdentifier) -> Result<usize>;

    /// close resets the outgoing stream.
    async fn close(&self) -> Result<()>;
}

/// SctpStreamEvent is an inbound notification from the association, fed to
/// [`RTCPeerConnection::handle_stream_event`](crate::peer_connection::RTCPeerConnection::handle_stream_event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SctpStreamEvent {
    Open {
        stream_id: u16,
    },
    Message {
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        data: Bytes,
    },
    /// The remote side reset its outgoing stream.
    Close {
        stream_id: u16,
    },
}

impl SctpStreamEvent {
    pub fn stream_id(&self) -> u16 {
        match self {
            SctpStreamEvent::Open { stream_id }
            | SctpStreamEvent::Message { stream_id, .. }
            | SctpStreamEvent::Close { stream_id } => *stream_id,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sctp_stream_config_from_reliability() -> Result<()> {
        let tests = vec![
            (
                ReliabilityParameters::reliable(true),
                SctpStreamConfig {
                    unordered: false,
                    reliability_type: ReliabilityType::Reliable,
                    reliability_value: 0,
                },
            ),
            (
                ReliabilityParameters::new(false, None, Some(3000))?,
                SctpStreamConfig {
                    unordered: true,
                    reliability_type: ReliabilityType::Rexmit,
                    reliability_value: 3000,
                },
            ),
            (
                ReliabilityParameters::new(true, Some(3), None)?,
                SctpStreamConfig {
                    unordered: false,
                    reliability_type: ReliabilityType::Timed,
                    reliability_value: 3,
                },
            ),
        ];

        for (reliability, expected) in tests {
            assert_eq!(SctpStreamConfig::from(&reliability), expected);
        }

        Ok(())
    }

    #[test]
    fn test_sctp_stream_event_stream_id() {
        let tests = vec![
            (SctpStreamEvent::Open { stream_id: 1 }, 1),
            (
                SctpStreamEvent::Message {
                    stream_id: 6,
                    ppi: PayloadProtocolIdentifier::Binary,
                    data: Bytes::from_static(b"x"),
                },
                6,
            ),
            (SctpStreamEvent::Close { stream_id: 65534 }, 65534),
        ];

        for (event, expected) in tests {
            assert_eq!(event.stream_id(), expected, "{event:?}");
        }
    }
}
