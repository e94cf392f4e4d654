#[cfg(test)]
mod data_channel_test;

use crate::message::{message_channel_ack::*, message_channel_open::*, *};
use crate::payload_protocol_identifier::PayloadProtocolIdentifier;
use crate::reliability::ReliabilityParameters;
use bytes::{Buf, BytesMut};
use log::{debug, trace};
use shared::error::{Error, Result};
use shared::marshal::*;
use std::collections::VecDeque;

/// DataChannelConfig is used to configure the data channel.
#[derive(Eq, PartialEq, Default, Clone, Debug)]
pub struct DataChannelConfig {
    pub channel_type: ChannelType,
    pub negotiated: bool,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: String,
    pub protocol: String,
}

impl DataChannelConfig {
    /// reliability_parameters decodes the DCEP channel type into the
    /// negotiated reliability tuple.
    pub fn reliability_parameters(&self) -> ReliabilityParameters {
        ReliabilityParameters::from_channel_type(self.channel_type, self.reliability_parameter)
    }
}

/// DataChannelMessage is a framed user message or DCEP message of one stream
#[derive(Debug, Default, Clone)]
pub struct DataChannelMessage {
    pub stream_id: u16,
    pub ppi: PayloadProtocolIdentifier,
    pub payload: BytesMut,
}

/// DataChannelEvent is raised by the DCEP exchange
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelEvent {
    /// The remote side acknowledged our DATA_CHANNEL_OPEN
    Open,
}

/// DataChannel is the sans-I/O engine of a single data channel stream.
///
/// It frames outbound messages, answers DCEP traffic and keeps the
/// per-stream counters. Reading from and writing to the stream is left to
/// the caller, which drives it through [`sansio::Protocol`].
#[derive(Debug, Default, Clone)]
pub struct DataChannel {
    config: DataChannelConfig,
    stream_id: u16,
    acked: bool,
    closed: bool,

    read_outs: VecDeque<DataChannelMessage>,
    write_outs: VecDeque<DataChannelMessage>,
    event_outs: VecDeque<DataChannelEvent>,

    // stats
    messages_sent: usize,
    messages_received: usize,
    bytes_sent: usize,
    bytes_received: usize,
}

impl DataChannel {
    fn new(config: DataChannelConfig, stream_id: u16) -> Self {
        Self {
            config,
            stream_id,
            ..Default::default()
        }
    }

    /// dial opens a data channel over SCTP. Unless the channel was
    /// negotiated out-of-band, a DATA_CHANNEL_OPEN is queued for writing.
    pub fn dial(config: DataChannelConfig, stream_id: u16) -> Result<Self> {
        let mut data_channel = DataChannel::new(config.clone(), stream_id);

        if !config.negotiated {
            let msg = Message::DataChannelOpen(DataChannelOpen {
                channel_type: config.channel_type,
                priority: config.priority,
                reliability_parameter: config.reliability_parameter,
                label: config.label.bytes().collect(),
                protocol: config.protocol.bytes().collect(),
            })
            .marshal()?;

            data_channel.write_outs.push_back(DataChannelMessage {
                stream_id,
                ppi: PayloadProtocolIdentifier::Dcep,
                payload: msg,
            });
        }

        Ok(data_channel)
    }

    /// accept is used to accept an incoming data channel announced by a
    /// DATA_CHANNEL_OPEN. The DATA_CHANNEL_ACK is queued for writing.
    pub fn accept(
        mut config: DataChannelConfig,
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        buf: &[u8],
    ) -> Result<Self> {
        if ppi != PayloadProtocolIdentifier::Dcep {
            return Err(Error::InvalidPayloadProtocolIdentifier(ppi as u8));
        }

        let mut read_buf = buf;
        let msg = Message::unmarshal(&mut read_buf)?;

        if let Message::DataChannelOpen(dco) = msg {
            config.channel_type = dco.channel_type;
            config.priority = dco.priority;
            config.reliability_parameter = dco.reliability_parameter;
            config.label = String::from_utf8(dco.label)?;
            config.protocol = String::from_utf8(dco.protocol)?;
        } else {
            return Err(Error::InvalidMessageType(msg.message_type() as u8));
        };

        let mut data_channel = DataChannel::new(config, stream_id);
        data_channel.acked = true;
        data_channel.write_data_channel_ack()?;

        Ok(data_channel)
    }

    /// MessagesSent returns the number of messages sent
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    /// MessagesReceived returns the number of messages received
    pub fn messages_received(&self) -> usize {
        self.messages_received
    }

    /// BytesSent returns the number of bytes sent
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// BytesReceived returns the number of bytes received
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// StreamIdentifier returns the Stream identifier associated to the stream.
    pub fn stream_identifier(&self) -> u16 {
        self.stream_id
    }

    pub fn config(&self) -> &DataChannelConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn handle_dcep<B>(&mut self, data: &mut B) -> Result<()>
    where
        B: Buf,
    {
        let msg = Message::unmarshal(data)?;

        match msg {
            Message::DataChannelOpen(_) => {
                // DATA_CHANNEL_OPEN is only valid on a stream nobody uses yet
                debug!("Received DATA_CHANNEL_OPEN on open stream {}", self.stream_id);
                return Err(Error::ErrDuplicateDataChannel(self.stream_id));
            }
            Message::DataChannelAck(_) => {
                debug!("Received DATA_CHANNEL_ACK on stream {}", self.stream_id);
                if !self.acked {
                    self.acked = true;
                    self.event_outs.push_back(DataChannelEvent::Open);
                }
            }
        };

        Ok(())
    }

    fn write_data_channel_ack(&mut self) -> Result<()> {
        let ack = Message::DataChannelAck(DataChannelAck).marshal()?;
        self.write_outs.push_back(DataChannelMessage {
            stream_id: self.stream_id,
            ppi: PayloadProtocolIdentifier::Dcep,
            payload: ack,
        });
        Ok(())
    }

    pub fn get_data_channel_message(is_string: bool, data: BytesMut) -> DataChannelMessage {
        // https://tools.ietf.org/html/draft-ietf-rtcweb-data-channel-12#section-6.6
        // SCTP does not support the sending of empty user messages.  Therefore,
        // if an empty message has to be sent, the appropriate PPID (WebRTC
        // String Empty or WebRTC Binary Empty) is used and the SCTP user
        // message of one zero byte is sent.  When receiving an SCTP user
        // message with one of these PPIDs, the receiver MUST ignore the SCTP
        // user message and process it as an empty message.
        let ppi = match (is_string, data.len()) {
            (false, 0) => PayloadProtocolIdentifier::BinaryEmpty,
            (false, _) => PayloadProtocolIdentifier::Binary,
            (true, 0) => PayloadProtocolIdentifier::StringEmpty,
            (true, _) => PayloadProtocolIdentifier::String,
        };

        let payload = if data.is_empty() {
            BytesMut::from(&[0][..])
        } else {
            data
        };

        DataChannelMessage {
            ppi,
            payload,
            ..Default::default()
        }
    }
}

impl sansio::Protocol<DataChannelMessage, DataChannelMessage, ()> for DataChannel {
    type Rout = DataChannelMessage;
    type Wout = DataChannelMessage;
    type Eout = DataChannelEvent;
    type Error = Error;
    type Time = ();

    /// handle_read consumes one message of the stream. DCEP traffic is
    /// answered in place; user messages are queued for poll_read with empty
    /// placeholders turned back into empty payloads.
    fn handle_read(&mut self, mut msg: DataChannelMessage) -> Result<()> {
        if self.closed {
            return Err(Error::ErrStreamClosed);
        }

        match msg.ppi {
            PayloadProtocolIdentifier::Dcep => {
                let mut data_buf = &msg.payload[..];
                self.handle_dcep(&mut data_buf)
            }
            PayloadProtocolIdentifier::Unknown => {
                trace!("Dropping message with unknown PPI on stream {}", self.stream_id);
                Ok(())
            }
            ppi => {
                if ppi.is_empty() {
                    msg.payload.clear();
                }
                self.messages_received += 1;
                self.bytes_received += msg.payload.len();
                msg.stream_id = self.stream_id;
                self.read_outs.push_back(msg);
                Ok(())
            }
        }
    }

    fn poll_read(&mut self) -> Option<DataChannelMessage> {
        self.read_outs.pop_front()
    }

    /// handle_write frames a user message for the stream
    fn handle_write(&mut self, mut msg: DataChannelMessage) -> Result<()> {
        if self.closed {
            return Err(Error::ErrStreamClosed);
        }

        self.messages_sent += 1;
        if !msg.ppi.is_empty() {
            self.bytes_sent += msg.payload.len();
        }

        msg.stream_id = self.stream_id;
        self.write_outs.push_back(msg);

        Ok(())
    }

    /// Returns packets to transmit
    fn poll_write(&mut self) -> Option<DataChannelMessage> {
        self.write_outs.pop_front()
    }

    fn poll_event(&mut self) -> Option<DataChannelEvent> {
        self.event_outs.pop_front()
    }

    /// close marks the stream closed; the caller resets the outgoing SCTP stream.
    fn close(&mut self) -> Result<()> {
        // https://tools.ietf.org/html/draft-ietf-rtcweb-data-channel-13#section-6.7
        // Closing of a data channel MUST be signaled by resetting the
        // corresponding outgoing streams [RFC6525].  This means that if one
        // side decides to close the data channel, it resets the corresponding
        // outgoing stream.  When the peer sees that an incoming stream was
        // reset, it also resets its corresponding outgoing stream.  Once this
        // is completed, the data channel is closed.
        self.closed = true;
        self.read_outs.clear();
        Ok(())
    }
}
