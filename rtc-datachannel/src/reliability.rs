use crate::message::message_channel_open::ChannelType;
use shared::error::{Error, Result};

/// ReliabilityType is the retransmission policy applied to a stream.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ReliabilityType {
    #[default]
    Reliable = 0,
    Rexmit,
    Timed,
}

/// ReliabilityParameters is the negotiated delivery contract of a data channel.
///
/// If both max_packet_life_time and max_retransmits are unset, the channel is reliable.
/// If either is set, the channel is partially reliable. The bounds are exclusive,
/// so a value carrying both can not be constructed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ReliabilityParameters {
    ordered: bool,
    // Time window in milliseconds during which transmissions and retransmissions may occur
    max_packet_life_time: Option<u16>,
    // Maximum number of retransmissions that are attempted
    max_retransmits: Option<u16>,
}

impl Default for ReliabilityParameters {
    fn default() -> Self {
        Self::reliable(true)
    }
}

impl ReliabilityParameters {
    pub fn new(
        ordered: bool,
        max_packet_life_time: Option<u16>,
        max_retransmits: Option<u16>,
    ) -> Result<Self> {
        if max_packet_life_time.is_some() && max_retransmits.is_some() {
            return Err(Error::ErrRetransmitsOrPacketLifeTime);
        }

        Ok(Self {
            ordered,
            max_packet_life_time,
            max_retransmits,
        })
    }

    pub fn reliable(ordered: bool) -> Self {
        Self {
            ordered,
            max_packet_life_time: None,
            max_retransmits: None,
        }
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn max_packet_life_time(&self) -> Option<u16> {
        self.max_packet_life_time
    }

    pub fn max_retransmits(&self) -> Option<u16> {
        self.max_retransmits
    }

    pub fn is_reliable(&self) -> bool {
        self.max_packet_life_time.is_none() && self.max_retransmits.is_none()
    }

    pub fn reliability_type(&self) -> ReliabilityType {
        match (self.max_retransmits, self.max_packet_life_time) {
            (Some(_), _) => ReliabilityType::Rexmit,
            (None, Some(_)) => ReliabilityType::Timed,
            (None, None) => ReliabilityType::Reliable,
        }
    }

    /// reliability_value is the bound handed to the stream: the retransmission
    /// count, the lifetime in milliseconds, or 0 for reliable channels.
    pub fn reliability_value(&self) -> u32 {
        self.max_retransmits
            .or(self.max_packet_life_time)
            .map(u32::from)
            .unwrap_or(0)
    }

    /// channel_type_and_reliability_parameter maps the tuple to its DCEP
    /// DATA_CHANNEL_OPEN encoding.
    pub fn channel_type_and_reliability_parameter(&self) -> (ChannelType, u32) {
        let channel_type = match (self.reliability_type(), self.ordered) {
            (ReliabilityType::Reliable, true) => ChannelType::Reliable,
            (ReliabilityType::Reliable, false) => ChannelType::ReliableUnordered,
            (ReliabilityType::Rexmit, true) => ChannelType::PartialReliableRexmit,
            (ReliabilityType::Rexmit, false) => ChannelType::PartialReliableRexmitUnordered,
            (ReliabilityType::Timed, true) => ChannelType::PartialReliableTimed,
            (ReliabilityType::Timed, false) => ChannelType::PartialReliableTimedUnordered,
        };

        (channel_type, self.reliability_value())
    }

    /// from_channel_type decodes a DATA_CHANNEL_OPEN channel type and reliability
    /// parameter. Bounds above u16::MAX are clamped.
    pub fn from_channel_type(channel_type: ChannelType, reliability_parameter: u32) -> Self {
        let bound = Some(u16::try_from(reliability_parameter).unwrap_or(u16::MAX));
        let ordered = channel_type.is_ordered();

        match channel_type {
            ChannelType::Reliable | ChannelType::ReliableUnordered => Self::reliable(ordered),
            ChannelType::PartialReliableRexmit | ChannelType::PartialReliableRexmitUnordered => {
                Self {
                    ordered,
                    max_packet_life_time: None,
                    max_retransmits: bound,
                }
            }
            ChannelType::PartialReliableTimed | ChannelType::PartialReliableTimedUnordered => {
                Self {
                    ordered,
                    max_packet_life_time: bound,
                    max_retransmits: None,
                }
            }
        }
    }
}
