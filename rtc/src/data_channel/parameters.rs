use datachannel::ReliabilityParameters;
use datachannel::data_channel::DataChannelConfig;
use datachannel::message::message_channel_open::CHANNEL_PRIORITY_NORMAL;

/// Internal parameters describing the configuration of a DataChannel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataChannelParameters {
    /// The label that can be used to distinguish this DataChannel from others.
    pub(crate) label: String,

    /// The name of the sub-protocol in use.
    pub(crate) protocol: String,

    /// Whether the channel is announced through the session description
    /// rather than DCEP.
    pub(crate) negotiated: bool,

    pub(crate) priority: u16,

    pub(crate) reliability: ReliabilityParameters,
}

impl Default for DataChannelParameters {
    fn default() -> Self {
        Self {
            label: String::new(),
            protocol: String::new(),
            negotiated: false,
            priority: CHANNEL_PRIORITY_NORMAL,
            reliability: ReliabilityParameters::default(),
        }
    }
}

impl DataChannelParameters {
    pub(crate) fn data_channel_config(&self) -> DataChannelConfig {
        let (channel_type, reliability_parameter) =
            self.reliability.channel_type_and_reliability_parameter();

        DataChannelConfig {
            channel_type,
            negotiated: self.negotiated,
            priority: self.priority,
            reliability_parameter,
            label: self.label.clone(),
            protocol: self.protocol.clone(),
        }
    }
}
