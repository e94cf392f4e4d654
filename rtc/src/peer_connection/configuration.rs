use crate::peer_connection::transport::dtls_role::RTCDtlsRole;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Identifiers are allocated strictly below this bound.
pub const DEFAULT_MAX_CHANNELS: u16 = u16::MAX;

/// Largest payload accepted by a single send.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65536;

/// A Configuration defines how data channels of a PeerConnection are
/// established. Configurations are treated as readonly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCConfiguration {
    /// dtls_role decides the parity of locally allocated stream identifiers.
    pub(crate) dtls_role: RTCDtlsRole,

    /// max_channels bounds the stream identifiers handed out by the allocator.
    pub(crate) max_channels: u16,

    /// max_message_size represents the maximum size of data that can be passed to
    /// RTCDataChannel's send() method.
    pub(crate) max_message_size: usize,
}

impl Default for RTCConfiguration {
    fn default() -> Self {
        RTCConfigurationBuilder::default().build()
    }
}

impl RTCConfiguration {
    pub fn dtls_role(&self) -> RTCDtlsRole {
        self.dtls_role
    }

    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

#[derive(Debug)]
pub struct RTCConfigurationBuilder {
    pub(crate) dtls_role: RTCDtlsRole,
    pub(crate) max_channels: u16,
    pub(crate) max_message_size: usize,
}

impl Default for RTCConfigurationBuilder {
    fn default() -> Self {
        Self {
            dtls_role: RTCDtlsRole::Unspecified,
            max_channels: DEFAULT_MAX_CHANNELS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl RTCConfigurationBuilder {
    pub fn new() -> Self {
        RTCConfigurationBuilder::default()
    }

    pub fn with_dtls_role(mut self, dtls_role: RTCDtlsRole) -> Self {
        self.dtls_role = dtls_role;
        self
    }

    pub fn with_max_channels(mut self, max_channels: u16) -> Self {
        self.max_channels = max_channels;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn build(self) -> RTCConfiguration {
        RTCConfiguration {
            dtls_role: self.dtls_role,
            max_channels: self.max_channels,
            max_message_size: self.max_message_size,
        }
    }
}
