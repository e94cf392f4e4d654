use std::collections::HashMap;
use std::sync::Arc;

use datachannel::data_channel::DataChannel;
use log::debug;
use shared::error::{Error, Result};
use tokio::sync::Mutex;

use crate::data_channel::parameters::DataChannelParameters;
use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::{RTCDataChannel, RTCDataChannelId};
use crate::peer_connection::transport::dtls_role::RTCDtlsRole;

/// DataChannelRegistry maps stream identifiers to the data channels of one
/// peer connection. Identifier allocation happens under the same lock as
/// insertion, so two channels never claim the same identifier.
pub(crate) struct DataChannelRegistry {
    dtls_role: RTCDtlsRole,
    max_channels: u16,
    data_channels: Mutex<HashMap<RTCDataChannelId, Arc<RTCDataChannel>>>,
}

impl DataChannelRegistry {
    pub(crate) fn new(dtls_role: RTCDtlsRole, max_channels: u16) -> Arc<Self> {
        Arc::new(Self {
            dtls_role,
            max_channels,
            data_channels: Mutex::new(HashMap::new()),
        })
    }

    /// create_local allocates an identifier for a locally created channel and
    /// registers the channel in connecting state.
    pub(crate) async fn create_local(
        self: &Arc<Self>,
        params: &DataChannelParameters,
        max_message_size: usize,
    ) -> Result<Arc<RTCDataChannel>> {
        let mut data_channels = self.data_channels.lock().await;

        let id = generate_data_channel_id(self.dtls_role, &data_channels, self.max_channels)
            .map_err(|err| Error::ErrDataChannelIdAllocation(Box::new(err)))?;

        let engine = DataChannel::dial(params.data_channel_config(), id)?;
        let dc = RTCDataChannel::new(
            engine,
            true,
            RTCDataChannelState::Connecting,
            Arc::downgrade(self),
            max_message_size,
        );
        data_channels.insert(id, Arc::clone(&dc));
        debug!("data channel {} (label {:?}) created", id, params.label);

        Ok(dc)
    }

    /// accept_remote registers a channel the remote peer opened, in open state.
    pub(crate) async fn accept_remote(
        self: &Arc<Self>,
        engine: DataChannel,
        max_message_size: usize,
    ) -> Result<Arc<RTCDataChannel>> {
        let mut data_channels = self.data_channels.lock().await;

        let id = engine.stream_identifier();
        if data_channels.contains_key(&id) {
            return Err(Error::ErrDuplicateDataChannel(id));
        }

        let dc = RTCDataChannel::new(
            engine,
            false,
            RTCDataChannelState::Open,
            Arc::downgrade(self),
            max_message_size,
        );
        data_channels.insert(id, Arc::clone(&dc));
        debug!("data channel {} (label {:?}) accepted", id, dc.label());

        Ok(dc)
    }

    /// remove releases the identifier of a closed channel. An entry that was
    /// since replaced by another channel is left alone.
    pub(crate) async fn remove(&self, dc: &RTCDataChannel) -> bool {
        let mut data_channels = self.data_channels.lock().await;
        match data_channels.get(&dc.id()) {
            Some(existing) if std::ptr::eq(Arc::as_ptr(existing), dc) => {
                data_channels.remove(&dc.id());
                true
            }
            _ => false,
        }
    }

    pub(crate) async fn get(&self, id: RTCDataChannelId) -> Option<Arc<RTCDataChannel>> {
        self.data_channels.lock().await.get(&id).cloned()
    }

    /// data_channels returns every registered channel ordered by identifier.
    pub(crate) async fn data_channels(&self) -> Vec<Arc<RTCDataChannel>> {
        let mut data_channels: Vec<Arc<RTCDataChannel>> =
            self.data_channels.lock().await.values().cloned().collect();
        data_channels.sort_by_key(|dc| dc.id());
        data_channels
    }
}

/// generate_data_channel_id returns the lowest free identifier of the parity
/// owned by `dtls_role`: even for the client, odd for the server. Identifiers
/// are strictly below `max_channels`.
pub(crate) fn generate_data_channel_id<V>(
    dtls_role: RTCDtlsRole,
    existing: &HashMap<RTCDataChannelId, V>,
    max_channels: u16,
) -> Result<RTCDataChannelId> {
    let mut id = match dtls_role {
        RTCDtlsRole::Client => 0u32,
        RTCDtlsRole::Server => 1u32,
        RTCDtlsRole::Unspecified => return Err(Error::ErrDtlsRoleUnspecified),
    };

    let max = u32::from(max_channels);
    while id < max {
        let candidate = id as RTCDataChannelId;
        if !existing.contains_key(&candidate) {
            return Ok(candidate);
        }
        id += 2;
    }

    Err(Error::ErrMaxDataChannelID)
}
