pub mod configuration;
pub(crate) mod registry;
pub mod sdp;
pub mod transport;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use datachannel::PayloadProtocolIdentifier;
use datachannel::ReliabilityParameters;
use datachannel::data_channel::{DataChannel, DataChannelConfig};
use datachannel::message::message_channel_open::CHANNEL_PRIORITY_NORMAL;
use log::{debug, trace, warn};
use shared::error::{Error, Result, flatten_errs};
use tokio::sync::Mutex;

use crate::data_channel::init::RTCDataChannelInit;
use crate::data_channel::parameters::DataChannelParameters;
use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::{OnErrorHdlrFn, RTCDataChannel, RTCDataChannelId};
use configuration::RTCConfiguration;
use registry::DataChannelRegistry;
use sdp::data_channel_map::RTCDataChannelMap;
use transport::sctp::{SctpAssociation, SctpStreamConfig, SctpStreamEvent};

pub type OnDataChannelHdlrFn = Box<
    dyn (FnMut(Arc<RTCDataChannel>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// PeerConnection represents the data channel side of a WebRTC connection
/// between the local computer and a remote peer.
///
/// The SCTP association is supplied by the embedding application, which also
/// forwards every inbound stream event to [`handle_stream_event`].
///
/// [`handle_stream_event`]: RTCPeerConnection::handle_stream_event
pub struct RTCPeerConnection {
    configuration: RTCConfiguration,
    association: Arc<dyn SctpAssociation>,
    registry: Arc<DataChannelRegistry>,
    is_closed: AtomicBool,

    on_data_channel_handler: ArcSwapOption<Mutex<OnDataChannelHdlrFn>>,
    on_error_handler: ArcSwapOption<Mutex<OnErrorHdlrFn>>,
}

impl RTCPeerConnection {
    /// creates a PeerConnection with the given configuration over an
    /// established SCTP association.
    pub fn new(configuration: RTCConfiguration, association: Arc<dyn SctpAssociation>) -> Self {
        let registry =
            DataChannelRegistry::new(configuration.dtls_role, configuration.max_channels);

        Self {
            configuration,
            association,
            registry,
            is_closed: AtomicBool::new(false),

            on_data_channel_handler: ArcSwapOption::empty(),
            on_error_handler: ArcSwapOption::empty(),
        }
    }

    pub fn configuration(&self) -> &RTCConfiguration {
        &self.configuration
    }

    /// on_data_channel sets an event handler which is invoked once for every
    /// data channel opened by the remote peer.
    pub fn on_data_channel(&self, f: Option<OnDataChannelHdlrFn>) {
        self.on_data_channel_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));
    }

    /// on_error sets an event handler which is invoked when inbound stream
    /// traffic can not be processed, e.g. a duplicate DATA_CHANNEL_OPEN.
    pub fn on_error(&self, f: Option<OnErrorHdlrFn>) {
        self.on_error_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));
    }

    async fn do_error(&self, err: Error) {
        warn!("data channel transport: {err}");
        if let Some(handler) = self.on_error_handler.load_full() {
            let mut f = handler.lock().await;
            f(err).await;
        }
    }

    /// create_data_channel creates a new DataChannel object with the given label
    /// and optional DataChannelInit used to configure properties of the
    /// underlying channel such as data reliability.
    pub async fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<Arc<RTCDataChannel>> {
        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #2)
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(Error::ErrConnectionClosed);
        }

        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #6)
        if label.len() > u16::MAX as usize {
            return Err(Error::ErrLabelTooLarge);
        }

        let options = options.unwrap_or_default();
        let protocol = options.protocol.unwrap_or_default();
        if protocol.len() > u16::MAX as usize {
            return Err(Error::ErrProtocolTooLarge);
        }

        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #8)
        let reliability = ReliabilityParameters::new(
            options.ordered.unwrap_or(true),
            options.max_packet_life_time,
            options.max_retransmits,
        )?;

        let params = DataChannelParameters {
            label: label.to_owned(),
            protocol,
            negotiated: options.negotiated,
            reliability,
            ..Default::default()
        };

        let dc = self
            .registry
            .create_local(&params, self.configuration.max_message_size)
            .await?;

        if let Err(err) = self.attach_stream(&dc).await {
            Self::abandon(&dc).await;
            return Err(err);
        }

        Ok(dc)
    }

    /// attach_stream opens the outgoing stream of a registered channel and
    /// writes whatever DCEP message the channel has queued.
    async fn attach_stream(&self, dc: &Arc<RTCDataChannel>) -> Result<()> {
        let stream = self
            .association
            .open_stream(
                dc.id(),
                SctpStreamConfig::from(&dc.reliability_parameters()),
            )
            .await?;
        dc.set_stream(stream);
        dc.flush().await
    }

    async fn abandon(dc: &RTCDataChannel) {
        if let Err(err) = dc.close().await {
            warn!("failed to close data channel {}: {}", dc.id(), err);
        }
    }

    /// on_remote_channel_open registers a channel the remote peer opened,
    /// acknowledges it and notifies the application.
    async fn on_remote_channel_open(&self, engine: DataChannel) -> Result<Arc<RTCDataChannel>> {
        let dc = self
            .registry
            .accept_remote(engine, self.configuration.max_message_size)
            .await?;

        if let Err(err) = self.attach_stream(&dc).await {
            Self::abandon(&dc).await;
            return Err(err);
        }

        debug!(
            "remote data channel {} (label {:?}) open",
            dc.id(),
            dc.label()
        );

        if let Some(handler) = self.on_data_channel_handler.load_full() {
            let mut f = handler.lock().await;
            f(Arc::clone(&dc)).await;
        }

        Ok(dc)
    }

    /// handle_stream_event feeds one inbound event of the SCTP association.
    ///
    /// Events of one stream must be fed in the order the association
    /// delivered them. Failures are returned and also raised through
    /// [`on_error`](RTCPeerConnection::on_error).
    pub async fn handle_stream_event(&self, event: SctpStreamEvent) -> Result<()> {
        if self.is_closed.load(Ordering::SeqCst) {
            trace!(
                "peer connection closed, ignoring event of stream {}",
                event.stream_id()
            );
            return Ok(());
        }

        let result = match event {
            SctpStreamEvent::Open { stream_id } => {
                trace!("stream {stream_id} opened");
                Ok(())
            }
            SctpStreamEvent::Message {
                stream_id,
                ppi,
                data,
            } => self.handle_stream_message(stream_id, ppi, data).await,
            SctpStreamEvent::Close { stream_id } => match self.registry.get(stream_id).await {
                Some(dc) => dc.handle_remote_close().await,
                None => {
                    trace!("reset of unknown stream {stream_id}");
                    Ok(())
                }
            },
        };

        if let Err(err) = &result {
            self.do_error(err.clone()).await;
        }

        result
    }

    async fn handle_stream_message(
        &self,
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        data: Bytes,
    ) -> Result<()> {
        if let Some(dc) = self.registry.get(stream_id).await {
            return dc.handle_inbound(ppi, data).await;
        }

        if ppi != PayloadProtocolIdentifier::Dcep {
            debug!("{ppi} message on unknown stream {stream_id}");
            return Err(Error::ErrDataChannelNotExisted);
        }

        let engine = DataChannel::accept(DataChannelConfig::default(), stream_id, ppi, &data)?;
        self.on_remote_channel_open(engine).await?;

        Ok(())
    }

    /// local_data_channel_maps returns the `a=dcmap` entries of every live
    /// negotiated channel, for the next offer or answer.
    pub async fn local_data_channel_maps(&self) -> Vec<RTCDataChannelMap> {
        self.registry
            .data_channels()
            .await
            .into_iter()
            .filter(|dc| {
                dc.negotiated()
                    && matches!(
                        dc.ready_state(),
                        RTCDataChannelState::Connecting | RTCDataChannelState::Open
                    )
            })
            .map(|dc| RTCDataChannelMap {
                id: dc.id(),
                label: dc.label().to_owned(),
                protocol: dc.protocol().to_owned(),
                priority: Some(dc.priority()),
                reliability: dc.reliability_parameters(),
            })
            .collect()
    }

    /// set_remote_data_channel_maps reconciles the channels with the `a=dcmap`
    /// entries of a remote offer or answer.
    ///
    /// Unknown identifiers become remote channels. A local negotiated channel
    /// still connecting opens when the remote entry carries the same label,
    /// protocol and reliability. Every other entry is already known.
    pub async fn set_remote_data_channel_maps(&self, maps: &[RTCDataChannelMap]) -> Result<()> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(Error::ErrConnectionClosed);
        }

        let mut errs = vec![];
        for map in maps {
            if let Err(err) = self.apply_remote_data_channel_map(map).await {
                errs.push(err);
            }
        }

        flatten_errs(errs)
    }

    async fn apply_remote_data_channel_map(&self, map: &RTCDataChannelMap) -> Result<()> {
        let Some(dc) = self.registry.get(map.id).await else {
            let params = DataChannelParameters {
                label: map.label.clone(),
                protocol: map.protocol.clone(),
                negotiated: true,
                priority: map.priority.unwrap_or(CHANNEL_PRIORITY_NORMAL),
                reliability: map.reliability,
            };
            let engine = DataChannel::dial(params.data_channel_config(), map.id)?;
            self.on_remote_channel_open(engine).await?;
            return Ok(());
        };

        if !(dc.is_local()
            && dc.negotiated()
            && dc.ready_state() == RTCDataChannelState::Connecting)
        {
            trace!("data channel {} already negotiated", map.id);
            return Ok(());
        }

        if dc.label() != map.label
            || dc.protocol() != map.protocol
            || dc.reliability_parameters() != map.reliability
        {
            return Err(Error::ErrDataChannelParametersMismatch(map.id));
        }

        dc.notify_open();

        Ok(())
    }

    /// data_channel returns the registered channel with the given identifier.
    pub async fn data_channel(&self, id: RTCDataChannelId) -> Option<Arc<RTCDataChannel>> {
        self.registry.get(id).await
    }

    /// data_channels returns every registered channel ordered by identifier.
    pub async fn data_channels(&self) -> Vec<Arc<RTCDataChannel>> {
        self.registry.data_channels().await
    }

    /// close ends the PeerConnection. Every data channel is closed and no
    /// further channel can be created.
    pub async fn close(&self) -> Result<()> {
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #1)
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut close_errs = vec![];
        for dc in self.registry.data_channels().await {
            if let Err(err) = dc.close().await {
                close_errs.push(err);
            }
        }

        flatten_errs(close_errs)
    }
}
