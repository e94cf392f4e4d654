
pub mod init;
pub mod message;
pub(crate) mod parameters;
pub mod state;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use arc_swap::ArcSwapOption;
use bytes::{Bytes, BytesMut};
use datachannel::data_channel::{DataChannel, DataChannelEvent, DataChannelMessage};
use datachannel::{PayloadProtocolIdentifier, ReliabilityParameters};
use log::{debug, trace, warn};
use sansio::Protocol;
use shared::error::{Error, Result};
use tokio::sync::{Mutex, mpsc, watch};

use crate::peer_connection::registry::DataChannelRegistry;
use crate::peer_connection::transport::sctp::SctpStream;
use message::RTCDataChannelMessage;
use state::RTCDataChannelState;

/// Identifier of a data channel, equal to its SCTP stream identifier.
pub type RTCDataChannelId = u16;

pub type OnMessageHdlrFn = Box<
    dyn (FnMut(RTCDataChannelMessage) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnOpenHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnCloseHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnErrorHdlrFn =
    Box<dyn (FnMut(Error) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// One entry of the per-channel delivery sequence.
#[derive(Debug)]
enum Delivery {
    Open,
    Message(RTCDataChannelMessage),
    Error(Error),
}

/// RTCDataChannel represents a WebRTC DataChannel
/// The RTCDataChannel interface represents a network channel
/// which can be used for bidirectional peer-to-peer transfers of arbitrary data
///
/// Inbound traffic is delivered through a single read loop per channel, so
/// `on_open`, `on_message` and `on_error` handlers never run concurrently for
/// the same channel and observe messages in stream order. Handlers may be
/// replaced at any time; a replacement applies from the next delivery on.
pub struct RTCDataChannel {
    id: RTCDataChannelId,
    label: String,
    protocol: String,
    negotiated: bool,
    priority: u16,
    reliability: ReliabilityParameters,
    local: bool,
    max_message_size: usize,

    ready_state: watch::Sender<RTCDataChannelState>,
    open_notified: AtomicBool,

    // Held for the whole of every handler invocation.
    delivery: Mutex<()>,
    deliveries_tx: mpsc::UnboundedSender<Delivery>,

    engine: Mutex<DataChannel>,
    write_lock: Mutex<()>,
    stream: OnceLock<Arc<dyn SctpStream>>,
    registry: Weak<DataChannelRegistry>,

    on_message_handler: ArcSwapOption<Mutex<OnMessageHdlrFn>>,
    on_open_handler: ArcSwapOption<Mutex<OnOpenHdlrFn>>,
    on_close_handler: ArcSwapOption<Mutex<OnCloseHdlrFn>>,
    on_error_handler: ArcSwapOption<Mutex<OnErrorHdlrFn>>,
}

impl std::fmt::Debug for RTCDataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTCDataChannel")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("protocol", &self.protocol)
            .field("negotiated", &self.negotiated)
            .field("reliability", &self.reliability)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl RTCDataChannel {
    pub(crate) fn new(
        engine: DataChannel,
        local: bool,
        ready_state: RTCDataChannelState,
        registry: Weak<DataChannelRegistry>,
        max_message_size: usize,
    ) -> Arc<Self> {
        let config = engine.config().clone();
        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();

        let dc = Arc::new(Self {
            id: engine.stream_identifier(),
            reliability: config.reliability_parameters(),
            label: config.label,
            protocol: config.protocol,
            negotiated: config.negotiated,
            priority: config.priority,
            local,
            max_message_size,

            ready_state: watch::Sender::new(ready_state),
            open_notified: AtomicBool::new(false),

            delivery: Mutex::new(()),
            deliveries_tx,

            engine: Mutex::new(engine),
            write_lock: Mutex::new(()),
            stream: OnceLock::new(),
            registry,

            on_message_handler: ArcSwapOption::empty(),
            on_open_handler: ArcSwapOption::empty(),
            on_close_handler: ArcSwapOption::empty(),
            on_error_handler: ArcSwapOption::empty(),
        });

        Self::spawn_read_loop(&dc, deliveries_rx);

        dc
    }

    fn spawn_read_loop(dc: &Arc<Self>, mut deliveries_rx: mpsc::UnboundedReceiver<Delivery>) {
        let id = dc.id;
        let weak = Arc::downgrade(dc);
        let mut state_rx = dc.ready_state.subscribe();

        tokio::spawn(async move {
            // user messages received before the channel opened
            let mut held = VecDeque::new();

            loop {
                let delivery = tokio::select! {
                    delivery = deliveries_rx.recv() => match delivery {
                        Some(delivery) => delivery,
                        None => break,
                    },
                    _ = state_rx.wait_for(|state| *state == RTCDataChannelState::Closed) => break,
                };

                let Some(dc) = weak.upgrade() else {
                    break;
                };

                match delivery {
                    Delivery::Open => {
                        dc.do_open().await;
                        while let Some(msg) = held.pop_front() {
                            dc.dispatch(msg).await;
                        }
                    }
                    Delivery::Message(msg)
                        if dc.ready_state() == RTCDataChannelState::Connecting =>
                    {
                        trace!(
                            "data channel {id} is connecting, holding message of {} bytes",
                            msg.data.len()
                        );
                        held.push_back(msg);
                    }
                    Delivery::Message(msg) => dc.dispatch(msg).await,
                    Delivery::Error(err) => dc.do_error(err).await,
                }

                if let Err(err) = dc.complete_pending_close().await {
                    warn!("data channel {id} failed to reset its stream: {err}");
                }
            }

            if !held.is_empty() {
                trace!(
                    "data channel {id} closed before opening, dropped {} messages",
                    held.len()
                );
            }
            trace!("read loop of data channel {id} exited");
        });
    }

    pub(crate) fn set_stream(&self, stream: Arc<dyn SctpStream>) {
        if self.stream.set(stream).is_err() {
            warn!("stream of data channel {} is already set", self.id);
        }
    }

    fn deliver(&self, delivery: Delivery) {
        if self.deliveries_tx.send(delivery).is_err() {
            trace!("data channel {} no longer delivers", self.id);
        }
    }

    /// on_open sets an event handler which is invoked when
    /// the underlying data transport has been established (or re-established).
    ///
    /// A handler set after the channel opened is invoked once, in order with
    /// the messages already queued.
    pub fn on_open(&self, f: Option<OnOpenHdlrFn>) {
        let is_set = f.is_some();
        self.on_open_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));

        if is_set
            && self.ready_state() == RTCDataChannelState::Open
            && !self.open_notified.load(Ordering::SeqCst)
        {
            self.deliver(Delivery::Open);
        }
    }

    /// on_close sets an event handler which is invoked when
    /// the underlying data transport has been closed.
    pub fn on_close(&self, f: Option<OnCloseHdlrFn>) {
        self.on_close_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));
    }

    /// on_message sets an event handler which is invoked on a binary or text
    /// message arrival over the sctp transport from a remote peer.
    /// Messages arriving while no handler is set are dropped.
    pub fn on_message(&self, f: Option<OnMessageHdlrFn>) {
        self.on_message_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));
    }

    /// on_error sets an event handler which is invoked when
    /// the underlying data transport reports a protocol failure.
    pub fn on_error(&self, f: Option<OnErrorHdlrFn>) {
        self.on_error_handler
            .store(f.map(|f| Arc::new(Mutex::new(f))));
    }

    /// notify_open queues the transition to open for a channel that was
    /// acknowledged outside of DCEP.
    pub(crate) fn notify_open(&self) {
        self.deliver(Delivery::Open);
    }

    async fn do_open(&self) {
        let _gate = self.delivery.lock().await;

        let opened = self.ready_state.send_if_modified(|state| {
            if *state == RTCDataChannelState::Connecting {
                *state = RTCDataChannelState::Open;
                true
            } else {
                false
            }
        });
        if opened {
            debug!("data channel {} (label {:?}) open", self.id, self.label);
        }

        if self.ready_state() == RTCDataChannelState::Open {
            if let Some(handler) = self.on_open_handler.load_full() {
                if !self.open_notified.swap(true, Ordering::SeqCst) {
                    let mut f = handler.lock().await;
                    f().await;
                }
            }
        }
    }

    /// dispatch hands one inbound message to the handler registered at the
    /// moment the delivery starts. Without a handler, or once the channel is
    /// closing, the message is dropped.
    async fn dispatch(&self, msg: RTCDataChannelMessage) {
        let _gate = self.delivery.lock().await;

        if self.ready_state() != RTCDataChannelState::Open {
            trace!(
                "data channel {} is {}, dropping message of {} bytes",
                self.id,
                self.ready_state(),
                msg.data.len()
            );
        } else if let Some(handler) = self.on_message_handler.load_full() {
            let mut f = handler.lock().await;
            f(msg).await;
        } else {
            trace!(
                "no message handler on data channel {}, dropping message of {} bytes",
                self.id,
                msg.data.len()
            );
        }
    }

    async fn do_error(&self, err: Error) {
        let _gate = self.delivery.lock().await;

        if let Some(handler) = self.on_error_handler.load_full() {
            let mut f = handler.lock().await;
            f(err).await;
        } else {
            debug!("unhandled error on data channel {}: {}", self.id, err);
        }
    }

    /// handle_inbound feeds one message of the stream into the channel. DCEP
    /// traffic is answered on the stream, user messages are queued for
    /// delivery.
    pub(crate) async fn handle_inbound(
        &self,
        ppi: PayloadProtocolIdentifier,
        data: Bytes,
    ) -> Result<()> {
        let (opened, messages) = {
            let mut engine = self.engine.lock().await;
            if engine.is_closed() {
                trace!("data channel {} is closed, ignoring {}", self.id, ppi);
                return Ok(());
            }

            if let Err(err) = engine.handle_read(DataChannelMessage {
                stream_id: self.id,
                ppi,
                payload: BytesMut::from(&data[..]),
            }) {
                self.deliver(Delivery::Error(err.clone()));
                return Err(err);
            }

            let mut opened = false;
            while let Some(event) = engine.poll_event() {
                match event {
                    DataChannelEvent::Open => opened = true,
                }
            }

            let mut messages = vec![];
            while let Some(msg) = engine.poll_read() {
                messages.push(msg);
            }

            (opened, messages)
        };

        self.flush().await?;

        if opened {
            self.deliver(Delivery::Open);
        }
        for msg in messages {
            self.deliver(Delivery::Message(RTCDataChannelMessage {
                is_string: msg.ppi.is_string(),
                data: msg.payload.freeze(),
            }));
        }

        Ok(())
    }

    /// handle_remote_close responds to the remote side resetting its stream.
    pub(crate) async fn handle_remote_close(&self) -> Result<()> {
        debug!("data channel {} reset by remote", self.id);
        self.close().await
    }

    /// flush writes the DCEP messages the engine has queued.
    pub(crate) async fn flush(&self) -> Result<()> {
        let _write = self.write_lock.lock().await;

        let outs = {
            let mut engine = self.engine.lock().await;
            let mut outs = vec![];
            while let Some(out) = engine.poll_write() {
                outs.push(out);
            }
            outs
        };
        if outs.is_empty() {
            return Ok(());
        }

        let stream = self.stream.get().ok_or(Error::ErrStreamNotExisted)?;
        for out in outs {
            stream
                .write(out.payload.freeze(), out.ppi)
                .await
                .map_err(transport_error)?;
        }

        Ok(())
    }

    /// send sends the binary message to the DataChannel peer
    pub async fn send(&self, data: &Bytes) -> Result<usize> {
        self.send_message(false, data.clone()).await
    }

    /// send_text sends the text message to the DataChannel peer
    pub async fn send_text(&self, s: impl Into<String>) -> Result<usize> {
        self.send_message(true, Bytes::from(s.into())).await
    }

    async fn send_message(&self, is_string: bool, data: Bytes) -> Result<usize> {
        let mut state_rx = self.ready_state.subscribe();
        let state = *state_rx.borrow_and_update();
        if state != RTCDataChannelState::Open {
            return Err(Error::ErrDataChannelNotOpen);
        }

        if data.len() > self.max_message_size {
            return Err(Error::ErrOutboundPacketTooLarge);
        }

        tokio::select! {
            result = self.write_message(is_string, data) => result,
            _ = state_rx.wait_for(|state| *state != RTCDataChannelState::Open) => {
                Err(Error::ErrDataChannelNotOpen)
            }
        }
    }

    async fn write_message(&self, is_string: bool, data: Bytes) -> Result<usize> {
        let _write = self.write_lock.lock().await;
        let stream = self
            .stream
            .get()
            .cloned()
            .ok_or(Error::ErrDataChannelNotOpen)?;

        let outs = {
            let mut engine = self.engine.lock().await;
            let msg =
                DataChannel::get_data_channel_message(is_string, BytesMut::from(&data[..]));
            engine.handle_write(msg).map_err(|err| match err {
                Error::ErrStreamClosed => Error::ErrDataChannelNotOpen,
                err => err,
            })?;

            let mut outs = vec![];
            while let Some(out) = engine.poll_write() {
                outs.push(out);
            }
            outs
        };

        for out in outs {
            stream
                .write(out.payload.freeze(), out.ppi)
                .await
                .map_err(transport_error)?;
        }

        Ok(data.len())
    }

    /// close closes the DataChannel. It may be called regardless of whether
    /// the DataChannel object was created by this peer or the remote peer.
    ///
    /// The channel moves to closing at once. The stream is reset and the
    /// channel reaches closed when no delivery is in flight: right away when
    /// idle, otherwise after the running handler returns. Closing an already
    /// closing or closed channel is a no-op.
    pub async fn close(&self) -> Result<()> {
        let started = self.ready_state.send_if_modified(|state| match *state {
            RTCDataChannelState::Connecting | RTCDataChannelState::Open => {
                *state = RTCDataChannelState::Closing;
                true
            }
            _ => false,
        });
        if !started {
            return Ok(());
        }
        debug!("data channel {} closing", self.id);

        self.complete_pending_close().await
    }

    async fn complete_pending_close(&self) -> Result<()> {
        if self.ready_state() != RTCDataChannelState::Closing {
            return Ok(());
        }

        // The delivery in flight finishes the close when it is done.
        let Ok(_gate) = self.delivery.try_lock() else {
            trace!("data channel {} closes after the running delivery", self.id);
            return Ok(());
        };

        // Only the holder of the gate moves a channel out of closing.
        if self.ready_state() != RTCDataChannelState::Closing {
            return Ok(());
        }

        let result = self.reset_stream().await;

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self).await;
        }

        self.ready_state.send_replace(RTCDataChannelState::Closed);
        debug!("data channel {} closed", self.id);

        if let Some(handler) = self.on_close_handler.load_full() {
            let mut f = handler.lock().await;
            f().await;
        }

        result
    }

    async fn reset_stream(&self) -> Result<()> {
        self.engine.lock().await.close()?;

        match self.stream.get() {
            Some(stream) => stream.close().await,
            None => Ok(()),
        }
    }

    /// label represents a label that can be used to distinguish this
    /// DataChannel object from other DataChannel objects. Scripts are
    /// allowed to create multiple DataChannel objects with the same label.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Ordered returns true if the DataChannel is ordered, and false if
    /// out-of-order delivery is allowed.
    pub fn ordered(&self) -> bool {
        self.reliability.ordered()
    }

    /// max_packet_lifetime represents the length of the time window (msec) during
    /// which transmissions and retransmissions may occur in unreliable mode.
    pub fn max_packet_life_time(&self) -> Option<u16> {
        self.reliability.max_packet_life_time()
    }

    /// max_retransmits represents the maximum number of retransmissions that are
    /// attempted in unreliable mode.
    pub fn max_retransmits(&self) -> Option<u16> {
        self.reliability.max_retransmits()
    }

    /// protocol represents the name of the sub-protocol used with this
    /// DataChannel.
    pub fn protocol(&self) -> &str {
        self.protocol.as_str()
    }

    /// negotiated represents whether this DataChannel was negotiated by the
    /// application (true), or not (false).
    pub fn negotiated(&self) -> bool {
        self.negotiated
    }

    /// ID represents the ID for this DataChannel.
    pub fn id(&self) -> RTCDataChannelId {
        self.id
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn reliability_parameters(&self) -> ReliabilityParameters {
        self.reliability
    }

    /// is_local reports whether the channel was created by this peer.
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// ready_state represents the state of the DataChannel object.
    pub fn ready_state(&self) -> RTCDataChannelState {
        *self.ready_state.borrow()
    }

    pub async fn messages_sent(&self) -> usize {
        self.engine.lock().await.messages_sent()
    }

    pub async fn messages_received(&self) -> usize {
        self.engine.lock().await.messages_received()
    }

    pub async fn bytes_sent(&self) -> usize {
        self.engine.lock().await.bytes_sent()
    }

    pub async fn bytes_received(&self) -> usize {
        self.engine.lock().await.bytes_received()
    }
}

fn transport_error(err: Error) -> Error {
    match err {
        Error::ErrTransportWrite(_) => err,
        err => Error::ErrTransportWrite(err.to_string()),
    }
}
