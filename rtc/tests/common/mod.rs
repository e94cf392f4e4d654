//! In-memory SCTP association linking two peer connections.
#![allow(dead_code)]

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use datachannel::PayloadProtocolIdentifier;
use shared::error::{Error, Result};
use tokio::sync::{Mutex, mpsc};

use rtc::data_channel::RTCDataChannel;
use rtc::data_channel::state::RTCDataChannelState;
use rtc::peer_connection::RTCPeerConnection;
use rtc::peer_connection::configuration::RTCConfigurationBuilder;
use rtc::peer_connection::transport::dtls_role::RTCDtlsRole;
use rtc::peer_connection::transport::sctp::{
    SctpAssociation, SctpStream, SctpStreamConfig, SctpStreamEvent,
};

pub const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(5);

/// BridgeAssociation turns every stream operation into an event for the
/// remote peer connection.
pub struct BridgeAssociation {
    outbound: mpsc::UnboundedSender<SctpStreamEvent>,
    pub opened: Mutex<Vec<(u16, SctpStreamConfig)>>,
}

impl BridgeAssociation {
    pub fn new(outbound: mpsc::UnboundedSender<SctpStreamEvent>) -> Self {
        Self {
            outbound,
            opened: Mutex::new(vec![]),
        }
    }

    pub async fn opened_config(&self, stream_id: u16) -> Option<SctpStreamConfig> {
        self.opened
            .lock()
            .await
            .iter()
            .find(|(id, _)| *id == stream_id)
            .map(|(_, config)| *config)
    }
}

#[async_trait]
impl SctpAssociation for BridgeAssociation {
    async fn open_stream(
        &self,
        stream_id: u16,
        config: SctpStreamConfig,
    ) -> Result<Arc<dyn SctpStream>> {
        self.opened.lock().await.push((stream_id, config));
        self.outbound
            .send(SctpStreamEvent::Open { stream_id })
            .map_err(|_| Error::ErrAssociationNotExisted)?;

        Ok(Arc::new(BridgeStream {
            stream_id,
            outbound: self.outbound.clone(),
        }))
    }
}

struct BridgeStream {
    stream_id: u16,
    outbound: mpsc::UnboundedSender<SctpStreamEvent>,
}

#[async_trait]
impl SctpStream for BridgeStream {
    fn stream_identifier(&self) -> u16 {
        self.stream_id
    }

    async fn write(&self, data: Bytes, ppi: PayloadProtocolIdentifier) -> Result<usize> {
        let n = data.len();
        self.outbound
            .send(SctpStreamEvent::Message {
                stream_id: self.stream_id,
                ppi,
                data,
            })
            .map_err(|_| Error::ErrAssociationNotExisted)?;
        Ok(n)
    }

    async fn close(&self) -> Result<()> {
        self.outbound
            .send(SctpStreamEvent::Close {
                stream_id: self.stream_id,
            })
            .map_err(|_| Error::ErrAssociationNotExisted)
    }
}

pub struct Peer {
    pub pc: Arc<RTCPeerConnection>,
    pub association: Arc<BridgeAssociation>,
}

fn new_peer(
    dtls_role: RTCDtlsRole,
    outbound: mpsc::UnboundedSender<SctpStreamEvent>,
) -> Peer {
    let association = Arc::new(BridgeAssociation::new(outbound));
    let config = RTCConfigurationBuilder::new()
        .with_dtls_role(dtls_role)
        .build();
    let pc = Arc::new(RTCPeerConnection::new(
        config,
        Arc::clone(&association) as Arc<dyn SctpAssociation>,
    ));

    Peer { pc, association }
}

/// pump feeds the events written by the remote peer into `pc`, in order.
fn pump(mut inbound: mpsc::UnboundedReceiver<SctpStreamEvent>, pc: Weak<RTCPeerConnection>) {
    tokio::spawn(async move {
        while let Some(event) = inbound.recv().await {
            let Some(pc) = pc.upgrade() else {
                break;
            };
            if let Err(err) = pc.handle_stream_event(event).await {
                log::debug!("bridge event failed: {err}");
            }
        }
    });
}

/// new_pair links a DTLS client (offerer) and a DTLS server (answerer).
pub fn new_pair() -> (Peer, Peer) {
    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (server_tx, server_rx) = mpsc::unbounded_channel();

    let client = new_peer(RTCDtlsRole::Client, client_tx);
    let server = new_peer(RTCDtlsRole::Server, server_tx);

    pump(client_rx, Arc::downgrade(&server.pc));
    pump(server_rx, Arc::downgrade(&client.pc));

    (client, server)
}

/// new_detached creates a peer whose outbound events are handed to the test.
pub fn new_detached(dtls_role: RTCDtlsRole) -> (Peer, mpsc::UnboundedReceiver<SctpStreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (new_peer(dtls_role, tx), rx)
}

pub async fn recv_timeout<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> anyhow::Result<T> {
    tokio::time::timeout(DEFAULT_TIMEOUT_DURATION, rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("sender dropped"))
}

pub async fn wait_for_state(
    dc: &RTCDataChannel,
    expected: RTCDataChannelState,
) -> anyhow::Result<()> {
    tokio::time::timeout(DEFAULT_TIMEOUT_DURATION, async {
        while dc.ready_state() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}
