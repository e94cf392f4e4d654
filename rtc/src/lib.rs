//! # RTC - WebRTC Data Channels
//!
//! Application data channels of a WebRTC peer connection, layered over an
//! SCTP association that the embedding application provides.
//!
//! The crate owns the parts that two independently implemented peers must
//! agree on without an extra handshake:
//!
//! - stream identifier allocation, where the DTLS client takes even
//!   identifiers and the DTLS server takes odd ones
//! - the reliability tuple of each channel, carried in-band through DCEP
//!   ([RFC 8832]) or out-of-band through `a=dcmap` ([RFC 8864])
//! - the channel lifecycle (`connecting`, `open`, `closing`, `closed`) and an
//!   ordered per-channel delivery sequence that survives handler replacement
//!
//! The SCTP association itself is an external collaborator described by the
//! [`SctpAssociation`](peer_connection::transport::sctp::SctpAssociation) and
//! [`SctpStream`](peer_connection::transport::sctp::SctpStream) traits. The
//! integration layer feeds inbound stream events to
//! [`RTCPeerConnection::handle_stream_event`](peer_connection::RTCPeerConnection::handle_stream_event).
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtc::data_channel::message::RTCDataChannelMessage;
//! use rtc::peer_connection::RTCPeerConnection;
//! use rtc::peer_connection::configuration::RTCConfigurationBuilder;
//! use rtc::peer_connection::transport::dtls_role::RTCDtlsRole;
//! use rtc::peer_connection::transport::sctp::SctpAssociation;
//!
//! # async fn example(association: Arc<dyn SctpAssociation>) -> shared::error::Result<()> {
//! let config = RTCConfigurationBuilder::new()
//!     .with_dtls_role(RTCDtlsRole::Client)
//!     .build();
//! let pc = RTCPeerConnection::new(config, association);
//!
//! let dc = pc.create_data_channel("chat", None).await?;
//! let sender = Arc::clone(&dc);
//! dc.on_open(Some(Box::new(move || {
//!     let sender = Arc::clone(&sender);
//!     Box::pin(async move {
//!         let _ = sender.send_text("hello").await;
//!     })
//! })));
//! dc.on_message(Some(Box::new(|msg: RTCDataChannelMessage| {
//!     Box::pin(async move {
//!         println!("received {} bytes", msg.data.len());
//!     })
//! })));
//! # Ok(())
//! # }
//! ```
//!
//! [RFC 8832]: https://datatracker.ietf.org/doc/html/rfc8832
//! [RFC 8864]: https://datatracker.ietf.org/doc/html/rfc8864

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod data_channel;
pub mod peer_connection;
