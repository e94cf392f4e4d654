use super::*;
use sansio::Protocol;
use shared::error::Result;

fn create_new_data_channel_pair(cfg: DataChannelConfig) -> Result<(DataChannel, DataChannel)> {
    let mut dc0 = DataChannel::dial(cfg, 100)?;

    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::Dcep);
    let mut dc1 = DataChannel::accept(
        DataChannelConfig::default(),
        msg.stream_id,
        PayloadProtocolIdentifier::Dcep,
        &msg.payload,
    )?;

    let ack = dc1.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    dc0.handle_read(ack)?;

    Ok((dc0, dc1))
}

#[test]
fn test_data_channel_channel_type_reliable_ordered() -> Result<()> {
    let mut sbuf = vec![0u8; 1000];

    let cfg = DataChannelConfig {
        channel_type: ChannelType::Reliable,
        reliability_parameter: 123,
        label: "data".to_string(),
        ..Default::default()
    };

    let (mut dc0, mut dc1) = create_new_data_channel_pair(cfg.clone())?;

    assert_eq!(dc0.config, cfg, "local config should match");
    assert_eq!(dc1.config, cfg, "remote config should match");
    assert_eq!(dc0.poll_event(), Some(DataChannelEvent::Open));
    assert_eq!(dc0.poll_event(), None);

    sbuf[0..4].copy_from_slice(&1u32.to_be_bytes());
    let data_channel_message =
        DataChannel::get_data_channel_message(true, BytesMut::from(&sbuf[0..4]));
    dc0.handle_write(data_channel_message)?;
    assert_eq!(dc0.bytes_sent(), 4, "data length should match");

    sbuf[0..4].copy_from_slice(&2u32.to_be_bytes());
    let data_channel_message =
        DataChannel::get_data_channel_message(false, BytesMut::from(&sbuf[0..4]));
    dc0.handle_write(data_channel_message)?;
    assert_eq!(dc0.bytes_sent(), 8, "data length should match");

    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    assert_eq!(msg.stream_id, 100);
    dc1.handle_read(msg)?;
    assert_eq!(dc1.bytes_received(), 4, "data length should match");
    let data_channel_message = dc1.poll_read().ok_or(Error::ErrStreamNotExisted)?;
    assert!(data_channel_message.ppi.is_string());
    assert_eq!(
        1,
        u32::from_be_bytes([
            data_channel_message.payload[0],
            data_channel_message.payload[1],
            data_channel_message.payload[2],
            data_channel_message.payload[3]
        ]),
        "data should match"
    );

    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    dc1.handle_read(msg)?;
    assert_eq!(dc1.bytes_received(), 8, "data length should match");
    let data_channel_message = dc1.poll_read().ok_or(Error::ErrStreamNotExisted)?;
    assert!(!data_channel_message.ppi.is_string());
    assert_eq!(
        2,
        u32::from_be_bytes([
            data_channel_message.payload[0],
            data_channel_message.payload[1],
            data_channel_message.payload[2],
            data_channel_message.payload[3]
        ]),
        "data should match"
    );

    dc0.close()?;
    dc1.close()?;

    Ok(())
}

#[test]
fn test_data_channel_accept_partial_reliable_unordered() -> Result<()> {
    let cfg = DataChannelConfig {
        channel_type: ChannelType::PartialReliableRexmitUnordered,
        priority: CHANNEL_PRIORITY_HIGH,
        reliability_parameter: 3000,
        label: "unordered".to_string(),
        protocol: "chat".to_string(),
        ..Default::default()
    };

    let (_dc0, dc1) = create_new_data_channel_pair(cfg)?;

    let params = dc1.config().reliability_parameters();
    assert!(!params.ordered());
    assert_eq!(params.max_retransmits(), Some(3000));
    assert_eq!(params.max_packet_life_time(), None);
    assert_eq!(dc1.config().protocol, "chat");
    assert_eq!(dc1.config().priority, CHANNEL_PRIORITY_HIGH);

    Ok(())
}

#[test]
fn test_data_channel_accept_rejects_non_dcep() {
    let result = DataChannel::accept(
        DataChannelConfig::default(),
        1,
        PayloadProtocolIdentifier::Binary,
        &[0x03],
    );
    assert_eq!(
        result.err(),
        Some(Error::InvalidPayloadProtocolIdentifier(53))
    );

    let result = DataChannel::accept(
        DataChannelConfig::default(),
        1,
        PayloadProtocolIdentifier::Dcep,
        &[0x02],
    );
    assert_eq!(result.err(), Some(Error::InvalidMessageType(0x02)));
}

#[test]
fn test_data_channel_negotiated_dial_is_silent() -> Result<()> {
    let cfg = DataChannelConfig {
        negotiated: true,
        label: "negotiated".to_string(),
        ..Default::default()
    };

    let mut dc = DataChannel::dial(cfg, 4)?;
    assert!(dc.poll_write().is_none());
    assert!(dc.poll_event().is_none());

    Ok(())
}

#[test]
fn test_data_channel_repeated_open_is_rejected() -> Result<()> {
    let mut dc0 = DataChannel::dial(
        DataChannelConfig {
            label: "data".to_string(),
            ..Default::default()
        },
        2,
    )?;
    let open = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;

    let mut dc1 = DataChannel::accept(
        DataChannelConfig::default(),
        2,
        PayloadProtocolIdentifier::Dcep,
        &open.payload,
    )?;
    let ack = dc1.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    assert_eq!(&ack.payload[..], &[0x02]);

    assert_eq!(
        dc1.handle_read(open).err(),
        Some(Error::ErrDuplicateDataChannel(2))
    );
    assert!(dc1.poll_write().is_none());
    assert_eq!(dc1.messages_received(), 0, "DCEP is not user data");

    // a second ACK raises no second open
    dc0.handle_read(ack.clone())?;
    dc0.handle_read(ack)?;
    assert_eq!(dc0.poll_event(), Some(DataChannelEvent::Open));
    assert_eq!(dc0.poll_event(), None);

    Ok(())
}

#[test]
fn test_data_channel_empty_messages() -> Result<()> {
    let (mut dc0, mut dc1) = create_new_data_channel_pair(DataChannelConfig {
        label: "data".to_string(),
        ..Default::default()
    })?;

    dc0.handle_write(DataChannel::get_data_channel_message(
        true,
        BytesMut::new(),
    ))?;
    dc0.handle_write(DataChannel::get_data_channel_message(
        false,
        BytesMut::new(),
    ))?;
    assert_eq!(dc0.messages_sent(), 2);
    assert_eq!(dc0.bytes_sent(), 0);

    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::StringEmpty);
    assert_eq!(&msg.payload[..], &[0]);
    dc1.handle_read(msg)?;

    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::BinaryEmpty);
    dc1.handle_read(msg)?;

    let m = dc1.poll_read().ok_or(Error::ErrStreamNotExisted)?;
    assert!(m.ppi.is_string());
    assert!(m.payload.is_empty());
    let m = dc1.poll_read().ok_or(Error::ErrStreamNotExisted)?;
    assert!(!m.ppi.is_string());
    assert!(m.payload.is_empty());

    assert_eq!(dc1.messages_received(), 2);
    assert_eq!(dc1.bytes_received(), 0);

    Ok(())
}

#[test]
fn test_stats() -> Result<()> {
    let sbuf = vec![0u8; 1000];

    let (mut dc0, mut dc1) = create_new_data_channel_pair(DataChannelConfig {
        channel_type: ChannelType::Reliable,
        reliability_parameter: 123,
        label: "data".to_owned(),
        ..Default::default()
    })?;

    let mut bytes_sent = 0;
    for (i, payload) in [&sbuf[..], &sbuf[..], &[0u8][..]].iter().enumerate() {
        dc0.handle_write(DataChannel::get_data_channel_message(
            false,
            BytesMut::from(*payload),
        ))?;
        bytes_sent += payload.len();
        assert_eq!(dc0.bytes_sent(), bytes_sent);
        assert_eq!(dc0.messages_sent(), i + 1);
    }

    let mut bytes_read = 0;
    let mut messages_read = 0;
    while let Some(msg) = dc0.poll_write() {
        dc1.handle_read(msg)?;
        let m = dc1.poll_read().ok_or(Error::ErrStreamNotExisted)?;
        bytes_read += m.payload.len();
        messages_read += 1;
        assert_eq!(dc1.bytes_received(), bytes_read);
        assert_eq!(dc1.messages_received(), messages_read);
    }
    assert_eq!(bytes_read, bytes_sent);

    Ok(())
}

#[test]
fn test_data_channel_closed_rejects_io() -> Result<()> {
    let (mut dc0, mut dc1) = create_new_data_channel_pair(DataChannelConfig {
        label: "data".to_string(),
        ..Default::default()
    })?;

    dc0.handle_write(DataChannel::get_data_channel_message(
        false,
        BytesMut::from(&b"late"[..]),
    ))?;
    let msg = dc0.poll_write().ok_or(Error::ErrStreamNotExisted)?;

    dc1.close()?;
    assert!(dc1.is_closed());
    assert_eq!(dc1.handle_read(msg).err(), Some(Error::ErrStreamClosed));
    assert_eq!(
        dc1.handle_write(DataChannel::get_data_channel_message(
            true,
            BytesMut::from(&b"x"[..])
        ))
        .err(),
        Some(Error::ErrStreamClosed)
    );

    // closing twice is harmless
    dc1.close()?;

    Ok(())
}
