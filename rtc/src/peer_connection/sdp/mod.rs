pub mod data_channel_map;

use data_channel_map::{ATTR_KEY_DATA_CHANNEL_MAP, RTCDataChannelMap};
use shared::error::Result;

/// parse_data_channel_maps extracts every `a=dcmap` attribute of a session
/// description.
pub fn parse_data_channel_maps(sdp: &str) -> Result<Vec<RTCDataChannelMap>> {
    let prefix = format!("a={ATTR_KEY_DATA_CHANNEL_MAP}:");

    sdp.lines()
        .filter_map(|line| line.trim().strip_prefix(prefix.as_str()))
        .map(RTCDataChannelMap::unmarshal)
        .collect()
}

/// marshal_data_channel_maps renders the maps as `a=dcmap` lines.
pub fn marshal_data_channel_maps(maps: &[RTCDataChannelMap]) -> String {
    maps.iter()
        .map(|map| format!("a={ATTR_KEY_DATA_CHANNEL_MAP}:{}\r\n", map.marshal()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use datachannel::ReliabilityParameters;
    use shared::error::Error;

    const CANNED_SDP: &str = "v=0\r\n\
o=- 4596489990601351948 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=sctp-port:5000\r\n\
a=dcmap:0 label=\"chat\";ordered=1\r\n\
a=dcmap:2 label=\"telemetry\";ordered=0;max-time=150\r\n";

    #[test]
    fn test_parse_data_channel_maps() -> Result<()> {
        let maps = parse_data_channel_maps(CANNED_SDP)?;
        assert_eq!(maps.len(), 2);

        assert_eq!(maps[0].id, 0);
        assert_eq!(maps[0].label, "chat");
        assert_eq!(maps[0].reliability, ReliabilityParameters::reliable(true));

        assert_eq!(maps[1].id, 2);
        assert_eq!(maps[1].label, "telemetry");
        assert_eq!(
            maps[1].reliability,
            ReliabilityParameters::new(false, Some(150), None)?
        );

        let rendered = marshal_data_channel_maps(&maps);
        assert_eq!(parse_data_channel_maps(&rendered)?, maps);

        Ok(())
    }

    #[test]
    fn test_parse_data_channel_maps_rejects_conflict() {
        let sdp = "a=dcmap:1 label=\"x\";max-retr=1;max-time=1\r\n";
        assert_eq!(
            parse_data_channel_maps(sdp),
            Err(Error::ErrRetransmitsOrPacketLifeTime)
        );
    }
}
