use std::fmt;
use std::fmt::Write;

use datachannel::ReliabilityParameters;
use log::trace;
use shared::error::{Error, Result};

use crate::data_channel::RTCDataChannelId;

/// Attribute key of the data channel map, `a=dcmap:<value>`.
pub const ATTR_KEY_DATA_CHANNEL_MAP: &str = "dcmap";

const LABEL: &str = "label";
const SUBPROTOCOL: &str = "subprotocol";
const ORDERED: &str = "ordered";
const MAX_RETR: &str = "max-retr";
const MAX_TIME: &str = "max-time";
const PRIORITY: &str = "priority";

/// RTCDataChannelMap describes one negotiated data channel as carried by the
/// session description ([RFC 8864]).
///
/// ```text
/// a=dcmap:2 label="chat";subprotocol="irc";ordered=0;max-retr=3;priority=256
/// ```
///
/// [RFC 8864]: https://datatracker.ietf.org/doc/html/rfc8864#section-5.1
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RTCDataChannelMap {
    pub id: RTCDataChannelId,
    pub label: String,
    pub protocol: String,
    pub priority: Option<u16>,
    pub reliability: ReliabilityParameters,
}

impl fmt::Display for RTCDataChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut options = vec![];

        if !self.label.is_empty() {
            options.push(format!("{LABEL}=\"{}\"", escape(&self.label)));
        }
        if !self.protocol.is_empty() {
            options.push(format!("{SUBPROTOCOL}=\"{}\"", escape(&self.protocol)));
        }
        options.push(format!(
            "{ORDERED}={}",
            if self.reliability.ordered() { 1 } else { 0 }
        ));
        if let Some(max_retransmits) = self.reliability.max_retransmits() {
            options.push(format!("{MAX_RETR}={max_retransmits}"));
        }
        if let Some(max_packet_life_time) = self.reliability.max_packet_life_time() {
            options.push(format!("{MAX_TIME}={max_packet_life_time}"));
        }
        if let Some(priority) = self.priority {
            options.push(format!("{PRIORITY}={priority}"));
        }

        write!(f, "{} {}", self.id, options.join(";"))
    }
}

impl RTCDataChannelMap {
    /// marshal renders the attribute value, without the `a=dcmap:` prefix.
    pub fn marshal(&self) -> String {
        self.to_string()
    }

    /// unmarshal parses an attribute value. A value carrying both `max-retr`
    /// and `max-time` is rejected with `ErrRetransmitsOrPacketLifeTime`.
    pub fn unmarshal(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (id, options) = match raw.split_once(' ') {
            Some((id, options)) => (id, options.trim()),
            None => (raw, ""),
        };
        if id.is_empty() {
            return Err(Error::SdpInvalidSyntax(format!(
                "{ATTR_KEY_DATA_CHANNEL_MAP}: missing stream id"
            )));
        }
        let id: RTCDataChannelId = id.parse()?;

        let mut label = String::new();
        let mut protocol = String::new();
        let mut ordered = true;
        let mut max_retransmits = None;
        let mut max_packet_life_time = None;
        let mut priority = None;

        for option in split_options(options)? {
            let Some((key, value)) = option.split_once('=') else {
                return Err(Error::SdpInvalidSyntax(format!(
                    "{ATTR_KEY_DATA_CHANNEL_MAP}: {option}"
                )));
            };

            match key.trim() {
                LABEL => label = unquote(value.trim())?,
                SUBPROTOCOL => protocol = unquote(value.trim())?,
                ORDERED => {
                    ordered = match value.trim() {
                        "1" => true,
                        "0" => false,
                        other => {
                            return Err(Error::SdpInvalidValue(format!("{ORDERED}={other}")));
                        }
                    }
                }
                MAX_RETR => max_retransmits = Some(value.trim().parse::<u16>()?),
                MAX_TIME => max_packet_life_time = Some(value.trim().parse::<u16>()?),
                PRIORITY => priority = Some(value.trim().parse::<u16>()?),
                other => trace!("ignoring unknown {ATTR_KEY_DATA_CHANNEL_MAP} option {other}"),
            }
        }

        Ok(Self {
            id,
            label,
            protocol,
            priority,
            reliability: ReliabilityParameters::new(
                ordered,
                max_packet_life_time,
                max_retransmits,
            )?,
        })
    }
}

fn split_options(options: &str) -> Result<Vec<&str>> {
    let mut split = vec![];
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in options.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                split.push(&options[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(Error::SdpInvalidSyntax(format!(
            "{ATTR_KEY_DATA_CHANNEL_MAP}: unterminated quoted string"
        )));
    }
    split.push(&options[start..]);

    Ok(split.into_iter().filter(|option| !option.trim().is_empty()).collect())
}

// Quoted strings are percent-encoded for '"', '%' and control characters
// other than HTAB.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '%' || (c.is_ascii_control() && c != '\t') {
            let _ = write!(escaped, "%{:02X}", c as u8);
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn unquote(value: &str) -> Result<String> {
    let inner = value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .ok_or_else(|| Error::SdpInvalidValue(format!("expected quoted string: {value}")))?;

    let bytes = inner.as_bytes();
    let mut unescaped = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = inner
                .get(i + 1..i + 3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| Error::SdpInvalidValue(format!("bad escape in {value}")))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| Error::SdpInvalidValue(format!("bad escape in {value}")))?;
            unescaped.push(byte);
            i += 3;
        } else {
            unescaped.push(bytes[i]);
            i += 1;
        }
    }

    Ok(String::from_utf8(unescaped)?)
}
