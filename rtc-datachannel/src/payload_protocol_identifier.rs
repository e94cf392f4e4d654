use std::fmt;

/// PayloadProtocolIdentifier is an enum for DataChannel payload types
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-25>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    Binary = 53,
    StringEmpty = 56,
    BinaryEmpty = 57,
    #[default]
    Unknown,
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::StringEmpty => "WebRTC String (Empty)",
            PayloadProtocolIdentifier::BinaryEmpty => "WebRTC Binary (Empty)",
            _ => "Unknown Payload Protocol Identifier",
        };
        write!(f, "{s}")
    }
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> PayloadProtocolIdentifier {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            53 => PayloadProtocolIdentifier::Binary,
            56 => PayloadProtocolIdentifier::StringEmpty,
            57 => PayloadProtocolIdentifier::BinaryEmpty,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

impl PayloadProtocolIdentifier {
    /// is_string reports whether the payload carries UTF-8 text.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            PayloadProtocolIdentifier::String | PayloadProtocolIdentifier::StringEmpty
        )
    }

    /// is_empty reports whether the payload is the one-byte placeholder of an
    /// empty message.
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            PayloadProtocolIdentifier::StringEmpty | PayloadProtocolIdentifier::BinaryEmpty
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_payload_protocol_identifier_from_u32() {
        let tests = vec![
            (50u32, PayloadProtocolIdentifier::Dcep),
            (51, PayloadProtocolIdentifier::String),
            (53, PayloadProtocolIdentifier::Binary),
            (56, PayloadProtocolIdentifier::StringEmpty),
            (57, PayloadProtocolIdentifier::BinaryEmpty),
            (52, PayloadProtocolIdentifier::Unknown),
            (0, PayloadProtocolIdentifier::Unknown),
        ];

        for (value, expected) in tests {
            assert_eq!(PayloadProtocolIdentifier::from(value), expected, "{value}");
        }
    }

    #[test]
    fn test_payload_protocol_identifier_string() {
        assert_eq!(PayloadProtocolIdentifier::Dcep.to_string(), "WebRTC DCEP");
        assert_eq!(
            PayloadProtocolIdentifier::BinaryEmpty.to_string(),
            "WebRTC Binary (Empty)"
        );
        assert!(PayloadProtocolIdentifier::StringEmpty.is_string());
        assert!(PayloadProtocolIdentifier::StringEmpty.is_empty());
        assert!(!PayloadProtocolIdentifier::Binary.is_string());
        assert!(!PayloadProtocolIdentifier::Binary.is_empty());
    }
}
