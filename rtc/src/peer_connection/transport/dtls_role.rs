use std::fmt;

use serde::{Deserialize, Serialize};

/// RTCDtlsRole indicates the role of the DTLS transport.
///
/// Data channel stream identifiers are split by role so both peers can
/// allocate without coordination: the DTLS client takes even identifiers,
/// the DTLS server odd ones ([RFC 8832 section 6]).
///
/// [RFC 8832 section 6]: https://datatracker.ietf.org/doc/html/rfc8832#section-6
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsRole {
    #[default]
    Unspecified = 0,

    /// DTLSRoleClient defines the DTLS client role.
    #[serde(rename = "client")]
    Client = 2,

    /// DTLSRoleServer defines the DTLS server role.
    #[serde(rename = "server")]
    Server = 3,
}

const DTLS_ROLE_CLIENT_STR: &str = "client";
const DTLS_ROLE_SERVER_STR: &str = "server";

impl From<&str> for RTCDtlsRole {
    fn from(raw: &str) -> Self {
        match raw {
            DTLS_ROLE_CLIENT_STR => RTCDtlsRole::Client,
            DTLS_ROLE_SERVER_STR => RTCDtlsRole::Server,
            _ => RTCDtlsRole::Unspecified,
        }
    }
}

impl fmt::Display for RTCDtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCDtlsRole::Client => write!(f, "{DTLS_ROLE_CLIENT_STR}"),
            RTCDtlsRole::Server => write!(f, "{DTLS_ROLE_SERVER_STR}"),
            _ => write!(
                f,
                "{}",
                crate::peer_connection::configuration::UNSPECIFIED_STR
            ),
        }
    }
}
