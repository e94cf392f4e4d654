pub mod dtls_role;
pub mod sctp;
