//! Connection-level messages: peer identity, greeting, acknowledgement,
//! keepalive, and error reporting.

/// Identifies one connection/session.
///
/// `owner_id` and `id` together carry the 64-bit caller identity, high half
/// first, so the mapping is lossless.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct PeerId {
    #[prost(uint32, tag = "1")]
    pub owner_id: u32,
    #[prost(uint32, tag = "2")]
    pub id: u32,
}

impl PeerId {
    /// Builds the peer id for a connection authenticated as `identity`.
    #[must_use]
    pub fn for_identity(identity: u64) -> Self {
        let [a, b, c, d, e, f, g, h] = identity.to_be_bytes();
        Self {
            owner_id: u32::from_be_bytes([a, b, c, d]),
            id: u32::from_be_bytes([e, f, g, h]),
        }
    }

    /// Recovers the 64-bit identity encoded by [`PeerId::for_identity`].
    #[must_use]
    pub fn identity(&self) -> u64 {
        (u64::from(self.owner_id) << 32) | u64::from(self.id)
    }
}

/// Greeting pushed by the server once a connection is established.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Hello {
    #[prost(message, optional, tag = "1")]
    pub peer_id: Option<PeerId>,
}

/// Generic acknowledgement of a request that has no typed response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {}

/// Keepalive request; answered with [`Ack`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {}

/// Error reply.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Error {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(enumeration = "ErrorCode", tag = "2")]
    pub code: i32,
    #[prost(string, repeated, tag = "3")]
    pub tags: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorCode {
    Internal = 0,
    NoSuchChannel = 1,
    Forbidden = 2,
}
