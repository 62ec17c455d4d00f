//! `zedex` core: concurrent state containers, protobuf message schemas, and
//! the compressed envelope codec.

pub mod codec;
pub mod containers;
pub mod hash;
pub mod messages;

pub use codec::{CodecError, FrameCodec, InboundFraming};
pub use containers::{ConcurrentCounter, ConcurrentMap, MapTransaction};
pub use hash::string_to_u64_hash;
pub use messages::{Envelope, Payload, PeerId};
