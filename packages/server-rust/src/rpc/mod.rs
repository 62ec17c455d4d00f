//! Real-time RPC layer: id allocation, shared world state, variant dispatch,
//! and session bootstrap over websocket.

pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod session;
pub mod world;

pub use dispatcher::Dispatcher;
pub use error::{SessionError, UpgradeError};
pub use ids::IdAllocator;
pub use session::{parse_identity, run_session, Outbox, SessionContext};
pub use world::World;
