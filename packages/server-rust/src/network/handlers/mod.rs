//! HTTP and WebSocket handlers.
//!
//! `AppState` is the shared state carried through axum extractors; the
//! handler functions are re-exported for building the router.

pub mod extensions;
pub mod health;
pub mod predict;
pub mod releases;
pub mod rpc;
pub mod signin;

pub use extensions::{
    download_extension_handler, download_extension_version_handler, list_extensions_handler,
};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use predict::predict_edits_handler;
pub use releases::api_handler;
pub use rpc::{rpc_redirect_handler, rpc_upgrade_handler};
pub use signin::{favicon_handler, native_app_signin_handler, native_app_signin_succeeded_handler};

use std::sync::Arc;
use std::time::Instant;

use super::{ConnectionRegistry, NetworkConfig, ShutdownController};
use crate::mirror::{MirrorConfig, MirrorSource};
use crate::predict::{OpenAiCompatible, PredictConfig, Predictor};
use crate::rpc::{Dispatcher, IdAllocator, World};

/// Everything behind the routes that is not connection bookkeeping.
#[derive(Clone)]
pub struct Services {
    pub dispatcher: Arc<Dispatcher>,
    pub mirror: Arc<dyn MirrorSource>,
    pub mirror_config: Arc<MirrorConfig>,
    pub predictor: Arc<Predictor>,
    /// Externally visible base URL, used for the `/rpc` redirect.
    pub public_url: Option<String>,
}

impl Services {
    /// Fresh world, mirror source per `mirror.local_mode`, and a predictor
    /// backed by an OpenAI-compatible endpoint.
    #[must_use]
    pub fn new(mirror: MirrorConfig, predict: &PredictConfig, public_url: Option<String>) -> Self {
        let client = reqwest::Client::new();
        let backend = Arc::new(OpenAiCompatible::new(client.clone(), predict));
        Self {
            dispatcher: Arc::new(Dispatcher::new(
                Arc::new(World::new()),
                Arc::new(IdAllocator::new()),
            )),
            mirror: mirror.source(client),
            mirror_config: Arc::new(mirror),
            predictor: Arc::new(Predictor::new(backend, predict)),
            public_url,
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(MirrorConfig::default(), &PredictConfig::default(), None)
    }
}

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
    pub services: Services,
}
