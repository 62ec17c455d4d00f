//! Network module with deferred startup lifecycle.
//!
//! `new()` creates resources, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections. Callers can grab the registry,
//! shutdown controller and services between `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::connection::{ConnectionRegistry, OutboundMessage};
use super::handlers::{
    api_handler, download_extension_handler, download_extension_version_handler, favicon_handler,
    health_handler, list_extensions_handler, liveness_handler, native_app_signin_handler,
    native_app_signin_succeeded_handler, predict_edits_handler, readiness_handler,
    rpc_redirect_handler, rpc_upgrade_handler, AppState, Services,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the HTTP/WebSocket server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownController>,
    services: Services,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, services: Services) -> Self {
        Self {
            config,
            listener: None,
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownController::new()),
            services,
        }
    }

    #[must_use]
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready`
    /// - `GET /rpc` -- redirect to the upgrade route
    /// - `GET /handle-rpc` -- RPC websocket upgrade
    /// - `GET /extensions`, `/extensions/{id}/download`,
    ///   `/extensions/{id}/{version}/download`
    /// - `GET /api/{*path}` -- release mirror or upstream redirect
    /// - `POST /predict_edits/v2`
    pub fn build_router(&self) -> Router {
        router(self.app_state(), &self.config)
    }

    fn app_state(&self) -> AppState {
        AppState {
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
            services: self.services.clone(),
        }
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 asks for an OS-assigned port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then drains.
    ///
    /// When the signal fires the health state moves to Draining and every
    /// session loop is told to stop; afterwards remaining connections get a
    /// Close frame and in-flight work gets up to 30 seconds to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error or the TLS
    /// material cannot be loaded.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let registry = self.registry;
        let shutdown_ctrl = self.shutdown;

        let signal_ctrl = Arc::clone(&shutdown_ctrl);
        let signal = async move {
            shutdown.await;
            signal_ctrl.trigger_shutdown();
        };

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = self.config.tls {
            serve_tls(listener, router, tls_config, signal).await?;
        } else {
            serve_plain(listener, router, signal).await?;
        }

        drain_connections(&registry, &shutdown_ctrl).await;
        Ok(())
    }
}

fn router(state: AppState, config: &NetworkConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/native_app_signin", get(native_app_signin_handler))
        .route(
            "/native_app_signin_succeeded",
            get(native_app_signin_succeeded_handler),
        )
        .route("/favicon.ico", get(favicon_handler))
        .route("/rpc", get(rpc_redirect_handler))
        .route("/handle-rpc", get(rpc_upgrade_handler))
        .route("/extensions", get(list_extensions_handler))
        .route("/extensions/{id}/download", get(download_extension_handler))
        .route(
            "/extensions/{id}/{version}/download",
            get(download_extension_version_handler),
        )
        .route("/api/{*path}", get(api_handler))
        .route("/predict_edits/v2", post(predict_edits_handler))
        .layer(build_http_layers(config))
        .with_state(state)
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP/WS connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves TLS with `axum-server`, reusing the pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &super::config::TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    info!(%addr, "serving TLS connections");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

/// Closes every registered connection and waits for in-flight work.
async fn drain_connections(registry: &ConnectionRegistry, shutdown_ctrl: &ShutdownController) {
    shutdown_ctrl.trigger_shutdown();

    let handles = registry.drain_all();
    if !handles.is_empty() {
        info!(count = handles.len(), "draining connections");
        for handle in &handles {
            let _ = handle.try_send(OutboundMessage::Close(Some(
                "server shutting down".to_string(),
            )));
        }
    }

    if shutdown_ctrl.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("all connections drained");
    } else {
        warn!("drain timeout expired with in-flight requests remaining");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HealthState;

    fn module() -> NetworkModule {
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        };
        NetworkModule::new(config, Services::default())
    }

    #[test]
    fn new_creates_module_without_binding() {
        assert!(module().listener.is_none());
    }

    #[test]
    fn accessors_return_shared_arcs() {
        let module = module();
        assert!(Arc::ptr_eq(&module.registry(), &module.registry()));
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
        assert!(Arc::ptr_eq(
            &module.services().dispatcher,
            &module.services().dispatcher
        ));
    }

    #[test]
    fn build_router_creates_router() {
        let _router = module().build_router();
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_drains_and_stops_on_signal() {
        let mut module = module();
        module.start().await.unwrap();
        let controller = module.shutdown_controller();
        let (_handle, _rx) = module
            .registry()
            .register(1, &crate::network::ConnectionConfig::default());

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(async move {
            let _ = rx.await;
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.health_state(), HealthState::Ready);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let _ = module().serve(std::future::pending::<()>()).await;
    }
}
