//! Shared harness: a real server on an OS-assigned port and a minimal RPC
//! client speaking the envelope protocol over tokio-tungstenite.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use zedex_core::codec::InboundFraming;
use zedex_core::{Envelope, FrameCodec, Payload};
use zedex_server::network::{ConnectionRegistry, ShutdownController};
use zedex_server::{NetworkConfig, NetworkModule, Services};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    pub port: u16,
    pub registry: Arc<ConnectionRegistry>,
    pub shutdown: Arc<ShutdownController>,
    pub services: Services,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(services: Services) -> Self {
        Self::start_with(NetworkConfig::default(), services).await
    }

    /// Like [`TestServer::start`], but with caller-supplied settings; host and
    /// port are always overridden to a loopback ephemeral port.
    pub async fn start_with(config: NetworkConfig, services: Services) -> Self {
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..config
        };
        let mut module = NetworkModule::new(config, services.clone());
        let port = module.start().await.expect("bind");
        let registry = module.registry();
        let shutdown = module.shutdown_controller();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(module.serve(async move {
            let _ = stopped.await;
        }));

        Self {
            port,
            registry,
            shutdown,
            services,
            stop: Some(stop),
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/handle-rpc", self.port)
    }

    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.expect("server task").expect("server result");
    }
}

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a websocket to `/handle-rpc` with the given raw `Authorization`.
pub async fn connect_raw(
    server: &TestServer,
    authorization: Option<&str>,
) -> Result<Socket, tokio_tungstenite::tungstenite::Error> {
    let mut request = server
        .ws_url()
        .into_client_request()
        .expect("valid ws url");
    if let Some(value) = authorization {
        request.headers_mut().insert(
            "authorization",
            HeaderValue::from_str(value).expect("header value"),
        );
    }
    let (socket, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(socket)
}

pub struct RpcClient {
    socket: Socket,
    codec: FrameCodec,
    next_id: u32,
    pub greeting: Envelope,
}

impl RpcClient {
    /// Connects as `identity` and consumes the server's `Hello`.
    pub async fn connect(server: &TestServer, identity: u64) -> Self {
        Self::connect_with_auth(server, &format!("{identity} any-token")).await
    }

    /// Connects with a raw `Authorization` value and consumes the `Hello`.
    pub async fn connect_with_auth(server: &TestServer, authorization: &str) -> Self {
        let socket = connect_raw(server, Some(authorization))
            .await
            .expect("upgrade accepted");
        let mut client = Self {
            socket,
            codec: FrameCodec::new(4, InboundFraming::Zstd, 16 * 1024 * 1024),
            next_id: 1,
            greeting: Envelope::default(),
        };
        client.greeting = client.recv().await.expect("greeting");
        client
    }

    pub async fn send(&mut self, payload: Payload) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.send_raw(Envelope::new(id, payload).encode_to_vec()).await;
        id
    }

    pub async fn send_raw(&mut self, frame: Vec<u8>) {
        self.try_send_raw(frame).await.expect("send frame");
    }

    /// Sends a frame the server may refuse mid-write.
    pub async fn try_send_raw(
        &mut self,
        frame: Vec<u8>,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.socket.send(Message::Binary(frame.into())).await
    }

    /// Next envelope, or `None` once the server closes the socket.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.socket.next())
                .await
                .expect("server answered in time");
            match next {
                Some(Ok(Message::Binary(frame))) => {
                    return Some(self.codec.decode(&frame).expect("decodable frame"));
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Sends `payload` and waits for the envelope responding to it.
    pub async fn request(&mut self, payload: Payload) -> Envelope {
        let id = self.send(payload).await;
        loop {
            let envelope = self.recv().await.expect("connection open");
            if envelope.responding_to == Some(id) {
                return envelope;
            }
        }
    }
}
