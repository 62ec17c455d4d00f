//! Many sessions mutating shared state at once.

mod common;

use std::collections::HashSet;

use common::{RpcClient, TestServer};
use zedex_core::messages::{CreateChannel, SendChannelMessage};
use zedex_core::{string_to_u64_hash, Payload};
use zedex_server::Services;

const CLIENTS: u64 = 8;
const MESSAGES_PER_CLIENT: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_senders_lose_no_messages() {
    let server = TestServer::start(Services::default()).await;
    let channel_id = string_to_u64_hash("busy");

    let mut tasks = Vec::new();
    for identity in 1..=CLIENTS {
        let mut client = RpcClient::connect(&server, identity).await;
        tasks.push(tokio::spawn(async move {
            client
                .request(Payload::CreateChannel(CreateChannel {
                    name: "busy".to_string(),
                    parent_id: None,
                }))
                .await;
            for n in 0..MESSAGES_PER_CLIENT {
                client
                    .request(Payload::SendChannelMessage(SendChannelMessage {
                        channel_id,
                        body: format!("{identity}:{n}"),
                        ..SendChannelMessage::default()
                    }))
                    .await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let world = server.services.dispatcher.world();
    assert_eq!(world.channel_count(), 1);

    let history = world.history(channel_id);
    assert_eq!(history.len(), CLIENTS as usize * MESSAGES_PER_CLIENT);
    let bodies: HashSet<_> = history.iter().map(|m| m.body.clone()).collect();
    assert_eq!(bodies.len(), history.len());

    // Each sender's own messages keep their send order.
    for identity in 1..=CLIENTS {
        let own: Vec<_> = history
            .iter()
            .filter(|m| m.sender_id == identity)
            .map(|m| m.body.clone())
            .collect();
        let expected: Vec<_> = (0..MESSAGES_PER_CLIENT)
            .map(|n| format!("{identity}:{n}"))
            .collect();
        assert_eq!(own, expected);
    }

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_channel_creation_converges() {
    let server = TestServer::start(Services::default()).await;

    let mut tasks = Vec::new();
    for identity in 1..=CLIENTS {
        let mut client = RpcClient::connect(&server, identity).await;
        tasks.push(tokio::spawn(async move {
            let reply = client
                .request(Payload::CreateChannel(CreateChannel {
                    name: "race".to_string(),
                    parent_id: None,
                }))
                .await;
            match reply.payload {
                Some(Payload::CreateChannelResponse(r)) => r.channel.map(|c| c.id),
                _ => None,
            }
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }
    assert_eq!(ids, HashSet::from([Some(string_to_u64_hash("race"))]));
    assert_eq!(server.services.dispatcher.world().channel_count(), 1);

    server.stop().await;
}
