//! Variant dispatch for inbound envelopes.
//!
//! [`Dispatcher::dispatch`] is synchronous: it touches only the in-memory
//! [`World`] and returns the envelopes to send back on the originating
//! connection, in order. Variants without a handler are logged at debug and
//! dropped so newer clients keep working.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use zedex_core::messages::{
    Ack, AcceptTermsOfServiceResponse, ChannelRole, CreateChannelResponse,
    GetChannelMembersResponse, GetChannelMessagesResponse, GetLlmTokenResponse,
    GetNotificationsResponse, GetPrivateUserInfoResponse, Hello, JoinChannelChatResponse, PeerId,
    SendChannelMessageResponse, UpdateChannels, UsersResponse,
};
use zedex_core::{Envelope, Payload};

use super::ids::IdAllocator;
use super::world::World;

/// Token handed out for `GetLlmToken`. Nothing validates it.
pub const PLACEHOLDER_LLM_TOKEN: &str = "zedex-local-token";

enum Outbound {
    /// Direct reply, correlated to the request.
    Reply(Payload),
    /// Unsolicited push; carries no `responding_to`.
    Push(Payload),
    None,
}

/// Turns inbound envelopes into state changes and outbound envelopes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    world: Arc<World>,
    ids: Arc<IdAllocator>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(world: Arc<World>, ids: Arc<IdAllocator>) -> Self {
        Self { world, ids }
    }

    #[must_use]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Greeting pushed once a session is registered.
    #[must_use]
    pub fn greeting(&self, identity: u64) -> Envelope {
        self.push(Payload::Hello(Hello {
            peer_id: Some(PeerId::for_identity(identity)),
        }))
    }

    /// Handles one inbound envelope from the connection authenticated as
    /// `identity` and returns what to send back, in order.
    pub fn dispatch(&self, identity: u64, envelope: Envelope) -> Vec<Envelope> {
        let request_id = envelope.request_id();
        let Some(payload) = envelope.payload else {
            metrics::counter!("zedex_rpc_frames_total", "variant" => "None").increment(1);
            debug!(identity, "envelope without a known payload; dropping");
            return Vec::new();
        };
        let variant = payload.name();
        metrics::counter!("zedex_rpc_frames_total", "variant" => variant).increment(1);
        debug!(identity, variant, request_id, "dispatching");

        match self.handle(identity, payload) {
            Outbound::Reply(reply) => vec![self.reply(request_id, reply)],
            Outbound::Push(push) => vec![self.push(push)],
            Outbound::None => Vec::new(),
        }
    }

    fn handle(&self, identity: u64, payload: Payload) -> Outbound {
        let world = &self.world;
        match payload {
            Payload::Hello(_) | Payload::SubscribeToChannels(_) => {
                Outbound::Push(Payload::UpdateChannels(UpdateChannels {
                    channels: world.channels(),
                }))
            }
            Payload::Ping(_) | Payload::LeaveChannelChat(_) | Payload::JoinChannelBuffer(_) => {
                Outbound::Reply(Payload::Ack(Ack {}))
            }

            Payload::GetUsers(req) => Outbound::Reply(Payload::UsersResponse(UsersResponse {
                users: world.users_for(&req.user_ids),
            })),
            Payload::FuzzySearchUsers(_) => {
                Outbound::Reply(Payload::UsersResponse(UsersResponse {
                    users: world.all_users(),
                }))
            }
            Payload::GetPrivateUserInfo(_) => Outbound::Reply(Payload::GetPrivateUserInfoResponse(
                GetPrivateUserInfoResponse {
                    metrics_id: identity.to_string(),
                    staff: false,
                    flags: Vec::new(),
                    accepted_tos_at: Some(unix_now()),
                },
            )),
            Payload::AcceptTermsOfService(_) => Outbound::Reply(
                Payload::AcceptTermsOfServiceResponse(AcceptTermsOfServiceResponse {
                    accepted_tos_at: unix_now(),
                }),
            ),
            Payload::GetLlmToken(_) => {
                Outbound::Reply(Payload::GetLlmTokenResponse(GetLlmTokenResponse {
                    token: PLACEHOLDER_LLM_TOKEN.to_string(),
                }))
            }
            Payload::GetNotifications(_) => Outbound::Reply(Payload::GetNotificationsResponse(
                GetNotificationsResponse {
                    notifications: Vec::new(),
                    done: true,
                },
            )),

            Payload::CreateChannel(req) => {
                let channel = world.create_channel(&req.name, req.parent_id);
                Outbound::Reply(Payload::CreateChannelResponse(CreateChannelResponse {
                    channel: Some(channel),
                    parent_id: req.parent_id,
                }))
            }
            Payload::InviteChannelMember(req) => {
                let role = ChannelRole::try_from(req.role).unwrap_or(ChannelRole::Member);
                world.invite_member(req.channel_id, req.user_id, role);
                Outbound::None
            }
            Payload::GetChannelMembers(req) => {
                let members = world.members(req.channel_id);
                let mut seen = HashSet::new();
                let user_ids: Vec<u64> = members
                    .iter()
                    .map(|m| m.user_id)
                    .filter(|id| seen.insert(*id))
                    .collect();
                Outbound::Reply(Payload::GetChannelMembersResponse(
                    GetChannelMembersResponse {
                        members,
                        users: world.users_for(&user_ids),
                    },
                ))
            }
            Payload::JoinChannelChat(req) => {
                Outbound::Reply(Payload::JoinChannelChatResponse(JoinChannelChatResponse {
                    messages: world.history(req.channel_id),
                    done: true,
                }))
            }
            Payload::SendChannelMessage(req) => {
                let message = world.append_message(identity, req);
                Outbound::Reply(Payload::SendChannelMessageResponse(
                    SendChannelMessageResponse {
                        message: Some(message),
                    },
                ))
            }
            Payload::GetChannelMessagesById(req) => Outbound::Reply(
                Payload::GetChannelMessagesResponse(GetChannelMessagesResponse {
                    messages: world.histories(&req.message_ids),
                    done: true,
                }),
            ),
            Payload::AckChannelMessage(_) => Outbound::None,

            other => {
                debug!(identity, variant = other.name(), "unmapped message; dropping");
                Outbound::None
            }
        }
    }

    fn reply(&self, request_id: Option<u32>, payload: Payload) -> Envelope {
        Envelope {
            id: self.ids.next_id(),
            responding_to: request_id,
            original_sender_id: None,
            payload: Some(payload),
        }
    }

    fn push(&self, payload: Payload) -> Envelope {
        Envelope::new(self.ids.next_id(), payload)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use zedex_core::hash::string_to_u64_hash;
    use zedex_core::messages::*;

    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(World::new()), Arc::new(IdAllocator::new()))
    }

    fn request(id: u32, payload: Payload) -> Envelope {
        Envelope::new(id, payload)
    }

    fn only(mut out: Vec<Envelope>) -> Envelope {
        assert_eq!(out.len(), 1, "expected exactly one outbound envelope");
        out.remove(0)
    }

    #[test]
    fn greeting_carries_peer_id() {
        let d = dispatcher();
        let hello = d.greeting(42);
        assert!(hello.responding_to.is_none());
        match hello.payload {
            Some(Payload::Hello(Hello { peer_id: Some(peer) })) => {
                assert_eq!(peer.identity(), 42);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn hello_pushes_channel_list() {
        let d = dispatcher();
        d.world().create_channel("general", None);

        let out = only(d.dispatch(1, request(5, Payload::Hello(Hello::default()))));
        assert!(out.responding_to.is_none());
        match out.payload {
            Some(Payload::UpdateChannels(update)) => {
                assert_eq!(update.channels.len(), 1);
                assert_eq!(update.channels[0].name, "general");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn hello_on_empty_world_pushes_empty_list() {
        let d = dispatcher();
        let out = only(d.dispatch(1, request(5, Payload::Hello(Hello::default()))));
        assert!(matches!(
            out.payload,
            Some(Payload::UpdateChannels(UpdateChannels { ref channels })) if channels.is_empty()
        ));
    }

    #[test]
    fn replies_correlate_to_request_id() {
        let d = dispatcher();
        let requests = vec![
            Payload::Ping(Ping {}),
            Payload::GetUsers(GetUsers { user_ids: vec![1] }),
            Payload::FuzzySearchUsers(FuzzySearchUsers { query: "x".into() }),
            Payload::GetPrivateUserInfo(GetPrivateUserInfo {}),
            Payload::CreateChannel(CreateChannel {
                name: "c".into(),
                parent_id: None,
            }),
            Payload::JoinChannelChat(JoinChannelChat { channel_id: 1 }),
            Payload::GetChannelMembers(GetChannelMembers::default()),
            Payload::SendChannelMessage(SendChannelMessage::default()),
            Payload::GetChannelMessagesById(GetChannelMessagesById::default()),
            Payload::AcceptTermsOfService(AcceptTermsOfService {}),
            Payload::GetLlmToken(GetLlmToken {}),
            Payload::LeaveChannelChat(LeaveChannelChat { channel_id: 1 }),
            Payload::JoinChannelBuffer(JoinChannelBuffer { channel_id: 1 }),
            Payload::GetNotifications(GetNotifications::default()),
        ];

        for (i, payload) in requests.into_iter().enumerate() {
            let id = 100 + u32::try_from(i).unwrap();
            let name = payload.name();
            let out = only(d.dispatch(7, request(id, payload)));
            assert_eq!(out.responding_to, Some(id), "variant {name}");
            assert_ne!(out.id, 0);
        }
    }

    #[test]
    fn request_without_id_gets_uncorrelated_reply() {
        let d = dispatcher();
        let out = only(d.dispatch(7, request(0, Payload::Ping(Ping {}))));
        assert!(out.responding_to.is_none());
        assert!(matches!(out.payload, Some(Payload::Ack(_))));
    }

    #[test]
    fn outbound_ids_are_fresh() {
        let d = dispatcher();
        let a = only(d.dispatch(7, request(1, Payload::Ping(Ping {}))));
        let b = only(d.dispatch(7, request(1, Payload::Ping(Ping {}))));
        assert!(b.id > a.id);
    }

    #[test]
    fn get_users_preserves_order_and_names() {
        let d = dispatcher();
        let first = only(d.dispatch(
            1,
            request(1, Payload::GetUsers(GetUsers { user_ids: vec![9, 3, 7] })),
        ));
        let Some(Payload::UsersResponse(first)) = first.payload else {
            panic!("expected UsersResponse");
        };
        assert_eq!(
            first.users.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![9, 3, 7]
        );

        let second = only(d.dispatch(
            1,
            request(2, Payload::GetUsers(GetUsers { user_ids: vec![3] })),
        ));
        let Some(Payload::UsersResponse(second)) = second.payload else {
            panic!("expected UsersResponse");
        };
        assert_eq!(second.users[0].github_login, first.users[1].github_login);
    }

    #[test]
    fn create_channel_twice_returns_same_id() {
        let d = dispatcher();
        let create = || {
            Payload::CreateChannel(CreateChannel {
                name: "general".into(),
                parent_id: None,
            })
        };

        let mut ids = Vec::new();
        for req_id in [1, 2] {
            let out = only(d.dispatch(42, request(req_id, create())));
            let Some(Payload::CreateChannelResponse(resp)) = out.payload else {
                panic!("expected CreateChannelResponse");
            };
            let channel = resp.channel.unwrap();
            assert_eq!(channel.name, "general");
            ids.push(channel.id);
        }
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[0], string_to_u64_hash("general"));
        assert_eq!(d.world().channel_count(), 1);
    }

    #[test]
    fn invite_has_no_reply_and_shows_in_members() {
        let d = dispatcher();
        let out = d.dispatch(
            1,
            request(
                1,
                Payload::InviteChannelMember(InviteChannelMember {
                    channel_id: 5,
                    user_id: 77,
                    role: ChannelRole::Talker as i32,
                }),
            ),
        );
        assert!(out.is_empty());

        let out = only(d.dispatch(
            1,
            request(
                2,
                Payload::GetChannelMembers(GetChannelMembers {
                    channel_id: 5,
                    ..GetChannelMembers::default()
                }),
            ),
        ));
        let Some(Payload::GetChannelMembersResponse(resp)) = out.payload else {
            panic!("expected GetChannelMembersResponse");
        };
        assert_eq!(resp.members.len(), 1);
        assert_eq!(resp.members[0].user_id, 77);
        assert_eq!(resp.members[0].role, ChannelRole::Talker as i32);
        assert_eq!(resp.users.len(), 1);
        assert_eq!(resp.users[0].id, 77);
    }

    #[test]
    fn invite_with_unknown_role_defaults_to_member() {
        let d = dispatcher();
        d.dispatch(
            1,
            request(
                1,
                Payload::InviteChannelMember(InviteChannelMember {
                    channel_id: 5,
                    user_id: 77,
                    role: 99,
                }),
            ),
        );
        assert_eq!(d.world().members(5)[0].role, ChannelRole::Member as i32);
    }

    #[test]
    fn send_then_fetch_by_channel_id() {
        let d = dispatcher();
        let out = only(d.dispatch(
            42,
            request(
                1,
                Payload::SendChannelMessage(SendChannelMessage {
                    channel_id: 11,
                    body: "hi".into(),
                    ..SendChannelMessage::default()
                }),
            ),
        ));
        let Some(Payload::SendChannelMessageResponse(sent)) = out.payload else {
            panic!("expected SendChannelMessageResponse");
        };
        let sent = sent.message.unwrap();
        assert_eq!(sent.sender_id, 42);
        assert_eq!(sent.body, "hi");

        let out = only(d.dispatch(
            42,
            request(
                2,
                Payload::GetChannelMessagesById(GetChannelMessagesById {
                    message_ids: vec![11],
                }),
            ),
        ));
        let Some(Payload::GetChannelMessagesResponse(resp)) = out.payload else {
            panic!("expected GetChannelMessagesResponse");
        };
        assert_eq!(resp.messages, vec![sent.clone()]);

        let out = only(d.dispatch(
            43,
            request(3, Payload::JoinChannelChat(JoinChannelChat { channel_id: 11 })),
        ));
        let Some(Payload::JoinChannelChatResponse(history)) = out.payload else {
            panic!("expected JoinChannelChatResponse");
        };
        assert_eq!(history.messages, vec![sent]);
        assert!(history.done);
    }

    #[test]
    fn ack_channel_message_is_silent() {
        let d = dispatcher();
        let out = d.dispatch(
            1,
            request(
                1,
                Payload::AckChannelMessage(AckChannelMessage {
                    channel_id: 1,
                    message_id: 2,
                }),
            ),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn subscribe_pushes_channels() {
        let d = dispatcher();
        d.world().create_channel("a", None);
        let out = only(d.dispatch(
            1,
            request(9, Payload::SubscribeToChannels(SubscribeToChannels {})),
        ));
        assert!(out.responding_to.is_none());
        assert!(matches!(out.payload, Some(Payload::UpdateChannels(_))));
    }

    #[test]
    fn llm_token_is_placeholder() {
        let d = dispatcher();
        let out = only(d.dispatch(1, request(1, Payload::GetLlmToken(GetLlmToken {}))));
        assert!(matches!(
            out.payload,
            Some(Payload::GetLlmTokenResponse(GetLlmTokenResponse { ref token }))
                if token == PLACEHOLDER_LLM_TOKEN
        ));
    }

    #[test]
    fn unmapped_variants_are_dropped() {
        let d = dispatcher();
        assert!(d.dispatch(1, request(1, Payload::Ack(Ack {}))).is_empty());
        assert!(d
            .dispatch(1, request(1, Payload::UsersResponse(UsersResponse::default())))
            .is_empty());
        assert!(d.dispatch(1, Envelope::default()).is_empty());
    }
}
