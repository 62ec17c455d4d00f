//! Process-wide collaboration state shared by every session.
//!
//! A [`World`] is constructed once per server and handed to the dispatcher
//! by `Arc`. Nothing here is persisted; all state lives as long as the
//! process. Every mutation goes through the container primitives of
//! [`zedex_core::containers`], so concurrent sessions never lose updates.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::seq::IndexedRandom;
use rand::Rng;
use zedex_core::hash::string_to_u64_hash;
use zedex_core::messages::{
    Channel, ChannelMember, ChannelMessage, ChannelRole, ChannelVisibility, MemberKind,
    SendChannelMessage, User,
};
use zedex_core::ConcurrentMap;

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "daring", "eager", "fuzzy", "gentle", "hollow", "idle", "jolly",
    "keen", "lucky", "mellow", "nimble", "odd", "plucky", "quiet", "rusty", "sunny", "tidy",
    "upbeat", "vivid", "witty", "young", "zesty",
];

const ANIMALS: &[&str] = &[
    "badger", "crane", "dingo", "eel", "ferret", "gecko", "heron", "ibis", "jackal", "koala",
    "lemur", "marten", "newt", "otter", "panda", "quail", "raven", "stoat", "tapir", "urchin",
    "vole", "walrus", "yak", "zebra",
];

/// Random display name of the form `<adjective>-<animal>-<4 digits>`.
#[must_use]
pub fn generate_display_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("anonymous");
    let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("user");
    let digits: u16 = rng.random_range(0..10_000);
    format!("{adjective}-{animal}-{digits:04}")
}

/// Shared domain state: users, channels, memberships, and chat history.
#[derive(Debug, Default)]
pub struct World {
    users: ConcurrentMap<u64, User>,
    channels: ConcurrentMap<u64, Channel>,
    members: ConcurrentMap<u64, Vec<ChannelMember>>,
    messages: ConcurrentMap<u64, Vec<ChannelMessage>>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Returns the user for `id`, creating it with a generated display name
    /// on first reference. Concurrent first references create exactly one
    /// record; every caller sees the same name.
    pub fn ensure_user(&self, id: u64) -> User {
        self.users.get_or_insert_with(id, || {
            let name = generate_display_name();
            User {
                id,
                github_login: name.clone(),
                avatar_url: String::new(),
                email: None,
                name: Some(name),
            }
        })
    }

    /// Users for `ids`, in request order, materializing unseen ids.
    pub fn users_for(&self, ids: &[u64]) -> Vec<User> {
        ids.iter().map(|&id| self.ensure_user(id)).collect()
    }

    /// Every known user, ordered by id.
    #[must_use]
    pub fn all_users(&self) -> Vec<User> {
        let mut users = self.users.values();
        users.sort_by_key(|u| u.id);
        users
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// Creates the channel called `name` unless it already exists, and
    /// returns the stored record. The id is `string_to_u64_hash(name)`, so
    /// repeated or concurrent creation of one name yields one channel.
    ///
    /// A new channel under `parent_id` inherits the parent's path plus the
    /// parent itself; an existing channel keeps its original placement.
    pub fn create_channel(&self, name: &str, parent_id: Option<u64>) -> Channel {
        let id = string_to_u64_hash(name);
        self.channels.transaction(|tx| {
            if let Some(existing) = tx.get(&id) {
                return existing.clone();
            }
            let parent_path = parent_id
                .map(|parent| {
                    let mut path = tx
                        .get(&parent)
                        .map(|p| p.parent_path.clone())
                        .unwrap_or_default();
                    path.push(parent);
                    path
                })
                .unwrap_or_default();
            let channel = Channel {
                id,
                name: name.to_string(),
                visibility: ChannelVisibility::Members as i32,
                parent_path,
            };
            tx.set(id, channel.clone());
            channel
        })
    }

    /// Every channel, ordered by name.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = self.channels.values();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        channels
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Appends an invitation for `user_id` to `channel_id`. Invitations are
    /// not deduplicated.
    pub fn invite_member(&self, channel_id: u64, user_id: u64, role: ChannelRole) -> ChannelMember {
        self.ensure_user(user_id);
        let member = ChannelMember {
            user_id,
            channel_id,
            kind: MemberKind::Invitee as i32,
            role: role as i32,
        };
        self.members
            .transaction(|tx| tx.entry_or_default(channel_id).push(member.clone()));
        member
    }

    /// Members recorded for `channel_id`, in invitation order.
    #[must_use]
    pub fn members(&self, channel_id: u64) -> Vec<ChannelMember> {
        self.members.get(&channel_id)
    }

    // -----------------------------------------------------------------------
    // Chat history
    // -----------------------------------------------------------------------

    /// Appends a message from `sender_id` to its channel's history and
    /// returns the stored record.
    ///
    /// The message id is the send time in nanoseconds since the Unix epoch,
    /// so two sends within one clock tick can share an id.
    pub fn append_message(&self, sender_id: u64, request: SendChannelMessage) -> ChannelMessage {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let message = ChannelMessage {
            id: u64::try_from(now.as_nanos()).unwrap_or(u64::MAX),
            body: request.body,
            timestamp: now.as_secs(),
            sender_id,
            nonce: request.nonce,
            mentions: request.mentions,
            reply_to_message_id: request.reply_to_message_id,
            channel_id: request.channel_id,
        };
        self.messages
            .transaction(|tx| tx.entry_or_default(message.channel_id).push(message.clone()));
        message
    }

    /// Full history of `channel_id`, oldest first.
    #[must_use]
    pub fn history(&self, channel_id: u64) -> Vec<ChannelMessage> {
        self.messages.get(&channel_id)
    }

    /// Histories of every channel in `channel_ids`, concatenated in request
    /// order.
    #[must_use]
    pub fn histories(&self, channel_ids: &[u64]) -> Vec<ChannelMessage> {
        channel_ids
            .iter()
            .flat_map(|id| self.history(*id))
            .collect()
    }
}
