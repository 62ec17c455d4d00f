//! Channel, membership, and channel chat messages.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelVisibility {
    Public = 0,
    Members = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelRole {
    Admin = 0,
    Member = 1,
    Guest = 2,
    Banned = 3,
    Talker = 4,
}

/// Whether a member has joined or only been invited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MemberKind {
    Member = 0,
    Invitee = 1,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Channel {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(enumeration = "ChannelVisibility", tag = "3")]
    pub visibility: i32,
    #[prost(uint64, repeated, tag = "5")]
    pub parent_path: Vec<u64>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ChannelMember {
    #[prost(uint64, tag = "1")]
    pub user_id: u64,
    #[prost(uint64, tag = "2")]
    pub channel_id: u64,
    #[prost(enumeration = "MemberKind", tag = "3")]
    pub kind: i32,
    #[prost(enumeration = "ChannelRole", tag = "4")]
    pub role: i32,
}

/// Client-chosen deduplication token for a sent message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Nonce {
    #[prost(uint64, tag = "1")]
    pub upper_half: u64,
    #[prost(uint64, tag = "2")]
    pub lower_half: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Range {
    #[prost(uint64, tag = "1")]
    pub start: u64,
    #[prost(uint64, tag = "2")]
    pub end: u64,
}

/// A `@user` mention covering `range` of the message body.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ChatMention {
    #[prost(message, optional, tag = "1")]
    pub range: Option<Range>,
    #[prost(uint64, tag = "2")]
    pub user_id: u64,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ChannelMessage {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub body: String,
    /// Unix seconds.
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
    #[prost(uint64, tag = "4")]
    pub sender_id: u64,
    #[prost(message, optional, tag = "5")]
    pub nonce: Option<Nonce>,
    #[prost(message, repeated, tag = "6")]
    pub mentions: Vec<ChatMention>,
    #[prost(uint64, optional, tag = "7")]
    pub reply_to_message_id: Option<u64>,
    #[prost(uint64, tag = "8")]
    pub channel_id: u64,
}

/// Full channel list pushed to a client.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateChannels {
    #[prost(message, repeated, tag = "1")]
    pub channels: Vec<Channel>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeToChannels {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateChannel {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint64, optional, tag = "2")]
    pub parent_id: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateChannelResponse {
    #[prost(message, optional, tag = "1")]
    pub channel: Option<Channel>,
    #[prost(uint64, optional, tag = "2")]
    pub parent_id: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InviteChannelMember {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
    #[prost(uint64, tag = "2")]
    pub user_id: u64,
    #[prost(enumeration = "ChannelRole", tag = "4")]
    pub role: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChannelMembers {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
    #[prost(string, tag = "2")]
    pub query: String,
    #[prost(uint64, tag = "3")]
    pub limit: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChannelMembersResponse {
    #[prost(message, repeated, tag = "1")]
    pub members: Vec<ChannelMember>,
    #[prost(message, repeated, tag = "2")]
    pub users: Vec<super::User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinChannelChat {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinChannelChatResponse {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<ChannelMessage>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveChannelChat {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinChannelBuffer {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendChannelMessage {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
    #[prost(string, tag = "2")]
    pub body: String,
    #[prost(message, optional, tag = "3")]
    pub nonce: Option<Nonce>,
    #[prost(message, repeated, tag = "4")]
    pub mentions: Vec<ChatMention>,
    #[prost(uint64, optional, tag = "5")]
    pub reply_to_message_id: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendChannelMessageResponse {
    #[prost(message, optional, tag = "1")]
    pub message: Option<ChannelMessage>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AckChannelMessage {
    #[prost(uint64, tag = "1")]
    pub channel_id: u64,
    #[prost(uint64, tag = "2")]
    pub message_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChannelMessagesById {
    #[prost(uint64, repeated, tag = "1")]
    pub message_ids: Vec<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChannelMessagesResponse {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<ChannelMessage>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}
