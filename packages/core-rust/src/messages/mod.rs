//! Protobuf message schemas for the modeled subset of the editor RPC protocol.
//!
//! Every frame on the wire carries exactly one [`Envelope`]: correlation
//! metadata plus a single typed [`envelope::Payload`]. The envelope header
//! uses `id = 1`, `responding_to = 2` and `original_sender_id = 3`; payload
//! variant tags (4 onwards) are assigned by this crate and have not been
//! checked against the editor's own schema. Payload variants this crate
//! does not know decode as `payload: None`, which the dispatcher treats as
//! an unmapped message.

pub mod base;
pub mod channels;
pub mod users;

pub use base::{Ack, Error, ErrorCode, Hello, PeerId, Ping};
pub use channels::{
    AckChannelMessage, Channel, ChannelMember, ChannelMessage, ChannelRole, ChannelVisibility,
    ChatMention, CreateChannel, CreateChannelResponse, GetChannelMembers,
    GetChannelMembersResponse, GetChannelMessagesById, GetChannelMessagesResponse,
    InviteChannelMember, JoinChannelBuffer, JoinChannelChat, JoinChannelChatResponse,
    LeaveChannelChat, MemberKind, Nonce, Range, SendChannelMessage, SendChannelMessageResponse,
    SubscribeToChannels, UpdateChannels,
};
pub use envelope::Payload;
pub use users::{
    AcceptTermsOfService, AcceptTermsOfServiceResponse, FuzzySearchUsers, GetLlmToken,
    GetLlmTokenResponse, GetNotifications, GetNotificationsResponse, GetPrivateUserInfo,
    GetPrivateUserInfoResponse, GetUsers, Notification, User, UsersResponse,
};

/// Top-level wire message.
///
/// `id == 0` means the sender attached no id (the proto3 default); replies
/// to such a message carry no `responding_to`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(uint32, optional, tag = "2")]
    pub responding_to: Option<u32>,
    #[prost(message, optional, tag = "3")]
    pub original_sender_id: Option<PeerId>,
    #[prost(
        oneof = "envelope::Payload",
        tags = "4, 5, 6, 7, 70, 71, 72, 102, 103, 110, 111, 118, 119, 120, 123, 124, 130, 131, 132, 133, 134, 135, 136, 137, 140, 150, 151, 160, 161, 170, 171"
    )]
    pub payload: Option<envelope::Payload>,
}

impl Envelope {
    /// Creates an envelope with the given id and payload and no correlation.
    #[must_use]
    pub fn new(id: u32, payload: Payload) -> Self {
        Self {
            id,
            responding_to: None,
            original_sender_id: None,
            payload: Some(payload),
        }
    }

    /// The sender's id, or `None` when the sender left it unset.
    #[must_use]
    pub fn request_id(&self) -> Option<u32> {
        (self.id != 0).then_some(self.id)
    }

    /// Wire name of the payload variant, `"None"` when absent or unknown.
    #[must_use]
    pub fn payload_name(&self) -> &'static str {
        self.payload.as_ref().map_or("None", Payload::name)
    }
}

pub mod envelope {
    use super::{base, channels, users};

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "4")]
        Hello(base::Hello),
        #[prost(message, tag = "5")]
        Ack(base::Ack),
        #[prost(message, tag = "6")]
        Error(base::Error),
        #[prost(message, tag = "7")]
        Ping(base::Ping),

        #[prost(message, tag = "70")]
        GetUsers(users::GetUsers),
        #[prost(message, tag = "71")]
        FuzzySearchUsers(users::FuzzySearchUsers),
        #[prost(message, tag = "72")]
        UsersResponse(users::UsersResponse),
        #[prost(message, tag = "102")]
        GetPrivateUserInfo(users::GetPrivateUserInfo),
        #[prost(message, tag = "103")]
        GetPrivateUserInfoResponse(users::GetPrivateUserInfoResponse),

        #[prost(message, tag = "110")]
        UpdateChannels(channels::UpdateChannels),
        #[prost(message, tag = "111")]
        SubscribeToChannels(channels::SubscribeToChannels),
        #[prost(message, tag = "118")]
        CreateChannel(channels::CreateChannel),
        #[prost(message, tag = "119")]
        CreateChannelResponse(channels::CreateChannelResponse),
        #[prost(message, tag = "120")]
        InviteChannelMember(channels::InviteChannelMember),
        #[prost(message, tag = "123")]
        GetChannelMembers(channels::GetChannelMembers),
        #[prost(message, tag = "124")]
        GetChannelMembersResponse(channels::GetChannelMembersResponse),
        #[prost(message, tag = "130")]
        JoinChannelChat(channels::JoinChannelChat),
        #[prost(message, tag = "131")]
        JoinChannelChatResponse(channels::JoinChannelChatResponse),
        #[prost(message, tag = "132")]
        LeaveChannelChat(channels::LeaveChannelChat),
        #[prost(message, tag = "133")]
        SendChannelMessage(channels::SendChannelMessage),
        #[prost(message, tag = "134")]
        SendChannelMessageResponse(channels::SendChannelMessageResponse),
        #[prost(message, tag = "135")]
        AckChannelMessage(channels::AckChannelMessage),
        #[prost(message, tag = "136")]
        GetChannelMessagesById(channels::GetChannelMessagesById),
        #[prost(message, tag = "137")]
        GetChannelMessagesResponse(channels::GetChannelMessagesResponse),
        #[prost(message, tag = "140")]
        JoinChannelBuffer(channels::JoinChannelBuffer),

        #[prost(message, tag = "150")]
        GetNotifications(users::GetNotifications),
        #[prost(message, tag = "151")]
        GetNotificationsResponse(users::GetNotificationsResponse),
        #[prost(message, tag = "160")]
        AcceptTermsOfService(users::AcceptTermsOfService),
        #[prost(message, tag = "161")]
        AcceptTermsOfServiceResponse(users::AcceptTermsOfServiceResponse),
        #[prost(message, tag = "170")]
        GetLlmToken(users::GetLlmToken),
        #[prost(message, tag = "171")]
        GetLlmTokenResponse(users::GetLlmTokenResponse),
    }

    impl Payload {
        /// Variant name, used for logging and metric labels.
        #[must_use]
        pub fn name(&self) -> &'static str {
            match self {
                Self::Hello(_) => "Hello",
                Self::Ack(_) => "Ack",
                Self::Error(_) => "Error",
                Self::Ping(_) => "Ping",
                Self::GetUsers(_) => "GetUsers",
                Self::FuzzySearchUsers(_) => "FuzzySearchUsers",
                Self::UsersResponse(_) => "UsersResponse",
                Self::GetPrivateUserInfo(_) => "GetPrivateUserInfo",
                Self::GetPrivateUserInfoResponse(_) => "GetPrivateUserInfoResponse",
                Self::UpdateChannels(_) => "UpdateChannels",
                Self::SubscribeToChannels(_) => "SubscribeToChannels",
                Self::CreateChannel(_) => "CreateChannel",
                Self::CreateChannelResponse(_) => "CreateChannelResponse",
                Self::InviteChannelMember(_) => "InviteChannelMember",
                Self::GetChannelMembers(_) => "GetChannelMembers",
                Self::GetChannelMembersResponse(_) => "GetChannelMembersResponse",
                Self::JoinChannelChat(_) => "JoinChannelChat",
                Self::JoinChannelChatResponse(_) => "JoinChannelChatResponse",
                Self::LeaveChannelChat(_) => "LeaveChannelChat",
                Self::SendChannelMessage(_) => "SendChannelMessage",
                Self::SendChannelMessageResponse(_) => "SendChannelMessageResponse",
                Self::AckChannelMessage(_) => "AckChannelMessage",
                Self::GetChannelMessagesById(_) => "GetChannelMessagesById",
                Self::GetChannelMessagesResponse(_) => "GetChannelMessagesResponse",
                Self::JoinChannelBuffer(_) => "JoinChannelBuffer",
                Self::GetNotifications(_) => "GetNotifications",
                Self::GetNotificationsResponse(_) => "GetNotificationsResponse",
                Self::AcceptTermsOfService(_) => "AcceptTermsOfService",
                Self::AcceptTermsOfServiceResponse(_) => "AcceptTermsOfServiceResponse",
                Self::GetLlmToken(_) => "GetLlmToken",
                Self::GetLlmTokenResponse(_) => "GetLlmTokenResponse",
            }
        }
    }
}
