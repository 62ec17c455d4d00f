//! User lookup and account messages.

/// Public profile of a user.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct User {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub github_login: String,
    #[prost(string, tag = "3")]
    pub avatar_url: String,
    #[prost(string, optional, tag = "4")]
    pub email: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetUsers {
    #[prost(uint64, repeated, tag = "1")]
    pub user_ids: Vec<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FuzzySearchUsers {
    #[prost(string, tag = "1")]
    pub query: String,
}

/// Reply to both [`GetUsers`] and [`FuzzySearchUsers`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UsersResponse {
    #[prost(message, repeated, tag = "1")]
    pub users: Vec<User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPrivateUserInfo {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPrivateUserInfoResponse {
    #[prost(string, tag = "1")]
    pub metrics_id: String,
    #[prost(bool, tag = "2")]
    pub staff: bool,
    #[prost(string, repeated, tag = "3")]
    pub flags: Vec<String>,
    #[prost(uint64, optional, tag = "4")]
    pub accepted_tos_at: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AcceptTermsOfService {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AcceptTermsOfServiceResponse {
    /// Unix seconds.
    #[prost(uint64, tag = "1")]
    pub accepted_tos_at: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetLlmToken {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetLlmTokenResponse {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNotifications {
    #[prost(uint64, optional, tag = "1")]
    pub before_id: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub timestamp: u64,
    #[prost(string, tag = "3")]
    pub kind: String,
    #[prost(uint64, optional, tag = "4")]
    pub entity_id: Option<u64>,
    #[prost(string, tag = "5")]
    pub content: String,
    #[prost(bool, tag = "6")]
    pub is_read: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNotificationsResponse {
    #[prost(message, repeated, tag = "1")]
    pub notifications: Vec<Notification>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}
