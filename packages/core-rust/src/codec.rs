//! Envelope codec: protobuf serialization plus zstd frame compression.
//!
//! Outbound frames are always `zstd(protobuf(Envelope))`. Inbound frames are
//! decoded as delivered by the transport unless [`InboundFraming::Zstd`] is
//! selected; whether the editor compresses its own frames has not been
//! confirmed against live traffic, so the raw path stays the default.

use std::io::Write;

use prost::Message;
use thiserror::Error;

use crate::messages::Envelope;

/// zstd level used for outbound frames. Low levels favour latency over ratio.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 4;

/// Errors produced while turning envelopes into frames and back.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Inbound bytes are not a serialized `Envelope`.
    #[error("failed to decode envelope: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Serialization failed (buffer capacity).
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] prost::EncodeError),
    /// The zstd encoder failed.
    #[error("failed to compress frame: {0}")]
    Compression(#[source] std::io::Error),
    /// The zstd decoder failed or the frame exceeded the size limit.
    #[error("failed to decompress frame: {0}")]
    Decompression(#[source] std::io::Error),
}

/// How inbound frames are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundFraming {
    /// Frames are plain serialized envelopes.
    #[default]
    Raw,
    /// Frames are zstd-compressed serialized envelopes.
    Zstd,
}

/// Stateless encoder/decoder for envelope frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    level: i32,
    inbound: InboundFraming,
    max_decompressed_size: usize,
}

impl FrameCodec {
    /// Creates a codec with the given outbound compression level, inbound
    /// framing, and cap on the decompressed size of an inbound frame.
    #[must_use]
    pub fn new(level: i32, inbound: InboundFraming, max_decompressed_size: usize) -> Self {
        Self {
            level,
            inbound,
            max_decompressed_size,
        }
    }

    /// Outbound compression level.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Serializes and compresses `envelope` into one outbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] or [`CodecError::Compression`]; either
    /// is fatal to this frame only.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        let mut raw = Vec::with_capacity(envelope.encoded_len());
        envelope.encode(&mut raw)?;
        compress(&raw, self.level)
    }

    /// Decodes one inbound frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] for bytes that are not a serialized
    /// envelope, or [`CodecError::Decompression`] for a corrupt or oversized
    /// zstd frame when inbound compression is enabled.
    pub fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError> {
        match self.inbound {
            InboundFraming::Raw => decode_envelope(frame),
            InboundFraming::Zstd => {
                let raw = decompress(frame, self.max_decompressed_size)?;
                decode_envelope(&raw)
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL, InboundFraming::Raw, 1024 * 1024)
    }
}

/// Deserializes a plain (uncompressed) envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if `bytes` is not a valid envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, CodecError> {
    Ok(Envelope::decode(bytes)?)
}

/// Compresses `bytes` with a streaming zstd encoder at `level`.
///
/// # Errors
///
/// Returns [`CodecError::Compression`] if the encoder fails.
pub fn compress(bytes: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
    let out = Vec::with_capacity(bytes.len() / 2 + 16);
    let mut encoder = zstd::stream::Encoder::new(out, level).map_err(CodecError::Compression)?;
    encoder.write_all(bytes).map_err(CodecError::Compression)?;
    encoder.finish().map_err(CodecError::Compression)
}

/// Decompresses a zstd frame, refusing output larger than `limit` bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decompression`] if the frame is corrupt or would
/// exceed `limit`.
pub fn decompress(frame: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    zstd::bulk::decompress(frame, limit).map_err(CodecError::Decompression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::*;

    fn assert_round_trip(codec: &FrameCodec, env: &Envelope) {
        let frame = codec.encode(env).expect("encode");
        let raw = decompress(&frame, 1024 * 1024).expect("decompress");
        let decoded = decode_envelope(&raw).expect("decode");
        assert_eq!(&decoded, env, "variant {}", env.payload_name());
    }

    fn envelope(id: u32, payload: Payload) -> Envelope {
        Envelope {
            id,
            responding_to: Some(id.wrapping_sub(1)),
            original_sender_id: Some(PeerId::for_identity(42)),
            payload: Some(payload),
        }
    }

    fn sample_message() -> ChannelMessage {
        ChannelMessage {
            id: 1_700_000_000_000_000_123,
            body: "hi @bob".into(),
            timestamp: 1_700_000_000,
            sender_id: 42,
            nonce: Some(Nonce {
                upper_half: 7,
                lower_half: 9,
            }),
            mentions: vec![ChatMention {
                range: Some(Range { start: 3, end: 7 }),
                user_id: 43,
            }],
            reply_to_message_id: Some(5),
            channel_id: 11,
        }
    }

    fn sample_channel() -> Channel {
        Channel {
            id: 11,
            name: "general".into(),
            visibility: ChannelVisibility::Members as i32,
            parent_path: vec![1, 2],
        }
    }

    fn sample_user() -> User {
        User {
            id: 42,
            github_login: "brisk-otter-0042".into(),
            avatar_url: String::new(),
            email: None,
            name: Some("brisk-otter-0042".into()),
        }
    }

    #[test]
    fn every_modeled_variant_survives_encode_decode() {
        let codec = FrameCodec::default();
        let member = ChannelMember {
            user_id: 43,
            channel_id: 11,
            kind: MemberKind::Invitee as i32,
            role: ChannelRole::Guest as i32,
        };

        let payloads = vec![
            Payload::Hello(Hello {
                peer_id: Some(PeerId::for_identity(42)),
            }),
            Payload::Ack(Ack {}),
            Payload::Error(Error {
                message: "nope".into(),
                code: ErrorCode::Forbidden as i32,
                tags: vec!["a".into()],
            }),
            Payload::Ping(Ping {}),
            Payload::GetUsers(GetUsers {
                user_ids: vec![1, 2, 3],
            }),
            Payload::FuzzySearchUsers(FuzzySearchUsers { query: "al".into() }),
            Payload::UsersResponse(UsersResponse {
                users: vec![sample_user()],
            }),
            Payload::GetPrivateUserInfo(GetPrivateUserInfo {}),
            Payload::GetPrivateUserInfoResponse(GetPrivateUserInfoResponse {
                metrics_id: "m".into(),
                staff: true,
                flags: vec!["f".into()],
                accepted_tos_at: Some(1),
            }),
            Payload::UpdateChannels(UpdateChannels {
                channels: vec![sample_channel()],
            }),
            Payload::SubscribeToChannels(SubscribeToChannels {}),
            Payload::CreateChannel(CreateChannel {
                name: "general".into(),
                parent_id: Some(3),
            }),
            Payload::CreateChannelResponse(CreateChannelResponse {
                channel: Some(sample_channel()),
                parent_id: None,
            }),
            Payload::InviteChannelMember(InviteChannelMember {
                channel_id: 11,
                user_id: 43,
                role: ChannelRole::Talker as i32,
            }),
            Payload::GetChannelMembers(GetChannelMembers {
                channel_id: 11,
                query: "b".into(),
                limit: 10,
            }),
            Payload::GetChannelMembersResponse(GetChannelMembersResponse {
                members: vec![member],
                users: vec![sample_user()],
            }),
            Payload::JoinChannelChat(JoinChannelChat { channel_id: 11 }),
            Payload::JoinChannelChatResponse(JoinChannelChatResponse {
                messages: vec![sample_message()],
                done: true,
            }),
            Payload::LeaveChannelChat(LeaveChannelChat { channel_id: 11 }),
            Payload::SendChannelMessage(SendChannelMessage {
                channel_id: 11,
                body: "hi".into(),
                nonce: Some(Nonce {
                    upper_half: 1,
                    lower_half: 2,
                }),
                mentions: vec![],
                reply_to_message_id: None,
            }),
            Payload::SendChannelMessageResponse(SendChannelMessageResponse {
                message: Some(sample_message()),
            }),
            Payload::AckChannelMessage(AckChannelMessage {
                channel_id: 11,
                message_id: 99,
            }),
            Payload::GetChannelMessagesById(GetChannelMessagesById {
                message_ids: vec![11, 12],
            }),
            Payload::GetChannelMessagesResponse(GetChannelMessagesResponse {
                messages: vec![sample_message()],
                done: false,
            }),
            Payload::JoinChannelBuffer(JoinChannelBuffer { channel_id: 11 }),
            Payload::GetNotifications(GetNotifications { before_id: Some(4) }),
            Payload::GetNotificationsResponse(GetNotificationsResponse {
                notifications: vec![Notification {
                    id: 1,
                    timestamp: 2,
                    kind: "ChannelInvitation".into(),
                    entity_id: Some(11),
                    content: "{}".into(),
                    is_read: false,
                }],
                done: true,
            }),
            Payload::AcceptTermsOfService(AcceptTermsOfService {}),
            Payload::AcceptTermsOfServiceResponse(AcceptTermsOfServiceResponse {
                accepted_tos_at: 1_700_000_000,
            }),
            Payload::GetLlmToken(GetLlmToken {}),
            Payload::GetLlmTokenResponse(GetLlmTokenResponse {
                token: "abc123".into(),
            }),
        ];

        for (i, payload) in payloads.into_iter().enumerate() {
            let id = u32::try_from(i).expect("small index") + 1;
            assert_round_trip(&codec, &envelope(id, payload));
        }
    }

    #[test]
    fn outbound_frames_are_zstd() {
        let codec = FrameCodec::default();
        let frame = codec
            .encode(&Envelope::new(1, Payload::Ack(Ack {})))
            .expect("encode");
        // zstd frame magic number, little-endian 0xFD2FB528.
        assert_eq!(&frame[..4], &[0x28, 0xB5, 0x2F, 0xFD]);
    }

    #[test]
    fn raw_inbound_decodes_uncompressed_bytes() {
        let codec = FrameCodec::default();
        let env = Envelope::new(7, Payload::GetLlmToken(GetLlmToken {}));
        let decoded = codec.decode(&env.encode_to_vec()).expect("decode");
        assert_eq!(decoded, env);
    }

    #[test]
    fn raw_inbound_rejects_garbage() {
        let codec = FrameCodec::default();
        // A length-delimited field claiming more bytes than are present.
        let err = codec.decode(&[0x22, 0x10, 0x01]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn zstd_inbound_decodes_compressed_frames() {
        let codec = FrameCodec::new(DEFAULT_COMPRESSION_LEVEL, InboundFraming::Zstd, 1024);
        let env = Envelope::new(3, Payload::Ping(Ping {}));
        let frame = codec.encode(&env).expect("encode");
        assert_eq!(codec.decode(&frame).expect("decode"), env);
    }

    #[test]
    fn zstd_inbound_rejects_uncompressed_bytes() {
        let codec = FrameCodec::new(DEFAULT_COMPRESSION_LEVEL, InboundFraming::Zstd, 1024);
        let env = Envelope::new(3, Payload::Ping(Ping {}));
        let err = codec.decode(&env.encode_to_vec()).unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
    }

    #[test]
    fn zstd_inbound_enforces_size_limit() {
        let codec = FrameCodec::new(DEFAULT_COMPRESSION_LEVEL, InboundFraming::Zstd, 64);
        let env = Envelope::new(
            3,
            Payload::CreateChannel(CreateChannel {
                name: "x".repeat(1000),
                parent_id: None,
            }),
        );
        let frame = compress(&env.encode_to_vec(), DEFAULT_COMPRESSION_LEVEL).expect("compress");
        assert!(matches!(
            codec.decode(&frame).unwrap_err(),
            CodecError::Decompression(_)
        ));
    }
}
