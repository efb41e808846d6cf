// Binary RPC adapter and its codec. Wire format:
//
//   [version:1][msg_type:1][payload_len:4][payload:N]
//
// 6-byte header, all multi-byte integers big-endian. Strings carry a u16
// length prefix and UTF-8 bytes; optional strings a presence byte first.
// The surface is get + create only; every request frame is answered with
// exactly one response frame, malformed input included.

use bytes::{Buf, BufMut};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::capability::{Operation, ProtocolAdapter, READ_CREATE_CAPABILITIES};
use crate::domain::{
    parse_date, ClientDraft, DomainError, Reservation, ReservationDraft, RoomDraft,
};
use crate::service::ReservationService;

pub const PROTOCOL_VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 6;

const MSG_CREATE_RESERVATION: u8 = 0x01;
const MSG_GET_RESERVATION: u8 = 0x02;
const MSG_RESERVATION: u8 = 0x81;
const MSG_ERROR: u8 = 0xFF;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("string field of {0} bytes exceeds the u16 length prefix")]
    StringTooLong(usize),
}

/// Status byte carried by error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RpcStatus {
    NotFound = 1,
    Invalid = 2,
    Store = 3,
    Timeout = 4,
    Unsupported = 5,
    Malformed = 6,
}

impl TryFrom<u8> for RpcStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            1 => Ok(RpcStatus::NotFound),
            2 => Ok(RpcStatus::Invalid),
            3 => Ok(RpcStatus::Store),
            4 => Ok(RpcStatus::Timeout),
            5 => Ok(RpcStatus::Unsupported),
            6 => Ok(RpcStatus::Malformed),
            other => Err(other),
        }
    }
}

/// Creation request payload: full party fields, no ids, dates as
/// `YYYY-MM-DD` strings like the other surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateReservationRequest {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
    pub room_type: String,
    pub price: f64,
    pub available: bool,
    pub start_date: String,
    pub end_date: String,
    pub preferences: Option<String>,
}

/// Expanded reservation payload returned for both operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationReply {
    pub id: String,
    pub client_id: String,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
    pub room_id: String,
    pub room_type: String,
    pub price: f64,
    pub available: bool,
    pub start_date: String,
    pub end_date: String,
    pub preferences: Option<String>,
}

impl From<Reservation> for ReservationReply {
    fn from(reservation: Reservation) -> Self {
        ReservationReply {
            id: reservation.id,
            client_id: reservation.client.id,
            last_name: reservation.client.last_name,
            first_name: reservation.client.first_name,
            email: reservation.client.email,
            phone: reservation.client.phone,
            room_id: reservation.room.id,
            room_type: reservation.room.room_type,
            price: reservation.room.price,
            available: reservation.room.available,
            start_date: reservation.start_date.to_string(),
            end_date: reservation.end_date.to_string(),
            preferences: reservation.preferences,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    GetReservation { id: String },
    CreateReservation(CreateReservationRequest),
    Reservation(ReservationReply),
    Error { status: RpcStatus, message: String },
}

impl RpcMessage {
    fn message_type(&self) -> u8 {
        match self {
            RpcMessage::GetReservation { .. } => MSG_GET_RESERVATION,
            RpcMessage::CreateReservation(_) => MSG_CREATE_RESERVATION,
            RpcMessage::Reservation(_) => MSG_RESERVATION,
            RpcMessage::Error { .. } => MSG_ERROR,
        }
    }
}

// ── Framing ──────────────────────────────────────────────────────────────

/// Encodes one message into a framed byte vector (header + payload).
///
/// # Errors
///
/// Returns [`CodecError::StringTooLong`] when a string field does not fit
/// the u16 length prefix; fields are never silently truncated.
pub fn encode_message(msg: &RpcMessage) -> Result<Vec<u8>, CodecError> {
    let payload = encode_payload(msg)?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(msg.message_type());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    Ok(buf)
}

/// Decodes one message from the beginning of `bytes`. Returns the message
/// and the total number of bytes consumed, so a stream reader can advance
/// its cursor.
pub fn decode_message(bytes: &[u8]) -> Result<(RpcMessage, usize), CodecError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let msg_type = bytes[1];
    let payload_len = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;

    let total = HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(CodecError::PayloadLengthMismatch {
            declared: payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total];
    let msg = decode_payload(msg_type, payload)?;
    Ok((msg, total))
}

// ── Payload encoding ─────────────────────────────────────────────────────

fn encode_payload(msg: &RpcMessage) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    match msg {
        RpcMessage::GetReservation { id } => put_string(&mut buf, id)?,
        RpcMessage::CreateReservation(m) => {
            put_string(&mut buf, &m.last_name)?;
            put_string(&mut buf, &m.first_name)?;
            put_string(&mut buf, &m.email)?;
            put_string(&mut buf, &m.phone)?;
            put_string(&mut buf, &m.room_type)?;
            buf.put_f64(m.price);
            buf.put_u8(u8::from(m.available));
            put_string(&mut buf, &m.start_date)?;
            put_string(&mut buf, &m.end_date)?;
            put_optional_string(&mut buf, m.preferences.as_deref())?;
        }
        RpcMessage::Reservation(m) => {
            put_string(&mut buf, &m.id)?;
            put_string(&mut buf, &m.client_id)?;
            put_string(&mut buf, &m.last_name)?;
            put_string(&mut buf, &m.first_name)?;
            put_string(&mut buf, &m.email)?;
            put_string(&mut buf, &m.phone)?;
            put_string(&mut buf, &m.room_id)?;
            put_string(&mut buf, &m.room_type)?;
            buf.put_f64(m.price);
            buf.put_u8(u8::from(m.available));
            put_string(&mut buf, &m.start_date)?;
            put_string(&mut buf, &m.end_date)?;
            put_optional_string(&mut buf, m.preferences.as_deref())?;
        }
        RpcMessage::Error { status, message } => {
            buf.put_u8(*status as u8);
            put_string(&mut buf, message)?;
        }
    }
    Ok(buf)
}

// ── Payload decoding ─────────────────────────────────────────────────────

fn decode_payload(msg_type: u8, payload: &[u8]) -> Result<RpcMessage, CodecError> {
    let mut p = payload;
    let msg = match msg_type {
        MSG_GET_RESERVATION => RpcMessage::GetReservation {
            id: read_string(&mut p)?,
        },
        MSG_CREATE_RESERVATION => RpcMessage::CreateReservation(CreateReservationRequest {
            last_name: read_string(&mut p)?,
            first_name: read_string(&mut p)?,
            email: read_string(&mut p)?,
            phone: read_string(&mut p)?,
            room_type: read_string(&mut p)?,
            price: read_f64(&mut p)?,
            available: read_bool(&mut p)?,
            start_date: read_string(&mut p)?,
            end_date: read_string(&mut p)?,
            preferences: read_optional_string(&mut p)?,
        }),
        MSG_RESERVATION => RpcMessage::Reservation(ReservationReply {
            id: read_string(&mut p)?,
            client_id: read_string(&mut p)?,
            last_name: read_string(&mut p)?,
            first_name: read_string(&mut p)?,
            email: read_string(&mut p)?,
            phone: read_string(&mut p)?,
            room_id: read_string(&mut p)?,
            room_type: read_string(&mut p)?,
            price: read_f64(&mut p)?,
            available: read_bool(&mut p)?,
            start_date: read_string(&mut p)?,
            end_date: read_string(&mut p)?,
            preferences: read_optional_string(&mut p)?,
        }),
        MSG_ERROR => {
            let status_byte = read_u8(&mut p)?;
            let status = RpcStatus::try_from(status_byte).map_err(|b| {
                CodecError::MalformedPayload(format!("unknown status byte: {b}"))
            })?;
            RpcMessage::Error {
                status,
                message: read_string(&mut p)?,
            }
        }
        other => return Err(CodecError::UnknownMessageType(other)),
    };

    if !p.is_empty() {
        return Err(CodecError::MalformedPayload(format!(
            "{} trailing payload bytes",
            p.len()
        )));
    }
    Ok(msg)
}

// ── Field helpers ────────────────────────────────────────────────────────

const MAX_STRING_LEN: usize = u16::MAX as usize;

// Over-long fields are an encode error, never truncated: a blind byte cut
// can split a UTF-8 codepoint and produce a frame our own decoder rejects.
fn put_string(buf: &mut Vec<u8>, s: &str) -> Result<(), CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(CodecError::StringTooLong(bytes.len()));
    }
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

fn put_optional_string(buf: &mut Vec<u8>, s: Option<&str>) -> Result<(), CodecError> {
    match s {
        Some(s) => {
            buf.put_u8(0x01);
            put_string(buf, s)
        }
        None => {
            buf.put_u8(0x00);
            Ok(())
        }
    }
}

fn require(buf: &[u8], needed: usize, context: &str) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        Err(CodecError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.remaining()
        )))
    } else {
        Ok(())
    }
}

fn read_string(p: &mut &[u8]) -> Result<String, CodecError> {
    require(p, 2, "string length")?;
    let len = p.get_u16() as usize;
    require(p, len, "string bytes")?;
    let raw = p[..len].to_vec();
    p.advance(len);
    String::from_utf8(raw)
        .map_err(|err| CodecError::MalformedPayload(format!("invalid UTF-8: {err}")))
}

fn read_optional_string(p: &mut &[u8]) -> Result<Option<String>, CodecError> {
    require(p, 1, "presence flag")?;
    match p.get_u8() {
        0x00 => Ok(None),
        0x01 => read_string(p).map(Some),
        other => Err(CodecError::MalformedPayload(format!(
            "bad presence flag: {other}"
        ))),
    }
}

fn read_f64(p: &mut &[u8]) -> Result<f64, CodecError> {
    require(p, 8, "f64")?;
    Ok(p.get_f64())
}

fn read_bool(p: &mut &[u8]) -> Result<bool, CodecError> {
    Ok(read_u8(p)? != 0)
}

fn read_u8(p: &mut &[u8]) -> Result<u8, CodecError> {
    require(p, 1, "byte")?;
    Ok(p.get_u8())
}

// ── Adapter ──────────────────────────────────────────────────────────────

pub struct RpcAdapter {
    service: Arc<ReservationService>,
}

impl RpcAdapter {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }

    /// Handles one request frame and always produces one response frame.
    /// Undecodable input is answered with a `Malformed` error frame rather
    /// than dropped, so the peer is never left waiting.
    pub async fn handle(&self, frame: &[u8]) -> Vec<u8> {
        let message = match decode_message(frame) {
            Ok((message, _)) => message,
            Err(err) => {
                debug!(%err, "rpc frame rejected");
                return error_frame(RpcStatus::Malformed, &err.to_string());
            }
        };

        match message {
            RpcMessage::GetReservation { id } => match self.service.get_reservation(&id).await {
                Ok(reservation) => reservation_frame(reservation),
                Err(err) => domain_error_frame(&err),
            },
            RpcMessage::CreateReservation(request) => {
                let draft = match request_to_draft(request) {
                    Ok(draft) => draft,
                    Err(err) => return domain_error_frame(&err),
                };
                match self.service.create_reservation_with_new_parties(draft).await {
                    Ok(reservation) => reservation_frame(reservation),
                    Err(err) => domain_error_frame(&err),
                }
            }
            RpcMessage::Reservation(_) | RpcMessage::Error { .. } => error_frame(
                RpcStatus::Unsupported,
                "response message type on request channel",
            ),
        }
    }
}

impl ProtocolAdapter for RpcAdapter {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn capabilities(&self) -> &'static [Operation] {
        READ_CREATE_CAPABILITIES
    }
}

fn request_to_draft(request: CreateReservationRequest) -> Result<ReservationDraft, DomainError> {
    Ok(ReservationDraft {
        client: ClientDraft {
            last_name: request.last_name,
            first_name: request.first_name,
            email: request.email,
            phone: request.phone,
        },
        room: RoomDraft {
            room_type: request.room_type,
            price: request.price,
            available: request.available,
        },
        start_date: parse_date("start_date", &request.start_date)?,
        end_date: parse_date("end_date", &request.end_date)?,
        preferences: request.preferences,
    })
}

fn reservation_frame(reservation: Reservation) -> Vec<u8> {
    match encode_message(&RpcMessage::Reservation(reservation.into())) {
        Ok(frame) => frame,
        Err(err) => error_frame(RpcStatus::Invalid, &err.to_string()),
    }
}

fn error_frame(status: RpcStatus, message: &str) -> Vec<u8> {
    let msg = RpcMessage::Error {
        status,
        message: clip(message).to_string(),
    };
    // A clipped message always encodes; the fallback is a bare status
    // frame with an empty message.
    encode_message(&msg).unwrap_or_else(|_| {
        vec![PROTOCOL_VERSION, MSG_ERROR, 0, 0, 0, 3, status as u8, 0, 0]
    })
}

// Error messages can echo caller-supplied text, so they are clipped to the
// length prefix on a char boundary before framing.
fn clip(message: &str) -> &str {
    if message.len() <= MAX_STRING_LEN {
        return message;
    }
    let mut end = MAX_STRING_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

// Store internals never cross the wire; the fixed messages mirror the
// other protocol surfaces.
fn domain_error_frame(err: &DomainError) -> Vec<u8> {
    let (status, message) = match err {
        DomainError::Validation(message) => (RpcStatus::Invalid, message.clone()),
        DomainError::NotFound(_) => (RpcStatus::NotFound, "reservation not found".to_string()),
        DomainError::Store(_) => (RpcStatus::Store, "storage unavailable".to_string()),
        DomainError::Timeout(_) => (RpcStatus::Timeout, "request timed out".to_string()),
    };
    error_frame(status, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn round_trip(msg: &RpcMessage) -> RpcMessage {
        let encoded = encode_message(msg).expect("encode failed");
        let (decoded, consumed) = decode_message(&encoded).expect("decode failed");
        assert_eq!(consumed, encoded.len());
        decoded
    }

    fn create_request() -> CreateReservationRequest {
        CreateReservationRequest {
            last_name: "Doe".to_string(),
            first_name: "John".to_string(),
            email: "john@example.com".to_string(),
            phone: "1234567890".to_string(),
            room_type: "Double".to_string(),
            price: 100.0,
            available: true,
            start_date: "2023-10-01".to_string(),
            end_date: "2023-10-05".to_string(),
            preferences: None,
        }
    }

    fn adapter() -> (Arc<InMemoryStore>, RpcAdapter) {
        let store = Arc::new(InMemoryStore::open());
        let service = Arc::new(ReservationService::new(store.clone()));
        (store, RpcAdapter::new(service))
    }

    fn decode_reply(frame: &[u8]) -> RpcMessage {
        let (msg, consumed) = decode_message(frame).expect("response frame must decode");
        assert_eq!(consumed, frame.len());
        msg
    }

    fn frame(msg: &RpcMessage) -> Vec<u8> {
        encode_message(msg).expect("encode failed")
    }

    // ── Codec ────────────────────────────────────────────────────────────

    #[test]
    fn test_get_reservation_round_trip() {
        let msg = RpcMessage::GetReservation {
            id: "42".to_string(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_create_reservation_round_trip() {
        let msg = RpcMessage::CreateReservation(create_request());
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_create_with_preferences_round_trip() {
        let mut request = create_request();
        request.preferences = Some("sea view".to_string());
        let msg = RpcMessage::CreateReservation(request);
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_reservation_reply_round_trip() {
        let msg = RpcMessage::Reservation(ReservationReply {
            id: "3".to_string(),
            client_id: "1".to_string(),
            last_name: "Doe".to_string(),
            first_name: "John".to_string(),
            email: "john@example.com".to_string(),
            phone: "1234567890".to_string(),
            room_id: "2".to_string(),
            room_type: "Double".to_string(),
            price: 100.0,
            available: true,
            start_date: "2023-10-01".to_string(),
            end_date: "2023-10-05".to_string(),
            preferences: Some("sea view".to_string()),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_error_round_trip() {
        let msg = RpcMessage::Error {
            status: RpcStatus::NotFound,
            message: "reservation not found".to_string(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_decode_empty_is_insufficient_data() {
        assert!(matches!(
            decode_message(&[]),
            Err(CodecError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_message_type_bytes_are_stable() {
        let create = encode_message(&RpcMessage::CreateReservation(create_request())).unwrap();
        assert_eq!(create[1], 0x01);
        let get = encode_message(&RpcMessage::GetReservation {
            id: "1".to_string(),
        })
        .unwrap();
        assert_eq!(get[1], 0x02);
    }

    #[test]
    fn test_decode_wrong_version_is_rejected() {
        let mut frame = encode_message(&RpcMessage::GetReservation {
            id: "1".to_string(),
        })
        .unwrap();
        frame[0] = 0x09;
        assert_eq!(
            decode_message(&frame),
            Err(CodecError::UnsupportedVersion(0x09))
        );
    }

    #[test]
    fn test_decode_unknown_message_type_is_rejected() {
        let frame = vec![PROTOCOL_VERSION, 0x7E, 0, 0, 0, 0];
        assert_eq!(
            decode_message(&frame),
            Err(CodecError::UnknownMessageType(0x7E))
        );
    }

    #[test]
    fn test_decode_declared_length_beyond_buffer_is_rejected() {
        let mut frame = vec![PROTOCOL_VERSION, MSG_GET_RESERVATION];
        frame.extend_from_slice(&100u32.to_be_bytes());
        assert!(matches!(
            decode_message(&frame),
            Err(CodecError::PayloadLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_string_is_malformed() {
        // Declares a 10-byte id but carries only 2 payload bytes (the prefix).
        let mut frame = vec![PROTOCOL_VERSION, MSG_GET_RESERVATION];
        frame.extend_from_slice(&2u32.to_be_bytes());
        frame.extend_from_slice(&10u16.to_be_bytes());
        assert!(matches!(
            decode_message(&frame),
            Err(CodecError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_overlong_string_is_rejected_at_encode() {
        let mut request = create_request();
        request.preferences = Some("é".repeat(40_000));
        let err = encode_message(&RpcMessage::CreateReservation(request)).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong(80_000)));
    }

    #[test]
    fn test_decode_trailing_bytes_is_malformed() {
        let mut frame = encode_message(&RpcMessage::GetReservation {
            id: "1".to_string(),
        })
        .unwrap();
        frame.push(0x00);
        let declared = (frame.len() - HEADER_SIZE) as u32;
        frame[2..6].copy_from_slice(&declared.to_be_bytes());
        assert!(matches!(
            decode_message(&frame),
            Err(CodecError::MalformedPayload(_))
        ));
    }

    // ── Adapter ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let (_, adapter) = adapter();
        let response = adapter
            .handle(&frame(&RpcMessage::CreateReservation(create_request())))
            .await;
        let created = match decode_reply(&response) {
            RpcMessage::Reservation(reply) => reply,
            other => panic!("expected reservation reply, got {other:?}"),
        };
        assert_eq!(created.last_name, "Doe");
        assert_eq!(created.price, 100.0);
        assert_eq!(created.start_date, "2023-10-01");

        let response = adapter
            .handle(&frame(&RpcMessage::GetReservation {
                id: created.id.clone(),
            }))
            .await;
        match decode_reply(&response) {
            RpcMessage::Reservation(reply) => assert_eq!(reply, created),
            other => panic!("expected reservation reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found_status() {
        let (_, adapter) = adapter();
        let response = adapter
            .handle(&frame(&RpcMessage::GetReservation {
                id: "404".to_string(),
            }))
            .await;
        match decode_reply(&response) {
            RpcMessage::Error { status, message } => {
                assert_eq!(status, RpcStatus::NotFound);
                assert_eq!(message, "reservation not found");
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_create_is_invalid_status() {
        let (_, adapter) = adapter();
        let mut request = create_request();
        request.end_date = "not-a-date".to_string();
        let response = adapter
            .handle(&frame(&RpcMessage::CreateReservation(request)))
            .await;
        match decode_reply(&response) {
            RpcMessage::Error { status, .. } => assert_eq!(status, RpcStatus::Invalid),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_store_never_leaks_internals() {
        let (store, adapter) = adapter();
        store.close();
        let response = adapter
            .handle(&frame(&RpcMessage::GetReservation {
                id: "1".to_string(),
            }))
            .await;
        match decode_reply(&response) {
            RpcMessage::Error { status, message } => {
                assert_eq!(status, RpcStatus::Store);
                assert_eq!(message, "storage unavailable");
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reply_too_large_for_codec_is_a_decodable_error_frame() {
        let store = Arc::new(InMemoryStore::open());
        let service = Arc::new(ReservationService::new(store));
        let adapter = RpcAdapter::new(service.clone());

        // Created on another surface, so the codec limit was never checked.
        let mut draft = crate::domain::sample_draft();
        draft.preferences = Some("é".repeat(40_000));
        let created = service
            .create_reservation_with_new_parties(draft)
            .await
            .unwrap();

        let response = adapter
            .handle(&frame(&RpcMessage::GetReservation { id: created.id }))
            .await;
        match decode_reply(&response) {
            RpcMessage::Error { status, .. } => assert_eq!(status, RpcStatus::Invalid),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_response_type_on_request_channel_is_unsupported() {
        let (_, adapter) = adapter();
        let response = adapter
            .handle(&frame(&RpcMessage::Error {
                status: RpcStatus::NotFound,
                message: "x".to_string(),
            }))
            .await;
        match decode_reply(&response) {
            RpcMessage::Error { status, .. } => assert_eq!(status, RpcStatus::Unsupported),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_input_is_answered_with_malformed_frame() {
        let (_, adapter) = adapter();
        let response = adapter.handle(&[0xDE, 0xAD, 0xBE, 0xEF]).await;
        match decode_reply(&response) {
            RpcMessage::Error { status, .. } => assert_eq!(status, RpcStatus::Malformed),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[test]
    fn test_capabilities_are_get_and_create_only() {
        let (_, adapter) = adapter();
        assert_eq!(adapter.name(), "rpc");
        assert!(adapter.supports(Operation::Get));
        assert!(adapter.supports(Operation::Create));
        assert!(!adapter.supports(Operation::List));
        assert!(!adapter.supports(Operation::Update));
        assert!(!adapter.supports(Operation::Delete));
    }
}
