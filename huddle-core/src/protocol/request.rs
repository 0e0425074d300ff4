//! The discriminated wire unit exchanged by both sides.

/// Every request and response kind, client->server and server->client,
/// in one shared namespace.
///
/// The numeric tags are the wire encoding and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    Handshake = 0,
    HandshakeResponse = 1,
    ClientKey = 2,
    ServerKey = 3,
    SetGroup = 4,
    GroupConfirm = 5,
    GroupError = 6,
    SetPassword = 7,
    PasswordConfirm = 8,
    PasswordError = 9,
    SetNickname = 10,
    NicknameConfirm = 11,
    NicknameError = 12,
    SendMessage = 13,
    MessageConfirm = 14,
    MessageError = 15,
    GetMessages = 16,
    GetAllMessages = 17,
    Messages = 18,
    GetTopics = 19,
    Topics = 20,
    SetTopic = 21,
    TopicConfirm = 22,
    TopicError = 23,
    IllegalRequestError = 24,
    SequenceError = 25,
    Goodbye = 26,
    GoodbyeResponse = 27,
    Reset = 28,
}

impl RequestKind {
    /// Decode a wire tag. Returns `None` for tags outside the enumeration.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use RequestKind::*;
        Some(match byte {
            0 => Handshake,
            1 => HandshakeResponse,
            2 => ClientKey,
            3 => ServerKey,
            4 => SetGroup,
            5 => GroupConfirm,
            6 => GroupError,
            7 => SetPassword,
            8 => PasswordConfirm,
            9 => PasswordError,
            10 => SetNickname,
            11 => NicknameConfirm,
            12 => NicknameError,
            13 => SendMessage,
            14 => MessageConfirm,
            15 => MessageError,
            16 => GetMessages,
            17 => GetAllMessages,
            18 => Messages,
            19 => GetTopics,
            20 => Topics,
            21 => SetTopic,
            22 => TopicConfirm,
            23 => TopicError,
            24 => IllegalRequestError,
            25 => SequenceError,
            26 => Goodbye,
            27 => GoodbyeResponse,
            28 => Reset,
            _ => return None,
        })
    }

    /// The wire tag for this kind.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One protocol exchange unit: a kind plus an optional opaque payload.
///
/// Control requests (handshake, confirmations, goodbye) carry no payload;
/// key material and ciphertexts ride in `payload`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    kind: RequestKind,
    payload: Option<Vec<u8>>,
}

impl Request {
    /// A payload-less control request.
    pub fn control(kind: RequestKind) -> Self {
        Request { kind, payload: None }
    }

    /// A request carrying opaque bytes.
    pub fn with_payload(kind: RequestKind, payload: Vec<u8>) -> Self {
        Request {
            kind,
            payload: Some(payload),
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Consume the request, yielding its payload.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        self.payload
    }
}
