//! Per-connection protocol state machine.
//!
//! The session is pure protocol logic: it consumes one request and
//! produces one outcome, never touching the socket. The connection
//! driver owns the I/O and executes outcomes, which keeps the entire
//! transition table testable without a network.
//!
//! # States
//!
//! ```text
//! WaitingHandshake -> WaitingClientKey -> WaitingGroup
//!     -> WaitingPassword -> WaitingNickname -> Ready (loops)
//! ```
//!
//! A request whose kind does not match the current state's expectation
//! answers `SequenceError` and resets to `WaitingHandshake`; the
//! connection stays open so the client can restart the handshake on the
//! same socket. `Goodbye` and `Reset` are honored in every state, before
//! state dispatch.

use std::sync::Arc;

use tracing::debug;

use crate::crypto::{AesSuite, RsaSuite};
use crate::protocol::{Request, RequestKind};
use crate::server::errors::ConnectionError;
use crate::store::{Group, GroupStore, Message};
use crate::validate;

/// Protocol position of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the opening `Handshake`
    WaitingHandshake,
    /// Waiting for the client's public key
    WaitingClientKey,
    /// Waiting for the (encrypted) group name
    WaitingGroup,
    /// Waiting for the (encrypted) password hash
    WaitingPassword,
    /// Waiting for the (encrypted) nickname
    WaitingNickname,
    /// Fully established; serving message operations
    Ready,
}

/// What the connection driver must do after one request.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Send this response and keep serving
    Reply(Request),
    /// Send this response, then close the connection (graceful goodbye)
    ReplyThenClose(Request),
    /// Close the connection immediately, no response (hard reset)
    Close,
}

/// Server-side session record for one connection.
///
/// Exclusively owned by the worker serving the connection. Holds a
/// non-owning handle into the shared store once the group step succeeds.
pub struct ConnectionSession {
    state: SessionState,
    store: Arc<GroupStore>,
    default_topic: String,
    group: Option<Arc<Group>>,
    accepted_hash: Option<String>,
    nickname: Option<String>,
    topic: String,
    cipher: Option<AesSuite>,
}

impl ConnectionSession {
    /// Create a session in `WaitingHandshake`.
    pub fn new(store: Arc<GroupStore>, default_topic: impl Into<String>) -> Self {
        let default_topic = default_topic.into();
        ConnectionSession {
            state: SessionState::WaitingHandshake,
            store,
            topic: default_topic.clone(),
            default_topic,
            group: None,
            accepted_hash: None,
            nickname: None,
            cipher: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_topic(&self) -> &str {
        &self.topic
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// The password hash this session authenticated with, once past the
    /// password step.
    pub fn accepted_password_hash(&self) -> Option<&str> {
        self.accepted_hash.as_deref()
    }

    /// Advance the state machine by one request.
    ///
    /// `Ok` outcomes carry the response to send (or an instruction to
    /// close). `Err` means a fatal condition - crypto failure or a
    /// malformed exchange - and the driver must drop the connection.
    pub fn handle(&mut self, request: Request) -> Result<SessionOutcome, ConnectionError> {
        // Goodbye and Reset short-circuit in every state.
        match request.kind() {
            RequestKind::Goodbye => {
                return Ok(SessionOutcome::ReplyThenClose(Request::control(
                    RequestKind::GoodbyeResponse,
                )))
            }
            RequestKind::Reset => return Ok(SessionOutcome::Close),
            _ => {}
        }

        let reply = match self.state {
            SessionState::WaitingHandshake => self.on_waiting_handshake(&request),
            SessionState::WaitingClientKey => self.on_waiting_client_key(&request)?,
            SessionState::WaitingGroup => self.on_waiting_group(&request)?,
            SessionState::WaitingPassword => self.on_waiting_password(&request)?,
            SessionState::WaitingNickname => self.on_waiting_nickname(&request)?,
            SessionState::Ready => self.on_ready(&request)?,
        };
        Ok(SessionOutcome::Reply(reply))
    }

    /// Answer a kind mismatch: reset to the initial state.
    fn sequence_error(&mut self) -> Request {
        self.state = SessionState::WaitingHandshake;
        Request::control(RequestKind::SequenceError)
    }

    fn cipher(&self) -> Result<&AesSuite, ConnectionError> {
        self.cipher.as_ref().ok_or(ConnectionError::CipherNotEstablished)
    }

    /// Decrypt a request's payload as UTF-8 text with the session suite.
    fn decrypt_text(&self, request: &Request) -> Result<String, ConnectionError> {
        let payload = request.payload().ok_or(ConnectionError::MissingPayload)?;
        Ok(self.cipher()?.decrypt_text(payload)?)
    }

    fn on_waiting_handshake(&mut self, request: &Request) -> Request {
        if request.kind() == RequestKind::Handshake {
            self.state = SessionState::WaitingClientKey;
            Request::control(RequestKind::HandshakeResponse)
        } else {
            self.sequence_error()
        }
    }

    /// The one place a symmetric key crosses the wire: a fresh suite,
    /// wrapped under the public key the client just sent.
    fn on_waiting_client_key(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        if request.kind() != RequestKind::ClientKey {
            return Ok(self.sequence_error());
        }
        let der = request.payload().ok_or(ConnectionError::MissingPayload)?;
        let remote = RsaSuite::from_public_key(der)?;
        let session_suite = AesSuite::generate();
        let wrapped = remote.encrypt(&session_suite.export_key())?;
        self.cipher = Some(session_suite);
        self.state = SessionState::WaitingGroup;
        debug!("session key issued");
        Ok(Request::with_payload(RequestKind::ServerKey, wrapped))
    }

    fn on_waiting_group(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        if request.kind() != RequestKind::SetGroup {
            return Ok(self.sequence_error());
        }
        let name = self.decrypt_text(request)?;
        if !validate::is_valid_name(&name) {
            self.state = SessionState::WaitingHandshake;
            return Ok(Request::control(RequestKind::GroupError));
        }
        match self.store.get_group(&name) {
            Some(group) => {
                self.group = Some(group);
                self.state = SessionState::WaitingPassword;
                Ok(Request::control(RequestKind::GroupConfirm))
            }
            None => {
                self.state = SessionState::WaitingHandshake;
                Ok(Request::control(RequestKind::GroupError))
            }
        }
    }

    fn on_waiting_password(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        if request.kind() != RequestKind::SetPassword {
            return Ok(self.sequence_error());
        }
        let hash = self.decrypt_text(request)?;
        let verified =
            validate::is_valid_password_hash(&hash) && self.bound_group()?.verify_password(&hash);
        if verified {
            self.accepted_hash = Some(hash);
            self.state = SessionState::WaitingNickname;
            Ok(Request::control(RequestKind::PasswordConfirm))
        } else {
            self.state = SessionState::WaitingHandshake;
            Ok(Request::control(RequestKind::PasswordError))
        }
    }

    fn on_waiting_nickname(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        if request.kind() != RequestKind::SetNickname {
            return Ok(self.sequence_error());
        }
        let nickname = self.decrypt_text(request)?;
        if validate::is_valid_name(&nickname) {
            debug!(nickname = %nickname, "session established");
            self.nickname = Some(nickname);
            self.topic = self.default_topic.clone();
            self.state = SessionState::Ready;
            Ok(Request::control(RequestKind::NicknameConfirm))
        } else {
            self.state = SessionState::WaitingHandshake;
            Ok(Request::control(RequestKind::NicknameError))
        }
    }

    fn on_ready(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        match request.kind() {
            RequestKind::SendMessage => self.on_send_message(request),
            RequestKind::GetMessages => {
                let listing = self.bound_group()?.messages_for_topic(&self.topic);
                let encrypted = self.cipher()?.encrypt_text(&listing)?;
                Ok(Request::with_payload(RequestKind::Messages, encrypted))
            }
            RequestKind::GetAllMessages => {
                let listing = self.bound_group()?.all_messages();
                let encrypted = self.cipher()?.encrypt_text(&listing)?;
                Ok(Request::with_payload(RequestKind::Messages, encrypted))
            }
            RequestKind::GetTopics => {
                let listing = self.bound_group()?.topics();
                let encrypted = self.cipher()?.encrypt_text(&listing)?;
                Ok(Request::with_payload(RequestKind::Topics, encrypted))
            }
            RequestKind::SetTopic => {
                let topic = self.decrypt_text(request)?;
                if validate::is_valid_name(&topic) {
                    self.topic = topic;
                    Ok(Request::control(RequestKind::TopicConfirm))
                } else {
                    Ok(Request::control(RequestKind::TopicError))
                }
            }
            // Ready state never resets: unknown kinds are answered and
            // the session keeps serving.
            _ => Ok(Request::control(RequestKind::IllegalRequestError)),
        }
    }

    fn on_send_message(&mut self, request: &Request) -> Result<Request, ConnectionError> {
        let body = self.decrypt_text(request)?;
        if !validate::is_valid_message(&body) {
            return Ok(Request::control(RequestKind::MessageError));
        }
        let nickname = self.nickname.clone().unwrap_or_default();
        match Message::new(self.topic.clone(), nickname, body) {
            Ok(message) => {
                self.bound_group()?.add_message(message);
                Ok(Request::control(RequestKind::MessageConfirm))
            }
            Err(_) => Ok(Request::control(RequestKind::MessageError)),
        }
    }

    fn bound_group(&self) -> Result<&Arc<Group>, ConnectionError> {
        self.group.as_ref().ok_or(ConnectionError::NoGroupBound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;

    const TEST_RSA_BITS: usize = 1024;

    fn store() -> Arc<GroupStore> {
        let store = Arc::new(GroupStore::new(500, 100));
        store.create_group("default", "default").unwrap();
        store
    }

    fn session(store: &Arc<GroupStore>) -> ConnectionSession {
        ConnectionSession::new(Arc::clone(store), "default")
    }

    fn reply(session: &mut ConnectionSession, request: Request) -> Request {
        match session.handle(request).unwrap() {
            SessionOutcome::Reply(r) => r,
            other => panic!("expected a plain reply, got {other:?}"),
        }
    }

    /// Drive the full establishment sequence, returning the client-side
    /// symmetric suite.
    fn establish(session: &mut ConnectionSession) -> AesSuite {
        let r = reply(session, Request::control(RequestKind::Handshake));
        assert_eq!(r.kind(), RequestKind::HandshakeResponse);

        let rsa = RsaSuite::generate_with_size(TEST_RSA_BITS).unwrap();
        let r = reply(
            session,
            Request::with_payload(RequestKind::ClientKey, rsa.export_public_key().unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::ServerKey);
        let key = rsa.decrypt(r.payload().unwrap()).unwrap();
        let aes = AesSuite::from_key(&key).unwrap();

        let r = reply(
            session,
            Request::with_payload(RequestKind::SetGroup, aes.encrypt_text("default").unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::GroupConfirm);

        let r = reply(
            session,
            Request::with_payload(
                RequestKind::SetPassword,
                aes.encrypt_text(&sha256_hex("default")).unwrap(),
            ),
        );
        assert_eq!(r.kind(), RequestKind::PasswordConfirm);

        let r = reply(
            session,
            Request::with_payload(RequestKind::SetNickname, aes.encrypt_text("alice").unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::NicknameConfirm);

        aes
    }

    #[test]
    fn test_full_handshake_reaches_ready() {
        let store = store();
        let mut session = session(&store);
        establish(&mut session);

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.current_topic(), "default");
        assert_eq!(session.nickname(), Some("alice"));
    }

    #[test]
    fn test_sequence_error_resets_then_recovers() {
        let store = store();
        let mut session = session(&store);

        // Jump straight to a post-handshake kind.
        let r = reply(&mut session, Request::control(RequestKind::GetMessages));
        assert_eq!(r.kind(), RequestKind::SequenceError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);

        // Mismatch mid-sequence also resets.
        let r = reply(&mut session, Request::control(RequestKind::Handshake));
        assert_eq!(r.kind(), RequestKind::HandshakeResponse);
        let r = reply(&mut session, Request::control(RequestKind::GetTopics));
        assert_eq!(r.kind(), RequestKind::SequenceError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);

        // A fresh handshake succeeds on the same session.
        establish(&mut session);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_unknown_group_rejected() {
        let store = store();
        let mut session = session(&store);

        reply(&mut session, Request::control(RequestKind::Handshake));
        let rsa = RsaSuite::generate_with_size(TEST_RSA_BITS).unwrap();
        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::ClientKey, rsa.export_public_key().unwrap()),
        );
        let aes = AesSuite::from_key(&rsa.decrypt(r.payload().unwrap()).unwrap()).unwrap();

        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::SetGroup, aes.encrypt_text("nowhere").unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::GroupError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let store = store();
        let mut session = session(&store);

        reply(&mut session, Request::control(RequestKind::Handshake));
        let rsa = RsaSuite::generate_with_size(TEST_RSA_BITS).unwrap();
        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::ClientKey, rsa.export_public_key().unwrap()),
        );
        let aes = AesSuite::from_key(&rsa.decrypt(r.payload().unwrap()).unwrap()).unwrap();
        reply(
            &mut session,
            Request::with_payload(RequestKind::SetGroup, aes.encrypt_text("default").unwrap()),
        );

        // Well-shaped but mismatched hash.
        let r = reply(
            &mut session,
            Request::with_payload(
                RequestKind::SetPassword,
                aes.encrypt_text(&sha256_hex("wrong")).unwrap(),
            ),
        );
        assert_eq!(r.kind(), RequestKind::PasswordError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);
    }

    #[test]
    fn test_malformed_password_hash_rejected() {
        let store = store();
        let mut session = session(&store);

        reply(&mut session, Request::control(RequestKind::Handshake));
        let rsa = RsaSuite::generate_with_size(TEST_RSA_BITS).unwrap();
        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::ClientKey, rsa.export_public_key().unwrap()),
        );
        let aes = AesSuite::from_key(&rsa.decrypt(r.payload().unwrap()).unwrap()).unwrap();
        reply(
            &mut session,
            Request::with_payload(RequestKind::SetGroup, aes.encrypt_text("default").unwrap()),
        );

        let r = reply(
            &mut session,
            Request::with_payload(
                RequestKind::SetPassword,
                aes.encrypt_text("not a digest").unwrap(),
            ),
        );
        assert_eq!(r.kind(), RequestKind::PasswordError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);
    }

    #[test]
    fn test_invalid_nickname_rejected() {
        let store = store();
        let mut session = session(&store);

        reply(&mut session, Request::control(RequestKind::Handshake));
        let rsa = RsaSuite::generate_with_size(TEST_RSA_BITS).unwrap();
        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::ClientKey, rsa.export_public_key().unwrap()),
        );
        let aes = AesSuite::from_key(&rsa.decrypt(r.payload().unwrap()).unwrap()).unwrap();
        reply(
            &mut session,
            Request::with_payload(RequestKind::SetGroup, aes.encrypt_text("default").unwrap()),
        );
        reply(
            &mut session,
            Request::with_payload(
                RequestKind::SetPassword,
                aes.encrypt_text(&sha256_hex("default")).unwrap(),
            ),
        );

        let r = reply(
            &mut session,
            Request::with_payload(
                RequestKind::SetNickname,
                aes.encrypt_text("two\nlines").unwrap(),
            ),
        );
        assert_eq!(r.kind(), RequestKind::NicknameError);
        assert_eq!(session.state(), SessionState::WaitingHandshake);
    }

    #[test]
    fn test_message_flow_and_topics() {
        let store = store();
        let mut session = session(&store);
        let aes = establish(&mut session);

        let send = |session: &mut ConnectionSession, body: &str| {
            let r = reply(
                session,
                Request::with_payload(RequestKind::SendMessage, aes.encrypt_text(body).unwrap()),
            );
            assert_eq!(r.kind(), RequestKind::MessageConfirm);
        };

        send(&mut session, "hello default");

        // Switch topic, post under it.
        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::SetTopic, aes.encrypt_text("news").unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::TopicConfirm);
        assert_eq!(session.current_topic(), "news");

        send(&mut session, "n1");
        send(&mut session, "n2");
        send(&mut session, "n3");

        // Current-topic listing shows exactly the news lines.
        let r = reply(&mut session, Request::control(RequestKind::GetMessages));
        assert_eq!(r.kind(), RequestKind::Messages);
        let listing = aes.decrypt_text(r.payload().unwrap()).unwrap();
        assert_eq!(listing.lines().count(), 3);
        assert!(listing.contains("n1") && listing.contains("n3"));
        assert!(!listing.contains("hello default"));

        // All-topics listing shows everything.
        let r = reply(&mut session, Request::control(RequestKind::GetAllMessages));
        let listing = aes.decrypt_text(r.payload().unwrap()).unwrap();
        assert_eq!(listing.lines().count(), 4);

        // Topics in first-seen order, quoted.
        let r = reply(&mut session, Request::control(RequestKind::GetTopics));
        assert_eq!(r.kind(), RequestKind::Topics);
        let topics = aes.decrypt_text(r.payload().unwrap()).unwrap();
        assert_eq!(topics, "'default'\n'news'\n");
    }

    #[test]
    fn test_invalid_message_body_reports_error() {
        let store = store();
        let mut session = session(&store);
        let aes = establish(&mut session);

        let oversized = "x".repeat(401);
        let r = reply(
            &mut session,
            Request::with_payload(
                RequestKind::SendMessage,
                aes.encrypt_text(&oversized).unwrap(),
            ),
        );
        assert_eq!(r.kind(), RequestKind::MessageError);
        // Nothing was appended, and the session keeps serving.
        assert!(store.get_group("default").unwrap().is_empty());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_invalid_topic_keeps_current() {
        let store = store();
        let mut session = session(&store);
        let aes = establish(&mut session);

        let r = reply(
            &mut session,
            Request::with_payload(RequestKind::SetTopic, aes.encrypt_text("a\nb").unwrap()),
        );
        assert_eq!(r.kind(), RequestKind::TopicError);
        assert_eq!(session.current_topic(), "default");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_illegal_request_in_ready() {
        let store = store();
        let mut session = session(&store);
        establish(&mut session);

        let r = reply(&mut session, Request::control(RequestKind::Handshake));
        assert_eq!(r.kind(), RequestKind::IllegalRequestError);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_goodbye_in_any_state() {
        let store = store();

        let mut fresh = session(&store);
        match fresh.handle(Request::control(RequestKind::Goodbye)).unwrap() {
            SessionOutcome::ReplyThenClose(r) => {
                assert_eq!(r.kind(), RequestKind::GoodbyeResponse)
            }
            other => panic!("expected goodbye response, got {other:?}"),
        }

        let mut ready = session(&store);
        establish(&mut ready);
        assert!(matches!(
            ready.handle(Request::control(RequestKind::Goodbye)).unwrap(),
            SessionOutcome::ReplyThenClose(_)
        ));
    }

    #[test]
    fn test_reset_closes_silently() {
        let store = store();
        let mut session = session(&store);
        assert!(matches!(
            session.handle(Request::control(RequestKind::Reset)).unwrap(),
            SessionOutcome::Close
        ));
    }

    #[test]
    fn test_garbage_client_key_is_fatal() {
        let store = store();
        let mut session = session(&store);
        reply(&mut session, Request::control(RequestKind::Handshake));

        let result = session.handle(Request::with_payload(
            RequestKind::ClientKey,
            b"not a key".to_vec(),
        ));
        assert!(matches!(result, Err(ConnectionError::Crypto(_))));
    }

    #[test]
    fn test_missing_payload_is_fatal() {
        let store = store();
        let mut session = session(&store);
        reply(&mut session, Request::control(RequestKind::Handshake));

        let result = session.handle(Request::control(RequestKind::ClientKey));
        assert!(matches!(result, Err(ConnectionError::MissingPayload)));
    }
}
