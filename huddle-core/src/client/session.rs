//! Client side of the session protocol.
//!
//! A [`ClientSession`] mirrors the server state machine synchronously:
//! every operation is one request followed by one response, with no
//! concurrency inside a session. `open()` drives the five-step
//! establishment; the message operations require an open session.

use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::client::errors::{ClientError, ClientResult};
use crate::crypto::{sha256_hex, AesSuite, RsaSuite};
use crate::protocol::{read_request, write_request, Request, RequestKind};
use crate::validate;

/// One client connection to a Huddle server.
pub struct ClientSession {
    host: String,
    port: u16,
    group: String,
    hashed_password: String,
    nickname: String,
    topic: String,
    stream: Option<TcpStream>,
    cipher: Option<AesSuite>,
    open: bool,
}

impl ClientSession {
    /// Prepare a session. The password is hashed here, once; the
    /// plaintext is not retained and never leaves this process.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        group: impl Into<String>,
        password: &str,
        nickname: impl Into<String>,
    ) -> ClientResult<Self> {
        let (host, group, nickname) = (host.into(), group.into(), nickname.into());
        if !validate::is_safe_text(&group)
            || !validate::is_safe_text(&nickname)
            || !validate::is_safe_text(password)
        {
            return Err(ClientError::InvalidArgument(
                "unsafe group, nickname, or password".to_string(),
            ));
        }
        Ok(ClientSession {
            host,
            port,
            group,
            hashed_password: sha256_hex(password),
            nickname,
            topic: String::new(),
            stream: None,
            cipher: None,
            open: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn current_topic(&self) -> &str {
        &self.topic
    }

    /// One blocking request/response round trip.
    async fn round_trip(&mut self, request: Request) -> ClientResult<Request> {
        let stream = self.stream.as_mut().ok_or(ClientError::SessionClosed)?;
        write_request(stream, &request).await?;
        Ok(read_request(stream).await?)
    }

    fn cipher(&self) -> ClientResult<&AesSuite> {
        self.cipher.as_ref().ok_or(ClientError::SessionClosed)
    }

    /// Open the connection: handshake, key exchange, group, password,
    /// nickname. Any unexpected response or domain error fails the open
    /// and leaves the session closed.
    pub async fn open(&mut self) -> ClientResult<()> {
        info!(host = %self.host, port = self.port, "opening connection");
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| ClientError::Establishment(format!("connect failed: {e}")))?;
        self.stream = Some(stream);

        // Step 1 - Handshake
        let response = self.round_trip(Request::control(RequestKind::Handshake)).await?;
        Self::expect_step(&response, RequestKind::HandshakeResponse, "handshake")?;
        debug!("handshake completed");

        // Step 2 - Encryption: send our public key, unwrap the session key.
        let rsa = RsaSuite::generate()?;
        let response = self
            .round_trip(Request::with_payload(
                RequestKind::ClientKey,
                rsa.export_public_key()?,
            ))
            .await?;
        Self::expect_step(&response, RequestKind::ServerKey, "encryption")?;
        let wrapped = response
            .payload()
            .ok_or_else(|| ClientError::Establishment("server key missing payload".to_string()))?;
        let session_key = rsa.decrypt(wrapped)?;
        self.cipher = Some(AesSuite::from_key(&session_key)?);
        debug!("encryption setup completed");

        // Step 3 - Group
        let payload = self.cipher()?.encrypt_text(&self.group)?;
        let response = self
            .round_trip(Request::with_payload(RequestKind::SetGroup, payload))
            .await?;
        Self::expect_step(&response, RequestKind::GroupConfirm, "group")?;
        debug!("group setup completed");

        // Step 4 - Group password
        let payload = self.cipher()?.encrypt_text(&self.hashed_password)?;
        let response = self
            .round_trip(Request::with_payload(RequestKind::SetPassword, payload))
            .await?;
        Self::expect_step(&response, RequestKind::PasswordConfirm, "password")?;
        debug!("credentials setup completed");

        // Step 5 - Nickname
        let payload = self.cipher()?.encrypt_text(&self.nickname)?;
        let response = self
            .round_trip(Request::with_payload(RequestKind::SetNickname, payload))
            .await?;
        Self::expect_step(&response, RequestKind::NicknameConfirm, "nickname")?;

        self.topic = "default".to_string();
        self.open = true;
        info!(host = %self.host, "connected");
        Ok(())
    }

    /// Check an establishment-step response, mapping every failure shape
    /// to an establishment error naming the step.
    fn expect_step(response: &Request, expected: RequestKind, step: &str) -> ClientResult<()> {
        let got = response.kind();
        if got == expected {
            return Ok(());
        }
        let reason = match got {
            RequestKind::SequenceError => format!("sequence error during {step}"),
            RequestKind::GroupError => "group not found".to_string(),
            RequestKind::PasswordError => "invalid password".to_string(),
            RequestKind::NicknameError => "invalid nickname".to_string(),
            other => format!("unexpected response {other:?} during {step}"),
        };
        Err(ClientError::Establishment(reason))
    }

    /// Close the connection with a goodbye exchange.
    ///
    /// A missing or wrong goodbye response is logged, not fatal; the
    /// socket is released either way.
    pub async fn close(&mut self) -> ClientResult<()> {
        if self.stream.is_some() {
            match self.round_trip(Request::control(RequestKind::Goodbye)).await {
                Ok(response) if response.kind() == RequestKind::GoodbyeResponse => {
                    debug!("connection closed gracefully");
                }
                Ok(response) => {
                    warn!(kind = ?response.kind(), "unexpected goodbye response");
                }
                Err(e) => {
                    warn!(error = %e, "error terminating connection gracefully");
                }
            }
        }
        self.stream = None;
        self.cipher = None;
        self.open = false;
        Ok(())
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(ClientError::SessionClosed)
        }
    }

    /// Send a message under the current topic.
    pub async fn send_message(&mut self, message: &str) -> ClientResult<()> {
        self.ensure_open()?;
        if !validate::is_valid_message(message) {
            return Err(ClientError::InvalidArgument("invalid message".to_string()));
        }
        let payload = self.cipher()?.encrypt_text(message)?;
        let response = self
            .round_trip(Request::with_payload(RequestKind::SendMessage, payload))
            .await?;
        match response.kind() {
            RequestKind::MessageConfirm => Ok(()),
            RequestKind::MessageError => Err(ClientError::Rejected("message")),
            got => Err(ClientError::UnexpectedResponse {
                expected: "MessageConfirm",
                got,
            }),
        }
    }

    /// Recent messages in the current topic.
    pub async fn get_messages(&mut self) -> ClientResult<String> {
        self.ensure_open()?;
        let response = self.round_trip(Request::control(RequestKind::GetMessages)).await?;
        self.decrypt_listing(response, RequestKind::Messages, "Messages")
    }

    /// Recent messages across all topics (server-capped).
    pub async fn get_all_messages(&mut self) -> ClientResult<String> {
        self.ensure_open()?;
        let response = self
            .round_trip(Request::control(RequestKind::GetAllMessages))
            .await?;
        self.decrypt_listing(response, RequestKind::Messages, "Messages")
    }

    /// Active topics in the group.
    pub async fn get_topics(&mut self) -> ClientResult<String> {
        self.ensure_open()?;
        let response = self.round_trip(Request::control(RequestKind::GetTopics)).await?;
        self.decrypt_listing(response, RequestKind::Topics, "Topics")
    }

    /// Switch the active topic.
    pub async fn set_topic(&mut self, topic: &str) -> ClientResult<()> {
        self.ensure_open()?;
        if !validate::is_valid_name(topic) {
            return Err(ClientError::InvalidArgument("invalid topic".to_string()));
        }
        let payload = self.cipher()?.encrypt_text(topic)?;
        let response = self
            .round_trip(Request::with_payload(RequestKind::SetTopic, payload))
            .await?;
        match response.kind() {
            RequestKind::TopicConfirm => {
                self.topic = topic.to_string();
                Ok(())
            }
            RequestKind::TopicError => Err(ClientError::Rejected("topic")),
            got => Err(ClientError::UnexpectedResponse {
                expected: "TopicConfirm",
                got,
            }),
        }
    }

    fn decrypt_listing(
        &self,
        response: Request,
        expected: RequestKind,
        expected_name: &'static str,
    ) -> ClientResult<String> {
        if response.kind() != expected {
            return Err(ClientError::UnexpectedResponse {
                expected: expected_name,
                got: response.kind(),
            });
        }
        let payload = response
            .into_payload()
            .ok_or(ClientError::UnexpectedResponse {
                expected: expected_name,
                got: expected,
            })?;
        Ok(self.cipher()?.decrypt_text(&payload)?)
    }
}
