//! Error types for the server module

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::protocol::WireError;
use crate::store::StoreError;

/// Fatal failures of a single connection.
///
/// Any of these ends the worker serving that connection; none of them
/// touch the dispatcher or other connections. Sequencing and validation
/// problems are NOT errors here - they are answered on the wire with the
/// matching `*Error` response.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Framing or transport failure
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Key exchange or payload decryption failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A payload-carrying kind arrived without its payload
    #[error("request is missing its payload")]
    MissingPayload,

    /// An encrypted payload arrived before the handshake finished
    #[error("no symmetric suite negotiated yet")]
    CipherNotEstablished,

    /// A group operation arrived before a group was bound
    #[error("no group bound to session")]
    NoGroupBound,
}

/// Errors that can occur starting or running the dispatcher.
#[derive(Error, Debug)]
pub enum DispatcherError {
    /// Binding or accepting on the listener failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Seeding the default group failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The supplied configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}
