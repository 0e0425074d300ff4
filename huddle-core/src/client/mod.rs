//! Client side of the session protocol.

pub mod errors;
pub mod session;

pub use errors::{ClientError, ClientResult};
pub use session::ClientSession;
