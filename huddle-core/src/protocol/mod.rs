//! Wire protocol: request kinds and binary framing.
//!
//! One client request is always answered by exactly one server request
//! (the two control kinds `Goodbye`/`Reset` are requests too; `Reset`
//! gets no answer). Both directions share one kind namespace and one
//! frame format, so the same codec serves client and server.

pub mod errors;
pub mod request;
pub mod wire;

pub use errors::{WireError, WireResult};
pub use request::{Request, RequestKind};
pub use wire::{read_request, write_request, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
