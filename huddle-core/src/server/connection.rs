//! Per-connection serve loop.
//!
//! Owns the socket for one admitted connection and drives its
//! [`ConnectionSession`]: read one frame (bounded by the inactivity
//! timeout), hand it to the state machine, execute the outcome. Every
//! failure path ends this connection only; the dispatcher and the other
//! workers never see it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::protocol::{read_request, write_request};
use crate::server::session::{ConnectionSession, SessionOutcome};
use crate::store::GroupStore;

/// Per-connection knobs handed down from the dispatcher.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionSettings {
    pub inactivity_timeout: Duration,
    pub default_topic: String,
}

/// Serve one connection until it closes.
pub(crate) async fn serve(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: Arc<GroupStore>,
    settings: ConnectionSettings,
) {
    info!(%peer, "connection accepted");
    let mut session = ConnectionSession::new(store, settings.default_topic);

    loop {
        let request = match timeout(settings.inactivity_timeout, read_request(&mut stream)).await {
            Ok(Ok(request)) => request,
            Ok(Err(e)) => {
                // Includes the peer closing the stream mid-frame.
                debug!(%peer, error = %e, "connection ended");
                break;
            }
            Err(_) => {
                info!(%peer, "connection timed out");
                break;
            }
        };

        match session.handle(request) {
            Ok(SessionOutcome::Reply(response)) => {
                if let Err(e) = write_request(&mut stream, &response).await {
                    warn!(%peer, error = %e, "failed to write response");
                    break;
                }
            }
            Ok(SessionOutcome::ReplyThenClose(response)) => {
                if let Err(e) = write_request(&mut stream, &response).await {
                    warn!(%peer, error = %e, "failed to write goodbye response");
                }
                info!(%peer, "connection closed by goodbye");
                break;
            }
            Ok(SessionOutcome::Close) => {
                info!(%peer, "connection reset by client");
                break;
            }
            Err(e) => {
                warn!(%peer, error = %e, "fatal session error, closing connection");
                break;
            }
        }
    }
    // Dropping the stream closes the socket.
}
