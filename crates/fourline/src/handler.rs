//! Per-connection handler: decode inbound frames, flush outbound events.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the router and send `welcome`
//!   2. Loop: race the next inbound frame against the next outbound event
//!   3. On close or error, hand the connection back to the router

use std::sync::Arc;

use fourline_protocol::{ClientEvent, Codec, ErrorKind, HumanId};
use fourline_transport::{Connection, TransportError};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{ConnectionRouter, FourlineError};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, K>(
    conn: C,
    router: Arc<ConnectionRouter>,
    codec: K,
) -> Result<(), FourlineError>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    let conn_id = conn.id();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = router
        .connect(HumanId(conn_id.into_inner()), tx)
        .await;
    debug!(%conn_id, human = %client.human(), "handling new connection");

    let result = loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        info!(%conn_id, "connection closed cleanly");
                        break Ok(());
                    }
                    Err(e) => break Err(FourlineError::Transport(e)),
                };
                match codec.decode::<ClientEvent>(&data) {
                    Ok(event) => router.handle_event(&mut client, event).await,
                    Err(e) => {
                        router
                            .reject(
                                client.human(),
                                ErrorKind::Validation,
                                format!("malformed message: {e}"),
                            )
                            .await;
                    }
                }
            }
            Some(event) = rx.recv() => {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => break Err(e.into()),
                };
                if let Err(e) = conn.send(&bytes).await {
                    break Err(e.into());
                }
            }
        }
    };

    router.disconnect(client).await;
    if let Err(e) = conn.close().await {
        debug!(%conn_id, error = %e, "close after disconnect failed");
    }
    result
}
