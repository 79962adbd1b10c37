//! In-process connection pair.
//!
//! Two [`MemoryConnection`]s wired back to back through unbounded mpsc
//! channels. Whatever one side sends, the other receives, in order.
//! Closing (or dropping) one side makes the other side's `recv` return
//! `Ok(None)`, which is how the router learns about a disconnect.
//!
//! Tests use this to run the full connection handler under
//! `tokio::time::pause()` without any sockets.

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, ConnectionId, TransportError};

/// One end of an in-memory duplex connection.
pub struct MemoryConnection {
    id: ConnectionId,
    /// `None` once this side has been closed.
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    /// Creates a connected pair. The first element is conventionally the
    /// server side, the second the client side.
    pub fn pair(server_id: ConnectionId, client_id: ConnectionId) -> (Self, Self) {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let server = Self {
            id: server_id,
            tx: Mutex::new(Some(to_client)),
            rx: Mutex::new(from_client),
        };
        let client = Self {
            id: client_id,
            tx: Mutex::new(Some(to_server)),
            rx: Mutex::new(from_server),
        };
        (server, client)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let tx = self.tx.lock().await;
        let tx = tx.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed(format!("{} closed", self.id))
        })?;
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed(format!(
                "peer of {} dropped",
                self.id
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.tx.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
