//! Integration tests for the WebSocket transport.
//!
//! A real listener on an OS-assigned port and a real tokio-tungstenite
//! client, to check that frames survive the trip in both directions.

#[cfg(feature = "websocket")]
mod websocket {
    use fourline_transport::{Connection, Transport, WebSocketTransport};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0, connects one client, and returns both ends.
    async fn accept_one() -> (fourline_transport::WebSocketConnection, ClientWs)
    {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server = server_handle.await.expect("accept task");
        (server, client)
    }

    #[tokio::test]
    async fn test_json_goes_out_as_a_text_frame() {
        let (server, mut client) = accept_one().await;
        assert!(server.id().into_inner() > 0);

        server
            .send(br#"{"type":"waitingForOpponent"}"#)
            .await
            .expect("send");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "browser clients expect text frames");
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"type":"waitingForOpponent"}"#
        );
    }

    #[tokio::test]
    async fn test_text_and_binary_frames_are_both_received() {
        let (server, mut client) = accept_one().await;

        client.send(Message::Text("from text".into())).await.unwrap();
        client
            .send(Message::Binary(b"from binary".to_vec().into()))
            .await
            .unwrap();

        assert_eq!(server.recv().await.unwrap().unwrap(), b"from text");
        assert_eq!(server.recv().await.unwrap().unwrap(), b"from binary");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (server, mut client) = accept_one().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
