//! Integration tests for the WebSocket transport: a real listener on an
//! OS-assigned port and a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use mafia_transport::{
        Connection, Transport, TransportError, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0, connects one client, returns both ends.
    async fn pair() -> (mafia_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive() {
        let (conn, mut client) = pair().await;

        client
            .send(Message::Binary(b"vote".to_vec().into()))
            .await
            .unwrap();
        let received = conn.recv().await.unwrap().expect("a frame");
        assert_eq!(received, b"vote");

        conn.send(b"event").await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"event");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_accepted() {
        let (conn, mut client) = pair().await;

        client.send(Message::Text("{}".into())).await.unwrap();
        let received = conn.recv().await.unwrap().expect("a frame");
        assert_eq!(received, b"{}");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        // A pending recv must not block a push to the same client.
        let (conn, mut client) = pair().await;
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"push"))
            .await
            .expect("send must not wait for recv")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"push");

        client.close(None).await.unwrap();
        let result = reader.await.unwrap().unwrap();
        assert!(result.is_none(), "close should end recv with None");
    }

    #[tokio::test]
    async fn test_websocket_peer_addr_is_loopback() {
        let (conn, _client) = pair().await;
        assert!(conn.peer_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_websocket_bind_taken_port_fails() {
        let first = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();
        let result = WebSocketTransport::bind(&addr).await;
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_websocket_client_close_yields_none() {
        let (conn, mut client) = pair().await;
        client.close(None).await.unwrap();
        assert!(conn.recv().await.unwrap().is_none());
    }
}
