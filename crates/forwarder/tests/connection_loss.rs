//! A VIS connection that goes away stops feeding the loop stale values.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use vis_relay_cache::SampleCache;
use vis_relay_client::{ClientError, DataSubscription, VisClient};
use vis_relay_forwarder::webhook::PostFuture;
use vis_relay_forwarder::{
    ErrorKind, ErrorPolicy, ForwardError, ForwardSettings, Forwarder, History, Target,
    ValueSource, WebhookSink,
};

#[derive(Default)]
struct CountingSink(std::sync::Mutex<usize>);

impl WebhookSink for CountingSink {
    fn post<'a>(&'a self, _url: &'a Url, _body: &'a Value) -> PostFuture<'a> {
        *self.0.lock().unwrap() += 1;
        Box::pin(async { Ok(()) })
    }
}

/// Accepts one client, acknowledges its subscription, pushes one value and
/// closes the socket once `close` fires.
async fn one_shot_server(close: oneshot::Receiver<()>) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let request: Value = loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => break serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("client went away before subscribing: {other:?}"),
            }
        };
        assert_eq!(request["action"], "subscribe");

        let ack = json!({
            "action": "subscribe",
            "requestId": request["requestId"],
            "subscriptionId": "7"
        });
        ws.send(WsMessage::Text(ack.to_string().into())).await.unwrap();
        let push = json!({"action": "subscription", "subscriptionId": "7", "value": 48.1});
        ws.send(WsMessage::Text(push.to_string().into())).await.unwrap();

        let _ = close.await;
        let _ = ws.close(None).await;
    });

    (format!("ws://{addr}"), handle)
}

#[tokio::test]
async fn terminate_policy_stops_when_connection_drops() {
    let (close_tx, close_rx) = oneshot::channel();
    let (url, server) = one_shot_server(close_rx).await;

    let client = VisClient::connect(&url).await.unwrap();
    let lat = DataSubscription::new("Signal.Emulator.telemetry.lat").unwrap();
    client.register(&lat);
    let history = History::new(lat.clone(), SampleCache::new(10).unwrap());
    client.send_subscribe(&lat).await.unwrap();

    assert_eq!(
        lat.get_value(Duration::from_secs(5)).await.unwrap(),
        json!(48.1)
    );

    close_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !client.is_closed() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client should notice the close");
    server.await.unwrap();

    assert!(matches!(
        lat.get_value(Duration::from_secs(5)).await,
        Err(ClientError::Closed)
    ));
    assert!(history.read(Duration::from_secs(5)).await.is_err());

    let sink = Arc::new(CountingSink::default());
    let receiver = Url::parse("http://receiver.test/").unwrap();
    let fwd = Forwarder::new(
        "WVW123",
        vec![Target::new(
            "latitude",
            "latitude",
            receiver.join("latitude").unwrap(),
            Arc::new(lat.clone()),
        )],
        sink.clone(),
        ForwardSettings {
            on_error: ErrorPolicy::Terminate,
            ..ForwardSettings::default()
        },
    );

    let err = tokio::time::timeout(Duration::from_secs(5), fwd.run(CancellationToken::new()))
        .await
        .expect("loop should stop on the closed connection")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(matches!(err, ForwardError::Client(ClientError::Closed)));
    assert_eq!(*sink.0.lock().unwrap(), 0);
}
