//! Runtime against a scripted Signal K server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use acker_runtime::{
    parse_plugin_config, AckerRuntime, ClientError, ClientExit, ReconnectConfig, RuntimeConfig, RuntimeError, ServerConfig,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

const SELF_URN: &str = "vessels.urn:mrn:imo:mmsi:230099999";

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(10), ws.next())
            .await
            .expect("timeout waiting for client frame")
            .expect("client closed")
            .expect("read failed");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

fn runtime_config(url: String) -> RuntimeConfig {
    RuntimeConfig {
        server: ServerConfig {
            url,
            ..ServerConfig::default()
        },
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn test_acknowledges_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/signalk/v1/stream?subscribe=none", listener.local_addr().unwrap());

    let rules = parse_plugin_config(
        r#"{"enabled": true, "configuration": {"notifications": [{"path": "mob", "state": "alarm", "delay": 0}]}}"#,
    )
    .unwrap();
    let runtime = AckerRuntime::new(&runtime_config(url));
    let report = runtime.start(&rules).await.unwrap();
    assert_eq!(report.subscribed, vec!["notifications.mob".to_string()]);

    let (socket, _) = timeout(Duration::from_secs(10), listener.accept()).await.unwrap().unwrap();
    let mut ws = accept_async(socket).await.unwrap();

    send_json(
        &mut ws,
        json!({"name": "test-server", "version": "2.8.0", "self": SELF_URN, "roles": ["master", "main"]}),
    )
    .await;

    let subscribe = next_json(&mut ws).await;
    assert_eq!(
        subscribe,
        json!({"context": "vessels.self", "subscribe": [{"path": "notifications.mob", "policy": "instant"}]})
    );

    send_json(
        &mut ws,
        json!({"context": SELF_URN, "updates": [{"values": [{"path": "notifications.mob", "value": {
            "state": "alarm",
            "method": ["visual", "sound"],
            "message": "Man overboard!"
        }}]}]}),
    )
    .await;

    let ack = next_json(&mut ws).await;
    assert_eq!(
        ack,
        json!({"context": "vessels.self", "updates": [{"values": [{"path": "mob", "value": {
            "state": "alarm",
            "method": [],
            "message": "Man overboard!"
        }}]}]})
    );

    let stop = runtime.shutdown().await;
    assert_eq!(stop.unsubscribed, 1);

    // The unsubscribe goes out before the connection closes
    let unsubscribe = next_json(&mut ws).await;
    assert_eq!(
        unsubscribe,
        json!({"context": "vessels.self", "unsubscribe": [{"path": "notifications.mob"}]})
    );
}

#[tokio::test]
async fn test_resubscribes_after_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/signalk/v1/stream?subscribe=none", listener.local_addr().unwrap());

    let mut config = runtime_config(url);
    config.server.reconnect.base_delay_secs = 0;
    let rules = parse_plugin_config(r#"{"notifications": [{"path": "fire", "state": "any"}]}"#).unwrap();
    let runtime = AckerRuntime::new(&config);
    runtime.start(&rules).await.unwrap();

    let (socket, _) = timeout(Duration::from_secs(10), listener.accept()).await.unwrap().unwrap();
    let mut first = accept_async(socket).await.unwrap();
    let subscribe = next_json(&mut first).await;
    assert_eq!(subscribe["subscribe"][0]["path"], "notifications.fire");
    drop(first);

    let (socket, _) = timeout(Duration::from_secs(10), listener.accept()).await.unwrap().unwrap();
    let mut second = accept_async(socket).await.unwrap();
    let subscribe = next_json(&mut second).await;
    assert_eq!(subscribe["subscribe"][0]["path"], "notifications.fire");

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_stops_the_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/signalk/v1/stream?subscribe=none", listener.local_addr().unwrap());
    drop(listener);

    let mut config = runtime_config(url);
    config.server.reconnect = ReconnectConfig {
        max_attempts: 2,
        base_delay_secs: 0,
        ..ReconnectConfig::default()
    };
    let rules = parse_plugin_config(r#"{"notifications": [{"path": "mob"}]}"#).unwrap();
    let runtime = AckerRuntime::new(&config);
    runtime.start(&rules).await.unwrap();

    let exit = timeout(Duration::from_secs(10), runtime.client_stopped())
        .await
        .expect("client should give up");
    assert_eq!(exit, ClientExit::GaveUp { attempts: 2 });
    assert_eq!(runtime.client_exit(), Some(ClientExit::GaveUp { attempts: 2 }));

    // A reload cannot bring the rules back without a connection
    let reload = runtime.reload(&rules).await;
    assert!(matches!(reload, Err(RuntimeError::Client(ClientError::Closed))));

    runtime.shutdown().await;
}
