use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use telegauge_stream::{ConnectionState, Transport, TransportError, WebSocketTransport};
use tungstenite::Message;

fn poll_until(
    transport: &mut WebSocketTransport,
    timeout: Duration,
    mut done: impl FnMut(&WebSocketTransport, &[String]) -> bool,
) -> Vec<String> {
    let deadline = Instant::now() + timeout;
    let mut received = Vec::new();
    while Instant::now() < deadline {
        let _ = transport.poll(Duration::from_millis(10));
        transport.dispatch(&mut |m| received.push(m));
        if done(transport, &received) {
            break;
        }
    }
    received
}

#[test]
fn receives_text_and_follows_remote_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        ws.send(Message::Text(r#"[{"value":0.5}]"#.into())).unwrap();
        ws.send(Message::Binary(br#"[{"value":-0.5}]"#.to_vec())).unwrap();
        ws.close(None).unwrap();
        while ws.read().is_ok() {}
    });

    let mut transport = WebSocketTransport::connect(&format!("ws://{addr}")).unwrap();
    assert_eq!(transport.state(), ConnectionState::Open);

    let received = poll_until(&mut transport, Duration::from_secs(5), |t, _| {
        t.state() != ConnectionState::Open
    });
    assert_eq!(received, vec![r#"[{"value":0.5}]"#, r#"[{"value":-0.5}]"#]);
    assert!(matches!(transport.state(), ConnectionState::Closing | ConnectionState::Closed));

    transport.close();
    assert_eq!(transport.state(), ConnectionState::Closed);
    assert!(matches!(transport.poll(Duration::from_millis(10)), Err(TransportError::Closed)));
    server.join().unwrap();
}

#[test]
fn poll_is_bounded_when_peer_is_silent() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        // Echo until the client goes away.
        while let Ok(message) = ws.read() {
            if message.is_text() {
                let _ = ws.send(message);
            }
        }
    });

    let mut transport = WebSocketTransport::connect(&format!("ws://{addr}")).unwrap();
    let started = Instant::now();
    transport.poll(Duration::from_millis(50)).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    transport.send("ping-1").unwrap();
    let received = poll_until(&mut transport, Duration::from_secs(5), |_, r| !r.is_empty());
    assert_eq!(received, vec!["ping-1".to_string()]);

    transport.close();
    assert_eq!(transport.state(), ConnectionState::Closed);
    assert!(matches!(transport.send("late"), Err(TransportError::Closed)));
    server.join().unwrap();
}

#[test]
fn connect_failure_names_the_url() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("ws://{addr}");
    match WebSocketTransport::connect(&url) {
        Err(TransportError::Connect { url: failed, .. }) => assert_eq!(failed, url),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connected to a closed port"),
    }
}
