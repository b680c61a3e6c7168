use std::f64::consts::TAU;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, Duration, Instant};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::accept_async;

const TICK: Duration = Duration::from_millis(20);

// Local sample source for exercising the sink end to end.
// Usage: telegauge-ws-smoke [BIND_ADDR] [FREQUENCY_HZ]
#[tokio::main]
async fn main() {
    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8765".to_string());
    let frequency = std::env::args()
        .nth(2)
        .and_then(|f| f.parse::<f64>().ok())
        .unwrap_or(0.5);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            std::process::exit(2);
        }
    };
    eprintln!("Streaming sine samples on ws://{} at {} Hz", addr, frequency);

    let started = Instant::now();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    eprintln!("Client {} connected", peer);
                    tokio::spawn(async move {
                        match stream_samples(stream, frequency, started).await {
                            Ok(()) => eprintln!("Client {} disconnected", peer),
                            Err(e) => eprintln!("Client {} dropped: {}", peer, e),
                        }
                    });
                }
                Err(e) => eprintln!("Accept failed: {}", e),
            },
            _ = &mut shutdown => {
                eprintln!("Shutting down");
                break;
            }
        }
    }
}

async fn stream_samples(
    stream: TcpStream,
    frequency: f64,
    started: Instant,
) -> Result<(), WsError> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();
    let mut ticker = interval(TICK);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let t = started.elapsed().as_secs_f64();
                write.send(Message::Text(sample(frequency, t))).await?;
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            }
        }
    }
}

/// One-element batch shaped like the upstream telemetry feed.
fn sample(frequency: f64, t: f64) -> String {
    serde_json::json!([{
        "channel": "sine",
        "frequency": frequency,
        "value": (TAU * frequency * t).sin(),
        "time": t
    }])
    .to_string()
}
