//! Keep a connection open with automatic reconnect and print every
//! lifecycle event as JSON.
//!
//! Run with:
//!   RCON_PASSWORD=secret cargo run --example watch-events -- 127.0.0.1 25575
//!
//! Restart the server while this runs to watch the reconnect sequence.

use rconwire::{ClientConfig, ClientEvent, RconClient, ReconnectConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(25575);
    let password = std::env::var("RCON_PASSWORD")?;

    let config = ClientConfig::new(host, port)
        .with_password(password)
        .with_reconnect(ReconnectConfig::enabled().with_max_attempts(None));
    let client = RconClient::new(config)?;
    let mut events = client.subscribe();

    client.connect().await?;
    if let Some(password) = client.config().password.clone() {
        client.authenticate(&password).await?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if matches!(event, ClientEvent::Authenticated) {
                        let players = client.send_command("list").await?;
                        eprintln!("{players}");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    eprintln!("missed {missed} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    client.disconnect().await;
    Ok(())
}
