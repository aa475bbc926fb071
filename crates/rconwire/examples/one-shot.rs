//! Run one command and print the response.
//!
//! Run with:
//!   RCON_PASSWORD=secret cargo run --example one-shot -- 127.0.0.1 25575 list

use rconwire::{ClientConfig, RconClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(25575);
    let command = args.collect::<Vec<_>>().join(" ");
    let command = if command.is_empty() { "list".to_string() } else { command };
    let password = std::env::var("RCON_PASSWORD")?;

    let client = RconClient::open(ClientConfig::new(host, port).with_password(password)).await?;
    let response = client.send_command(&command).await?;
    println!("{response}");

    client.disconnect().await;
    Ok(())
}
