use std::io::{IsTerminal, Write};

use rconwire_client::{ClientError, ErrorKind, RconClient};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cmd::{connect, InteractiveArgs, ServerArgs};
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{print_json, print_response, OutputFormat};

const HELP: &str = "\
Local commands:
  help         Show this message
  status       Show connection and auth state
  reconnect    Drop the connection and open a fresh one
  quit, exit   Leave the session

Anything else is sent to the server as a command.";

/// Input handled by the session itself instead of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Local {
    Help,
    Status,
    Reconnect,
    Quit,
}

impl Local {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "help" => Some(Local::Help),
            "status" => Some(Local::Status),
            "reconnect" => Some(Local::Reconnect),
            "quit" | "exit" => Some(Local::Quit),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct StatusOutput {
    server: String,
    peer: Option<String>,
    state: rconwire_client::ConnectionState,
    auth_state: rconwire_client::AuthState,
}

pub async fn run(
    args: InteractiveArgs,
    server: &ServerArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let client = connect(server).await?;
    let show_prompt = std::io::stdin().is_terminal();
    if show_prompt {
        eprintln!(
            "connected to {}. Type 'help' for local commands, 'quit' to leave.",
            client.server_address()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if show_prompt {
            let mut out = std::io::stdout();
            let _ = write!(out, "{}", args.prompt);
            let _ = out.flush();
        }

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.map_err(|err| io_error("reading stdin failed", err))?,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match Local::parse(input) {
            Some(Local::Quit) => break,
            Some(Local::Help) => println!("{HELP}"),
            Some(Local::Status) => print_status(&client, format),
            Some(Local::Reconnect) => match reopen(&client).await {
                Ok(()) => eprintln!("reconnected to {}", client.server_address()),
                Err(err) => eprintln!("error: {}", client_error("reconnect failed", err)),
            },
            None => execute(&client, input, format).await,
        }
    }

    client.disconnect().await;
    Ok(SUCCESS)
}

async fn execute(client: &RconClient, command: &str, format: OutputFormat) {
    match client.send_command(command).await {
        Ok(response) => {
            print_response(&client.server_address(), command, &response, None, format);
        }
        Err(err) if matches!(err.kind(), ErrorKind::Connection | ErrorKind::Protocol) => {
            // The command may or may not have run; it is not sent again.
            eprintln!("error: {}", client_error("command failed", err));
            eprintln!("connection lost, reconnecting (the command was not retried)");
            if client.config().reconnect.enabled {
                return;
            }
            match reopen(client).await {
                Ok(()) => info!(server = %client.server_address(), "session restored"),
                Err(err) => eprintln!("error: {}", client_error("reconnect failed", err)),
            }
        }
        Err(err) => eprintln!("error: {}", client_error("command failed", err)),
    }
}

/// Close whatever is left of the connection and open a fresh authenticated one.
async fn reopen(client: &RconClient) -> rconwire_client::Result<()> {
    client.disconnect().await;
    match client.connect().await {
        Ok(()) => {}
        // Automatic reconnect won the race.
        Err(ClientError::AlreadyConnected) => warn!("connection already re-established"),
        Err(err) => return Err(err),
    }
    if let Some(password) = client.config().password.clone() {
        client.authenticate(&password).await?;
    }
    Ok(())
}

fn print_status(client: &RconClient, format: OutputFormat) {
    let status = StatusOutput {
        server: client.server_address(),
        peer: client.peer_addr().map(|addr| addr.to_string()),
        state: client.state(),
        auth_state: client.auth_state(),
    };
    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "{} ({}, {})",
                status.server, status.state, status.auth_state
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_commands() {
        assert_eq!(Local::parse("help"), Some(Local::Help));
        assert_eq!(Local::parse("status"), Some(Local::Status));
        assert_eq!(Local::parse("reconnect"), Some(Local::Reconnect));
        assert_eq!(Local::parse("quit"), Some(Local::Quit));
        assert_eq!(Local::parse("exit"), Some(Local::Quit));
    }

    #[test]
    fn everything_else_goes_to_the_server() {
        assert_eq!(Local::parse("list"), None);
        assert_eq!(Local::parse("help 2"), None);
        assert_eq!(Local::parse("QUIT"), None);
    }
}
