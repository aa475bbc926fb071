use std::time::Duration;

use clap::{Args, Subcommand};
use rconwire_client::{ClientConfig, ErrorKind, RconClient, ReconnectConfig};
use rconwire_transport::DEFAULT_PORT;
use tracing::{info, warn};

use crate::exit::{client_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod exec;
pub mod info;
pub mod interactive;
pub mod ping;
pub mod players;
pub mod version;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one command and print the response.
    #[command(alias = "run")]
    Exec(ExecArgs),
    /// Start an interactive session on stdin.
    #[command(alias = "repl")]
    Interactive(InteractiveArgs),
    /// Measure command round trips.
    Ping(PingArgs),
    /// Query basic server information.
    Info(InfoArgs),
    /// List online players.
    Players(PlayersArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, server: &ServerArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Exec(args) => exec::run(args, server, format).await,
        Command::Interactive(args) => interactive::run(args, server, format).await,
        Command::Ping(args) => ping::run(args, server, format).await,
        Command::Info(args) => info::run(args, server, format).await,
        Command::Players(args) => players::run(args, server, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Connection settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Server host name or address.
    #[arg(long, env = "RCON_HOST", default_value = "127.0.0.1", global = true)]
    pub host: String,
    /// Server port.
    #[arg(long, env = "RCON_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// RCON password.
    #[arg(
        long,
        short = 'p',
        env = "RCON_PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub password: Option<String>,
    /// Deadline for connecting and for each command (e.g. 5s, 500ms).
    #[arg(long, env = "RCON_TIMEOUT", default_value = "5s", global = true)]
    pub timeout: String,
    /// Reconnect automatically when the connection drops.
    #[arg(long, global = true)]
    pub reconnect: bool,
}

impl ServerArgs {
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let timeout = parse_duration(&self.timeout)?;
        let mut config = ClientConfig::new(self.host.clone(), self.port).with_timeout(timeout);
        match self.password.as_deref() {
            Some("") => return Err(CliError::usage("password must not be empty")),
            Some(password) => config = config.with_password(password),
            None => {
                return Err(CliError::usage(
                    "a password is required (--password or RCON_PASSWORD)",
                ))
            }
        }
        if self.reconnect {
            config = config.with_reconnect(ReconnectConfig::enabled());
        }
        config
            .validate()
            .map_err(|err| client_error("invalid settings", err))?;
        Ok(config)
    }
}

/// Connect and authenticate, retrying connection failures.
pub async fn connect(server: &ServerArgs) -> CliResult<RconClient> {
    let config = server.client_config()?;
    let address = config.address();

    let mut attempt = 1;
    loop {
        match RconClient::open(config.clone()).await {
            Ok(client) => {
                if attempt > 1 {
                    info!(%address, attempt, "connected");
                }
                return Ok(client);
            }
            Err(err) if err.kind() == ErrorKind::Connection && attempt < CONNECT_ATTEMPTS => {
                warn!(%address, attempt, error = %err, "connection attempt failed, retrying");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(err) => return Err(client_error(&address, err)),
        }
    }
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command to run; several words are joined with spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
    /// Report how long the command took.
    #[arg(long)]
    pub time: bool,
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Prompt shown before each line when stdin is a terminal.
    #[arg(long, default_value = "rcon> ")]
    pub prompt: String,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Number of round trips.
    #[arg(long, short = 'c', default_value_t = 1)]
    pub count: u32,
    /// Pause between round trips (e.g. 1s, 250ms).
    #[arg(long, short = 'i', default_value = "1s")]
    pub interval: String,
    /// Command used for each round trip.
    #[arg(long, default_value = "list")]
    pub command: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Also query seed, difficulty and game rules.
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args, Debug)]
pub struct PlayersArgs {
    /// Include player UUIDs (`list uuids`, falling back to `list`).
    #[arg(long)]
    pub uuids: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
