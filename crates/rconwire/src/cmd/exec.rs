use std::time::Instant;

use crate::cmd::{connect, ExecArgs, ServerArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS};
use crate::output::{millis, print_response, OutputFormat};

pub async fn run(args: ExecArgs, server: &ServerArgs, format: OutputFormat) -> CliResult<i32> {
    let command = args.command.join(" ");
    if command.trim().is_empty() {
        return Err(CliError::usage("command must not be empty"));
    }

    let client = connect(server).await?;
    let started = Instant::now();
    let result = client.send_command(&command).await;
    let elapsed = started.elapsed();
    client.disconnect().await;

    let response = result.map_err(|err| client_error("command failed", err))?;
    print_response(
        &client.server_address(),
        &command,
        &response,
        args.time.then_some(elapsed),
        format,
    );
    if args.time && format != OutputFormat::Json {
        eprintln!("executed in {:.2}ms", millis(elapsed));
    }

    Ok(SUCCESS)
}
