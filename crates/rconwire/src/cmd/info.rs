use serde::Serialize;

use crate::cmd::{connect, InfoArgs, ServerArgs};
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, strip_formatting, OutputFormat};

const BASIC: [&str; 2] = ["list", "version"];
const DETAILED: [&str; 3] = ["seed", "difficulty", "gamerule"];

#[derive(Debug, Serialize)]
struct Section {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    server: String,
    peer: Option<String>,
    sections: Vec<Section>,
}

pub async fn run(args: InfoArgs, server: &ServerArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connect(server).await?;

    let mut commands = BASIC.to_vec();
    if args.detailed {
        commands.extend(DETAILED);
    }

    let mut sections = Vec::with_capacity(commands.len());
    for command in commands {
        let section = match client.send_command(command).await {
            Ok(response) => Section {
                command,
                response: Some(response),
                error: None,
            },
            Err(err) => Section {
                command,
                response: None,
                error: Some(err.to_string()),
            },
        };
        sections.push(section);
    }

    let out = InfoOutput {
        server: client.server_address(),
        peer: client.peer_addr().map(|addr| addr.to_string()),
        sections,
    };
    client.disconnect().await;

    print_info(&out, format);
    if out.sections.iter().all(|s| s.error.is_some()) {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Pretty => {
            println!("Server: {}", out.server);
            if let Some(peer) = &out.peer {
                println!("Peer:   {peer}");
            }
            for section in &out.sections {
                println!();
                println!("=== {} ===", section.command.to_uppercase());
                match (&section.response, &section.error) {
                    (Some(response), _) => println!("{}", strip_formatting(response).trim_end()),
                    (None, Some(err)) => println!("unavailable: {err}"),
                    (None, None) => {}
                }
            }
        }
        OutputFormat::Raw => {
            for section in &out.sections {
                if let Some(response) = &section.response {
                    println!("{response}");
                }
            }
        }
    }
}
