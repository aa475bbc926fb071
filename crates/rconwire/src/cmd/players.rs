use tracing::warn;

use crate::cmd::{connect, PlayersArgs, ServerArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

const LIST: &str = "list";
const LIST_UUIDS: &str = "list uuids";

pub async fn run(args: PlayersArgs, server: &ServerArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connect(server).await?;

    let result = if args.uuids {
        match client.send_command(LIST_UUIDS).await {
            Ok(response) => Ok((LIST_UUIDS, response)),
            Err(err) => {
                // Older servers lack `list uuids`.
                warn!(error = %err, "uuid listing failed, falling back to plain list");
                client.send_command(LIST).await.map(|response| (LIST, response))
            }
        }
    } else {
        client.send_command(LIST).await.map(|response| (LIST, response))
    };
    client.disconnect().await;

    let (command, response) = result.map_err(|err| client_error("listing players failed", err))?;
    print_response(&client.server_address(), command, &response, None, format);
    Ok(SUCCESS)
}
