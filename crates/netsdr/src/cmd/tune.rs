use std::path::Path;

use netsdr_session::{ReceiverCommand, SessionConfig};

use crate::cmd::{runtime, ConnectArgs, TuneArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: TuneArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let command = ReceiverCommand::set_frequency(args.channel, args.hz)
        .map_err(|err| session_error("invalid frequency", err))?;
    let config = args.connect.session_config(config_path)?;

    runtime()?.block_on(tune(&args.connect, &config, &command, format))
}

async fn tune(
    connect: &ConnectArgs,
    config: &SessionConfig,
    command: &ReceiverCommand,
    format: OutputFormat,
) -> CliResult<i32> {
    let conn = connect.connect(config).await?;
    let body = conn
        .handle
        .execute(command)
        .await
        .map_err(|err| session_error("tune failed", err))?;
    print_reply(command.item_code(), &body, format);
    Ok(SUCCESS)
}
