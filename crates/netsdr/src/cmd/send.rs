use std::path::Path;

use netsdr_codec::ControlItemCode;
use netsdr_session::SessionConfig;
use tracing::debug;

use crate::cmd::{parse_hex, parse_item, runtime, ConnectArgs, SendArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let item_code = parse_item(&args.item)?;
    let payload = match &args.data {
        Some(data) => parse_hex(data)?,
        None => Vec::new(),
    };
    let config = args.connect.session_config(config_path)?;

    runtime()?.block_on(send(&args.connect, &config, item_code, payload, format))
}

async fn send(
    connect: &ConnectArgs,
    config: &SessionConfig,
    item_code: ControlItemCode,
    payload: Vec<u8>,
    format: OutputFormat,
) -> CliResult<i32> {
    let conn = connect.connect(config).await?;
    debug!(%item_code, len = payload.len(), "sending control item");

    let body = conn
        .handle
        .send(item_code, payload)
        .await
        .map_err(|err| session_error("send failed", err))?;
    print_reply(item_code, &body, format);
    Ok(SUCCESS)
}
