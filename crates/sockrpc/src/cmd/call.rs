use std::fs;
use std::sync::Arc;
use std::time::Instant;

use sockrpc_client::{RpcChannel, RpcService};
use sockrpc_envelope::RawPayload;
use sockrpc_transport::TransportConfig;

use crate::cmd::{parse_addr, parse_duration, CallArgs};
use crate::exit::{call_error, io_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat, Reply};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_addr(&args.addr)?;
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args)?;

    let config = TransportConfig::default()
        .with_framing(args.framing.into())
        .with_connect_timeout(timeout);
    let channel = Arc::new(RpcChannel::new(host, port).with_config(config));
    let method = RpcService::new(channel, &args.service)
        .method::<RawPayload, RawPayload>(&args.method);

    tracing::debug!(
        addr = %args.addr,
        service = %args.service,
        method = %args.method,
        size = payload.len(),
        "calling"
    );

    let started = Instant::now();
    let reply = method
        .call(RawPayload::new(payload), Some(timeout))
        .map_err(|err| call_error("call failed", err))?;

    print_reply(
        &Reply {
            service: &args.service,
            method: &args.method,
            payload: reply.as_bytes(),
            elapsed_ms: started.elapsed().as_millis(),
        },
        format,
    );

    Ok(SUCCESS)
}

fn resolve_payload(args: &CallArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
