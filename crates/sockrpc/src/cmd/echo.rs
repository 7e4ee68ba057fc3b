use sockrpc_envelope::{RawPayload, Status};
use sockrpc_server::{Done, RpcServer, Service, ServiceRegistry, ShutdownHandle};
use sockrpc_transport::TransportConfig;

use crate::cmd::EchoArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, OutputFormat};

const ECHO_METHOD: &str = "Echo";

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = ServiceRegistry::new().with_service(echo_service(&args.service));

    let server = RpcServer::bind(args.addr.as_str(), registry)
        .map_err(|err| server_error("bind failed", err))?
        .with_transport_config(TransportConfig::default().with_framing(args.framing.into()));

    install_ctrlc_handler(server.shutdown_handle())?;
    print_listening(server.local_addr(), &args.service, &[ECHO_METHOD], format);

    server.run().map_err(|err| server_error("server failed", err))?;
    Ok(SUCCESS)
}

fn echo_service(name: &str) -> Service {
    Service::new(name).method(
        ECHO_METHOD,
        |_: &mut Status, request: RawPayload, done: Done<'_, RawPayload>| {
            tracing::info!(size = request.as_bytes().len(), "echoing payload");
            done.run(request);
            Ok(())
        },
    )
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.shutdown()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockrpc_envelope::MessageCodec;

    #[test]
    fn echo_service_returns_payload_unchanged() {
        let service = echo_service("Mirror");
        assert_eq!(service.name(), "Mirror");

        let handler = service.handler(ECHO_METHOD).expect("Echo should be registered");
        let mut status = Status::new();
        let payload = handler
            .call(&mut status, &[0x00, 0xff, b'x'])
            .expect("echo should not fault")
            .expect("echo should complete");

        assert_eq!(payload, RawPayload::new(vec![0x00, 0xff, b'x']).to_payload());
        assert!(!status.is_failed());
    }
}
