//! Greeter server and client in one process.
//!
//! Run with:
//!   cargo run --example greeter
//!
//! Or serve an echo service and call it from the CLI:
//!   cargo run --features cli -- echo --addr 127.0.0.1:8090
//!   cargo run --features cli -- call Echo Echo --addr 127.0.0.1:8090 --data hi

use std::sync::Arc;
use std::time::Duration;

use sockrpc::client::{RpcChannel, RpcService};
use sockrpc::envelope::Status;
use sockrpc::server::{Done, RpcServer, Service, ServiceRegistry};

#[derive(Clone, PartialEq, prost::Message)]
struct HelloRequest {
    #[prost(string, tag = "1")]
    name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct HelloReply {
    #[prost(string, tag = "1")]
    greeting: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = ServiceRegistry::new().with_service(Service::new("Greeter").method(
        "Hello",
        |_: &mut Status, request: HelloRequest, done: Done<'_, HelloReply>| {
            done.run(HelloReply {
                greeting: format!("Hello {}", request.name),
            });
            Ok(())
        },
    ));

    let server = RpcServer::bind("127.0.0.1:0", registry)?.spawn()?;
    eprintln!("Listening on {}", server.local_addr());

    let channel = Arc::new(RpcChannel::new("127.0.0.1", server.local_addr().port()));
    let hello = RpcService::new(channel, "Greeter").method::<HelloRequest, HelloReply>("Hello");

    let reply = hello.call(
        HelloRequest {
            name: "Eric".to_string(),
        },
        Some(Duration::from_secs(5)),
    )?;
    eprintln!("Reply: {}", reply.greeting);

    server.shutdown()?;
    Ok(())
}
