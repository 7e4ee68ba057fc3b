//! Services shared by the server unit tests.

use sockrpc_envelope::Status;

use crate::registry::{Done, Service, ServiceRegistry};

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub greeting: String,
}

pub fn greeter() -> Service {
    Service::new("Greeter").method(
        "Hello",
        |_: &mut Status, request: HelloRequest, done: Done<'_, HelloReply>| {
            done.run(HelloReply {
                greeting: format!("Hello {}", request.name),
            });
            Ok(())
        },
    )
}

/// Greeter plus a `Chips` service whose `Serve` method completes and then
/// fails, and whose `Burn` method returns an error.
pub fn registry() -> ServiceRegistry {
    let chips = Service::new("Chips")
        .method(
            "Serve",
            |status: &mut Status, _: HelloRequest, done: Done<'_, HelloReply>| {
                done.run(HelloReply {
                    greeting: "chips".to_string(),
                });
                status.set_failed("soggy chips");
                Ok(())
            },
        )
        .method(
            "Burn",
            |_: &mut Status, _: HelloRequest, _: Done<'_, HelloReply>| Err("fryer on fire".into()),
        );
    ServiceRegistry::new()
        .with_service(greeter())
        .with_service(chips)
}
