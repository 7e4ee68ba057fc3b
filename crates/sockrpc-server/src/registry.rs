use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};

use sockrpc_envelope::{MessageCodec, Status};

use crate::error::{HandlerResult, MethodError};

/// Completion callback handed to a handler.
///
/// Running it captures the response that will be sent back. It is consumed
/// on use, so a handler can complete at most once. A handler that never
/// runs it produces a response without a payload.
pub struct Done<'a, R> {
    slot: &'a mut Option<R>,
}

impl<R> Done<'_, R> {
    pub fn run(self, response: R) {
        *self.slot = Some(response);
    }
}

/// Type-erased entry in a service's method table.
pub trait MethodHandler: Send + Sync {
    /// Decode `payload`, run the handler, and return the encoded response
    /// it completed with, if any.
    fn call(&self, status: &mut Status, payload: &[u8]) -> Result<Option<Vec<u8>>, MethodError>;
}

/// A handler closure bound to its request and response codecs.
pub struct TypedMethod<Req, Resp, F> {
    handler: F,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F> TypedMethod<Req, Resp, F>
where
    Req: MessageCodec,
    Resp: MessageCodec,
    F: Fn(&mut Status, Req, Done<'_, Resp>) -> HandlerResult + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _types: PhantomData,
        }
    }
}

impl<Req, Resp, F> MethodHandler for TypedMethod<Req, Resp, F>
where
    Req: MessageCodec,
    Resp: MessageCodec,
    F: Fn(&mut Status, Req, Done<'_, Resp>) -> HandlerResult + Send + Sync,
{
    fn call(&self, status: &mut Status, payload: &[u8]) -> Result<Option<Vec<u8>>, MethodError> {
        let request =
            Req::from_payload(payload).map_err(|err| MethodError::BadRequest(err.to_string()))?;

        let mut slot = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.handler)(status, request, Done { slot: &mut slot })
        }));

        match outcome {
            Ok(Ok(())) => Ok(slot.map(|response| response.to_payload())),
            Ok(Err(err)) => Err(MethodError::Fault(err.to_string())),
            Err(panic) => Err(MethodError::Fault(panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// A named service and its method table.
pub struct Service {
    name: String,
    methods: HashMap<String, Box<dyn MethodHandler>>,
}

impl Service {
    /// Empty service. `name` is the fully-qualified name clients call.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    /// Add a typed method.
    ///
    /// ```
    /// use sockrpc_envelope::{RawPayload, Status};
    /// use sockrpc_server::{Done, Service};
    ///
    /// let service = Service::new("Echo").method(
    ///     "Echo",
    ///     |_status: &mut Status, request: RawPayload, done: Done<'_, RawPayload>| {
    ///         done.run(request);
    ///         Ok(())
    ///     },
    /// );
    /// assert_eq!(service.method_names(), vec!["Echo"]);
    /// ```
    pub fn method<Req, Resp, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        Req: MessageCodec + 'static,
        Resp: MessageCodec + 'static,
        F: Fn(&mut Status, Req, Done<'_, Resp>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_method(name, TypedMethod::new(handler));
        self
    }

    /// Add a method from any [`MethodHandler`]. Replaces an existing
    /// method of the same name.
    pub fn register_method(
        &mut self,
        name: impl Into<String>,
        handler: impl MethodHandler + 'static,
    ) {
        self.methods.insert(name.into(), Box::new(handler));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method table lookup.
    pub fn handler(&self, method_name: &str) -> Option<&dyn MethodHandler> {
        self.methods.get(method_name).map(|handler| handler.as_ref())
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Services known to one server, keyed by fully-qualified name.
///
/// Built before serving starts and read-only afterwards; a running
/// [`RpcServer`](crate::RpcServer) holds it behind an `Arc`.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, returning any service it replaced.
    pub fn register(&mut self, service: Service) -> Option<Service> {
        self.services.insert(service.name.clone(), service)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_service(mut self, service: Service) -> Self {
        self.register(service);
        self
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
