use std::fmt;
use std::marker::PhantomData;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sockrpc_envelope::{MessageCodec, Status};
use tracing::debug;

use crate::channel::RpcChannel;
use crate::error::{CallError, Result};
use crate::lifecycle::CallState;

/// Client-side handle for a named remote service.
#[derive(Clone)]
pub struct RpcService {
    channel: Arc<RpcChannel>,
    service_name: Arc<str>,
}

impl RpcService {
    pub fn new(channel: Arc<RpcChannel>, service_name: impl AsRef<str>) -> Self {
        Self {
            channel,
            service_name: Arc::from(service_name.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.service_name
    }

    pub fn channel(&self) -> &RpcChannel {
        &self.channel
    }

    /// Typed stub for one method of this service.
    pub fn method<Req, Resp>(&self, method_name: impl AsRef<str>) -> RemoteMethod<Req, Resp> {
        RemoteMethod {
            channel: Arc::clone(&self.channel),
            service_name: Arc::clone(&self.service_name),
            method_name: Arc::from(method_name.as_ref()),
            _types: PhantomData,
        }
    }
}

impl fmt::Debug for RpcService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcService")
            .field("service_name", &self.service_name)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Typed stub for a single remote method.
///
/// Every invocation runs on a fresh worker thread with its own [`Status`].
pub struct RemoteMethod<Req, Resp> {
    channel: Arc<RpcChannel>,
    service_name: Arc<str>,
    method_name: Arc<str>,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> Clone for RemoteMethod<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            service_name: Arc::clone(&self.service_name),
            method_name: Arc::clone(&self.method_name),
            _types: PhantomData,
        }
    }
}

impl<Req, Resp> fmt::Debug for RemoteMethod<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("service_name", &self.service_name)
            .field("method_name", &self.method_name)
            .finish_non_exhaustive()
    }
}

impl<Req, Resp> RemoteMethod<Req, Resp>
where
    Req: MessageCodec + Send + 'static,
    Resp: MessageCodec + Send + 'static,
{
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Start the call in the background and return immediately.
    ///
    /// `done` runs on the worker thread, and only on success.
    pub fn call_with<F>(&self, request: Req, done: F) -> Result<CallHandle>
    where
        F: FnOnce(Resp) + Send + 'static,
    {
        self.spawn(request, done).map(|worker| CallHandle { worker })
    }

    /// Run the call and block for its outcome.
    ///
    /// With `timeout` set, the wait ends after that long with
    /// [`CallError::Timeout`]. The worker keeps running after a timeout and
    /// its eventual result is dropped.
    pub fn call(&self, request: Req, timeout: Option<Duration>) -> Result<Resp> {
        let (tx, rx) = mpsc::sync_channel::<Result<Resp>>(1);
        let done_tx = tx.clone();
        let worker = self.spawn(request, move |response| {
            let _ = done_tx.send(Ok(response));
        })?;

        // Outcomes that never reach `done` are reported by the watcher.
        let watcher = thread::Builder::new()
            .name(format!(
                "sockrpc-wait-{}.{}",
                self.service_name, self.method_name
            ))
            .spawn(move || {
                let outcome = match worker.join() {
                    Ok(report) => match report.state {
                        CallState::Delivered => return,
                        CallState::NoResponse => Err(CallError::NoResponse),
                        CallState::Failed => Err(CallError::from_status(&report.status)),
                    },
                    Err(_) => Err(CallError::Aborted),
                };
                let _ = tx.send(outcome);
            });
        if let Err(err) = watcher {
            return Err(CallError::Spawn(err));
        }

        let received = match timeout {
            Some(limit) => rx.recv_timeout(limit).map_err(|err| match err {
                mpsc::RecvTimeoutError::Timeout => CallError::Timeout(limit),
                mpsc::RecvTimeoutError::Disconnected => CallError::Aborted,
            }),
            None => rx.recv().map_err(|_| CallError::Aborted),
        };
        if let Err(CallError::Timeout(limit)) = &received {
            debug!(
                service = %self.service_name,
                method = %self.method_name,
                ?limit,
                "call timed out; worker left running"
            );
        }
        received?
    }

    fn spawn<F>(&self, request: Req, done: F) -> Result<JoinHandle<CallReport>>
    where
        F: FnOnce(Resp) + Send + 'static,
    {
        let channel = Arc::clone(&self.channel);
        let service_name = Arc::clone(&self.service_name);
        let method_name = Arc::clone(&self.method_name);
        thread::Builder::new()
            .name(format!("sockrpc-call-{service_name}.{method_name}"))
            .spawn(move || {
                let mut status = Status::new();
                let state =
                    channel.call_method(&service_name, &method_name, &request, &mut status, done);
                debug!(
                    service = %service_name,
                    method = %method_name,
                    ?state,
                    %status,
                    "call finished"
                );
                CallReport { status, state }
            })
            .map_err(CallError::Spawn)
    }
}

/// Final record of a background call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReport {
    pub status: Status,
    pub state: CallState,
}

impl CallReport {
    /// Convert to a `Result`, discarding the delivered flag.
    pub fn into_result(self) -> Result<CallState> {
        match self.state {
            CallState::Failed => Err(CallError::from_status(&self.status)),
            state => Ok(state),
        }
    }
}

/// Handle to a call started with [`RemoteMethod::call_with`].
///
/// Dropping the handle detaches the worker; the call still runs.
#[derive(Debug)]
pub struct CallHandle {
    worker: JoinHandle<CallReport>,
}

impl CallHandle {
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker finishes.
    ///
    /// A worker that panicked (for example inside the completion
    /// callback) yields [`CallError::Aborted`].
    pub fn wait(self) -> Result<CallReport> {
        self.worker.join().map_err(|_| CallError::Aborted)
    }
}
