use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use prost::Message;
use sockrpc_envelope::{ErrorReason, RpcResponse};
use sockrpc_transport::{Connection, RpcListener, TransportConfig, TransportError};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{Result, ServerError};
use crate::registry::ServiceRegistry;

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Thread-per-connection RPC server.
///
/// Each accepted connection carries one call: the request is read to the
/// end of the stream, dispatched, answered, and the socket is closed.
/// There is no connection limit.
pub struct RpcServer {
    listener: RpcListener,
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
    next_connection_id: AtomicU64,
}

impl RpcServer {
    /// Bind a listening socket for `registry`.
    ///
    /// Registration must be complete before this call; the registry is
    /// read-only from here on.
    pub fn bind(
        addr: impl ToSocketAddrs,
        registry: impl Into<Arc<ServiceRegistry>>,
    ) -> Result<Self> {
        let listener = RpcListener::bind(addr)?;
        Ok(Self {
            listener,
            dispatcher: Arc::new(Dispatcher::new(registry)),
            running: Arc::new(AtomicBool::new(true)),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Override transport settings for accepted connections.
    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.listener.set_config(config);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle that stops [`run`](Self::run) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            wake_addr: wake_addr(self.local_addr()),
        }
    }

    /// Accept and serve connections until shut down.
    ///
    /// Connection workers still in flight at shutdown are not waited for.
    pub fn run(&self) -> Result<()> {
        info!(addr = %self.local_addr(), "rpc server started");

        while self.running.load(Ordering::SeqCst) {
            let connection = match self.listener.accept() {
                Ok(connection) => connection,
                Err(err) => {
                    if self.accept_failed(&err) {
                        continue;
                    }
                    break;
                }
            };
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
            let dispatcher = Arc::clone(&self.dispatcher);
            let spawned = thread::Builder::new()
                .name(format!("sockrpc-conn-{id}"))
                .spawn(move || serve_connection(&dispatcher, connection, id));
            if let Err(err) = spawned {
                warn!(connection = id, error = %err, "failed to spawn connection worker");
            }
        }

        info!(addr = %self.local_addr(), "rpc server stopped");
        Ok(())
    }

    /// Whether the accept loop should retry after `err`. A running server
    /// backs off before retrying so a persistent error cannot spin.
    fn accept_failed(&self, err: &TransportError) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        warn!(error = %err, "accept failed");
        thread::sleep(ACCEPT_BACKOFF);
        true
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> Result<RunningServer> {
        let local_addr = self.local_addr();
        let shutdown = self.shutdown_handle();
        let thread = thread::Builder::new()
            .name("sockrpc-server".to_string())
            .spawn(move || self.run())
            .map_err(ServerError::Spawn)?;
        Ok(RunningServer {
            local_addr,
            shutdown,
            thread,
        })
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("local_addr", &self.local_addr())
            .field("services", &self.dispatcher.registry().service_names())
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

/// Stops a server's accept loop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Stop accepting. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        // Unblock a pending accept.
        if let Err(err) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            debug!(error = %err, "shutdown wake-up connect failed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

/// A server running on its own thread.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: JoinHandle<Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stop accepting and wait for the accept loop to exit.
    pub fn shutdown(self) -> Result<()> {
        self.shutdown.shutdown();
        self.join()
    }

    /// Wait for the accept loop to exit.
    pub fn join(self) -> Result<()> {
        self.thread.join().map_err(|_| ServerError::Panicked)?
    }
}

fn serve_connection(dispatcher: &Dispatcher, mut connection: Connection, id: u64) {
    debug!(connection = id, peer = connection.peer(), "serving connection");

    let response = match connection.read_message() {
        Ok(bytes) => dispatcher.dispatch(&bytes),
        Err(
            err @ (TransportError::MessageTooLarge { .. }
            | TransportError::InvalidFrame(_)
            | TransportError::ConnectionClosed),
        ) => {
            warn!(connection = id, error = %err, "bad request data from client");
            RpcResponse::failure(
                ErrorReason::BadRequestData,
                format!("Bad request data from client: {err}"),
            )
        }
        Err(err) => {
            warn!(connection = id, error = %err, "failed to read request");
            connection.close();
            return;
        }
    };

    if let Err(err) = connection.write_message(&response.encode_to_vec()) {
        warn!(connection = id, error = %err, "failed to write response");
    }
    connection.close();
}

fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
