use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::connection::Connection;
use crate::error::{Result, TransportError};

/// Opens client connections.
///
/// [`TcpConnector`] is the default; tests substitute scripted streams.
pub trait Connector: Send + Sync {
    /// Open a connection to `host:port`.
    ///
    /// Name resolution failures are reported as
    /// [`TransportError::UnknownHost`]; every other failure as
    /// [`TransportError::Connect`].
    fn connect(&self, host: &str, port: u16, config: &TransportConfig) -> Result<Connection>;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, config: &TransportConfig) -> Result<Connection> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|err| TransportError::UnknownHost {
                host: host.to_string(),
                source: Some(err),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::UnknownHost {
                host: host.to_string(),
                source: None,
            });
        }

        let mut last_err = None;
        for addr in &addrs {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    debug!(%addr, "connected");
                    return Connection::new(Box::new(stream), config.clone());
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: format!("{host}:{port}"),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "no address connected")
            }),
        })
    }
}

/// Listening TCP socket that yields one [`Connection`] per accepted peer.
pub struct RpcListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: TransportConfig,
}

impl RpcListener {
    /// Bind and listen with the default transport configuration.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::bind_with_config(addr, TransportConfig::default())
    }

    /// Bind and listen with explicit transport configuration.
    pub fn bind_with_config(addr: impl ToSocketAddrs, config: TransportConfig) -> Result<Self> {
        let listener = TcpListener::bind(&addr).map_err(|err| TransportError::Bind {
            addr: describe(&addr),
            source: err,
        })?;
        let local_addr = listener.local_addr().map_err(|err| TransportError::Bind {
            addr: describe(&addr),
            source: err,
        })?;

        info!(%local_addr, "listening for rpc connections");

        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Connection::new(Box::new(stream), self.config.clone())
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Replace the configuration applied to subsequently accepted connections.
    pub fn set_config(&mut self, config: TransportConfig) {
        self.config = config;
    }

    /// Configuration applied to accepted connections.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl std::fmt::Debug for RpcListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcListener")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

fn describe(addr: &impl ToSocketAddrs) -> String {
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "<unresolved>".to_string())
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::config::Framing;

    #[test]
    fn connect_send_receive_over_loopback() {
        let listener = RpcListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().port();

        let server = thread::spawn(move || {
            let mut conn = listener.accept().unwrap();
            let request = conn.read_message().unwrap();
            assert_eq!(request.as_ref(), b"ping");
            conn.write_message(b"pong").unwrap();
            conn.close();
        });

        let mut client = TcpConnector
            .connect("127.0.0.1", port, &TransportConfig::default())
            .unwrap();
        client.send(b"ping").unwrap();
        let reply = client.receive().unwrap();
        assert_eq!(reply.as_ref(), b"pong");
        assert!(client.is_closed());

        server.join().unwrap();
    }

    #[test]
    fn delimited_framing_over_loopback() {
        let config = TransportConfig::default().with_framing(Framing::LengthDelimited);
        let listener = RpcListener::bind_with_config("127.0.0.1:0", config.clone()).unwrap();
        let port = listener.local_addr().port();

        let server = thread::spawn(move || {
            let mut conn = listener.accept().unwrap();
            let request = conn.read_message().unwrap();
            conn.write_message(&request).unwrap();
        });

        let mut client = TcpConnector.connect("127.0.0.1", port, &config).unwrap();
        client.send(b"echo me").unwrap();
        assert_eq!(client.receive().unwrap().as_ref(), b"echo me");

        server.join().unwrap();
    }

    #[test]
    fn unresolvable_host_is_unknown_host() {
        let err = TcpConnector
            .connect("no-such-host.invalid", 8090, &TransportConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownHost { .. }));
    }

    #[test]
    fn refused_connection_is_connect_error() {
        // Bind then drop to find a port with nothing listening.
        let port = {
            let listener = RpcListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().port()
        };
        let config = TransportConfig::default().with_connect_timeout(Duration::from_secs(2));
        let err = TcpConnector.connect("127.0.0.1", port, &config).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn bind_reports_address_in_use() {
        let first = RpcListener::bind("127.0.0.1:0").unwrap();
        let err = RpcListener::bind(first.local_addr()).unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
    }
}
