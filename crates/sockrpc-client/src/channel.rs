use std::fmt;
use std::sync::Arc;

use sockrpc_envelope::{MessageCodec, Status};
use sockrpc_transport::{Connector, TcpConnector, TransportConfig};

use crate::lifecycle::{CallState, Lifecycle};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8090;

/// Address of a server plus the settings used to reach it.
///
/// A channel holds no open socket. Every call opens its own connection and
/// closes it before returning, so a channel may be shared freely between
/// threads.
#[derive(Clone)]
pub struct RpcChannel {
    host: String,
    port: u16,
    config: TransportConfig,
    connector: Arc<dyn Connector>,
}

impl RpcChannel {
    /// Channel to `host:port` over TCP with default transport settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            config: TransportConfig::default(),
            connector: Arc::new(TcpConnector),
        }
    }

    /// Replace the transport configuration.
    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the connector used to open connections.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub(crate) fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// Run one call to completion on the current thread.
    ///
    /// Failures are recorded on `status` rather than returned. `done` runs
    /// at most once, and only when a decoded response is available and the
    /// status has not failed. A status that is already failed on entry
    /// short-circuits every stage: no connection is opened.
    pub fn call_method<Req, Resp, F>(
        &self,
        service_name: &str,
        method_name: &str,
        request: &Req,
        status: &mut Status,
        done: F,
    ) -> CallState
    where
        Req: MessageCodec,
        Resp: MessageCodec,
        F: FnOnce(Resp),
    {
        let mut call = Lifecycle::<Resp>::new(self, status);
        call.validate_request(service_name, method_name);
        call.open_connection();
        call.send_request(service_name, method_name, request);
        call.receive_reply();
        call.parse_envelope();
        call.extract_payload();
        call.deliver(done)
    }
}

impl Default for RpcChannel {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Debug for RpcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChannel")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sockrpc_transport::Framing;

    use super::*;

    #[test]
    fn default_channel_targets_localhost_8090() {
        let channel = RpcChannel::default();
        assert_eq!(channel.host(), "localhost");
        assert_eq!(channel.port(), 8090);
        assert_eq!(channel.config().framing, Framing::HalfClose);
    }

    #[test]
    fn with_config_replaces_transport_settings() {
        let channel = RpcChannel::new("10.0.0.7", 9000).with_config(
            TransportConfig::default()
                .with_framing(Framing::LengthDelimited)
                .with_connect_timeout(Duration::from_millis(250)),
        );
        assert_eq!(channel.config().framing, Framing::LengthDelimited);
        assert_eq!(
            channel.config().connect_timeout,
            Some(Duration::from_millis(250))
        );
        assert!(format!("{channel:?}").contains("10.0.0.7"));
    }
}
