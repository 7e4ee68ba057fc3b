//! Scripted connector for exercising the client without a server.

use std::io::{Cursor, ErrorKind, Read, Write};
use std::net::Shutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prost::Message;
use sockrpc_envelope::RpcResponse;
use sockrpc_transport::{Connection, Connector, RpcStream, TransportConfig, TransportError};

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

/// What the scripted connector does when asked to connect.
pub enum Script {
    Reply(Vec<u8>),
    UnknownHost,
    Refused,
    ReadFails,
    WriteFails,
}

pub struct ScriptedConnector {
    script: Script,
    pub connects: AtomicUsize,
    pub written: Arc<Mutex<Vec<u8>>>,
    pub shutdowns: Arc<Mutex<Vec<Shutdown>>>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            connects: AtomicUsize::new(0),
            written: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(response: &RpcResponse) -> Self {
        Self::new(Script::Reply(response.encode_to_vec()))
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(
        &self,
        host: &str,
        port: u16,
        config: &TransportConfig,
    ) -> sockrpc_transport::Result<Connection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (reply, fail_reads, fail_writes) = match &self.script {
            Script::Reply(bytes) => (bytes.clone(), false, false),
            Script::ReadFails => (Vec::new(), true, false),
            Script::WriteFails => (Vec::new(), false, true),
            Script::UnknownHost => {
                return Err(TransportError::UnknownHost {
                    host: host.to_string(),
                    source: None,
                })
            }
            Script::Refused => {
                return Err(TransportError::Connect {
                    addr: format!("{host}:{port}"),
                    source: std::io::Error::new(ErrorKind::ConnectionRefused, "refused"),
                })
            }
        };
        let stream = ScriptedStream {
            reply: Cursor::new(reply),
            fail_reads,
            fail_writes,
            written: Arc::clone(&self.written),
            shutdowns: Arc::clone(&self.shutdowns),
        };
        Connection::new(Box::new(stream), config.clone())
    }
}

struct ScriptedStream {
    reply: Cursor<Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    written: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<Mutex<Vec<Shutdown>>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.fail_reads {
            return Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"));
        }
        self.reply.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.fail_writes {
            return Err(std::io::Error::new(ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl RpcStream for ScriptedStream {
    fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
        self.shutdowns.lock().unwrap().push(how);
        Ok(())
    }

    fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }

    fn set_write_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }
}
