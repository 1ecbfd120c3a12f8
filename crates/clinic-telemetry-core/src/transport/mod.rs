//! Transport layer: one persistent byte stream to the telemetry server.
//!
//! A [`Connection`] performs the role handshake on open and then exposes the
//! blocking framing primitives used by the command dispatcher. It carries no
//! locking of its own; exclusive access comes from `&mut self`.

pub mod framing;
pub mod host;

pub use host::is_valid_host;

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ClientConfig;

/// Role token announced right after the socket opens.
pub const DOCTOR_ROLE: &str = "Doctor";

/// Transport errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid host: {0:?}")]
    InvalidHost(String),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Could not resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by peer")]
    PeerClosed,

    #[error("Connection is not open")]
    NotConnected,

    #[error("String frame too long: {0} bytes")]
    FrameTooLong(usize),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Where a connection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

struct Streams<R: Read, W: Write> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
}

/// A handshaken connection to the server.
///
/// Generic over its read and write halves so tests can drive it with
/// in-memory buffers; production code uses the TCP default.
pub struct Connection<R: Read = TcpStream, W: Write = TcpStream> {
    streams: Option<Streams<R, W>>,
    peer: PeerInfo,
    role: String,
}

impl Connection<TcpStream, TcpStream> {
    /// Open a connection with default timeouts.
    pub fn connect(host: &str, port: u16) -> ConnectionResult<Self> {
        let config = ClientConfig {
            host: host.to_string(),
            port,
            ..ClientConfig::default()
        };
        Self::connect_with(&config)
    }

    /// Open a connection described by `config` and announce the role.
    pub fn connect_with(config: &ClientConfig) -> ConnectionResult<Self> {
        if !is_valid_host(&config.host) {
            return Err(ConnectionError::InvalidHost(config.host.clone()));
        }
        if config.port == 0 {
            return Err(ConnectionError::InvalidPort(config.port));
        }

        let peer = PeerInfo {
            host: config.host.clone(),
            port: config.port,
        };
        let endpoint = peer.to_string();
        let address =
            resolve_tcp_address(&peer.host, peer.port).map_err(|source| {
                ConnectionError::Resolve {
                    endpoint: endpoint.clone(),
                    source,
                }
            })?;

        let stream = TcpStream::connect_timeout(&address, config.connect_timeout())
            .map_err(|source| ConnectionError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;

        info!(%endpoint, role = %config.role, "connected to telemetry server");
        Self::from_streams(stream, writer, peer, &config.role)
    }
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Wrap already-open halves and perform the role handshake.
    pub fn from_streams(
        reader: R,
        writer: W,
        peer: PeerInfo,
        role: &str,
    ) -> ConnectionResult<Self> {
        let mut connection = Self {
            streams: Some(Streams {
                reader: BufReader::new(reader),
                writer: BufWriter::new(writer),
            }),
            peer,
            role: role.to_string(),
        };
        connection.send_string(role)?;
        connection.flush()?;
        Ok(connection)
    }

    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn is_connected(&self) -> bool {
        self.streams.is_some()
    }

    pub fn send_string(&mut self, value: &str) -> ConnectionResult<()> {
        framing::write_utf(&mut self.streams()?.writer, value)
    }

    pub fn send_int(&mut self, value: i32) -> ConnectionResult<()> {
        framing::write_int(&mut self.streams()?.writer, value)
    }

    pub fn send_bool(&mut self, value: bool) -> ConnectionResult<()> {
        framing::write_bool(&mut self.streams()?.writer, value)
    }

    pub fn flush(&mut self) -> ConnectionResult<()> {
        self.streams()?.writer.flush()?;
        Ok(())
    }

    pub fn recv_string(&mut self) -> ConnectionResult<String> {
        framing::read_utf(&mut self.streams()?.reader)
    }

    pub fn recv_int(&mut self) -> ConnectionResult<i32> {
        framing::read_int(&mut self.streams()?.reader)
    }

    pub fn recv_bool(&mut self) -> ConnectionResult<bool> {
        framing::read_bool(&mut self.streams()?.reader)
    }

    /// Release the stream. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut streams) = self.streams.take() {
            if let Err(error) = streams.writer.flush() {
                debug!(%error, "flush on close failed");
            }
            info!(peer = %self.peer, "connection closed");
        }
    }

    fn streams(&mut self) -> ConnectionResult<&mut Streams<R, W>> {
        self.streams.as_mut().ok_or(ConnectionError::NotConnected)
    }
}

impl<R: Read, W: Write> std::fmt::Debug for Connection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("role", &self.role)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<R: Read, W: Write> Drop for Connection<R, W> {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
