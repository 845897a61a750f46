//! TCP connection to the simulator.
//!
//! Wraps a [`TcpStream`] with the chunked read and line-oriented write
//! halves the session uses. Reads and writes go through `&self` so the
//! receiver thread and the foreground sender can share one connection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("No addresses found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    #[error("Connection refused by {0}")]
    Refused(SocketAddr),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to connection: {0}")]
    Write(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;

/// Duplex TCP byte stream to the simulator.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    /// Connect to `host:port`, trying each resolved address in order with
    /// a bounded per-address timeout. If no address accepts, the last
    /// failure is returned.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| NetError::Resolve {
                host: host.to_string(),
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            debug!("Trying {}", addr);
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(Self { stream, peer: addr }),
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    last_err = Some(NetError::Refused(addr));
                }
                Err(source) => {
                    last_err = Some(NetError::Connect { addr, source });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| NetError::NoAddress {
            host: host.to_string(),
            port,
        }))
    }

    /// Read a chunk of available bytes. Blocks until data arrives, the
    /// peer closes (`Ok(0)`), or the socket is shut down.
    pub fn read(&self, buffer: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buffer)
    }

    /// Write one command line, newline-terminated.
    pub fn write_line(&self, line: &str) -> Result<()> {
        (&self.stream)
            .write_all(format!("{}\n", line).as_bytes())
            .map_err(NetError::Write)
    }

    /// Shut down both directions, unblocking a pending read.
    pub fn shutdown(&self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }

    /// Address the connection was established to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_connect_success() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let conn = Connection::connect("127.0.0.1", addr.port(), TIMEOUT).unwrap();
        assert_eq!(conn.peer_addr(), addr);
    }

    #[test]
    fn test_connect_refused() {
        // Grab a free port, then close the listener so nothing accepts
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect("127.0.0.1", port, TIMEOUT).unwrap_err();
        assert!(matches!(err, NetError::Refused(_)), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_connect_resolve_failure() {
        let err = Connection::connect("no-such-host.invalid", 8080, TIMEOUT).unwrap_err();
        assert!(matches!(err, NetError::Resolve { .. }), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_write_line_appends_newline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let conn = Connection::connect("127.0.0.1", port, TIMEOUT).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        conn.write_line("M105").unwrap();
        drop(conn);

        let mut received = String::new();
        server.read_to_string(&mut received).unwrap();
        assert_eq!(received, "M105\n");
    }
}
