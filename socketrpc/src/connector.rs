//! Transports.
//!
//! A [`Connector`] moves bytes; it knows nothing about envelopes, callbacks,
//! or outcomes. Each invocation owns its own connector and uses it for
//! exactly one request/response exchange.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use protocol_socketrpc::frame::{self, DEFAULT_MAX_FRAME_LEN, FrameBuffer};

/// The transport boundary of an invocation.
pub trait Connector {
    /// Open the transport to `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Send one encoded request envelope.
    fn send_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Block until one complete response envelope has arrived and return it.
    fn recv_response(&mut self) -> io::Result<Vec<u8>>;

    /// Release the transport. Called once the response has arrived.
    fn close(&mut self);
}

/// Configuration for [`TcpConnector`].
#[derive(Debug, Clone)]
pub struct TcpConnectorConfig {
    /// Largest response frame accepted.
    pub max_frame_len: usize,
    /// Set `TCP_NODELAY` on the connection.
    pub nodelay: bool,
}

impl Default for TcpConnectorConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            nodelay: true,
        }
    }
}

/// Blocking TCP connector using size-prefixed frames.
#[derive(Debug)]
pub struct TcpConnector {
    config: TcpConnectorConfig,
    stream: Option<TcpStream>,
    buffer: FrameBuffer,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(TcpConnectorConfig::default())
    }
}

impl TcpConnector {
    pub fn new(config: TcpConnectorConfig) -> Self {
        let buffer = FrameBuffer::new(config.max_frame_len);
        Self {
            config,
            stream: None,
            buffer,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(self.config.nodelay)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn send_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        let mut framed = Vec::with_capacity(data.len() + 8);
        frame::encode(data, &mut framed);
        let stream = self.stream()?;
        stream.write_all(&framed)?;
        stream.flush()
    }

    fn recv_response(&mut self) -> io::Result<Vec<u8>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(payload) = self
                .buffer
                .try_decode()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            {
                return Ok(payload);
            }
            let n = self.stream()?.read(&mut chunk)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before a full response arrived",
                ));
            }
            self.buffer.push(&chunk[..n]);
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_without_connect() {
        let mut conn = TcpConnector::default();
        let err = conn.send_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(!conn.is_connected());
    }

    #[test]
    fn close_without_connect_is_noop() {
        let mut conn = TcpConnector::default();
        conn.close();
        assert!(!conn.is_connected());
    }

    #[test]
    fn framed_exchange() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut fb = FrameBuffer::default();
            let mut chunk = [0u8; 64];
            let request = loop {
                if let Some(frame) = fb.try_decode().unwrap() {
                    break frame;
                }
                let n = sock.read(&mut chunk).unwrap();
                fb.push(&chunk[..n]);
            };
            let mut reply = Vec::new();
            frame::encode(&request.iter().rev().copied().collect::<Vec<_>>(), &mut reply);
            // Dribble the reply to exercise reassembly.
            for b in reply {
                sock.write_all(&[b]).unwrap();
            }
        });

        let mut conn = TcpConnector::default();
        conn.connect("127.0.0.1", port).unwrap();
        conn.send_bytes(b"abc").unwrap();
        assert_eq!(conn.recv_response().unwrap(), b"cba");
        conn.close();
        assert!(!conn.is_connected());
        server.join().unwrap();
    }
}
