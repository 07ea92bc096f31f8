//! One-shot TCP transport.
//! Every exchange dials a fresh connection, writes one frame and reads one frame.

use crate::error::{Result, TpLinkError, TransportPhase};
use crate::protocol::{HEADER_LEN, MAX_FRAME_LEN, parse_header};
use log::debug;
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Size of the read buffer used for responses.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Carries already-framed bytes to a device and returns the framed answer.
pub trait Transport {
    fn send(
        &self,
        address: &str,
        port: u16,
        request: &[u8],
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// The default transport: one tokio `TcpStream` per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for TcpTransport {
    /// The deadline covers connect, write and read together. The stream is
    /// owned by the exchange future, so it is closed on every return path and
    /// when the deadline drops the future.
    async fn send(
        &self,
        address: &str,
        port: u16,
        request: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>> {
        let endpoint = format!("{}:{}", address, port);
        match timeout(deadline, exchange(&endpoint, request)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Exchange with {} exceeded {:?}", endpoint, deadline);
                Err(TpLinkError::Timeout { endpoint })
            }
        }
    }
}

async fn exchange(endpoint: &str, request: &[u8]) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect(endpoint)
        .await
        .map_err(|e| TpLinkError::transport(endpoint, TransportPhase::Connect, &e))?;

    stream
        .write_all(request)
        .await
        .map_err(|e| TpLinkError::transport(endpoint, TransportPhase::Write, &e))?;

    read_frame(&mut stream, endpoint).await
}

/// Reads until the declared frame length has arrived or the peer closes.
async fn read_frame<R: AsyncReadExt + Unpin>(stream: &mut R, endpoint: &str) -> Result<Vec<u8>> {
    let mut response = Vec::with_capacity(READ_BUFFER_SIZE);
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut expected: Option<usize> = None;

    loop {
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| TpLinkError::transport(endpoint, TransportPhase::Read, &e))?;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&buf[..n]);

        if expected.is_none() && response.len() >= HEADER_LEN {
            let declared = parse_header(&response)?;
            if declared > MAX_FRAME_LEN {
                return Err(TpLinkError::DecodeFailed(format!(
                    "Declared length {} exceeds {}",
                    declared, MAX_FRAME_LEN
                )));
            }
            expected = Some(HEADER_LEN + declared as usize);
        }
        if expected.is_some_and(|len| response.len() >= len) {
            break;
        }
    }

    if response.is_empty() {
        let eof = std::io::Error::new(ErrorKind::UnexpectedEof, "connection closed without a response");
        return Err(TpLinkError::transport(endpoint, TransportPhase::Read, &eof));
    }
    if expected.is_some_and(|len| response.len() < len) {
        debug!(
            "Short frame from {}: {} of {:?} bytes",
            endpoint,
            response.len(),
            expected
        );
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{pack_frame, unpack_frame};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn fragmented_response_is_reassembled() {
        let payload = br#"{"system":{"set_relay_state":{"err_code":0}}}"#;
        let frame = pack_frame(payload).unwrap();

        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for chunk in frame.chunks(5) {
                server.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let response = read_frame(&mut client, "duplex").await.unwrap();
        writer.await.unwrap();
        assert_eq!(unpack_frame(&response).unwrap(), payload.to_vec());
    }

    #[tokio::test]
    async fn oversized_declaration_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        server.write_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00]).await.unwrap();
        let err = read_frame(&mut client, "duplex").await.unwrap_err();
        assert!(err.is_framing());
    }

    #[tokio::test]
    async fn closed_connection_without_data_is_a_read_error() {
        let (mut client, server) = tokio::io::duplex(64);
        drop(server);
        let err = read_frame(&mut client, "duplex").await.unwrap_err();
        assert!(matches!(
            err,
            TpLinkError::Transport {
                phase: TransportPhase::Read,
                kind: ErrorKind::UnexpectedEof,
                ..
            }
        ));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn refused_connection_is_permanent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpTransport
            .send("127.0.0.1", port, b"\x00\x00\x00\x01\xd0", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TpLinkError::Transport {
                phase: TransportPhase::Connect,
                ..
            }
        ));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let err = TcpTransport
            .send("127.0.0.1", port, b"\x00\x00\x00\x01\xd0", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, TpLinkError::Timeout { .. }));
        assert!(err.is_transient());
        server.abort();
    }
}
