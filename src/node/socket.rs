//! Raw TCP entry point: one JSON request per connection, one JSON response back

use serde::de::IgnoredAny;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::service::{PredictionService, INVALID_REQUEST};
use crate::error::{AppError, Result};

/// Largest request accepted on the socket
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever, one task per connection.
///
/// A failed accept (fd exhaustion, aborted handshake) is logged and retried.
pub async fn serve(listener: TcpListener, service: Arc<PredictionService>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "Socket listener started");

    loop {
        let (stream, peer) = next_connection(|| listener.accept()).await;
        let service = service.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, &service).await {
                warn!(peer = %peer, error = %e, "Socket connection failed");
            }
        });
    }
}

/// Retry `accept` until it yields a connection
async fn next_connection<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept socket connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_connection<S>(mut stream: S, peer: SocketAddr, service: &PredictionService) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let reply = match read_json_value(&mut stream).await {
        Ok(payload) => service.respond(&payload),
        Err(e) => Err(e),
    };

    let mut body = match reply {
        Ok(encoded) => encoded,
        Err(AppError::Io(e)) => return Err(AppError::Io(e)),
        Err(e) => {
            debug!(peer = %peer, error = %e, "Answering socket request with an error");
            serde_json::to_vec(&json!({ "Error": e.public_message() })).map_err(AppError::Encoding)?
        }
    };
    body.push(b'\n');

    stream.write_all(&body).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read until the buffer holds one complete JSON value and return exactly its bytes
async fn read_json_value<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        let read = reader.read(&mut chunk).await?;
        if read > 0 {
            buf.extend_from_slice(&chunk[..read]);
        }

        if let Some(end) = complete_value_len(&buf)? {
            buf.truncate(end);
            return Ok(buf);
        }

        if read == 0 || buf.len() > MAX_REQUEST_BYTES {
            return Err(AppError::InvalidRequest(INVALID_REQUEST.to_string()));
        }
    }
}

/// Length of the first JSON value in `buf`, `None` if more bytes are needed
fn complete_value_len(buf: &[u8]) -> Result<Option<usize>> {
    let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match values.next() {
        Some(Ok(_)) => Ok(Some(values.byte_offset())),
        Some(Err(e)) if e.is_eof() => Ok(None),
        Some(Err(_)) => Err(AppError::InvalidRequest(INVALID_REQUEST.to_string())),
        None => Ok(None),
    }
}
