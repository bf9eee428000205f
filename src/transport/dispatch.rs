//! Sending one request over an established connection.
//!
//! Every wait on the socket (readiness, response head, each body frame) is
//! bounded by the socket timeout.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};

use crate::error::{ClientResult, TimeoutPhase};
use crate::http::Response;
use crate::transport::connector::Connection;
use crate::transport::{failure, timeouts};

/// Wait until `conn` can accept a request.
pub(crate) async fn ready(
    conn: &mut Connection,
    socket_timeout: Duration,
    target: &str,
) -> ClientResult<()> {
    timeouts::bounded(socket_timeout, TimeoutPhase::Socket, target, async {
        conn.ready().await.map_err(|e| failure::from_hyper(e, target))
    })
    .await
}

/// Send `request` on `conn` and read the whole response body.
pub(crate) async fn send(
    conn: &mut Connection,
    request: hyper::Request<Full<Bytes>>,
    socket_timeout: Duration,
    target: &str,
) -> ClientResult<Response> {
    ready(conn, socket_timeout, target).await?;

    let head = timeouts::bounded(socket_timeout, TimeoutPhase::Socket, target, async {
        conn.send(request)
            .await
            .map_err(|e| failure::from_hyper(e, target))
    })
    .await?;

    let (parts, mut body) = head.into_parts();
    let mut buf = BytesMut::new();
    loop {
        let frame = timeouts::bounded(socket_timeout, TimeoutPhase::Socket, target, async {
            Ok(body.frame().await)
        })
        .await?;

        match frame {
            None => break,
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    buf.extend_from_slice(&data);
                }
            }
            Some(Err(e)) => return Err(failure::from_hyper(e, target)),
        }
    }

    tracing::trace!(
        connection_id = %conn.id(),
        status = parts.status.as_u16(),
        body_bytes = buf.len(),
        "Response read"
    );
    Ok(Response::new(parts.status, parts.headers, buf.freeze()))
}
