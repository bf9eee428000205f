//! Translation of low-level failures into [`ClientError`].
//!
//! Wrapper errors are peeled off so the reported source is the most specific
//! cause available.

use std::io;

use crate::error::{BoxError, ClientError, TransportErrorKind};

/// Convert a hyper failure, unwrapping it to its root cause.
pub(crate) fn from_hyper(err: hyper::Error, target: &str) -> ClientError {
    let kind = hyper_kind(&err);
    let cause = root_cause(err);
    let kind = refine_io_kind(kind, &cause);
    ClientError::transport(kind, target, cause)
}

fn hyper_kind(err: &hyper::Error) -> TransportErrorKind {
    if err.is_parse() || err.is_parse_status() {
        TransportErrorKind::Protocol
    } else if err.is_incomplete_message()
        || err.is_closed()
        || err.is_canceled()
        || err.is_body_write_aborted()
    {
        TransportErrorKind::ConnectionClosed
    } else {
        TransportErrorKind::Other
    }
}

fn root_cause(err: hyper::Error) -> BoxError {
    match innermost_io(&err) {
        Some(io) => Box::new(io),
        None => Box::new(err),
    }
}

/// An owned copy of the deepest `io::Error` in the source chain of `err`.
fn innermost_io(err: &(dyn std::error::Error + 'static)) -> Option<io::Error> {
    let mut found = None;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            found = Some(io::Error::new(io.kind(), io.to_string()));
        }
        source = cause.source();
    }
    found
}

fn refine_io_kind(kind: TransportErrorKind, cause: &BoxError) -> TransportErrorKind {
    match cause.downcast_ref::<io::Error>().map(io::Error::kind) {
        Some(
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof,
        ) => TransportErrorKind::ConnectionClosed,
        _ => kind,
    }
}
