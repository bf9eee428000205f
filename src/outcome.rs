//! Outcome of a request.

use crate::error::{ClientError, ClientResult};
use crate::http::Response;

/// Exactly one of success or failure, produced once per request.
#[derive(Debug)]
pub enum Outcome {
    Success(Response),
    Failure(ClientError),
}

impl Outcome {
    /// Consume the outcome, running exactly one of the continuations.
    pub fn fold<R>(
        self,
        on_success: impl FnOnce(Response) -> R,
        on_failure: impl FnOnce(ClientError) -> R,
    ) -> R {
        match self {
            Outcome::Success(response) => on_success(response),
            Outcome::Failure(error) => on_failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn into_result(self) -> ClientResult<Response> {
        self.into()
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Failure(error) => error.label(),
        }
    }
}

impl From<ClientResult<Response>> for Outcome {
    fn from(result: ClientResult<Response>) -> Self {
        match result {
            Ok(response) => Outcome::Success(response),
            Err(error) => Outcome::Failure(error),
        }
    }
}

impl From<Outcome> for ClientResult<Response> {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(response) => Ok(response),
            Outcome::Failure(error) => Err(error),
        }
    }
}
