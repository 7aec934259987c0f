//! Error classifier for failed transport calls.
//!
//! Given a failed call's error, the classifier decides whether it is a
//! cancellation (suppressed, never surfaced as an error), a recoverable
//! failure with a user-facing message, or something outside the recognized
//! taxonomy that must be re-raised so contract violations are not masked
//! as user-facing failures.

use crate::error::ClientError;
use crate::transport::TransportError;

/// Outcome of classifying a failed transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// The call was cancelled; not an error, no state mutation follows.
    Cancelled,
    /// A recoverable failure with the most specific available message,
    /// to be absorbed into the store's error field.
    Recoverable(String),
}

/// Classify a failed transport call.
///
/// Prefers a server-supplied structured message over the raw body, and the
/// raw body over a generic status line. Errors outside the recognized
/// taxonomy are returned as `Err` and must propagate to the caller.
pub fn classify(err: TransportError) -> Result<Classified, ClientError> {
    match err {
        TransportError::Cancelled => Ok(Classified::Cancelled),
        TransportError::Remote {
            status,
            message,
            body,
        } => {
            let message = match message {
                Some(message) => message,
                None if !body.is_empty() => body,
                None => format!("request failed with status {status}"),
            };
            Ok(Classified::Recoverable(message))
        }
        TransportError::Network(message) => Ok(Classified::Recoverable(message)),
        err @ TransportError::InvalidBody(_) => Err(ClientError::Contract(err)),
    }
}
