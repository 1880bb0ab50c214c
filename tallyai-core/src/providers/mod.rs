//! Provider layer
//!
//! The provider turns a [`crate::protocol::ChatTurn`] into a vendor request,
//! drives it through a [`ChatTransport`], and normalizes the result. Trace
//! records for completed turns go to an optional [`TraceSink`].

pub mod error;
pub mod openai;
pub mod trace;
pub mod transport;

pub use error::{IncompleteReason, ProviderError, ProviderResult, TransportError};
pub use openai::{OpenAIProvider, ProviderConfig};
pub use trace::{record_best_effort, HttpTraceSink, TraceRecord, TraceSink};
pub use transport::{ChatTransport, EventHandler};
