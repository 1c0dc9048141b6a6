use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{ResultHandle, Validity};
use crate::types::BindingSet;

/// Trait for database driver implementations.
/// A driver is one live connection plus its statement dispatch.
/// Drivers are responsible for:
/// - Submitting statement text and bound values to the backend
/// - Converting SqlValue parameters to native types
/// - Producing a ResultHandle that owns the statement's cursor
/// - Never letting a disposed handle perform backend I/O
#[async_trait]
pub trait DatabaseDriver: Validity + Send + Sync {
    /// Submit a statement and return its result handle.
    ///
    /// Without bindings, a statement that contains placeholders yields an
    /// unbound handle that must be bound before it can be fetched.
    async fn dispatch(
        &self,
        sql: &str,
        bindings: Option<&BindingSet>,
    ) -> Result<Box<dyn ResultHandle>>;

    /// How many result handles may be open on this connection at once.
    /// `None` means no limit.
    fn max_open_results(&self) -> Option<usize> {
        None
    }
}
