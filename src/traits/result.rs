use async_trait::async_trait;

use crate::binder;
use crate::error::{DbResultError, Result};
use crate::traits::Validity;
use crate::types::{BindingSet, ColumnDescriptor, RowBatch};

/// The caller-visible handle for one statement execution and its cursor.
///
/// Each backend driver implements this trait for its own result type and
/// owns its cursor resources independently. A handle starts out executing
/// (or unbound when its statement has placeholders but no values yet),
/// advances through `fetch`, may be restarted through `bind`, and ends with
/// exactly one `dispose`.
///
/// Accessors fail with `ResourceExpired` once the handle is no longer valid.
#[async_trait]
pub trait ResultHandle: Validity + Send {
    /// The literal statement text submitted for execution.
    fn statement(&self) -> Result<&str>;

    /// One descriptor per output field, in result order.
    /// Empty for statements without tabular output.
    fn column_info(&self) -> Result<Vec<ColumnDescriptor>>;

    /// True once a query's rows are exhausted, or once a non-query ran.
    fn has_completed(&self) -> Result<bool>;

    /// Rows inserted, updated or deleted; 0 for queries.
    /// Fails with `UsageSequenceViolation` before the statement has run.
    fn rows_affected(&self) -> Result<u64>;

    /// Rows returned by `fetch` so far in the current execution.
    fn row_count(&self) -> Result<u64>;

    /// Retrieves at most `n` rows, or all remaining rows for `n = -1`.
    ///
    /// Returns an empty batch once the result has completed and for
    /// non-queries. Backends either override this method or implement
    /// `fetch_chunk`, which it forwards to.
    async fn fetch(&mut self, n: i64) -> Result<RowBatch> {
        self.fetch_chunk(n).await
    }

    /// Backend fetch primitive used when `fetch` is not overridden.
    async fn fetch_chunk(&mut self, _n: i64) -> Result<RowBatch> {
        Err(DbResultError::UsageSequenceViolation(format!(
            "{} implements neither fetch nor fetch_chunk",
            self.type_name()
        )))
    }

    /// Adopts a new, already validated binding set.
    ///
    /// Callers should go through `bind`, which checks the set against the
    /// statement's placeholders first.
    async fn rebind(&mut self, bindings: &BindingSet) -> Result<()>;

    /// Checks that a binding set fits the statement's placeholders.
    /// Backends that prepare statements can check the server's own count.
    fn check_bindings(&self, bindings: &BindingSet) -> Result<()> {
        binder::validate(self.statement()?, bindings)
    }

    /// Binds new parameter values and restarts execution.
    ///
    /// Queries become ready for a fresh fetch cycle; non-queries are executed
    /// to completion before this returns.
    async fn bind(&mut self, bindings: &BindingSet) -> Result<()> {
        binder::bind(self, bindings).await.map(|_| ())
    }

    /// Releases all local and remote resources of the handle.
    /// Disposing an already disposed handle succeeds.
    async fn dispose(&mut self) -> Result<bool>;

    /// Short name of the concrete handle type, used by diagnostics.
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A backend that only knows how to report its state
    struct StaticResult;

    impl Validity for StaticResult {
        fn is_valid(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl ResultHandle for StaticResult {
        fn statement(&self) -> Result<&str> {
            Ok("SELECT 1")
        }
        fn column_info(&self) -> Result<Vec<ColumnDescriptor>> {
            Ok(Vec::new())
        }
        fn has_completed(&self) -> Result<bool> {
            Ok(false)
        }
        fn rows_affected(&self) -> Result<u64> {
            Ok(0)
        }
        fn row_count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn rebind(&mut self, _bindings: &BindingSet) -> Result<()> {
            Ok(())
        }
        async fn dispose(&mut self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_fetch_without_backend_primitive() {
        let mut handle = StaticResult;
        assert!(matches!(
            handle.fetch(1).await,
            Err(DbResultError::UsageSequenceViolation(_))
        ));
    }

    #[test]
    fn test_type_name_is_short() {
        assert_eq!(StaticResult.type_name(), "StaticResult");
    }
}
