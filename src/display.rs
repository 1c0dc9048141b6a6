use std::fmt;

use crate::traits::ResultHandle;

/// Human-readable summary of a result handle.
///
/// Rendering never fails because of the handle: an expired handle prints
/// `EXPIRED`, and a line whose accessor returns an error is left out.
///
/// ```text
/// <InMemoryResult>
///   SQL  SELECT * FROM t
///   ROWS Fetched: 10 [incomplete]
///        Changed: 0
/// ```
pub struct Diagnostics<'a, H: ?Sized> {
    handle: &'a H,
}

impl<'a, H: ResultHandle + ?Sized> Diagnostics<'a, H> {
    pub fn new(handle: &'a H) -> Self {
        Self { handle }
    }
}

impl<H: ResultHandle + ?Sized> fmt::Display for Diagnostics<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<{}>", self.handle.type_name())?;
        if !self.handle.is_valid() {
            return writeln!(f, "  EXPIRED");
        }

        if let Ok(statement) = self.handle.statement() {
            writeln!(f, "  SQL  {}", statement)?;
        }
        if let (Ok(rows), Ok(completed)) = (self.handle.row_count(), self.handle.has_completed()) {
            let tag = if completed { "complete" } else { "incomplete" };
            writeln!(f, "  ROWS Fetched: {} [{}]", rows, tag)?;
        }
        if let Ok(changed) = self.handle.rows_affected() {
            writeln!(f, "       Changed: {}", changed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::{DbResultError, Result};
    use crate::traits::Validity;
    use crate::types::{BindingSet, ColumnDescriptor};

    // A backend whose accessors fail selectively
    struct FlakyResult {
        valid: bool,
        broken_row_count: bool,
    }

    impl Validity for FlakyResult {
        fn is_valid(&self) -> bool {
            self.valid
        }
    }

    #[async_trait]
    impl ResultHandle for FlakyResult {
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
            Err(DbResultError::BackendExecutionFailure("lost".to_string()))
        }
        fn row_count(&self) -> Result<u64> {
            if self.broken_row_count {
                Err(DbResultError::ResourceExpired)
            } else {
                Ok(3)
            }
        }
        async fn rebind(&mut self, _bindings: &BindingSet) -> Result<()> {
            Ok(())
        }
        async fn dispose(&mut self) -> Result<bool> {
            self.valid = false;
            Ok(true)
        }
    }

    #[test]
    fn test_failing_lines_are_omitted() {
        let handle = FlakyResult {
            valid: true,
            broken_row_count: false,
        };
        let out = Diagnostics::new(&handle).to_string();
        assert_eq!(
            out,
            "<FlakyResult>\n  SQL  SELECT 1\n  ROWS Fetched: 3 [incomplete]\n"
        );

        let handle = FlakyResult {
            valid: true,
            broken_row_count: true,
        };
        let out = Diagnostics::new(&handle).to_string();
        assert_eq!(out, "<FlakyResult>\n  SQL  SELECT 1\n");
    }

    #[test]
    fn test_expired_handle() {
        let handle = FlakyResult {
            valid: false,
            broken_row_count: false,
        };
        assert_eq!(
            Diagnostics::new(&handle).to_string(),
            "<FlakyResult>\n  EXPIRED\n"
        );
    }
}
