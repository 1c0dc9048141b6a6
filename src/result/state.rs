use tracing::{debug, warn};

use crate::error::{DbResultError, Result};
use crate::types::{ColumnDescriptor, RowBatch};

/// Where a result handle stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The statement has placeholders and no values have been bound yet.
    Unbound,
    /// Executed or rebound, nothing fetched yet.
    Executing,
    /// At least one non-empty batch fetched, rows remain.
    PartiallyFetched,
    /// No more rows or work for this execution.
    Completed,
    Disposed,
}

/// Whether the current execution produces rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Pending,
    Query,
    NonQuery,
}

/// What a fetch call has to do, as decided by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Return an empty batch without touching the cursor.
    Skip,
    /// Read up to `limit` rows from the cursor; `None` reads all of them.
    Take { limit: Option<usize> },
}

/// Execution state shared by every backend's result handle.
///
/// Backends own their cursor; this type owns the counters, the column
/// info and the phase transitions, so every backend follows the same
/// rules for completion, row counting and disposal.
#[derive(Debug)]
pub struct ResultState {
    statement: String,
    phase: Phase,
    kind: StatementKind,
    columns: Vec<ColumnDescriptor>,
    row_count: u64,
    rows_affected: u64,
}

impl ResultState {
    /// A statement waiting for its first binding set.
    pub fn unbound(statement: impl Into<String>) -> Self {
        Self::with(statement.into(), Phase::Unbound, StatementKind::Pending)
    }

    /// A query ready to be fetched.
    pub fn query(statement: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let mut state = Self::with(statement.into(), Phase::Executing, StatementKind::Query);
        state.columns = columns;
        state
    }

    /// A data-modifying statement that already ran to completion.
    pub fn non_query(statement: impl Into<String>, rows_affected: u64) -> Self {
        let mut state = Self::with(statement.into(), Phase::Completed, StatementKind::NonQuery);
        state.rows_affected = rows_affected;
        state
    }

    fn with(statement: String, phase: Phase, kind: StatementKind) -> Self {
        Self {
            statement,
            phase,
            kind,
            columns: Vec::new(),
            row_count: 0,
            rows_affected: 0,
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn has_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    /// An empty batch carrying the current column info.
    pub fn empty_batch(&self) -> RowBatch {
        RowBatch::empty(self.columns.clone())
    }

    /// Decides how a `fetch(n)` call proceeds.
    pub fn plan_fetch(&self, n: i64) -> Result<FetchPlan> {
        if n < -1 {
            return Err(DbResultError::InvalidArgument(format!(
                "fetch size must be -1 or non-negative, got {}",
                n
            )));
        }
        match self.phase {
            Phase::Disposed => return Err(DbResultError::ResourceExpired),
            Phase::Unbound => {
                return Err(DbResultError::UsageSequenceViolation(
                    "statement has placeholders; bind values before fetching".to_string(),
                ))
            }
            Phase::Completed => return Ok(FetchPlan::Skip),
            Phase::Executing | Phase::PartiallyFetched => {}
        }
        if self.kind != StatementKind::Query || n == 0 {
            return Ok(FetchPlan::Skip);
        }
        let limit = usize::try_from(n).ok();
        Ok(FetchPlan::Take { limit })
    }

    /// The state of a statement that has run at least once.
    /// Fails with `UsageSequenceViolation` while values are still unbound.
    pub fn executed(&self) -> Result<&Self> {
        if self.phase == Phase::Unbound {
            return Err(DbResultError::UsageSequenceViolation(
                "statement has not been executed; bind values first".to_string(),
            ));
        }
        Ok(self)
    }

    /// Ends the current execution after the cursor failed mid-fetch.
    /// Later fetches return empty batches until the next rebind.
    pub fn halt(&mut self) {
        if matches!(self.phase, Phase::Executing | Phase::PartiallyFetched) {
            warn!(
                statement = %self.statement,
                row_count = self.row_count,
                "cursor failed; execution ended"
            );
            self.phase = Phase::Completed;
        }
    }

    /// Accounts for a batch read from the cursor.
    pub fn record_fetch(&mut self, rows: usize, exhausted: bool) {
        if !matches!(self.phase, Phase::Executing | Phase::PartiallyFetched) {
            return;
        }
        self.row_count += rows as u64;
        if exhausted {
            self.phase = Phase::Completed;
        } else if rows > 0 {
            self.phase = Phase::PartiallyFetched;
        }
    }

    /// Starts a new query execution after a rebind.
    pub fn restart_query(&mut self, columns: Vec<ColumnDescriptor>) -> Result<()> {
        self.ensure_not_disposed()?;
        self.phase = Phase::Executing;
        self.kind = StatementKind::Query;
        self.columns = columns;
        self.row_count = 0;
        self.rows_affected = 0;
        Ok(())
    }

    /// Records a completed non-query execution after a rebind.
    pub fn finish_non_query(&mut self, rows_affected: u64) -> Result<()> {
        self.ensure_not_disposed()?;
        self.phase = Phase::Completed;
        self.kind = StatementKind::NonQuery;
        self.columns.clear();
        self.row_count = 0;
        self.rows_affected = rows_affected;
        Ok(())
    }

    /// Moves to `Disposed`. Returns true only for the call that actually
    /// released the handle.
    pub fn mark_disposed(&mut self) -> bool {
        if self.phase == Phase::Disposed {
            return false;
        }
        debug!(statement = %self.statement, phase = ?self.phase, "disposing result");
        self.phase = Phase::Disposed;
        true
    }

    /// Releases a handle that is being dropped without `dispose()`.
    /// Returns true when the handle was still live.
    pub fn abandon(&mut self) -> bool {
        if self.phase == Phase::Disposed {
            return false;
        }
        warn!(
            statement = %self.statement,
            "result dropped without dispose(); releasing its resources now"
        );
        self.phase = Phase::Disposed;
        true
    }

    fn ensure_not_disposed(&self) -> Result<()> {
        if self.phase == Phase::Disposed {
            return Err(DbResultError::ResourceExpired);
        }
        Ok(())
    }
}

impl Drop for ResultState {
    fn drop(&mut self) {
        self.abandon();
    }
}
