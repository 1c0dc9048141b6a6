use crate::error::Result;
use crate::traits::ResultHandle;

/// Descriptive snapshot of a result handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultInfo {
    pub statement: String,
    pub row_count: u64,
    pub rows_affected: u64,
    pub has_completed: bool,
}

/// Reads the current state of a handle through its accessors.
/// Nothing is cached, so calling this mid-fetch reflects the rows fetched so far.
pub fn result_info<H: ResultHandle + ?Sized>(handle: &H) -> Result<ResultInfo> {
    let statement = handle.statement()?.to_string();
    let row_count = handle.row_count()?;
    let rows_affected = handle.rows_affected()?;
    let has_completed = handle.has_completed()?;
    Ok(ResultInfo {
        statement,
        row_count,
        rows_affected,
        has_completed,
    })
}
