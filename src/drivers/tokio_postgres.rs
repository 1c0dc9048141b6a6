use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, RowStream, Statement};
use tracing::{debug, error, instrument};

use crate::binder;
use crate::error::{DbResultError, Result};
use crate::result::{FetchPlan, ResultState};
use crate::traits::{DatabaseDriver, ResultHandle, Validity};
use crate::types::{BindingSet, ColumnDescriptor, HostType, RowBatch, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
///
/// Every dispatch prepares the statement first: statements with output
/// columns become lazily streamed queries, the rest run to completion
/// immediately. Any number of results may be open on one connection.
pub struct TokioPostgresDriver {
    client: Arc<Client>,
}

impl TokioPostgresDriver {
    /// Connect to a PostgreSQL database.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| DbResultError::ConnectionFailed(e.to_string()))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

impl Validity for TokioPostgresDriver {
    fn is_valid(&self) -> bool {
        !self.client.is_closed()
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    #[instrument(skip_all, fields(sql = %sql))]
    async fn dispatch(
        &self,
        sql: &str,
        bindings: Option<&BindingSet>,
    ) -> Result<Box<dyn ResultHandle>> {
        if !self.is_valid() {
            return Err(DbResultError::ResourceExpired);
        }
        if let Some(set) = bindings {
            reject_named(set)?;
        }

        let statement = self.client.prepare(sql).await.map_err(backend_error)?;
        if let Some(set) = bindings {
            binder::validate_positional(statement.params().len(), set)?;
        }
        let mut result = PgResult {
            client: Arc::clone(&self.client),
            columns: describe_columns(&statement),
            statement,
            state: ResultState::unbound(sql),
            pending: VecDeque::new(),
            stream: None,
            lookahead: None,
        };

        let started = match bindings {
            Some(set) => result.start(set.rows().collect()).await,
            None if result.statement.params().is_empty() => result.start(vec![Vec::new()]).await,
            None => {
                debug!("statement has parameters; waiting for bind");
                Ok(())
            }
        };
        if let Err(e) = started {
            result.state.mark_disposed();
            return Err(e);
        }
        Ok(Box::new(result))
    }
}

/// Result handle of the PostgreSQL backend.
///
/// Queries are streamed through `query_raw`, one parameter row at a time.
/// One row is read ahead so completion is known as soon as the last row
/// has been returned.
pub struct PgResult {
    client: Arc<Client>,
    statement: Statement,
    columns: Vec<ColumnDescriptor>,
    state: ResultState,
    /// Parameter rows not yet sent to the server
    pending: VecDeque<Vec<SqlValue>>,
    stream: Option<Pin<Box<RowStream>>>,
    lookahead: Option<tokio_postgres::Row>,
}

impl PgResult {
    fn live(&self) -> Result<&ResultState> {
        if self.is_valid() {
            Ok(&self.state)
        } else {
            Err(DbResultError::ResourceExpired)
        }
    }

    fn is_query(&self) -> bool {
        !self.statement.columns().is_empty()
    }

    /// Starts an execution for the given parameter rows.
    ///
    /// Non-queries are executed right away; if one of them fails the
    /// previous execution stays in place. Queries only drop the old cursor
    /// and queue the rows, the server is contacted on the first fetch.
    async fn start(&mut self, param_rows: Vec<Vec<SqlValue>>) -> Result<()> {
        if !self.is_query() {
            let mut total = 0;
            for params in &param_rows {
                let converted = to_sql_params(params);
                let refs: Vec<&(dyn ToSql + Sync)> = converted
                    .iter()
                    .map(|b| b.as_ref() as &(dyn ToSql + Sync))
                    .collect();
                total += self
                    .client
                    .execute(&self.statement, &refs)
                    .await
                    .map_err(backend_error)?;
            }
            self.state.finish_non_query(total)?;
            self.close_cursor();
            debug!(rows_affected = total, "statement executed");
            return Ok(());
        }

        self.state.restart_query(self.columns.clone())?;
        self.close_cursor();
        self.pending = param_rows.into();
        Ok(())
    }

    fn close_cursor(&mut self) {
        self.stream = None;
        self.lookahead = None;
        self.pending.clear();
    }

    async fn next_row(&mut self) -> Result<Option<tokio_postgres::Row>> {
        if let Some(row) = self.lookahead.take() {
            return Ok(Some(row));
        }
        loop {
            if self.stream.is_none() {
                let Some(params) = self.pending.pop_front() else {
                    return Ok(None);
                };
                let converted = to_sql_params(&params);
                let stream = self
                    .client
                    .query_raw(
                        &self.statement,
                        converted.iter().map(|b| b.as_ref() as &(dyn ToSql + Sync)),
                    )
                    .await
                    .map_err(backend_error)?;
                self.stream = Some(Box::pin(stream));
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };
            match stream.next().await {
                Some(row) => return row.map(Some).map_err(backend_error),
                None => self.stream = None,
            }
        }
    }

    /// Reads up to `limit` rows and reports whether the cursor is exhausted.
    async fn read_rows(&mut self, limit: Option<usize>) -> Result<(Vec<Vec<SqlValue>>, bool)> {
        let mut rows = Vec::new();
        while limit.map_or(true, |l| rows.len() < l) {
            match self.next_row().await? {
                Some(row) => rows.push(convert_row(&row, &self.columns)?),
                None => break,
            }
        }

        let exhausted = match self.next_row().await? {
            Some(row) => {
                self.lookahead = Some(row);
                false
            }
            None => true,
        };
        Ok((rows, exhausted))
    }
}

impl Validity for PgResult {
    fn is_valid(&self) -> bool {
        !self.state.is_disposed() && !self.client.is_closed()
    }
}

#[async_trait]
impl ResultHandle for PgResult {
    fn statement(&self) -> Result<&str> {
        Ok(self.live()?.statement())
    }

    fn column_info(&self) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.live()?.columns().to_vec())
    }

    fn has_completed(&self) -> Result<bool> {
        Ok(self.live()?.has_completed())
    }

    fn rows_affected(&self) -> Result<u64> {
        Ok(self.live()?.executed()?.rows_affected())
    }

    fn row_count(&self) -> Result<u64> {
        Ok(self.live()?.row_count())
    }

    #[instrument(skip(self))]
    async fn fetch(&mut self, n: i64) -> Result<RowBatch> {
        let limit = match self.live()?.plan_fetch(n)? {
            FetchPlan::Skip => return Ok(self.state.empty_batch()),
            FetchPlan::Take { limit } => limit,
        };

        match self.read_rows(limit).await {
            Ok((rows, exhausted)) => {
                self.state.record_fetch(rows.len(), exhausted);
                Ok(RowBatch::new(self.columns.clone(), rows))
            }
            Err(e) => {
                // A broken cursor must not resume with the next parameter row
                self.close_cursor();
                self.state.halt();
                Err(e)
            }
        }
    }

    fn check_bindings(&self, bindings: &BindingSet) -> Result<()> {
        reject_named(bindings)?;
        binder::validate_positional(self.statement.params().len(), bindings)
    }

    #[instrument(skip_all)]
    async fn rebind(&mut self, bindings: &BindingSet) -> Result<()> {
        self.live()?;
        reject_named(bindings)?;
        self.start(bindings.rows().collect()).await
    }

    #[instrument(skip_all)]
    async fn dispose(&mut self) -> Result<bool> {
        if self.state.mark_disposed() {
            // Dropping the stream abandons the portal without further I/O
            self.close_cursor();
        }
        Ok(true)
    }
}

fn backend_error(e: tokio_postgres::Error) -> DbResultError {
    DbResultError::BackendExecutionFailure(e.to_string())
}

fn reject_named(bindings: &BindingSet) -> Result<()> {
    if bindings.is_named() {
        return Err(DbResultError::MalformedBindingSet(
            "PostgreSQL only supports positional $n placeholders".to_string(),
        ));
    }
    Ok(())
}

fn describe_columns(statement: &Statement) -> Vec<ColumnDescriptor> {
    statement
        .columns()
        .iter()
        .map(|c| ColumnDescriptor::new(c.name(), c.type_().name(), host_type(c.type_()), true))
        .collect()
}

/// Map a PostgreSQL type to the host type its values are fetched as.
fn host_type(ty: &Type) -> HostType {
    if *ty == Type::INT2 || *ty == Type::INT4 {
        HostType::Int32
    } else if *ty == Type::INT8 {
        HostType::Int64
    } else if *ty == Type::FLOAT4 || *ty == Type::FLOAT8 {
        HostType::Float64
    } else if *ty == Type::BOOL {
        HostType::Bool
    } else if *ty == Type::BYTEA {
        HostType::Bytes
    } else if *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
    {
        HostType::Text
    } else {
        HostType::Unknown
    }
}

/// Convert SqlValue params to boxed ToSql trait objects.
fn to_sql_params(params: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params.iter().map(sql_value_to_tosql).collect()
}

fn sql_value_to_tosql(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null => Box::new(None::<String>),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Int32(i) => Box::new(*i),
        SqlValue::Int64(i) => Box::new(*i),
        SqlValue::Float64(f) => Box::new(*f),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Bytes(b) => Box::new(b.clone()),
    }
}

fn convert_row(row: &tokio_postgres::Row, columns: &[ColumnDescriptor]) -> Result<Vec<SqlValue>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| row_value(row, i, col))
        .collect()
}

/// Read the value at `index` as the column's host type.
fn row_value(row: &tokio_postgres::Row, index: usize, column: &ColumnDescriptor) -> Result<SqlValue> {
    let column_error =
        |e: tokio_postgres::Error| DbResultError::BackendExecutionFailure(format!("{}: {}", column.name, e));

    let value: SqlValue = match column.host_type {
        HostType::Int32 if row.columns()[index].type_() == &Type::INT2 => row
            .try_get::<_, Option<i16>>(index)
            .map_err(column_error)?
            .map(i32::from)
            .into(),
        HostType::Int32 => row.try_get::<_, Option<i32>>(index).map_err(column_error)?.into(),
        HostType::Int64 => row.try_get::<_, Option<i64>>(index).map_err(column_error)?.into(),
        HostType::Float64 if row.columns()[index].type_() == &Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)
            .map_err(column_error)?
            .map(f64::from)
            .into(),
        HostType::Float64 => row.try_get::<_, Option<f64>>(index).map_err(column_error)?.into(),
        HostType::Bool => row.try_get::<_, Option<bool>>(index).map_err(column_error)?.into(),
        HostType::Bytes => row.try_get::<_, Option<Vec<u8>>>(index).map_err(column_error)?.into(),
        HostType::Text => row.try_get::<_, Option<String>>(index).map_err(column_error)?.into(),
        // No mapping: values that can be read as text are, the rest come back as NULL
        HostType::Unknown => row
            .try_get::<_, Option<String>>(index)
            .ok()
            .flatten()
            .into(),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_type_mapping() {
        assert_eq!(host_type(&Type::INT2), HostType::Int32);
        assert_eq!(host_type(&Type::INT8), HostType::Int64);
        assert_eq!(host_type(&Type::FLOAT4), HostType::Float64);
        assert_eq!(host_type(&Type::VARCHAR), HostType::Text);
        assert_eq!(host_type(&Type::BYTEA), HostType::Bytes);
        assert_eq!(host_type(&Type::NUMERIC), HostType::Unknown);
    }

    #[test]
    fn test_named_bindings_rejected() {
        let named = BindingSet::builder().named("id", [1]).build().unwrap();
        assert!(matches!(
            reject_named(&named),
            Err(DbResultError::MalformedBindingSet(_))
        ));
        assert!(reject_named(&BindingSet::single([SqlValue::Int32(1)])).is_ok());
    }
}
