mod tokio_postgres;

pub use self::in_memory_test::{
    InMemoryResponse, InMemoryResult, InMemoryTestDriver, InMemoryTestResponseBuilder,
    RecordedQuery,
};
pub use self::tokio_postgres::{PgResult, TokioPostgresDriver};
