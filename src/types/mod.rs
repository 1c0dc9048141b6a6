mod binding;
mod column;
mod row;
mod sql_value;

pub use binding::{BindingSet, BindingSetBuilder};
pub use column::{ColumnDescriptor, HostType};
pub use row::{Row, RowBatch};
pub use sql_value::SqlValue;
