use std::fmt;

/// The host-side type a backend column is mapped to when fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    Text,
    Int32,
    Int64,
    Float64,
    Bool,
    Bytes,
    /// The backend type has no mapping; values are fetched as text.
    Unknown,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostType::Text => "text",
            HostType::Int32 => "int32",
            HostType::Int64 => "int64",
            HostType::Float64 => "float64",
            HostType::Bool => "bool",
            HostType::Bytes => "bytes",
            HostType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Describes one output field of a result, in result order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Field name as reported by the backend
    pub name: String,
    /// Backend type name, e.g. `int4` or `varchar`
    pub backend_type: String,
    /// Type the values are mapped to on fetch
    pub host_type: HostType,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        backend_type: impl Into<String>,
        host_type: HostType,
        nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            backend_type: backend_type.into(),
            host_type,
            nullable,
        }
    }
}
