mod driver;
mod result;
mod validity;

pub use driver::DatabaseDriver;
pub use result::ResultHandle;
pub use validity::Validity;
