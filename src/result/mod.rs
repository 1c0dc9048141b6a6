mod state;

pub use state::{FetchPlan, Phase, ResultState, StatementKind};
