mod dispatcher;
mod selector;

pub use dispatcher::{DispatchReport, OutcomeDispatcher};
pub use selector::{FirstSelector, TokenSelector, UniformSelector};
