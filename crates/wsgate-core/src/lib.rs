pub mod envelope;
pub mod errors;
pub mod frames;
pub mod ids;
pub mod invoke;

pub use ids::ConnectionId;
pub use invoke::{InvokeOutput, Invoker};
