pub mod client;
pub mod mock;

pub use client::{InvokeConfig, LambdaInvoker};
pub use mock::{MockInvoker, MockOutcome};
