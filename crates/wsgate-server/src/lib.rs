pub mod connection;
pub mod forwarder;
pub mod registry;
pub mod server;

pub use forwarder::{extract_reply, EventForwarder, RouteTable};
pub use registry::{Connection, ConnectionRegistry};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
