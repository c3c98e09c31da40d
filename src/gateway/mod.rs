//! Gateway module - Backends, round-robin dispatch, relaying, and liveness probing

pub mod backend;
pub mod dispatcher;
pub mod health_check;
pub mod relay;
pub mod server;

pub use backend::Backend;
pub use dispatcher::Dispatcher;
pub use relay::HttpRelay;
