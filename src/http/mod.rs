//! HTTP surface: routes, shared state, error mapping, server loop

pub mod state;
pub mod responses;
pub mod routes;
pub mod server;

pub use state::*;
pub use responses::*;
pub use routes::*;
pub use server::*;
