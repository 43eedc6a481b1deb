// HTTP surface over the duplicate-resolution operations.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
