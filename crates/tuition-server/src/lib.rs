//! Tuition Server library.
//!
//! This crate provides the request-serving side of the tuition backend:
//! credential checks, access policy enforcement, model reads and writes,
//! custom operation dispatch, and the line-delimited JSON transport.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod functions;
pub mod handler;
pub mod mutation;
pub mod query;
pub mod request;
pub mod transport;

pub use config::{Args, Command, ServerConfig};
pub use database::{Database, SharedDatabase};
pub use error::Error;
pub use handler::RequestHandler;
pub use mutation::MutationExecutor;
pub use query::{ListPage, QueryExecutor};
pub use request::{Operation, Request, Response};
pub use transport::{stdio, StdioTransport};
