//! HTTP API surface: request/response models and the route handlers that use them.

pub mod handlers;
pub mod models;
