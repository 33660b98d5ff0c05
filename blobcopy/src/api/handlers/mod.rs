//! HTTP request handlers.
//!
//! - [`copy`]: starts a server-side blob copy into a destination storage account
//!
//! Handlers return [`crate::errors::Result`], which converts failures into plain-text
//! responses with the appropriate status code.

pub mod copy;
