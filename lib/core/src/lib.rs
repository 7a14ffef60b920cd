//! Core domain types and utilities for the storefront client.
//!
//! This crate provides the foundational types and error handling shared by
//! the authentication library and the command-line front end.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
