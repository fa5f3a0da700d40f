//! Core domain types, errors, and constants for the `trackdash` application.
//!
//! This crate establishes the foundational data structures and error handling
//! mechanisms used throughout the codebase.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing all possible failure modes for predictable error handling.
//! - **`types`**: Contains the domain data structures like [`ReportRow`] and
//!   [`FetchResult`] shared between the report client and the cache layer.
//! - **`constants`**: Shared static constants such as environment variable
//!   names, upstream endpoint paths, and cache defaults.
//! - **`diagnostics`**: A non-blocking event channel for soft failures that
//!   are logged but must never fail the parent operation.
//! - **`retry`**: The shared retry policy with exponential backoff and jitter.

pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod retry;
pub mod types;

pub use self::{
    constants::*,
    diagnostics::{DiagnosticEvent, Diagnostics},
    errors::{EndpointAttempt, Error, NetworkErrorKind, Result},
    retry::{retry, RetryPolicy},
    types::*,
};
