// ABOUTME: Core types and constants for the Nora Health API
// ABOUTME: Foundation crate with error handling, pagination, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![deny(unsafe_code)]

//! # Nora Core
//!
//! Foundation crate shared by the Nora Health server and its tools. It changes
//! rarely, which keeps incremental builds of the main crate fast.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Application-wide constants organized by domain
//! - **pagination**: Cursor-based pagination for list endpoints

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Cursor-based pagination for efficient data traversal
pub mod pagination;
