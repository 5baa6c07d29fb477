// ABOUTME: Re-exports the unified error types from nora-core
// ABOUTME: Keeps `crate::errors` paths stable for the rest of the server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

pub use nora_core::errors::*;
