// ABOUTME: Re-exports cursor pagination types from nora-core
// ABOUTME: Used by list endpoints that page newest-first by creation time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

pub use nora_core::pagination::*;
