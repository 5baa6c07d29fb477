// ABOUTME: Configuration module root
// ABOUTME: Environment-only configuration; there are no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

/// Environment variable parsing into `ServerConfig`
pub mod environment;
