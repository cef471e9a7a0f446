// Copyright 2026 RDS Harvester Contributors
// SPDX-License-Identifier: Apache-2.0

//! RDS harvester library: bulk retrieval of conformity declarations from
//! the `pub.fsa.gov.ru` registry, contact enrichment from rendered detail
//! pages, and spreadsheet export.
//!
//! The binary in `main.rs` is a thin clap front-end over [`cli`]; everything
//! else is exposed here for integration testing.

#![allow(clippy::new_without_default)]

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod pool;
pub mod renderer;
pub mod session;
