// src/lib.rs

//! Tenable plugin crawler library.
//!
//! Discovers Nessus plugin identifiers from the bulk feed or the search API,
//! resolves each through the detail API, and upserts the records into a
//! store keyed by `script_id`.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
