// src/lib.rs

//! release-watch: catalog listing poller library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
