// src/lib.rs

//! regwatch: change detection for regulatory web pages and PDFs.

pub mod cache;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod signature;
