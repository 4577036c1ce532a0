//! Dolt row-store adapter.

pub mod client;
pub mod parser;

pub use client::DoltStore;
