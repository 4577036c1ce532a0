//! Git tree-store adapter.

pub mod client;

pub use client::GitStore;
