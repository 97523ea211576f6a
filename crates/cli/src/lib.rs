//! liquidfn CLI
//!
//! Shopify-backed collaborators for the liquidfn harness and the pieces of
//! the `liquidfn` binary worth testing in isolation.

pub mod assets;
pub mod client;
pub mod config;
pub mod fetch;
pub mod output;
