//! HTTP interface to the registration engine.

pub mod server;

pub use server::*;
