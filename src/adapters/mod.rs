//! Adapters Layer - concrete implementations of the ports.

pub mod cli;
pub mod http;
pub mod memory;
