//! Configuration loaders

pub mod env;
pub mod toml;
