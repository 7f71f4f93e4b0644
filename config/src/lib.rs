//! Configuration of the transaction auditor client
//!
//! The [`Config`](config::Config) struct can be loaded from a TOML file
//! (see [loaders::toml]) or from environment variables prefixed with
//! `AUDITOR_` (see [loaders::env]).

#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(missing_docs)]

pub mod config;
pub mod defaults;
pub mod dirs;
pub mod loaders;

pub use crate::config::{Config, Error, Log, Network};
