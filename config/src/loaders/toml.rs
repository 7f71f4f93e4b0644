//! Load the configuration from a file or a `String` written in [Toml format](https://en.wikipedia.org/wiki/TOML)

use std::{fs, path::Path};

use crate::config::{Config, Error};

/// Load configuration from a file written in Toml format.
pub fn from_file<S: AsRef<Path>>(file: S) -> Result<Config, Error> {
    let f = file.as_ref();

    log::debug!("Loading config from `{}`", f.to_string_lossy());

    let contents = fs::read_to_string(f)?;

    from_str(&contents)
}

/// Load configuration from a string written in Toml format.
pub fn from_str(contents: &str) -> Result<Config, Error> {
    Ok(toml::from_str(contents)?)
}
