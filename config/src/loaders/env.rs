//! Load the configuration from environment variables prefixed with `AUDITOR_`

use serde::{de::Error as _, Deserialize, Deserializer};
use std::cell::Cell;

use crate::{
    config::{Config, Error},
    defaults::ENV_PREFIX,
};

/// Load configuration from environment variables
pub fn from_env() -> Result<Config, Error> {
    from_iter(std::env::vars())
}

/// Load configuration from an iterator of key-value pairs, as if they were environment variables
pub fn from_iter<I>(vars: I) -> Result<Config, Error>
where
    I: IntoIterator<Item = (String, String)>,
{
    USING_ENVY.with(|x| x.set(true));
    let res = envy::prefixed(ENV_PREFIX).from_iter(vars);
    USING_ENVY.with(|x| x.set(false));

    Ok(res?)
}

thread_local! {
    /// Thread-local flag to indicate the `nested_toml_if_using_envy` function that we are indeed
    /// using envy.
    static USING_ENVY: Cell<bool> = const { Cell::new(false) };
}

/// If using the `envy` crate to deserialize this value, try to deserialize it as a TOML string.
/// If using any other deserializer, deserialize the value as usual.
///
/// The thread-local variable `USING_ENVY` is used to detect which deserializer is currently being
/// used.
pub(crate) fn nested_toml_if_using_envy<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    if USING_ENVY.with(|x| x.get()) {
        // envy only supports deserializing strings, so the nested table arrives as an owned
        // string and is parsed again as TOML
        let string_toml = String::deserialize(deserializer)?;

        toml::from_str(&string_toml).map_err(D::Error::custom)
    } else {
        T::deserialize(deserializer)
    }
}
