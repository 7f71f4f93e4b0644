//! Platform-specific application paths.

use std::env;
use std::path::PathBuf;

use crate::defaults::CONFIG_FILE_NAME;

/// Find a configuration from standard paths.
///
/// In GNU/Linux:
///     current directory | $XDG_CONFIG_HOME/auditor | /etc/auditor
///
/// In MacOS:
///     current directory | $HOME/Library/Preferences/io.witnet.auditor
///
/// In Windows:
///     current directory | C:\Users\Alice\AppData\Roaming\witnet\auditor
pub fn find_config() -> Option<PathBuf> {
    let mut config_dirs = Vec::with_capacity(3);

    if let Ok(dir) = env::current_dir() {
        config_dirs.push(dir);
    }

    if let Some(dir) = directories_next::ProjectDirs::from("io", "witnet", "auditor") {
        config_dirs.push(dir.config_dir().into());
    }

    if cfg!(unix) {
        config_dirs.push("/etc/auditor".into());
    }

    config_dirs
        .into_iter()
        .map(|path| path.join(CONFIG_FILE_NAME))
        .find(|path| path.exists())
}
