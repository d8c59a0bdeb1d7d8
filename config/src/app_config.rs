use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env,
    path::PathBuf,
};
use strum::{
    Display,
    EnumIter,
};

/// Directories resolved before the configuration files are read.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub(crate) enum Directory {
    /// Log file and default export location.
    Data,
    /// `config.yaml`.
    Config,
}

lazy_static::lazy_static! {
    pub(crate) static ref PROJECT_NAME: String = "LEDGER_TELEMETRY".to_string();
    static ref PROJECT_DIRS: Option<ProjectDirs> = ProjectDirs::from("io", "ledger", "ledger-telemetry");
}

impl Directory {
    /// `LEDGER_TELEMETRY_DATA` or `LEDGER_TELEMETRY_CONFIG`.
    pub(crate) fn env_var(self) -> String {
        format!("{}_{self}", PROJECT_NAME.as_str())
    }

    fn resolve(self) -> PathBuf {
        if let Some(dir) = env::var_os(self.env_var()) {
            return PathBuf::from(dir);
        }
        match (self, PROJECT_DIRS.as_ref()) {
            (Directory::Data, Some(dirs)) => dirs.data_local_dir().to_path_buf(),
            (Directory::Config, Some(dirs)) => dirs.config_local_dir().to_path_buf(),
            (Directory::Data, None) => PathBuf::from(".").join(".data"),
            (Directory::Config, None) => PathBuf::from(".").join(".config"),
        }
    }
}

pub fn get_data_dir() -> PathBuf {
    Directory::Data.resolve()
}

pub fn get_config_dir() -> PathBuf {
    Directory::Config.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator as _;

    #[test]
    fn override_variables_share_the_config_prefix() {
        let vars = Directory::iter().map(Directory::env_var).collect::<Vec<_>>();
        assert_eq!(vars, vec!["LEDGER_TELEMETRY_DATA", "LEDGER_TELEMETRY_CONFIG"]);
    }
}
