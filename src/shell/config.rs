use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::parser::shell_error::ShellErrorKind;

const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "history.txt";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial state of `STATUS`
    pub report_status: bool,
    /// Persist interactive history between sessions
    pub history: bool,
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_status: false,
            history: true,
            history_file: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "techsh")
}

impl Config {
    /// Loads `path`, or the per-user config file when no path is given.
    ///
    /// A file that does not exist yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ShellErrorKind> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
                None => return Ok(Config::default()),
            },
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file");
                return Ok(Config::default());
            }
            Err(err) => return Err(ShellErrorKind::Io(Some(path), err)),
        };

        let config = Config::parse(&text).map_err(|err| ShellErrorKind::Config(path.clone(), err))?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config, String> {
        toml::from_str(text).map_err(|err| err.message().to_string())
    }

    /// Where interactive history lives, `None` when it is not kept
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history {
            return None;
        }
        self.history_file
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(HISTORY_FILE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::parse(
            r#"
            report_status = true
            history = false
            "#,
        )
        .unwrap();
        assert!(config.report_status);
        assert_eq!(config.history_path(), None);
    }

    #[test]
    fn history_file_override() {
        let config = Config::parse(r#"history_file = "/tmp/techsh-history""#).unwrap();
        assert_eq!(
            config.history_path(),
            Some(PathBuf::from("/tmp/techsh-history"))
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("report_status = 3").is_err());
        assert!(Config::parse("colour = \"red\"").is_err());
    }

    #[test]
    fn load_reads_a_file_and_tolerates_a_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load(Some(&path)).unwrap(), Config::default());

        fs::write(&path, "report_status = true").unwrap();
        assert!(Config::load(Some(&path)).unwrap().report_status);

        fs::write(&path, "report_status = [").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ShellErrorKind::Config(..))
        ));
    }
}
