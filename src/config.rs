use {
    anyhow::Context as _,
    directories::ProjectDirs,
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

/// Defaults saved between runs. Command line flags take precedence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where fixtures are written when no directory is given
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub include_inert: bool,
    #[serde(default = "default_max_elements")]
    pub dump_max_elements: usize,
}

const fn default_max_elements() -> usize {
    32
}

impl Default for Config {
    fn default() -> Self {
        Self {
            out_dir: None,
            include_inert: false,
            dump_max_elements: default_max_elements(),
        }
    }
}

pub struct LoadedConfig {
    pub config: Config,
    /// If `Some`, saving this config file will overwrite an old one that couldn't be loaded
    pub old_config_err: Option<anyhow::Error>,
}

impl Config {
    pub fn load_or_default() -> anyhow::Result<LoadedConfig> {
        let proj_dirs = project_dirs().context("Failed to get project dirs")?;
        Ok(Self::load_or_default_from(proj_dirs.config_dir()))
    }

    fn load_or_default_from(cfg_dir: &Path) -> LoadedConfig {
        let cfg_file = cfg_dir.join(FILENAME);
        if !cfg_file.exists() {
            return LoadedConfig {
                config: Self::default(),
                old_config_err: None,
            };
        }
        let result = std::fs::read(&cfg_file)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(rmp_serde::from_slice(&bytes)?));
        match result {
            Ok(cfg) => LoadedConfig {
                config: cfg,
                old_config_err: None,
            },
            Err(e) => LoadedConfig {
                config: Self::default(),
                old_config_err: Some(e),
            },
        }
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let proj_dirs = project_dirs().context("Failed to get project dirs")?;
        self.save_to(proj_dirs.config_dir())
    }

    fn save_to(&self, cfg_dir: &Path) -> anyhow::Result<PathBuf> {
        let bytes = rmp_serde::to_vec(self)?;
        std::fs::create_dir_all(cfg_dir)
            .with_context(|| format!("Failed to create {}", cfg_dir.display()))?;
        let path = cfg_dir.join(FILENAME);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "jso-fixtures")
}

const FILENAME: &str = "jso-fixtures.cfg";

#[test]
#[allow(clippy::unwrap_used)]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("nested");
    let loaded = Config::load_or_default_from(&cfg_dir);
    assert_eq!(loaded.config, Config::default());
    assert!(loaded.old_config_err.is_none());
    let cfg = Config {
        out_dir: Some("fixtures".into()),
        include_inert: true,
        dump_max_elements: 4,
    };
    let path = cfg.save_to(&cfg_dir).unwrap();
    assert!(path.ends_with(FILENAME));
    assert_eq!(Config::load_or_default_from(&cfg_dir).config, cfg);
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_corrupt_config_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(FILENAME), b"\xC1 not msgpack").unwrap();
    let loaded = Config::load_or_default_from(dir.path());
    assert_eq!(loaded.config, Config::default());
    assert!(loaded.old_config_err.is_some());
}
