//! Configuration: spacecraft/downlink selection, I/O paths, ignored channels.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Spacecraft {
    Gk2a,
}

impl Spacecraft {
    pub fn as_str(&self) -> &'static str {
        match self {
            Spacecraft::Gk2a => "GK-2A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Downlink {
    Lrit,
    Hrit,
}

impl Downlink {
    pub fn as_str(&self) -> &'static str {
        match self {
            Downlink::Lrit => "LRIT",
            Downlink::Hrit => "HRIT",
        }
    }

    /// Bits per second, used to derive the demux core's idle-sleep period
    /// (spec.md §4.4, §5).
    pub fn bitrate(&self) -> u64 {
        match self {
            Downlink::Lrit => 65_536,
            Downlink::Hrit => 3_072_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Tcp,
    Nng,
    Udp,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemuxConfig {
    pub spacecraft: Spacecraft,
    pub downlink: Downlink,
    pub source: SourceKind,
    /// Host:port for TCP/nanomsg/UDP sources, or a file path for file replay.
    pub input: String,
    pub output: PathBuf,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub dump_file: Option<PathBuf>,
    #[serde(default)]
    pub save_xrit: bool,
    #[serde(default = "default_true")]
    pub save_images: bool,
    #[serde(default)]
    pub ignored_vcids: HashSet<u8>,
    #[serde(default)]
    pub verbose: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DemuxConfig {
    fn default() -> Self {
        DemuxConfig {
            spacecraft: Spacecraft::Gk2a,
            downlink: Downlink::Lrit,
            source: SourceKind::Tcp,
            input: "127.0.0.1:9999".to_string(),
            output: PathBuf::from("output"),
            key_file: None,
            dump_file: None,
            save_xrit: false,
            save_images: true,
            ignored_vcids: HashSet::new(),
            verbose: false,
        }
    }
}

impl DemuxConfig {
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "gk2a-xrit", "gk2a-xrit")
            .context("could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from `path`, or the platform default location if
    /// `path` is `None`. A missing file is a fatal configuration error
    /// (spec.md §7) — unlike the key table, there is no sensible default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let content = fs::read_to_string(&resolved)
            .with_context(|| format!("failed to read config file {}", resolved.display()))?;
        toml::from_str(&content).context("failed to parse config file")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, content).context("failed to write config file")
    }
}
