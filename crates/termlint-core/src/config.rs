//! Layered settings for matching runs.
//!
//! Sources are merged with figment, later layers winning key by key:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. the user file, `config.<ext>` in the platform config dir
//!    (`~/.config/termlint/` on Linux)
//! 3. project files from the nearest directory, walking up from the search
//!    root, that holds any of `.terms.<ext>`, `terms.<ext>`,
//!    `.termlint.<ext>`, `termlint.<ext>` (listed low to high); the walk
//!    stops at the directory holding `.git`
//! 4. files passed to [`ConfigLoader::with_file`], in call order
//! 5. `TERMLINT_*` environment variables
//!
//! `<ext>` is `toml`, `yaml`, `yml` or `json`. Within one stem, the
//! extensions merge in that order.
//!
//! ```no_run
//! use camino::Utf8PathBuf;
//! use termlint_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let here = Utf8PathBuf::try_from(std::env::current_dir()?)?;
//! let (config, sources) = ConfigLoader::new().with_project_search(&here).load()?;
//! println!(
//!     "semantic threshold {} from {:?}",
//!     config.semantic_threshold,
//!     sources.primary_file()
//! );
//! # Ok(())
//! # }
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::embedding::DEFAULT_CACHE_CAPACITY;
use crate::error::{ConfigError, ConfigResult};
use crate::matcher::{
    DEFAULT_LEXICAL_THRESHOLD, DEFAULT_MAX_NGRAM_SIZE, DEFAULT_SEMANTIC_THRESHOLD, FailurePolicy,
    MatchConfig,
};

/// Effective termlint settings.
///
/// Every key is optional in files; absent keys keep their default.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base verbosity when neither `RUST_LOG` nor `-q`/`-v` is given.
    pub log_level: LogLevel,
    /// Where JSON log files go. Unset means the platform data dir.
    pub log_dir: Option<Utf8PathBuf>,
    /// Exclusive upper bound on candidate span length.
    pub max_ngram_size: usize,
    /// Coarse pass: spans must score strictly above this.
    pub lexical_threshold: f32,
    /// Fine pass: candidates must score strictly above this.
    pub semantic_threshold: f32,
    /// Default reference phrase list.
    pub phrases: Option<Utf8PathBuf>,
    /// Per-pair service failure handling (`skip` or `abort`).
    pub on_service_error: FailurePolicy,
    /// Matching worker threads; 0 runs sequentially.
    pub workers: usize,
    /// Number of texts whose embeddings are memoized.
    pub embedding_cache_capacity: u64,
    /// Largest document `suggest` will read. Unset means 5 MiB.
    pub max_input_bytes: Option<usize>,
    /// Read documents of any size; overrides `max_input_bytes`.
    pub disable_input_limit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            max_ngram_size: DEFAULT_MAX_NGRAM_SIZE,
            lexical_threshold: DEFAULT_LEXICAL_THRESHOLD,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            phrases: None,
            on_service_error: FailurePolicy::default(),
            workers: 0,
            embedding_cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_input_bytes: None,
            disable_input_limit: false,
        }
    }
}

impl Config {
    /// Matching options carried by this config. Validation happens when the
    /// matcher is built.
    pub const fn match_config(&self) -> MatchConfig {
        MatchConfig {
            max_ngram_size: self.max_ngram_size,
            lexical_threshold: self.lexical_threshold,
            semantic_threshold: self.semantic_threshold,
            on_service_error: self.on_service_error,
            workers: self.workers,
        }
    }

    /// Effective input size limit, `None` when disabled.
    pub fn input_limit(&self) -> Option<usize> {
        if self.disable_input_limit {
            None
        } else {
            Some(
                self.max_input_bytes
                    .unwrap_or(crate::DEFAULT_MAX_INPUT_BYTES),
            )
        }
    }
}

/// Configured verbosity.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-stage matching detail.
    Debug,
    /// Run summaries.
    #[default]
    Info,
    /// Skipped pairs and other degraded results.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Filter directive for this level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Files that fed a [`Config`], so `info` can show them without a second
/// discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    /// Project files from the winning directory, lowest precedence first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_files: Vec<Utf8PathBuf>,
    /// The user-level file, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_file: Option<Utf8PathBuf>,
    /// Files named on the command line.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigSources {
    /// The file whose values won last: explicit, then project, then user.
    pub fn primary_file(&self) -> Option<&Utf8Path> {
        self.explicit_files
            .last()
            .or_else(|| self.project_files.last())
            .map(Utf8PathBuf::as_path)
            .or(self.user_file.as_deref())
    }
}

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

const APP_NAME: &str = "termlint";

/// Project file stems, lowest precedence first.
const APP_NAMES: &[&str] = &["terms", "termlint"];

const ENV_PREFIX: &str = "TERMLINT_";

/// Collects config sources and merges them into a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search_root: Option<Utf8PathBuf>,
    user_config: bool,
    boundary: Option<String>,
    files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// A loader that reads the user file and stops project search at `.git`.
    pub fn new() -> Self {
        Self {
            search_root: None,
            user_config: true,
            boundary: Some(".git".to_string()),
            files: Vec::new(),
        }
    }

    /// Look for project files starting at `dir` and moving up.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.search_root = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Toggle the user-level file.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.user_config = include;
        self
    }

    /// Stop the upward walk at a directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary = Some(marker.into());
        self
    }

    /// Walk up to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary = None;
        self
    }

    /// Layer `path` above every discovered file. Later calls win.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Merge every source and deserialize the result.
    #[tracing::instrument(skip(self), fields(search_root = ?self.search_root))]
    pub fn load(self) -> ConfigResult<(Config, ConfigSources)> {
        let sources = ConfigSources {
            user_file: self.user_config.then(find_user_config).flatten(),
            project_files: self
                .search_root
                .as_deref()
                .map(|root| self.find_project_configs(root))
                .unwrap_or_default(),
            explicit_files: self.files,
        };

        let figment = sources
            .user_file
            .iter()
            .chain(&sources.project_files)
            .chain(&sources.explicit_files)
            .fold(
                Figment::new().merge(Serialized::defaults(Config::default())),
                |figment, path| merge_file(figment, path),
            )
            // TERMLINT_SEMANTIC_THRESHOLD=0.85, TERMLINT_WORKERS=4, ...
            .merge(Env::prefixed(ENV_PREFIX).lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            files = sources.project_files.len() + sources.explicit_files.len(),
            max_ngram_size = config.max_ngram_size,
            lexical_threshold = config.lexical_threshold,
            semantic_threshold = config.semantic_threshold,
            on_service_error = config.on_service_error.as_str(),
            "settings resolved"
        );
        Ok((config, sources))
    }

    /// Files from the nearest directory that has any, lowest precedence
    /// first: `terms` before `termlint`, dotfile before plain name.
    fn find_project_configs(&self, start: &Utf8Path) -> Vec<Utf8PathBuf> {
        for dir in start.ancestors() {
            let found: Vec<Utf8PathBuf> = APP_NAMES
                .iter()
                .flat_map(|name| [format!(".{name}"), (*name).to_string()])
                .flat_map(|stem| {
                    CONFIG_EXTENSIONS
                        .iter()
                        .map(move |ext| dir.join(format!("{stem}.{ext}")))
                })
                .filter(|candidate| candidate.is_file())
                .collect();
            if !found.is_empty() {
                return found;
            }

            // A file beside the marker still counts, so check after the scan.
            let at_boundary = self
                .boundary
                .as_deref()
                .is_some_and(|marker| dir.join(marker).exists());
            if at_boundary && dir != start {
                break;
            }
        }
        Vec::new()
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Platform config dir for termlint, e.g. `~/.config/termlint`.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(project_dirs()?.config_dir().to_path_buf()).ok()
}

/// Machine-local data dir, the default home of log files
/// (`~/.local/share/termlint` on Linux).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(project_dirs()?.data_local_dir().to_path_buf()).ok()
}
