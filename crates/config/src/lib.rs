//! Layered configuration.
//!
//! Values are merged in order (later overrides earlier):
//! 1. Built-in defaults.
//! 2. A configuration file: the one passed explicitly, or
//!    `<config dir>/scripture/config.toml` if it exists. TOML, YAML and JSON
//!    are accepted, chosen by file extension.
//! 3. Environment variables prefixed with `SCRIPTURE_`, with `__` separating
//!    nested keys (`SCRIPTURE_CACHE__CAPACITY=64`).
//!
//! # Example
//!
//! ```toml
//! [corpus]
//! path = "/usr/share/scripture/kjv.sqlite"
//! verify_integrity = true
//!
//! [cache]
//! capacity = 32          # Chapters kept in memory
//!
//! [search]
//! max_results = 200
//! min_query_length = 3
//!
//! [preload]
//! chapters = ["Genesis 1", "John 3"]
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use scripture_corpus::ChapterRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SCRIPTURE_";
const CORPUS_FILE_NAME: &str = "bible.sqlite";
const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "scripture")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Location of the bundled SQLite asset.
    pub path: PathBuf,
    /// Run `PRAGMA quick_check` when opening the asset.
    pub verify_integrity: bool,
}
impl Default for CorpusConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join(CORPUS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CORPUS_FILE_NAME));
        Self { path, verify_integrity: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of chapters kept in memory.
    pub capacity: usize,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub min_query_length: usize,
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 200, min_query_length: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Chapters loaded into the cache ahead of time, as `"<book> <chapter>"`.
    pub chapters: Vec<String>,
}
impl Default for PreloadConfig {
    fn default() -> Self {
        Self { chapters: vec!["genesis 1".to_string()] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub preload: PreloadConfig,
}

impl Config {
    /// The per-user configuration file, whether or not it exists.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Build the provider stack without extracting it.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `file`, or from [`default_file`](Self::default_file)
    /// when it is `None` (a missing default file is not an error).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|path| path.is_file()),
        };
        tracing::debug!(file = ?file, "Loading configuration");
        Self::from_figment(&Self::figment(file.as_deref()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            exn::bail!(ErrorKind::Invalid("cache.capacity must be greater than zero".to_string()));
        }
        if self.search.max_results == 0 {
            exn::bail!(ErrorKind::Invalid("search.max_results must be greater than zero".to_string()));
        }
        self.preload_chapters()?;
        Ok(())
    }

    /// Parsed [`PreloadConfig::chapters`].
    pub fn preload_chapters(&self) -> Result<Vec<ChapterRef>> {
        self.preload
            .chapters
            .iter()
            .map(|chapter| {
                chapter.parse::<ChapterRef>().map_err(|err| {
                    err.raise(ErrorKind::Invalid(format!("preload.chapters: not a chapter reference: {chapter:?}")))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use scripture_corpus::BookId;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.capacity, 32);
        assert_eq!(config.search.max_results, 200);
        assert_eq!(config.search.min_query_length, 3);
        assert!(config.corpus.verify_integrity);
        assert_eq!(config.corpus.path.file_name().unwrap(), CORPUS_FILE_NAME);
        let preload = config.preload_chapters().unwrap();
        assert_eq!(preload, vec![ChapterRef::new(BookId::parse("genesis").unwrap(), 1)]);
    }

    #[test]
    fn test_file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "scripture.toml",
                r#"
                    [cache]
                    capacity = 8

                    [preload]
                    chapters = ["John 3", "1 John 4"]
                "#,
            )?;
            jail.set_env("SCRIPTURE_SEARCH__MIN_QUERY_LENGTH", "4");
            jail.set_env("SCRIPTURE_CORPUS__PATH", "/srv/kjv.sqlite");
            let config = Config::load(Some(Path::new("scripture.toml"))).map_err(|err| (*err).to_string())?;
            assert_eq!(config.cache.capacity, 8);
            assert_eq!(config.search.min_query_length, 4);
            assert_eq!(config.corpus.path, PathBuf::from("/srv/kjv.sqlite"));
            assert_eq!(config.preload_chapters().map_err(|err| (*err).to_string())?.len(), 2);
            // Untouched keys keep their defaults.
            assert_eq!(config.search.max_results, 200);
            assert!(config.corpus.verify_integrity);
            Ok(())
        });
    }

    #[rstest]
    #[case("scripture.yaml", "search:\n  max_results: 5\n")]
    #[case("scripture.json", r#"{"search": {"max_results": 5}}"#)]
    #[case("scripture.toml", "[search]\nmax_results = 5\n")]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::from_figment(&Config::figment(Some(&path))).unwrap();
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::FileNotFound(path));
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripture.toml");
        std::fs::write(&path, "[cache]\ncapacity = \"lots\"\n").unwrap();
        let err = Config::from_figment(&Config::figment(Some(&path))).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[rstest]
    #[case("[cache]\ncapacity = 0\n")]
    #[case("[search]\nmax_results = 0\n")]
    #[case("[preload]\nchapters = [\"Hezekiah 1\"]\n")]
    #[case("[preload]\nchapters = [\"Genesis\"]\n")]
    #[case("[preload]\nchapters = [\"Genesis 0\"]\n")]
    fn test_invalid_values(#[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripture.toml");
        std::fs::write(&path, contents).unwrap();
        let err = Config::from_figment(&Config::figment(Some(&path))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }
}
