//! Engine configuration from `kiln.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── module     # [[pipeline]] and module kinds
//! ├── section    # [build], [watch]
//! └── mod.rs     # EngineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                         |
//! |----------------|-------------------------------------------------|
//! | `[build]`      | Input/output folders, clean and cache switches  |
//! | `[watch]`      | Debounce of watch-triggered runs                |
//! | `[meta]`       | Initial metadata of fresh documents             |
//! | `[[pipeline]]` | Named, ordered module lists                     |

mod error;
mod module;
mod section;

pub use error::ConfigError;
pub use module::{ModuleSpec, PipelineSpec, default_pipelines};
pub use section::{BuildSection, WatchSection};

use crate::cli::RunArgs;
use crate::document::{Fingerprint, Metadata};
use crate::log;
use crate::utils::path::normalize_path;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file name looked up in the root folder.
pub const DEFAULT_CONFIG: &str = "kiln.toml";

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Absolute path of the config file, whether or not it exists
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Root folder; relative paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,

    /// Hash of the config file content, `None` when defaults are in use
    #[serde(skip)]
    pub source_hash: Option<Fingerprint>,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub meta: Metadata,

    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineSpec>,
}

impl EngineConfig {
    /// Load configuration for a run from CLI arguments.
    ///
    /// A missing config file is not an error: the built-in pipelines are used.
    pub fn load(args: &RunArgs) -> Result<Self, ConfigError> {
        let (root, config_path) = Self::resolve_paths(args)?;

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            log!("config"; "no {} found, using the default pipelines", display_name(&config_path));
            Self::default()
        };

        if config.source_hash.is_none() || config.pipelines.is_empty() {
            config.pipelines = default_pipelines();
        }

        config.root = root;
        config.config_path = config_path;
        config.apply_args(args);
        config.normalize_paths();
        Ok(config)
    }

    /// Resolve the root folder and config path from the positional argument.
    ///
    /// A positional argument naming a file makes that file the config and
    /// its folder the root.
    fn resolve_paths(args: &RunArgs) -> Result<(PathBuf, PathBuf), ConfigError> {
        let cwd = std::env::current_dir().map_err(|err| ConfigError::Io(PathBuf::from("."), err))?;
        let root = args.root.as_ref().map_or_else(|| cwd.clone(), |root| cwd.join(root));

        if root.is_file() {
            if args.config.is_some() {
                return Err(ConfigError::Validation(format!(
                    "`{}` is a config file, `--config` cannot be given as well",
                    root.display()
                )));
            }
            let config_path = normalize_path(&root);
            let root = config_path.parent().map(Path::to_path_buf).unwrap_or(cwd);
            return Ok((root, config_path));
        }

        if !root.is_dir() {
            return Err(ConfigError::MissingRoot(root));
        }

        let root = normalize_path(&root);
        let config = args.config.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG));
        Ok((root.clone(), root.join(config)))
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.source_hash = Some(Fingerprint::of(content));
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.source_hash = Some(Fingerprint::of(&content));
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        log!("warning"; "unknown fields in {}, ignoring:", display_name(path));
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Hash of a config file's current content, `None` if it cannot be read.
    ///
    /// Watch mode compares this against `source_hash` so that touching the
    /// file without changing it does not rebuild the engine.
    pub fn file_hash(path: &Path) -> Option<Fingerprint> {
        fs::read(path).ok().map(Fingerprint::of)
    }

    /// CLI flags override file values.
    fn apply_args(&mut self, args: &RunArgs) {
        Self::update_option(&mut self.build.input, args.input.as_ref());
        Self::update_option(&mut self.build.output, args.output.as_ref());
        if args.no_clean {
            self.build.clean = false;
        }
        if args.no_cache {
            self.build.cache = false;
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make input and output absolute, relative to the root.
    fn normalize_paths(&mut self) {
        self.build.input = normalize_path(&self.root.join(&self.build.input));
        self.build.output = normalize_path(&self.root.join(&self.build.output));
    }

    /// Check everything that can be checked before any module runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // cleaning the output folder must never reach the sources
        if self.build.input.starts_with(&self.build.output) {
            return Err(ConfigError::Validation(format!(
                "output folder `{}` contains the input folder",
                self.build.output.display()
            )));
        }

        let mut earlier = FxHashSet::default();
        for pipeline in &self.pipelines {
            if pipeline.name.trim().is_empty() {
                return Err(ConfigError::Validation("pipeline name must not be empty".into()));
            }
            if earlier.contains(pipeline.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate pipeline `{}`",
                    pipeline.name
                )));
            }
            check_modules(&pipeline.name, &pipeline.modules, &earlier)?;
            earlier.insert(pipeline.name.as_str());
        }
        Ok(())
    }
}

/// `documents` may only refer to earlier pipelines and earlier stages.
fn check_modules(
    pipeline: &str,
    modules: &[ModuleSpec],
    earlier: &FxHashSet<&str>,
) -> Result<(), ConfigError> {
    for (index, module) in modules.iter().enumerate() {
        match module {
            ModuleSpec::Documents {
                pipeline: Some(name),
                ..
            } if !earlier.contains(name.as_str()) => {
                return Err(ConfigError::Validation(format!(
                    "pipeline `{pipeline}`: `documents` refers to `{name}`, which does not run before it"
                )));
            }
            ModuleSpec::Documents {
                stage: Some(stage), ..
            } if *stage >= index => {
                return Err(ConfigError::Validation(format!(
                    "pipeline `{pipeline}`: `documents` at stage {index} refers to stage {stage}, which has not completed"
                )));
            }
            ModuleSpec::Concat { modules } => check_modules(pipeline, modules, earlier)?,
            _ => {}
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
        .into_owned()
}

/// Parse a config string in tests, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> EngineConfig {
    let (parsed, ignored) = EngineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args_for(root: &Path) -> RunArgs {
        RunArgs {
            root: Some(root.to_path_buf()),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.input, PathBuf::from("input"));
        assert_eq!(config.build.output, PathBuf::from("output"));
        assert!(config.build.clean);
        assert!(config.build.cache);
        assert_eq!(config.watch.debounce_ms, 300);
        assert!(config.pipelines.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = test_parse_config(
            r#"
            [build]
            input = "src"
            output = "public"
            clean = false

            [watch]
            debounce_ms = 50

            [meta]
            site = "kiln"

            [[pipeline]]
            name = "pages"
            modules = [{ kind = "read", pattern = "*.md" }, { kind = "markdown" }]
            "#,
        );
        assert_eq!(config.build.input, PathBuf::from("src"));
        assert!(!config.build.clean);
        assert_eq!(config.watch.debounce().as_millis(), 50);
        assert_eq!(config.meta.get("site"), Some(&json!("kiln")));
        assert_eq!(config.pipelines.len(), 1);
        assert_eq!(config.pipelines[0].modules.len(), 2);
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let (_, ignored) =
            EngineConfig::parse_with_ignored("[build]\nminify = true\n[serve]\nport = 1").unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains(&"build.minify".to_string()));
    }

    #[test]
    fn test_source_hash_tracks_content() {
        let a = EngineConfig::from_str("[build]\nclean = true").unwrap();
        let b = EngineConfig::from_str("[build]\nclean = false").unwrap();
        assert_ne!(a.source_hash, b.source_hash);
        assert_eq!(
            a.source_hash,
            EngineConfig::from_str("[build]\nclean = true").unwrap().source_hash
        );
    }

    #[test]
    fn test_load_without_config_file_uses_default_pipelines() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&args_for(dir.path())).unwrap();

        let root = normalize_path(dir.path());
        assert_eq!(config.root, root);
        assert_eq!(config.config_path, root.join(DEFAULT_CONFIG));
        assert!(config.source_hash.is_none());
        assert_eq!(config.build.input, root.join("input"));
        assert_eq!(config.pipelines, default_pipelines());
    }

    #[test]
    fn test_load_root_as_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[build]\noutput = \"dist\"").unwrap();

        let config = EngineConfig::load(&args_for(&path)).unwrap();
        let root = normalize_path(dir.path());
        assert_eq!(config.root, root);
        assert_eq!(config.config_path, root.join("site.toml"));
        assert_eq!(config.build.output, root.join("dist"));
        assert!(config.source_hash.is_some());
    }

    #[test]
    fn test_load_root_as_config_file_conflicts_with_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "").unwrap();

        let args = RunArgs {
            config: Some("other.toml".into()),
            ..args_for(&path)
        };
        assert!(matches!(
            EngineConfig::load(&args),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_missing_root() {
        let dir = TempDir::new().unwrap();
        let args = args_for(&dir.path().join("nope"));
        assert!(matches!(
            EngineConfig::load(&args),
            Err(ConfigError::MissingRoot(_))
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG),
            "[build]\ninput = \"a\"\nclean = true\ncache = true",
        )
        .unwrap();

        let args = RunArgs {
            input: Some("b".into()),
            no_clean: true,
            no_cache: true,
            ..args_for(dir.path())
        };
        let config = EngineConfig::load(&args).unwrap();
        assert_eq!(config.build.input, normalize_path(dir.path()).join("b"));
        assert!(!config.build.clean);
        assert!(!config.build.cache);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG), "[build\n").unwrap();
        assert!(matches!(
            EngineConfig::load(&args_for(dir.path())),
            Err(ConfigError::Toml(_))
        ));
    }

    fn validated(content: &str) -> Result<(), ConfigError> {
        let mut config = test_parse_config(content);
        config.build.input = "/site/input".into();
        config.build.output = "/site/output".into();
        config.validate()
    }

    #[test]
    fn test_validate_duplicate_pipeline() {
        let err = validated("[[pipeline]]\nname = \"a\"\n[[pipeline]]\nname = \"a\"").unwrap_err();
        assert!(err.to_string().contains("duplicate pipeline `a`"));
    }

    #[test]
    fn test_validate_documents_references() {
        // earlier pipeline: ok
        assert!(
            validated(
                r#"
                [[pipeline]]
                name = "a"
                [[pipeline]]
                name = "b"
                modules = [{ kind = "documents", pipeline = "a" }]
                "#
            )
            .is_ok()
        );

        // later or self: rejected
        assert!(
            validated(
                r#"
                [[pipeline]]
                name = "a"
                modules = [{ kind = "documents", pipeline = "a" }]
                "#
            )
            .is_err()
        );

        // stage must precede the module, also inside concat
        assert!(
            validated(
                r#"
                [[pipeline]]
                name = "a"
                modules = [{ kind = "markdown" }, { kind = "concat", modules = [{ kind = "documents", stage = 0 }] }]
                "#
            )
            .is_err()
        );
        assert!(
            validated(
                r#"
                [[pipeline]]
                name = "a"
                modules = [{ kind = "markdown" }, { kind = "documents", stage = 0 }]
                "#
            )
            .is_ok()
        );
    }

    #[test]
    fn test_validate_output_must_not_contain_input() {
        let mut config = test_parse_config("");
        config.build.input = "/site/x".into();
        config.build.output = "/site/x".into();
        assert!(config.validate().is_err());

        config.build.output = "/site".into();
        assert!(config.validate().is_err());

        // output inside input is allowed, the watcher ignores it
        config.build.output = "/site/x/out".into();
        assert!(config.validate().is_ok());
    }
}
