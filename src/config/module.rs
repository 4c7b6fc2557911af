//! `[[pipeline]]` entries and their module lists.
//!
//! # Example
//!
//! ```toml
//! [[pipeline]]
//! name = "content"
//! modules = [
//!     { kind = "read", pattern = "**/*.md" },
//!     { kind = "front_matter" },
//!     { kind = "markdown" },
//!     { kind = "write", extension = "html" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub name: String,

    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>, modules: Vec<ModuleSpec>) -> Self {
        Self {
            name: name.into(),
            modules,
        }
    }
}

/// A configured module, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleSpec {
    Read {
        pattern: String,
        exclude: Option<String>,
    },
    FrontMatter {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    Markdown,
    Meta {
        key: String,
        value: Value,
    },
    Concat {
        #[serde(default)]
        modules: Vec<ModuleSpec>,
    },
    Documents {
        pipeline: Option<String>,
        stage: Option<usize>,
    },
    Write {
        extension: Option<String>,
    },
    Copy {
        pattern: String,
        exclude: Option<String>,
    },
}

fn default_delimiter() -> String {
    "+++".into()
}

impl ModuleSpec {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::FrontMatter { .. } => "front_matter",
            Self::Markdown => "markdown",
            Self::Meta { .. } => "meta",
            Self::Concat { .. } => "concat",
            Self::Documents { .. } => "documents",
            Self::Write { .. } => "write",
            Self::Copy { .. } => "copy",
        }
    }
}

/// Pipelines used when no config file exists.
pub fn default_pipelines() -> Vec<PipelineSpec> {
    vec![
        PipelineSpec::new(
            "content",
            vec![
                ModuleSpec::Read {
                    pattern: "**/*.md".into(),
                    exclude: None,
                },
                ModuleSpec::FrontMatter {
                    delimiter: default_delimiter(),
                },
                ModuleSpec::Markdown,
                ModuleSpec::Write {
                    extension: Some("html".into()),
                },
            ],
        ),
        PipelineSpec::new(
            "resources",
            vec![ModuleSpec::Copy {
                pattern: "**".into(),
                exclude: Some("**/*.md".into()),
            }],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        pipeline: Vec<PipelineSpec>,
    }

    #[test]
    fn test_parse_tagged_modules() {
        let toml = r#"
            [[pipeline]]
            name = "blog"
            modules = [
                { kind = "read", pattern = "posts/*.md" },
                { kind = "front_matter" },
                { kind = "meta", key = "section", value = "blog" },
                { kind = "concat", modules = [{ kind = "markdown" }] },
                { kind = "documents", stage = 1 },
            ]
        "#;
        let parsed: Wrapper = toml::from_str(toml).unwrap();
        let modules = &parsed.pipeline[0].modules;

        assert_eq!(
            modules[0],
            ModuleSpec::Read {
                pattern: "posts/*.md".into(),
                exclude: None
            }
        );
        assert_eq!(
            modules[1],
            ModuleSpec::FrontMatter {
                delimiter: "+++".into()
            }
        );
        assert_eq!(
            modules[2],
            ModuleSpec::Meta {
                key: "section".into(),
                value: Value::String("blog".into())
            }
        );
        assert_eq!(
            modules[3],
            ModuleSpec::Concat {
                modules: vec![ModuleSpec::Markdown]
            }
        );
        assert_eq!(
            modules[4],
            ModuleSpec::Documents {
                pipeline: None,
                stage: Some(1)
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = r#"
            [[pipeline]]
            name = "x"
            modules = [{ kind = "minify" }]
        "#;
        assert!(toml::from_str::<Wrapper>(toml).is_err());
    }

    #[test]
    fn test_default_pipelines() {
        let pipelines = default_pipelines();
        let names: Vec<_> = pipelines.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["content", "resources"]);
        assert_eq!(pipelines[0].modules[2].kind(), "markdown");
    }
}
