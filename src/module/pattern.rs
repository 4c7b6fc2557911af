//! Glob-style file patterns over the input folder.
//!
//! Supported syntax: `*` (within one path segment), `**` (any number of
//! segments), `?` (one character). A pattern without `/` matches the file
//! name at any depth, so `*.md` finds every Markdown file.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use regex::Regex;

use crate::config::ConfigError;

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Include pattern with an optional exclude pattern.
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    include: Regex,
    exclude: Option<Regex>,
}

impl FilePattern {
    pub fn parse(include: &str, exclude: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            source: include.to_string(),
            include: glob_to_regex(include)?,
            exclude: exclude.map(glob_to_regex).transpose()?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a path relative to the input folder.
    pub fn matches(&self, relative: &Path) -> bool {
        let path = to_slash(relative);
        self.include.is_match(&path)
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(&path))
    }

    /// All matching files under `root`, sorted for a stable document order.
    ///
    /// Nothing under `output` is returned, so an output folder nested in the
    /// input folder is never read back in.
    pub fn collect(&self, root: &Path, output: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.path().starts_with(output))
            .filter(|e| {
                let name = e.file_name().to_str().unwrap_or_default();
                !IGNORED_FILES.contains(&name)
            })
            .map(|e| e.path())
            .filter(|path| {
                path.strip_prefix(root)
                    .is_ok_and(|relative| self.matches(relative))
            })
            .collect();
        files.sort();
        files
    }
}

/// Forward-slash form of a relative path, for matching and metadata.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn glob_to_regex(glob: &str) -> Result<Regex, ConfigError> {
    let glob = glob.trim().trim_start_matches("./");
    if glob.is_empty() {
        return Err(ConfigError::Validation("empty file pattern".into()));
    }

    let mut re = String::from("^");
    if !glob.contains('/') {
        re.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    // `**/` spans zero or more directories
                    re.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    re.push('$');

    Regex::new(&re)
        .map_err(|e| ConfigError::Validation(format!("invalid file pattern `{glob}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pattern(include: &str, exclude: Option<&str>) -> FilePattern {
        FilePattern::parse(include, exclude).unwrap()
    }

    #[test]
    fn test_bare_pattern_matches_any_depth() {
        let p = pattern("*.md", None);
        assert!(p.matches(Path::new("index.md")));
        assert!(p.matches(Path::new("posts/2024/hello.md")));
        assert!(!p.matches(Path::new("posts/hello.mdx")));
    }

    #[test]
    fn test_slash_pattern_is_anchored() {
        let p = pattern("posts/*.md", None);
        assert!(p.matches(Path::new("posts/a.md")));
        assert!(!p.matches(Path::new("posts/nested/a.md")));
        assert!(!p.matches(Path::new("drafts/posts/a.md")));
    }

    #[test]
    fn test_double_star() {
        let p = pattern("**/*.css", None);
        assert!(p.matches(Path::new("style.css")));
        assert!(p.matches(Path::new("assets/css/site.css")));

        let all = pattern("**", None);
        assert!(all.matches(Path::new("a/b/c.txt")));
    }

    #[test]
    fn test_question_mark_and_escaping() {
        let p = pattern("page?.html", None);
        assert!(p.matches(Path::new("page1.html")));
        assert!(!p.matches(Path::new("page10.html")));
        assert!(!p.matches(Path::new("page1xhtml")));
    }

    #[test]
    fn test_exclude() {
        let p = pattern("**", Some("*.md"));
        assert!(p.matches(Path::new("img/logo.png")));
        assert!(!p.matches(Path::new("posts/a.md")));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(FilePattern::parse("  ", None).is_err());
    }

    #[test]
    fn test_collect_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/2.md"), "").unwrap();
        fs::write(dir.path().join("1.md"), "").unwrap();
        fs::write(dir.path().join("skip.txt"), "").unwrap();

        let files = pattern("*.md", None).collect(dir.path(), &dir.path().join("output"));
        let relative: Vec<_> = files
            .iter()
            .map(|p| to_slash(p.strip_prefix(dir.path()).unwrap()))
            .collect();
        assert_eq!(relative, ["1.md", "b/2.md"]);
    }

    #[test]
    fn test_collect_skips_nested_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        fs::create_dir_all(output.join("posts")).unwrap();
        fs::write(dir.path().join("index.md"), "").unwrap();
        fs::write(output.join("posts/old.md"), "").unwrap();
        fs::write(output.join("logo.png"), "").unwrap();

        let files = pattern("**", None).collect(dir.path(), &output);
        assert_eq!(files, [dir.path().join("index.md")]);
    }
}
