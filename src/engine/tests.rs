use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::config::test_parse_config;
use crate::core::ExitCode;
use crate::module::{FilePattern, Module, ModuleHandle, ReadFiles};
use crate::pipeline::ExecutionContext;

// ============================================================================
// test modules
// ============================================================================

/// Uppercases content through the module cache, counting real computations.
struct Upper {
    computed: Arc<AtomicUsize>,
}

impl Module for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let cache = ctx.cache();
        inputs
            .into_iter()
            .map(|doc| {
                let upper = cache.get_or_compute(doc.fingerprint(), || {
                    self.computed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(doc.content().to_uppercase())
                })?;
                Ok(doc.with_content(upper.as_str()))
            })
            .collect()
    }
}

/// Fails while `fail` is set.
struct FailWhen {
    fail: Arc<AtomicBool>,
}

impl Module for FailWhen {
    fn name(&self) -> &'static str {
        "fail_when"
    }

    fn process(&self, inputs: Vec<Document>, _ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("boom");
        }
        Ok(inputs)
    }
}

/// Records that it ran.
struct Flag {
    ran: Arc<AtomicBool>,
}

impl Module for Flag {
    fn name(&self) -> &'static str {
        "flag"
    }

    fn process(&self, inputs: Vec<Document>, _ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        self.ran.store(true, Ordering::SeqCst);
        Ok(inputs)
    }
}

struct Panics;

impl Module for Panics {
    fn name(&self) -> &'static str {
        "panics"
    }

    fn process(
        &self,
        _inputs: Vec<Document>,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Document>> {
        panic!("module bug");
    }
}

// ============================================================================
// helpers
// ============================================================================

fn site() -> (TempDir, EngineSettings) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    let settings = EngineSettings {
        root: dir.path().to_path_buf(),
        input,
        output: dir.path().join("output"),
        clean: true,
        no_cache: false,
        initial_metadata: Metadata::new(),
    };
    (dir, settings)
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_md(engine: &Engine) -> ModuleHandle {
    ModuleHandle::new(
        engine.ids(),
        ReadFiles::new(FilePattern::parse("*.md", None).unwrap()),
    )
}

/// Engine with one pipeline: read *.md, then upper.
fn upper_engine(settings: EngineSettings) -> (Engine, Arc<AtomicUsize>) {
    let computed = Arc::new(AtomicUsize::new(0));
    let mut engine = Engine::new(settings, Trace::new());
    let modules = vec![
        read_md(&engine),
        ModuleHandle::new(
            engine.ids(),
            Upper {
                computed: Arc::clone(&computed),
            },
        ),
    ];
    engine.add_pipeline(Pipeline::new("upper", modules));
    (engine, computed)
}

fn configured(settings: &EngineSettings, content: &str) -> EngineConfig {
    let mut config = test_parse_config(content);
    config.root = settings.root.clone();
    config.build.input = settings.input.clone();
    config.build.output = settings.output.clone();
    config
}

// ============================================================================
// caching across runs
// ============================================================================

#[test]
fn test_second_run_reuses_cached_results() {
    let (_dir, settings) = site();
    write(&settings.input, "a.md", "alpha");
    write(&settings.input, "b.md", "beta");
    let (engine, computed) = upper_engine(settings.clone());

    let report = engine.execute().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 2);
    let contents: Vec<_> = report
        .documents("upper")
        .unwrap()
        .iter()
        .map(Document::content)
        .collect();
    assert_eq!(contents, ["ALPHA", "BETA"]);

    let report = engine.execute().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 2);
    assert_eq!(report.pruned, 0);

    write(&settings.input, "b.md", "gamma");
    let report = engine.execute().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 3);
    // the entry for the old content of b.md is stale now
    assert_eq!(report.pruned, 1);
    assert_eq!(engine.caches().entry_count(), 2);
}

#[test]
fn test_deleted_input_is_pruned() {
    let (_dir, settings) = site();
    write(&settings.input, "a.md", "alpha");
    write(&settings.input, "b.md", "beta");
    let (engine, _) = upper_engine(settings.clone());

    engine.execute().unwrap();
    assert_eq!(engine.caches().entry_count(), 2);

    fs::remove_file(settings.input.join("b.md")).unwrap();
    let report = engine.execute().unwrap();
    assert_eq!(report.pruned, 1);
    assert_eq!(engine.caches().entry_count(), 1);
}

#[test]
fn test_no_cache_recomputes_every_run() {
    let (_dir, settings) = site();
    write(&settings.input, "a.md", "alpha");
    let (mut engine, computed) = upper_engine(settings);

    engine.execute().unwrap();
    assert_eq!(engine.caches().entry_count(), 1);

    engine.set_no_cache(true);
    assert!(engine.caches().is_empty());
    engine.execute().unwrap();
    engine.execute().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 3);
    assert!(engine.caches().is_empty());

    // re-enabling starts from scratch
    engine.set_no_cache(false);
    engine.execute().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 4);
    assert_eq!(engine.caches().entry_count(), 1);
}

// ============================================================================
// failures
// ============================================================================

#[test]
fn test_failure_aborts_run_and_still_prunes() {
    let (_dir, settings) = site();
    write(&settings.input, "a.md", "alpha");
    write(&settings.input, "b.md", "beta");

    let fail = Arc::new(AtomicBool::new(false));
    let ran = Arc::new(AtomicBool::new(false));
    let mut engine = Engine::new(settings.clone(), Trace::new());
    let modules = vec![
        read_md(&engine),
        ModuleHandle::new(
            engine.ids(),
            Upper {
                computed: Arc::new(AtomicUsize::new(0)),
            },
        ),
        ModuleHandle::new(
            engine.ids(),
            FailWhen {
                fail: Arc::clone(&fail),
            },
        ),
        ModuleHandle::new(
            engine.ids(),
            Flag {
                ran: Arc::clone(&ran),
            },
        ),
    ];
    engine.add_pipeline(Pipeline::new("content", modules));

    engine.execute().unwrap();
    assert!(ran.swap(false, Ordering::SeqCst));
    assert_eq!(engine.caches().entry_count(), 2);

    fs::remove_file(settings.input.join("b.md")).unwrap();
    fail.store(true, Ordering::SeqCst);
    let err = engine.execute().unwrap_err();

    let EngineError::Execution(err) = &err else {
        panic!("expected an execution error, got {err:?}");
    };
    assert_eq!(err.pipeline(), "content");
    assert_eq!(err.stage(), 2);
    assert!(!ran.load(Ordering::SeqCst), "stage after the failure must not run");
    // b.md's entry was not hit in the failed run and is gone
    assert_eq!(engine.caches().entry_count(), 1);

    // the engine survives and runs again once the cause is fixed
    fail.store(false, Ordering::SeqCst);
    assert!(engine.execute().is_ok());
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_panicking_module_is_run_failure() {
    let (_dir, settings) = site();
    let mut engine = Engine::new(settings, Trace::new());
    let modules = vec![ModuleHandle::new(engine.ids(), Panics)];
    engine.add_pipeline(Pipeline::new("broken", modules));

    let err = engine.execute().unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::ExecutionError);
    assert!(err.to_string().contains("module bug"));
}

#[test]
fn test_configure_errors_keep_previous_pipelines() {
    let (_dir, settings) = site();
    let config = configured(
        &settings,
        "[[pipeline]]\nname = \"a\"\nmodules = [{ kind = \"markdown\" }]",
    );
    let mut engine = Engine::from_config(&config, Trace::new()).unwrap();
    assert_eq!(engine.pipelines().len(), 1);

    let bad = configured(&settings, "[[pipeline]]\nname = \"a\"\n[[pipeline]]\nname = \"a\"");
    let err = engine.configure(&bad).unwrap_err();
    assert_eq!(EngineError::from(err).exit_code(), ExitCode::ConfigurationError);
    assert_eq!(engine.pipelines().len(), 1);
}

// ============================================================================
// configured pipelines
// ============================================================================

#[test]
fn test_later_pipeline_sees_earlier_output() {
    let (_dir, settings) = site();
    write(&settings.input, "a.md", "# A");
    write(&settings.input, "b.md", "# B");

    let config = configured(
        &settings,
        r#"
        [meta]
        site = "kiln"

        [[pipeline]]
        name = "pages"
        modules = [{ kind = "read", pattern = "*.md" }, { kind = "markdown" }]

        [[pipeline]]
        name = "index"
        modules = [
            { kind = "documents", pipeline = "pages" },
            { kind = "meta", key = "indexed", value = true },
        ]
        "#,
    );
    let engine = Engine::from_config(&config, Trace::new()).unwrap();
    let report = engine.execute().unwrap();

    let index = report.documents("index").unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.iter().all(|doc| doc.get("indexed") == Some(&json!(true))));
    // initial metadata flows from the seed document through `read`
    assert_eq!(index[0].get_str("site"), Some("kiln"));
    assert!(index[0].content().contains("<h1>A</h1>"));
    assert_eq!(report.document_count(), 4);
}

#[test]
fn test_default_pipelines_build_site() {
    let (_dir, settings) = site();
    write(
        &settings.input,
        "posts/hello.md",
        "+++\ntitle = \"Hello\"\n+++\n# Hello *world*\n",
    );
    write(&settings.input, "css/site.css", "body {}");

    let mut config = configured(&settings, "");
    config.pipelines = crate::config::default_pipelines();
    let engine = Engine::from_config(&config, Trace::new()).unwrap();
    let report = engine.execute().unwrap();

    let html = fs::read_to_string(settings.output.join("posts/hello.html")).unwrap();
    assert!(html.contains("<em>world</em>"));
    assert!(!html.contains("title ="));
    assert_eq!(
        fs::read_to_string(settings.output.join("css/site.css")).unwrap(),
        "body {}"
    );

    let page = &report.documents("content").unwrap()[0];
    assert_eq!(page.get_str("title"), Some("Hello"));
    assert_eq!(page.get_str("destination_path"), Some("posts/hello.html"));
}

#[test]
fn test_output_inside_input_is_not_read_back() {
    let (dir, mut settings) = site();
    settings.input = dir.path().to_path_buf();
    settings.output = dir.path().join("out");
    settings.clean = false;
    write(&settings.input, "index.md", "# Home");
    write(&settings.input, "logo.png", "png");

    let mut config = configured(&settings, "");
    config.pipelines = crate::config::default_pipelines();
    let engine = Engine::from_config(&config, Trace::new()).unwrap();
    let mut report = engine.execute().unwrap();
    for _ in 0..2 {
        report = engine.execute().unwrap();
    }

    assert!(settings.output.join("index.html").is_file());
    assert!(settings.output.join("logo.png").is_file());
    assert!(!settings.output.join("out").exists());
    assert_eq!(report.documents("content").unwrap().len(), 1);
    // `input/` from the fixture is empty, so only logo.png is a resource
    let resources = report.documents("resources").unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].get_str("destination_path"), Some("logo.png"));
}

#[test]
fn test_clean_removes_stale_output() {
    let (_dir, mut settings) = site();
    write(&settings.output, "stale.txt", "old");

    settings.clean = false;
    Engine::new(settings.clone(), Trace::new()).execute().unwrap();
    assert!(settings.output.join("stale.txt").exists());

    settings.clean = true;
    Engine::new(settings.clone(), Trace::new()).execute().unwrap();
    assert!(!settings.output.join("stale.txt").exists());
    assert!(settings.output.is_dir());
}

#[test]
fn test_settings_from_config() {
    let mut config = test_parse_config("[build]\ncache = false\nclean = false\n[meta]\nk = 1");
    config.root = "/site".into();
    let settings = EngineSettings::from_config(&config);
    assert!(settings.no_cache);
    assert!(!settings.clean);
    assert_eq!(settings.initial_metadata.get("k"), Some(&json!(1)));

    let engine = Engine::new(settings, Trace::new());
    assert!(engine.caches().is_disabled());
    assert_eq!(engine.root(), Path::new("/site"));
}
