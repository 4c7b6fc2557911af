//! Listener threads feeding the watch signal.
//!
//! ```text
//! notify (input, recursive)      ─┐
//! notify (config dir, flat)      ─┼─▶ WatchSignal ─▶ control loop
//! stdin Enter / Ctrl+C           ─┘
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::WatchSignal;
use super::filter::{InputFilter, touches_config};
use crate::config::EngineConfig;
use crate::document::Fingerprint;
use crate::{debug, log};

/// File-system watchers of one engine configuration.
///
/// Dropping this stops both watchers.
pub struct Watchers {
    _input: Option<RecommendedWatcher>,
    _config: RecommendedWatcher,
}

impl Watchers {
    /// Start watching the input folder and the config file of `config`.
    ///
    /// Events start queueing immediately, so changes made during the first
    /// run are not lost.
    pub fn start(config: &EngineConfig, signal: &Arc<WatchSignal>) -> notify::Result<Self> {
        let input = if config.build.input.is_dir() {
            Some(watch_input(
                &config.build.input,
                &config.build.output,
                Arc::clone(signal),
            )?)
        } else {
            let input = config.build.input.display();
            log!("watch"; "input folder {} does not exist, not watching it", input);
            None
        };
        let config_watcher =
            watch_config(&config.config_path, config.source_hash, Arc::clone(signal))?;

        Ok(Self {
            _input: input,
            _config: config_watcher,
        })
    }
}

fn watch_input(
    input: &Path,
    output: &Path,
    signal: Arc<WatchSignal>,
) -> notify::Result<RecommendedWatcher> {
    let filter = InputFilter::new(output);
    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for path in filter.changed_paths(&event) {
                    debug!("watch"; "changed: {}", path.display());
                    signal.notify_changed(path);
                }
            }
            Err(e) => log!("watch"; "notify error: {}", e),
        })?;
    watcher.watch(input, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Watch the config file's folder (non-recursive) and fire only for the
/// config file itself, and only when its content hash changed.
fn watch_config(
    config_path: &Path,
    known: Option<Fingerprint>,
    signal: Arc<WatchSignal>,
) -> notify::Result<RecommendedWatcher> {
    let dir = config_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let config_path = config_path.to_path_buf();
    let known = Mutex::new(known);

    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) if touches_config(&event, &config_path) => {
                let current = EngineConfig::file_hash(&config_path);
                let mut known = known.lock();
                if *known == current {
                    debug!("watch"; "config touched but unchanged");
                    return;
                }
                *known = current;
                signal.notify_config_changed();
            }
            Ok(_) => {}
            Err(e) => log!("watch"; "notify error: {}", e),
        })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Request exit when Enter is pressed.
///
/// A closed stdin (EOF) does not count as a key press.
pub fn spawn_exit_listener(signal: Arc<WatchSignal>) {
    let spawned = thread::Builder::new()
        .name("kiln-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            if matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0) {
                signal.request_exit();
            }
        });
    if let Err(e) = spawned {
        log!("watch"; "cannot listen for Enter: {}", e);
    }
}
