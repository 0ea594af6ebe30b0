use crate::artifact::{self, Artifact, SCHEMA_JSON, SCHEMA_SQL};
use crate::collection::Collection;
use crate::compiler::{compile, render_json, render_sql};
use crate::error::{DeesseError, Result};
use crate::schema::load_collections;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// A change to a declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// The kind of file change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A filesystem watcher over a declaration file or directory.
/// Changes are debounced (100ms) and delivered as one batch per burst.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    /// Handle to the background thread processing events
    _thread: std::thread::JoinHandle<()>,
    /// Receiver for debounced change batches
    pub batch_rx: mpsc::Receiver<Vec<WatcherEvent>>,
}

impl FileWatcher {
    /// Start watching `target`. A directory is watched for any `*.yaml` or
    /// `*.yml` file; a single file is watched through its parent directory
    /// so that editors replacing it on save are still seen.
    pub fn start(target: &Path) -> Result<Self> {
        let (notify_tx, notify_rx) = mpsc::channel::<notify::Result<Event>>();
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<WatcherEvent>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )
        .map_err(watch_error)?;

        let (watch_dir, only_file) = if target.is_file() {
            let parent = match target.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (parent, target.file_name().map(|n| n.to_os_string()))
        } else {
            (target.to_path_buf(), None)
        };
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        // Background thread to process events with debouncing
        let thread = std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut pending: Vec<WatcherEvent> = Vec::new();
            let mut last_event = Instant::now();

            loop {
                match notify_rx.recv_timeout(debounce) {
                    Ok(Ok(event)) => {
                        let kind = match event.kind {
                            EventKind::Create(_) => Some(ChangeKind::Created),
                            EventKind::Modify(_) => Some(ChangeKind::Modified),
                            EventKind::Remove(_) => Some(ChangeKind::Deleted),
                            _ => None,
                        };

                        if let Some(kind) = kind {
                            for path in event.paths {
                                let wanted = match &only_file {
                                    Some(name) => path.file_name() == Some(name.as_os_str()),
                                    None => is_declaration_file(&path),
                                };
                                if wanted {
                                    pending.push(WatcherEvent { path, kind });
                                }
                            }
                        }
                        last_event = Instant::now();
                    }
                    Ok(Err(e)) => {
                        log::warn!("File watcher error: {e}");
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if !pending.is_empty() && last_event.elapsed() >= debounce {
                            // Keep the last change per path, in arrival order
                            let mut batch: Vec<WatcherEvent> = Vec::new();
                            for event in pending.drain(..) {
                                batch.retain(|e| e.path != event.path);
                                batch.push(event);
                            }
                            if batch_tx.send(batch).is_err() {
                                return; // Receiver dropped
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(FileWatcher {
            _watcher: watcher,
            _thread: thread,
            batch_rx,
        })
    }
}

fn watch_error(e: notify::Error) -> DeesseError {
    DeesseError::Regeneration(format!("Failed to watch declarations: {e}"))
}

/// Check if a path looks like a declaration file.
fn is_declaration_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Produces derived artifacts from the current collections.
pub trait Generator: Send {
    fn name(&self) -> &str;

    fn generate(&self, collections: &[Collection]) -> Result<Vec<Artifact>>;
}

/// Emits the compiled tables as `schema.sql` and `schema.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableGenerator;

impl Generator for TableGenerator {
    fn name(&self) -> &str {
        "tables"
    }

    fn generate(&self, collections: &[Collection]) -> Result<Vec<Artifact>> {
        let tables = compile(collections);
        Ok(vec![
            Artifact::new(SCHEMA_SQL, render_sql(&tables)),
            Artifact::new(SCHEMA_JSON, render_json(&tables)?),
        ])
    }
}

/// Keeps the artifact directory in sync with the declarations.
pub struct Regenerator {
    declarations: PathBuf,
    out_dir: PathBuf,
    generators: Vec<Box<dyn Generator>>,
}

impl Regenerator {
    /// A regenerator running the [`TableGenerator`].
    pub fn new(declarations: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Regenerator {
            declarations: declarations.into(),
            out_dir: out_dir.into(),
            generators: vec![Box::new(TableGenerator)],
        }
    }

    pub fn with_generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    pub fn declarations(&self) -> &Path {
        &self.declarations
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Reload the declarations and run every generator. Nothing is written
    /// unless all of them succeed. Returns the artifact paths that changed.
    pub fn regenerate(&self) -> Result<Vec<PathBuf>> {
        let collections = load_collections(&self.declarations).map_err(|e| {
            DeesseError::Regeneration(format!(
                "{}: {e}",
                self.declarations.display()
            ))
        })?;

        let mut artifacts = Vec::new();
        for generator in &self.generators {
            let produced = generator.generate(&collections).map_err(|e| {
                DeesseError::Regeneration(format!("{} generator failed: {e}", generator.name()))
            })?;
            artifacts.extend(produced);
        }

        let changed = artifact::write_all(&self.out_dir, &artifacts)
            .map_err(|e| DeesseError::Regeneration(format!("Failed to write artifacts: {e}")))?;
        log::info!(
            "Regenerated {} collections ({} artifacts changed)",
            collections.len(),
            changed.len()
        );
        Ok(changed)
    }

    /// Regenerate once, then start watching the declarations.
    /// A failing initial regeneration is logged and does not stop the watch.
    pub fn start(self) -> Result<WatchSession> {
        let watcher = FileWatcher::start(&self.declarations)?;
        if let Err(e) = self.regenerate() {
            log::error!("{e}");
        }
        Ok(WatchSession {
            regenerator: self,
            watcher,
        })
    }
}

/// A running watch. Dropping it stops the watcher.
pub struct WatchSession {
    regenerator: Regenerator,
    watcher: FileWatcher,
}

impl WatchSession {
    pub fn regenerator(&self) -> &Regenerator {
        &self.regenerator
    }

    /// Wait for the next debounced batch. Returns None if the watcher shut
    /// down or `timeout` elapsed first.
    pub fn next_batch(&self, timeout: Option<Duration>) -> Option<Vec<WatcherEvent>> {
        match timeout {
            Some(t) => self.watcher.batch_rx.recv_timeout(t).ok(),
            None => self.watcher.batch_rx.recv().ok(),
        }
    }

    /// Regenerate for one batch, logging the outcome.
    pub fn handle(&self, batch: &[WatcherEvent]) -> Result<Vec<PathBuf>> {
        for event in batch {
            log::debug!("{:?} {}", event.kind, event.path.display());
        }
        let result = self.regenerator.regenerate();
        if let Err(e) = &result {
            log::error!("{e}");
        }
        result
    }

    /// Process batches sequentially, in arrival order, until the watcher
    /// shuts down.
    pub fn run(&self) {
        log::info!("Watching {}", self.regenerator.declarations.display());
        while let Some(batch) = self.next_batch(None) {
            let _ = self.handle(&batch);
        }
    }
}
