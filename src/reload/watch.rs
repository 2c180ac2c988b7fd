//! File watching: debounced change detection and incremental rebuilds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{Receiver, unbounded};
use notify::{RecursiveMode, Watcher};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::SiteConfig;
use crate::core::{BuildMode, begin_update, end_update, is_shutdown};
use crate::log;
use crate::logger::{status_error, status_success};
use crate::pipeline::{process_images, process_passthrough, process_scripts, process_styles};
use crate::render::render_pages;
use crate::revision::AssetResolver;
use crate::utils::path::normalize_path;
use crate::utils::plural_count;

use super::server::ReloadHub;

const DEBOUNCE_MS: u64 = 300;
const REBUILD_COOLDOWN_MS: u64 = 800;

// =============================================================================
// Change classification
// =============================================================================

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Asset category a change belongs to, driving which phases rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(super) enum ChangeCategory {
    Styles,
    Scripts,
    Images,
    Static,
    Templates,
}

impl ChangeCategory {
    fn label(self) -> &'static str {
        match self {
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
            Self::Static => "static",
            Self::Templates => "templates",
        }
    }
}

/// Classify a changed path into the pipeline category owning it.
fn classify(path: &Path, config: &SiteConfig) -> Option<ChangeCategory> {
    if path.starts_with(&config.build.templates) {
        return Some(ChangeCategory::Templates);
    }

    let rel = path.strip_prefix(&config.build.assets).ok()?;
    let class = rel.components().next()?.as_os_str().to_str()?;
    Some(match class {
        "css" => ChangeCategory::Styles,
        "js" => ChangeCategory::Scripts,
        "img" => ChangeCategory::Images,
        _ => ChangeCategory::Static,
    })
}

// =============================================================================
// Debouncer
// =============================================================================

/// Pure debouncer: only handles timing and event deduplication.
/// No business logic, no global state access.
struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<std::time::Instant>,
    last_rebuild: Option<std::time::Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Removed + Created/Modified → restored, use the new event
    /// - Modified + Removed → deleted, upgrade to Removed
    /// - Created + Removed → appeared then vanished, discard
    /// - Same type events: first event wins
    fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Ignore metadata-only changes (mtime/atime/chmod noise)
                // may trigger endless rebuild loops
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }

            let path = normalize_path(path);

            if let Some(&existing) = self.changes.get(&path) {
                match (existing, kind) {
                    (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                        crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                        self.changes.insert(path, kind);
                    }
                    (ChangeKind::Modified, ChangeKind::Removed) => {
                        crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                        self.changes.insert(path, ChangeKind::Removed);
                    }
                    (ChangeKind::Created, ChangeKind::Removed) => {
                        crate::debug!("watch"; "discard created+removed: {}", path.display());
                        self.changes.remove(&path);
                    }
                    _ => continue,
                }
                self.last_event = Some(std::time::Instant::now());
                continue;
            }

            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            self.last_event = Some(std::time::Instant::now());
        }
    }

    /// Take changes if debounce + cooldown elapsed.
    fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        self.last_rebuild = Some(std::time::Instant::now());
        Some(changes)
    }

    fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_rebuild) = self.last_rebuild
            && last_rebuild.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until next possible ready time.
    fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_millis(500);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_rebuild
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

// =============================================================================
// Watch loop
// =============================================================================

/// Spawn the watch thread: debounce events, rebuild changed categories,
/// broadcast reload on success.
pub fn spawn_watcher(
    config: Arc<SiteConfig>,
    hub: Arc<ReloadHub>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_watch_loop(&config, &hub, &shutdown_rx) {
            log!("watch"; "watcher stopped: {:#}", e);
        }
    })
}

fn run_watch_loop(
    config: &SiteConfig,
    hub: &ReloadHub,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let (events_tx, events_rx) = unbounded();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = events_tx.send(res);
    })?;
    watcher.watch(&config.build.assets, RecursiveMode::Recursive)?;
    watcher.watch(&config.build.templates, RecursiveMode::Recursive)?;

    log!(
        "watch";
        "watching {} and {}",
        config.root_relative(&config.build.assets).display(),
        config.root_relative(&config.build.templates).display()
    );

    let mut debouncer = Debouncer::new();

    loop {
        if is_shutdown() {
            return Ok(());
        }

        crossbeam::select! {
            recv(events_rx) -> msg => match msg {
                Ok(Ok(event)) => debouncer.add_event(&event),
                Ok(Err(e)) => log!("watch"; "watch error: {}", e),
                Err(_) => return Ok(()),
            },
            recv(shutdown_rx) -> _ => return Ok(()),
            default(debouncer.sleep_duration().min(Duration::from_millis(500))) => {}
        }

        if let Some(changes) = debouncer.take_if_ready() {
            rebuild_changed(&changes, config, hub);
        }
    }
}

/// Re-run the pipeline phases owning the changed categories, in
/// dependency order (assets first, templates last), then reload browsers.
fn rebuild_changed(
    changes: &FxHashMap<PathBuf, ChangeKind>,
    config: &SiteConfig,
    hub: &ReloadHub,
) {
    let mut categories: Vec<ChangeCategory> = changes
        .keys()
        .filter_map(|path| classify(path, config))
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    categories.sort();

    if categories.is_empty() {
        return;
    }

    // Gate requests while the output tree is in flux
    begin_update();
    let result = run_categories(&categories, config);
    end_update();

    match result {
        Ok(()) => {
            let labels: Vec<_> = categories.iter().map(|c| c.label()).collect();
            status_success(&format!(
                "rebuilt {} ({})",
                labels.join(", "),
                plural_count(changes.len(), "change")
            ));
            hub.broadcast_reload();
        }
        // Degrade gracefully: keep serving the last good build
        Err(e) => status_error("rebuild failed", &format!("{e:#}")),
    }
}

fn run_categories(categories: &[ChangeCategory], config: &SiteConfig) -> Result<()> {
    let mode = BuildMode::DEVELOPMENT;

    for category in categories {
        match category {
            ChangeCategory::Styles => {
                process_styles(config, mode, None)?;
            }
            ChangeCategory::Scripts => {
                process_scripts(config, mode, None)?;
            }
            ChangeCategory::Images => {
                process_images(config, false, None)?;
            }
            ChangeCategory::Static => {
                process_passthrough(config, false, None)?;
            }
            ChangeCategory::Templates => {
                render_pages(config, &AssetResolver::passthrough(), None)?;
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: notify::EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    fn create_kind() -> notify::EventKind {
        notify::EventKind::Create(notify::event::CreateKind::File)
    }

    fn remove_kind() -> notify::EventKind {
        notify::EventKind::Remove(notify::event::RemoveKind::File)
    }

    #[test]
    fn test_debouncer_dedup_created_then_removed() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&event(create_kind(), "/site/assets/css/new.css"));
        debouncer.add_event(&event(remove_kind(), "/site/assets/css/new.css"));
        // Appeared then vanished within the window: no-op
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_debouncer_removed_then_created_restores() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&event(remove_kind(), "/site/assets/css/site.css"));
        debouncer.add_event(&event(create_kind(), "/site/assets/css/site.css"));
        let kinds: Vec<_> = debouncer.changes.values().copied().collect();
        assert_eq!(kinds, vec![ChangeKind::Created]);
    }

    #[test]
    fn test_debouncer_ignores_temp_files() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&event(create_kind(), "/site/assets/css/site.css.swp"));
        debouncer.add_event(&event(create_kind(), "/site/assets/css/.#site.css"));
        debouncer.add_event(&event(create_kind(), "/site/assets/css/site.css~"));
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_debouncer_not_ready_within_debounce_window() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&event(create_kind(), "/site/assets/js/app.js"));
        assert!(!debouncer.is_ready());
        assert!(debouncer.take_if_ready().is_none());
    }

    #[test]
    fn test_classify_categories() {
        let mut config = SiteConfig::default();
        config.build.assets = PathBuf::from("/site/assets");
        config.build.templates = PathBuf::from("/site/templates");

        let check = |path: &str| classify(Path::new(path), &config);
        assert_eq!(check("/site/assets/css/site.css"), Some(ChangeCategory::Styles));
        assert_eq!(check("/site/assets/js/app.js"), Some(ChangeCategory::Scripts));
        assert_eq!(check("/site/assets/img/logo.png"), Some(ChangeCategory::Images));
        assert_eq!(check("/site/assets/fonts/a.woff2"), Some(ChangeCategory::Static));
        assert_eq!(check("/site/templates/index.md"), Some(ChangeCategory::Templates));
        assert_eq!(check("/elsewhere/file.txt"), None);
    }
}
