//! Hot reload of the resource table.
//!
//! The parent directory is watched rather than the file itself: editors and
//! deployment tools often replace the file by rename, which drops a watch
//! placed on the old inode.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Publishes every new configuration that loads and validates.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(OsString::from);

        let reload_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !touches(&event, file_name.as_deref()) {
                    return;
                }

                match load_config(&reload_path) {
                    Ok(config) => {
                        tracing::info!(
                            path = %reload_path.display(),
                            resources = config.resources.len(),
                            "Config file changed"
                        );
                        let _ = update_tx.send(config);
                    }
                    Err(e) => tracing::error!(
                        path = %reload_path.display(),
                        error = %e,
                        "Config file changed but does not load, keeping current resources"
                    ),
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching config file");
        Ok(watcher)
    }
}

/// A write, create or rename that involves the config file.
fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_events_on_the_config_file_count() {
        let name = Some(std::ffi::OsStr::new("zeus.toml"));
        assert!(touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/zeus/zeus.toml"), name));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "/etc/zeus/zeus.toml"), name));
        assert!(!touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/zeus/zeus.toml.swp"), name));
        assert!(!touches(&event(EventKind::Remove(RemoveKind::File), "/etc/zeus/zeus.toml"), name));
    }
}
