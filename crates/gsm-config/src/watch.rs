// ── Config file watcher ──
//
// Polls the config file and republishes a profile's connection parameters
// whenever they change. A running session follows the receiver and
// reconnects on its next command.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gsm_core::ConnectionParameters;

use crate::{ConfigError, load_config_from, resolve_profile};

/// Load profile `name` from `path` and keep its connection parameters
/// current on the returned channel.
///
/// The file is re-read every `period` once its contents change. A file that
/// fails to load or resolve is logged and the previous parameters stay
/// published. The background task stops when `cancel` fires or every
/// receiver is gone.
///
/// Must be called from within a tokio runtime.
pub fn watch_profile(
    path: PathBuf,
    name: String,
    period: Duration,
    cancel: CancellationToken,
) -> Result<watch::Receiver<ConnectionParameters>, ConfigError> {
    let initial = resolve_profile(&load_config_from(&path)?, &name, None)?;
    let last_seen = std::fs::read_to_string(&path).ok();
    let (tx, rx) = watch::channel(initial.params);

    tokio::spawn(watch_task(path, name, period, last_seen, tx, cancel));
    Ok(rx)
}

async fn watch_task(
    path: PathBuf,
    name: String,
    period: Duration,
    mut last_seen: Option<String>,
    tx: watch::Sender<ConnectionParameters>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tx.closed() => break,
            _ = interval.tick() => {}
        }

        let contents = tokio::fs::read_to_string(&path).await.ok();
        if contents == last_seen {
            continue;
        }
        last_seen = contents;
        debug!(path = %path.display(), "config file changed");

        let resolved = match load_config_from(&path).and_then(|cfg| resolve_profile(&cfg, &name, None)) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, profile = %name, "ignoring unusable config change");
                continue;
            }
        };

        let endpoint = resolved.params.endpoint();
        let changed = tx.send_if_modified(|current| {
            if *current == resolved.params {
                false
            } else {
                *current = resolved.params;
                true
            }
        });
        if changed {
            info!(profile = %name, %endpoint, "connection parameters updated from config");
        }
    }
    debug!(path = %path.display(), "config watcher stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(port: u16) -> String {
        format!("[profiles.main]\naddress = \"127.0.0.1\"\nport = {port}\npassword = \"pw\"\n")
    }

    #[tokio::test]
    async fn publishes_changed_parameters_and_ignores_broken_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, profile(27020)).unwrap();

        let cancel = CancellationToken::new();
        let mut rx = watch_profile(
            path.clone(),
            "main".into(),
            Duration::from_millis(10),
            cancel.clone(),
        )
        .unwrap();
        assert_eq!(rx.borrow_and_update().port, 27020);

        std::fs::write(&path, profile(27021)).unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow_and_update().port, 27021);

        // A broken file keeps the last good parameters.
        std::fs::write(&path, "[profiles.main\nnot toml").unwrap();
        let outcome = tokio::time::timeout(Duration::from_millis(100), rx.changed()).await;
        assert!(outcome.is_err());
        assert_eq!(rx.borrow().port, 27021);

        cancel.cancel();
    }

    #[tokio::test]
    async fn unknown_profile_fails_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, profile(27020)).unwrap();

        let err = watch_profile(
            path,
            "other".into(),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }
}
