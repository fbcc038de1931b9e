use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    pub max_age: Option<Duration>,
    pub max_files: Option<usize>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: Vec<String>,
    pub over_quota: Vec<String>,
}

impl SweepReport {
    pub fn deleted(&self) -> usize {
        self.expired.len() + self.over_quota.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("Failed to list {path}: {source}")]
    List {
        path: String,
        source: std::io::Error,
    },
}

struct Candidate {
    name: String,
    path: PathBuf,
    modified: DateTime<Utc>,
}

impl RetentionPolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_age.is_some() || self.max_files.is_some()
    }

    /// Deletes stored images past `max_age`, then the oldest survivors beyond `max_files`.
    /// Only `<uuid>.<allowed-ext>` files are ever considered.
    pub fn sweep(
        &self,
        root: &Path,
        allowed_extensions: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, RetentionError> {
        let mut candidates = list_stored_images(root, allowed_extensions)?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        if let Some(max_age) = self.max_age {
            let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
            let (expired, kept): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .partition(|c| now.signed_duration_since(c.modified) > max_age);
            for candidate in expired {
                if remove(&candidate) {
                    report.expired.push(candidate.name);
                }
            }
            candidates = kept;
        }

        if let Some(max_files) = self.max_files {
            if candidates.len() > max_files {
                candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.name.cmp(&b.name)));
                let excess = candidates.len() - max_files;
                for candidate in candidates.into_iter().take(excess) {
                    if remove(&candidate) {
                        report.over_quota.push(candidate.name);
                    }
                }
            }
        }

        Ok(report)
    }
}

fn list_stored_images(
    root: &Path,
    allowed_extensions: &BTreeSet<String>,
) -> Result<Vec<Candidate>, RetentionError> {
    let entries = std::fs::read_dir(root).map_err(|source| RetentionError::List {
        path: root.display().to_string(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if !is_stored_image_name(&name, allowed_extensions) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        candidates.push(Candidate {
            name,
            path,
            modified: DateTime::<Utc>::from(modified),
        });
    }
    Ok(candidates)
}

fn is_stored_image_name(name: &str, allowed_extensions: &BTreeSet<String>) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => allowed_extensions.contains(ext) && Uuid::parse_str(stem).is_ok(),
        None => false,
    }
}

fn remove(candidate: &Candidate) -> bool {
    match std::fs::remove_file(&candidate.path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to delete expired upload {}: {}", candidate.name, e);
            false
        }
    }
}

/// Runs the policy against `root` every `interval` on the actix runtime.
pub fn spawn_sweeper(
    policy: RetentionPolicy,
    root: PathBuf,
    allowed_extensions: BTreeSet<String>,
    interval: Duration,
) {
    if !policy.is_enabled() {
        info!("Upload retention disabled; stored images are kept indefinitely");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(interval);
        loop {
            ticker.tick().await;
            let root = root.clone();
            let allowed = allowed_extensions.clone();
            let result =
                actix_web::web::block(move || policy.sweep(&root, &allowed, Utc::now())).await;
            match result {
                Ok(Ok(report)) if report.deleted() > 0 => info!(
                    "Retention sweep removed {} of {} stored images ({} expired, {} over quota)",
                    report.deleted(),
                    report.scanned,
                    report.expired.len(),
                    report.over_quota.len()
                ),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Retention sweep failed: {}", e),
                Err(e) => error!("Retention sweep task failed: {}", e),
            }
        }
    });
}
