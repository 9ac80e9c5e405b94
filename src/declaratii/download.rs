//! Per-row document retrieval.
//!
//! Clicking a row's download control is fire-and-forget: the browser surface
//! exposes no completion event, so the coordinator snapshots the download
//! directory before the click and polls it for a new PDF afterwards. The
//! finished file is renamed to a collision-safe derived name; an existing
//! file is never overwritten.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::element::Element;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::poll_until;
use crate::error::ScraperError;

use super::types::{DownloadOutcome, ResultRow};

const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Pause between scrolling the trigger into view and clicking it.
const TRIGGER_SETTLE: Duration = Duration::from_secs(2);
const DOWNLOAD_EXTENSION: &str = "pdf";
const MAX_SUFFIX_ATTEMPTS: u32 = 100;

/// Derive the persisted filename for a row:
/// `{subject_name}_{date with dots as dashes}_{declaration_type}.pdf`,
/// spaces underscored and percent-escapes decoded.
pub fn build_filename(row: &ResultRow) -> String {
    let raw = format!(
        "{}_{}_{}.{}",
        row.subject_name.replace(' ', "_"),
        row.declaration_date.replace('.', "-"),
        row.declaration_type.replace(' ', "_"),
        DOWNLOAD_EXTENSION,
    );
    percent_encoding::percent_decode_str(&raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or(raw)
}

/// Find a destination path for `desired` inside `dir` that does not collide
/// with an existing file, appending `_1`, `_2`, ... before the extension
/// until a free name is found.
pub fn resolve_collision(dir: &Path, desired: &str) -> Result<PathBuf, ScraperError> {
    let direct = dir.join(desired);
    if !direct.exists() {
        return Ok(direct);
    }

    let stem = Path::new(desired)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| desired.to_string());
    let extension = Path::new(desired)
        .extension()
        .map(|s| s.to_string_lossy().into_owned());

    for attempt in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate_name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, attempt, ext),
            None => format!("{}_{}", stem, attempt),
        };
        let candidate = dir.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(ScraperError::RenameCollisionUnresolved(
        desired.to_string(),
        MAX_SUFFIX_ATTEMPTS,
    ))
}

pub struct DownloadCoordinator {
    dir: PathBuf,
    timeout: Duration,
}

impl DownloadCoordinator {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    /// Retrieve one row's document through its trigger element.
    ///
    /// Never propagates an error: any failure along the way is logged and
    /// recorded as a `Failed` outcome so subsequent rows keep processing.
    pub async fn fetch(&self, trigger: &Element, desired: &str) -> DownloadOutcome {
        match self.fetch_inner(trigger, desired).await {
            Ok(saved) => {
                info!("downloaded {}", saved);
                DownloadOutcome::success(saved)
            }
            Err(e) => {
                warn!("download failed for {}: {}", desired, e);
                DownloadOutcome::failed()
            }
        }
    }

    async fn fetch_inner(
        &self,
        trigger: &Element,
        desired: &str,
    ) -> Result<String, ScraperError> {
        let before = self.snapshot()?;

        trigger
            .scroll_into_view()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("scroll into view: {}", e)))?;
        sleep(TRIGGER_SETTLE).await;

        trigger
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("trigger click: {}", e)))?;
        debug!("clicked download trigger for {}", desired);

        let downloaded = self.wait_for_new_download(&before).await?;
        let target = resolve_collision(&self.dir, desired)?;
        std::fs::rename(&downloaded, &target)?;

        Ok(target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| desired.to_string()))
    }

    /// Names of the completed PDFs currently in the download directory.
    fn snapshot(&self) -> Result<HashSet<OsString>, ScraperError> {
        let mut names = HashSet::new();
        if !self.dir.exists() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_completed_download(&path) {
                if let Some(name) = path.file_name() {
                    names.insert(name.to_os_string());
                }
            }
        }
        Ok(names)
    }

    /// Poll the download directory for a completed PDF that was not present
    /// in the pre-click snapshot.
    async fn wait_for_new_download(
        &self,
        before: &HashSet<OsString>,
    ) -> Result<PathBuf, ScraperError> {
        let mut found: Option<PathBuf> = None;

        let appeared = poll_until(DOWNLOAD_POLL_INTERVAL, self.timeout, || {
            let hit = self.first_new_download(before);
            let is_hit = hit.is_some();
            if is_hit {
                found = hit;
            }
            async move { is_hit }
        })
        .await;

        if appeared {
            // found is always set when the poll reports success
            found.ok_or_else(|| ScraperError::DownloadTimeout(self.timeout))
        } else {
            Err(ScraperError::DownloadTimeout(self.timeout))
        }
    }

    fn first_new_download(&self, before: &HashSet<OsString>) -> Option<PathBuf> {
        std::fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| {
                is_completed_download(path)
                    && path
                        .file_name()
                        .map(|name| !before.contains(name))
                        .unwrap_or(false)
            })
    }
}

/// A finished download: right extension, not a browser partial file.
fn is_completed_download(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".crdownload") || name.ends_with(".tmp") {
        return false;
    }
    path.extension()
        .map(|ext| ext.to_ascii_lowercase() == DOWNLOAD_EXTENSION)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "declaratii-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_row() -> ResultRow {
        ResultRow {
            subject_name: "Popescu Ion".into(),
            institution: "Primaria Cluj".into(),
            position: "Consilier".into(),
            city: "Cluj-Napoca".into(),
            county: "Cluj".into(),
            declaration_date: "01.02.2023".into(),
            declaration_type: "Avere".into(),
            has_download: true,
        }
    }

    #[test]
    fn test_filename_derivation() {
        assert_eq!(
            build_filename(&sample_row()),
            "Popescu_Ion_01-02-2023_Avere.pdf"
        );
    }

    #[test]
    fn test_filename_percent_decoding() {
        let mut row = sample_row();
        row.subject_name = "%C8%98tefan Pop".into();
        assert_eq!(build_filename(&row), "Ștefan_Pop_01-02-2023_Avere.pdf");
    }

    #[test]
    fn test_collision_free_name_passes_through() {
        let dir = unique_temp_dir("free");
        let resolved = resolve_collision(&dir, "X.pdf").unwrap();
        assert_eq!(resolved, dir.join("X.pdf"));
    }

    #[test]
    fn test_collision_appends_numeric_suffix() {
        let dir = unique_temp_dir("suffix");
        std::fs::write(dir.join("X.pdf"), b"first").unwrap();
        assert_eq!(resolve_collision(&dir, "X.pdf").unwrap(), dir.join("X_1.pdf"));

        std::fs::write(dir.join("X_1.pdf"), b"second").unwrap();
        assert_eq!(resolve_collision(&dir, "X.pdf").unwrap(), dir.join("X_2.pdf"));
    }

    #[test]
    fn test_resolution_never_touches_existing_files() {
        let dir = unique_temp_dir("keep");
        std::fs::write(dir.join("X.pdf"), b"original").unwrap();

        let target = resolve_collision(&dir, "X.pdf").unwrap();
        std::fs::write(&target, b"incoming").unwrap();

        assert_eq!(std::fs::read(dir.join("X.pdf")).unwrap(), b"original");
        assert_eq!(std::fs::read(dir.join("X_1.pdf")).unwrap(), b"incoming");
    }

    #[test]
    fn test_suffix_exhaustion_is_an_error() {
        let dir = unique_temp_dir("exhaust");
        std::fs::write(dir.join("X.pdf"), b"x").unwrap();
        for n in 1..=MAX_SUFFIX_ATTEMPTS {
            std::fs::write(dir.join(format!("X_{}.pdf", n)), b"x").unwrap();
        }

        let err = resolve_collision(&dir, "X.pdf").unwrap_err();
        assert!(matches!(err, ScraperError::RenameCollisionUnresolved(_, _)));
    }

    #[test]
    fn test_snapshot_skips_partials_and_foreign_files() {
        let dir = unique_temp_dir("snapshot");
        std::fs::write(dir.join("done.pdf"), b"x").unwrap();
        std::fs::write(dir.join("partial.pdf.crdownload"), b"x").unwrap();
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let coordinator = DownloadCoordinator::new(&dir, Duration::from_secs(1));
        let names = coordinator.snapshot().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains(&OsString::from("done.pdf")));
    }

    #[tokio::test]
    async fn test_new_download_detected_against_snapshot() {
        let dir = unique_temp_dir("detect");
        std::fs::write(dir.join("old.pdf"), b"x").unwrap();

        let coordinator = DownloadCoordinator::new(&dir, Duration::from_secs(2));
        let before = coordinator.snapshot().unwrap();
        std::fs::write(dir.join("fresh.pdf"), b"x").unwrap();

        let found = coordinator.wait_for_new_download(&before).await.unwrap();
        assert_eq!(found, dir.join("fresh.pdf"));
    }

    #[tokio::test]
    async fn test_no_new_download_times_out() {
        let dir = unique_temp_dir("timeout");
        let coordinator = DownloadCoordinator::new(&dir, Duration::from_millis(20));
        let before = coordinator.snapshot().unwrap();

        let err = coordinator.wait_for_new_download(&before).await.unwrap_err();
        assert!(matches!(err, ScraperError::DownloadTimeout(_)));
    }
}
