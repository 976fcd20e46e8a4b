use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::SessionStoreError;

pub const SESSION_DIR: [&str; 2] = [".agent", "sessions"];
pub const SESSION_EXTENSION: &str = "hjl";

#[must_use]
pub fn session_root(cwd: &Path) -> PathBuf {
    cwd.join(SESSION_DIR[0]).join(SESSION_DIR[1])
}

#[must_use]
pub fn sanitize_timestamp_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            _ => c,
        })
        .collect()
}

#[must_use]
pub fn session_file_name(created_at: &str, session_id: &str) -> String {
    format!(
        "{}_{}.{SESSION_EXTENSION}",
        sanitize_timestamp_for_filename(created_at),
        session_id
    )
}

/// Newest session file under `root`.
///
/// Files are ordered by the creation timestamp leading their names, then by
/// name. RFC 3339 fractions vary in width, so plain name order is not enough.
pub fn latest_session(root: &Path) -> Result<PathBuf, SessionStoreError> {
    let entries = fs::read_dir(root)
        .map_err(|source| SessionStoreError::io("listing session directory", root, source))?;

    let mut latest: Option<(Option<OffsetDateTime>, PathBuf)> = None;
    for entry in entries {
        let path = entry
            .map_err(|source| SessionStoreError::io("listing session directory", root, source))?
            .path();
        let is_session = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(SESSION_EXTENSION);
        if !is_session {
            continue;
        }
        let candidate = (file_timestamp(&path), path);
        if latest.as_ref().map_or(true, |current| candidate > *current) {
            latest = Some(candidate);
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| SessionStoreError::NoSessionsFound {
            root: root.to_path_buf(),
        })
}

/// Creation time encoded in a name produced by [`session_file_name`].
fn file_timestamp(path: &Path) -> Option<OffsetDateTime> {
    let stem = path.file_stem()?.to_str()?;
    let (timestamp, _) = stem.split_once('_')?;
    let (date, time_of_day) = timestamp.split_once('T')?;
    let restored = format!("{date}T{}", time_of_day.replace('-', ":"));
    OffsetDateTime::parse(&restored, &Rfc3339).ok()
}
