use std::{
    io,
    path::{Path, PathBuf},
};

/// Regular files in `dir` with extension `ext`, oldest first.
///
/// Artifact names embed a sortable timestamp, so ascending lower-cased name
/// order is chronological. A missing directory is simply empty.
pub(crate) async fn list_sorted(dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }

    found.sort_by_cached_key(|p| sort_key(p));
    Ok(found)
}

/// `{artifact}.json` next to the artifact.
pub(crate) fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

fn sort_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_matching_files_oldest_first() {
        let dir = TempDir::new().unwrap();
        for name in [
            "video-before-20240101000500.mp4",
            "VIDEO-before-20240101000000.mp4",
            "video-before-20240101000000.mp4.json",
            "clip.h264",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let names: Vec<_> = list_sorted(dir.path(), "mp4")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "VIDEO-before-20240101000000.mp4",
                "video-before-20240101000500.mp4"
            ]
        );
    }

    #[tokio::test]
    async fn missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_sorted(&dir.path().join("absent"), "log").await.unwrap().is_empty());
    }

    #[test]
    fn sidecar_appends_json() {
        assert_eq!(
            sidecar_path(Path::new("/data/videos/a.mp4")),
            PathBuf::from("/data/videos/a.mp4.json")
        );
    }
}
