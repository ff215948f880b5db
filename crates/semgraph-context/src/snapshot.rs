use std::path::{Path, PathBuf};

use semgraph_core::{ScgError, SnapshotFile};
use tracing::{debug, warn};

/// Maximum snapshot size to read (64 MB).
const MAX_SNAPSHOT_SIZE: u64 = 64 * 1_048_576;

/// Decodes the bytes of one snapshot file.
pub trait SnapshotDecoder {
    /// Decode a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the bytes are not a valid snapshot.
    fn decode(&self, bytes: &[u8]) -> Result<SnapshotFile, ScgError>;
}

/// Decoder for JSON-encoded snapshots with camelCase keys.
///
/// # Examples
///
/// ```
/// use semgraph_context::snapshot::{JsonSnapshotDecoder, SnapshotDecoder};
///
/// let bytes = br#"{"uri": "A.java", "nodes": [{"id": "A", "kind": "CLASS"}]}"#;
/// let snapshot = JsonSnapshotDecoder.decode(bytes).unwrap();
/// assert_eq!(snapshot.nodes.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSnapshotDecoder;

impl SnapshotDecoder for JsonSnapshotDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SnapshotFile, ScgError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Lazily reads and decodes the snapshots found by [`read_snapshot_dir`].
///
/// Yields one result per file so callers can skip the broken ones.
pub struct SnapshotReader<'a> {
    root: PathBuf,
    paths: std::vec::IntoIter<PathBuf>,
    decoder: &'a dyn SnapshotDecoder,
}

impl SnapshotReader<'_> {
    /// Number of snapshot files not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    fn read_one(&self, path: &Path) -> Result<SnapshotFile, ScgError> {
        let wrap = |message: String| ScgError::Snapshot {
            path: path.to_path_buf(),
            message,
        };

        let metadata = std::fs::metadata(path).map_err(|e| wrap(e.to_string()))?;
        if metadata.len() > MAX_SNAPSHOT_SIZE {
            return Err(wrap(format!("file exceeds {MAX_SNAPSHOT_SIZE} bytes")));
        }

        let bytes = std::fs::read(path).map_err(|e| wrap(e.to_string()))?;
        let mut snapshot = self.decoder.decode(&bytes).map_err(|e| wrap(e.to_string()))?;

        if snapshot.uri.is_empty() {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            snapshot.uri = relative.to_string_lossy().into_owned();
        }
        Ok(snapshot)
    }
}

impl Iterator for SnapshotReader<'_> {
    type Item = Result<SnapshotFile, ScgError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        debug!("reading snapshot {}", path.display());
        Some(self.read_one(&path))
    }
}

/// Find every snapshot under `dir` whose file name ends in `.{extension}`.
///
/// Hidden directories are walked and ignore files are not honored, since
/// snapshot trees usually live under a dot-directory. Paths come back sorted
/// so loads are reproducible.
///
/// # Errors
///
/// Returns [`ScgError::FileNotFound`] if `dir` does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use semgraph_context::snapshot::{read_snapshot_dir, JsonSnapshotDecoder};
///
/// let reader = read_snapshot_dir(Path::new("data/glide/.semanticgraphs"), "json", &JsonSnapshotDecoder).unwrap();
/// for snapshot in reader.flatten() {
///     println!("{}: {} nodes", snapshot.uri, snapshot.nodes.len());
/// }
/// ```
pub fn read_snapshot_dir<'a>(
    dir: &Path,
    extension: &str,
    decoder: &'a dyn SnapshotDecoder,
) -> Result<SnapshotReader<'a>, ScgError> {
    if !dir.is_dir() {
        return Err(ScgError::FileNotFound(dir.to_path_buf()));
    }

    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let walker = ignore::WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("cannot walk snapshot directory entry: {e}");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix));
        if matches {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    Ok(SnapshotReader {
        root: dir.to_path_buf(),
        paths: paths.into_iter(),
        decoder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_snapshot_dir(&dir.path().join("absent"), "json", &JsonSnapshotDecoder);
        assert!(matches!(result, Err(ScgError::FileNotFound(_))));
    }

    #[test]
    fn reads_nested_snapshots_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/Two.java.json", r#"{"uri": "Two.java", "nodes": []}"#);
        write(dir.path(), "a/One.java.json", r#"{"uri": "One.java", "nodes": []}"#);
        write(dir.path(), "notes.txt", "not a snapshot");

        let reader = read_snapshot_dir(dir.path(), "json", &JsonSnapshotDecoder).unwrap();
        assert_eq!(reader.remaining(), 2);
        let uris: Vec<String> = reader.map(|s| s.unwrap().uri).collect();
        assert_eq!(uris, vec!["One.java", "Two.java"]);
    }

    #[test]
    fn walks_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            ".semanticgraphs/Main.java.json",
            r#"{"uri": "Main.java", "nodes": [{"id": "Main"}]}"#,
        );
        let reader = read_snapshot_dir(dir.path(), "json", &JsonSnapshotDecoder).unwrap();
        let snapshots: Vec<_> = reader.collect();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].is_ok());
    }

    #[test]
    fn malformed_file_yields_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Bad.java.json", "{ not json");

        let mut reader = read_snapshot_dir(dir.path(), "json", &JsonSnapshotDecoder).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        match err {
            ScgError::Snapshot { path, .. } => assert!(path.ends_with("Bad.java.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_uri_filled_from_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pkg/Util.java.json", r#"{"nodes": []}"#);

        let mut reader = read_snapshot_dir(dir.path(), ".json", &JsonSnapshotDecoder).unwrap();
        let snapshot = reader.next().unwrap().unwrap();
        assert_eq!(
            PathBuf::from(snapshot.uri),
            PathBuf::from("pkg").join("Util.java.json")
        );
    }
}
