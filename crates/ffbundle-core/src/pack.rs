//! Bulk population of a bundle from a directory tree

use crate::bundle::WritableBundle;
use crate::{BundleError, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of a [`pack_directory`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    /// Files written
    pub files: usize,
    /// Payload bytes written, sentinels excluded
    pub bytes: u64,
}

/// Bundle name of `path` relative to `root`: its components joined by `/`.
pub fn name_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| BundleError::Pack {
        path: path.to_path_buf(),
        reason: format!("not below {}", root.display()),
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| BundleError::Pack {
                    path: path.to_path_buf(),
                    reason: "path is not valid UTF-8".to_string(),
                })?;
                parts.push(part);
            }
            _ => {
                return Err(BundleError::Pack {
                    path: path.to_path_buf(),
                    reason: "unexpected path component".to_string(),
                });
            }
        }
    }
    Ok(parts.join("/"))
}

/// Regular files below `root`, sorted by file name at each level.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| BundleError::Pack {
            path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn pack_file<B: WritableBundle>(bundle: &B, root: &Path, path: &Path) -> Result<u64> {
    let name = name_for(root, path)?;
    let content = std::fs::read(path)?;
    bundle.write(&name, &content)?;
    Ok(content.len() as u64)
}

/// Write every regular file below `root` into `bundle`.
///
/// Each file is stored under its path relative to `root`, with `/` as the
/// separator on every platform. Files are visited in sorted order; with the
/// `parallel` feature they are read concurrently and written in whatever
/// order the reads complete. The first failure stops the run, and files
/// written before it stay in the bundle.
pub fn pack_directory<B: WritableBundle + Sync>(bundle: &B, root: &Path) -> Result<PackStats> {
    let files = collect_files(root)?;
    debug!("Packing {} files from {}", files.len(), root.display());

    #[cfg(feature = "parallel")]
    let bytes = files
        .par_iter()
        .map(|path| pack_file(bundle, root, path))
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    #[cfg(not(feature = "parallel"))]
    let bytes = files
        .iter()
        .map(|path| pack_file(bundle, root, path))
        .sum::<Result<u64>>()?;

    let stats = PackStats {
        files: files.len(),
        bytes,
    };
    info!(
        "Packed {} files ({} bytes) from {}",
        stats.files,
        stats.bytes,
        root.display()
    );
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{OpenBundle, ReadableBundle};
    use tempfile::tempdir;

    #[test]
    fn test_name_for_uses_forward_slashes() {
        let root = Path::new("root");
        let path = root.join("a").join("b").join("c.txt");
        assert_eq!(name_for(root, &path).expect("name"), "a/b/c.txt");
    }

    #[test]
    fn test_name_for_rejects_paths_outside_root() {
        let err = name_for(Path::new("root"), Path::new("elsewhere/x")).expect_err("outside");
        assert!(matches!(err, BundleError::Pack { .. }));
    }

    #[test]
    fn test_pack_directory() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("tree");
        std::fs::create_dir_all(root.join("sub/deeper")).expect("mkdir");
        std::fs::write(root.join("top.txt"), "top").expect("write");
        std::fs::write(root.join("sub/one.txt"), "one").expect("write");
        std::fs::write(root.join("sub/deeper/two.txt"), "two!").expect("write");
        std::fs::write(root.join("sub/empty"), "").expect("write");

        let bundle = OpenBundle::new(dir.path().join("t.data"), dir.path().join("t.ffindex"))
            .read_write()
            .expect("open");
        let stats = pack_directory(&bundle, &root).expect("pack");

        assert_eq!(stats, PackStats { files: 4, bytes: 10 });
        assert_eq!(bundle.count(), 4);
        assert_eq!(bundle.read("top.txt").expect("read").as_str(), Ok("top"));
        assert_eq!(bundle.read("sub/deeper/two.txt").expect("read").as_str(), Ok("two!"));
        assert!(bundle.read("sub/empty").expect("read").is_empty());
        assert!(!bundle.contains("sub"));
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_pack_order_is_sorted() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("tree");
        std::fs::create_dir_all(root.join("b")).expect("mkdir");
        std::fs::write(root.join("c"), "c").expect("write");
        std::fs::write(root.join("a"), "a").expect("write");
        std::fs::write(root.join("b/x"), "x").expect("write");

        let bundle = OpenBundle::new(dir.path().join("t.data"), dir.path().join("t.ffindex"))
            .read_write()
            .expect("open");
        pack_directory(&bundle, &root).expect("pack");

        assert_eq!(bundle.names().collect::<Vec<_>>(), vec!["a", "b/x", "c"]);
    }

    #[test]
    fn test_packing_twice_reports_duplicate() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("tree");
        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(root.join("a"), "a").expect("write");

        let bundle = OpenBundle::new(dir.path().join("t.data"), dir.path().join("t.ffindex"))
            .read_write()
            .expect("open");
        pack_directory(&bundle, &root).expect("first pack");
        let err = pack_directory(&bundle, &root).expect_err("second pack");
        assert!(err.is_duplicate());
    }
}
