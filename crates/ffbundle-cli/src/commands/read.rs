//! Commands that only read a bundle

use anyhow::{Context, Result, bail};
use ffbundle_core::{OpenBundle, ReadOnlyBundle, ReadableBundle};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::info;

fn open(data: &Path, index: &Path) -> Result<ReadOnlyBundle> {
    OpenBundle::new(data, index)
        .read_only()
        .with_context(|| format!("Failed to open {} / {}", data.display(), index.display()))
}

/// `ffbundle list [--long]`
pub fn list(data: &Path, index: &Path, long: bool, out: &mut impl Write) -> Result<()> {
    let bundle = open(data, index)?;
    for entry in bundle.index().entries() {
        if long {
            writeln!(out, "{entry}")?;
        } else {
            writeln!(out, "{}", entry.name)?;
        }
    }
    Ok(())
}

/// `ffbundle cat <name>`
pub fn cat(data: &Path, index: &Path, name: &str, out: &mut impl Write) -> Result<()> {
    let bundle = open(data, index)?;
    let content = bundle.read(name)?;
    io::copy(&mut content.reader(), out)?;
    Ok(())
}

/// Target path for `name` below `dir`.
///
/// Names are `/`-separated; anything that would escape `dir` is refused.
pub fn target_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        bail!("refusing to extract '{name}' outside of {}", dir.display());
    }
    Ok(dir.join(relative))
}

/// `ffbundle extract <dir> [names...]`
pub fn extract(
    data: &Path,
    index: &Path,
    dir: &Path,
    names: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let bundle = open(data, index)?;
    let names: Vec<String> = if names.is_empty() {
        bundle.names().collect()
    } else {
        names.to_vec()
    };

    let mut bytes = 0u64;
    for name in &names {
        let target = target_path(dir, name)?;
        let content = bundle.read(name)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, &*content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        bytes += content.len() as u64;
    }

    info!("Extracted {} files ({} bytes)", names.len(), bytes);
    writeln!(out, "Extracted {} files into {}", names.len(), dir.display())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path_stays_inside_dir() {
        let dir = Path::new("out");
        assert_eq!(
            target_path(dir, "a/b.txt").expect("nested"),
            PathBuf::from("out/a/b.txt")
        );
        assert!(target_path(dir, "../escape").is_err());
        assert!(target_path(dir, "/etc/passwd").is_err());
        assert!(target_path(dir, "a/./b").is_ok());
    }
}
