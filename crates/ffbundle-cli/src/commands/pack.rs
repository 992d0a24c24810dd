use anyhow::{Context, Result};
use ffbundle_core::pack::pack_directory;
use ffbundle_core::{OpenBundle, WritableBundle};
use std::io::Write;
use std::path::Path;

/// `ffbundle pack <dir> [--sort]`
pub fn run(data: &Path, index: &Path, dir: &Path, sort: bool, out: &mut impl Write) -> Result<()> {
    let bundle = OpenBundle::new(data, index)
        .read_write()
        .with_context(|| format!("Failed to open {}", data.display()))?;

    let stats = pack_directory(&bundle, dir)
        .with_context(|| format!("Failed to pack {}", dir.display()))?;
    if sort {
        bundle.sort_index().context("Failed to sort index")?;
    }
    bundle.close()?;

    writeln!(
        out,
        "Packed {} files ({} bytes) into {}",
        stats.files,
        stats.bytes,
        data.display()
    )?;
    Ok(())
}
