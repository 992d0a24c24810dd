use anyhow::{Context, Result};
use ffbundle_core::{OpenBundle, WritableBundle};
use std::io::Write;
use std::path::Path;

/// `ffbundle add <name> <file>`
pub fn add(data: &Path, index: &Path, name: &str, file: &Path, out: &mut impl Write) -> Result<()> {
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let bundle = OpenBundle::new(data, index)
        .read_write()
        .with_context(|| format!("Failed to open {}", data.display()))?;
    let cursor = bundle.write(name, &content)?;
    bundle.close()?;

    writeln!(out, "Added '{name}' ({} bytes), data now {cursor} bytes", content.len())?;
    Ok(())
}
