//! Results-bundle staging — best-effort copy of prior evaluation outputs.
//!
//! The bundle layout is owned by the harness and copied verbatim; this layer
//! never parses it. A missing bundle only misses an optimization.

use std::path::Path;

use anyhow::{Context, Result};

/// File-name prefix matched when staging prior results from the build context.
pub const RESULTS_BUNDLE_PREFIX: &str = "euroeval_benchmark_results";

/// Copy every top-level entry of `context` whose name starts with
/// [`RESULTS_BUNDLE_PREFIX`] into `workdir`. Directories are copied
/// recursively, files byte-for-byte.
///
/// Returns the number of entries staged. Zero matches is success — the
/// pattern may legitimately match nothing.
///
/// # Errors
///
/// Returns an error if the context directory does not exist or a matched
/// entry cannot be copied.
pub fn stage(context: &Path, workdir: &Path) -> Result<usize> {
    anyhow::ensure!(
        context.is_dir(),
        "build context {} is not a directory",
        context.display()
    );
    std::fs::create_dir_all(workdir)
        .with_context(|| format!("creating workdir {}", workdir.display()))?;

    let mut staged = 0;
    for entry in std::fs::read_dir(context)
        .with_context(|| format!("reading build context {}", context.display()))?
    {
        let entry = entry.context("reading dir entry")?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.starts_with(RESULTS_BUNDLE_PREFIX) {
            continue;
        }
        let src = entry.path();
        let dest = workdir.join(name);
        if src.is_dir() {
            copy_dir(&src, &dest)?;
        } else {
            std::fs::copy(&src, &dest)
                .with_context(|| format!("copying {} to {}", src.display(), dest.display()))?;
        }
        staged += 1;
    }
    Ok(staged)
}

/// Recursively copy a directory tree.
fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("creating directory {}", dest.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.context("reading dir entry")?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)
                .with_context(|| format!("copying {} to {}", path.display(), target.display()))?;
        }
    }
    Ok(())
}
