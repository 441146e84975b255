use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::domain::Plan;

/// Writes the markdown rendering of a plan to `writer`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write<W: Write>(plan: &Plan, writer: &mut W) -> io::Result<()> {
    write!(writer, "{}", plan.display())
}

/// Writes the markdown rendering of a plan to a file.
///
/// Parent directories are created if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn save(plan: &Plan, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write(plan, &mut writer)?;
    writer.flush()
}
