use crate::LedgerError;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// Read the whole ledger file. The file has to exist, be a regular file and be
/// writable, since the session is going to replace it later on.
pub fn load(path: &Path) -> Result<String, LedgerError> {
    if !fs::metadata(path)?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("`{}' is not a regular file", path.display()),
        )
        .into());
    }

    let mut content = String::new();
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)?
        .read_to_string(&mut content)?;
    debug!(path = %path.display(), bytes = content.len(), "ledger loaded");
    Ok(content)
}

/// Atomically replace the ledger file with `content`.
///
/// The new content goes to a temporary file next to the target which is then
/// renamed over it, so readers see either the old or the new file. Symlinks
/// are followed and the original permissions are kept.
pub fn replace(path: &Path, content: &str) -> Result<(), LedgerError> {
    let target = fs::canonicalize(path)?;
    let permissions = fs::metadata(&target)?.permissions();
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    fs::set_permissions(file.path(), permissions)?;
    file.as_file().sync_all()?;
    file.persist(&target).map_err(|err| err.error)?;

    info!(path = %target.display(), bytes = content.len(), "ledger saved");
    Ok(())
}
