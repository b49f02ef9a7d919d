//! Write-then-rename file creation

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Create `target` with content produced by `write`.
///
/// Content goes to a temporary file next to `target` which is synced and
/// renamed into place only when complete; an existing `target` is never
/// replaced (`AlreadyExists`). On failure the temporary file is removed.
pub fn write_new<F>(target: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_new_target_when_write_then_content_visible() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.txt");

        write_new(&target, |out| out.write_all(b"hello")).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn given_existing_target_when_write_then_already_exists_and_untouched() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.txt");
        std::fs::write(&target, "original").unwrap();

        let err = write_new(&target, |out| out.write_all(b"new")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn given_failing_writer_when_write_then_no_file_left() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.txt");

        let result = write_new(&target, |_| Err(io::Error::other("disk full")));

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
