use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::error::Result;

/// Write `path` atomically: `body` fills a hidden tmp file next to it, which is
/// then renamed over the target. If `body` fails the target is left as it was.
pub fn write_atomic<P, F>(path: P, body: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut staged = StagedWrites::new();
    staged.stage(path, body)?;
    staged.commit()
}

/// A group of files written to tmp paths first and renamed into place together.
///
/// Nothing is renamed until `commit`; dropping an uncommitted group removes its
/// tmp files and leaves every target as it was.
#[derive(Debug, Default)]
pub struct StagedWrites {
    // (tmp, target)
    pending: Vec<(PathBuf, PathBuf)>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Fill the tmp file for `path` with `body`. On failure the tmp file is
    /// removed; files staged earlier stay pending.
    pub fn stage<P, F>(&mut self, path: P, body: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let path = path.as_ref();
        let tmp_path = tmp_path_for(path);

        let file = File::create(&tmp_path).map_err(|e| {
            io::Error::new(e.kind(), format!("creating {:?}: {}", tmp_path, e))
        })?;
        let mut writer = BufWriter::new(file);

        let written = body(&mut writer).and_then(|_| writer.flush().map_err(Into::into));
        drop(writer);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        self.pending.push((tmp_path, path.to_path_buf()));
        Ok(())
    }

    /// Rename every staged file over its target, in staging order.
    pub fn commit(mut self) -> Result<()> {
        while !self.pending.is_empty() {
            let (tmp_path, path) = self.pending.remove(0);
            if let Err(e) = fs::rename(&tmp_path, &path) {
                let _ = fs::remove_file(&tmp_path);
                return Err(io::Error::new(
                    e.kind(),
                    format!("renaming {:?} -> {:?}: {}", tmp_path, path, e),
                )
                .into());
            }
        }
        Ok(())
    }
}

impl Drop for StagedWrites {
    fn drop(&mut self) {
        for (tmp_path, _) in self.pending.drain(..) {
            let _ = fs::remove_file(&tmp_path);
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
