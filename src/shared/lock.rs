use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;

// Exclusive OS file lock held for the lifetime of an installer run.
// Two installers writing into the same virtual environment corrupt it.
pub struct InstallLock {
    file: File,
}

impl InstallLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating lock directory failed: {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening lock file failed: {}", path.display()))?;

        if let Err(err) = file.try_lock_exclusive() {
            let holder = fs::read_to_string(path)
                .ok()
                .map(|contents| contents.trim().to_string())
                .filter(|pid| !pid.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(err).with_context(|| {
                format!(
                    "another installation is already running (pid {holder}): {}",
                    path.display()
                )
            });
        }

        // Record the holder so a refused run can say who to wait for.
        file.set_len(0)
            .and_then(|()| writeln!(file, "{}", process::id()))
            .and_then(|()| file.flush())
            .with_context(|| format!("writing lock file failed: {}", path.display()))?;

        Ok(Self { file })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
