use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Exclusive, non-blocking run lock backed by `flock(2)`.
///
/// The lock file carries no content; it exists purely as the mutual-exclusion
/// handle. Held for the run's lifetime and released on drop (the kernel also
/// releases it if the process dies).
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to acquire the lock. Returns `None` when another run holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<RunLock>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;

        let fd = file.as_raw_fd();
        // SAFETY: flock is a standard POSIX call on a valid, owned fd.
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            return Ok(Some(RunLock {
                file,
                path: path.to_path_buf(),
            }));
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            return Ok(None);
        }
        Err(err).with_context(|| format!("flock failed on {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        // SAFETY: unlocking an fd we still own; failure leaves release to close().
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}
