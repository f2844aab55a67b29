use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::{LockGuard, LockManager};
use crate::constants::LOCK_POLL_MS;
use crate::types::errors::{Error, ErrorKind, Result};

/// Advisory exclusive lock on a well-known file.
///
/// The holder writes its pid into the file so a contending run can name it.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Error::io("create lock dir", dir, &e))?;
        }
        // Never truncate on open: the current holder's pid lives in the file.
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error::io("open lock", &self.path, &e))
    }
}

struct HeldLock {
    file: File,
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = self.file.unlock();
    }
}

impl LockGuard for HeldLock {}

fn stamp_pid(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.sync_data()
}

fn holder_pid(file: &mut File) -> Option<u32> {
    let mut buf = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut buf).ok()?;
    buf.trim().parse().ok()
}

impl LockManager for FileLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let mut file = self.open()?;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while file.try_lock_exclusive().is_err() {
            if Instant::now() >= deadline {
                let holder = holder_pid(&mut file)
                    .map_or_else(|| "unknown pid".to_string(), |p| format!("pid {p}"));
                return Err(Error::new(
                    ErrorKind::Locking,
                    format!(
                        "run lock {} held by {holder}; gave up after {timeout_ms} ms",
                        self.path.display()
                    ),
                ));
            }
            thread::sleep(Duration::from_millis(LOCK_POLL_MS));
        }
        stamp_pid(&mut file).map_err(|e| Error::io("write lock owner", &self.path, &e))?;
        Ok(Box::new(HeldLock { file }))
    }
}
