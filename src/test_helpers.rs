//! Test fixtures: a rotatable follow target in its own temp directory,
//! manipulated the way an external logger and rotation tool would be.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::platform;

/// Scale factor for poll durations, read from `TAIL_TEST_TIME_FACTOR`.
/// Lets slow CI hosts stretch every schedule uniformly.
pub fn time_factor() -> f64 {
    std::env::var("TAIL_TEST_TIME_FACTOR")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1.0)
}

pub fn poll_delay() -> Duration {
    Duration::from_millis(100).mul_f64(time_factor())
}

pub fn poll_timeout() -> Duration {
    Duration::from_millis(500).mul_f64(time_factor())
}

/// The followed target file. The fixture holds a writer handle the way a
/// logging process would: renaming or unlinking the path leaves the
/// handle connected to the old inode, so tests can exercise the drain
/// guarantee across rotation.
pub struct TailTarget {
    dir: TempDir,
    path: PathBuf,
    writer: Option<File>,
    rotated: u32,
}

impl TailTarget {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("target.log");
        let writer = platform::create_file(&path).expect("create target");
        Self {
            dir,
            path,
            writer: Some(writer),
            rotated: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends through the currently held writer handle and flushes.
    pub fn write(&mut self, data: &str) {
        let writer = self.writer.as_mut().expect("no writer handle");
        writer.write_all(data.as_bytes()).expect("write target");
        writer.flush().expect("flush target");
    }

    /// Hands over the writer handle, e.g. to keep appending to a renamed
    /// inode after `create` has replaced the path.
    pub fn take_writer(&mut self) -> File {
        self.writer.take().expect("no writer handle")
    }

    /// Unlinks the path. The writer handle stays connected to the inode.
    pub fn remove(&mut self) {
        fs::remove_file(&self.path).expect("remove target");
    }

    /// Renames the target aside. The writer handle follows the old inode.
    pub fn rename(&mut self) {
        let aside = self.dir.path().join(format!("target.log.{}", self.rotated));
        self.rotated += 1;
        fs::rename(&self.path, aside).expect("rename target");
    }

    /// Creates a fresh file at the target path; writes go there from now
    /// on.
    pub fn create(&mut self) {
        self.writer = Some(platform::create_file(&self.path).expect("recreate target"));
    }

    #[cfg(unix)]
    pub fn create_fifo(&mut self) {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let cpath = CString::new(self.path.as_os_str().as_bytes()).expect("path contains NUL");
        let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) };
        assert_eq!(rc, 0, "mkfifo: {}", std::io::Error::last_os_error());

        // Read/write keeps the FIFO open without blocking on a peer.
        let writer = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .expect("open fifo");
        self.writer = Some(writer);
    }

    /// Creates a symlink to the target and returns the link path; follow
    /// the link to exercise resolution through it.
    #[cfg(unix)]
    pub fn create_symlink(&mut self) -> PathBuf {
        let link = self.dir.path().join("target.link");
        std::os::unix::fs::symlink(&self.path, &link).expect("create symlink");
        link
    }

    #[cfg(unix)]
    pub fn remove_symlink(&self, link: &Path) {
        fs::remove_file(link).expect("remove symlink");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_creation() {
        let target = TailTarget::new();
        assert!(target.path().exists());
    }

    #[test]
    fn test_append_through_writer() {
        let mut target = TailTarget::new();
        target.write("line 1\n");
        target.write("line 2\n");

        let content = fs::read_to_string(target.path()).unwrap();
        assert_eq!(content, "line 1\nline 2\n");
    }

    #[test]
    fn test_rename_keeps_writer_on_old_inode() {
        let mut target = TailTarget::new();
        target.write("before\n");
        target.rename();
        target.write("after\n");

        assert!(!target.path().exists());
        let aside = target.dir.path().join("target.log.0");
        assert_eq!(fs::read_to_string(aside).unwrap(), "before\nafter\n");
    }

    #[test]
    fn test_recreate_switches_writer() {
        let mut target = TailTarget::new();
        target.write("old\n");
        target.rename();
        target.create();
        target.write("new\n");

        assert_eq!(fs::read_to_string(target.path()).unwrap(), "new\n");
    }

    #[test]
    fn test_time_factor_defaults_to_one() {
        assert!(poll_delay() <= poll_timeout());
    }
}
