//! Filesystem capacity of a volume directory.

use std::io;
use std::path::Path;

/// Capacity figures for one filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    /// Bytes usable by unprivileged writers.
    pub available_bytes: u64,
    /// Size of the filesystem.
    pub total_bytes: u64,
}

/// Query capacity of the filesystem holding `path`.
#[cfg(unix)]
pub fn disk_usage(path: &Path) -> io::Result<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: `c_path` is a valid null-terminated string and `stat` is a
    // zeroed out-parameter that libc::statvfs only writes to.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(io::Error::last_os_error());
        }
        let block_size = stat.f_frsize as u64;
        Ok(DiskUsage {
            available_bytes: stat.f_bavail as u64 * block_size,
            total_bytes: stat.f_blocks as u64 * block_size,
        })
    }
}

/// Capacity is unknown off unix.
#[cfg(not(unix))]
pub fn disk_usage(_path: &Path) -> io::Result<DiskUsage> {
    Ok(DiskUsage::default())
}

/// [`disk_usage`] off the async runtime.
pub async fn disk_usage_async(path: &Path) -> io::Result<DiskUsage> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || disk_usage(&path))
        .await
        .map_err(io::Error::other)?
}
