// file: src/utils/system.rs
// version: 1.2.1
// guid: 94d63a08-b1c7-4f52-8e19-7a05f4c2d680

//! System utility functions

use crate::Result;
use sysinfo::{Disks, System};
use tracing::debug;

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Check if running as root
    pub fn is_root() -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::getuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Total host memory in MiB
    pub fn total_memory_mib() -> u64 {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.total_memory() / (1024 * 1024)
    }

    /// Total size of the filesystem holding the workload volume root, in MiB
    ///
    /// Picks the mounted disk with the longest mount-point prefix of `path`
    /// so /var/lib on its own partition is measured, not the root disk.
    pub fn total_disk_mib(path: &str) -> u64 {
        let disks = Disks::new_with_refreshed_list();
        let mut best: Option<(usize, u64)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point().to_string_lossy().to_string();
            if path.starts_with(&mount) {
                let depth = mount.len();
                if best.map(|(d, _)| depth > d).unwrap_or(true) {
                    best = Some((depth, disk.total_space() / (1024 * 1024)));
                }
            }
        }
        best.map(|(_, space)| space).unwrap_or(0)
    }

    /// Write a file with the given octal mode
    pub async fn write_file_with_mode(path: &str, content: &str, mode: u32) -> Result<()> {
        tokio::fs::write(path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tokio::fs::metadata(path).await?.permissions();
            perms.set_mode(mode);
            tokio::fs::set_permissions(path, perms).await?;
        }

        debug!("Wrote {} (mode {:o})", path, mode);
        Ok(())
    }
}
