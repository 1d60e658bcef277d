use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use crate::content::{self, Content};
use crate::context::Context;
use crate::driver;
use crate::error::DeviceError;
use crate::serial;
use crate::symlink;

pub const LSBLK: &str = "lsblk";

/// Minors reserved per disk for the disk itself and its partitions
pub const MINORS_PER_DISK: u64 = 16;

/// A validated block device node.
///
/// Only the canonical path and the major/minor pair are fixed at
/// construction. Every other attribute is looked up again on each call.
#[derive(Debug, Clone)]
pub struct Device {
    path: PathBuf,
    major: u64,
    minor: u64,
    ctx: Context,
}

impl Device {
    pub fn from_path(device_path: &Path) -> Result<Device, DeviceError> {
        Self::from_path_with(device_path, Context::default())
    }

    pub fn from_path_with(device_path: &Path, ctx: Context) -> Result<Device, DeviceError> {
        let metadata = fs::metadata(device_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeviceError::NotFound(device_path.to_path_buf()),
            _ => DeviceError::io(device_path, e),
        })?;

        if !metadata.file_type().is_block_device() {
            return Err(DeviceError::NotABlockDevice(device_path.to_path_buf()));
        }

        let path = fs::canonicalize(device_path).map_err(|e| DeviceError::io(device_path, e))?;
        Ok(Self::from_rdev(path, metadata.rdev(), ctx))
    }

    /// Classic 8-bit minor encoding. Extended-minor devices decode wrongly.
    pub(crate) fn from_rdev(path: PathBuf, rdev: u64, ctx: Context) -> Device {
        Device {
            path,
            major: rdev / 256,
            minor: rdev % 256,
            ctx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn short_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Partition number, 0 for a whole disk. Assumes 16 minors per disk,
    /// which does not hold for NVMe.
    pub fn partition_number(&self) -> u64 {
        self.minor % MINORS_PER_DISK
    }

    pub fn driver(&self) -> Result<Option<String>, DeviceError> {
        driver::resolve(&self.ctx.paths.proc_devices, self.major)
    }

    pub fn serial(&self) -> Result<Option<String>, DeviceError> {
        let driver = self.driver()?;
        serial::resolve(self, driver.as_deref())
    }

    pub fn is_blank(&self) -> Option<bool> {
        content::is_blank(&self.path)
    }

    pub fn content(&self) -> Content {
        content::classify(self)
    }

    pub fn symlink(&self) -> Option<String> {
        symlink::first_external(self)
    }

    /// Human readable size as printed by lsblk, e.g. `20G`
    pub fn size(&self) -> Option<String> {
        self.lsblk_column("size")
    }

    /// Device type as printed by lsblk: `disk`, `part`, `lvm`, ...
    pub fn disk_type(&self) -> Option<String> {
        self.lsblk_column("type")
    }

    fn lsblk_column(&self, column: &str) -> Option<String> {
        let path = self.path.to_string_lossy().into_owned();
        let out = self.ctx.execute(&[LSBLK, "-ndo", column, path.as_str()]);
        let value = out.trim();
        if value.is_empty() { None } else { Some(value.to_string()) }
    }

    /// SCSI address (`[h:c:t:l]`) of a SCSI disk, taken from its bsg node
    pub fn scsi_address(&self) -> Result<Option<String>, DeviceError> {
        if self.driver()?.as_deref() != Some("sd") {
            return Ok(None);
        }

        let bsg = self.ctx.paths.sys_block.join(self.short_name()).join("device/bsg");
        let mut entries: Vec<String> = fs::read_dir(&bsg)
            .map_err(|e| DeviceError::io(&bsg, e))?
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        entries.sort();

        Ok(entries.into_iter().next().map(|hctl| format!("[{}]", hctl)))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = self.driver().ok().flatten();
        write!(
            f,
            "{} {} {}-{}",
            self.path.display(),
            driver.as_deref().unwrap_or("-"),
            self.major,
            self.minor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedRunner;
    use crate::context::SysPaths;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fake_host(dir: &TempDir) -> SysPaths {
        let proc_devices = dir.path().join("devices");
        fs::write(&proc_devices, "Character devices:\n  1 mem\n\nBlock devices:\n  8 sd\n253 virtblk\n").unwrap();
        let sys_block = dir.path().join("block");
        fs::create_dir_all(&sys_block).unwrap();
        SysPaths { proc_devices, sys_block, scsi_host: dir.path().join("scsi_host") }
    }

    fn any_block_device() -> Option<PathBuf> {
        fs::read_dir("/dev")
            .ok()?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .find(|p| {
                fs::metadata(p)
                    .map(|m| m.file_type().is_block_device())
                    .unwrap_or(false)
            })
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Device::from_path(&dir.path().join("sdz")).unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }

    #[test]
    fn test_regular_file_is_not_a_block_device() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("disk.img");
        fs::write(&file, vec![0u8; 4096]).unwrap();

        assert!(matches!(Device::from_path(&file), Err(DeviceError::NotABlockDevice(_))));
        assert!(matches!(Device::from_path(dir.path()), Err(DeviceError::NotABlockDevice(_))));
    }

    #[test]
    fn test_char_device_is_not_a_block_device() {
        let err = Device::from_path(Path::new("/dev/null")).unwrap_err();
        assert!(matches!(err, DeviceError::NotABlockDevice(_)));
    }

    #[test]
    fn test_major_minor_from_real_device() {
        // Containers often expose no block devices at all
        let Some(path) = any_block_device() else {
            eprintln!("test_major_minor_from_real_device skipped: no block device under /dev");
            return;
        };
        let rdev = fs::metadata(&path).unwrap().rdev();

        let dev = Device::from_path(&path).unwrap();
        assert_eq!(dev.major(), rdev / 256);
        assert_eq!(dev.minor(), rdev % 256);
        assert_eq!(dev.path(), fs::canonicalize(&path).unwrap());
    }

    #[test]
    fn test_rdev_decoding() {
        let dev = Device::from_rdev(PathBuf::from("/dev/sdb3"), 8 * 256 + 19, Context::default());
        assert_eq!(dev.major(), 8);
        assert_eq!(dev.minor(), 19);
        assert_eq!(dev.partition_number(), 3);
        assert_eq!(dev.short_name(), "sdb3");
    }

    #[test]
    fn test_wide_rdev_is_not_truncated() {
        let rdev = (1u64 << 40) + 7;
        let dev = Device::from_rdev(PathBuf::from("/dev/wide"), rdev, Context::default());
        assert_eq!(dev.major(), rdev / 256);
        assert_eq!(dev.major(), 1u64 << 32);
        assert_eq!(dev.minor(), 7);
    }

    #[test]
    fn test_partition_number_is_minor_mod_16() {
        for minor in [0u64, 1, 15, 16, 17, 31, 32, 255] {
            let dev = Device::from_rdev(PathBuf::from("/dev/sdx"), 8 * 256 + minor, Context::default());
            assert_eq!(dev.partition_number(), minor % 16);
        }
    }

    #[test]
    fn test_driver_and_serial_follow_table() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new().with(crate::serial::SCSI_ID, "SATA_disk_1\n"));
        let ctx = Context::new(runner.clone(), fake_host(&dir));

        let sda = Device::from_rdev(PathBuf::from("/dev/sda"), 8 * 256, ctx.clone());
        assert_eq!(sda.driver().unwrap().as_deref(), Some("sd"));
        assert_eq!(sda.serial().unwrap().as_deref(), Some("SATA_disk_1"));
        assert_eq!(sda.to_string(), "/dev/sda sd 8-0");

        let vda = Device::from_rdev(PathBuf::from("/dev/vda"), 253 * 256, ctx.clone());
        assert_eq!(vda.serial().unwrap(), None);

        let loop0 = Device::from_rdev(PathBuf::from("/dev/loop0"), 7 * 256, ctx);
        assert_eq!(loop0.driver().unwrap(), None);
        assert_eq!(loop0.to_string(), "/dev/loop0 - 7-0");
    }

    #[test]
    fn test_lsblk_columns() {
        let runner = Arc::new(ScriptedRunner::new().with(LSBLK, "  20G\n"));
        let dev = Device::from_rdev(PathBuf::from("/dev/sdc"), 8 * 256 + 32, Context::new(runner.clone(), SysPaths::default()));

        assert_eq!(dev.size().as_deref(), Some("20G"));
        assert_eq!(runner.calls(), vec![vec![LSBLK, "-ndo", "size", "/dev/sdc"]]);
    }

    #[test]
    fn test_scsi_address() {
        let dir = TempDir::new().unwrap();
        let paths = fake_host(&dir);
        fs::create_dir_all(paths.sys_block.join("sda/device/bsg/2:0:0:0")).unwrap();
        let ctx = Context::new(Arc::new(ScriptedRunner::new()), paths);

        let sda = Device::from_rdev(PathBuf::from("/dev/sda"), 8 * 256, ctx.clone());
        assert_eq!(sda.scsi_address().unwrap().as_deref(), Some("[2:0:0:0]"));

        let vda = Device::from_rdev(PathBuf::from("/dev/vda"), 253 * 256, ctx);
        assert_eq!(vda.scsi_address().unwrap(), None);
    }
}
