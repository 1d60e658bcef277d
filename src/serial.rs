use std::fs;

use crate::device::Device;
use crate::error::DeviceError;

pub const SCSI_ID: &str = "/lib/udev/scsi_id";
pub const DMSETUP: &str = "dmsetup";
pub const SCALEIO_DRV_CFG: &str = "/bin/emc/scaleio/drv_cfg";
pub const POWERMT: &str = "/sbin/powermt";

/// How an identity string is obtained, one variant per driver family.
///
/// The "serial" is whatever stable name the driver family offers: a SCSI
/// unique id, a WWID, a device-mapper name or a PowerPath pseudo name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialStrategy {
    /// Regular SCSI disks
    Scsi,
    /// KVM VirtIO disks have nothing to query
    VirtBlk,
    /// LVM logical volumes, multipath maps etc.
    DeviceMapper,
    /// NVMe and other extended-range devices
    BlkExt,
    /// Dell PowerFlex (ScaleIO)
    Scini,
    /// Dell PowerPath
    PowerPath,
    Unsupported,
}

impl SerialStrategy {
    pub fn for_driver(driver: &str) -> Self {
        match driver {
            "sd" => SerialStrategy::Scsi,
            "virtblk" => SerialStrategy::VirtBlk,
            "device-mapper" => SerialStrategy::DeviceMapper,
            "blkext" => SerialStrategy::BlkExt,
            "scini" => SerialStrategy::Scini,
            "power2" => SerialStrategy::PowerPath,
            _ => SerialStrategy::Unsupported,
        }
    }

    pub fn resolve(self, device: &Device) -> Result<Option<String>, DeviceError> {
        let path = device.path().to_string_lossy().into_owned();
        let path = path.as_str();
        let ctx = device.context();

        let serial = match self {
            SerialStrategy::Scsi => non_empty(ctx.execute(&[SCSI_ID, "-ug", path])),
            SerialStrategy::VirtBlk | SerialStrategy::Unsupported => None,
            SerialStrategy::DeviceMapper => non_empty(ctx.execute(&[
                DMSETUP, "info", "-c", "--noheadings", "-o", "name", path,
            ])),
            SerialStrategy::BlkExt => {
                let wwid = ctx.paths.sys_block.join(device.short_name()).join("wwid");
                let content = fs::read_to_string(&wwid).map_err(|e| DeviceError::io(&wwid, e))?;
                non_empty(content)
            }
            SerialStrategy::Scini => non_empty(ctx.execute(&[
                SCALEIO_DRV_CFG,
                "--query_block_device_id",
                "--block_device",
                path,
            ])),
            SerialStrategy::PowerPath => {
                let filter = format!("dev={}", device.short_name());
                pseudo_name(&ctx.execute(&[POWERMT, "display", filter.as_str()]))
            }
        };
        Ok(serial)
    }
}

/// Resolve the serial of a device whose driver is already known.
pub fn resolve(device: &Device, driver: Option<&str>) -> Result<Option<String>, DeviceError> {
    match driver {
        Some(driver) => SerialStrategy::for_driver(driver).resolve(device),
        None => Ok(None),
    }
}

fn non_empty(output: String) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extract `<value>` from a `Pseudo name=<value>` line of powermt output
pub fn pseudo_name(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Pseudo name="))
        .map(|name| name.trim_end().to_string())
}
