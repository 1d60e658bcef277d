use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::{info, warn};

use crate::command::CommandRunner;
use crate::device::LSBLK;
use crate::error::DeviceError;

/// Written to a SCSI host's `scan` file: all channels, targets and LUNs
pub const RESCAN_TRIGGER: &str = "- - -\n";

/// Kernel names of all block devices, sorted.
pub fn list_devices(runner: &dyn CommandRunner) -> Vec<String> {
    let out = runner.execute(&[LSBLK, "-ndo", "kname"]);
    let mut names: Vec<String> = out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

/// Ask every SCSI host to rescan its bus. Does not wait for the scan to
/// finish. Returns the number of hosts triggered.
pub fn rescan_buses(scsi_host: &Path) -> Result<usize, DeviceError> {
    let mut triggered = 0;

    for entry in fs::read_dir(scsi_host).map_err(|e| DeviceError::io(scsi_host, e))? {
        let Ok(entry) = entry else { continue };
        let scan = entry.path().join("scan");
        if !scan.is_file() {
            continue;
        }

        let written = OpenOptions::new()
            .append(true)
            .open(&scan)
            .and_then(|mut f| f.write_all(RESCAN_TRIGGER.as_bytes()));

        match written {
            Ok(()) => {
                info!("rescan triggered on {}", entry.file_name().to_string_lossy());
                triggered += 1;
            }
            Err(e) => warn!("cannot trigger rescan via {}: {}", scan.display(), e),
        }
    }

    Ok(triggered)
}
