use std::fs;
use std::path::Path;

use crate::error::DeviceError;

const BLOCK_MARKER: &str = "Block devices:";

/// Look up the kernel driver registered for a block major number.
///
/// The table is read on every call since drivers come and go with hot-plug.
pub fn resolve(proc_devices: &Path, major: u64) -> Result<Option<String>, DeviceError> {
    let data = fs::read_to_string(proc_devices).map_err(|e| DeviceError::io(proc_devices, e))?;
    let table = parse_block_table(&data).ok_or_else(|| DeviceError::Parse {
        path: proc_devices.to_path_buf(),
        reason: format!("no '{}' section", BLOCK_MARKER),
    })?;

    Ok(table
        .into_iter()
        .find(|(m, _)| *m == major)
        .map(|(_, driver)| driver.to_string()))
}

/// Returns the `(major, driver)` pairs below the block marker, or `None`
/// when the marker is missing. Lines that do not start with a number are
/// skipped.
pub fn parse_block_table(data: &str) -> Option<Vec<(u64, &str)>> {
    let start = data.find(BLOCK_MARKER)? + BLOCK_MARKER.len();

    let table = data[start..]
        .lines()
        .filter_map(|line| {
            let (major, driver) = line.trim().split_once(char::is_whitespace)?;
            Some((major.parse().ok()?, driver.trim()))
        })
        .collect();
    Some(table)
}
