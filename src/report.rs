use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::content::Content;
use crate::device::Device;
use crate::error::DeviceError;

/// Everything known about one device at the moment it was inspected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub path: PathBuf,
    pub name: String,
    pub major: u64,
    pub minor: u64,
    pub partition: u64,
    pub driver: Option<String>,
    pub serial: Option<String>,
    pub content: Content,
    pub size: Option<String>,
    pub disk_type: Option<String>,
    pub symlink: Option<String>,
    pub scsi: Option<String>,
}

impl DeviceReport {
    /// Query every attribute once. Lookup failures are logged and reported
    /// as unknown so that one odd device does not stop a scan.
    pub fn collect(device: &Device) -> DeviceReport {
        DeviceReport {
            path: device.path().to_path_buf(),
            name: device.short_name(),
            major: device.major(),
            minor: device.minor(),
            partition: device.partition_number(),
            driver: degrade(device, "driver", device.driver()),
            serial: degrade(device, "serial", device.serial()),
            content: device.content(),
            size: device.size(),
            disk_type: device.disk_type(),
            symlink: device.symlink(),
            scsi: degrade(device, "scsi address", device.scsi_address()),
        }
    }
}

fn degrade(device: &Device, what: &str, result: Result<Option<String>, DeviceError>) -> Option<String> {
    result.unwrap_or_else(|e| {
        warn!("{}: cannot determine {}: {}", device.path().display(), what, e);
        None
    })
}

const HEADER: [&str; 8] = ["DEVICE", "MAJ:MIN", "DRIVER", "SIZE", "CONTENT", "SCSI", "SYMLINK", "SERIAL"];

/// Render reports as an aligned text table
pub fn format_table(reports: &[DeviceReport]) -> String {
    let rows: Vec<[String; 8]> = reports
        .iter()
        .map(|r| {
            [
                r.path.display().to_string(),
                format!("{}:{}", r.major, r.minor),
                or_dash(&r.driver),
                or_dash(&r.size),
                r.content.to_string(),
                or_dash(&r.scsi),
                or_dash(&r.symlink),
                or_dash(&r.serial),
            ]
        })
        .collect();

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut output = String::new();
    let header = HEADER.map(str::to_string);
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        output.push_str(line.join(" ").trim_end());
        output.push('\n');
    }
    output
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}
