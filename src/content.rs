use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::device::Device;

pub const BLKID: &str = "blkid";

/// Bytes sampled at the start of a device to decide whether it is blank
pub const BLANK_SAMPLE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    Blank,
    Dos,
    Gpt,
    Swap,
    Asm,
    Lvm,
    Raid,
    Xfs,
    Ext3,
    Ext4,
    Unknown,
}

impl Content {
    pub fn as_str(&self) -> &'static str {
        match self {
            Content::Blank => "blank",
            Content::Dos => "dos",
            Content::Gpt => "gpt",
            Content::Swap => "swap",
            Content::Asm => "asm",
            Content::Lvm => "lvm",
            Content::Raid => "raid",
            Content::Xfs => "xfs",
            Content::Ext3 => "ext3",
            Content::Ext4 => "ext4",
            Content::Unknown => "unknown",
        }
    }

    fn from_part_table(value: &str) -> Option<Content> {
        match value {
            "dos" => Some(Content::Dos),
            "gpt" => Some(Content::Gpt),
            "swap" => Some(Content::Swap),
            _ => None,
        }
    }

    fn from_fs_type(value: &str) -> Option<Content> {
        match value {
            "oracleasm" => Some(Content::Asm),
            "LVM2_member" => Some(Content::Lvm),
            "linux_raid_member" => Some(Content::Raid),
            "xfs" => Some(Content::Xfs),
            "ext3" => Some(Content::Ext3),
            "ext4" => Some(Content::Ext4),
            _ => None,
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Some(true)` if the first 1024 bytes are all zero, `None` if they could
/// not be read. A device shorter than the sample is not blank.
pub fn is_blank(path: &Path) -> Option<bool> {
    let mut data = Vec::with_capacity(BLANK_SAMPLE);
    let read = File::open(path).and_then(|f| f.take(BLANK_SAMPLE as u64).read_to_end(&mut data));

    match read {
        Ok(n) => Some(n == BLANK_SAMPLE && data.iter().all(|b| *b == 0)),
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            None
        }
    }
}

pub fn classify(device: &Device) -> Content {
    if device.is_blank() == Some(true) {
        return Content::Blank;
    }

    let path = device.path().to_string_lossy().into_owned();
    let udev_out = device.context().execute(&[BLKID, "-p", "-o", "udev", path.as_str()]);
    classify_udev_output(&udev_out)
}

/// Classify blkid `-o udev` output.
///
/// A recognised partition table wins over any filesystem signature no
/// matter where either line appears, since blkid does not promise an order.
pub fn classify_udev_output(udev_out: &str) -> Content {
    let descriptors: Vec<(&str, &str)> = udev_out
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .collect();

    let part_table = descriptors
        .iter()
        .filter(|(key, _)| *key == "ID_PART_TABLE_TYPE")
        .find_map(|(_, value)| Content::from_part_table(value));

    part_table
        .or_else(|| {
            descriptors
                .iter()
                .filter(|(key, _)| *key == "ID_FS_TYPE")
                .find_map(|(_, value)| Content::from_fs_type(value))
        })
        .unwrap_or(Content::Unknown)
}
