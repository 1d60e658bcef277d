// src/lib.rs
pub mod command;
pub mod config;
pub mod content;
pub mod context;
pub mod device;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod logger;
pub mod report;
pub mod serial;
pub mod symlink;

pub use command::{CommandRunner, ExecPolicy, SystemRunner};
pub use config::{ConfigBuilder, ConfigFile, InventoryConfig};
pub use config::{verify_config_paths, generate_example_config};
pub use config::DEFAULT_CONFIG_PATH;
pub use content::Content;
pub use context::{Context, SysPaths};
pub use device::Device;
pub use enumerate::{list_devices, rescan_buses};
pub use error::DeviceError;
pub use report::DeviceReport;
pub use serial::SerialStrategy;
