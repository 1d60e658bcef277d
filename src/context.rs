use std::path::PathBuf;
use std::sync::Arc;

use crate::command::{CommandRunner, ExecPolicy, SystemRunner};

pub const DEFAULT_PROC_DEVICES: &str = "/proc/devices";
pub const DEFAULT_SYS_BLOCK: &str = "/sys/block";
pub const DEFAULT_SCSI_HOST: &str = "/sys/class/scsi_host";

/// Kernel interfaces read directly, without going through a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysPaths {
    pub proc_devices: PathBuf,
    pub sys_block: PathBuf,
    pub scsi_host: PathBuf,
}

impl Default for SysPaths {
    fn default() -> Self {
        Self {
            proc_devices: PathBuf::from(DEFAULT_PROC_DEVICES),
            sys_block: PathBuf::from(DEFAULT_SYS_BLOCK),
            scsi_host: PathBuf::from(DEFAULT_SCSI_HOST),
        }
    }
}

/// Everything a device query needs from the host. Cloning is cheap.
#[derive(Clone)]
pub struct Context {
    pub runner: Arc<dyn CommandRunner>,
    pub paths: SysPaths,
}

impl Context {
    pub fn new(runner: Arc<dyn CommandRunner>, paths: SysPaths) -> Self {
        Self { runner, paths }
    }

    pub fn system(policy: ExecPolicy, paths: SysPaths) -> Self {
        Self::new(Arc::new(SystemRunner::new(policy)), paths)
    }

    pub fn execute(&self, argv: &[&str]) -> String {
        self.runner.execute(argv)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::system(ExecPolicy::default(), SysPaths::default())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("paths", &self.paths).finish_non_exhaustive()
    }
}
