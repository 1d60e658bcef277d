use clap::{Arg, ArgMatches, Command};
use clap::parser::ValueSource;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::command::{DEFAULT_SEARCH_PATH, ExecPolicy};
use crate::context::{Context, DEFAULT_PROC_DEVICES, DEFAULT_SCSI_HOST, DEFAULT_SYS_BLOCK, SysPaths};

// Default values as constants
pub const DEFAULT_CONFIG_PATH: &str = "/etc/asmdisks/config.toml";
pub const DEFAULT_VERBOSE: bool = false;
pub const DEFAULT_USE_SYSLOG: bool = false;
pub const DEFAULT_SYSLOG_FACILITY: &str = "user";
pub const DEFAULT_JSON: bool = false;

/// File access modes for verification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileAccessMode {
    /// File must exist and be readable
    Read,
    /// File must be writable (will be created if it doesn't exist)
    Write,
}

/// Verify file accessibility
pub fn verify_file_access(path: &Path, mode: FileAccessMode) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match mode {
        FileAccessMode::Read => {
            match File::open(path) {
                Ok(_) => Ok(()),
                Err(e) => {
                    let msg = match e.kind() {
                        ErrorKind::NotFound => format!("File not found: {}", path.display()),
                        ErrorKind::PermissionDenied => format!("Permission denied reading file: {}", path.display()),
                        _ => format!("Cannot read file {}: {}", path.display(), e),
                    };
                    Err(msg.into())
                }
            }
        }
        FileAccessMode::Write => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Parent directory does not exist: {}", parent.display()).into());
                }
            }

            match OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
            {
                Ok(_) => Ok(()),
                Err(e) => {
                    let msg = match e.kind() {
                        ErrorKind::PermissionDenied => format!("Permission denied writing to file: {}", path.display()),
                        _ => format!("Cannot write to file {}: {}", path.display(), e),
                    };
                    Err(msg.into())
                }
            }
        }
    }
}

/// Verify configuration paths are accessible
pub fn verify_config_paths(config: &InventoryConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    verify_file_access(&config.paths.proc_devices, FileAccessMode::Read)
        .map_err(|e| format!("Driver table error: {}", e))?;

    if let Some(log_file) = &config.log_file {
        verify_file_access(log_file, FileAccessMode::Write)
            .map_err(|e| format!("Log file error: {}", e))?;
    }

    Ok(())
}

/// Macro to check and override config values from command line
macro_rules! override_if_present {
    // For string values
    ($matches:expr, $option:expr, $target:expr, string) => {
        if $matches.value_source($option) == Some(ValueSource::CommandLine) {
            if let Some(value) = $matches.get_one::<String>($option) {
                $target = Some(value.to_string());
            }
        }
    };

    // For boolean flags
    ($matches:expr, $option:expr, $target:expr, flag) => {
        if $matches.value_source($option) == Some(ValueSource::CommandLine) {
            $target = Some($matches.get_flag($option));
        }
    };

    // For boolean flags with 'no-' version
    ($matches:expr, $option:expr, $target:expr, flag-yn) => {
        if $matches.value_source($option) == Some(ValueSource::CommandLine) {
            $target = Some(true);
        } else if $matches.value_source(concat!("no-", $option)) == Some(ValueSource::CommandLine) {
            $target = Some(false);
        }
    };

    // For Vec<String>
    ($matches:expr, $option:expr, $target:expr, vec_string) => {
        if $matches.value_source($option) == Some(ValueSource::CommandLine) {
            if let Some(values) = $matches.get_many::<String>($option) {
                $target = Some(values.map(|s| s.to_string()).collect());
            }
        }
    };
}

/// Configuration file structure for TOML parsing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub devices: Option<Vec<String>>,
    pub search_path: Option<String>,
    pub proc_devices: Option<String>,
    pub sys_block: Option<String>,
    pub scsi_host: Option<String>,
    pub log_file: Option<String>,
    pub verbose: Option<bool>,
    pub use_syslog: Option<bool>,
    pub syslog_facility: Option<String>,
    pub json: Option<bool>,
}

impl ConfigFile {
    /// Every setting filled in with its default, for `--generate-config`
    pub fn example() -> Self {
        Self {
            devices: Some(vec!["/dev/sda".to_string(), "/dev/nvme0n1".to_string()]),
            search_path: Some(DEFAULT_SEARCH_PATH.to_string()),
            proc_devices: Some(DEFAULT_PROC_DEVICES.to_string()),
            sys_block: Some(DEFAULT_SYS_BLOCK.to_string()),
            scsi_host: Some(DEFAULT_SCSI_HOST.to_string()),
            log_file: Some("/var/log/asmdisks.log".to_string()),
            verbose: Some(DEFAULT_VERBOSE),
            use_syslog: Some(DEFAULT_USE_SYSLOG),
            syslog_facility: Some(DEFAULT_SYSLOG_FACILITY.to_string()),
            json: Some(DEFAULT_JSON),
        }
    }
}

/// Runtime configuration for the inventory
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub devices: Vec<PathBuf>,
    pub policy: ExecPolicy,
    pub paths: SysPaths,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
    pub use_syslog: bool,
    pub syslog_facility: String,
    pub json: bool,
}

impl InventoryConfig {
    /// Host context for device queries under this configuration
    pub fn context(&self) -> Context {
        Context::system(self.policy.clone(), self.paths.clone())
    }
}

/// Builder for merging configuration from file and command line
#[derive(Default)]
pub struct ConfigBuilder {
    config_file: Option<ConfigFile>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config_file: None,
        }
    }

    pub fn load_config_file(mut self, path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        let config: ConfigFile = toml::from_str(&content)?;
        self.config_file = Some(config);
        Ok(self)
    }

    /// Like `load_config_file`, but a missing file is not an error
    pub fn load_optional_config_file(self, path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if Path::new(path).exists() {
            self.load_config_file(path)
        } else {
            Ok(self)
        }
    }

    pub fn merge_command_line(mut self, matches: &ArgMatches) -> Self {
        let file_config = self.config_file.get_or_insert_with(ConfigFile::default);

        // String overrides
        override_if_present!(matches, "search-path", file_config.search_path, string);
        override_if_present!(matches, "proc-devices", file_config.proc_devices, string);
        override_if_present!(matches, "sys-block", file_config.sys_block, string);
        override_if_present!(matches, "scsi-host", file_config.scsi_host, string);
        override_if_present!(matches, "log-file", file_config.log_file, string);
        override_if_present!(matches, "syslog-facility", file_config.syslog_facility, string);

        // Boolean flags
        override_if_present!(matches, "verbose", file_config.verbose, flag-yn);
        override_if_present!(matches, "syslog", file_config.use_syslog, flag-yn);
        override_if_present!(matches, "json", file_config.json, flag);

        // Vector overrides
        override_if_present!(matches, "devices", file_config.devices, vec_string);

        self
    }

    pub fn build(self) -> Result<InventoryConfig, Box<dyn std::error::Error + Send + Sync>> {
        let file_config = self.config_file.unwrap_or_default();

        let config = InventoryConfig {
            devices: file_config.devices
                .map(|d| d.into_iter().map(PathBuf::from).collect())
                .unwrap_or_else(Vec::new),
            policy: ExecPolicy {
                search_path: file_config.search_path.unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_string()),
            },
            paths: SysPaths {
                proc_devices: PathBuf::from(file_config.proc_devices.unwrap_or_else(|| DEFAULT_PROC_DEVICES.to_string())),
                sys_block: PathBuf::from(file_config.sys_block.unwrap_or_else(|| DEFAULT_SYS_BLOCK.to_string())),
                scsi_host: PathBuf::from(file_config.scsi_host.unwrap_or_else(|| DEFAULT_SCSI_HOST.to_string())),
            },
            log_file: file_config.log_file.map(PathBuf::from),
            verbose: file_config.verbose.unwrap_or(DEFAULT_VERBOSE),
            use_syslog: file_config.use_syslog.unwrap_or(DEFAULT_USE_SYSLOG),
            syslog_facility: file_config.syslog_facility.unwrap_or_else(|| DEFAULT_SYSLOG_FACILITY.to_string()),
            json: file_config.json.unwrap_or(DEFAULT_JSON),
        };

        if config.policy.search_path.trim().is_empty() {
            return Err("search_path cannot be empty".into());
        }
        Ok(config)
    }
}

/// Generate example configuration file content
pub fn generate_example_config() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let example_config = ConfigFile::example();

    let mut output = String::from("# asmdisks Configuration File\n");
    output.push_str("# \n");
    output.push_str("# This is an example configuration with default values.\n");
    output.push_str("# Command line arguments will override these settings.\n\n");

    output.push_str(&toml::to_string_pretty(&example_config)?);

    Ok(output)
}

/// Build the command line interface
pub fn build_cli() -> Command {
    Command::new("asmdisks")
        .version("0.1")
        .about("Identify and classify block devices: driver, serial, content and udev name")
        .arg(Arg::new("devices")
             .help("Block devices to inspect (default: all devices listed by lsblk)")
             .action(clap::ArgAction::Append)
             .value_name("DEVICE"))
        .arg(Arg::new("config")
             .short('c')
             .long("config")
             .value_name("FILE")
             .help("Configuration file path (TOML format)")
             .default_value(DEFAULT_CONFIG_PATH))
        .arg(Arg::new("generate-config")
             .long("generate-config")
             .value_name("FILE")
             .help(format!("Generate example configuration file (defaults to {})", DEFAULT_CONFIG_PATH))
             .num_args(0..=1)
             .default_missing_value(DEFAULT_CONFIG_PATH)
             .action(clap::ArgAction::Set))
        .arg(Arg::new("list")
             .short('l')
             .long("list")
             .help("List the kernel names of all block devices and exit")
             .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("rescan")
             .long("rescan")
             .help("Rescan all SCSI host buses before inspecting devices")
             .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("json")
             .long("json")
             .help("Print the report as JSON")
             .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("search-path")
             .long("search-path")
             .value_name("PATH")
             .help("PATH given to external tools")
             .default_value(DEFAULT_SEARCH_PATH))
        .arg(Arg::new("proc-devices")
             .long("proc-devices")
             .value_name("FILE")
             .help("Kernel driver table")
             .default_value(DEFAULT_PROC_DEVICES))
        .arg(Arg::new("sys-block")
             .long("sys-block")
             .value_name("DIR")
             .help("sysfs block device directory")
             .default_value(DEFAULT_SYS_BLOCK))
        .arg(Arg::new("scsi-host")
             .long("scsi-host")
             .value_name("DIR")
             .help("sysfs SCSI host class directory")
             .default_value(DEFAULT_SCSI_HOST))
        .arg(Arg::new("log-file")
             .long("log-file")
             .value_name("FILE")
             .help("Log to this file instead of syslog"))
        .arg(Arg::new("verbose")
             .short('v')
             .long("verbose")
             .help("Verbose output")
             .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("no-verbose")
             .long("no-verbose")
             .help("Disable verbose output")
             .action(clap::ArgAction::SetTrue)
             .conflicts_with("verbose"))
        .arg(Arg::new("syslog")
             .long("syslog")
             .help("Enable syslog logging")
             .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("no-syslog")
             .long("no-syslog")
             .help("Disable syslog logging")
             .action(clap::ArgAction::SetTrue)
             .conflicts_with("syslog"))
        .arg(Arg::new("syslog-facility")
             .long("syslog-facility")
             .value_name("FACILITY")
             .help("Syslog facility (daemon, user, local0-local7)")
             .default_value(DEFAULT_SYSLOG_FACILITY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Helper function to create a test config file
    fn create_test_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let config_path = dir.path().join("test_config.toml");
        fs::write(&config_path, content).unwrap();
        config_path
    }

    /// Helper function to parse command line args
    fn parse_args(args: Vec<&str>) -> ArgMatches {
        let cmd = build_cli();
        cmd.try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_string_override() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
            proc_devices = "/original/devices"
            sys_block = "/original/block"
            search_path = "/opt/bin"
        "#;
        let config_path = create_test_config_file(&temp_dir, config_content);

        let args = vec![
            "asmdisks",
            "--config", config_path.to_str().unwrap(),
            "--proc-devices", "/new/devices",
        ];
        let matches = parse_args(args);

        let config = ConfigBuilder::new()
            .load_config_file(config_path.to_str().unwrap())
            .unwrap()
            .merge_command_line(&matches)
            .build()
            .unwrap();

        assert_eq!(config.paths.proc_devices, PathBuf::from("/new/devices"));
        // untouched on the command line
        assert_eq!(config.paths.sys_block, PathBuf::from("/original/block"));
        assert_eq!(config.policy.search_path, "/opt/bin");
    }

    #[test]
    fn test_defaults_do_not_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
            scsi_host = "/tmp/scsi_host"
            syslog_facility = "local3"
        "#;
        let config_path = create_test_config_file(&temp_dir, config_content);

        let matches = parse_args(vec!["asmdisks", "--config", config_path.to_str().unwrap()]);
        assert_ne!(matches.value_source("scsi-host"), Some(ValueSource::CommandLine));

        let config = ConfigBuilder::new()
            .load_config_file(config_path.to_str().unwrap())
            .unwrap()
            .merge_command_line(&matches)
            .build()
            .unwrap();

        assert_eq!(config.paths.scsi_host, PathBuf::from("/tmp/scsi_host"));
        assert_eq!(config.syslog_facility, "local3");
    }

    #[test]
    fn test_boolean_flag_override() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
            verbose = true
            use_syslog = false
            json = false
        "#;
        let config_path = create_test_config_file(&temp_dir, config_content);

        let args = vec![
            "asmdisks",
            "--config", config_path.to_str().unwrap(),
            "--no-verbose",
            "--syslog",
            "--json",
        ];
        let matches = parse_args(args);

        let config = ConfigBuilder::new()
            .load_config_file(config_path.to_str().unwrap())
            .unwrap()
            .merge_command_line(&matches)
            .build()
            .unwrap();

        assert!(!config.verbose);
        assert!(config.use_syslog);
        assert!(config.json);
    }

    #[test]
    fn test_devices_override() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
            devices = ["/dev/sda", "/dev/sdb"]
        "#;
        let config_path = create_test_config_file(&temp_dir, config_content);

        let args = vec![
            "asmdisks",
            "--config", config_path.to_str().unwrap(),
            "/dev/nvme0n1",
            "/dev/dm-0",
        ];
        let config = ConfigBuilder::new()
            .load_config_file(config_path.to_str().unwrap())
            .unwrap()
            .merge_command_line(&parse_args(args))
            .build()
            .unwrap();

        assert_eq!(config.devices, vec![PathBuf::from("/dev/nvme0n1"), PathBuf::from("/dev/dm-0")]);
    }

    #[test]
    fn test_no_config_file_with_cli_args() {
        let args = vec![
            "asmdisks",
            "/dev/sda",
            "--verbose",
            "--search-path", "/usr/local/sbin:/usr/sbin",
            "--log-file", "/tmp/asmdisks.log",
        ];
        let matches = parse_args(args);

        let config = ConfigBuilder::new()
            .merge_command_line(&matches)
            .build()
            .unwrap();

        assert_eq!(config.devices, vec![PathBuf::from("/dev/sda")]);
        assert!(config.verbose);
        assert_eq!(config.policy.search_path, "/usr/local/sbin:/usr/sbin");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/asmdisks.log")));
        assert_eq!(config.paths, SysPaths::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert!(config.devices.is_empty());
        assert_eq!(config.policy, ExecPolicy::default());
        assert_eq!(config.paths, SysPaths::default());
        assert_eq!(config.log_file, None);
        assert_eq!(config.verbose, DEFAULT_VERBOSE);
        assert_eq!(config.use_syslog, DEFAULT_USE_SYSLOG);
        assert_eq!(config.json, DEFAULT_JSON);
    }

    #[test]
    fn test_empty_search_path_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config_file(&temp_dir, "search_path = \"\"\n");

        let result = ConfigBuilder::new()
            .load_config_file(config_path.to_str().unwrap())
            .unwrap()
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.toml");

        let config = ConfigBuilder::new()
            .load_optional_config_file(missing.to_str().unwrap())
            .unwrap()
            .build()
            .unwrap();
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_example_config_round_trip() {
        let example = generate_example_config().unwrap();
        assert!(example.starts_with("# asmdisks Configuration File"));

        let parsed: ConfigFile = toml::from_str(&example).unwrap();
        assert_eq!(parsed.search_path.as_deref(), Some(DEFAULT_SEARCH_PATH));
        assert_eq!(parsed.devices.map(|d| d.len()), Some(2));
    }

    #[test]
    fn test_verify_config_paths() {
        let temp_dir = TempDir::new().unwrap();
        let devices = create_test_config_file(&temp_dir, "Block devices:\n  8 sd\n");

        let mut config = ConfigBuilder::new().build().unwrap();
        config.paths.proc_devices = devices;
        config.log_file = Some(temp_dir.path().join("asmdisks.log"));
        assert!(verify_config_paths(&config).is_ok());

        config.log_file = Some(temp_dir.path().join("no/such/dir/asmdisks.log"));
        assert!(verify_config_paths(&config).is_err());

        config.log_file = None;
        config.paths.proc_devices = temp_dir.path().join("missing");
        assert!(verify_config_paths(&config).is_err());
    }
}
