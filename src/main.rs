use std::path::{Path, PathBuf};

use asmdisks::{ConfigBuilder, generate_example_config, DEFAULT_CONFIG_PATH};
use asmdisks::verify_config_paths;
use asmdisks::config::build_cli;
use asmdisks::logger::Logger;
use asmdisks::report::format_table;
use asmdisks::{list_devices, rescan_buses, Device, DeviceReport};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let matches = build_cli().get_matches();

    // Handle config file generation
    if let Some(path) = matches.get_one::<String>("generate-config") {
        let example_config = generate_example_config()?;
        let path = Path::new(path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
            }
        }

        std::fs::write(path, example_config)
            .map_err(|e| format!("Failed to write config file {}: {}", path.display(), e))?;

        println!("Generated example configuration file: {}", path.display());
        return Ok(());
    }

    // Build configuration from config file + command line. The default
    // config path is optional, an explicitly named one is not.
    let config_path = matches.get_one::<String>("config").map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
    let config_builder = if config_path == DEFAULT_CONFIG_PATH {
        ConfigBuilder::new().load_optional_config_file(config_path)
    } else {
        ConfigBuilder::new().load_config_file(config_path)
    }
    .map_err(|e| format!("Failed to load config file '{}': {}", config_path, e))?;

    let config = config_builder
        .merge_command_line(&matches)
        .build()?;

    verify_config_paths(&config)?;

    let logger = Logger::new(&config)?;
    let ctx = config.context();

    if matches.get_flag("rescan") {
        if unsafe { libc::geteuid() } != 0 {
            logger.log_warning("not running as root, bus rescan will probably fail");
        }
        match rescan_buses(&config.paths.scsi_host) {
            Ok(hosts) => logger.log_info(&format!("Rescan requested on {} SCSI host(s)", hosts)),
            Err(e) => logger.log_warning(&format!("Bus rescan skipped: {}", e)),
        }
    }

    if matches.get_flag("list") {
        for name in list_devices(&*ctx.runner) {
            println!("{}", name);
        }
        return Ok(());
    }

    let devices: Vec<PathBuf> = if config.devices.is_empty() {
        list_devices(&*ctx.runner)
            .into_iter()
            .map(|name| Path::new("/dev").join(name))
            .collect()
    } else {
        config.devices.clone()
    };

    let mut reports = Vec::new();
    for device_path in &devices {
        match Device::from_path_with(device_path, ctx.clone()) {
            Ok(device) => {
                logger.log_info(&format!("Inspecting {}", device));
                reports.push(DeviceReport::collect(&device));
            }
            Err(e) => logger.log_error(&format!("Skipping {}: {}", device_path.display(), e)),
        }
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print!("{}", format_table(&reports));
    }

    Ok(())
}
