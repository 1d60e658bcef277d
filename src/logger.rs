use log::{LevelFilter, info, warn, error};
use syslog::{BasicLogger, Facility, Formatter3164};

use crate::config::InventoryConfig;

pub struct Logger {
    verbose: bool,
}

/// Map a facility name from the configuration, falling back to `user`
pub fn parse_facility(name: &str) -> Facility {
    match name {
        "daemon" => Facility::LOG_DAEMON,
        "user" => Facility::LOG_USER,
        "local0" => Facility::LOG_LOCAL0,
        "local1" => Facility::LOG_LOCAL1,
        "local2" => Facility::LOG_LOCAL2,
        "local3" => Facility::LOG_LOCAL3,
        "local4" => Facility::LOG_LOCAL4,
        "local5" => Facility::LOG_LOCAL5,
        "local6" => Facility::LOG_LOCAL6,
        "local7" => Facility::LOG_LOCAL7,
        _ => Facility::LOG_USER,
    }
}

impl Logger {
    /// Install the log backend: a file if one is configured, else syslog
    /// when enabled. Without either, only console messages are shown.
    pub fn new(config: &InventoryConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };

        if let Some(ref path) = config.log_file {
            simple_logging::log_to_file(path, level)
                .map_err(|e| format!("cannot log to {} - {}", path.display(), e))?;
            info!("logging to {}", path.display());
        } else if config.use_syslog {
            let formatter = Formatter3164 {
                facility: parse_facility(&config.syslog_facility),
                hostname: None,
                process: "asmdisks".into(),
                pid: std::process::id(),
            };

            let logger = syslog::unix(formatter)
                .map_err(|e| format!("impossible to connect to syslog: {:?}", e))?;
            log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
                .map(|()| log::set_max_level(level))?;
        }

        Ok(Logger { verbose: config.verbose })
    }

    pub fn log_info(&self, message: &str) {
        // stdout carries the report
        if self.verbose {
            eprintln!("INFO: {}", message);
        }

        info!("{}", message);
    }

    pub fn log_error(&self, message: &str) {
        eprintln!("ERROR: {}", message);
        error!("{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        eprintln!("WARNING: {}", message);
        warn!("{}", message);
    }
}
