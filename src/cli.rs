//! Command-line flags. Every flag is optional and overrides the matching
//! field of the loaded [`DrillConfig`].

use clap::{Parser, ValueEnum};
use sorng_sftp::sftp::{CleanupTarget, DrillConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CleanupArg {
    /// Delete the remote source after each copy.
    Remote,
    /// Delete the freshly written local copy instead.
    Local,
}

impl From<CleanupArg> for CleanupTarget {
    fn from(arg: CleanupArg) -> Self {
        match arg {
            CleanupArg::Remote => CleanupTarget::Remote,
            CleanupArg::Local => CleanupTarget::Local,
        }
    }
}

/// Daily SFTP download drill.
#[derive(Debug, Parser)]
#[command(name = "sorng-drill", version, about = "Daily scheduled SFTP download drill")]
pub struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SSH username
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// SSH password
    #[arg(long = "pa", env = "SORNG_DRILL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Remote host
    #[arg(short = 'r', long = "remote")]
    pub remote: Option<String>,

    /// Remote port [default: 22]
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Absolute path of the remote source file
    #[arg(short = 's', long = "source")]
    pub source: Option<String>,

    /// Local destination directory [default: system temp dir]
    #[arg(long = "dp", value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// Copies per cycle [default: 10]
    #[arg(short = 'c', long = "count")]
    pub count: Option<u32>,

    /// Daily firing time, HH:MM [default: 04:00]
    #[arg(short = 't', long = "time")]
    pub time: Option<String>,

    /// IANA time zone for the firing time [default: Asia/Tehran]
    #[arg(long = "tz")]
    pub timezone: Option<String>,

    /// Which copy to delete after each iteration
    #[arg(long = "remove", value_enum)]
    pub remove: Option<CleanupArg>,

    /// Check the server key against known_hosts
    #[arg(long = "verify-host-identity")]
    pub verify_host_identity: bool,

    /// known_hosts file used with --verify-host-identity
    #[arg(long = "known-hosts", value_name = "FILE")]
    pub known_hosts: Option<PathBuf>,

    /// Run one cycle immediately, then keep the daily schedule
    #[arg(long = "run-now")]
    pub run_now: bool,

    /// Run one cycle immediately and exit
    #[arg(long = "once", conflicts_with = "run_now")]
    pub once: bool,

    /// Debug-level logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// JSON log lines on stderr
    #[arg(long = "log-json")]
    pub log_json: bool,
}

impl Cli {
    /// Load the config file if one was given, then layer the flags on top.
    pub fn load_config(&self) -> anyhow::Result<DrillConfig> {
        let mut config = match &self.config {
            Some(path) => DrillConfig::from_json_file(path)?,
            None => DrillConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut DrillConfig) {
        if let Some(user) = &self.user {
            config.endpoint.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.endpoint.password = password.clone();
        }
        if let Some(remote) = &self.remote {
            config.endpoint.host = remote.clone();
        }
        if let Some(port) = self.port {
            config.endpoint.port = port;
        }
        if self.verify_host_identity {
            config.endpoint.verify_host_identity = true;
        }
        if let Some(path) = &self.known_hosts {
            config.endpoint.known_hosts_path = Some(path.clone());
        }
        if let Some(source) = &self.source {
            config.job.source_path = source.clone();
        }
        if let Some(dir) = &self.destination {
            config.job.destination_dir = dir.clone();
        }
        if let Some(count) = self.count {
            config.job.repeat_count = count;
        }
        if let Some(remove) = self.remove {
            config.job.cleanup = remove.into();
        }
        if let Some(time) = &self.time {
            config.schedule.time_of_day = time.clone();
        }
        if let Some(tz) = &self.timezone {
            config.schedule.timezone = tz.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_short_flags() {
        let cli = Cli::try_parse_from([
            "sorng-drill", "-u", "drill", "--pa", "secret", "-r", "10.0.0.9", "-p", "2222", "-s",
            "/data/test.bin", "--dp", "/var/tmp", "-c", "3", "-t", "05:30",
        ])
        .unwrap();

        let mut config = DrillConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.endpoint.username, "drill");
        assert_eq!(config.endpoint.password, "secret");
        assert_eq!(config.endpoint.host, "10.0.0.9");
        assert_eq!(config.endpoint.port, 2222);
        assert_eq!(config.job.source_path, "/data/test.bin");
        assert_eq!(config.job.destination_dir, PathBuf::from("/var/tmp"));
        assert_eq!(config.job.repeat_count, 3);
        assert_eq!(config.schedule.time_of_day, "05:30");
        assert_eq!(config.schedule.timezone, "Asia/Tehran");
    }

    #[test]
    fn test_unset_flags_keep_config_values() {
        let cli = Cli::try_parse_from(["sorng-drill"]).unwrap();
        let mut config = DrillConfig::default();
        config.endpoint.host = "from-file".into();
        config.job.repeat_count = 7;
        cli.apply(&mut config);
        assert_eq!(config.endpoint.host, "from-file");
        assert_eq!(config.job.repeat_count, 7);
        assert!(!config.endpoint.verify_host_identity);
    }

    #[test]
    fn test_remove_local_and_host_checking() {
        let cli = Cli::try_parse_from([
            "sorng-drill",
            "--remove",
            "local",
            "--verify-host-identity",
            "--known-hosts",
            "/etc/ssh/ssh_known_hosts",
            "--tz",
            "UTC",
        ])
        .unwrap();
        let mut config = DrillConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.job.cleanup, CleanupTarget::Local);
        assert!(config.endpoint.verify_host_identity);
        assert_eq!(
            config.endpoint.known_hosts_path,
            Some(PathBuf::from("/etc/ssh/ssh_known_hosts"))
        );
        assert_eq!(config.schedule.timezone, "UTC");
    }

    #[test]
    fn test_once_conflicts_with_run_now() {
        assert!(Cli::try_parse_from(["sorng-drill", "--once", "--run-now"]).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drill.json");
        std::fs::write(
            &path,
            r#"{ "endpoint": { "host": "file-host", "port": 2022 }, "job": { "repeatCount": 4 } }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "sorng-drill",
            "--config",
            path.to_str().unwrap(),
            "-c",
            "9",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.endpoint.host, "file-host");
        assert_eq!(config.endpoint.port, 2022);
        assert_eq!(config.job.repeat_count, 9);
    }
}
