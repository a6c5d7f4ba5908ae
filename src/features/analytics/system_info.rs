//! # Feature: System Information
//!
//! Host diagnostics for the admin `system_info` command.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Snapshot combined with store totals and scheduler state
//! - 1.0.0: Initial implementation with current metrics

use std::path::Path;
use std::time::Duration;

use sysinfo::{Disks, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::database::SystemTotals;

/// Information about a disk/mount point
pub struct DiskInfo {
    pub mount: String,
    pub total: u64,
    pub used: u64,
}

/// Point-in-time view of the host and the bot process
pub struct SystemSnapshot {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel: String,
    pub architecture: String,
    pub cpu_usage: f32,
    pub cpu_cores: usize,
    pub load_avg: (f64, f64, f64),
    pub memory_total: u64,
    pub memory_used: u64,
    pub disks: Vec<DiskInfo>,
    pub bot_memory: u64,
    pub db_size: u64,
}

impl SystemSnapshot {
    /// Sample the host. Takes about 200ms so CPU usage has two data points.
    pub async fn gather(db_path: &str) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        tokio::time::sleep(Duration::from_millis(200)).await;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let bot_memory = match sysinfo::get_current_pid() {
            Ok(pid) => {
                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::new().with_memory(),
                );
                sys.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            Err(_) => 0,
        };

        let disks = Disks::new_with_refreshed_list()
            .iter()
            .filter(|d| {
                let mount = d.mount_point().to_string_lossy();
                mount == "/" || mount.starts_with("/home") || mount.starts_with("/var")
            })
            .map(|d| {
                let total = d.total_space();
                DiskInfo {
                    mount: d.mount_point().to_string_lossy().to_string(),
                    total,
                    used: total.saturating_sub(d.available_space()),
                }
            })
            .collect();

        let load = System::load_average();
        SystemSnapshot {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_default(),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_usage: sys.global_cpu_usage(),
            cpu_cores: sys.cpus().len(),
            load_avg: (load.one, load.five, load.fifteen),
            memory_total: sys.total_memory(),
            memory_used: sys.used_memory(),
            disks,
            bot_memory,
            db_size: db_file_size(db_path),
        }
    }

    /// Markdown block for the admin reply
    pub fn format(&self, uptime_secs: u64, totals: &SystemTotals, timers: usize) -> String {
        let mut disk_lines = String::new();
        for disk in &self.disks {
            disk_lines.push_str(&format!(
                "{:<8} {} / {} ({:.1}%)\n",
                disk.mount,
                format_bytes(disk.used),
                format_bytes(disk.total),
                percent(disk.used, disk.total)
            ));
        }

        format!(
            "**System Information**\n```\n\
            Host:    {} ({} {})\n\
            Arch:    {} | Kernel: {}\n\
            \n\
            CPU:     {:.1}% | Cores: {} | Load: {:.2}/{:.2}/{:.2}\n\
            RAM:     {} / {} ({:.1}%)\n\
            {}\
            \n\
            DB:      {} | Users: {} | Tasks: {} | Events: {}\n\
            Timers:  {} pending | Reminders: {} active\n\
            \n\
            Bot:     v{} | Up: {}\n\
            Process: {}\n\
            Rust:    {}\n\
            ```",
            self.hostname,
            self.os_name,
            self.os_version,
            self.architecture,
            self.kernel,
            self.cpu_usage,
            self.cpu_cores,
            self.load_avg.0,
            self.load_avg.1,
            self.load_avg.2,
            format_bytes(self.memory_used),
            format_bytes(self.memory_total),
            percent(self.memory_used, self.memory_total),
            disk_lines,
            format_bytes(self.db_size),
            totals.users,
            totals.tasks,
            totals.events,
            timers,
            totals.active_reminders,
            env!("CARGO_PKG_VERSION"),
            format_duration(uptime_secs),
            format_bytes(self.bot_memory),
            rustc_version_runtime::version(),
        )
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

pub fn db_file_size(path: &str) -> u64 {
    Path::new(path).metadata().map(|m| m.len()).unwrap_or(0)
}

/// Format bytes into human-readable string (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format duration into human-readable string (e.g., "3d 14h 22m 15s")
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(3 * 1073741824), "3.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(90061), "1d 1h 1m 1s");
    }

    #[test]
    fn test_missing_db_file_has_zero_size() {
        assert_eq!(db_file_size("/nonexistent/student_tracker.db"), 0);
    }

    #[tokio::test]
    async fn test_snapshot_formats_totals() {
        let snapshot = SystemSnapshot::gather(":memory:").await;
        let totals = SystemTotals {
            users: 4,
            admins: 1,
            tasks: 12,
            completed_tasks: 5,
            reminders: 3,
            active_reminders: 2,
            triggered_reminders: 1,
            events: 6,
        };
        let text = snapshot.format(90, &totals, 2);
        assert!(text.contains("Users: 4"));
        assert!(text.contains("Timers:  2 pending"));
        assert!(text.contains("Up: 1m 30s"));
    }
}
