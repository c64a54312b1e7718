// file: src/stages/services.rs
// version: 1.1.0
// guid: e17f42a8-b90d-4c65-83f1-2da6c5e08b94

//! Service registration stage
//!
//! Installs the queue worker's supervisor unit and registers the
//! once-a-minute scheduler entry in the privileged account's crontab,
//! guarded against duplicate registration.

use crate::config::paths;
use crate::stages::{exec, StageReport};
use crate::template;
use crate::Result;
use tracing::{debug, info};

const STAGE: &str = "services";

/// Queue worker unit. Restart=on-failure with a bounded start rate keeps a
/// crash-looping worker from exhausting the host.
const QUEUE_UNIT_TEMPLATE: &str = "\
[Unit]
Description=Panel Queue Worker
After=redis-server.service

[Service]
User={{user}}
Group={{user}}
Restart=on-failure
RestartSec=5s
StartLimitInterval=180
StartLimitBurst=30
ExecStart=/usr/bin/php {{panel_root}}/artisan queue:work --queue=high,standard,low --sleep=3 --tries=3

[Install]
WantedBy=multi-user.target
";

/// Scheduler entry registered in the privileged crontab
pub fn schedule_entry() -> String {
    format!(
        "* * * * * php {}/artisan schedule:run >> /dev/null 2>&1",
        paths::PANEL_ROOT
    )
}

/// Render the queue worker unit
pub fn render_queue_unit() -> Result<String> {
    template::render(
        QUEUE_UNIT_TEMPLATE,
        &[
            ("user", paths::SERVICE_USER),
            ("panel_root", paths::PANEL_ROOT),
        ],
    )
}

/// Crontab content with the schedule entry appended, or None if present
pub fn crontab_with_entry(existing: &str, entry: &str) -> Option<String> {
    if existing.lines().any(|line| line.trim() == entry) {
        return None;
    }

    let mut updated = existing.trim_end().to_string();
    if !updated.is_empty() {
        updated.push('\n');
    }
    updated.push_str(entry);
    updated.push('\n');
    Some(updated)
}

/// Install the queue worker unit and the scheduler cron entry
pub async fn run() -> Result<StageReport> {
    info!("Installing queue worker unit at {}", paths::QUEUE_UNIT_PATH);
    let unit = render_queue_unit()?;
    crate::utils::system::SystemUtils::write_file_with_mode(paths::QUEUE_UNIT_PATH, &unit, 0o644)
        .await?;

    exec::run_checked("systemctl", &["daemon-reload"], "systemd daemon-reload").await?;
    exec::run_checked(
        "systemctl",
        &["enable", "--now", "pteroq.service"],
        "enable queue worker",
    )
    .await?;

    // `crontab -l` exits non-zero when the account has no crontab yet;
    // treat that as an empty table rather than a failure.
    let existing = exec::run_unchecked("crontab", &["-l"]).await;
    match crontab_with_entry(&existing, &schedule_entry()) {
        Some(updated) => {
            info!("Registering scheduler cron entry");
            exec::run_with_input("crontab", &["-"], &updated, "register scheduler cron").await?;
        }
        None => {
            debug!("Scheduler cron entry already registered, skipping");
        }
    }

    info!("Background services registered");
    Ok(StageReport::completed(STAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_unit_bounds_restarts() {
        let unit = render_queue_unit().unwrap();
        assert!(unit.contains("Restart=on-failure"));
        assert!(unit.contains("StartLimitInterval=180"));
        assert!(unit.contains("StartLimitBurst=30"));
        assert!(unit.contains("User=www-data"));
        assert!(unit.contains("/var/www/pterodactyl/artisan queue:work"));
        assert!(!unit.contains("{{"));
    }

    #[test]
    fn test_crontab_entry_appended_once() {
        let entry = schedule_entry();

        // First registration appends
        let updated = crontab_with_entry("", &entry).unwrap();
        assert_eq!(updated.matches("schedule:run").count(), 1);

        // Second registration is a no-op
        assert!(crontab_with_entry(&updated, &entry).is_none());
    }

    #[test]
    fn test_crontab_preserves_existing_entries() {
        let entry = schedule_entry();
        let existing = "0 3 * * * /usr/local/bin/backup.sh\n";

        let updated = crontab_with_entry(existing, &entry).unwrap();

        assert!(updated.contains("backup.sh"));
        assert!(updated.contains("schedule:run"));
        assert!(updated.ends_with('\n'));
    }

    #[test]
    fn test_schedule_entry_runs_every_minute() {
        assert!(schedule_entry().starts_with("* * * * * "));
    }
}
