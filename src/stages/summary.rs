// file: src/stages/summary.rs
// version: 1.1.0
// guid: 29d6b0f4-7e83-4c51-a962-0d48e1c7f325

//! Summary reporter stage
//!
//! Writes the run's outcome (URL, administrator identity, generated
//! datastore credentials) to a privileged-only record, and echoes a
//! condensed version to the operator. This is the only durable local
//! artifact the agent produces itself.

use crate::config::paths;
use crate::config::request::InstallRequest;
use crate::stages::{secrets::Secrets, StageReport, StageStatus};
use crate::utils::system::SystemUtils;
use crate::Result;
use colored::Colorize;
use tracing::info;
use uuid::Uuid;

const STAGE: &str = "summary";

/// Render the summary record content
pub fn render_summary(
    request: &InstallRequest,
    secrets: &Secrets,
    session_id: Uuid,
    reports: &[StageReport],
) -> String {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let wings_line = if request.deploy_wings {
        format!("wings daemon:      installed ({})", request.node_fqdn())
    } else {
        "wings daemon:      not requested".to_string()
    };

    let mut record = format!(
        "Panel installation summary\n\
         ==========================\n\
         session:           {session}\n\
         completed:         {timestamp}\n\
         \n\
         panel URL:         {url}\n\
         admin username:    {username}\n\
         admin email:       {email}\n\
         \n\
         database host:     {db_host}:{db_port}\n\
         database name:     {db_name}\n\
         database user:     {db_user}\n\
         database password: {db_password}\n\
         \n\
         {wings}\n",
        session = session_id,
        timestamp = timestamp,
        url = request.base_url(),
        username = request.admin_username,
        email = request.admin_email,
        db_host = paths::DB_HOST,
        db_port = paths::DB_PORT,
        db_name = paths::DB_NAME,
        db_user = paths::DB_USER,
        db_password = secrets.db_password,
        wings = wings_line,
    );

    let warnings: Vec<&StageReport> = reports
        .iter()
        .filter(|r| r.status == StageStatus::Warning)
        .collect();
    if !warnings.is_empty() {
        record.push_str("\nfollow-up required\n------------------\n");
        for report in warnings {
            record.push_str(&format!(
                "- [{}] {}\n",
                report.name,
                report.detail.as_deref().unwrap_or("see log output")
            ));
        }
    }

    record
}

/// Write the summary record and echo the result to the operator
pub async fn run(
    request: &InstallRequest,
    secrets: &Secrets,
    session_id: Uuid,
    reports: &[StageReport],
    summary_path: &str,
) -> Result<StageReport> {
    let record = render_summary(request, secrets, session_id, reports);

    // Credentials inside: owner-only read
    SystemUtils::write_file_with_mode(summary_path, &record, 0o600).await?;
    info!("Summary written to {}", summary_path);

    println!();
    println!("{}", "Installation complete".green().bold());
    println!("  Panel URL:   {}", request.base_url().cyan());
    println!("  Admin user:  {}", request.admin_username);
    println!("  Credentials: {}", summary_path);

    Ok(StageReport::completed(STAGE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::request::{ReservePolicy, TlsPolicy};

    fn request() -> InstallRequest {
        InstallRequest {
            domain: "panel.example.com".to_string(),
            use_ssl: true,
            tls_policy: TlsPolicy::BestEffort,
            admin_email: "admin@example.com".to_string(),
            admin_username: "admin".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            admin_password: "correcthorse".to_string(),
            deploy_wings: false,
            node_domain: None,
            reserve: ReservePolicy::default(),
            timezone: "UTC".to_string(),
        }
    }

    fn secrets() -> Secrets {
        Secrets {
            db_password: "GeneratedPassword1234567".to_string(),
        }
    }

    #[test]
    fn test_summary_contains_url_identity_and_credentials() {
        let record = render_summary(&request(), &secrets(), Uuid::new_v4(), &[]);

        assert!(record.contains("https://panel.example.com"));
        assert!(record.contains("admin"));
        assert!(record.contains("GeneratedPassword1234567"));
        assert!(record.contains("database name:     panel"));
        assert!(record.contains("wings daemon:      not requested"));
    }

    #[test]
    fn test_summary_lists_warnings_for_follow_up() {
        let reports = vec![
            StageReport::completed("proxy"),
            StageReport::warning("verify", "panel did not respond"),
        ];
        let record = render_summary(&request(), &secrets(), Uuid::new_v4(), &reports);

        assert!(record.contains("follow-up required"));
        assert!(record.contains("[verify] panel did not respond"));
    }

    #[test]
    fn test_summary_without_warnings_has_no_follow_up_section() {
        let reports = vec![StageReport::completed("proxy")];
        let record = render_summary(&request(), &secrets(), Uuid::new_v4(), &reports);
        assert!(!record.contains("follow-up required"));
    }

    #[tokio::test]
    async fn test_run_writes_owner_only_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let path_str = path.to_str().unwrap().to_string();

        run(&request(), &secrets(), Uuid::new_v4(), &[], &path_str)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("GeneratedPassword1234567"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
