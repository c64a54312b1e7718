// file: src/installer/mod.rs
// version: 1.2.0
// guid: 83c6f0a9-d251-4e78-b394-06e8d5c2a1f7

//! Installation orchestrator
//!
//! Runs the provisioning stages in their fixed order, strictly one at a
//! time. Later stages consume values produced by earlier ones (the
//! generated secrets, the request's domain), passed explicitly; nothing is
//! read back out of ambient process state. The first fatal stage error
//! halts the run; warnings are collected and surfaced in the summary.

use crate::config::paths;
use crate::config::request::InstallRequest;
use crate::logging::logger;
use crate::network::NetworkDownloader;
use crate::stages::{
    app_config, artifacts, build, database, environment, packages, proxy,
    secrets::Secrets, services, summary, verify, wings, StageReport, StageStatus,
};
use crate::Result;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Total stage count, for progress output
const TOTAL_STAGES: usize = 12;

/// Main installer orchestrator
pub struct Installer {
    /// Validated install parameters, immutable for the whole run
    request: InstallRequest,

    /// Current installation session ID
    session_id: Uuid,

    /// Download client shared by the artifact and verification stages
    downloader: NetworkDownloader,
}

impl Installer {
    /// Create a new installer for a validated request
    pub fn new(request: InstallRequest) -> Self {
        let session_id = Uuid::new_v4();
        info!("Starting install session {}", session_id);

        Self {
            request,
            session_id,
            downloader: NetworkDownloader::new(),
        }
    }

    /// Execute the full provisioning sequence
    pub async fn run(&self) -> Result<()> {
        let mut reports: Vec<StageReport> = Vec::with_capacity(TOTAL_STAGES);

        self.announce(1, "Validating host environment");
        let report = environment::run()
            .instrument(logger::stage_span("environment"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(2, "Installing system packages");
        let report = packages::run()
            .instrument(logger::stage_span("packages"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(3, "Generating credentials");
        // Generated exactly once per run; the datastore stage and the
        // summary reporter both read this same value.
        let secrets = Secrets::generate();
        Self::record(&mut reports, StageReport::completed("secrets"));

        self.announce(4, "Provisioning datastore");
        let report = database::run(&secrets)
            .instrument(logger::stage_span("datastore"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(5, "Fetching panel release");
        let report = artifacts::run(&self.downloader)
            .instrument(logger::stage_span("artifacts"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(6, "Building dependencies and assets");
        let report = build::run().instrument(logger::stage_span("build")).await?;
        Self::record(&mut reports, report);

        self.announce(7, "Configuring application");
        let report = app_config::run(&self.request, &secrets)
            .instrument(logger::stage_span("app-config"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(8, "Registering background services");
        let report = services::run()
            .instrument(logger::stage_span("services"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(9, "Configuring reverse proxy");
        let report = proxy::run(&self.request)
            .instrument(logger::stage_span("proxy"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(10, "Installing node agent");
        let report = wings::run(&self.request, &self.downloader)
            .instrument(logger::stage_span("node agent"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(11, "Verifying panel responds");
        let report = verify::run(&self.request.base_url(), &self.downloader)
            .instrument(logger::stage_span("verify"))
            .await?;
        Self::record(&mut reports, report);

        self.announce(12, "Writing summary record");
        let report = summary::run(
            &self.request,
            &secrets,
            self.session_id,
            &reports,
            paths::SUMMARY_PATH,
        )
        .instrument(logger::stage_span("summary"))
        .await?;
        Self::record(&mut reports, report);

        let warnings = reports
            .iter()
            .filter(|r| r.status == StageStatus::Warning)
            .count();
        if warnings > 0 {
            warn!(
                "Installation finished with {} warning(s); see {}",
                warnings,
                paths::SUMMARY_PATH
            );
        } else {
            info!("Installation finished cleanly");
        }

        Ok(())
    }

    fn announce(&self, step: usize, label: &str) {
        info!("[{:>2}/{}] {}", step, TOTAL_STAGES, label);
    }

    fn record(reports: &mut Vec<StageReport>, report: StageReport) {
        match report.status {
            StageStatus::Completed => {}
            StageStatus::Warning => {
                warn!(
                    "Stage '{}' finished with a warning: {}",
                    report.name,
                    report.detail.as_deref().unwrap_or("")
                );
            }
            StageStatus::Skipped => {
                info!(
                    "Stage '{}' skipped: {}",
                    report.name,
                    report.detail.as_deref().unwrap_or("")
                );
            }
        }
        reports.push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::request::{ReservePolicy, TlsPolicy};

    fn request() -> InstallRequest {
        InstallRequest {
            domain: "panel.example.com".to_string(),
            use_ssl: false,
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

    #[test]
    fn test_installer_sessions_are_distinct() {
        let a = Installer::new(request());
        let b = Installer::new(request());
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_record_collects_all_outcomes() {
        let mut reports = Vec::new();
        Installer::record(&mut reports, StageReport::completed("packages"));
        Installer::record(&mut reports, StageReport::warning("proxy", "no cert"));
        Installer::record(&mut reports, StageReport::skipped("node agent", "off"));

        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports
                .iter()
                .filter(|r| r.status == StageStatus::Warning)
                .count(),
            1
        );
    }
}
