// file: src/cli/args.rs
// version: 1.2.0
// guid: 65d08b3f-a924-4c17-8e60-b59d2c7f1a48

//! Command line argument definitions

use crate::config::request::{parse_bool_like, InstallRequest, ReservePolicy, TlsPolicy};
use crate::error::InstallError;
use crate::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pterodactyl-install-agent")]
#[command(about = "Automated panel and wings installation for Ubuntu 22.04")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full installation sequence
    Install(InstallArgs),

    /// Check host support and tool availability without changing anything
    Check {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Install parameters, accepted as flags or positionally
///
/// The positional form mirrors the classic invocation:
/// `domain ssl email user first last pass wings [nodeDomain]`.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Positional parameters: domain ssl email user first last pass wings [nodeDomain]
    #[arg(value_name = "ARGS", num_args = 0..=9)]
    pub positional: Vec<String>,

    /// Domain name the panel is served under
    #[arg(long, visible_alias = "panel-domain")]
    pub domain: Option<String>,

    /// Serve over HTTPS and request a certificate (true/false)
    #[arg(long, visible_alias = "use-ssl", value_name = "BOOL")]
    pub ssl: Option<String>,

    /// Administrator email address
    #[arg(long, visible_alias = "admin-email")]
    pub email: Option<String>,

    /// Administrator username
    #[arg(long, visible_alias = "admin-user")]
    pub admin: Option<String>,

    /// Administrator first name
    #[arg(long, visible_alias = "first-name")]
    pub first: Option<String>,

    /// Administrator last name
    #[arg(long, visible_alias = "last-name")]
    pub last: Option<String>,

    /// Administrator password
    #[arg(long, visible_alias = "admin-pass")]
    pub pass: Option<String>,

    /// Install the wings node daemon (true/false)
    #[arg(long, visible_alias = "deploy-wings", value_name = "BOOL")]
    pub wings: Option<String>,

    /// Distinct domain for the node API
    #[arg(long)]
    pub node_domain: Option<String>,

    /// How certificate-issuance failure is handled
    #[arg(long, value_enum, default_value_t = TlsPolicy::BestEffort)]
    pub tls_policy: TlsPolicy,

    /// Node capacity reservation: percent:<n> or fixed:<mem-mib>,<disk-mib>
    #[arg(long, default_value = "percent:20")]
    pub reserve: String,

    /// Timezone for the application configuration
    #[arg(long, default_value = "UTC")]
    pub timezone: String,
}

/// Number of mandatory positional parameters
const POSITIONAL_REQUIRED: usize = 8;

/// Build the validated install request from either input form
pub fn build_request(args: &InstallArgs) -> Result<InstallRequest> {
    let reserve: ReservePolicy = args.reserve.parse()?;

    let request = if !args.positional.is_empty() {
        build_from_positional(args, reserve)?
    } else {
        build_from_flags(args, reserve)?
    };

    request.validate_all()?;
    Ok(request)
}

fn build_from_positional(args: &InstallArgs, reserve: ReservePolicy) -> Result<InstallRequest> {
    let p = &args.positional;
    if p.len() < POSITIONAL_REQUIRED {
        return Err(InstallError::usage(format!(
            "Positional form needs {} parameters (domain ssl email user first last pass wings), got {}",
            POSITIONAL_REQUIRED,
            p.len()
        )));
    }

    Ok(InstallRequest {
        domain: p[0].clone(),
        use_ssl: parse_bool_like(&p[1])?,
        tls_policy: args.tls_policy,
        admin_email: p[2].clone(),
        admin_username: p[3].clone(),
        first_name: p[4].clone(),
        last_name: p[5].clone(),
        admin_password: p[6].clone(),
        deploy_wings: parse_bool_like(&p[7])?,
        node_domain: p.get(8).cloned(),
        reserve,
        timezone: args.timezone.clone(),
    })
}

fn build_from_flags(args: &InstallArgs, reserve: ReservePolicy) -> Result<InstallRequest> {
    let mut missing = Vec::new();
    let mut required = |name: &'static str, value: &Option<String>| -> String {
        match value {
            Some(v) => v.clone(),
            None => {
                missing.push(name);
                String::new()
            }
        }
    };

    let domain = required("--domain", &args.domain);
    let ssl = required("--ssl", &args.ssl);
    let email = required("--email", &args.email);
    let admin = required("--admin", &args.admin);
    let first = required("--first", &args.first);
    let last = required("--last", &args.last);
    let pass = required("--pass", &args.pass);
    let wings = required("--wings", &args.wings);

    if !missing.is_empty() {
        return Err(InstallError::usage(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        )));
    }

    Ok(InstallRequest {
        domain,
        use_ssl: parse_bool_like(&ssl)?,
        tls_policy: args.tls_policy,
        admin_email: email,
        admin_username: admin,
        first_name: first,
        last_name: last,
        admin_password: pass,
        deploy_wings: parse_bool_like(&wings)?,
        node_domain: args.node_domain.clone(),
        reserve,
        timezone: args.timezone.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_args() -> InstallArgs {
        InstallArgs {
            positional: Vec::new(),
            domain: Some("panel.example.com".to_string()),
            ssl: Some("true".to_string()),
            email: Some("admin@example.com".to_string()),
            admin: Some("admin".to_string()),
            first: Some("Ada".to_string()),
            last: Some("Lovelace".to_string()),
            pass: Some("correcthorse".to_string()),
            wings: Some("false".to_string()),
            node_domain: None,
            tls_policy: TlsPolicy::BestEffort,
            reserve: "percent:20".to_string(),
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_build_from_flags() {
        let request = build_request(&flag_args()).unwrap();
        assert_eq!(request.domain, "panel.example.com");
        assert!(request.use_ssl);
        assert!(!request.deploy_wings);
        assert_eq!(request.base_url(), "https://panel.example.com");
    }

    #[test]
    fn test_missing_flags_listed_in_usage_error() {
        let mut args = flag_args();
        args.domain = None;
        args.pass = None;

        let err = build_request(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let text = err.to_string();
        assert!(text.contains("--domain"));
        assert!(text.contains("--pass"));
    }

    #[test]
    fn test_build_from_positional() {
        let args = InstallArgs {
            positional: vec![
                "panel.example.com",
                "false",
                "admin@example.com",
                "admin",
                "Ada",
                "Lovelace",
                "correcthorse",
                "true",
                "node.example.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            reserve: "percent:20".to_string(),
            timezone: "UTC".to_string(),
            ..Default::default()
        };

        let request = build_request(&args).unwrap();
        assert_eq!(request.base_url(), "http://panel.example.com");
        assert!(request.deploy_wings);
        assert_eq!(request.node_domain.as_deref(), Some("node.example.com"));
    }

    #[test]
    fn test_positional_arity_enforced() {
        let args = InstallArgs {
            positional: vec!["panel.example.com".to_string(), "true".to_string()],
            reserve: "percent:20".to_string(),
            timezone: "UTC".to_string(),
            ..Default::default()
        };

        let err = build_request(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_string_booleans_rejected_when_malformed() {
        let mut args = flag_args();
        args.ssl = Some("enabled".to_string());

        let err = build_request(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_reserve_policy_flows_through() {
        let mut args = flag_args();
        args.reserve = "fixed:1024,10240".to_string();

        let request = build_request(&args).unwrap();
        assert_eq!(
            request.reserve,
            ReservePolicy::Fixed {
                memory_mib: 1024,
                disk_mib: 10240
            }
        );
    }

    #[test]
    fn test_cli_parses_install_subcommand() {
        use clap::Parser;
        let cli = Cli::parse_from([
            "pterodactyl-install-agent",
            "install",
            "--domain",
            "panel.example.com",
            "--ssl",
            "true",
            "--email",
            "admin@example.com",
            "--admin",
            "admin",
            "--first",
            "Ada",
            "--last",
            "Lovelace",
            "--pass",
            "correcthorse",
            "--wings",
            "false",
        ]);

        match cli.command {
            Commands::Install(args) => {
                let request = build_request(&args).unwrap();
                assert_eq!(request.admin_username, "admin");
            }
            _ => panic!("expected install subcommand"),
        }
    }

    #[test]
    fn test_cli_accepts_long_form_aliases() {
        use clap::Parser;
        let cli = Cli::parse_from([
            "pterodactyl-install-agent",
            "install",
            "--panel-domain",
            "panel.example.com",
            "--use-ssl",
            "false",
            "--admin-email",
            "admin@example.com",
            "--admin-user",
            "admin",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--admin-pass",
            "correcthorse",
            "--deploy-wings",
            "true",
        ]);

        match cli.command {
            Commands::Install(args) => {
                let request = build_request(&args).unwrap();
                assert!(request.deploy_wings);
                assert!(!request.use_ssl);
            }
            _ => panic!("expected install subcommand"),
        }
    }
}
