// file: src/stages/wings.rs
// version: 1.3.0
// guid: 0b95d2c7-e613-4f48-a07b-58c2f9a1d364

//! Node agent stage
//!
//! Installs the container runtime and the wings daemon, registers a
//! location and node record through the panel CLI with computed resource
//! capacity, fetches the node identity back out of the datastore, renders
//! the daemon's configuration file with owner-only permissions, wires a
//! dedicated vhost for the node API, and verifies the control port accepts
//! connections before declaring success. The whole stage is gated by the
//! install request's wings flag.

use crate::config::paths;
use crate::config::request::{InstallRequest, TlsPolicy};
use crate::error::InstallError;
use crate::network::NetworkDownloader;
use crate::stages::{database, exec, StageReport};
use crate::template;
use crate::utils::system::SystemUtils;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const STAGE: &str = "node agent";

/// Location record the node is registered under
const LOCATION_SHORT: &str = "local";
const LOCATION_LONG: &str = "Local installation";

/// Control port poll budget: short fixed-delay intervals, no backoff
pub const PORT_CHECK_ATTEMPTS: u32 = 10;
pub const PORT_CHECK_DELAY: Duration = Duration::from_secs(2);

const WINGS_UNIT_TEMPLATE: &str = "\
[Unit]
Description=Wings Daemon
After=docker.service
Requires=docker.service
PartOf=docker.service

[Service]
User=root
WorkingDirectory={{config_dir}}
LimitNOFILE=4096
PIDFile=/var/run/wings/daemon.pid
ExecStart={{wings_bin}}
Restart=on-failure
RestartSec=5s
StartLimitInterval=180
StartLimitBurst=30

[Install]
WantedBy=multi-user.target
";

/// Node API vhost. Requests carrying an Authorization header are daemon
/// API traffic and get proxied; bare browser hits are sent to the panel.
const NODE_VHOST_TLS_TEMPLATE: &str = "\
map $http_authorization $node_route {
    default \"browser\";
    \"~.+\"   \"api\";
}

server {
    listen 443 ssl http2;
    server_name {{node_domain}};

    ssl_certificate {{cert}};
    ssl_certificate_key {{key}};
    ssl_protocols TLSv1.2 TLSv1.3;

    location / {
        if ($node_route = \"browser\") {
            return 301 {{panel_url}};
        }

        proxy_pass http://127.0.0.1:{{daemon_port}};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection \"upgrade\";
        proxy_buffering off;
        proxy_request_buffering off;
    }
}
";

const NODE_VHOST_PLAIN_TEMPLATE: &str = "\
map $http_authorization $node_route {
    default \"browser\";
    \"~.+\"   \"api\";
}

server {
    listen 80;
    server_name {{node_domain}};

    location / {
        if ($node_route = \"browser\") {
            return 301 {{panel_url}};
        }

        proxy_pass http://127.0.0.1:{{daemon_port}};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection \"upgrade\";
        proxy_buffering off;
        proxy_request_buffering off;
    }
}
";

/// Capacity advertised for the node record, in MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCapacity {
    pub memory_mib: u64,
    pub disk_mib: u64,
}

/// Apply the reservation policy to host totals
pub fn compute_capacity(
    total_memory_mib: u64,
    total_disk_mib: u64,
    policy: &crate::config::request::ReservePolicy,
) -> NodeCapacity {
    NodeCapacity {
        memory_mib: policy.usable_memory(total_memory_mib),
        disk_mib: policy.usable_disk(total_disk_mib),
    }
}

/// Identity and credentials the panel assigned to the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub uuid: String,
    pub token_id: String,
    pub token: String,
}

/// Parse a `uuid<TAB>token_id<TAB>token` row from the datastore
pub fn parse_node_row(row: &str) -> Result<NodeIdentity> {
    let fields: Vec<&str> = row.trim().split('\t').collect();
    if fields.len() != 3 || fields.iter().any(|f| f.is_empty()) {
        return Err(InstallError::stage(
            STAGE,
            format!("unexpected node record shape: {:?}", row.trim()),
        ));
    }
    Ok(NodeIdentity {
        uuid: fields[0].to_string(),
        token_id: fields[1].to_string(),
        token: fields[2].to_string(),
    })
}

/// Wings daemon configuration, rendered to YAML with owner-only access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingsConfig {
    pub debug: bool,
    pub uuid: String,
    pub token_id: String,
    pub token: String,
    pub api: WingsApi,
    pub system: WingsSystem,
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingsApi {
    pub host: String,
    pub port: u16,
    pub ssl: WingsSsl,
    pub upload_limit: u32,
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingsSsl {
    pub enabled: bool,
    pub cert: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingsSystem {
    pub data: String,
    pub sftp: WingsSftp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingsSftp {
    pub bind_port: u16,
}

/// Build the daemon configuration for a registered node
pub fn build_wings_config(
    request: &InstallRequest,
    identity: &NodeIdentity,
    tls_active: bool,
) -> WingsConfig {
    let node_fqdn = request.node_fqdn();
    WingsConfig {
        debug: false,
        uuid: identity.uuid.clone(),
        token_id: identity.token_id.clone(),
        token: identity.token.clone(),
        api: WingsApi {
            host: "0.0.0.0".to_string(),
            port: paths::WINGS_DAEMON_PORT,
            ssl: WingsSsl {
                enabled: tls_active,
                cert: paths::cert_fullchain(node_fqdn),
                key: paths::cert_privkey(node_fqdn),
            },
            upload_limit: 100,
            trusted_proxies: vec!["127.0.0.1".to_string()],
        },
        system: WingsSystem {
            data: paths::WINGS_DATA_DIR.to_string(),
            sftp: WingsSftp {
                bind_port: paths::WINGS_SFTP_PORT,
            },
        },
        remote: request.base_url(),
    }
}

/// Panel CLI arguments registering the node record
pub fn node_make_args(
    request: &InstallRequest,
    capacity: NodeCapacity,
    location_id: &str,
) -> Vec<String> {
    let scheme = if request.use_ssl { "https" } else { "http" };
    [
        "artisan",
        "p:node:make",
        "--name",
        request.node_fqdn(),
        "--description",
        "Node provisioned by the install agent",
        "--locationId",
        location_id,
        "--fqdn",
        request.node_fqdn(),
        "--public",
        "1",
        "--scheme",
        scheme,
        "--proxy",
        "0",
        "--maintenance",
        "0",
        "--maxMemory",
        &capacity.memory_mib.to_string(),
        "--overallocateMemory",
        "0",
        "--maxDisk",
        &capacity.disk_mib.to_string(),
        "--overallocateDisk",
        "0",
        "--uploadSize",
        "100",
        "--daemonListeningPort",
        &paths::WINGS_DAEMON_PORT.to_string(),
        "--daemonSFTPPort",
        &paths::WINGS_SFTP_PORT.to_string(),
        "--daemonBase",
        paths::WINGS_DATA_DIR,
        "--no-interaction",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Wait for a TCP port to accept connections, bounded fixed-delay polling
pub async fn wait_for_port(addr: &str, attempts: u32, delay: Duration) -> Result<()> {
    for attempt in 1..=attempts {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => {
                debug!("Port check passed on attempt {}", attempt);
                return Ok(());
            }
            Err(e) => {
                debug!("Port check attempt {}/{} failed: {}", attempt, attempts, e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(InstallError::stage(
        STAGE,
        format!(
            "control port {} did not accept connections after {} attempts",
            addr, attempts
        ),
    ))
}

/// Install the container runtime, guarded by its presence
async fn ensure_docker() -> Result<()> {
    if exec::succeeds("bash", &["-c", "command -v docker >/dev/null"]).await {
        debug!("Container runtime already installed, skipping");
    } else {
        info!("Installing container runtime");
        exec::run_script(
            "curl -sSL https://get.docker.com/ | CHANNEL=stable bash",
            "install container runtime",
        )
        .await?;
    }
    exec::run_checked(
        "systemctl",
        &["enable", "--now", "docker"],
        "enable container runtime",
    )
    .await?;
    Ok(())
}

/// Ensure the location record exists, returning its id
async fn ensure_location() -> Result<String> {
    let lookup = format!(
        "SELECT id FROM panel.locations WHERE short = '{}' LIMIT 1;",
        LOCATION_SHORT
    );
    let existing = database::query(&lookup, "look up location record").await?;
    if !existing.trim().is_empty() {
        debug!("Location record already present, skipping creation");
        return Ok(existing.trim().to_string());
    }

    info!("Registering location record");
    exec::run_checked_in(
        paths::PANEL_ROOT,
        "php",
        &[
            "artisan".to_string(),
            "p:location:make".to_string(),
            "--short".to_string(),
            LOCATION_SHORT.to_string(),
            "--long".to_string(),
            LOCATION_LONG.to_string(),
            "--no-interaction".to_string(),
        ],
        "register location record",
    )
    .await?;

    let id = database::query(&lookup, "look up location record").await?;
    Ok(id.trim().to_string())
}

/// Ensure the node record exists, returning its identity from the datastore
async fn ensure_node(request: &InstallRequest) -> Result<NodeIdentity> {
    let lookup = format!(
        "SELECT uuid, daemon_token_id, daemon_token FROM panel.nodes WHERE fqdn = '{}' LIMIT 1;",
        request.node_fqdn()
    );

    let existing = database::query(&lookup, "look up node record").await?;
    if !existing.trim().is_empty() {
        debug!("Node record already present, skipping registration");
        return parse_node_row(&existing);
    }

    let location_id = ensure_location().await?;
    let capacity = compute_capacity(
        SystemUtils::total_memory_mib(),
        SystemUtils::total_disk_mib(paths::WINGS_DATA_DIR),
        &request.reserve,
    );
    info!(
        "Registering node record ({} MiB memory, {} MiB disk usable)",
        capacity.memory_mib, capacity.disk_mib
    );

    exec::run_checked_in(
        paths::PANEL_ROOT,
        "php",
        &node_make_args(request, capacity, &location_id),
        "register node record",
    )
    .await?;

    let row = database::query(&lookup, "fetch node credentials").await?;
    parse_node_row(&row)
}

/// Render and activate the node API vhost
async fn configure_node_vhost(request: &InstallRequest, tls_active: bool) -> Result<()> {
    let node_domain = match &request.node_domain {
        Some(domain) => domain.as_str(),
        None => {
            debug!("No distinct node domain; node vhost not rendered");
            return Ok(());
        }
    };

    let panel_url = request.base_url();
    let daemon_port = paths::WINGS_DAEMON_PORT.to_string();
    let vhost = if tls_active {
        let cert = paths::cert_fullchain(node_domain);
        let key = paths::cert_privkey(node_domain);
        template::render(
            NODE_VHOST_TLS_TEMPLATE,
            &[
                ("node_domain", node_domain),
                ("cert", &cert),
                ("key", &key),
                ("panel_url", &panel_url),
                ("daemon_port", &daemon_port),
            ],
        )?
    } else {
        template::render(
            NODE_VHOST_PLAIN_TEMPLATE,
            &[
                ("node_domain", node_domain),
                ("panel_url", &panel_url),
                ("daemon_port", &daemon_port),
            ],
        )?
    };

    let available = format!("{}/{}", paths::NGINX_AVAILABLE_DIR, paths::WINGS_VHOST_NAME);
    let enabled = format!("{}/{}", paths::NGINX_ENABLED_DIR, paths::WINGS_VHOST_NAME);
    SystemUtils::write_file_with_mode(&available, &vhost, 0o644).await?;
    exec::run_checked("ln", &["-sf", &available, &enabled], "enable node vhost").await?;
    exec::run_checked("nginx", &["-t"], "proxy configuration check").await?;
    exec::run_checked("systemctl", &["reload", "nginx"], "reload proxy").await?;
    Ok(())
}

/// Install, register, configure, and start the node agent
pub async fn run(request: &InstallRequest, downloader: &NetworkDownloader) -> Result<StageReport> {
    if !request.deploy_wings {
        return Ok(StageReport::skipped(STAGE, "wings deployment not requested"));
    }

    ensure_docker().await?;

    info!("Installing wings binary at {}", paths::WINGS_BINARY_PATH);
    if !downloader.verify_url(paths::WINGS_BINARY_URL).await? {
        return Err(InstallError::stage(
            STAGE,
            format!("release endpoint unreachable: {}", paths::WINGS_BINARY_URL),
        ));
    }
    downloader
        .download(paths::WINGS_BINARY_URL, paths::WINGS_BINARY_PATH)
        .await?;
    exec::run_checked(
        "chmod",
        &["0755", paths::WINGS_BINARY_PATH],
        "mark wings executable",
    )
    .await?;

    let identity = ensure_node(request).await?;

    // A distinct node domain gets its own certificate, under the same
    // policy as the panel certificate.
    let mut warning: Option<String> = None;
    let mut tls_active = false;
    if request.use_ssl {
        if let Some(node_domain) = &request.node_domain {
            exec::run_checked("systemctl", &["stop", "nginx"], "stop proxy").await?;
            let issued =
                crate::stages::proxy::issue_certificate(node_domain, &request.admin_email).await;
            exec::run_checked("systemctl", &["start", "nginx"], "start proxy").await?;

            match issued {
                Ok(()) => tls_active = true,
                Err(e) => match request.tls_policy {
                    TlsPolicy::Strict => {
                        return Err(InstallError::stage(
                            STAGE,
                            format!(
                                "node certificate issuance failed under strict TLS policy: {}",
                                e
                            ),
                        ));
                    }
                    TlsPolicy::BestEffort => {
                        let text = format!(
                            "Node certificate issuance for {} failed ({}). The daemon is \
                             configured without TLS; fix DNS/connectivity and re-run issuance.",
                            node_domain, e
                        );
                        warn!("{}", text);
                        warning = Some(text);
                    }
                },
            }
        }
    }

    tokio::fs::create_dir_all(paths::WINGS_CONFIG_DIR).await?;
    tokio::fs::create_dir_all(paths::WINGS_DATA_DIR).await?;

    let config = build_wings_config(request, &identity, tls_active);
    let yaml = serde_yaml::to_string(&config)?;
    SystemUtils::write_file_with_mode(paths::WINGS_CONFIG_PATH, &yaml, 0o600).await?;
    info!("Wings configuration written to {}", paths::WINGS_CONFIG_PATH);

    template::render_to_file(
        WINGS_UNIT_TEMPLATE,
        &[
            ("config_dir", paths::WINGS_CONFIG_DIR),
            ("wings_bin", paths::WINGS_BINARY_PATH),
        ],
        paths::WINGS_UNIT_PATH,
        0o644,
    )
    .await?;

    configure_node_vhost(request, tls_active).await?;

    exec::run_checked("systemctl", &["daemon-reload"], "systemd daemon-reload").await?;
    exec::run_checked(
        "systemctl",
        &["enable", "--now", "wings"],
        "enable wings daemon",
    )
    .await?;

    let addr = format!("127.0.0.1:{}", paths::WINGS_DAEMON_PORT);
    info!("Waiting for wings control port at {}", addr);
    wait_for_port(&addr, PORT_CHECK_ATTEMPTS, PORT_CHECK_DELAY).await?;

    info!("Wings daemon running");
    match warning {
        Some(text) => Ok(StageReport::warning(STAGE, text)),
        None => Ok(StageReport::completed(STAGE)),
    }
}
