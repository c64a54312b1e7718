// file: src/config/paths.rs
// version: 1.0.1
// guid: c58f13a9-7e06-4b2d-a1c8-90d4e2f7b615

//! Fixed filesystem locations and external endpoints
//!
//! Every stage reads these constants instead of ambient environment state;
//! the layout matches what the panel and wings expect out of the box.

/// Application root the panel archive is extracted into
pub const PANEL_ROOT: &str = "/var/www/pterodactyl";

/// Release archive for the panel application
pub const PANEL_ARCHIVE_URL: &str =
    "https://github.com/pterodactyl/panel/releases/latest/download/panel.tar.gz";

/// Release binary for the wings daemon (amd64 target only)
pub const WINGS_BINARY_URL: &str =
    "https://github.com/pterodactyl/wings/releases/latest/download/wings_linux_amd64";

/// Install location for the wings executable
pub const WINGS_BINARY_PATH: &str = "/usr/local/bin/wings";

/// Directory holding the wings daemon configuration
pub const WINGS_CONFIG_DIR: &str = "/etc/pterodactyl";

/// Wings daemon configuration file (written with owner-only permissions)
pub const WINGS_CONFIG_PATH: &str = "/etc/pterodactyl/config.yml";

/// Root directory for sandboxed workload volumes
pub const WINGS_DATA_DIR: &str = "/var/lib/pterodactyl/volumes";

/// Systemd unit for the panel queue worker
pub const QUEUE_UNIT_PATH: &str = "/etc/systemd/system/pteroq.service";

/// Systemd unit for the wings daemon
pub const WINGS_UNIT_PATH: &str = "/etc/systemd/system/wings.service";

/// Nginx site configuration directories
pub const NGINX_AVAILABLE_DIR: &str = "/etc/nginx/sites-available";
pub const NGINX_ENABLED_DIR: &str = "/etc/nginx/sites-enabled";

/// Stock nginx site that conflicts with the panel vhost
pub const NGINX_DEFAULT_SITE: &str = "/etc/nginx/sites-enabled/default";

/// Vhost file names for the panel and the wings API
pub const PANEL_VHOST_NAME: &str = "pterodactyl.conf";
pub const WINGS_VHOST_NAME: &str = "wings.conf";

/// Privileged-only summary record written at the end of a run
pub const SUMMARY_PATH: &str = "/root/pterodactyl-install-summary.txt";

/// Account the panel runs as; all application files end up owned by it
pub const SERVICE_USER: &str = "www-data";

/// Datastore coordinates
pub const DB_NAME: &str = "panel";
pub const DB_USER: &str = "pterodactyl";
pub const DB_HOST: &str = "127.0.0.1";
pub const DB_PORT: u16 = 3306;

/// Wings listening ports
pub const WINGS_DAEMON_PORT: u16 = 8080;
pub const WINGS_SFTP_PORT: u16 = 2022;

/// Certificate material issued by the certificate client
pub fn cert_fullchain(domain: &str) -> String {
    format!("/etc/letsencrypt/live/{}/fullchain.pem", domain)
}

pub fn cert_privkey(domain: &str) -> String {
    format!("/etc/letsencrypt/live/{}/privkey.pem", domain)
}
