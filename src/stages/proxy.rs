// file: src/stages/proxy.rs
// version: 1.2.0
// guid: f84b06d1-3ce9-4a27-b580-91c6e4d2a735

//! Reverse proxy stage
//!
//! Renders the panel vhost, activates it, and reloads the proxy. With TLS
//! requested the proxy is stopped first to free the validation port, the
//! certificate requested non-interactively, and the proxy brought back up.
//! Certificate failure is governed by the configured TLS policy: strict
//! aborts the run, best-effort continues on plain HTTP with a warning.

use crate::config::paths;
use crate::config::request::{InstallRequest, TlsPolicy};
use crate::error::InstallError;
use crate::stages::{exec, StageReport};
use crate::template;
use crate::Result;
use tracing::{info, warn};

const STAGE: &str = "proxy";

const HTTP_VHOST_TEMPLATE: &str = "\
server {
    listen 80;
    server_name {{domain}};

    root {{panel_root}}/public;
    index index.php;

    access_log /var/log/nginx/panel.app-access.log;
    error_log  /var/log/nginx/panel.app-error.log error;

    client_max_body_size 100m;
    client_body_timeout 120s;

    location / {
        try_files $uri $uri/ /index.php?$query_string;
    }

    location ~ \\.php$ {
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:/run/php/php8.1-fpm.sock;
    }

    location ~ /\\.ht {
        deny all;
    }
}
";

const HTTPS_VHOST_TEMPLATE: &str = "\
server {
    listen 80;
    server_name {{domain}};
    return 301 https://$server_name$request_uri;
}

server {
    listen 443 ssl http2;
    server_name {{domain}};

    root {{panel_root}}/public;
    index index.php;

    access_log /var/log/nginx/panel.app-access.log;
    error_log  /var/log/nginx/panel.app-error.log error;

    client_max_body_size 100m;
    client_body_timeout 120s;

    ssl_certificate {{cert}};
    ssl_certificate_key {{key}};
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_prefer_server_ciphers on;

    location / {
        try_files $uri $uri/ /index.php?$query_string;
    }

    location ~ \\.php$ {
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:/run/php/php8.1-fpm.sock;
    }

    location ~ /\\.ht {
        deny all;
    }
}
";

/// Render the panel vhost for the requested scheme
pub fn render_panel_vhost(domain: &str, with_tls: bool) -> Result<String> {
    if with_tls {
        let cert = paths::cert_fullchain(domain);
        let key = paths::cert_privkey(domain);
        template::render(
            HTTPS_VHOST_TEMPLATE,
            &[
                ("domain", domain),
                ("panel_root", paths::PANEL_ROOT),
                ("cert", &cert),
                ("key", &key),
            ],
        )
    } else {
        template::render(
            HTTP_VHOST_TEMPLATE,
            &[("domain", domain), ("panel_root", paths::PANEL_ROOT)],
        )
    }
}

/// Request a certificate from the certificate authority, non-interactively
///
/// The proxy must already be stopped so the standalone validator can bind
/// the challenge port.
pub async fn issue_certificate(domain: &str, email: &str) -> Result<()> {
    exec::run_checked(
        "certbot",
        &[
            "certonly",
            "--standalone",
            "--non-interactive",
            "--agree-tos",
            "--email",
            email,
            "-d",
            domain,
        ],
        "certificate issuance",
    )
    .await?;
    Ok(())
}

/// Write a vhost into sites-available and link it into sites-enabled
async fn activate_vhost(name: &str, content: &str) -> Result<()> {
    let available = format!("{}/{}", paths::NGINX_AVAILABLE_DIR, name);
    let enabled = format!("{}/{}", paths::NGINX_ENABLED_DIR, name);

    crate::utils::system::SystemUtils::write_file_with_mode(&available, content, 0o644).await?;
    exec::run_checked("ln", &["-sf", &available, &enabled], "enable vhost").await?;
    Ok(())
}

/// Remove the stock default site; absence is fine
async fn remove_default_site() {
    if let Err(e) = tokio::fs::remove_file(paths::NGINX_DEFAULT_SITE).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove default site: {}", e);
        }
    }
}

/// Configure and (re)start the reverse proxy, with optional TLS
pub async fn run(request: &InstallRequest) -> Result<StageReport> {
    remove_default_site().await;

    let mut tls_active = false;
    let mut warning: Option<String> = None;

    if request.use_ssl {
        info!("Stopping proxy to free the validation port");
        exec::run_checked("systemctl", &["stop", "nginx"], "stop proxy").await?;

        match issue_certificate(&request.domain, &request.admin_email).await {
            Ok(()) => {
                info!("Certificate issued for {}", request.domain);
                tls_active = true;
            }
            Err(e) => match request.tls_policy {
                TlsPolicy::Strict => {
                    return Err(InstallError::stage(
                        STAGE,
                        format!("certificate issuance failed under strict TLS policy: {}", e),
                    ));
                }
                TlsPolicy::BestEffort => {
                    let text = format!(
                        "Certificate issuance for {} failed ({}). Continuing without TLS; \
                         check that the domain's DNS record points at this host and port 80 \
                         is reachable, then re-run certificate issuance manually.",
                        request.domain, e
                    );
                    warn!("{}", text);
                    warning = Some(text);
                }
            },
        }
    }

    let vhost = render_panel_vhost(&request.domain, tls_active)?;
    activate_vhost(paths::PANEL_VHOST_NAME, &vhost).await?;

    exec::run_checked("nginx", &["-t"], "proxy configuration check").await?;
    exec::run_checked("systemctl", &["enable", "--now", "nginx"], "enable proxy").await?;
    exec::run_checked("systemctl", &["restart", "nginx"], "restart proxy").await?;

    info!("Proxy serving {}", request.base_url());
    match warning {
        Some(text) => Ok(StageReport::warning(STAGE, text)),
        None => Ok(StageReport::completed(STAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_vhost_renders_domain() {
        let vhost = render_panel_vhost("panel.example.com", false).unwrap();
        assert!(vhost.contains("server_name panel.example.com;"));
        assert!(vhost.contains("listen 80;"));
        assert!(!vhost.contains("ssl_certificate"));
        assert!(!vhost.contains("{{"));
    }

    #[test]
    fn test_https_vhost_redirects_and_terminates_tls() {
        let vhost = render_panel_vhost("panel.example.com", true).unwrap();
        assert!(vhost.contains("return 301 https://$server_name$request_uri;"));
        assert!(vhost.contains("listen 443 ssl http2;"));
        assert!(vhost.contains("/etc/letsencrypt/live/panel.example.com/fullchain.pem"));
        assert!(vhost.contains("/etc/letsencrypt/live/panel.example.com/privkey.pem"));
        assert!(!vhost.contains("{{"));
    }

    #[test]
    fn test_vhost_serves_panel_public_root() {
        let vhost = render_panel_vhost("panel.example.com", false).unwrap();
        assert!(vhost.contains("root /var/www/pterodactyl/public;"));
    }
}
