// file: src/stages/database.rs
// version: 1.1.0
// guid: b6f03c58-12d9-4ae7-8051-94c7e2a6d3b8

//! Datastore provisioning stage
//!
//! Creates the panel database and its loopback-scoped account through the
//! database engine's administrative interface. Every statement is guarded
//! so a repeated run is a no-op rather than a duplicate-object error; the
//! account password is re-applied on every run to keep the grant in step
//! with the freshly generated secret. Failure here is fatal.

use crate::config::paths;
use crate::stages::{exec, secrets::Secrets, StageReport};
use crate::Result;
use tracing::info;

const STAGE: &str = "datastore";

/// The idempotent statement sequence for a database/user pair
pub fn provisioning_statements(database: &str, user: &str, host: &str, password: &str) -> Vec<String> {
    vec![
        format!("CREATE DATABASE IF NOT EXISTS `{}`;", database),
        format!(
            "CREATE USER IF NOT EXISTS '{}'@'{}' IDENTIFIED BY '{}';",
            user, host, password
        ),
        format!(
            "ALTER USER '{}'@'{}' IDENTIFIED BY '{}';",
            user, host, password
        ),
        format!(
            "GRANT ALL PRIVILEGES ON `{}`.* TO '{}'@'{}' WITH GRANT OPTION;",
            database, user, host
        ),
        "FLUSH PRIVILEGES;".to_string(),
    ]
}

/// Create the database, the account, and the grant
pub async fn run(secrets: &Secrets) -> Result<StageReport> {
    info!(
        "Provisioning database '{}' and account '{}'@'{}'",
        paths::DB_NAME,
        paths::DB_USER,
        paths::DB_HOST
    );

    for statement in provisioning_statements(
        paths::DB_NAME,
        paths::DB_USER,
        paths::DB_HOST,
        &secrets.db_password,
    ) {
        exec::run_checked(
            "mariadb",
            &["-u", "root", "-e", &statement],
            "datastore provisioning",
        )
        .await?;
    }

    info!("Datastore objects in place");
    Ok(StageReport::completed(STAGE))
}

/// Run a query as the administrative account and return raw output
///
/// Used by the node agent stage to fetch the registered node's identity.
pub async fn query(sql: &str, context: &str) -> Result<String> {
    exec::run_checked("mariadb", &["-u", "root", "-N", "-B", "-e", sql], context).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_creation_statements_are_guarded() {
        let statements = provisioning_statements("panel", "pterodactyl", "127.0.0.1", "pw");
        for statement in &statements {
            if statement.starts_with("CREATE") {
                assert!(
                    statement.contains("IF NOT EXISTS"),
                    "unguarded statement: {}",
                    statement
                );
            }
        }
    }

    #[test]
    fn test_statement_sequence_shape() {
        let statements = provisioning_statements("panel", "pterodactyl", "127.0.0.1", "s3cret");

        assert_eq!(statements.len(), 5);
        assert!(statements[0].contains("CREATE DATABASE IF NOT EXISTS `panel`"));
        assert!(statements[1].contains("'pterodactyl'@'127.0.0.1'"));
        assert!(statements[1].contains("s3cret"));
        assert!(statements[3].contains("GRANT ALL PRIVILEGES ON `panel`.*"));
        assert_eq!(statements[4], "FLUSH PRIVILEGES;");
    }

    #[test]
    fn test_statements_identical_across_runs() {
        // Re-running with the same request must produce the same statements
        let first = provisioning_statements("panel", "pterodactyl", "127.0.0.1", "pw");
        let second = provisioning_statements("panel", "pterodactyl", "127.0.0.1", "pw");
        assert_eq!(first, second);
    }

    #[test]
    fn test_user_is_loopback_scoped() {
        let statements = provisioning_statements("panel", "pterodactyl", "127.0.0.1", "pw");
        assert!(statements.iter().any(|s| s.contains("@'127.0.0.1'")));
        assert!(!statements.iter().any(|s| s.contains("@'%'")));
    }
}
