// file: src/template.rs
// version: 1.0.0
// guid: 6a2f84d0-c95b-4e13-b7a6-08d1e5c3f927

//! Key-value template rendering
//!
//! Configuration files are produced from templates with `{{name}}`
//! placeholders and an explicit substitution map. Rendering fails if any
//! placeholder is left unresolved, so a file is only ever written after
//! full substitution succeeded.

use crate::error::InstallError;
use crate::Result;
use regex::Regex;

/// Render a template against an explicit substitution map
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut output = template.to_string();
    for (key, value) in vars {
        output = output.replace(&format!("{{{{{}}}}}", key), value);
    }

    let placeholder = Regex::new(r"\{\{([a-zA-Z0-9_]+)\}\}").expect("valid placeholder pattern");
    let unresolved: Vec<String> = placeholder
        .captures_iter(&output)
        .map(|c| c[1].to_string())
        .collect();

    if !unresolved.is_empty() {
        return Err(InstallError::template(format!(
            "Unresolved placeholders: {}",
            unresolved.join(", ")
        )));
    }

    Ok(output)
}

/// Render a template and write it to `path` with the given mode
pub async fn render_to_file(
    template: &str,
    vars: &[(&str, &str)],
    path: &str,
    mode: u32,
) -> Result<()> {
    let rendered = render(template, vars)?;
    crate::utils::system::SystemUtils::write_file_with_mode(path, &rendered, mode).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let out = render(
            "server_name {{domain}}; # {{domain}}",
            &[("domain", "panel.example.com")],
        )
        .unwrap();
        assert_eq!(out, "server_name panel.example.com; # panel.example.com");
    }

    #[test]
    fn test_render_fails_on_unresolved_placeholder() {
        let err = render("listen {{port}};", &[("domain", "x")]).unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_render_untouched_without_placeholders() {
        let out = render("plain text", &[]).unwrap();
        assert_eq!(out, "plain text");
    }

    #[tokio::test]
    async fn test_render_to_file_writes_nothing_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.conf");
        let path_str = path.to_str().unwrap().to_string();

        let result = render_to_file("value = {{missing}}", &[], &path_str, 0o644).await;

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
