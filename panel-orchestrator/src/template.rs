//! Deployment artifact rendering.
//!
//! A product template is a directory tree containing at least a compose
//! descriptor (`docker-compose.yml`) and usually an environment template
//! (`.env.template`). Rendering copies the tree to the deployment's
//! physical path and substitutes a fixed set of `${KEY}` placeholders as
//! literal strings. Template content is never evaluated as code.

use crate::error::{OrchestratorError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

const COMPOSE_FILE: &str = "docker-compose.yml";
const ENV_TEMPLATE_FILE: &str = ".env.template";
const ENV_FILE: &str = ".env";

/// The full set of placeholders a template may reference.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    pub workspace_name: String,
    pub schema_name: String,
    pub subdomain: String,
    pub base_domain: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub secret_key: String,
}

impl TemplateVars {
    fn pairs(&self) -> [(&'static str, &str); 8] {
        [
            ("WORKSPACE_NAME", &self.workspace_name),
            ("SCHEMA_NAME", &self.schema_name),
            ("SUBDOMAIN", &self.subdomain),
            ("BASE_DOMAIN", &self.base_domain),
            ("DB_NAME", &self.db_name),
            ("DB_USER", &self.db_user),
            ("DB_PASSWORD", &self.db_password),
            ("SECRET_KEY", &self.secret_key),
        ]
    }

    /// Literal `${KEY}` substitution.
    pub fn substitute(&self, content: &str) -> String {
        let mut rendered = content.to_string();
        for (key, value) in self.pairs() {
            rendered = rendered.replace(&format!("${{{}}}", key), value);
        }
        rendered
    }
}

/// Render a template tree into `dest_dir` and return the rendered compose
/// descriptor content.
///
/// A stale `dest_dir` from a prior failed attempt is removed first; this
/// is an overwrite, never a merge.
#[instrument(skip(vars))]
pub fn render_template(template_dir: &Path, dest_dir: &Path, vars: &TemplateVars) -> Result<String> {
    if !template_dir.is_dir() {
        return Err(OrchestratorError::TemplateMissing(
            template_dir.display().to_string(),
        ));
    }

    if dest_dir.exists() {
        warn!(dest = %dest_dir.display(), "Removing stale deployment directory");
        fs::remove_dir_all(dest_dir)?;
    }
    fs::create_dir_all(dest_dir)?;

    let mut compose_content = None;

    for entry in WalkDir::new(template_dir) {
        let entry = entry.map_err(|e| {
            OrchestratorError::TemplateMissing(format!(
                "{}: {}",
                template_dir.display(),
                e
            ))
        })?;
        let relative = entry
            .path()
            .strip_prefix(template_dir)
            .expect("walkdir yields paths under its root");
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest_dir.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        match file_name.as_ref() {
            ENV_TEMPLATE_FILE => {
                let rendered = vars.substitute(&fs::read_to_string(entry.path())?);
                fs::write(target.with_file_name(ENV_FILE), rendered)?;
            }
            COMPOSE_FILE => {
                let rendered = vars.substitute(&fs::read_to_string(entry.path())?);
                fs::write(&target, &rendered)?;
                if relative.parent().map(|p| p.as_os_str().is_empty()).unwrap_or(true) {
                    compose_content = Some(rendered);
                }
            }
            _ => {
                fs::copy(entry.path(), &target)?;
            }
        }
    }

    debug!(dest = %dest_dir.display(), "Rendered deployment artifacts");

    compose_content.ok_or_else(|| {
        OrchestratorError::TemplateMissing(format!(
            "{} has no {}",
            template_dir.display(),
            COMPOSE_FILE
        ))
    })
}
