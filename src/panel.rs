//! Admin settings panel rendering.
//!
//! The panel is pure template substitution over a static HTML template:
//! `lang(key)` resolves a localized string, `config(path,to,key)` a settings
//! value, `other(key)` a pre-computed fragment (checkbox states, the language
//! picker options), `const(NAME)` a crate constant. Posted settings are saved
//! as a full-tree overwrite and reloaded before rendering; a failed write is
//! reported to the admin with the config path and never stops the render.

use crate::config::ConfigStore;
use crate::html;
use crate::locale::{BASE_LANG, LocalizationResolver};
use crate::metrics::Metrics;
use crate::services::release::ReleaseInfo;
use crate::submissions::SubmissionLog;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

pub struct SettingsPanel<'a> {
    config: &'a mut ConfigStore,
    locale: &'a LocalizationResolver,
    log: &'a SubmissionLog,
    template_path: Utf8PathBuf,
    placeholder: Regex,
    metrics: Arc<Metrics>,
}

impl<'a> SettingsPanel<'a> {
    pub fn new(
        config: &'a mut ConfigStore,
        locale: &'a LocalizationResolver,
        log: &'a SubmissionLog,
        template_path: impl AsRef<Utf8Path>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            locale,
            log,
            template_path: template_path.as_ref().to_path_buf(),
            placeholder: Regex::new(r"(const|lang|config|other)\(([^)]+)\)")
                .expect("Invalid placeholder regex"),
            metrics,
        }
    }

    /// Save posted settings if any, then render the full panel: status
    /// banner, optional new-release banner, substituted template, and the
    /// submissions table.
    ///
    /// Only a missing or unreadable template or language registry is an
    /// error, since those are build-time assets. A failed settings write renders
    /// as an admin-visible banner instead.
    pub fn render(
        &mut self,
        posted_settings: Option<&Value>,
        release: Option<&ReleaseInfo>,
    ) -> Result<String> {
        let mut out = String::new();

        if let Some(tree) = posted_settings {
            match self.config.save(tree) {
                Ok(()) => {
                    self.config.reload();
                    self.metrics.record_config_save();
                    out.push_str(&format!(
                        "<div class=\"updated\">{}</div>",
                        html::escape(&self.tr("config_updated"))
                    ));
                }
                Err(err) => {
                    self.metrics.record_config_save_failure();
                    tracing::warn!("Settings save failed: {:#}", err);
                    out.push_str(&format!(
                        "<div class=\"error\">{}<pre>{}</pre></div>",
                        html::escape(&self.tr("config_error_modify")),
                        html::escape(self.config.path().as_str())
                    ));
                }
            }
        }

        if let Some(release) = release {
            out.push_str(&format!(
                "<div class=\"updated\">{}<br/><a href=\"{}\">{} ({})</a></div>",
                html::escape(&self.tr("new_release")),
                html::escape(&release.html_url),
                html::escape(&self.tr("download")),
                html::escape(&release.name)
            ));
        }

        out.push_str(&self.template()?);
        out.push_str(&self.logs_table());
        Ok(out)
    }

    fn template(&self) -> Result<String> {
        let raw = fs::read_to_string(&self.template_path)
            .with_context(|| format!("Failed to read panel template: {}", self.template_path))?;
        let others = self.other_values()?;

        Ok(self
            .placeholder
            .replace_all(&raw, |caps: &Captures| {
                let arg = &caps[2];
                match &caps[1] {
                    "lang" => self.tr(arg),
                    "config" => {
                        let segments: Vec<&str> = arg.split(',').map(str::trim).collect();
                        self.config
                            .get(&segments)
                            .map(display_value)
                            .unwrap_or_default()
                    }
                    "other" => others.get(arg).cloned().unwrap_or_default(),
                    "const" => match arg {
                        "VERSION" => crate::VERSION.to_string(),
                        "CONFIGPATH" => self.config.path().to_string(),
                        "REPOURL" => crate::manager::REPO_URL.to_string(),
                        _ => String::new(),
                    },
                    _ => String::new(),
                }
            })
            .into_owned())
    }

    /// Pre-computed fragments the static template cannot derive itself.
    fn other_values(&self) -> Result<HashMap<String, String>> {
        let checked = |key: &str| {
            if self.config.get_bool(&[key]) {
                "checked=\"checked\" ".to_string()
            } else {
                String::new()
            }
        };

        let mut others = HashMap::new();
        others.insert("disablechecked".to_string(), checked("disable"));
        others.insert("debugchecked".to_string(), checked("debug"));
        others.insert("honeypotchecked".to_string(), checked("use_honeypot"));
        others.insert("default_lang".to_string(), BASE_LANG.to_string());
        others.insert("version".to_string(), crate::VERSION.to_string());

        let configured = self.config.get_str(&["lang"]).unwrap_or("");
        let mut options = format!(
            "<option value=\"\"{}>Default</option>",
            if configured.is_empty() { " selected=\"selected\"" } else { "" }
        );
        for (code, name) in self.locale.available_languages()? {
            let selected = if configured == code { " selected=\"selected\"" } else { "" };
            options.push_str(&format!(
                "<option value=\"{}\"{}>{}</option>",
                html::escape(&code),
                selected,
                html::escape(&name)
            ));
        }
        others.insert("langsoptions".to_string(), options);

        Ok(others)
    }

    fn logs_table(&self) -> String {
        let records = self.log.list();
        if records.is_empty() {
            return String::new();
        }

        let mut rows = String::new();
        for record in records {
            rows.push_str("<tr>");
            for cell in record {
                rows.push_str(&format!("<td>{}</td>", html::escape(&cell)));
            }
            rows.push_str("</tr>");
        }
        format!(
            "<div class=\"logs\"><h2>{}</h2><table>{}</table></div>",
            html::escape(&self.tr("logs")),
            rows
        )
    }

    fn tr(&self, key: &str) -> String {
        self.locale.resolve(key, None)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}
