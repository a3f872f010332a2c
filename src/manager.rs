//! Crate façade: one base directory in, page processing and panel out.
//!
//! The manager derives its file set from a single base directory the host
//! points it at:
//!
//! - `config.json`  - settings tree
//! - `log.json`     - submission log
//! - `lang/`        - language tables and registry
//! - `templates/settings.html` - panel template
//!
//! Config is loaded once at construction (one manager per request); every
//! `process_page` call builds a fresh request-scoped processor so the
//! stylesheet once-flag cannot leak between pages.

use crate::config::ConfigStore;
use crate::locale::LocalizationResolver;
use crate::metrics::Metrics;
use crate::page::{ContactFormProvider, PageContentProcessor, RenderContext};
use crate::panel::SettingsPanel;
use crate::services::form::PostData;
use crate::services::release::{self, ReleaseInfo};
use crate::session::SessionStore;
use crate::submissions::SubmissionLog;
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::sync::Arc;

/// Project home, linked from the panel.
pub const REPO_URL: &str = "https://github.com/formgate/formgate";

/// Latest-release endpoint for the best-effort update check.
pub const API_LATEST: &str = "https://api.github.com/repos/formgate/formgate/releases/latest";

pub struct FormgateManager {
    base_dir: Utf8PathBuf,
    style_href: String,
    config: ConfigStore,
    metrics: Arc<Metrics>,
}

impl FormgateManager {
    /// * `base_dir` - directory holding `config.json`, `log.json`, `lang/`
    ///   and `templates/`
    /// * `style_href` - URL under which the host serves the shared stylesheet
    pub fn new<P: AsRef<Utf8Path>>(base_dir: P, style_href: impl Into<String>) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = ConfigStore::load(base_dir.join("config.json"));
        Self {
            base_dir,
            style_href: style_href.into(),
            config,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn locale(&self) -> LocalizationResolver {
        LocalizationResolver::new(
            self.base_dir.join("lang"),
            self.config.get_str(&["lang"]).map(str::to_string),
        )
    }

    pub fn submission_log(&self) -> SubmissionLog {
        SubmissionLog::new(
            self.base_dir.join("log.json"),
            self.config.get_i64(&["logs_count"]).unwrap_or(0),
        )
    }

    /// Parse one page: replace directives with rendered forms, handling any
    /// pending POST input, and record the page-load timing signal.
    pub fn process_page(
        &self,
        page_text: &str,
        session: &mut dyn SessionStore,
        post: Option<&PostData>,
        now: i64,
    ) -> String {
        let locale = self.locale();
        let log = self.submission_log();
        let ctx = RenderContext {
            config: &self.config,
            locale: &locale,
            log: &log,
            post,
            now,
        };
        let mut processor = PageContentProcessor::new(
            ctx,
            session,
            ContactFormProvider::new(self.metrics.clone()),
            self.style_href.as_str(),
            self.metrics.clone(),
        );
        processor.process(page_text)
    }

    /// Render the admin panel, saving `posted_settings` first when present.
    pub fn render_panel(
        &mut self,
        posted_settings: Option<&Value>,
        release: Option<&ReleaseInfo>,
    ) -> Result<String> {
        let locale = LocalizationResolver::new(
            self.base_dir.join("lang"),
            self.config.get_str(&["lang"]).map(str::to_string),
        );
        let log = SubmissionLog::new(
            self.base_dir.join("log.json"),
            self.config.get_i64(&["logs_count"]).unwrap_or(0),
        );
        let template_path = self.base_dir.join("templates").join("settings.html");
        let mut panel = SettingsPanel::new(
            &mut self.config,
            &locale,
            &log,
            template_path,
            self.metrics.clone(),
        );
        panel.render(posted_settings, release)
    }

    /// Fire the best-effort release check. Safe to skip entirely; failures
    /// and absence of a newer version both come back as `None`.
    pub async fn check_release(&self) -> Option<ReleaseInfo> {
        release::check_latest(API_LATEST, crate::VERSION).await
    }
}
