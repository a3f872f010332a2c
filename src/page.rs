//! Page content processing: the orchestration layer.
//!
//! A [`PageContentProcessor`] is request-scoped. It scans the page for form
//! directives, builds one form per match through the [`FormProvider`] seam,
//! splices each form's markup over its directive in a single left-to-right
//! pass, injects the shared stylesheet reference exactly once, and records
//! the page-load timestamp into the session.

use crate::config::ConfigStore;
use crate::locale::LocalizationResolver;
use crate::metrics::Metrics;
use crate::services::form::{ContactForm, FormStatus, PostData};
use crate::services::scanner::{TagMatch, TagScanner};
use crate::session::{SessionStore, SessionTiming};
use crate::submissions::SubmissionLog;
use std::sync::Arc;

/// Everything a form needs from the current request, borrowed for its
/// duration.
pub struct RenderContext<'a> {
    pub config: &'a ConfigStore,
    pub locale: &'a LocalizationResolver,
    pub log: &'a SubmissionLog,
    /// Pending POST-like input, if the request carried any.
    pub post: Option<&'a PostData>,
    /// Current unix timestamp, injected by the host.
    pub now: i64,
}

/// Builds, runs and renders one form per scanned directive.
///
/// The processor only consumes rendered markup, so hosts (and tests) can
/// substitute their own form component.
pub trait FormProvider {
    /// `index` is the form's 1-based position on the page.
    fn render_form(
        &mut self,
        tag: &TagMatch,
        index: usize,
        ctx: &RenderContext<'_>,
        session: &mut dyn SessionStore,
    ) -> String;
}

/// Default provider backed by [`ContactForm`].
pub struct ContactFormProvider {
    metrics: Arc<Metrics>,
}

impl ContactFormProvider {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl FormProvider for ContactFormProvider {
    fn render_form(
        &mut self,
        tag: &TagMatch,
        index: usize,
        ctx: &RenderContext<'_>,
        session: &mut dyn SessionStore,
    ) -> String {
        let mut form = ContactForm::new(
            ctx.config,
            ctx.locale,
            &tag.spec,
            tag.lang.as_deref(),
            index,
        );
        form.handle_submission(ctx.post, session, ctx.log, ctx.now);
        match form.status() {
            FormStatus::Sent => self.metrics.record_submission_sent(),
            FormStatus::Rejected(_) => self.metrics.record_submission_rejected(),
            FormStatus::Blank => {}
        }
        form.render()
    }
}

/// Request-scoped page processor.
///
/// The stylesheet once-flag lives here, on the request-scoped value, so it
/// cannot leak across requests the way a process-wide static would. The
/// injection fires on the first [`process`](Self::process) call whether or
/// not any directive matched; pages that never show a form still reference
/// the stylesheet.
pub struct PageContentProcessor<'a, F: FormProvider> {
    scanner: TagScanner,
    ctx: RenderContext<'a>,
    session: &'a mut dyn SessionStore,
    forms: F,
    stylesheet_href: String,
    asset_injected: bool,
    metrics: Arc<Metrics>,
}

impl<'a, F: FormProvider> PageContentProcessor<'a, F> {
    pub fn new(
        ctx: RenderContext<'a>,
        session: &'a mut dyn SessionStore,
        forms: F,
        stylesheet_href: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            scanner: TagScanner::new(),
            ctx,
            session,
            forms,
            stylesheet_href: stylesheet_href.into(),
            asset_injected: false,
            metrics,
        }
    }

    /// Replace every live directive with its rendered form and return the
    /// substituted text.
    ///
    /// Replacement is a single pass over the original match list: spliced
    /// output is never re-scanned, so a form whose markup happens to contain
    /// directive syntax cannot trigger another round. Afterwards the
    /// page-load timestamp is recorded once, covering all directives on the
    /// page.
    pub fn process(&mut self, page_text: &str) -> String {
        let tags = self.scanner.scan(page_text);
        self.metrics.record_page_processed(tags.len() as u64);

        let mut rendered = String::with_capacity(page_text.len());
        let mut cursor = 0;
        for (position, tag) in tags.iter().enumerate() {
            rendered.push_str(&page_text[cursor..tag.span.start]);
            let markup = self
                .forms
                .render_form(tag, position + 1, &self.ctx, &mut *self.session);
            rendered.push_str(&markup);
            cursor = tag.span.end;
        }
        rendered.push_str(&page_text[cursor..]);

        if !self.asset_injected {
            rendered = format!(
                "<link rel=\"stylesheet\" href=\"{}\"/>{}",
                self.stylesheet_href, rendered
            );
            self.asset_injected = true;
        }

        self.session.record_page_load(self.ctx.now);
        rendered
    }
}
