use crate::config::ConfigStore;
use crate::html;
use crate::locale::LocalizationResolver;
use crate::session::{SessionStore, SessionTiming};
use crate::submissions::SubmissionLog;
use regex::Regex;
use std::collections::HashMap;

/// POST-like input pending for the current request.
pub type PostData = HashMap<String, String>;

/// Hidden field whose being filled in marks an automated submission.
pub const HONEYPOT_FIELD: &str = "website";

/// Hidden field carrying the 1-based position of the form on its page, so
/// that on pages with several forms only the posted one consumes the input.
pub const FORM_ID_FIELD: &str = "form_id";

/// One form field parsed from a directive's field specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Trailing `!` in the specification marks the field required.
    pub required: bool,
}

/// Why a submission was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Honeypot,
    TooFastAfterLoad,
    TooFastBetweenPosts,
    HourlyLimit,
    MissingField,
    InvalidEmail,
}

impl RejectReason {
    /// Localization key for the user-visible message.
    fn lang_key(self) -> &'static str {
        match self {
            // Bots are not told which trap they hit.
            RejectReason::Honeypot => "not_sent",
            RejectReason::TooFastAfterLoad | RejectReason::TooFastBetweenPosts => "too_fast",
            RejectReason::HourlyLimit => "too_many_posts",
            RejectReason::MissingField => "missing_fields",
            RejectReason::InvalidEmail => "invalid_email",
        }
    }
}

/// Outcome of [`ContactForm::handle_submission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    /// Nothing was posted to this form.
    Blank,
    Sent,
    Rejected(RejectReason),
}

/// A single embedded contact form.
///
/// Built once per scanned directive, seeded with config and localization
/// access, the directive's raw field specification and its language override.
/// An empty specification falls back to the `default_params` setting.
pub struct ContactForm<'a> {
    config: &'a ConfigStore,
    locale: &'a LocalizationResolver,
    fields: Vec<FieldSpec>,
    lang: Option<String>,
    id: usize,
    status: FormStatus,
    values: HashMap<String, String>,
    email_shape: Regex,
}

impl<'a> ContactForm<'a> {
    pub fn new(
        config: &'a ConfigStore,
        locale: &'a LocalizationResolver,
        raw_spec: &str,
        lang: Option<&str>,
        id: usize,
    ) -> Self {
        let separator = config.get_str(&["separator"]).unwrap_or(",").to_string();
        let spec = if raw_spec.trim().is_empty() {
            config
                .get_str(&["default_params"])
                .unwrap_or_default()
                .to_string()
        } else {
            raw_spec.to_string()
        };

        Self {
            config,
            locale,
            fields: parse_fields(&spec, &separator),
            lang: lang.map(str::to_string),
            id,
            status: FormStatus::Blank,
            values: HashMap::new(),
            email_shape: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex"),
        }
    }

    /// Consume pending POST input, applying the anti-spam checks in order:
    /// honeypot, delay since page load, delay since the previous post, hourly
    /// post budget, then field validation. A valid submission is appended to
    /// the log and recorded in the session; everything else only changes the
    /// rendered status. Never fatal: a failed log write is logged and the
    /// page still renders.
    pub fn handle_submission(
        &mut self,
        post: Option<&PostData>,
        session: &mut dyn SessionStore,
        log: &SubmissionLog,
        now: i64,
    ) {
        let Some(post) = post else {
            return;
        };
        let mine = post
            .get(FORM_ID_FIELD)
            .is_some_and(|id| *id == self.id.to_string());
        if !mine {
            return;
        }

        // Keep what the user typed so a rejected form renders it back.
        for field in &self.fields {
            if let Some(value) = post.get(&field.name) {
                self.values.insert(field.name.clone(), value.clone());
            }
        }

        if let Some(reason) = self.spam_check(post, &*session, now) {
            tracing::info!("Submission to form {} rejected: {:?}", self.id, reason);
            self.status = FormStatus::Rejected(reason);
            return;
        }
        if let Some(reason) = self.validate(post) {
            tracing::debug!("Submission to form {} invalid: {:?}", self.id, reason);
            self.status = FormStatus::Rejected(reason);
            return;
        }

        let mut record = vec![format_timestamp(now)];
        for field in &self.fields {
            record.push(self.values.get(&field.name).cloned().unwrap_or_default());
        }
        if let Err(err) = log.append(record) {
            tracing::warn!("Failed to log submission: {:#}", err);
        }
        session.record_post(now);
        self.status = FormStatus::Sent;
        self.values.clear();
    }

    fn spam_check(
        &self,
        post: &PostData,
        session: &dyn SessionStore,
        now: i64,
    ) -> Option<RejectReason> {
        if self.config.get_bool(&["use_honeypot"])
            && post.get(HONEYPOT_FIELD).is_some_and(|value| !value.is_empty())
        {
            return Some(RejectReason::Honeypot);
        }

        let min_after_load = self.config.get_i64(&["min_sec_after_load"]).unwrap_or(3);
        match session.last_page_load() {
            Some(loaded) if now - loaded >= min_after_load => {}
            // No recorded page render looks exactly like a scripted POST.
            _ => return Some(RejectReason::TooFastAfterLoad),
        }

        if let Some(last_post) = session.last_post_time() {
            let min_between = self.config.get_i64(&["min_sec_between_posts"]).unwrap_or(5);
            if now - last_post < min_between {
                return Some(RejectReason::TooFastBetweenPosts);
            }
        }

        let hourly_budget = self.config.get_i64(&["max_posts_by_hour"]).unwrap_or(10);
        if hourly_budget > 0 && session.posts_in_last_hour(now) as i64 >= hourly_budget {
            return Some(RejectReason::HourlyLimit);
        }

        None
    }

    fn validate(&self, post: &PostData) -> Option<RejectReason> {
        for field in &self.fields {
            let value = post
                .get(&field.name)
                .map(String::as_str)
                .unwrap_or("")
                .trim();
            if field.required && value.is_empty() {
                return Some(RejectReason::MissingField);
            }
            if !value.is_empty()
                && field.name.contains("email")
                && !self.email_shape.is_match(value)
            {
                return Some(RejectReason::InvalidEmail);
            }
        }
        None
    }

    /// Form markup: status banner, one labeled control per field, the
    /// honeypot when enabled, the form id, and a localized submit button.
    pub fn render(&self) -> String {
        let mut out = String::from("<form class=\"formgate\" method=\"post\">\n");

        match self.status {
            FormStatus::Sent => {
                out.push_str(&format!(
                    "<div class=\"updated\">{}</div>\n",
                    html::escape(&self.tr("sent"))
                ));
            }
            FormStatus::Rejected(reason) => {
                out.push_str(&format!(
                    "<div class=\"error\">{}</div>\n",
                    html::escape(&self.tr(reason.lang_key()))
                ));
            }
            FormStatus::Blank => {}
        }

        for field in &self.fields {
            let label = html::escape(&self.tr(&field.name));
            let name = html::escape(&field.name);
            let value = html::escape(self.values.get(&field.name).map_or("", String::as_str));
            let required = if field.required { " required" } else { "" };

            out.push_str(&format!("<label>{label}\n"));
            if field.name == "message" {
                out.push_str(&format!(
                    "<textarea name=\"{name}\"{required}>{value}</textarea>\n"
                ));
            } else {
                let kind = if field.name.contains("email") { "email" } else { "text" };
                out.push_str(&format!(
                    "<input type=\"{kind}\" name=\"{name}\" value=\"{value}\"{required}/>\n"
                ));
            }
            out.push_str("</label>\n");
        }

        if self.config.get_bool(&["use_honeypot"]) {
            out.push_str(&format!(
                "<div style=\"display:none\"><input type=\"text\" name=\"{HONEYPOT_FIELD}\" value=\"\"/></div>\n"
            ));
        }
        out.push_str(&format!(
            "<input type=\"hidden\" name=\"{FORM_ID_FIELD}\" value=\"{}\"/>\n",
            self.id
        ));
        out.push_str(&format!(
            "<button type=\"submit\">{}</button>\n</form>",
            html::escape(&self.tr("send"))
        ));
        out
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn tr(&self, key: &str) -> String {
        self.locale.resolve(key, self.lang.as_deref())
    }
}

/// Split a raw field specification on the configured separator; a trailing
/// `!` marks the field required.
fn parse_fields(raw: &str, separator: &str) -> Vec<FieldSpec> {
    raw.split(separator)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.strip_suffix('!') {
            Some(name) => FieldSpec {
                name: name.trim().to_string(),
                required: true,
            },
            None => FieldSpec {
                name: token.to_string(),
                required: false,
            },
        })
        .collect()
}

fn format_timestamp(now: i64) -> String {
    chrono::DateTime::from_timestamp(now, 0)
        .map(|stamp| stamp.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| now.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        config: ConfigStore,
        locale: LocalizationResolver,
        log: SubmissionLog,
        _temp_dir: TempDir,
    }

    fn fixture(config_json: &str) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::write(dir.join("config.json"), config_json).unwrap();
        fs::write(dir.join("en.json"), r#"{"name": "Name", "send": "Send"}"#).unwrap();

        Fixture {
            config: ConfigStore::load(dir.join("config.json")),
            locale: LocalizationResolver::new(&dir, None),
            log: SubmissionLog::new(dir.join("log.json"), 10),
            _temp_dir: temp_dir,
        }
    }

    fn post(entries: &[(&str, &str)]) -> PostData {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn warmed_session(now: i64) -> MemorySessionStore {
        let mut session = MemorySessionStore::new();
        session.record_page_load(now - 60);
        session
    }

    #[test]
    fn test_spec_parsing_and_default_params() {
        let fx = fixture("{}");

        let form = ContactForm::new(&fx.config, &fx.locale, "name!, phone", None, 1);
        assert_eq!(
            form.fields(),
            &[
                FieldSpec { name: "name".into(), required: true },
                FieldSpec { name: "phone".into(), required: false },
            ]
        );

        let form = ContactForm::new(&fx.config, &fx.locale, "  ", None, 1);
        let names: Vec<&str> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "subject", "message"]);
    }

    #[test]
    fn test_valid_submission_is_logged_once() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!, email!", None, 1);

        form.handle_submission(
            Some(&post(&[
                ("form_id", "1"),
                ("name", "Alice"),
                ("email", "alice@example.org"),
            ])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Sent);
        let entries = fx.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0][1], "Alice");
        assert_eq!(entries[0][2], "alice@example.org");
        assert_eq!(session.last_post_time(), Some(1000));
    }

    #[test]
    fn test_filled_honeypot_is_rejected_without_logging() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);

        form.handle_submission(
            Some(&post(&[
                ("form_id", "1"),
                ("name", "Bot"),
                ("website", "http://spam.example"),
            ])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Rejected(RejectReason::Honeypot));
        assert!(fx.log.entries().is_empty());
    }

    #[test]
    fn test_post_faster_than_min_sec_after_load_is_rejected() {
        let fx = fixture("{}");
        let mut session = MemorySessionStore::new();
        session.record_page_load(999);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("name", "Alice")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(
            form.status(),
            FormStatus::Rejected(RejectReason::TooFastAfterLoad)
        );
    }

    #[test]
    fn test_post_without_recorded_page_load_is_rejected() {
        let fx = fixture("{}");
        let mut session = MemorySessionStore::new();
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("name", "Alice")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(
            form.status(),
            FormStatus::Rejected(RejectReason::TooFastAfterLoad)
        );
    }

    #[test]
    fn test_min_sec_between_posts_is_enforced() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        session.record_post(998);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("name", "Alice")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(
            form.status(),
            FormStatus::Rejected(RejectReason::TooFastBetweenPosts)
        );
    }

    #[test]
    fn test_hourly_budget_is_enforced() {
        let fx = fixture(r#"{"max_posts_by_hour": "2", "min_sec_between_posts": "1"}"#);
        let mut session = warmed_session(1000);
        session.record_post(500);
        session.record_post(600);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("name", "Alice")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Rejected(RejectReason::HourlyLimit));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!, subject", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("subject", "Hi")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Rejected(RejectReason::MissingField));
        assert!(fx.log.entries().is_empty());
    }

    #[test]
    fn test_malformed_email_is_rejected_and_value_kept() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "email!", None, 1);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("email", "not-an-address")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Rejected(RejectReason::InvalidEmail));
        assert!(form.render().contains("not-an-address"));
    }

    #[test]
    fn test_post_for_another_form_is_ignored() {
        let fx = fixture("{}");
        let mut session = warmed_session(1000);
        let mut form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 2);

        form.handle_submission(
            Some(&post(&[("form_id", "1"), ("name", "Alice")])),
            &mut session,
            &fx.log,
            1000,
        );

        assert_eq!(form.status(), FormStatus::Blank);
        assert!(fx.log.entries().is_empty());
    }

    #[test]
    fn test_render_includes_honeypot_and_form_id() {
        let fx = fixture("{}");
        let form = ContactForm::new(&fx.config, &fx.locale, "name!, email!", None, 3);
        let markup = form.render();

        assert!(markup.contains("name=\"website\""));
        assert!(markup.contains("name=\"form_id\" value=\"3\""));
        assert!(markup.contains("type=\"email\""));
        assert!(markup.contains(">Send<"));
    }

    #[test]
    fn test_render_has_honeypot_by_default() {
        let fx = fixture("{}");
        let form = ContactForm::new(&fx.config, &fx.locale, "name!", None, 1);
        assert!(form.render().contains(HONEYPOT_FIELD));
    }
}
