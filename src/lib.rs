// formgate - embedded contact forms with anti-spam submission gating
//
// Pages embed forms as inline `(%contact ...%)` directives; this crate scans
// page text, renders one form per directive, and gates submissions using
// per-session timing signals. All persistent state is flat JSON files.

pub mod config;
pub mod html;
pub mod locale;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod page;
pub mod panel;
pub mod services;
pub mod session;
pub mod submissions;

// Re-export commonly used types for convenience
pub use config::ConfigStore;
pub use locale::{BASE_LANG, LocalizationResolver};
pub use manager::FormgateManager;
pub use page::{ContactFormProvider, FormProvider, PageContentProcessor, RenderContext};
pub use session::{MemorySessionStore, SESSION_NAMESPACE, SessionStore, SessionTiming};
pub use submissions::{SubmissionLog, SubmissionRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
