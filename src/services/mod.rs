//! Services module - directive scanning, form handling, release checking.
//!
//! Everything here is framework-agnostic business logic with explicit inputs:
//!
//! - [`TagScanner`]: locates form directives in page text and yields ordered
//!   matches with byte spans for single-pass replacement.
//! - [`ContactForm`]: one embedded form: field-spec parsing, the anti-spam
//!   gate (honeypot and the three timing checks), validation, rendering, and
//!   the submission-log append.
//! - [`check_latest`]: the best-effort release check; bounded, never retried,
//!   never an error.

pub mod form;
pub mod release;
pub mod scanner;

pub use form::{ContactForm, FieldSpec, FormStatus, PostData, RejectReason};
pub use release::{ReleaseInfo, check_latest};
pub use scanner::{TagMatch, TagScanner};
