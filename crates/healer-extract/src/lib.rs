//! Healer Contact Extractor
//!
//! Finds, validates and scores emails and phone numbers on healers'
//! websites and in their bios, then folds the results into candidate
//! records.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod email;
pub mod error;
pub mod extractor;
pub mod http;
pub mod links;
pub mod phone;

// Re-export main types
pub use email::{
    classify_email, deobfuscate, email_candidates, email_confidence, extract_emails,
    is_contactable, is_valid_email, EmailKind, ScoredEmail,
};
pub use error::{ExtractError, Result};
pub use extractor::{ContactExtractor, ContactInfo};
pub use http::HttpFetcher;
pub use links::{find_contact_link, resolve_url};
pub use phone::{extract_phones, normalize_phone};
