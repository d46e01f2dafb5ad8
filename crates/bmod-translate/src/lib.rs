//! # bmod-translate
//!
//! Turns plain-language behavior requests ("only work during business
//! hours", "block user spam@example.com") into structured
//! [`bmod_policy::PolicyRule`]s.
//!
//! Classification is deterministic: a fixed, ordered table of keyword
//! matchers per [`ModificationIntent`]. Text that matches no intent, or
//! that matches one but lacks the details to build a valid rule, is an
//! [`TranslateError::UnrecognizedIntent`] and never a guessed rule.

mod extract;

pub mod error;
pub mod intent;
pub mod translator;

pub use error::TranslateError;
pub use intent::{ModificationIntent, Translation};
pub use translator::{translate, Translator};
