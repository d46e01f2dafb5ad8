//! # bmod-runtime
//!
//! The runtime side of agent behavior modification.
//!
//! [`RuntimeController`] sits between an agent picking an action and
//! running it: [`RuntimeController::before_action`] returns the policy
//! [`Decision`](bmod_policy::Decision), already recorded in the audit log.
//! Operators reshape behavior with plain-language or structured
//! [`Modification`]s; only configured admin roles may do so.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use bmod_policy::ActionRequest;
//! use bmod_runtime::{Operator, RuntimeConfig, RuntimeController};
//!
//! let config = RuntimeConfig::load(".").unwrap();
//! let controller = RuntimeController::open(&config).unwrap();
//! controller
//!     .translate_and_add(&Operator::admin("ops"), "Never delete files")
//!     .unwrap();
//! let decision = controller
//!     .before_action(&ActionRequest::new("alice@example.com", "delete_file"))
//!     .unwrap();
//! assert!(!decision.allowed);
//! ```

pub mod config;
pub mod controller;
pub mod error;

pub use config::{RuntimeConfig, RuntimeSettings};
pub use controller::{ChangeKind, Modification, ModificationRecord, Operator, RuntimeController};
pub use error::RuntimeError;
