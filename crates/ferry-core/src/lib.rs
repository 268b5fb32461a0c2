//! ferry-core library.
//!
//! Moves issues between containers (projects) while keeping every reference
//! to and from them resolvable.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums on the move contract, `anyhow::Result` for
//!   helpers and store queries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod access;
pub mod catalog;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod model;
pub mod reference;
pub mod relocate;

pub use access::{AccessEvaluator, MembershipAccess};
pub use catalog::{MoveDestination, list_move_destinations};
pub use eligibility::{can_offer_move, move_options};
pub use error::{ErrorCode, MoveError};
pub use model::access::AccessLevel;
pub use model::container::{Container, ContainerId, Visibility};
pub use model::issue::{Issue, IssueId, IssueState};
pub use relocate::{MoveTarget, Relocation, Relocator};
