//! Trajfilter: nested, switchable filter criteria over a vehicle-trajectory dataset.
//!
//! Analysts build two independent filter forests, one of per-point predicates and one of
//! per-trajectory predicates. Each forest is a tree of AND/OR groups over interval, discrete
//! and polygon filters, and renders to a single SQL boolean predicate.
//!
//! # Architecture
//! - Records (the wire form dialogs and controllers exchange)
//! - Components (the filter tree: groups and leaf filters)
//! - Factory (validated creation from records)
//! - Handlers (one tree per domain plus a reconstruct history)
//! - Structure (the facade over both domains with session undo bookkeeping)
//! - Visitors (SQL rendering for the point and trajectory domains)

mod types;
mod schema;
mod polygon;
mod record;
mod component;
mod factory;
mod handler;
mod structure;
mod visitor;
mod point_visitor;
mod trajectory_visitor;

pub use types::*;
pub use schema::*;
pub use polygon::*;
pub use record::*;
pub use component::*;
pub use factory::*;
pub use handler::*;
pub use structure::*;
pub use visitor::*;
pub use point_visitor::*;
pub use trajectory_visitor::*;

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`FilterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An id or name did not resolve. Callers routinely probe with stale ids.
    NotFound,
    /// The caller broke a structural rule of the forest.
    InvariantViolation,
    /// Nothing left to undo or reconstruct.
    EmptyHistory,
    /// Deletion of a component this session never added.
    UntrackedDeletion,
}

/// Unified error type for filter tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FilterError {
    #[error("component {0} not found")]
    NotFound(Uuid),
    #[error("filter group {0} not found")]
    GroupNotFound(Uuid),
    #[error("unknown filter domain '{0}'")]
    UnknownDomain(String),
    #[error("history is empty")]
    EmptyHistory,
    #[error("component {0} was not added in the current session")]
    UntrackedDeletion(Uuid),
    #[error("root group {0} cannot be removed")]
    RootRemoval(Uuid),
    #[error("record of type {found} does not fit a {expected} filter")]
    TypeMismatch { expected: FilterType, found: FilterType },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("record for domain {found} does not fit a component of domain {expected}")]
    DomainMismatch { expected: Domain, found: Domain },
    #[error("cannot move {id} into {target}")]
    InvalidMove { id: Uuid, target: Uuid },
    #[error("polygon {0} is referenced by a filter")]
    PolygonInUse(Uuid),
}

impl FilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilterError::NotFound(_)
            | FilterError::GroupNotFound(_)
            | FilterError::UnknownDomain(_) => ErrorKind::NotFound,
            FilterError::EmptyHistory => ErrorKind::EmptyHistory,
            FilterError::UntrackedDeletion(_) => ErrorKind::UntrackedDeletion,
            FilterError::RootRemoval(_)
            | FilterError::TypeMismatch { .. }
            | FilterError::InvalidPayload(_)
            | FilterError::DomainMismatch { .. }
            | FilterError::InvalidMove { .. }
            | FilterError::PolygonInUse(_) => ErrorKind::InvariantViolation,
        }
    }

    /// Logs the rejection at a level matching its kind and hands the error back.
    pub(crate) fn reported(self, operation: &'static str) -> Self {
        match self.kind() {
            ErrorKind::InvariantViolation => tracing::error!(operation, error = %self, "rejected"),
            _ => tracing::warn!(operation, error = %self, "rejected"),
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
