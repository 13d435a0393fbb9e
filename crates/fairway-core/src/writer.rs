//! Storage contract for enriched courses.
//!
//! The core never talks to a database directly; the orchestrator drives
//! this trait and the warehouse crate implements it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Contact, Course, UtcTimestamp};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WriterError {
    /// Concurrent mutation detected; the caller retries once with a fresh
    /// read, then fails the course.
    #[error("writer conflict: {0}")]
    Conflict(String),

    #[error("no writer connection available within {0:?}")]
    PoolTimeout(Duration),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type WriterFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, WriterError>> + Send + 'a>>;

/// Idempotent persistence of one course and its contacts.
pub trait CourseWriter: Send + Sync {
    /// Flags the course row `in_progress` at the start of a run; creates a
    /// shell row when none exists yet.
    fn mark_in_progress<'a>(
        &'a self,
        name: &'a str,
        region_code: &'a str,
        started_at: UtcTimestamp,
    ) -> WriterFuture<'a, ()>;

    /// Records a failed run as a diagnostic summary only: status, reason,
    /// cost. Previously persisted enrichment data and contacts stay
    /// untouched.
    fn mark_failed<'a>(
        &'a self,
        name: &'a str,
        region_code: &'a str,
        reason: &'a str,
        error: &'a str,
        agent_cost_usd: f64,
    ) -> WriterFuture<'a, ()>;

    /// Upserts the course row keyed by `(name, region_code)`, deletes all
    /// prior contacts for the course id, and inserts the new set, all within
    /// one transaction. Repeating the call with identical inputs yields
    /// identical persisted state.
    fn upsert_course_and_contacts<'a>(
        &'a self,
        course: &'a Course,
        contacts: &'a [Contact],
    ) -> WriterFuture<'a, Uuid>;
}
