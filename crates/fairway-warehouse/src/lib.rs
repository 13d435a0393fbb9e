//! DuckDB-backed store for enriched courses and their contacts.
//!
//! The writer is idempotent: the course row is keyed by `(course_name,
//! region_code)`, and contact rows are replaced wholesale inside the same
//! transaction, so repeating a write with identical inputs yields identical
//! persisted state.

pub mod migrations;
pub mod pool;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ::duckdb::Connection;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use fairway_core::{Contact, Course, CourseWriter, UtcTimestamp, WriterError, WriterFuture};

pub use pool::{DuckPool, PooledConnection};

use migrations::escape_sql_string;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no connection available within {0:?}")]
    PoolTimeout(Duration),

    #[error("write conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub db_path: PathBuf,
    pub max_pool_size: usize,
    pub acquire_timeout: Duration,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("fairway.duckdb"),
            max_pool_size: 4,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Course row as persisted; the audit `updated_at` column is not part of
/// row identity and is not read back.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub id: String,
    pub course_name: String,
    pub region_code: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub contacts_page_url: Option<String>,
    pub tier: Option<String>,
    pub tier_confidence: f64,
    pub tier_evidence: String,
    pub hazard_count: i64,
    pub hazard_rating: String,
    pub hazard_source: Option<String>,
    pub hazard_confidence: f64,
    pub annual_rounds_estimate: Option<i64>,
    pub annual_rounds_range: String,
    pub annual_rounds_confidence: f64,
    pub intelligence: String,
    pub validation_flags: String,
    pub enrichment_status: String,
    pub enrichment_error: Option<String>,
    pub agent_cost_usd: f64,
    pub provider_credits: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    pub course_id: String,
    pub contact_name: String,
    pub contact_title: String,
    pub email: Option<String>,
    pub email_confidence: Option<i64>,
    pub email_source: Option<String>,
    pub phone: Option<String>,
    pub phone_source: Option<String>,
    pub linkedin_url: Option<String>,
    pub tenure_years: Option<f64>,
    pub start_date: Option<String>,
    pub employment_verified: bool,
    pub sources: String,
    pub discovery_stage: String,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: DuckPool,
}

impl Warehouse {
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = DuckPool::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    fn acquire(&self) -> Result<PooledConnection, WarehouseError> {
        self.pool.acquire(self.config.acquire_timeout)
    }

    pub fn mark_in_progress_blocking(
        &self,
        name: &str,
        region_code: &str,
        started_at: UtcTimestamp,
    ) -> Result<(), WarehouseError> {
        let connection = self.acquire()?;
        let existing = resolve_course_id(&connection, name, region_code)?;
        let started = started_at.format_rfc3339();

        let sql = match existing {
            Some(id) => format!(
                "UPDATE golf_courses SET enrichment_status = 'in_progress', \
enrichment_error = NULL, started_at = '{started}', updated_at = CURRENT_TIMESTAMP \
WHERE id = '{id}'",
            ),
            None => format!(
                "INSERT INTO golf_courses (id, course_name, region_code, enrichment_status, started_at) \
VALUES ('{id}', '{name}', '{region}', 'in_progress', '{started}')",
                id = Uuid::new_v4(),
                name = escape_sql_string(name),
                region = escape_sql_string(region_code),
            ),
        };
        connection
            .execute_batch(&sql)
            .map_err(classify_duckdb_error)?;
        Ok(())
    }

    /// Records only the diagnostic summary of a failed run; previously
    /// persisted enrichment fields and contact rows stay untouched.
    pub fn mark_failed_blocking(
        &self,
        name: &str,
        region_code: &str,
        reason: &str,
        error: &str,
        agent_cost_usd: f64,
    ) -> Result<(), WarehouseError> {
        let connection = self.acquire()?;
        let existing = resolve_course_id(&connection, name, region_code)?;
        let diagnostic = escape_sql_string(&format!("{reason}: {error}"));
        let completed = UtcTimestamp::now().format_rfc3339();

        let sql = match existing {
            Some(id) => format!(
                "UPDATE golf_courses SET enrichment_status = 'failed', \
enrichment_error = '{diagnostic}', agent_cost_usd = {agent_cost_usd}, \
completed_at = '{completed}', updated_at = CURRENT_TIMESTAMP WHERE id = '{id}'",
            ),
            None => format!(
                "INSERT INTO golf_courses \
(id, course_name, region_code, enrichment_status, enrichment_error, agent_cost_usd, completed_at) \
VALUES ('{id}', '{name}', '{region}', 'failed', '{diagnostic}', {agent_cost_usd}, '{completed}')",
                id = Uuid::new_v4(),
                name = escape_sql_string(name),
                region = escape_sql_string(region_code),
            ),
        };
        connection
            .execute_batch(&sql)
            .map_err(classify_duckdb_error)?;
        Ok(())
    }

    /// One transaction: upsert the course row, delete all prior contacts for
    /// the course id, insert the new set.
    pub fn upsert_blocking(
        &self,
        course: &Course,
        contacts: &[Contact],
    ) -> Result<Uuid, WarehouseError> {
        let connection = self.acquire()?;
        let course_id = resolve_course_id(&connection, &course.name, &course.region_code)?
            .unwrap_or(course.id);

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let course_sql = upsert_course_sql(course, course_id, resolve_mode(&connection, course_id)?);
            connection
                .execute_batch(&course_sql)
                .map_err(classify_duckdb_error)?;

            connection
                .execute_batch(&format!(
                    "DELETE FROM golf_course_contacts WHERE course_id = '{course_id}'"
                ))
                .map_err(classify_duckdb_error)?;

            for contact in contacts {
                let contact_sql = insert_contact_sql(contact, course_id)?;
                connection
                    .execute_batch(&contact_sql)
                    .map_err(classify_duckdb_error)?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)?;
        debug!(course_id = %course_id, contacts = contacts.len(), "course upserted");
        Ok(course_id)
    }

    pub fn fetch_course(
        &self,
        name: &str,
        region_code: &str,
    ) -> Result<Option<CourseRow>, WarehouseError> {
        let connection = self.acquire()?;
        let sql = format!(
            "SELECT id, course_name, region_code, website, phone, contacts_page_url, tier, \
tier_confidence, tier_evidence, hazard_count, hazard_rating, hazard_source, hazard_confidence, \
annual_rounds_estimate, annual_rounds_range, annual_rounds_confidence, intelligence, \
validation_flags, enrichment_status, enrichment_error, agent_cost_usd, provider_credits, \
started_at, completed_at \
FROM golf_courses WHERE course_name = '{}' AND region_code = '{}'",
            escape_sql_string(name),
            escape_sql_string(region_code),
        );

        let row = connection.query_row(&sql, [], |row| {
            Ok(CourseRow {
                id: row.get(0)?,
                course_name: row.get(1)?,
                region_code: row.get(2)?,
                website: row.get(3)?,
                phone: row.get(4)?,
                contacts_page_url: row.get(5)?,
                tier: row.get(6)?,
                tier_confidence: row.get(7)?,
                tier_evidence: row.get(8)?,
                hazard_count: row.get(9)?,
                hazard_rating: row.get(10)?,
                hazard_source: row.get(11)?,
                hazard_confidence: row.get(12)?,
                annual_rounds_estimate: row.get(13)?,
                annual_rounds_range: row.get(14)?,
                annual_rounds_confidence: row.get(15)?,
                intelligence: row.get(16)?,
                validation_flags: row.get(17)?,
                enrichment_status: row.get(18)?,
                enrichment_error: row.get(19)?,
                agent_cost_usd: row.get(20)?,
                provider_credits: row.get(21)?,
                started_at: row.get(22)?,
                completed_at: row.get(23)?,
            })
        });

        match row {
            Ok(row) => Ok(Some(row)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    pub fn fetch_contacts(&self, course_id: &str) -> Result<Vec<ContactRow>, WarehouseError> {
        let connection = self.acquire()?;
        let sql = format!(
            "SELECT course_id, contact_name, contact_title, email, email_confidence, email_source, \
phone, phone_source, linkedin_url, tenure_years, start_date, employment_verified, sources, \
discovery_stage \
FROM golf_course_contacts WHERE course_id = '{}' ORDER BY contact_name, contact_title",
            escape_sql_string(course_id),
        );

        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query([])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(ContactRow {
                course_id: row.get(0)?,
                contact_name: row.get(1)?,
                contact_title: row.get(2)?,
                email: row.get(3)?,
                email_confidence: row.get(4)?,
                email_source: row.get(5)?,
                phone: row.get(6)?,
                phone_source: row.get(7)?,
                linkedin_url: row.get(8)?,
                tenure_years: row.get(9)?,
                start_date: row.get(10)?,
                employment_verified: row.get(11)?,
                sources: row.get(12)?,
                discovery_stage: row.get(13)?,
            });
        }
        Ok(contacts)
    }
}

enum UpsertMode {
    Insert,
    Update,
}

fn resolve_mode(connection: &Connection, course_id: Uuid) -> Result<UpsertMode, WarehouseError> {
    let sql = format!("SELECT COUNT(*) FROM golf_courses WHERE id = '{course_id}'");
    let count: i64 = connection.query_row(&sql, [], |row| row.get(0))?;
    Ok(if count > 0 {
        UpsertMode::Update
    } else {
        UpsertMode::Insert
    })
}

fn resolve_course_id(
    connection: &Connection,
    name: &str,
    region_code: &str,
) -> Result<Option<Uuid>, WarehouseError> {
    let sql = format!(
        "SELECT id FROM golf_courses WHERE course_name = '{}' AND region_code = '{}'",
        escape_sql_string(name),
        escape_sql_string(region_code),
    );
    let id: Result<String, _> = connection.query_row(&sql, [], |row| row.get(0));
    match id {
        Ok(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|error| WarehouseError::Conflict(format!("corrupt course id '{raw}': {error}"))),
        Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn upsert_course_sql(
    course: &Course,
    course_id: Uuid,
    mode: UpsertMode,
) -> String {
    let tier_evidence = json_string(&course.tier_evidence);
    let intelligence = json_string(&course.intelligence);
    let validation_flags = json_string(&course.validation_flags);
    let provider_credits = json_string(&course.provider_credits);

    match mode {
        UpsertMode::Insert => format!(
            "INSERT INTO golf_courses (id, course_name, region_code, website, phone, \
contacts_page_url, tier, tier_confidence, tier_evidence, hazard_count, hazard_rating, \
hazard_source, hazard_confidence, annual_rounds_estimate, annual_rounds_range, \
annual_rounds_confidence, intelligence, validation_flags, enrichment_status, enrichment_error, \
agent_cost_usd, provider_credits, started_at, completed_at) VALUES \
('{id}', '{name}', '{region}', {website}, {phone}, {listing}, {tier}, {tier_confidence}, \
'{tier_evidence}', {hazard_count}, '{hazard_rating}', {hazard_source}, {hazard_confidence}, \
{rounds_estimate}, '{rounds_range}', {rounds_confidence}, '{intelligence}', \
'{validation_flags}', '{status}', {error}, {cost}, '{provider_credits}', {started_at}, \
{completed_at})",
            id = course_id,
            name = escape_sql_string(&course.name),
            region = escape_sql_string(&course.region_code),
            website = sql_opt_str(course.website.as_deref()),
            phone = sql_opt_str(course.phone.as_deref()),
            listing = sql_opt_str(course.contacts_page_url.as_deref()),
            tier = sql_opt_str(course.tier.map(|t| t.as_str())),
            tier_confidence = course.tier_confidence,
            tier_evidence = escape_sql_string(&tier_evidence),
            hazard_count = course.hazard_count,
            hazard_rating = escape_sql_string(&course.hazard_rating),
            hazard_source = sql_opt_str(course.hazard_source.as_deref()),
            hazard_confidence = course.hazard_confidence,
            rounds_estimate = sql_opt_u32(course.annual_rounds_estimate),
            rounds_range = escape_sql_string(&course.annual_rounds_range),
            rounds_confidence = course.annual_rounds_confidence,
            intelligence = escape_sql_string(&intelligence),
            validation_flags = escape_sql_string(&validation_flags),
            status = course.enrichment_status.as_str(),
            error = sql_opt_str(course.enrichment_error.as_deref()),
            cost = course.agent_cost_usd,
            provider_credits = escape_sql_string(&provider_credits),
            started_at = sql_opt_str(Some(course.started_at.format_rfc3339().as_str())),
            completed_at = sql_opt_str(course.completed_at.map(|t| t.format_rfc3339()).as_deref()),
        ),
        UpsertMode::Update => format!(
            "UPDATE golf_courses SET website = {website}, phone = {phone}, \
contacts_page_url = {listing}, tier = {tier}, tier_confidence = {tier_confidence}, \
tier_evidence = '{tier_evidence}', hazard_count = {hazard_count}, \
hazard_rating = '{hazard_rating}', hazard_source = {hazard_source}, \
hazard_confidence = {hazard_confidence}, annual_rounds_estimate = {rounds_estimate}, \
annual_rounds_range = '{rounds_range}', annual_rounds_confidence = {rounds_confidence}, \
intelligence = '{intelligence}', validation_flags = '{validation_flags}', \
enrichment_status = '{status}', enrichment_error = {error}, agent_cost_usd = {cost}, \
provider_credits = '{provider_credits}', started_at = {started_at}, \
completed_at = {completed_at}, updated_at = CURRENT_TIMESTAMP WHERE id = '{id}'",
            id = course_id,
            website = sql_opt_str(course.website.as_deref()),
            phone = sql_opt_str(course.phone.as_deref()),
            listing = sql_opt_str(course.contacts_page_url.as_deref()),
            tier = sql_opt_str(course.tier.map(|t| t.as_str())),
            tier_confidence = course.tier_confidence,
            tier_evidence = escape_sql_string(&tier_evidence),
            hazard_count = course.hazard_count,
            hazard_rating = escape_sql_string(&course.hazard_rating),
            hazard_source = sql_opt_str(course.hazard_source.as_deref()),
            hazard_confidence = course.hazard_confidence,
            rounds_estimate = sql_opt_u32(course.annual_rounds_estimate),
            rounds_range = escape_sql_string(&course.annual_rounds_range),
            rounds_confidence = course.annual_rounds_confidence,
            intelligence = escape_sql_string(&intelligence),
            validation_flags = escape_sql_string(&validation_flags),
            status = course.enrichment_status.as_str(),
            error = sql_opt_str(course.enrichment_error.as_deref()),
            cost = course.agent_cost_usd,
            provider_credits = escape_sql_string(&provider_credits),
            started_at = sql_opt_str(Some(course.started_at.format_rfc3339().as_str())),
            completed_at = sql_opt_str(course.completed_at.map(|t| t.format_rfc3339()).as_deref()),
        ),
    }
}

fn insert_contact_sql(contact: &Contact, course_id: Uuid) -> Result<String, WarehouseError> {
    let sources = serde_json::to_string(&contact.sources)?;
    Ok(format!(
        "INSERT INTO golf_course_contacts (course_id, contact_name, contact_title, email, \
email_confidence, email_source, phone, phone_source, linkedin_url, tenure_years, start_date, \
employment_verified, sources, discovery_stage) VALUES \
('{course_id}', '{name}', '{title}', {email}, {email_confidence}, {email_source}, {phone}, \
{phone_source}, {linkedin}, {tenure}, {start_date}, {verified}, '{sources}', '{stage}')",
        name = escape_sql_string(&contact.name),
        title = escape_sql_string(&contact.title),
        email = sql_opt_str(contact.email.as_deref()),
        email_confidence = sql_opt_i64(contact.email_confidence.map(i64::from)),
        email_source = sql_opt_str(contact.email_source.as_deref()),
        phone = sql_opt_str(contact.phone.as_deref()),
        phone_source = sql_opt_str(contact.phone_source.as_deref()),
        linkedin = sql_opt_str(contact.linkedin_url.as_deref()),
        tenure = sql_opt_f64(contact.tenure_years.map(f64::from)),
        start_date = sql_opt_str(contact.start_date.as_deref()),
        verified = contact.employment_verified,
        sources = escape_sql_string(&sources),
        stage = contact.discovery_stage.as_str(),
    ))
}

fn finalize_transaction(
    connection: &Connection,
    result: Result<(), WarehouseError>,
) -> Result<(), WarehouseError> {
    match result {
        Ok(()) => {
            connection.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn classify_duckdb_error(error: ::duckdb::Error) -> WarehouseError {
    let message = error.to_string();
    if message.contains("Constraint") || message.contains("Conflict") {
        WarehouseError::Conflict(message)
    } else {
        WarehouseError::DuckDb(error)
    }
}

fn json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("null"))
}

fn sql_opt_str(value: Option<&str>) -> String {
    match value {
        Some(text) => format!("'{}'", escape_sql_string(text)),
        None => String::from("NULL"),
    }
}

fn sql_opt_u32(value: Option<u32>) -> String {
    value.map_or_else(|| String::from("NULL"), |v| v.to_string())
}

fn sql_opt_i64(value: Option<i64>) -> String {
    value.map_or_else(|| String::from("NULL"), |v| v.to_string())
}

fn sql_opt_f64(value: Option<f64>) -> String {
    value.map_or_else(|| String::from("NULL"), |v| v.to_string())
}

fn to_writer_error(error: WarehouseError) -> WriterError {
    match error {
        WarehouseError::Conflict(message) => WriterError::Conflict(message),
        WarehouseError::PoolTimeout(timeout) => WriterError::PoolTimeout(timeout),
        other => WriterError::Storage(other.to_string()),
    }
}

impl CourseWriter for Warehouse {
    fn mark_in_progress<'a>(
        &'a self,
        name: &'a str,
        region_code: &'a str,
        started_at: UtcTimestamp,
    ) -> WriterFuture<'a, ()> {
        let warehouse = self.clone();
        let name = name.to_owned();
        let region_code = region_code.to_owned();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                warehouse.mark_in_progress_blocking(&name, &region_code, started_at)
            })
            .await
            .map_err(|error| WriterError::Storage(format!("writer task failed: {error}")))?
            .map_err(to_writer_error)
        })
    }

    fn mark_failed<'a>(
        &'a self,
        name: &'a str,
        region_code: &'a str,
        reason: &'a str,
        error: &'a str,
        agent_cost_usd: f64,
    ) -> WriterFuture<'a, ()> {
        let warehouse = self.clone();
        let name = name.to_owned();
        let region_code = region_code.to_owned();
        let reason = reason.to_owned();
        let error = error.to_owned();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                warehouse.mark_failed_blocking(&name, &region_code, &reason, &error, agent_cost_usd)
            })
            .await
            .map_err(|error| WriterError::Storage(format!("writer task failed: {error}")))?
            .map_err(to_writer_error)
        })
    }

    fn upsert_course_and_contacts<'a>(
        &'a self,
        course: &'a Course,
        contacts: &'a [Contact],
    ) -> WriterFuture<'a, Uuid> {
        let warehouse = self.clone();
        let course = course.clone();
        let contacts = contacts.to_vec();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || warehouse.upsert_blocking(&course, &contacts))
                .await
                .map_err(|error| WriterError::Storage(format!("writer task failed: {error}")))?
                .map_err(to_writer_error)
        })
    }
}
