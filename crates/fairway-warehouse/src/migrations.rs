use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_courses_and_contacts",
        sql: r#"
CREATE TABLE IF NOT EXISTS golf_courses (
    id VARCHAR PRIMARY KEY,
    course_name VARCHAR NOT NULL,
    region_code VARCHAR NOT NULL,
    website VARCHAR,
    phone VARCHAR,
    contacts_page_url VARCHAR,
    tier VARCHAR,
    tier_confidence DOUBLE NOT NULL DEFAULT 0,
    tier_evidence VARCHAR NOT NULL DEFAULT '[]',
    hazard_count INTEGER NOT NULL DEFAULT 0,
    hazard_rating VARCHAR NOT NULL DEFAULT '',
    hazard_source VARCHAR,
    hazard_confidence DOUBLE NOT NULL DEFAULT 0,
    annual_rounds_estimate INTEGER,
    annual_rounds_range VARCHAR NOT NULL DEFAULT '',
    annual_rounds_confidence DOUBLE NOT NULL DEFAULT 0,
    intelligence VARCHAR NOT NULL DEFAULT '{}',
    validation_flags VARCHAR NOT NULL DEFAULT '[]',
    enrichment_status VARCHAR NOT NULL DEFAULT 'pending',
    enrichment_error VARCHAR,
    agent_cost_usd DOUBLE NOT NULL DEFAULT 0,
    provider_credits VARCHAR NOT NULL DEFAULT '{}',
    started_at VARCHAR,
    completed_at VARCHAR,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (course_name, region_code)
);

CREATE TABLE IF NOT EXISTS golf_course_contacts (
    course_id VARCHAR NOT NULL,
    contact_name VARCHAR NOT NULL,
    contact_title VARCHAR NOT NULL,
    email VARCHAR,
    email_confidence INTEGER,
    email_source VARCHAR,
    phone VARCHAR,
    phone_source VARCHAR,
    linkedin_url VARCHAR,
    tenure_years DOUBLE,
    start_date VARCHAR,
    employment_verified BOOLEAN NOT NULL DEFAULT FALSE,
    sources VARCHAR NOT NULL DEFAULT '[]',
    discovery_stage VARCHAR NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (course_id, contact_name, contact_title)
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_courses_name_region ON golf_courses(course_name, region_code);
CREATE INDEX IF NOT EXISTS idx_courses_status ON golf_courses(enrichment_status);
CREATE INDEX IF NOT EXISTS idx_contacts_course ON golf_course_contacts(course_id);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

pub(crate) fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
