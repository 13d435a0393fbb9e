//! Warehouse behavior through the async writer contract and the pool.

use std::sync::Arc;
use std::time::Duration;

use fairway_core::{
    Contact, Course, CourseWriter, DiscoveryStage, EnrichmentStatus, Tier, UtcTimestamp,
};
use fairway_warehouse::{DuckPool, Warehouse, WarehouseConfig};

fn store(dir: &tempfile::TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        db_path: dir.path().join("behavior.duckdb"),
        max_pool_size: 2,
        acquire_timeout: Duration::from_secs(2),
    })
    .expect("warehouse opens")
}

fn course() -> Course {
    let mut course = Course::begin("Hermitage Country Club", "VA", UtcTimestamp::now())
        .expect("valid course");
    course.tier = Some(Tier::Mid);
    course.tier_confidence = 0.8;
    course.enrichment_status = EnrichmentStatus::Completed;
    course.completed_at = Some(UtcTimestamp::now());
    course
}

fn contact(course: &Course) -> Contact {
    Contact {
        course_id: course.id,
        name: String::from("Dean Sumner"),
        title: String::from("Director of Golf"),
        email: Some(String::from("dsumner@hermitagecc.test")),
        email_confidence: Some(94),
        email_source: Some(String::from("email_finder")),
        phone: None,
        phone_source: None,
        linkedin_url: Some(String::from("https://www.linkedin.com/in/dean-sumner")),
        tenure_years: Some(11.5),
        start_date: Some(String::from("2014-06-01")),
        employment_verified: true,
        sources: vec![String::from("https://hunter.io/hermitagecc.test")],
        discovery_stage: DiscoveryStage::EmailFinder,
    }
}

#[tokio::test]
async fn async_writer_round_trips_course_and_contacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let warehouse = store(&dir);
    let writer: Arc<dyn CourseWriter> = Arc::new(warehouse.clone());

    let course = course();
    let contacts = vec![contact(&course)];

    writer
        .mark_in_progress(&course.name, &course.region_code, course.started_at)
        .await
        .expect("mark in progress");
    let course_id = writer
        .upsert_course_and_contacts(&course, &contacts)
        .await
        .expect("upsert");

    let row = warehouse
        .fetch_course("Hermitage Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    assert_eq!(row.id, course_id.to_string());
    assert_eq!(row.enrichment_status, "completed");

    let stored = warehouse.fetch_contacts(&row.id).expect("fetch contacts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email_confidence, Some(94));
    assert_eq!(stored[0].discovery_stage, "email_finder");
    assert!(stored[0].sources.contains("hunter.io"));
}

#[tokio::test]
async fn repeated_async_upserts_keep_one_row_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let warehouse = store(&dir);
    let writer: Arc<dyn CourseWriter> = Arc::new(warehouse.clone());

    let course = course();
    let contacts = vec![contact(&course)];

    let first = writer
        .upsert_course_and_contacts(&course, &contacts)
        .await
        .expect("first upsert");
    let second = writer
        .upsert_course_and_contacts(&course, &contacts)
        .await
        .expect("second upsert");

    assert_eq!(first, second);
    assert_eq!(
        warehouse.fetch_contacts(&first.to_string()).expect("fetch").len(),
        1
    );
}

#[test]
fn pool_acquisition_times_out_when_exhausted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pool.duckdb");
    // Materialize the database file first.
    drop(
        Warehouse::open(WarehouseConfig {
            db_path: path.clone(),
            max_pool_size: 1,
            acquire_timeout: Duration::from_secs(1),
        })
        .expect("warehouse opens"),
    );

    let pool = DuckPool::new(path, 1);
    let held = pool
        .acquire(Duration::from_millis(500))
        .expect("first connection");

    let denied = pool.acquire(Duration::from_millis(100));
    assert!(denied.is_err(), "second acquire should time out");

    drop(held);
    assert!(pool.acquire(Duration::from_millis(500)).is_ok());
}
