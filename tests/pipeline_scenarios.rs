//! End-to-end pipeline scenarios over scripted providers and a real
//! DuckDB warehouse.

use std::sync::Arc;
use std::time::Duration;

use fairway_core::{
    BudgetConfig, CascadeTermination, CourseListing, EnrichmentConfig, EnrichmentRequest,
    EnrichmentStatus, FailureReason, MailboxReport, Orchestrator, PeopleSearchBatch,
    ProviderError, ProviderId, ProviderSet, VerificationReport,
};
use fairway_warehouse::{Warehouse, WarehouseConfig};

use fairway_tests::stubs::{
    artifact_answer, artifact_answer_with_tier, metered, richmond_listing, verified_mailbox,
    Script, StubDirectory, StubEmail, StubPeople, StubReader, StubSearch, RICHMOND_DOMAIN,
};

fn warehouse(dir: &tempfile::TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        db_path: dir.path().join("pipeline.duckdb"),
        max_pool_size: 2,
        acquire_timeout: Duration::from_secs(2),
    })
    .expect("warehouse opens")
}

fn request() -> EnrichmentRequest {
    EnrichmentRequest::new("Richmond Country Club", "VA", None).expect("valid request")
}

fn directory_stub() -> Arc<StubDirectory> {
    Arc::new(StubDirectory {
        find: Script::always(metered(ProviderId::Directory, richmond_listing(), 0.0, 0)),
    })
}

fn hunter_three_verified() -> Arc<StubEmail> {
    Arc::new(StubEmail {
        domain: Script::always(metered(
            ProviderId::Hunter,
            MailboxReport {
                mailboxes: vec![
                    verified_mailbox("Stacy", "Foster", "General Manager", 95),
                    verified_mailbox("Bill", "Ranson", "Head Golf Professional", 93),
                    verified_mailbox("Greg", "McCue", "Superintendent", 91),
                ],
                pattern: Some(String::from("{first}.{last}")),
            },
            0.012,
            1,
        )),
        verify: Script::always(metered(
            ProviderId::Hunter,
            VerificationReport {
                status: fairway_core::Deliverability::Deliverable,
                confidence: 97,
            },
            0.012,
            1,
        )),
    })
}

fn search_stub() -> Arc<StubSearch> {
    Arc::new(StubSearch {
        ask: Script::always(artifact_answer()),
    })
}

fn scenario_one_providers() -> ProviderSet {
    ProviderSet {
        directory: Some(directory_stub() as _),
        email: Some(hunter_three_verified() as _),
        search: Some(search_stub() as _),
        ..ProviderSet::default()
    }
}

#[tokio::test]
async fn scenario_directory_only_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);
    let orchestrator = Orchestrator::new(
        scenario_one_providers(),
        Arc::new(store.clone()),
        EnrichmentConfig::new(),
    );

    let summary = orchestrator.enrich_course(request()).await;

    assert_eq!(summary.status, EnrichmentStatus::Completed);
    assert_eq!(summary.contacts_written, 3);
    assert!(summary.total_cost_usd <= 0.25);
    assert!(summary.validation_flags.is_empty());

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    assert_eq!(course.enrichment_status, "completed");
    assert_eq!(course.tier.as_deref(), Some("Premium"));
    assert_eq!(course.tier_confidence, 0.85);
    assert_eq!(course.hazard_count, 18);
    assert_eq!(course.annual_rounds_estimate, Some(27_000));
    assert_eq!(
        course.website.as_deref(),
        Some("https://www.richmondcountryclubva.com/")
    );
    assert_eq!(course.phone.as_deref(), Some("(804) 784-5663"));

    let contacts = store.fetch_contacts(&course.id).expect("fetch contacts");
    assert_eq!(contacts.len(), 3);
    for contact in &contacts {
        let email = contact.email.as_deref().expect("email present");
        assert!(email.ends_with(RICHMOND_DOMAIN));
        assert!(contact.email_confidence.expect("confidence") >= 90);
    }
}

#[tokio::test]
async fn scenario_cascade_fallback_to_finder_and_staff_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    let empty_listing = CourseListing {
        staff: Vec::new(),
        ..richmond_listing()
    };
    let providers = ProviderSet {
        directory: Some(Arc::new(StubDirectory {
            find: Script::always(metered(ProviderId::Directory, empty_listing, 0.0, 0)),
        }) as _),
        people: Some(Arc::new(StubPeople {
            search: Script::always(metered(
                ProviderId::Apollo,
                PeopleSearchBatch { people: Vec::new() },
                0.0,
                0,
            )),
            enrich: Script::fail(ProviderError::upstream_degraded("unused")),
        }) as _),
        email: Some(Arc::new(StubEmail {
            domain: Script::always(metered(
                ProviderId::Hunter,
                MailboxReport {
                    mailboxes: vec![
                        verified_mailbox("Stacy", "Foster", "General Manager", 95),
                        verified_mailbox("Bill", "Ranson", "Head Golf Professional", 95),
                    ],
                    pattern: None,
                },
                0.012,
                1,
            )),
            verify: Script::fail(ProviderError::upstream_degraded("unused")),
        }) as _),
        reader: Some(Arc::new(StubReader::new(vec![(
            "/staff",
            "Our Team\n\nStacy Foster\nGeneral Manager\n\nBill Ranson\nHead Golf Professional\n",
        )])) as _),
        search: Some(search_stub() as _),
        scraper: None,
    };

    let orchestrator =
        Orchestrator::new(providers, Arc::new(store.clone()), EnrichmentConfig::new());
    let summary = orchestrator.enrich_course(request()).await;

    assert_eq!(summary.status, EnrichmentStatus::Completed);
    assert_eq!(summary.contacts_written, 2);

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    let contacts = store.fetch_contacts(&course.id).expect("fetch contacts");
    assert_eq!(contacts.len(), 2);
    for contact in &contacts {
        assert_eq!(contact.email_source.as_deref(), Some("email_finder"));
        assert!(contact.sources.contains("hunter.io"));
        assert!(
            contact
                .sources
                .contains("https://www.richmondcountryclubva.com/staff"),
            "sources should include the confirming staff page: {}",
            contact.sources
        );
    }
}

#[tokio::test]
async fn scenario_provisional_pattern_email_is_never_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    let one_staff = CourseListing {
        staff: vec![fairway_core::StaffEntry {
            name: String::from("Greg McCue"),
            title: String::from("Superintendent"),
        }],
        ..richmond_listing()
    };
    let providers = ProviderSet {
        directory: Some(Arc::new(StubDirectory {
            find: Script::always(metered(ProviderId::Directory, one_staff, 0.0, 0)),
        }) as _),
        email: Some(Arc::new(StubEmail {
            domain: Script::always(metered(
                ProviderId::Hunter,
                MailboxReport {
                    mailboxes: vec![verified_mailbox("Greg", "McCue", "Superintendent", 70)],
                    pattern: Some(String::from("{first}.{last}")),
                },
                0.012,
                1,
            )),
            verify: Script::fail(
                ProviderError::upstream_degraded("verifier unavailable")
                    .with_provider(ProviderId::Hunter),
            ),
        }) as _),
        search: Some(search_stub() as _),
        ..ProviderSet::default()
    };

    let orchestrator =
        Orchestrator::new(providers, Arc::new(store.clone()), EnrichmentConfig::new());
    let summary = orchestrator.enrich_course(request()).await;

    assert_eq!(summary.status, EnrichmentStatus::Completed);

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    let contacts = store.fetch_contacts(&course.id).expect("fetch contacts");
    let greg = contacts
        .iter()
        .find(|c| c.contact_name == "Greg McCue")
        .expect("greg written");
    assert_eq!(greg.email, None, "provisional email must never persist");
}

#[tokio::test]
async fn scenario_budget_exhaustion_mid_cascade_still_stores_the_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    let mut config = EnrichmentConfig::new();
    config.budget = BudgetConfig {
        hard_ceiling_usd: 0.02,
        soft_ceiling_usd: 0.0185,
        credit_caps: Default::default(),
    };

    let orchestrator = Orchestrator::new(scenario_one_providers(), Arc::new(store.clone()), config);
    let summary = orchestrator.enrich_course(request()).await;

    assert_eq!(summary.status, EnrichmentStatus::Completed);
    assert_eq!(
        summary.cascade_termination,
        Some(CascadeTermination::BudgetExhausted)
    );
    assert!(summary.total_cost_usd <= 0.02 + 0.012);

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    assert_eq!(course.tier.as_deref(), Some("Premium"));
    // Contacts reflect the email-finder state reached before the stop.
    let contacts = store.fetch_contacts(&course.id).expect("fetch contacts");
    assert_eq!(contacts.len(), 3);
}

#[tokio::test]
async fn scenario_validation_failure_leaves_prior_state_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    // First run persists a good state.
    let orchestrator = Orchestrator::new(
        scenario_one_providers(),
        Arc::new(store.clone()),
        EnrichmentConfig::new(),
    );
    let first = orchestrator.enrich_course(request()).await;
    assert_eq!(first.status, EnrichmentStatus::Completed);

    // Re-run with research that claims an unknown tier.
    let bad_providers = ProviderSet {
        directory: Some(directory_stub() as _),
        email: Some(hunter_three_verified() as _),
        search: Some(Arc::new(StubSearch {
            ask: Script::always(artifact_answer_with_tier("Luxury")),
        }) as _),
        ..ProviderSet::default()
    };
    let orchestrator =
        Orchestrator::new(bad_providers, Arc::new(store.clone()), EnrichmentConfig::new());
    let second = orchestrator.enrich_course(request()).await;

    assert_eq!(second.status, EnrichmentStatus::Failed);
    assert_eq!(second.failure_reason, Some(FailureReason::ValidationFailed));
    assert_eq!(second.contacts_written, 0);

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    assert_eq!(course.enrichment_status, "failed");
    assert!(course
        .enrichment_error
        .as_deref()
        .expect("diagnostic present")
        .contains("tier"));
    // Prior enrichment data and contacts are unchanged.
    assert_eq!(course.tier.as_deref(), Some("Premium"));
    let contacts = store.fetch_contacts(&course.id).expect("fetch contacts");
    assert_eq!(contacts.len(), 3);
}

#[tokio::test]
async fn scenario_rerun_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    let run = |store: Warehouse| async move {
        let orchestrator = Orchestrator::new(
            scenario_one_providers(),
            Arc::new(store),
            EnrichmentConfig::new(),
        );
        orchestrator.enrich_course(request()).await
    };

    let first = run(store.clone()).await;
    let first_course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    let first_contacts = store.fetch_contacts(&first_course.id).expect("contacts");

    let second = run(store.clone()).await;
    let second_course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    let second_contacts = store.fetch_contacts(&second_course.id).expect("contacts");

    assert_eq!(first.course_id, second.course_id);
    assert_eq!(second_contacts, first_contacts);

    // Cost reflects only the latest run, and the rows agree except for the
    // run timestamps.
    assert_eq!(second_course.agent_cost_usd, second.total_cost_usd);
    let mut normalized_first = first_course.clone();
    let mut normalized_second = second_course.clone();
    normalized_first.started_at = None;
    normalized_first.completed_at = None;
    normalized_second.started_at = None;
    normalized_second.completed_at = None;
    assert_eq!(normalized_first, normalized_second);
}

#[tokio::test]
async fn scenario_every_provider_unauthorized_fails_the_course() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    let unauthorized = || ProviderError::unauthorized("credentials rejected");
    let providers = ProviderSet {
        directory: Some(Arc::new(StubDirectory {
            find: Script::fail(unauthorized().with_provider(ProviderId::Directory)),
        }) as _),
        people: Some(Arc::new(StubPeople {
            search: Script::fail(unauthorized().with_provider(ProviderId::Apollo)),
            enrich: Script::fail(unauthorized().with_provider(ProviderId::Apollo)),
        }) as _),
        email: Some(Arc::new(StubEmail {
            domain: Script::fail(unauthorized().with_provider(ProviderId::Hunter)),
            verify: Script::fail(unauthorized().with_provider(ProviderId::Hunter)),
        }) as _),
        reader: Some(Arc::new(StubReader::failing(
            unauthorized().with_provider(ProviderId::Jina),
        )) as _),
        search: Some(Arc::new(StubSearch {
            ask: Script::fail(unauthorized().with_provider(ProviderId::Perplexity)),
        }) as _),
        scraper: None,
    };

    let orchestrator =
        Orchestrator::new(providers, Arc::new(store.clone()), EnrichmentConfig::new());
    let request =
        EnrichmentRequest::new("Richmond Country Club", "VA", Some(String::from("https://www.richmondcountryclubva.com/")))
            .expect("valid request");
    let summary = orchestrator.enrich_course(request).await;

    assert_eq!(summary.status, EnrichmentStatus::Failed);
    assert_eq!(
        summary.failure_reason,
        Some(FailureReason::NoProvidersAvailable)
    );
    assert_eq!(summary.contacts_written, 0);

    let course = store
        .fetch_course("Richmond Country Club", "VA")
        .expect("fetch")
        .expect("row present");
    assert_eq!(course.enrichment_status, "failed");
}

#[tokio::test]
async fn scenario_empty_artifact_contacts_raise_the_flag() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = warehouse(&dir);

    // No discovery providers and a research artifact with an empty section4.
    let providers = ProviderSet {
        search: Some(Arc::new(StubSearch {
            ask: Script::always(fairway_tests::stubs::artifact_answer_without_contacts()),
        }) as _),
        ..ProviderSet::default()
    };

    let orchestrator =
        Orchestrator::new(providers, Arc::new(store.clone()), EnrichmentConfig::new());
    let summary = orchestrator.enrich_course(request()).await;

    assert_eq!(summary.status, EnrichmentStatus::Completed);
    assert_eq!(summary.contacts_written, 0);
    assert!(summary
        .validation_flags
        .contains(&fairway_core::ValidationFlag::NoContactsFound));
}
