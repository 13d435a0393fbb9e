use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Data capability used for routing and skip decisions in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DirectorySearch,
    PeopleSearch,
    PeopleEnrich,
    EmailFinder,
    EmailVerify,
    UrlRead,
    LlmSearch,
    DynamicScrape,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectorySearch => "directory_search",
            Self::PeopleSearch => "people_search",
            Self::PeopleEnrich => "people_enrich",
            Self::EmailFinder => "email_finder",
            Self::EmailVerify => "email_verify",
            Self::UrlRead => "url_read",
            Self::LlmSearch => "llm_search",
            Self::DynamicScrape => "dynamic_scrape",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderId {
    /// Closed capability matrix for the known providers.
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Directory => &[Capability::DirectorySearch],
            Self::Apollo => &[Capability::PeopleSearch, Capability::PeopleEnrich],
            Self::Hunter => &[Capability::EmailFinder, Capability::EmailVerify],
            Self::Jina => &[Capability::UrlRead],
            Self::Perplexity => &[Capability::LlmSearch],
            Self::Firecrawl => &[Capability::DynamicScrape],
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimited,
    Unauthorized,
    NotFound,
    UpstreamDegraded,
    Timeout,
    InvalidArgument,
}

/// Structured provider error consumed by the cascade's transition rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    provider: Option<ProviderId>,
    retry_after: Option<Duration>,
}

impl ProviderError {
    fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    pub fn upstream_degraded(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::UpstreamDegraded, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidArgument, message)
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether the cascade may see this stage succeed on a later attempt.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::UpstreamDegraded
        )
    }

    /// Whether the failing stage must be disabled for the rest of the run.
    pub const fn disables_stage(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Unauthorized | ProviderErrorKind::InvalidArgument
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::Unauthorized => "provider.unauthorized",
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::UpstreamDegraded => "provider.upstream_degraded",
            ProviderErrorKind::Timeout => "provider.timeout",
            ProviderErrorKind::InvalidArgument => "provider.invalid_argument",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "{}: {} ({})", provider, self.message, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Metered receipt wrapping every successful provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metered<T> {
    pub data: T,
    pub provider: ProviderId,
    pub cost_usd: f64,
    pub credits_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl<T> Metered<T> {
    pub fn new(provider: ProviderId, data: T) -> Self {
        Self {
            data,
            provider,
            cost_usd: 0.0,
            credits_used: 0,
            trace_id: None,
        }
    }

    pub fn with_cost(mut self, cost_usd: f64, credits_used: u32) -> Self {
        self.cost_usd = cost_usd;
        self.credits_used = credits_used;
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metered<U> {
        Metered {
            data: f(self.data),
            provider: self.provider,
            cost_usd: self.cost_usd,
            credits_used: self.credits_used,
            trace_id: self.trace_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response payloads per capability
// ---------------------------------------------------------------------------

/// Request payload for directory lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub course_name: String,
    pub region_code: String,
}

impl DirectoryQuery {
    pub fn new(
        course_name: impl Into<String>,
        region_code: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let course_name = course_name.into();
        let region_code = region_code.into();
        if course_name.trim().is_empty() {
            return Err(ProviderError::invalid_argument(
                "directory query requires a course name",
            ));
        }
        if region_code.trim().is_empty() {
            return Err(ProviderError::invalid_argument(
                "directory query requires a region code",
            ));
        }
        Ok(Self {
            course_name,
            region_code,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffEntry {
    pub name: String,
    pub title: String,
}

/// Normalized directory listing for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseListing {
    pub listing_url: String,
    pub course_name: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub staff: Vec<StaffEntry>,
    /// The listing page is a JavaScript application; static markup carries
    /// no staff and the caller must escalate to the dynamic scraper.
    pub needs_dynamic_render: bool,
}

/// Request payload for people search, constrained to one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleSearchRequest {
    pub organization: String,
    pub domain: Option<String>,
    pub titles: Vec<String>,
}

impl PeopleSearchRequest {
    pub fn new(
        organization: impl Into<String>,
        domain: Option<String>,
        titles: Vec<String>,
    ) -> Result<Self, ProviderError> {
        let organization = organization.into();
        if organization.trim().is_empty() {
            return Err(ProviderError::invalid_argument(
                "people search requires an organization name",
            ));
        }
        Ok(Self {
            organization,
            domain,
            titles,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonMatch {
    pub person_id: String,
    pub name: String,
    pub title: Option<String>,
    pub organization_name: Option<String>,
    pub organization_domain: Option<String>,
    pub email_status: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleSearchBatch {
    pub people: Vec<PersonMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleEnrichRequest {
    pub person_id: String,
}

impl PeopleEnrichRequest {
    pub fn new(person_id: impl Into<String>) -> Result<Self, ProviderError> {
        let person_id = person_id.into();
        if person_id.trim().is_empty() {
            return Err(ProviderError::invalid_argument(
                "people enrich requires a person id",
            ));
        }
        Ok(Self { person_id })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employment {
    pub organization_name: String,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub email_status: Option<String>,
    /// Provider-reported confidence normalized to [0, 100].
    pub email_confidence: Option<u8>,
    pub linkedin_url: Option<String>,
    pub employment_history: Vec<Employment>,
    pub profile_url: Option<String>,
}

/// Request payload for domain-wide mailbox discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSearchRequest {
    pub domain: String,
}

impl DomainSearchRequest {
    pub fn new(domain: impl Into<String>) -> Result<Self, ProviderError> {
        let domain = domain.into();
        if domain.trim().is_empty() || !domain.contains('.') {
            return Err(ProviderError::invalid_argument(format!(
                "'{domain}' is not a valid mail domain"
            )));
        }
        Ok(Self { domain })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mailbox {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    /// Provider-reported confidence normalized to [0, 100].
    pub confidence: u8,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxReport {
    pub mailboxes: Vec<Mailbox>,
    /// Mailbox naming pattern such as `{first}.{last}` when the provider
    /// reports one.
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerifyRequest {
    pub email: String,
}

impl EmailVerifyRequest {
    pub fn new(email: impl Into<String>) -> Result<Self, ProviderError> {
        let email = email.into();
        if !email.contains('@') {
            return Err(ProviderError::invalid_argument(format!(
                "'{email}' is not an email address"
            )));
        }
        Ok(Self { email })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deliverability {
    Deliverable,
    Risky,
    Undeliverable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: Deliverability,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReadRequest {
    pub url: String,
}

impl UrlReadRequest {
    pub fn new(url: impl Into<String>) -> Result<Self, ProviderError> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::invalid_argument(format!(
                "'{url}' is not an absolute http(s) URL"
            )));
        }
        Ok(Self { url })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSearchRequest {
    pub prompt: String,
    pub require_citations: bool,
}

impl LlmSearchRequest {
    pub fn new(prompt: impl Into<String>, require_citations: bool) -> Result<Self, ProviderError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ProviderError::invalid_argument(
                "llm search prompt must not be empty",
            ));
        }
        Ok(Self {
            prompt,
            require_citations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmAnswer {
    pub text: String,
    pub citations: Vec<String>,
}

pub type DynamicScrapeRequest = UrlReadRequest;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<Metered<T>, ProviderError>> + Send + 'a>>;

pub trait DirectoryProvider: Send + Sync {
    fn find_course<'a>(&'a self, req: DirectoryQuery) -> ProviderFuture<'a, CourseListing>;
}

pub trait PeopleProvider: Send + Sync {
    fn search<'a>(&'a self, req: PeopleSearchRequest) -> ProviderFuture<'a, PeopleSearchBatch>;
    fn enrich<'a>(&'a self, req: PeopleEnrichRequest) -> ProviderFuture<'a, PersonProfile>;
}

pub trait EmailProvider: Send + Sync {
    fn search_domain<'a>(&'a self, req: DomainSearchRequest) -> ProviderFuture<'a, MailboxReport>;
    fn verify<'a>(&'a self, req: EmailVerifyRequest) -> ProviderFuture<'a, VerificationReport>;
}

pub trait PageReader: Send + Sync {
    fn read<'a>(&'a self, req: UrlReadRequest) -> ProviderFuture<'a, PageText>;
}

pub trait SearchModel: Send + Sync {
    fn ask<'a>(&'a self, req: LlmSearchRequest) -> ProviderFuture<'a, LlmAnswer>;
}

pub trait DynamicScraper: Send + Sync {
    fn scrape<'a>(&'a self, req: DynamicScrapeRequest) -> ProviderFuture<'a, PageText>;
}

/// The wiring handed to the cascade and the intelligence stage. Absent
/// entries cause the corresponding stages to be skipped.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub directory: Option<Arc<dyn DirectoryProvider>>,
    pub people: Option<Arc<dyn PeopleProvider>>,
    pub email: Option<Arc<dyn EmailProvider>>,
    pub reader: Option<Arc<dyn PageReader>>,
    pub search: Option<Arc<dyn SearchModel>>,
    pub scraper: Option<Arc<dyn DynamicScraper>>,
}
