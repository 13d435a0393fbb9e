pub mod adapters;
pub mod circuit_breaker;
pub mod contracts;
pub mod http_client;
pub mod page_heuristics;
pub mod policy;
pub mod throttling;

pub use adapters::{
    ApolloAdapter, DirectoryAdapter, FirecrawlAdapter, HunterAdapter, JinaAdapter,
    PerplexityAdapter,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use contracts::{
    Capability, CourseListing, Deliverability, DirectoryProvider, DirectoryQuery,
    DomainSearchRequest, DynamicScrapeRequest, DynamicScraper, EmailProvider, EmailVerifyRequest,
    Employment, LlmAnswer, LlmSearchRequest, Mailbox, MailboxReport, Metered, PageReader, PageText,
    PeopleEnrichRequest, PeopleProvider, PeopleSearchBatch, PeopleSearchRequest, PersonMatch,
    PersonProfile, ProviderError, ProviderErrorKind, ProviderFuture, ProviderSet, SearchModel,
    StaffEntry, UrlReadRequest, VerificationReport,
};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    NoopHttpClient, ReqwestHttpClient,
};
pub use policy::{BackoffPolicy, ProviderPolicy};
pub use throttling::RateGate;
