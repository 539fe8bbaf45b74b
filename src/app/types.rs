#[derive(Debug, Parser, Clone)]
#[command(
    name = "vett",
    version,
    about = "Audit a website from the terminal: on-page SEO signals, PageSpeed scores and broken links"
)]
struct Cli {
    #[arg(value_name = "URL")]
    url: String,

    #[arg(short, long, value_name = "N", default_value_t = 5)]
    pages: usize,

    #[arg(long, value_name = "N", default_value_t = 8)]
    fetch_concurrency: usize,

    #[arg(long, value_name = "N", default_value_t = 20)]
    link_check_cap: usize,

    #[arg(long, value_name = "SECS", default_value_t = 20)]
    timeout: u64,

    #[arg(long, value_name = "SECS", default_value_t = 300)]
    cache_ttl: u64,

    #[arg(long, value_name = "KEY", env = "PAGESPEED_API_KEY")]
    api_key: Option<String>,

    #[arg(long, default_value_t = false)]
    no_oracle: bool,

    #[arg(long, default_value_t = false)]
    no_link_check: bool,

    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Csv)]
    format: FileFormatArg,

    #[arg(long, value_name = "FILE")]
    report: Option<String>,

    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
enum FileFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DataFormat {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

/// One attempted page retrieval. A non-2xx status and a transport failure
/// are both failures here; liveness checks go through `Fetcher::head_status`
/// instead, where a 4xx is a result rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum OracleError {
    #[error("no PageSpeed API key configured (pass --api-key or set PAGESPEED_API_KEY)")]
    MissingCredential,
    #[error("pagespeed request failed: {0}")]
    Request(String),
    #[error("pagespeed returned http {0}")]
    HttpStatus(u16),
    #[error("pagespeed response unreadable: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
struct FetchedPage {
    status: u16,
    body: String,
    content_type: Option<String>,
    server: Option<String>,
    response_time_ms: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PageSignals {
    title: Option<String>,
    meta_description: Option<String>,
    headings: Vec<String>,
    has_viewport: bool,
    image_count: usize,
    image_missing_alt: usize,
    has_og_title: bool,
    has_twitter_title: bool,
    has_json_ld: bool,
    has_canonical: bool,
    has_hreflang: bool,
    word_count: usize,
}

/// Result of auditing exactly one URL. Immutable once produced; failed pages
/// keep their default signals and carry the failure in `error`.
#[derive(Debug, Clone)]
struct PageAudit {
    url: String,
    status: Option<u16>,
    error: Option<FetchError>,
    signals: PageSignals,
    content_type: Option<String>,
    server: Option<String>,
    response_time_ms: u128,
    fetched_at: String,
}

/// Seed page plus up to budget-1 linked pages; index 0 is always the seed,
/// the rest arrive in worker completion order. `seed_links` is the seed's
/// same-origin link set in first-appearance order.
#[derive(Debug)]
struct CrawlOutcome {
    pages: Vec<PageAudit>,
    seed_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BrokenLink {
    url: String,
    status: LinkStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkStatus {
    Http(u16),
    Failed(FetchError),
}

impl LinkStatus {
    fn label(&self) -> String {
        match self {
            LinkStatus::Http(code) => code.to_string(),
            LinkStatus::Failed(_) => "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SiteProbe {
    https: bool,
    robots_txt: bool,
    sitemap_xml: bool,
}

#[derive(Debug)]
enum AuditEvent {
    Page(PageAudit),
    BrokenLinks(Vec<BrokenLink>),
    Probe(SiteProbe),
    Oracle(Box<ScoreReport>),
    OracleUnavailable(String),
    Status(String),
    Error(String),
    Finished,
}

#[derive(Default)]
struct AuditState {
    pages: Vec<PageAudit>,
    seen: HashSet<String>,
    broken_links: Vec<BrokenLink>,
    probe: Option<SiteProbe>,
    oracle: Option<ScoreReport>,
    oracle_error: Option<String>,
    errors: VecDeque<String>,
    done: bool,
}

impl AuditState {
    fn push_page(&mut self, page: PageAudit) -> bool {
        let inserted = self.seen.insert(page.url.clone());
        if inserted {
            self.pages.push(page);
        }
        inserted
    }

    fn push_error(&mut self, error: String) {
        self.errors.push_front(error);
        while self.errors.len() > 10 {
            self.errors.pop_back();
        }
    }

    fn seed_failure(&self) -> Option<String> {
        match self.pages.first() {
            Some(page) => page.error.as_ref().map(|err| err.to_string()),
            None => Some(
                self.errors
                    .front()
                    .cloned()
                    .unwrap_or_else(|| "audit produced no results".to_string()),
            ),
        }
    }

    fn into_report(self, generated_at: String) -> SiteReport {
        let seed_url = self
            .pages
            .first()
            .map(|page| page.url.clone())
            .unwrap_or_default();
        SiteReport {
            seed_url,
            generated_at,
            pages: self.pages,
            broken_links: self.broken_links,
            probe: self.probe,
            oracle: self.oracle,
            oracle_error: self.oracle_error,
        }
    }
}
