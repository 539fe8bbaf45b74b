const PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

// A Lighthouse run takes the service tens of seconds.
const ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter for the hosted scoring service. Best-effort enrichment only:
/// every failure is typed and the rest of the audit proceeds without it.
#[derive(Clone)]
struct ScoreOracle {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    cache: TtlCache<Result<ScoreReport, OracleError>>,
}

impl ScoreOracle {
    fn new(api_key: Option<String>, cache_ttl: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(ORACLE_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build pagespeed client: {e}"))?;
        Ok(Self {
            client,
            endpoint: PAGESPEED_ENDPOINT.to_string(),
            api_key,
            cache: TtlCache::new(cache_ttl),
        })
    }

    async fn score(&self, url: &str) -> Result<ScoreReport, OracleError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(OracleError::MissingCredential)?;
        if let Some(outcome) = self.cache.get(url) {
            debug!(url, "pagespeed served from cache");
            return outcome;
        }
        let outcome = self.score_uncached(url, api_key).await;
        self.cache.put(url, outcome.clone());
        outcome
    }

    async fn score_uncached(&self, url: &str, api_key: &str) -> Result<ScoreReport, OracleError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", url),
                ("strategy", "mobile"),
                ("category", "performance"),
                ("category", "accessibility"),
                ("category", "seo"),
                ("category", "best-practices"),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            return Err(OracleError::HttpStatus(status));
        }
        let body = response
            .json::<PagespeedResponse>()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;
        Ok(ScoreReport::from_response(body))
    }
}

#[cfg(test)]
impl ScoreOracle {
    fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }
}

#[derive(Debug, Deserialize)]
struct PagespeedResponse {
    #[serde(default, rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: LighthouseCategories,
    #[serde(default)]
    audits: HashMap<String, LighthouseAudit>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseCategories {
    #[serde(default)]
    performance: Option<LighthouseCategory>,
    #[serde(default)]
    accessibility: Option<LighthouseCategory>,
    #[serde(default)]
    seo: Option<LighthouseCategory>,
    #[serde(default, rename = "best-practices")]
    best_practices: Option<LighthouseCategory>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseCategory {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, rename = "auditRefs")]
    audit_refs: Vec<LighthouseAuditRef>,
}

#[derive(Debug, Deserialize)]
struct LighthouseAuditRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseAudit {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "displayValue")]
    display_value: String,
    #[serde(default)]
    details: Option<LighthouseAuditDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseAuditDetails {
    #[serde(default, rename = "overallSavingsMs")]
    overall_savings_ms: f64,
}

/// Normalized scoring result. Every field the reporter consumes exists with
/// an explicit default, so absent pieces of the upstream response read as
/// zero scores and empty lists instead of lookup failures.
#[derive(Debug, Clone, Default, PartialEq)]
struct ScoreReport {
    performance: CategoryReport,
    accessibility: CategoryReport,
    seo: CategoryReport,
    best_practices: CategoryReport,
    audits: HashMap<String, OracleAudit>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CategoryReport {
    score: f64,
    audit_ids: Vec<String>,
}

impl CategoryReport {
    fn percent(&self) -> u8 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    fn from_category(category: Option<LighthouseCategory>) -> Self {
        let category = category.unwrap_or_default();
        Self {
            score: category.score.unwrap_or(0.0),
            audit_ids: category
                .audit_refs
                .into_iter()
                .map(|audit_ref| audit_ref.id)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct OracleAudit {
    score: Option<f64>,
    title: String,
    display_value: String,
    savings_ms: f64,
}

impl ScoreReport {
    fn from_response(response: PagespeedResponse) -> Self {
        let result = response.lighthouse_result.unwrap_or_default();
        let audits = result
            .audits
            .into_iter()
            .map(|(id, audit)| {
                let savings_ms = audit
                    .details
                    .map(|details| details.overall_savings_ms)
                    .unwrap_or(0.0);
                (
                    id,
                    OracleAudit {
                        score: audit.score,
                        title: audit.title,
                        display_value: audit.display_value,
                        savings_ms,
                    },
                )
            })
            .collect();
        Self {
            performance: CategoryReport::from_category(result.categories.performance),
            accessibility: CategoryReport::from_category(result.categories.accessibility),
            seo: CategoryReport::from_category(result.categories.seo),
            best_practices: CategoryReport::from_category(result.categories.best_practices),
            audits,
        }
    }

    fn audit(&self, id: &str) -> OracleAudit {
        self.audits.get(id).cloned().unwrap_or_default()
    }
}
