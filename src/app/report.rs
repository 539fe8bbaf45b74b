const CORE_WEB_VITALS: [(&str, &str); 4] = [
    ("largest-contentful-paint", "Largest Contentful Paint (LCP)"),
    ("first-contentful-paint", "First Contentful Paint (FCP)"),
    ("cumulative-layout-shift", "Cumulative Layout Shift (CLS)"),
    ("total-blocking-time", "Total Blocking Time (TBT)"),
];

// Opportunities surface once estimated savings are positive; Lighthouse
// marks an audit an opportunity below this score.
const OPPORTUNITY_SCORE_CUTOFF: f64 = 0.9;

/// Everything one audit produced, folded into a single value the renderer
/// and export layer read from. Pure data; rendering does no I/O.
#[derive(Debug, Clone)]
struct SiteReport {
    seed_url: String,
    generated_at: String,
    pages: Vec<PageAudit>,
    broken_links: Vec<BrokenLink>,
    probe: Option<SiteProbe>,
    oracle: Option<ScoreReport>,
    oracle_error: Option<String>,
}

impl SiteReport {
    fn seed(&self) -> Option<&PageAudit> {
        self.pages.first()
    }

    fn failed_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.error.is_some())
            .count()
    }

    fn total_image_count(&self) -> usize {
        self.pages.iter().map(|page| page.signals.image_count).sum()
    }

    fn total_images_missing_alt(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.signals.image_missing_alt)
            .sum()
    }

    fn performance_opportunities(&self) -> Vec<OracleAudit> {
        let Some(oracle) = &self.oracle else {
            return Vec::new();
        };
        let mut opportunities = oracle
            .performance
            .audit_ids
            .iter()
            .map(|id| oracle.audit(id))
            .filter(|audit| {
                audit
                    .score
                    .map(|score| score < OPPORTUNITY_SCORE_CUTOFF)
                    .unwrap_or(false)
                    && audit.savings_ms > 0.0
            })
            .collect::<Vec<_>>();
        opportunities.sort_by(|a, b| {
            b.savings_ms
                .total_cmp(&a.savings_ms)
                .then_with(|| a.title.cmp(&b.title))
        });
        opportunities
    }

    fn failed_accessibility_count(&self) -> usize {
        let Some(oracle) = &self.oracle else {
            return 0;
        };
        oracle
            .accessibility
            .audit_ids
            .iter()
            .filter(|id| {
                oracle
                    .audit(id)
                    .score
                    .map(|score| score < 1.0)
                    .unwrap_or(false)
            })
            .count()
    }

    fn seo_check_counts(&self) -> (usize, usize) {
        let Some(oracle) = &self.oracle else {
            return (0, 0);
        };
        let total = oracle.seo.audit_ids.len();
        let passed = oracle
            .seo
            .audit_ids
            .iter()
            .filter(|id| {
                oracle
                    .audit(id)
                    .score
                    .map(|score| score >= 1.0)
                    .unwrap_or(true)
            })
            .count();
        (passed, total)
    }

    fn flagged_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for opportunity in self.performance_opportunities().into_iter().take(5) {
            issues.push(format!(
                "{} could save ~{:.0} ms",
                opportunity.title, opportunity.savings_ms
            ));
        }
        let failed_accessibility = self.failed_accessibility_count();
        if failed_accessibility > 0 {
            issues.push(format!(
                "{failed_accessibility} accessibility checks failing"
            ));
        }
        let missing_alt = self.total_images_missing_alt();
        if missing_alt > 0 {
            issues.push(format!(
                "{missing_alt} of {} images missing alt text",
                self.total_image_count()
            ));
        }
        if !self.broken_links.is_empty() {
            issues.push(format!(
                "{} broken links in the checked sample",
                self.broken_links.len()
            ));
        }
        if let Some(seed) = self.seed() {
            if seed.signals.title.is_none() {
                issues.push("seed page has no <title>".to_string());
            }
            if seed.signals.meta_description.is_none() {
                issues.push("seed page has no meta description".to_string());
            }
        }
        if let Some(probe) = &self.probe {
            if !probe.https {
                issues.push("site is not served over HTTPS".to_string());
            }
            if !probe.robots_txt {
                issues.push("robots.txt not found".to_string());
            }
            if !probe.sitemap_xml {
                issues.push("sitemap.xml not found".to_string());
            }
        }
        let failed_pages = self.failed_page_count();
        if failed_pages > 0 {
            issues.push(format!(
                "{failed_pages} of {} crawled pages failed to load",
                self.pages.len()
            ));
        }
        issues
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Website audit for {}", self.seed_url);
        let _ = writeln!(out, "Generated at {}", self.generated_at);
        let _ = writeln!(out);

        let _ = writeln!(out, "Scores");
        match &self.oracle {
            Some(oracle) => {
                let _ = writeln!(out, "  Performance     {:>3}/100", oracle.performance.percent());
                let _ = writeln!(out, "  Accessibility   {:>3}/100", oracle.accessibility.percent());
                let _ = writeln!(out, "  SEO             {:>3}/100", oracle.seo.percent());
                let _ = writeln!(out, "  Best Practices  {:>3}/100", oracle.best_practices.percent());
                let (passed, total) = self.seo_check_counts();
                if total > 0 {
                    let _ = writeln!(out, "  SEO checks passed: {passed}/{total}");
                }
            }
            None => {
                let reason = self
                    .oracle_error
                    .as_deref()
                    .unwrap_or("scoring service skipped");
                let _ = writeln!(out, "  unavailable: {reason}");
            }
        }
        let _ = writeln!(out);

        if let Some(seed) = self.seed() {
            let _ = writeln!(out, "On-page");
            let _ = writeln!(
                out,
                "  Title: {}",
                seed.signals.title.as_deref().unwrap_or("(missing)")
            );
            let _ = writeln!(
                out,
                "  Meta description: {}",
                seed.signals
                    .meta_description
                    .as_deref()
                    .unwrap_or("(missing)")
            );
            let _ = writeln!(
                out,
                "  Headings: {} ({})",
                seed.signals.headings.len(),
                seed.signals
                    .headings
                    .iter()
                    .take(2)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let _ = writeln!(
                out,
                "  Viewport meta: {}",
                if seed.signals.has_viewport { "present" } else { "missing" }
            );
            let _ = writeln!(
                out,
                "  Content-Type: {}",
                seed.content_type.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(
                out,
                "  Server: {}",
                seed.server.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(out);
        }

        if let Some(oracle) = &self.oracle {
            let _ = writeln!(out, "Core Web Vitals");
            for (id, label) in CORE_WEB_VITALS {
                let audit = oracle.audit(id);
                let value = if audit.display_value.is_empty() {
                    "n/a".to_string()
                } else {
                    audit.display_value
                };
                let _ = writeln!(out, "  {label}: {value}");
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Crawl");
        let _ = writeln!(
            out,
            "  Pages audited: {} ({} failed)",
            self.pages.len(),
            self.failed_page_count()
        );
        for page in &self.pages {
            let status = page
                .status
                .map(|code| code.to_string())
                .unwrap_or_else(|| "---".to_string());
            let note = match (&page.error, page.signals.title.as_deref()) {
                (Some(err), _) => err.to_string(),
                (None, Some(title)) => title.to_string(),
                (None, None) => String::new(),
            };
            let _ = writeln!(out, "  [{status}] {} {note}", page.url);
        }
        let _ = writeln!(out);

        if let Some(probe) = &self.probe {
            let _ = writeln!(out, "Technical");
            let _ = writeln!(out, "  HTTPS: {}", if probe.https { "yes" } else { "no" });
            let _ = writeln!(
                out,
                "  robots.txt: {}",
                if probe.robots_txt { "found" } else { "not found" }
            );
            let _ = writeln!(
                out,
                "  sitemap.xml: {}",
                if probe.sitemap_xml { "found" } else { "not found" }
            );
            let _ = writeln!(out);
        }

        if !self.broken_links.is_empty() {
            let _ = writeln!(out, "Broken links");
            let mut links = self.broken_links.clone();
            links.sort_by(|a, b| a.url.cmp(&b.url));
            for link in links {
                let _ = writeln!(out, "  {} ({})", link.url, link.status.label());
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Issues");
        let issues = self.flagged_issues();
        if issues.is_empty() {
            let _ = writeln!(out, "  none flagged");
        } else {
            for issue in issues {
                let _ = writeln!(out, "  - {issue}");
            }
        }

        out
    }
}
