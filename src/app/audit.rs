const MAX_FETCH_CONCURRENCY: usize = 32;

fn sanitize_fetch_concurrency(value: usize) -> usize {
    value.clamp(1, MAX_FETCH_CONCURRENCY)
}

fn send_status(tx: &UnboundedSender<AuditEvent>, message: impl Into<String>) {
    let _ = tx.send(AuditEvent::Status(message.into()));
}

/// Fetch and extract one URL. Failures become the page's error field; the
/// caller decides whether that is fatal. Returns the page's same-origin
/// links alongside so the seed's link set is discovered in the same pass.
async fn audit_page(fetcher: &Fetcher, url: &str) -> (PageAudit, Vec<String>) {
    match fetcher.fetch(url).await {
        Ok(page) => {
            let signals = extract_signals(&page.body);
            let links = discover_links(&page.body, url);
            (
                PageAudit {
                    url: url.to_string(),
                    status: Some(page.status),
                    error: None,
                    signals,
                    content_type: page.content_type,
                    server: page.server,
                    response_time_ms: page.response_time_ms,
                    fetched_at: Utc::now().to_rfc3339(),
                },
                links,
            )
        }
        Err(err) => {
            let status = if let FetchError::HttpStatus(code) = &err {
                Some(*code)
            } else {
                None
            };
            (
                PageAudit {
                    url: url.to_string(),
                    status,
                    error: Some(err),
                    signals: PageSignals::default(),
                    content_type: None,
                    server: None,
                    response_time_ms: 0,
                    fetched_at: Utc::now().to_rfc3339(),
                },
                Vec::new(),
            )
        }
    }
}

/// Audits the seed and up to `page_budget - 1` of its same-origin links.
///
/// The seed is fetched first and alone; a failed seed short-circuits to a
/// one-element batch, since nothing downstream is meaningful without it.
/// Candidates are taken in first-appearance order and worked off by a
/// fixed-size pool; their results land in completion order. A failed
/// candidate is recorded on its own row and never aborts its siblings.
async fn audit_site(
    fetcher: &Fetcher,
    seed_url: &str,
    page_budget: usize,
    concurrency: usize,
    tx: &UnboundedSender<AuditEvent>,
) -> CrawlOutcome {
    let (seed, seed_links) = audit_page(fetcher, seed_url).await;
    let seed_failed = seed.error.is_some();
    let _ = tx.send(AuditEvent::Page(seed.clone()));
    let mut pages = vec![seed];
    if seed_failed || page_budget <= 1 {
        return CrawlOutcome { pages, seed_links };
    }

    let mut queue = seed_links
        .iter()
        .filter(|link| link.as_str() != seed_url)
        .take(page_budget - 1)
        .cloned()
        .collect::<VecDeque<_>>();
    if queue.is_empty() {
        return CrawlOutcome { pages, seed_links };
    }

    send_status(tx, format!("auditing {} linked pages", queue.len()));
    let concurrency = sanitize_fetch_concurrency(concurrency);
    let mut set = JoinSet::new();
    loop {
        while set.len() < concurrency {
            let Some(url) = queue.pop_front() else {
                break;
            };
            let worker = fetcher.clone();
            set.spawn(async move { audit_page(&worker, &url).await.0 });
        }
        let Some(joined) = set.join_next().await else {
            break;
        };
        match joined {
            Ok(page) => {
                let _ = tx.send(AuditEvent::Page(page.clone()));
                pages.push(page);
            }
            Err(err) => {
                let _ = tx.send(AuditEvent::Error(format!("audit worker failed: {err}")));
            }
        }
    }

    CrawlOutcome { pages, seed_links }
}

/// HEAD-checks up to `cap` links from the seed's link set and records every
/// one that errors or answers >= 400. Results do not feed the crawl batch.
async fn check_links(
    fetcher: &Fetcher,
    links: &[String],
    cap: usize,
    concurrency: usize,
) -> Vec<BrokenLink> {
    let mut queue = links.iter().take(cap).cloned().collect::<VecDeque<_>>();
    if queue.is_empty() {
        return Vec::new();
    }

    let concurrency = sanitize_fetch_concurrency(concurrency);
    let mut set = JoinSet::new();
    let mut broken = Vec::new();
    loop {
        while set.len() < concurrency {
            let Some(url) = queue.pop_front() else {
                break;
            };
            let worker = fetcher.clone();
            set.spawn(async move {
                let status = worker.head_status(&url).await;
                (url, status)
            });
        }
        let Some(joined) = set.join_next().await else {
            break;
        };
        let Ok((url, status)) = joined else {
            continue;
        };
        match status {
            Ok(code) if code >= 400 => broken.push(BrokenLink {
                url,
                status: LinkStatus::Http(code),
            }),
            Ok(_) => {}
            Err(err) => broken.push(BrokenLink {
                url,
                status: LinkStatus::Failed(err),
            }),
        }
    }
    broken
}

/// Drives one complete audit and reports everything over the event channel.
/// The oracle runs concurrently with the crawl; neither waits on the other
/// and the receiver tolerates either finishing first.
async fn run_audit(cli: Cli, tx: UnboundedSender<AuditEvent>) {
    let Some(seed_url) = normalize_seed_url(&cli.url) else {
        let _ = tx.send(AuditEvent::Error(format!("invalid URL: {}", cli.url)));
        let _ = tx.send(AuditEvent::Finished);
        return;
    };

    let cache_ttl = Duration::from_secs(cli.cache_ttl);
    let fetcher = match Fetcher::new(
        Duration::from_secs(cli.timeout.max(1)),
        cli.user_agent.as_deref(),
        cache_ttl,
    ) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            let _ = tx.send(AuditEvent::Error(err));
            let _ = tx.send(AuditEvent::Finished);
            return;
        }
    };

    let oracle_task = if cli.no_oracle {
        None
    } else {
        match ScoreOracle::new(cli.api_key.clone(), cache_ttl) {
            Ok(oracle) => {
                send_status(&tx, "querying PageSpeed Insights");
                let target = seed_url.clone();
                Some(tokio::spawn(async move { oracle.score(&target).await }))
            }
            Err(err) => {
                let _ = tx.send(AuditEvent::Error(err));
                None
            }
        }
    };

    send_status(&tx, format!("fetching {seed_url}"));
    let outcome = audit_site(
        &fetcher,
        &seed_url,
        cli.pages.max(1),
        cli.fetch_concurrency,
        &tx,
    )
    .await;

    let seed_failed = outcome
        .pages
        .first()
        .map(|page| page.error.is_some())
        .unwrap_or(true);
    if seed_failed {
        if let Some(task) = oracle_task {
            task.abort();
        }
        let _ = tx.send(AuditEvent::Finished);
        return;
    }

    let link_check = async {
        if cli.no_link_check {
            Vec::new()
        } else {
            send_status(
                &tx,
                format!(
                    "checking {} links for liveness",
                    outcome.seed_links.len().min(cli.link_check_cap)
                ),
            );
            check_links(
                &fetcher,
                &outcome.seed_links,
                cli.link_check_cap,
                cli.fetch_concurrency,
            )
            .await
        }
    };
    let (broken, probe) = tokio::join!(link_check, probe_site(&fetcher, &seed_url));
    let _ = tx.send(AuditEvent::BrokenLinks(broken));
    let _ = tx.send(AuditEvent::Probe(probe));

    if let Some(task) = oracle_task {
        match task.await {
            Ok(Ok(report)) => {
                let _ = tx.send(AuditEvent::Oracle(Box::new(report)));
            }
            Ok(Err(err)) => {
                let _ = tx.send(AuditEvent::OracleUnavailable(err.to_string()));
            }
            Err(err) => {
                let _ = tx.send(AuditEvent::OracleUnavailable(format!(
                    "oracle task failed: {err}"
                )));
            }
        }
    }

    let _ = tx.send(AuditEvent::Finished);
}
