fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn handle_audit_event(
    state: &mut AuditState,
    sink: Option<&mut OutputSink>,
    event: AuditEvent,
) -> io::Result<()> {
    match event {
        AuditEvent::Page(page) => {
            if state.push_page(page.clone())
                && let Some(sink) = sink
            {
                sink.write_row(&page)?;
                sink.flush()?;
            }
        }
        AuditEvent::BrokenLinks(links) => state.broken_links = links,
        AuditEvent::Probe(probe) => state.probe = Some(probe),
        AuditEvent::Oracle(report) => state.oracle = Some(*report),
        AuditEvent::OracleUnavailable(reason) => {
            eprintln!("pagespeed unavailable: {reason}");
            state.oracle_error = Some(reason);
        }
        AuditEvent::Status(message) => eprintln!("{message}"),
        AuditEvent::Error(err) => {
            eprintln!("{err}");
            state.push_error(err);
        }
        AuditEvent::Finished => state.done = true,
    }

    Ok(())
}

pub async fn run() -> io::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let seed_label = cli.url.clone();
    let report_path = cli.report.clone();
    let configured_format: DataFormat = cli.format.into();
    let output_target = cli.output.clone().map(|path| {
        let format = detect_data_format(&path, configured_format);
        (path, format)
    });

    let mut sink = match &output_target {
        Some((path, format)) => Some(OutputSink::new(path, *format)?),
        None => None,
    };

    let started_at = Utc::now().to_rfc3339();
    let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
    let audit_handle = tokio::spawn(run_audit(cli, tx));

    let mut state = AuditState::default();
    while let Some(event) = rx.recv().await {
        handle_audit_event(&mut state, sink.as_mut(), event)?;
        if state.done {
            break;
        }
    }
    if let Some(sink) = sink.as_mut() {
        sink.finalize()?;
    }
    if let Err(err) = audit_handle.await {
        eprintln!("audit task join error: {err}");
    }

    if let Some(cause) = state.seed_failure() {
        eprintln!("audit failed for {seed_label}: {cause}");
        return Ok(ExitCode::FAILURE);
    }

    let report = state.into_report(started_at);
    let text = report.render_text();
    match report_path {
        Some(path) => {
            fs::write(&path, &text)?;
            eprintln!("report written to {path}");
        }
        None => print!("{text}"),
    }
    if let Some((path, _)) = output_target {
        eprintln!("page rows exported to {path}");
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod runtime_tests {
    use super::*;

    fn ok_page(url: &str) -> PageAudit {
        PageAudit {
            url: url.to_string(),
            status: Some(200),
            error: None,
            signals: PageSignals::default(),
            content_type: None,
            server: None,
            response_time_ms: 1,
            fetched_at: "2026-08-06T09:00:00Z".to_string(),
        }
    }

    #[test]
    fn events_accumulate_into_state() {
        let mut state = AuditState::default();
        handle_audit_event(&mut state, None, AuditEvent::Page(ok_page("https://a.test/"))).unwrap();
        handle_audit_event(&mut state, None, AuditEvent::Page(ok_page("https://a.test/"))).unwrap();
        handle_audit_event(
            &mut state,
            None,
            AuditEvent::Probe(SiteProbe {
                https: true,
                robots_txt: true,
                sitemap_xml: true,
            }),
        )
        .unwrap();
        handle_audit_event(
            &mut state,
            None,
            AuditEvent::OracleUnavailable("no API key".to_string()),
        )
        .unwrap();
        handle_audit_event(&mut state, None, AuditEvent::Finished).unwrap();

        assert_eq!(state.pages.len(), 1);
        assert!(state.probe.is_some());
        assert_eq!(state.oracle_error.as_deref(), Some("no API key"));
        assert!(state.done);
        assert_eq!(state.seed_failure(), None);
    }

    #[test]
    fn empty_state_reports_seed_failure() {
        let mut state = AuditState::default();
        handle_audit_event(
            &mut state,
            None,
            AuditEvent::Error("invalid URL: :".to_string()),
        )
        .unwrap();
        handle_audit_event(&mut state, None, AuditEvent::Finished).unwrap();
        assert_eq!(state.seed_failure().as_deref(), Some("invalid URL: :"));
    }

    #[test]
    fn state_folds_into_a_renderable_report() {
        let mut state = AuditState::default();
        state.push_page(ok_page("https://a.test/"));
        state.oracle_error = Some("skipped".to_string());
        let report = state.into_report("2026-08-06T09:00:00Z".to_string());
        assert_eq!(report.seed_url, "https://a.test/");
        assert!(report.render_text().contains("unavailable: skipped"));
    }
}
