/// Pulls the on-page signals out of raw markup. Pure, and tolerant by
/// construction: missing elements produce absent values, never errors.
fn extract_signals(html: &str) -> PageSignals {
    let doc = Html::parse_document(html);
    let (image_count, image_missing_alt) = image_alt_stats(&doc);
    PageSignals {
        title: non_empty(extract_first_text(&doc, "title")),
        meta_description: non_empty(extract_meta_content(&doc, "meta[name=\"description\"]")),
        headings: extract_headings(&doc),
        has_viewport: has_element(&doc, "meta[name=\"viewport\"]"),
        image_count,
        image_missing_alt,
        has_og_title: has_element(&doc, "meta[property=\"og:title\"]"),
        has_twitter_title: has_element(&doc, "meta[name=\"twitter:title\"]"),
        has_json_ld: has_element(&doc, "script[type=\"application/ld+json\"]"),
        has_canonical: has_element(&doc, "link[rel=\"canonical\"]"),
        has_hreflang: has_element(&doc, "link[rel=\"alternate\"][hreflang]"),
        word_count: count_words(&doc),
    }
}

/// Same-origin links referenced by the page, resolved against `base_url`,
/// deduplicated, in first-appearance order. Malformed hrefs are dropped.
fn discover_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(&base, href.trim()) else {
            continue;
        };
        if resolved.origin() != base.origin() {
            continue;
        }
        let normalized = normalize_page_url(resolved);
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
        || href.starts_with("tel:")
    {
        return None;
    }
    base.join(href).ok()
}

/// Strips fragments and tracking query parameters so the same document is
/// not audited twice under cosmetically different URLs.
fn normalize_page_url(mut url: Url) -> String {
    url.set_fragment(None);
    let kept_params = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if is_tracking_query_param(&k) {
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect::<Vec<_>>();
    if kept_params.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in kept_params {
            serializer.append_pair(&k, &v);
        }
        url.set_query(Some(&serializer.finish()));
    }
    url.to_string()
}

fn is_tracking_query_param(param: &str) -> bool {
    let name = param.to_ascii_lowercase();
    if name.starts_with("utm_") || name.starts_with("gad_") {
        return true;
    }
    matches!(
        name.as_str(),
        "gclid" | "fbclid" | "gbraid" | "wbraid" | "_gl" | "mc_cid" | "mc_eid"
    )
}

/// Accepts bare hostnames the way people type them; https is assumed when
/// no scheme is given.
fn normalize_seed_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;
    Some(normalize_page_url(url))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn extract_first_text(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    for el in doc.select(&selector) {
        let text = normalize_text(&el.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            return text;
        }
    }

    String::new()
}

fn extract_meta_content(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    doc.select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(normalize_text)
        .unwrap_or_default()
}

fn extract_headings(doc: &Html) -> Vec<String> {
    let selector = match Selector::parse("h1, h2, h3, h4, h5, h6") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    doc.select(&selector)
        .map(|el| normalize_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
        .collect()
}

fn has_element(doc: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .ok()
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

fn image_alt_stats(doc: &Html) -> (usize, usize) {
    let selector = match Selector::parse("img") {
        Ok(sel) => sel,
        Err(_) => return (0, 0),
    };
    let mut total = 0usize;
    let mut missing_alt = 0usize;
    for el in doc.select(&selector) {
        total += 1;
        let alt = el.value().attr("alt").unwrap_or_default().trim();
        if alt.is_empty() {
            missing_alt += 1;
        }
    }
    (total, missing_alt)
}

fn count_words(doc: &Html) -> usize {
    doc.root_element()
        .text()
        .flat_map(|t| t.split_whitespace())
        .count()
}

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod extract_tests {
    use super::*;

    const SCENARIO_HTML: &str = r#"
        <html><head><title>Example</title></head>
        <body>
            <h1>Welcome</h1>
            <img src="/a.png" alt="diagram">
            <img src="/b.png">
            <a href="/about">About</a>
            <a href="https://example.test/pricing">Pricing</a>
            <a href="contact.html">Contact</a>
            <a href="https://elsewhere.test/">External</a>
        </body></html>
    "#;

    #[test]
    fn scenario_page_extracts_expected_signals() {
        let signals = extract_signals(SCENARIO_HTML);
        assert_eq!(signals.title.as_deref(), Some("Example"));
        assert_eq!(signals.meta_description, None);
        assert_eq!(signals.image_count, 2);
        assert_eq!(signals.image_missing_alt, 1);
        assert_eq!(signals.headings, vec!["Welcome".to_string()]);
    }

    #[test]
    fn scenario_page_discovers_three_same_origin_links() {
        let links = discover_links(SCENARIO_HTML, "https://example.test/");
        assert_eq!(
            links,
            vec![
                "https://example.test/about".to_string(),
                "https://example.test/pricing".to_string(),
                "https://example.test/contact.html".to_string(),
            ]
        );
    }

    #[test]
    fn missing_title_yields_absent_not_error() {
        let signals = extract_signals("<html><body><p>no head</p></body></html>");
        assert_eq!(signals.title, None);
        let signals = extract_signals("");
        assert_eq!(signals.title, None);
    }

    #[test]
    fn whitespace_only_alt_counts_as_missing() {
        let html = r#"<img src="a" alt="   "><img src="b" alt="ok"><img src="c">"#;
        let signals = extract_signals(html);
        assert_eq!(signals.image_count, 3);
        assert_eq!(signals.image_missing_alt, 2);
    }

    #[test]
    fn zero_images_yields_zero_coverage() {
        let signals = extract_signals("<html><body></body></html>");
        assert_eq!(signals.image_count, 0);
        assert_eq!(signals.image_missing_alt, 0);
    }

    #[test]
    fn headings_keep_document_order_across_levels() {
        let html = "<h2>Second</h2><h1>First level</h1><h3>Third</h3>";
        let signals = extract_signals(html);
        assert_eq!(signals.headings, vec!["Second", "First level", "Third"]);
    }

    #[test]
    fn structured_data_markers_are_existence_tests() {
        let html = r#"
            <head>
                <meta property="og:title" content="T">
                <script type="application/ld+json">{}</script>
                <link rel="canonical" href="https://example.test/">
                <link rel="alternate" hreflang="de" href="https://example.test/de">
            </head>
        "#;
        let signals = extract_signals(html);
        assert!(signals.has_og_title);
        assert!(signals.has_json_ld);
        assert!(signals.has_canonical);
        assert!(signals.has_hreflang);
        assert!(!signals.has_twitter_title);
        assert!(!signals.has_viewport);
    }

    #[test]
    fn discovery_is_idempotent() {
        let first = discover_links(SCENARIO_HTML, "https://example.test/");
        let second = discover_links(SCENARIO_HTML, "https://example.test/");
        assert_eq!(first, second);
    }

    #[test]
    fn discovery_drops_malformed_and_non_http_hrefs() {
        let html = r##"
            <a href="mailto:x@example.test">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="#section">anchor</a>
            <a href="tel:+1234">tel</a>
            <a href="http://:broken">bad</a>
            <a href="/ok">ok</a>
        "##;
        let links = discover_links(html, "https://example.test/");
        assert_eq!(links, vec!["https://example.test/ok".to_string()]);
    }

    #[test]
    fn discovery_requires_matching_origin_not_just_host() {
        let html = r#"
            <a href="http://example.test/insecure">http</a>
            <a href="https://example.test:8443/other-port">port</a>
            <a href="https://example.test/same">same</a>
        "#;
        let links = discover_links(html, "https://example.test/");
        assert_eq!(links, vec!["https://example.test/same".to_string()]);
    }

    #[test]
    fn discovery_deduplicates_preserving_first_appearance() {
        let html = r#"
            <a href="/a">one</a>
            <a href="/b">two</a>
            <a href="/a#frag">one again</a>
            <a href="/a?utm_source=x">one tracked</a>
        "#;
        let links = discover_links(html, "https://example.test/");
        assert_eq!(
            links,
            vec![
                "https://example.test/a".to_string(),
                "https://example.test/b".to_string(),
            ]
        );
    }

    #[test]
    fn seed_url_normalization_assumes_https() {
        assert_eq!(
            normalize_seed_url("example.test"),
            Some("https://example.test/".to_string())
        );
        assert_eq!(
            normalize_seed_url("http://example.test/page"),
            Some("http://example.test/page".to_string())
        );
        assert_eq!(normalize_seed_url("   "), None);
        assert_eq!(normalize_seed_url("ftp://example.test"), None);
    }
}
