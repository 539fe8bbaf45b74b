const CSV_HEADERS: [&str; 22] = [
    "url",
    "status",
    "result",
    "error",
    "title",
    "title_length",
    "meta_description",
    "heading_count",
    "first_heading",
    "has_viewport",
    "has_og_title",
    "has_twitter_title",
    "has_json_ld",
    "has_canonical",
    "has_hreflang",
    "image_count",
    "image_missing_alt",
    "word_count",
    "content_type",
    "server",
    "response_time_ms",
    "fetched_at",
];

#[derive(Debug, Clone, Serialize)]
struct ExportRecord {
    url: String,
    status: Option<u16>,
    result: String,
    error: String,
    title: String,
    title_length: usize,
    meta_description: String,
    heading_count: usize,
    first_heading: String,
    has_viewport: bool,
    has_og_title: bool,
    has_twitter_title: bool,
    has_json_ld: bool,
    has_canonical: bool,
    has_hreflang: bool,
    image_count: usize,
    image_missing_alt: usize,
    word_count: usize,
    content_type: String,
    server: String,
    response_time_ms: u128,
    fetched_at: String,
}

fn audit_to_export_record(page: &PageAudit) -> ExportRecord {
    let title = page.signals.title.clone().unwrap_or_default();
    ExportRecord {
        url: page.url.clone(),
        status: page.status,
        result: if page.error.is_none() {
            "audited".to_string()
        } else {
            "failed".to_string()
        },
        error: page
            .error
            .as_ref()
            .map(|err| err.to_string())
            .unwrap_or_default(),
        title_length: title.chars().count(),
        title,
        meta_description: page.signals.meta_description.clone().unwrap_or_default(),
        heading_count: page.signals.headings.len(),
        first_heading: page.signals.headings.first().cloned().unwrap_or_default(),
        has_viewport: page.signals.has_viewport,
        has_og_title: page.signals.has_og_title,
        has_twitter_title: page.signals.has_twitter_title,
        has_json_ld: page.signals.has_json_ld,
        has_canonical: page.signals.has_canonical,
        has_hreflang: page.signals.has_hreflang,
        image_count: page.signals.image_count,
        image_missing_alt: page.signals.image_missing_alt,
        word_count: page.signals.word_count,
        content_type: page.content_type.clone().unwrap_or_default(),
        server: page.server.clone().unwrap_or_default(),
        response_time_ms: page.response_time_ms,
        fetched_at: page.fetched_at.clone(),
    }
}

struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    fn new(output_path: &str) -> io::Result<Self> {
        let file = File::create(output_path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(CSV_HEADERS)?;
        Ok(Self { writer })
    }

    fn write_row(&mut self, page: &PageAudit) -> io::Result<()> {
        let rec = audit_to_export_record(page);
        self.writer.write_record([
            rec.url,
            rec.status.map(|code| code.to_string()).unwrap_or_default(),
            rec.result,
            rec.error,
            rec.title,
            rec.title_length.to_string(),
            rec.meta_description,
            rec.heading_count.to_string(),
            rec.first_heading,
            rec.has_viewport.to_string(),
            rec.has_og_title.to_string(),
            rec.has_twitter_title.to_string(),
            rec.has_json_ld.to_string(),
            rec.has_canonical.to_string(),
            rec.has_hreflang.to_string(),
            rec.image_count.to_string(),
            rec.image_missing_alt.to_string(),
            rec.word_count.to_string(),
            rec.content_type,
            rec.server,
            rec.response_time_ms.to_string(),
            rec.fetched_at,
        ])?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

struct JsonSink {
    file: File,
    first: bool,
    closed: bool,
}

impl JsonSink {
    fn new(output_path: &str) -> io::Result<Self> {
        let mut file = File::create(output_path)?;
        file.write_all(b"[\n")?;
        Ok(Self {
            file,
            first: true,
            closed: false,
        })
    }

    fn write_row(&mut self, page: &PageAudit) -> io::Result<()> {
        let rec = audit_to_export_record(page);
        if !self.first {
            self.file.write_all(b",\n")?;
        }
        self.first = false;
        serde_json::to_writer(&mut self.file, &rec).map_err(io::Error::other)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn finalize(&mut self) -> io::Result<()> {
        if !self.closed {
            if self.first {
                self.file.write_all(b"]\n")?;
            } else {
                self.file.write_all(b"\n]\n")?;
            }
            self.closed = true;
        }
        self.file.flush()
    }
}

impl Drop for JsonSink {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}

enum OutputSink {
    Csv(CsvSink),
    Json(JsonSink),
}

impl OutputSink {
    fn new(output_path: &str, format: DataFormat) -> io::Result<Self> {
        match format {
            DataFormat::Csv => Ok(OutputSink::Csv(CsvSink::new(output_path)?)),
            DataFormat::Json => Ok(OutputSink::Json(JsonSink::new(output_path)?)),
        }
    }

    fn write_row(&mut self, page: &PageAudit) -> io::Result<()> {
        match self {
            OutputSink::Csv(sink) => sink.write_row(page),
            OutputSink::Json(sink) => sink.write_row(page),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Csv(sink) => sink.flush(),
            OutputSink::Json(sink) => sink.flush(),
        }
    }

    fn finalize(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Csv(sink) => sink.flush(),
            OutputSink::Json(sink) => sink.finalize(),
        }
    }
}

fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}
