//! Archival producer: one PDF per detail page, optionally bundled as a ZIP.

pub mod content;
pub mod template;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;

use ftclaw_harvester::{sentinel, BrowserSession, LawRecord, PdfSource};
use serde::Serialize;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::DEFAULT_ARCHIVE_PAUSE;
use crate::error::Result;

/// File-name stand-in when a record has no effective date.
pub const MISSING_DATE: &str = "날짜미입력";

/// Category directory for records without a group name.
const FALLBACK_CATEGORY: &str = "기타";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub destination: PathBuf,
    /// Whether `destination` is the directory the caller asked for.
    pub requested_destination: bool,
    pub bundle: Option<PathBuf>,
}

impl ArchiveReport {
    /// Final status label for the run.
    pub fn label(&self) -> String {
        if self.requested_destination {
            format!("PDF 저장 완료! (위치: {})", self.destination.display())
        } else if self.bundle.is_some() {
            "PDF 저장 완료! 다운로드 버튼을 클릭하세요.".to_string()
        } else {
            "PDF 저장 완료".to_string()
        }
    }
}

/// Renders detail pages to PDF files under a batch directory.
pub struct Archiver {
    session: BrowserSession,
    output_dir: PathBuf,
    pause: Duration,
}

impl Archiver {
    pub fn new(session: BrowserSession, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            output_dir: output_dir.into(),
            pause: DEFAULT_ARCHIVE_PAUSE,
        }
    }

    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Archive every linked record in order.
    ///
    /// `progress` is called with the number of completed records and the
    /// current label, once before and once after each record.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn run<F>(&self, records: &[LawRecord], target_dir: Option<&Path>, mut progress: F) -> Result<ArchiveReport>
    where
        F: FnMut(usize, &str),
    {
        let batch_ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (destination, requested_destination) =
            resolve_destination(&self.output_dir, target_dir, &batch_ts)?;

        let mut report = ArchiveReport {
            destination: destination.clone(),
            requested_destination,
            ..ArchiveReport::default()
        };

        let total = records.len();
        for (i, record) in records.iter().enumerate() {
            let label = format!("[{}/{total}] PDF 저장 중: {}", i + 1, sanitize(&record.title));
            progress(i, &label);

            if record.has_link() {
                match self.archive_record(record, &destination) {
                    Ok(path) => {
                        tracing::debug!(path = %path.display(), "PDF saved");
                        report.saved += 1;
                    }
                    Err(e) => {
                        tracing::warn!(title = %record.title, error = %e, "PDF creation failed");
                        report.failed += 1;
                    }
                }
            } else {
                report.skipped += 1;
            }

            if !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
            progress(i + 1, &label);
        }

        if !requested_destination {
            let bundle = self.output_dir.join(format!("FTC_Laws_PDF_{batch_ts}.zip"));
            write_bundle(&destination, &bundle)?;
            tracing::info!(bundle = %bundle.display(), "PDF bundle created");
            report.bundle = Some(bundle);
        }

        tracing::info!(
            saved = report.saved,
            skipped = report.skipped,
            failed = report.failed,
            destination = %report.destination.display(),
            "archive finished"
        );
        Ok(report)
    }

    fn archive_record(&self, record: &LawRecord, destination: &Path) -> Result<PathBuf> {
        let category = match sanitize(record.category.trim()) {
            c if c.is_empty() => FALLBACK_CATEGORY.to_string(),
            c => c,
        };
        let dir = destination.join(category);
        fs::create_dir_all(&dir)?;
        let path = dir.join(pdf_file_name(record));

        let renderer = self.session.renderer();
        let pdf = match content::extract_printable(&self.session, &record.detail_link)? {
            Some(body) => renderer.print_pdf(PdfSource::Html(&template::print_document(record, &body)))?,
            None => {
                tracing::debug!(url = %record.detail_link, "no printable content, printing whole page");
                renderer.print_pdf(PdfSource::Url(&record.detail_link))?
            }
        };

        fs::write(&path, pdf)?;
        Ok(path)
    }
}

/// Pick the batch directory.
///
/// A requested directory is only used when it lies inside `output_dir` and can
/// be created; otherwise it is treated as unavailable and the default
/// `{output}/{batch_ts}` is used. Relative requests are taken relative to
/// `output_dir`. The flag reports whether the requested directory was used.
pub fn resolve_destination(
    output_dir: &Path,
    target_dir: Option<&Path>,
    batch_ts: &str,
) -> Result<(PathBuf, bool)> {
    fs::create_dir_all(output_dir)?;
    let root = fs::canonicalize(output_dir)?;

    if let Some(target) = target_dir.filter(|t| !t.as_os_str().is_empty()) {
        match contained_target(output_dir, &root, target) {
            Some(candidate) => match create_inside(&root, &candidate) {
                Ok(dir) => return Ok((dir, true)),
                Err(e) => tracing::info!(
                    target_dir = %target.display(),
                    error = %e,
                    "requested PDF directory unavailable, using default location"
                ),
            },
            None => tracing::info!(
                target_dir = %target.display(),
                "requested PDF directory is outside the output directory, using default location"
            ),
        }
    }

    let default = output_dir.join(batch_ts);
    fs::create_dir_all(&default)?;
    Ok((default, false))
}

/// Map a requested directory onto a path under the output directory, without
/// touching the filesystem.
fn contained_target(output_dir: &Path, root: &Path, target: &Path) -> Option<PathBuf> {
    if target.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }
    if target.is_relative() {
        return Some(output_dir.join(target));
    }
    (target.starts_with(root) || target.starts_with(output_dir)).then(|| target.to_path_buf())
}

/// Create `candidate` and confirm it still resolves inside `root`.
fn create_inside(root: &Path, candidate: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(candidate)?;
    let resolved = fs::canonicalize(candidate)?;
    if resolved.starts_with(root) && resolved != root {
        Ok(candidate.to_path_buf())
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "directory resolves outside the output directory",
        ))
    }
}

/// Replace characters that are not allowed in file names.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// `{title}_{effective date}.pdf`
pub fn pdf_file_name(record: &LawRecord) -> String {
    let date = record.effective_date.trim();
    let date = if date.is_empty() || date == sentinel::PENDING || date == sentinel::NOT_FOUND {
        MISSING_DATE.to_string()
    } else {
        sanitize(date)
    };
    format!("{}_{date}.pdf", sanitize(record.title.trim()))
}

/// Compress `source_dir` into `bundle`, with paths relative to `source_dir`.
pub fn write_bundle(source_dir: &Path, bundle: &Path) -> Result<()> {
    let file = File::create(bundle)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(source_dir) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    zip.finish()?.flush()?;
    Ok(())
}
