use crate::chunking::chunk_text;
use crate::cleaner::TextCleaner;
use crate::error::ProcessError;
use crate::models::{ProcessedDocument, ProcessorOptions};
use chrono::Utc;
use lopdf::Document;
use md5::Md5;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Downloads PDFs, extracts and cleans their text, and splits the
/// result into embedding-sized chunks.
///
/// All operations are synchronous; batch processing is a sequential
/// loop with per-item failure isolation. One bad document never aborts
/// the rest of a batch.
pub struct DocumentProcessor {
    client: Client,
    cleaner: TextCleaner,
    options: ProcessorOptions,
}

impl DocumentProcessor {
    /// Create the PDF storage directory and the HTTP client.
    pub fn new(options: ProcessorOptions) -> Result<Self, ProcessError> {
        fs::create_dir_all(&options.pdf_dir)?;
        let client = Client::builder().timeout(options.fetch_timeout).build()?;

        Ok(Self {
            client,
            cleaner: TextCleaner::new()?,
            options,
        })
    }

    /// Fetch `url` and persist the body under a filename derived from
    /// the URL digest, so downloading the same URL twice overwrites the
    /// earlier file instead of accumulating copies.
    ///
    /// Only HTTP 200 with a PDF content type counts as success.
    pub fn download(&self, url: &str) -> Result<PathBuf, ProcessError> {
        debug!(url, "downloading pdf");
        let response = self.client.get(url).send()?;

        if response.status() != StatusCode::OK {
            return Err(ProcessError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.contains("pdf") {
            return Err(ProcessError::NotPdf {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.bytes()?;
        let path = self
            .options
            .pdf_dir
            .join(format!("{}.pdf", url_digest(url)));
        fs::write(&path, &body)?;

        debug!(url, path = %path.display(), bytes = body.len(), "pdf persisted");
        Ok(path)
    }

    /// Extract text page by page, clean each page, and join pages with
    /// a newline. An unparsable file or a document with no readable
    /// text is an error, never a panic.
    pub fn extract_text(&self, path: &Path) -> Result<String, ProcessError> {
        let document =
            Document::load(path).map_err(|error| ProcessError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _object_id) in document.get_pages() {
            let raw = document
                .extract_text(&[page_no])
                .map_err(|error| ProcessError::PdfParse(error.to_string()))?;
            let cleaned = self.cleaner.clean_pdf_text(&raw);
            if !cleaned.is_empty() {
                pages.push(cleaned);
            }
        }

        if pages.is_empty() {
            return Err(ProcessError::EmptyDocument(path.display().to_string()));
        }

        Ok(pages.join("\n"))
    }

    /// Run the full pipeline for one URL: download, extract, chunk.
    pub fn process(&self, url: &str) -> Result<ProcessedDocument, ProcessError> {
        let file_path = self.download(url)?;
        let text = self.extract_text(&file_path)?;

        let chunks = chunk_text(&text, self.options.max_chunk_chars);
        if chunks.is_empty() {
            return Err(ProcessError::NoChunks(url.to_string()));
        }

        info!(url, chunks = chunks.len(), "document processed");
        Ok(ProcessedDocument {
            url: url.to_string(),
            file_path,
            num_chunks: chunks.len(),
            total_length: text.chars().count(),
            timestamp: Utc::now(),
            hash: content_hash(&text),
            chunks,
        })
    }

    /// Process each URL independently. The output is positionally
    /// aligned with the input so callers can reconcile every URL with
    /// its outcome; failures are logged and isolated.
    pub fn process_all(&self, urls: &[String]) -> Vec<Result<ProcessedDocument, ProcessError>> {
        urls.iter()
            .map(|url| {
                let result = self.process(url);
                if let Err(error) = &result {
                    warn!(%url, %error, "skipping document");
                }
                result
            })
            .collect()
    }
}

/// MD5 hex digest of a URL, used as the deterministic download
/// filename.
pub fn url_digest(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of cleaned document text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::time::Duration;
    use tempfile::tempdir;

    fn processor(pdf_dir: &Path, max_chunk_chars: usize) -> DocumentProcessor {
        DocumentProcessor::new(ProcessorOptions {
            pdf_dir: pdf_dir.to_path_buf(),
            max_chunk_chars,
            fetch_timeout: Duration::from_secs(5),
        })
        .expect("processor builds")
    }

    fn pdf_with_text(text: &str) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).expect("pdf serializes");
        bytes
    }

    #[test]
    fn url_digest_is_deterministic_and_distinct() {
        let first = url_digest("https://example.org/a.pdf");
        assert_eq!(first.len(), 32);
        assert_eq!(first, url_digest("https://example.org/a.pdf"));
        assert_ne!(first, url_digest("https://example.org/b.pdf"));
    }

    #[test]
    fn content_hash_is_stable_for_identical_text() {
        let first = content_hash("alpha beta gamma");
        assert_eq!(first, content_hash("alpha beta gamma"));
        assert_ne!(first, content_hash("alpha beta delta"));
    }

    #[test]
    fn download_rejects_non_200_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.pdf");
            then.status(404);
        });

        let dir = tempdir().expect("tempdir");
        let result = processor(dir.path(), 100).download(&server.url("/missing.pdf"));

        assert!(matches!(
            result,
            Err(ProcessError::DownloadStatus { status: 404, .. })
        ));
    }

    #[test]
    fn download_rejects_non_pdf_content() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html></html>");
        });

        let dir = tempdir().expect("tempdir");
        let result = processor(dir.path(), 100).download(&server.url("/page"));

        assert!(matches!(result, Err(ProcessError::NotPdf { .. })));
    }

    #[test]
    fn download_overwrites_the_previous_copy_of_a_url() {
        let server = MockServer::start();
        let mut mock = server.mock(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("first");
        });

        let dir = tempdir().expect("tempdir");
        let processor = processor(dir.path(), 100);
        let url = server.url("/doc.pdf");

        let first_path = processor.download(&url).expect("first download");
        mock.delete();
        server.mock(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("second");
        });
        let second_path = processor.download(&url).expect("second download");

        assert_eq!(first_path, second_path);
        assert_eq!(
            fs::read(&second_path).expect("file readable"),
            b"second".to_vec()
        );
    }

    #[test]
    fn process_builds_a_complete_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paper.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body(pdf_with_text("alpha beta gamma"));
        });

        let dir = tempdir().expect("tempdir");
        let document = processor(dir.path(), 10)
            .process(&server.url("/paper.pdf"))
            .expect("document processes");

        assert_eq!(document.chunks.len(), 2);
        assert_eq!(document.chunks[1], "gamma");
        assert_eq!(document.num_chunks, 2);
        assert_eq!(document.total_length, "alpha beta gamma".chars().count());
        assert_eq!(document.hash, content_hash("alpha beta gamma"));
        assert!(document.file_path.exists());
    }

    #[test]
    fn process_all_isolates_the_failing_document() {
        let server = MockServer::start();
        for path in ["/a.pdf", "/c.pdf"] {
            server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body(pdf_with_text("alpha beta gamma"));
            });
        }
        server.mock(|when, then| {
            when.method(GET).path("/b.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("%PDF-1.4\n%broken");
        });

        let dir = tempdir().expect("tempdir");
        let urls = vec![
            server.url("/a.pdf"),
            server.url("/b.pdf"),
            server.url("/c.pdf"),
        ];
        let outcomes = processor(dir.path(), 100).process_all(&urls);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());

        let successes: Vec<_> = outcomes.iter().flatten().collect();
        assert_eq!(successes.len(), 2);
        assert_eq!(successes[0].url, urls[0]);
        assert_eq!(successes[1].url, urls[2]);
    }
}
