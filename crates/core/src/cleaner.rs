use crate::error::ProcessError;
use regex::Regex;

/// Collapse every run of whitespace (including control characters and
/// non-breaking spaces) into a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans text extracted from PDF pages.
///
/// Extraction output is noisy: page markers, leaked URLs and e-mail
/// addresses, symbol soup from figures, and dot leaders from tables of
/// contents. The cleaner strips those and normalizes whitespace.
pub struct TextCleaner {
    page_markers: Regex,
    urls: Regex,
    emails: Regex,
    symbols: Regex,
    dot_runs: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self, ProcessError> {
        Ok(Self {
            page_markers: Regex::new(r"(?i)\b(?:page|pg\.?)\s*\d+\b")?,
            urls: Regex::new(r"https?://\S+")?,
            emails: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?,
            symbols: Regex::new(r"[^\w\s.,!?-]")?,
            dot_runs: Regex::new(r"\.{2,}")?,
        })
    }

    /// Pure: any input (including empty or binary garbage) yields a
    /// normalized string, never an error.
    pub fn clean_pdf_text(&self, raw: &str) -> String {
        let text = self.page_markers.replace_all(raw, " ");
        let text = self.urls.replace_all(&text, " ");
        let text = self.emails.replace_all(&text, " ");
        let text = self.symbols.replace_all(&text, " ");
        let text = self.dot_runs.replace_all(&text, ".");
        normalize_whitespace(&text)
    }
}
