//! Transcript segmentation policies.
//!
//! The processing job splits a concatenated transcript into passages before
//! embedding them. The strategy is deliberately a replaceable policy: the
//! default sentence splitter is naive (it does not understand abbreviations or
//! decimal numbers) and that limitation is documented rather than papered
//! over.

/// Strategy for splitting a transcript into embeddable passages.
pub trait SegmentationPolicy: Send + Sync {
    /// Split the transcript into passages, preserving original order.
    fn split(&self, transcript: &str) -> Vec<String>;
}

/// Splits on `". "` and re-appends the trailing period.
///
/// Known limitation: abbreviations ("Sr. García") and decimals ("3. 14") are
/// split as if they ended a sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSplitter;

impl SegmentationPolicy for SentenceSplitter {
    fn split(&self, transcript: &str) -> Vec<String> {
        transcript
            .split(". ")
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                if part.ends_with('.') {
                    part.to_string()
                } else {
                    format!("{part}.")
                }
            })
            .collect()
    }
}
