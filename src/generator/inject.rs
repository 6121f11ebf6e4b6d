use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum InjectError {
    #[error("start marker {0:?} not found")]
    MissingStart(String),
    #[error("end marker {0:?} not found")]
    MissingEnd(String),
    #[error("end marker {0:?} comes before the start marker")]
    OutOfOrder(String),
    #[error("new content contains the marker {0:?}")]
    MarkerInContent(String),
}

/// The one region of an otherwise hand-maintained page that is generated.
#[derive(Debug, Clone)]
pub(crate) struct Markers<'a> {
    pub start: &'a str,
    pub end: &'a str,
}

impl Markers<'_> {
    /// Replaces the text between the first start marker and the first end marker.
    ///
    /// Everything outside the markers is kept byte for byte, and injecting the same
    /// `content` twice gives the same document as injecting it once.
    pub fn inject(&self, document: &str, content: &str) -> Result<String, InjectError> {
        for marker in [self.start, self.end] {
            if content.contains(marker) {
                return Err(InjectError::MarkerInContent(marker.to_string()));
            }
        }

        let start = document
            .find(self.start)
            .ok_or_else(|| InjectError::MissingStart(self.start.to_string()))?;
        let end = document
            .find(self.end)
            .ok_or_else(|| InjectError::MissingEnd(self.end.to_string()))?;
        let region_start = start + self.start.len();
        if end < region_start {
            return Err(InjectError::OutOfOrder(self.end.to_string()));
        }

        let content = content.trim();
        let mut out = String::with_capacity(document.len() + content.len());
        out.push_str(&document[..region_start]);
        out.push_str("\n\n");
        if !content.is_empty() {
            out.push_str(content);
            out.push_str("\n\n");
        }
        out.push_str(&document[end..]);

        Ok(out)
    }
}
