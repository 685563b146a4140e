/// Limits and leniency switches for the HTTP/1.x tokenizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    max_header_bytes: usize,
    max_headers: usize,
    allow_duplicate_content_lengths: bool,
}

/// Default maximum size in bytes of the start line plus header section
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default maximum number of header fields
pub const DEFAULT_MAX_HEADERS: usize = 64;

/// Upper bound for [`DecoderConfig::with_max_headers`], sizes the parser's stack buffer
pub const MAX_HEADERS_LIMIT: usize = 256;

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_headers: DEFAULT_MAX_HEADERS,
            allow_duplicate_content_lengths: false,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    /// Values above [`MAX_HEADERS_LIMIT`] are clamped to it.
    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers.min(MAX_HEADERS_LIMIT);
        self
    }

    /// Accept repeated `Content-Length` values as long as they all agree.
    pub fn with_allow_duplicate_content_lengths(mut self, allow: bool) -> Self {
        self.allow_duplicate_content_lengths = allow;
        self
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    pub fn allow_duplicate_content_lengths(&self) -> bool {
        self.allow_duplicate_content_lengths
    }
}
