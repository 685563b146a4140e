//! Shared fixtures for the framing benchmarks.

/// Which side of the exchange a fixture holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A named fixture decoded as a request or as a response.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    direction: Direction,
    file: TestFile,
}

impl TestCase {
    pub fn request(name: &'static str, file: TestFile) -> Self {
        Self { name, direction: Direction::Request, file }
    }

    pub fn response(name: &'static str, file: TestFile) -> Self {
        Self { name, direction: Direction::Response, file }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }
}

pub static GET_SMALL: TestFile = TestFile::new("get_small.txt", include_str!("../resources/request/get_small.txt"));
pub static GET_LARGE: TestFile = TestFile::new("get_large.txt", include_str!("../resources/request/get_large.txt"));
pub static POST_CHUNKED: TestFile =
    TestFile::new("post_chunked.txt", include_str!("../resources/request/post_chunked.txt"));
pub static RESPONSE_CHUNKED: TestFile =
    TestFile::new("chunked.txt", include_str!("../resources/response/chunked.txt"));
pub static RESPONSE_CONTENT_LENGTH: TestFile =
    TestFile::new("content_length.txt", include_str!("../resources/response/content_length.txt"));
