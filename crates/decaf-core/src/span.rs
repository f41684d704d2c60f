/// A source-line range, carried by every expression and statement node.
///
/// Lines are 1-based, inclusive on both ends, matching what the parser
/// front-end stamps onto each node it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
}

impl Span {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// A span for a single source line, used by synthesized nodes (e.g. an
    /// implicit `ret` appended to a constructor) that have no real range.
    pub fn single(line: u32) -> Self {
        Self::new(line, line)
    }
}
