use std::fmt;

const CHUNK_STEM: &str = "chunk_";
const CHUNK_EXT: &str = ".jsonl";
const CHUNKS_DIR: &str = "chunks";

/// An inclusive, 1-based line range `[first..last]` held by one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkRange {
    first: u64,
    last: u64,
}

impl ChunkRange {
    pub const fn new(first: u64, last: u64) -> Option<Self> {
        if first == 0 || last < first {
            None
        } else {
            Some(Self { first, last })
        }
    }

    #[inline]
    pub const fn first(&self) -> u64 {
        self.first
    }

    #[inline]
    pub const fn last(&self) -> u64 {
        self.last
    }

    /// Number of lines in the range. Never zero.
    #[inline]
    pub const fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    /// Renders `chunk_<first>_<last>.jsonl`.
    pub fn name(&self) -> String {
        let mut out = String::with_capacity(CHUNK_STEM.len() + CHUNK_EXT.len() + 2 * 12 + 1);
        out.push_str(CHUNK_STEM);
        push_padded(&mut out, self.first);
        out.push('_');
        push_padded(&mut out, self.last);
        out.push_str(CHUNK_EXT);
        out
    }

    /// Parses a bare object name (the final path segment) back into a range.
    pub fn parse_name(name: &str) -> super::Result<Self> {
        let digits = name
            .strip_prefix(CHUNK_STEM)
            .and_then(|rest| rest.strip_suffix(CHUNK_EXT))
            .ok_or_else(|| NameError::UnrecognizedName(name.to_owned()))?;

        let (first, last) = digits
            .split_once('_')
            .ok_or_else(|| NameError::UnrecognizedName(name.to_owned()))?;

        let first = parse_padded(name, first)?;
        let last = parse_padded(name, last)?;

        Self::new(first, last).ok_or(NameError::EmptyRange { first, last })
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.first, self.last)
    }
}

fn push_padded(out: &mut String, n: u64) {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(n);

    let width = if digits.len() > super::PAD_WIDTH {
        super::WIDE_PAD_WIDTH
    } else {
        super::PAD_WIDTH
    };

    for _ in digits.len()..width {
        out.push('0');
    }
    out.push_str(digits);
}

fn parse_padded(name: &str, digits: &str) -> super::Result<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NameError::UnrecognizedName(name.to_owned()));
    }

    digits
        .parse::<u64>()
        .map_err(|_| NameError::LineNumberOverflow(name.to_owned()))
}

#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("object name {0:?} is not a chunk name")]
    UnrecognizedName(String),
    #[error("line number in {0:?} overflows a u64")]
    LineNumberOverflow(String),
    #[error("chunk name describes an empty range [{first}..{last}]")]
    EmptyRange { first: u64, last: u64 },
}

/// Fully qualified object key for one chunk:
/// `<user_id>/<external_id>/chunks/<file_name>/chunk_<first>_<last>.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkKey {
    key: String,
    range: ChunkRange,
}

impl ChunkKey {
    pub fn new(user_id: i64, external_id: &str, file_name: &str, range: ChunkRange) -> Self {
        let mut key = file_prefix(user_id, external_id, file_name);
        key.push_str(&range.name());
        Self { key, range }
    }

    /// Parses a full listing key. The range comes from the final segment; the
    /// leading prefix is kept verbatim.
    pub fn parse(key: String) -> super::Result<Self> {
        let name = key.rsplit('/').next().unwrap_or(key.as_str());
        let range = ChunkRange::parse_name(name)?;
        Ok(Self { key, range })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn range(&self) -> ChunkRange {
        self.range
    }

    #[inline]
    pub fn into_key(self) -> String {
        self.key
    }
}

/// Prefix covering every object belonging to one session.
pub fn session_prefix(user_id: i64, external_id: &str) -> String {
    let mut buf = itoa::Buffer::new();
    let user = buf.format(user_id);

    let mut out = String::with_capacity(user.len() + external_id.len() + 2);
    out.push_str(user);
    out.push('/');
    out.push_str(external_id);
    out.push('/');
    out
}

/// Prefix covering every chunk of one file within a session.
pub fn file_prefix(user_id: i64, external_id: &str, file_name: &str) -> String {
    let mut out = session_prefix(user_id, external_id);
    out.push_str(CHUNKS_DIR);
    out.push('/');
    out.push_str(file_name);
    out.push('/');
    out
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than {max} bytes")]
    TooLong { max: usize },
    #[error("name contains a path separator")]
    Separator,
    #[error("name is a relative path component")]
    Relative,
    #[error("name contains a control character")]
    Control,
}

pub const MAX_SEGMENT_LEN: usize = 255;

/// Checks that a client-supplied name is a single, safe path segment. Applied
/// to `file_name` and `external_id` before either is embedded in an object
/// key.
pub fn validate_segment(name: &str) -> Result<(), SegmentError> {
    if name.is_empty() {
        return Err(SegmentError::Empty);
    }
    if name.len() > MAX_SEGMENT_LEN {
        return Err(SegmentError::TooLong {
            max: MAX_SEGMENT_LEN,
        });
    }
    if name.contains(['/', '\\']) {
        return Err(SegmentError::Separator);
    }
    if name == "." || name == ".." {
        return Err(SegmentError::Relative);
    }
    if name.bytes().any(|b| b.is_ascii_control()) {
        return Err(SegmentError::Control);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_name_round_trip() {
        let range = ChunkRange::new(1, 3).unwrap();
        assert_eq!(range.name(), "chunk_0000001_0000003.jsonl");
        assert_eq!(ChunkRange::parse_name(&range.name()).unwrap(), range);
    }

    #[test]
    fn wide_padding_past_seven_digits() {
        let range = ChunkRange::new(9_999_999, 10_000_000).unwrap();
        assert_eq!(range.name(), "chunk_9999999_000010000000.jsonl");

        let parsed = ChunkRange::parse_name(&range.name()).unwrap();
        assert_eq!(parsed.first(), 9_999_999);
        assert_eq!(parsed.last(), 10_000_000);
    }

    #[test]
    fn lexical_order_matches_numeric_within_primary_width() {
        let a = ChunkRange::new(2, 9).unwrap().name();
        let b = ChunkRange::new(10, 20).unwrap().name();
        assert!(a < b);
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "chunk_1_2",
            "part_0000001_0000002.jsonl",
            "chunk_0000002_0000001.jsonl",
            "chunk_000000a_0000002.jsonl",
            "chunk_0000001.jsonl",
            "chunk__0000002.jsonl",
        ] {
            assert!(ChunkRange::parse_name(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn zero_line_is_invalid() {
        assert!(ChunkRange::new(0, 5).is_none());
        assert!(ChunkRange::parse_name("chunk_0000000_0000005.jsonl").is_err());
    }

    #[test]
    fn full_key_layout() {
        let range = ChunkRange::new(4, 7).unwrap();
        let key = ChunkKey::new(42, "ext-abc", "t.jsonl", range);
        assert_eq!(
            key.as_str(),
            "42/ext-abc/chunks/t.jsonl/chunk_0000004_0000007.jsonl"
        );

        let parsed = ChunkKey::parse(key.as_str().to_owned()).unwrap();
        assert_eq!(parsed.range(), range);
    }

    #[test]
    fn segment_validation() {
        assert!(validate_segment("transcript.jsonl").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("..").is_err());
        assert!(validate_segment("a\\b").is_err());
        assert!(validate_segment("nul\u{0}byte").is_err());
    }
}
