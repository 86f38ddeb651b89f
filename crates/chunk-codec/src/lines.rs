use bytes::{BufMut, Bytes, BytesMut};

/// Encodes already-newline-free lines into a chunk body: each line followed
/// by exactly one `\n`, no other framing.
pub fn encode_lines<S: AsRef<str>>(lines: &[S]) -> Bytes {
    let total = lines
        .iter()
        .map(|line| line.as_ref().len() + 1)
        .sum::<usize>();

    let mut buf = BytesMut::with_capacity(total);
    for line in lines {
        buf.put_slice(line.as_ref().as_bytes());
        buf.put_u8(b'\n');
    }

    buf.freeze()
}

/// Iterates the newline-terminated lines of a chunk body, without the
/// terminators. A missing final terminator still yields the trailing bytes
/// as a line.
pub fn lines(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = body;

    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        match memchr::memchr(b'\n', rest) {
            Some(at) => {
                let line = &rest[..at];
                rest = &rest[at + 1..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = &[];
                Some(line)
            }
        }
    })
}

/// Drops the first `n` lines of a chunk body, returning the remainder as a
/// zero-copy slice. Returns an empty buffer if the body holds `n` or fewer
/// lines.
pub fn skip_lines(body: Bytes, n: u64) -> Bytes {
    if n == 0 {
        return body;
    }

    let mut seen = 0_u64;
    for at in memchr::memchr_iter(b'\n', &body) {
        seen += 1;
        if seen == n {
            return body.slice(at + 1..);
        }
    }

    Bytes::new()
}
