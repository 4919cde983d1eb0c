//! Glob patterns over `/`-separated paths of response keys.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `**`: zero or more path segments
    AnyDepth,
    /// One path segment, where `*` matches any characters and `?` one character
    Glob(String),
}

/// A compiled pattern such as `Type.a/*/b??` or `a/**`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    object_type: Option<String>,
    segments: Vec<Segment>,
}

impl Pattern {
    pub(crate) fn parse(pattern: &str) -> Self {
        let (object_type, path) = match pattern.split_once('.') {
            Some((object_type, path)) if !object_type.contains('/') => {
                (Some(object_type.to_owned()), path)
            }
            _ => (None, pattern),
        };
        let segments = path
            .split('/')
            .map(|segment| match segment {
                "**" => Segment::AnyDepth,
                _ => Segment::Glob(segment.to_owned()),
            })
            .collect();
        Self {
            object_type,
            segments,
        }
    }

    /// `path` is relative to the selection set being queried
    pub(crate) fn matches(&self, path: &str, object_type: &str) -> bool {
        if self
            .object_type
            .as_deref()
            .is_some_and(|expected| expected != object_type)
        {
            return false;
        }
        let path: Vec<&str> = path.split('/').collect();
        match_segments(&self.segments, &path)
    }
}

fn match_segments(segments: &[Segment], path: &[&str]) -> bool {
    match segments.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skipped| match_segments(rest, &path[skipped..]))
        }
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((first, path_rest)) => {
                glob_match(glob.as_bytes(), first.as_bytes()) && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

/// Response keys are GraphQL names, which are ASCII
fn glob_match(glob: &[u8], text: &[u8]) -> bool {
    let (mut g, mut t) = (0, 0);
    // Position after the last `*` seen and the text position it was tried at
    let mut backtrack = None;
    while t < text.len() {
        match glob.get(g) {
            Some(b'*') => {
                backtrack = Some((g + 1, t));
                g += 1;
                continue;
            }
            Some(b'?') => {
                g += 1;
                t += 1;
                continue;
            }
            Some(&c) if c == text[t] => {
                g += 1;
                t += 1;
                continue;
            }
            _ => {}
        }
        match backtrack {
            Some((after_star, tried)) => {
                g = after_star;
                t = tried + 1;
                backtrack = Some((after_star, tried + 1));
            }
            None => return false,
        }
    }
    glob[g..].iter().all(|&c| c == b'*')
}
