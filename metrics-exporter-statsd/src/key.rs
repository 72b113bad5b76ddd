use std::borrow::Cow;

/// Joins the given key segments into a single dotted metric name.
///
/// Segments are joined in order with `.` as the separator, and no escaping of any kind is performed. An empty set of
/// segments yields an empty string.
pub fn flatten_key<S>(segments: &[S]) -> String
where
    S: AsRef<str>,
{
    let len = segments.iter().map(|s| s.as_ref().len() + 1).sum::<usize>();

    let mut flattened = String::with_capacity(len);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            flattened.push('.');
        }
        flattened.push_str(segment.as_ref());
    }

    flattened
}

/// Replaces the characters that carry structural meaning in a statsd line with underscores.
///
/// A colon would be read as the name/value separator, a pipe as the value/type separator, a line break would end the
/// line early, and most statsd readers split fields on whitespace. All of these are rewritten to `_` before a name hits
/// the wire. Names without any of them are borrowed as-is.
pub fn sanitize_name(name: &str) -> Cow<'_, str> {
    if name.bytes().any(is_reserved) {
        Cow::Owned(name.chars().map(|c| if u8::try_from(c).is_ok_and(is_reserved) { '_' } else { c }).collect())
    } else {
        Cow::Borrowed(name)
    }
}

const fn is_reserved(b: u8) -> bool {
    matches!(b, b' ' | b':' | b'|' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::{flatten_key, sanitize_name};

    #[test]
    fn flatten() {
        assert_eq!(flatten_key(&["a", "b", "c", "d"]), "a.b.c.d");
        assert_eq!(flatten_key(&["single"]), "single");
        assert_eq!(flatten_key(&[String::from("owned"), String::from("segments")]), "owned.segments");
    }

    #[test]
    fn flatten_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(flatten_key(&empty), "");
    }

    #[test]
    fn flatten_does_not_escape() {
        assert_eq!(flatten_key(&["sample", "slow thingy"]), "sample.slow thingy");
        assert_eq!(flatten_key(&["a.b", "c"]), "a.b.c");
    }

    #[test]
    fn sanitize() {
        let cases = [
            ("gauge.val", "gauge.val"),
            ("sample.slow thingy", "sample.slow_thingy"),
            ("host:port.requests", "host_port.requests"),
            ("  ", "__"),
            ("a|c", "a_c"),
            ("a\nb\r\n", "a_b__"),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(sanitize_name(input), expected);
        }
    }

    #[test]
    fn sanitize_borrows_clean_names() {
        assert!(matches!(sanitize_name("counter.me"), Cow::Borrowed(_)));
        assert!(matches!(sanitize_name("counter me"), Cow::Owned(_)));
    }

    proptest! {
        #[test]
        fn flatten_matches_join(segments in arb_vec("[a-zA-Z0-9 _-]{1,12}", 1..8)) {
            prop_assert_eq!(flatten_key(&segments), segments.join("."));
        }
    }
}
