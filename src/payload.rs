//! Payload derivation.
//!
//! Every iteration sends `Hello from <index>`. The mapping is a pure
//! function of the index, so a failing iteration can be reproduced by
//! index alone.

use bytes::Bytes;

/// Text every payload starts with.
pub const PREFIX: &str = "Hello from ";

/// Build the payload for iteration `index`.
pub fn for_index(index: usize) -> Bytes {
    Bytes::from(format!("{PREFIX}{index}"))
}

/// Length in bytes of the payload for iteration `index`.
pub fn len_for_index(index: usize) -> usize {
    PREFIX.len() + decimal_digits(index)
}

/// Longest payload a run of `requests` iterations will send.
///
/// Payload length only grows with the index, so this is the length of the
/// last one. Returns 0 for an empty run.
pub fn max_len(requests: usize) -> usize {
    match requests {
        0 => 0,
        n => len_for_index(n - 1),
    }
}

fn decimal_digits(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_format() {
        assert_eq!(&for_index(0)[..], b"Hello from 0");
        assert_eq!(&for_index(37)[..], b"Hello from 37");
        assert_eq!(&for_index(499)[..], b"Hello from 499");
    }

    #[test]
    fn test_payload_is_deterministic() {
        for i in [0, 1, 9, 10, 255, 12345] {
            assert_eq!(for_index(i), for_index(i));
        }
    }

    #[test]
    fn test_payloads_are_distinct() {
        let a = for_index(1);
        let b = for_index(11);
        assert_ne!(a, b);
    }

    #[test]
    fn test_len_matches_payload() {
        for i in [0, 9, 10, 99, 100, 4999, 100_000] {
            assert_eq!(len_for_index(i), for_index(i).len(), "index {i}");
        }
    }

    #[test]
    fn test_max_len() {
        assert_eq!(max_len(0), 0);
        assert_eq!(max_len(1), "Hello from 0".len());
        assert_eq!(max_len(500), "Hello from 499".len());
        assert_eq!(max_len(1001), "Hello from 1000".len());
    }
}
