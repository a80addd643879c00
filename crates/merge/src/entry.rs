use std::cmp::Ordering;

/// A single sort-key / value pair, both already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Encoded sort key. Determines the entry's position.
    pub key: Vec<u8>,
    /// Encoded value. Opaque to ordering.
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Bytes held by key and value, not counting allocation overhead.
    pub fn byte_len(&self) -> usize {
        self.key.len() + self.value.len()
    }

    /// Compares two entries by key only.
    pub fn cmp_key(&self, other: &Entry) -> Ordering {
        compare_keys(&self.key, &other.key)
    }
}

/// Unsigned lexicographic comparison of encoded keys.
///
/// `[u8]` ordering already compares byte values as 0..=255 and treats a
/// strict prefix as smaller; this function names that contract.
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_compare_unsigned() {
        assert_eq!(compare_keys(&[0x7F], &[0x80]), Ordering::Less);
        assert_eq!(compare_keys(&[0xFF], &[0x00]), Ordering::Greater);
    }

    #[test]
    fn shorter_prefix_is_less() {
        assert_eq!(compare_keys(b"ab", b"abc"), Ordering::Less);
        assert_eq!(compare_keys(b"", b"a"), Ordering::Less);
        assert_eq!(compare_keys(b"abc", b"abc"), Ordering::Equal);
    }

    #[test]
    fn value_does_not_affect_key_order() {
        let a = Entry::new(b"k".to_vec(), b"zzz".to_vec());
        let b = Entry::new(b"k".to_vec(), b"aaa".to_vec());
        assert_eq!(a.cmp_key(&b), Ordering::Equal);
        assert_eq!(a.byte_len(), 4);
    }
}
