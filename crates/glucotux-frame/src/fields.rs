//! Delimiter-based decomposition of record text.

/// Fields kept per record.
pub const MAX_FIELDS: usize = 14;
/// Bytes kept per field; longer fields are cut.
pub const MAX_FIELD_LEN: usize = 159;
/// Components kept per field.
pub const MAX_COMPONENTS: usize = 5;
/// Bytes kept per component.
pub const MAX_COMPONENT_LEN: usize = 19;

/// Ordered fields of one record (or components of one field).
///
/// Indexing past the last field yields an empty string, so decoders can read
/// optional trailing fields without bounds checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    fields: Vec<String>,
}

impl FieldTable {
    /// Field `index`, or `""` if the record has fewer fields.
    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Whether the record carried field `index` at all.
    pub fn has(&self, index: usize) -> bool {
        index < self.fields.len()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Split field `index` into components.
    ///
    /// Without a delimiter the whole field is the single component.
    pub fn components(&self, index: usize, delimiter: Option<u8>) -> FieldTable {
        let field = self.get(index).as_bytes();
        match delimiter {
            Some(delimiter) => split_fields(field, delimiter, MAX_COMPONENTS, MAX_COMPONENT_LEN),
            None => split_fields(field, 0, 1, MAX_COMPONENT_LEN),
        }
    }
}

impl std::ops::Index<usize> for FieldTable {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        self.get(index)
    }
}

/// Split `buffer` on `delimiter`.
///
/// Yields one field more than there are delimiters, so adjacent delimiters
/// produce an empty field. At most `max_fields` fields are kept and each is
/// cut to `max_field_len` bytes. Invalid UTF-8 is replaced, never rejected.
pub fn split_fields(
    buffer: &[u8],
    delimiter: u8,
    max_fields: usize,
    max_field_len: usize,
) -> FieldTable {
    let fields = buffer
        .split(|&byte| byte == delimiter)
        .take(max_fields)
        .map(|field| {
            let kept = &field[..field.len().min(max_field_len)];
            String::from_utf8_lossy(kept).into_owned()
        })
        .collect();

    FieldTable { fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_more_field_than_delimiters() {
        let table = split_fields(b"R|1|^^^Glucose|93", b'|', MAX_FIELDS, MAX_FIELD_LEN);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2), "^^^Glucose");
        assert_eq!(&table[3], "93");
    }

    #[test]
    fn adjacent_delimiters_yield_empty_field() {
        let table = split_fields(b"a||b|", b'|', MAX_FIELDS, MAX_FIELD_LEN);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["a", "", "b", ""]);
    }

    #[test]
    fn empty_input_is_one_empty_field() {
        let table = split_fields(b"", b'|', MAX_FIELDS, MAX_FIELD_LEN);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), "");
    }

    #[test]
    fn long_fields_are_truncated() {
        let table = split_fields(b"abcdefgh|xy", b'|', MAX_FIELDS, 3);
        assert_eq!(table.get(0), "abc");
        assert_eq!(table.get(1), "xy");
    }

    #[test]
    fn field_count_is_capped() {
        let table = split_fields(b"1|2|3|4|5|6", b'|', 3, MAX_FIELD_LEN);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2), "3");
        assert_eq!(table.get(5), "");
        assert!(!table.has(3));
    }

    #[test]
    fn splitting_is_deterministic() {
        let input = b"H|\\^&|||Bayer7390^01.24\\01.04\\09.02^7390-2336773^7403-";
        let first = split_fields(input, b'|', MAX_FIELDS, MAX_FIELD_LEN);
        let second = split_fields(input, b'|', MAX_FIELDS, MAX_FIELD_LEN);
        assert_eq!(first, second);
    }

    #[test]
    fn components_of_a_field() {
        let table = split_fields(
            b"H|\\^&|||Bayer7390^01.24\\01.04\\09.02^7390-2336773^7403-",
            b'|',
            MAX_FIELDS,
            MAX_FIELD_LEN,
        );
        let sender = table.components(4, Some(b'^'));
        assert_eq!(sender.get(0), "Bayer7390");
        assert_eq!(sender.get(1), "01.24\\01.04\\09.02");
        assert_eq!(sender.get(2), "7390-2336773");

        let whole = table.components(4, None);
        assert_eq!(whole.len(), 1);
        assert_eq!(whole.get(0), "Bayer7390^01.24\\01.");
    }
}
