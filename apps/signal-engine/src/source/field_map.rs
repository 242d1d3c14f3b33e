//! Positional decoding of the scraped live-tick payload.
//!
//! The upstream endpoint returns a single line of `;`-separated sections
//! whose fields carry meaning purely by position. A versioned index table
//! maps (section, position) pairs to named fields; sections and positions
//! absent from the table are ignored, so upstream layout drift degrades to
//! missing fields instead of failures.

use std::collections::HashMap;

use regex::Regex;

/// Index of the header section (times, status, prices, totals).
pub const SECTION_HEADER: usize = 0;
/// Index of the order-book section (`@`-separated depth rows).
pub const SECTION_BOOK: usize = 2;
/// Index of the participant section (retail/institutional splits).
pub const SECTION_PARTICIPANT: usize = 4;

/// A decoded field value.
///
/// Coercion tries integer, then float, then falls back to trimmed text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer payload.
    Int(i64),
    /// Fractional payload.
    Float(f64),
    /// Anything non-numeric, trimmed.
    Text(String),
}

impl FieldValue {
    /// Coerce one raw token. Empty (after trimming) yields `None`.
    #[must_use]
    pub fn coerce(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Some(Self::Int(int));
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            return Some(Self::Float(float));
        }
        Some(Self::Text(trimmed.to_string()))
    }

    /// Integer view; floats are truncated.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) => Some(*v as i64),
            Self::Text(_) => None,
        }
    }

    /// Float view.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => {
                #[allow(clippy::cast_precision_loss)]
                Some(*v as f64)
            }
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text view.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// Split a payload into its raw `;`-separated sections.
#[must_use]
pub fn split_sections(payload: &str) -> Vec<&str> {
    payload.split(';').collect()
}

/// Positional decoder over the versioned index table.
#[derive(Debug)]
pub struct FieldMapper {
    header: HashMap<usize, &'static str>,
    book: [&'static str; 18],
    participant: HashMap<usize, &'static str>,
    markup: Regex,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    /// Build the decoder with the current index table.
    ///
    /// # Panics
    /// Never; the markup pattern is a checked literal.
    #[must_use]
    pub fn new() -> Self {
        let header = HashMap::from([
            (0, "checksum_time"),
            (1, "status"),
            (2, "pl"),
            (3, "pc"),
            (4, "pf"),
            (5, "py"),
            (6, "pmax"),
            (7, "pmin"),
            (8, "tno"),
            (9, "tvol"),
            (10, "tval"),
        ]);
        let book = [
            "zd1", "qd1", "pd1", "po1", "qo1", "zo1", //
            "zd2", "qd2", "pd2", "po2", "qo2", "zo2", //
            "zd3", "qd3", "pd3", "po3", "qo3", "zo3",
        ];
        let participant = HashMap::from([
            (0, "buy_i_volume"),
            (1, "buy_n_volume"),
            (3, "sell_i_volume"),
            (4, "sell_n_volume"),
            (5, "buy_counti"),
            (6, "buy_countn"),
            (8, "sell_counti"),
            (9, "sell_countn"),
        ]);
        #[allow(clippy::expect_used)]
        let markup = Regex::new(r"<div class='pn'>([^<]*)</div>").expect("valid literal pattern");
        Self {
            header,
            book,
            participant,
            markup,
        }
    }

    /// Decode a payload into named fields.
    ///
    /// Unknown sections and positions are skipped; tokens wrapped in markup
    /// are unwrapped before coercion. Never fails: a malformed payload just
    /// decodes to fewer fields.
    #[must_use]
    pub fn map(&self, payload: &str) -> HashMap<&'static str, FieldValue> {
        let mut out = HashMap::new();
        for (section_index, section) in split_sections(payload).iter().enumerate() {
            match section_index {
                SECTION_HEADER => {
                    for (position, token) in section.split(',').enumerate() {
                        if let Some(name) = self.header.get(&position) {
                            if let Some(value) = self.coerce_token(token) {
                                out.insert(*name, value);
                            }
                        }
                    }
                }
                SECTION_BOOK => {
                    let rows: Vec<&str> = section.split(',').collect();
                    // The book section carries a trailing separator; the last
                    // split element is not a row.
                    for (row_index, row) in rows.iter().take(rows.len().saturating_sub(1)).enumerate()
                    {
                        for (col_index, token) in row.split('@').enumerate() {
                            let flat = row_index * 6 + col_index;
                            if let Some(name) = self.book.get(flat) {
                                if let Some(value) = self.coerce_token(token) {
                                    out.insert(*name, value);
                                }
                            }
                        }
                    }
                }
                SECTION_PARTICIPANT => {
                    for (position, token) in section.split(',').enumerate() {
                        if let Some(name) = self.participant.get(&position) {
                            if let Some(value) = self.coerce_token(token) {
                                out.insert(*name, value);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn coerce_token(&self, token: &str) -> Option<FieldValue> {
        if let Some(captures) = self.markup.captures(token) {
            if let Some(inner) = captures.get(1) {
                return FieldValue::coerce(inner.as_str());
            }
        }
        FieldValue::coerce(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "12:29:38,A,5000,4980,4900,4950,5100,4850,1200,3400000,16900000000;;\
1@1000@4990@5000@500@2,3@2000@4980@5010@700@4,5@1500@4970@5020@300@1,;;\
2500000,900000,,2100000,1300000,410,12,,380,9";

    #[test]
    fn header_fields_decode_by_position() {
        let mapper = FieldMapper::new();
        let fields = mapper.map(PAYLOAD);

        assert_eq!(fields["checksum_time"].as_text(), Some("12:29:38"));
        assert_eq!(fields["status"].as_text(), Some("A"));
        assert_eq!(fields["pl"].as_i64(), Some(5000));
        assert_eq!(fields["py"].as_i64(), Some(4950));
        assert_eq!(fields["tval"].as_i64(), Some(16_900_000_000));
    }

    #[test]
    fn book_rows_flatten_across_levels() {
        let mapper = FieldMapper::new();
        let fields = mapper.map(PAYLOAD);

        assert_eq!(fields["zd1"].as_i64(), Some(1));
        assert_eq!(fields["qo1"].as_i64(), Some(500));
        assert_eq!(fields["pd2"].as_i64(), Some(4980));
        assert_eq!(fields["zo3"].as_i64(), Some(1));
    }

    #[test]
    fn participant_fields_skip_empty_tokens() {
        let mapper = FieldMapper::new();
        let fields = mapper.map(PAYLOAD);

        assert_eq!(fields["buy_i_volume"].as_i64(), Some(2_500_000));
        assert_eq!(fields["sell_i_volume"].as_i64(), Some(2_100_000));
        assert_eq!(fields["buy_counti"].as_i64(), Some(410));
        assert_eq!(fields["sell_counti"].as_i64(), Some(380));
    }

    #[test]
    fn markup_wrapped_tokens_unwrap_before_coercion() {
        let mapper = FieldMapper::new();
        let fields = mapper.map("12:00:00,A,<div class='pn'>4321</div>,1,1,1,1,1,1,1,1");

        assert_eq!(fields["pl"].as_i64(), Some(4321));
    }

    #[test]
    fn malformed_payload_decodes_to_fewer_fields() {
        let mapper = FieldMapper::new();
        let fields = mapper.map("garbage");

        assert_eq!(fields.get("checksum_time").and_then(FieldValue::as_text), Some("garbage"));
        assert!(!fields.contains_key("pl"));
    }

    #[test]
    fn coercion_order_is_int_float_text() {
        assert_eq!(FieldValue::coerce("42"), Some(FieldValue::Int(42)));
        assert_eq!(FieldValue::coerce("4.25"), Some(FieldValue::Float(4.25)));
        assert_eq!(
            FieldValue::coerce(" AR "),
            Some(FieldValue::Text("AR".to_string()))
        );
        assert_eq!(FieldValue::coerce("   "), None);
    }
}
