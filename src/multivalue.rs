//! Decoding of `key: value|key: value` cells.
//!
//! Registry exports pack several facts into one cell, e.g.
//! `Allocation: Randomized|Masking: None (Open Label)`. Keys may repeat; their
//! values accumulate in encounter order.

use itertools::Itertools;

use crate::error::ScrubError;

pub const SEGMENT_DELIMITER: char = '|';
pub const KEY_VALUE_DELIMITER: char = ':';

/// Decoded cell contents, keyed in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValueMap {
    entries: Vec<(String, Vec<String>)>,
}

impl MultiValueMap {
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Values for `key` joined with the segment delimiter.
    pub fn joined(&self, key: &str) -> Result<String, ScrubError> {
        self.get(key)
            .map(|values| values.iter().join(&SEGMENT_DELIMITER.to_string()))
            .ok_or_else(|| ScrubError::MissingOptionalKey(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// All keys joined with the segment delimiter.
    pub fn joined_keys(&self) -> String {
        self.keys().join(&SEGMENT_DELIMITER.to_string())
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut Vec<String>> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, values)| values)
    }
}

/// Decodes the cell found under `column`.
///
/// Only the first piece after the key is kept when a segment holds more than
/// one `:`. A bare key is accepted only when the key was already seen.
pub fn decode(column: &str, raw: &str) -> Result<MultiValueMap, ScrubError> {
    let malformed = |reason: String| ScrubError::MalformedMultiValue {
        column: column.to_string(),
        reason,
    };

    let mut map = MultiValueMap::default();
    for (idx, segment) in raw.trim().split(SEGMENT_DELIMITER).enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(malformed(format!("segment {} is empty", idx + 1)));
        }
        let mut parts = segment.split(KEY_VALUE_DELIMITER);
        let key = parts.next().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(malformed(format!("segment {} has no key", idx + 1)));
        }
        let value = parts.next().map(str::trim);
        // A repeated bare key adds nothing but keeps the row.
        if let Some(values) = map.entry_mut(key) {
            if let Some(value) = value {
                values.push(value.to_string());
            }
            continue;
        }
        match value {
            Some(value) => map.entries.push((key.to_string(), vec![value.to_string()])),
            None => return Err(malformed(format!("key '{key}' has no value"))),
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_accumulate_in_encounter_order() {
        let map = decode("Study Designs", "A: 1|B: 2|A: 3").unwrap();
        assert_eq!(map.get("A").unwrap(), ["1", "3"]);
        assert_eq!(map.get("B").unwrap(), ["2"]);
        assert_eq!(map.joined_keys(), "A|B");
        assert_eq!(map.joined("A").unwrap(), "1|3");
    }

    #[test]
    fn segments_and_parts_are_trimmed() {
        let map = decode(
            "Study Designs",
            "  Allocation : Randomized |Masking:  Double (Participant, Investigator) ",
        )
        .unwrap();
        assert_eq!(map.joined("Allocation").unwrap(), "Randomized");
        assert_eq!(
            map.joined("Masking").unwrap(),
            "Double (Participant, Investigator)"
        );
    }

    #[test]
    fn extra_pieces_after_value_are_ignored() {
        let map = decode("Interventions", "Drug: Aspirin: 81mg").unwrap();
        assert_eq!(map.joined("Drug").unwrap(), "Aspirin");
    }

    #[test]
    fn bare_key_after_prior_occurrence_keeps_existing_values() {
        let map = decode("Interventions", "Drug: Aspirin|Drug").unwrap();
        assert_eq!(map.get("Drug").unwrap(), ["Aspirin"]);
    }

    #[test]
    fn bare_key_on_first_occurrence_is_malformed() {
        let err = decode("Interventions", "Drug").unwrap_err();
        assert!(matches!(
            err,
            ScrubError::MalformedMultiValue { ref column, .. } if column == "Interventions"
        ));
    }

    #[test]
    fn empty_cell_and_trailing_delimiter_are_malformed() {
        assert!(decode("Interventions", "").is_err());
        assert!(decode("Interventions", "Drug: Aspirin|").is_err());
        assert!(decode("Interventions", ": Aspirin").is_err());
    }

    #[test]
    fn empty_value_after_delimiter_is_kept() {
        let map = decode("Study Designs", "Masking:").unwrap();
        assert_eq!(map.joined("Masking").unwrap(), "");
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let map = decode("Study Designs", "Allocation: N/A").unwrap();
        assert_eq!(
            map.joined("Masking"),
            Err(ScrubError::MissingOptionalKey("Masking".into()))
        );
    }
}
