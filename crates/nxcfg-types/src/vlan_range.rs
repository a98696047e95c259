//! VLAN range codec.
//!
//! Devices render a set of VLAN IDs as a compact comma/dash range string
//! (`"2-4,6-8"` for `{2,3,4,6,7,8}`). This module converts both ways.
//! Encoding an empty set yields the empty string; what an empty set *means*
//! (usually "no restriction", rendered `1-4094`) is a schema default, not a
//! codec decision.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Highest VLAN ID configurable on the device.
pub const MAX_VLAN_ID: u16 = 4094;

/// Errors raised while decoding a range string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// A token was not a number or an `a-b` span.
    #[error("Malformed range token '{token}'")]
    MalformedToken {
        /// The offending token.
        token: String,
    },

    /// A span ran backwards (`8-6`).
    #[error("Reversed span '{token}'")]
    ReversedSpan {
        /// The offending token.
        token: String,
    },

    /// An ID fell outside `1..=4094`.
    #[error("VLAN ID {id} out of range (1-{max})", max = MAX_VLAN_ID)]
    OutOfRange {
        /// The offending ID.
        id: u32,
    },
}

/// Matches a bare ID or an inclusive `a-b` span.
static RANGE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").expect("Invalid regex pattern"));

/// Decodes a range string into a deduplicated ascending ID list.
///
/// Empty or whitespace-only input decodes to an empty list, mirroring
/// [`encode`] of an empty set.
///
/// # Example
///
/// ```
/// use nxcfg_types::vlan_range::decode;
///
/// assert_eq!(decode("2-4,6-8").unwrap(), vec![2, 3, 4, 6, 7, 8]);
/// ```
pub fn decode(range: &str) -> Result<Vec<u16>, RangeError> {
    if range.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = BTreeSet::new();
    for raw in range.split(',') {
        let token = raw.trim();
        let caps = RANGE_TOKEN_RE
            .captures(token)
            .ok_or_else(|| RangeError::MalformedToken {
                token: token.to_string(),
            })?;

        let start = parse_id(&caps[1], token)?;
        let end = match caps.get(2) {
            Some(m) => parse_id(m.as_str(), token)?,
            None => start,
        };
        if start > end {
            return Err(RangeError::ReversedSpan {
                token: token.to_string(),
            });
        }
        ids.extend(start..=end);
    }
    Ok(ids.into_iter().collect())
}

/// Encodes an ID set as a compact range string.
///
/// Input is sorted and deduplicated first; consecutive runs merge into
/// `a-b` spans, runs of one render bare. An empty set encodes to `""`.
///
/// # Example
///
/// ```
/// use nxcfg_types::vlan_range::encode;
///
/// assert_eq!(encode(&[2, 3, 4, 6, 7, 8]), "2-4,6-8");
/// ```
pub fn encode(ids: &[u16]) -> String {
    let sorted: BTreeSet<u16> = ids.iter().copied().collect();

    let mut spans: Vec<(u16, u16)> = Vec::new();
    for id in sorted {
        match spans.last_mut() {
            Some((_, end)) if *end + 1 == id => *end = id,
            _ => spans.push((id, id)),
        }
    }

    spans
        .iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .join(",")
}

fn parse_id(digits: &str, token: &str) -> Result<u16, RangeError> {
    let id: u32 = digits.parse().map_err(|_| RangeError::MalformedToken {
        token: token.to_string(),
    })?;
    if id == 0 || id > u32::from(MAX_VLAN_ID) {
        return Err(RangeError::OutOfRange { id });
    }
    Ok(id as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_spans_and_singletons() {
        assert_eq!(decode("2-4,6-8").unwrap(), vec![2, 3, 4, 6, 7, 8]);
        assert_eq!(decode("10").unwrap(), vec![10]);
        assert_eq!(decode("1,3,5").unwrap(), vec![1, 3, 5]);
        assert_eq!(decode(" 2-4 , 6 ").unwrap(), vec![2, 3, 4, 6]);
    }

    #[test]
    fn test_decode_dedupes_and_sorts() {
        assert_eq!(decode("6-8,2-4,3,7").unwrap(), vec![2, 3, 4, 6, 7, 8]);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode("").unwrap(), Vec::<u16>::new());
        assert_eq!(decode("   ").unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(
            decode("2-4,abc"),
            Err(RangeError::MalformedToken {
                token: "abc".to_string()
            })
        );
        assert_eq!(
            decode("2--4"),
            Err(RangeError::MalformedToken {
                token: "2--4".to_string()
            })
        );
        assert_eq!(
            decode("8-6"),
            Err(RangeError::ReversedSpan {
                token: "8-6".to_string()
            })
        );
    }

    #[test]
    fn test_decode_out_of_range() {
        assert_eq!(decode("0"), Err(RangeError::OutOfRange { id: 0 }));
        assert_eq!(decode("4095"), Err(RangeError::OutOfRange { id: 4095 }));
        assert!(decode("4094").is_ok());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&[2, 3, 4, 6, 7, 8]), "2-4,6-8");
        assert_eq!(encode(&[5]), "5");
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[1, 2, 3, 4094]), "1-3,4094");
    }

    #[test]
    fn test_encode_unsorted_with_duplicates() {
        assert_eq!(encode(&[8, 2, 7, 3, 6, 4, 3]), "2-4,6-8");
    }

    #[test]
    fn test_round_trip() {
        let sets: Vec<Vec<u16>> = vec![
            vec![1],
            vec![2, 3, 4, 6, 7, 8],
            vec![1, 4094],
            (100..200).collect(),
            vec![9, 11, 13, 15],
        ];
        for set in sets {
            assert_eq!(decode(&encode(&set)).unwrap(), set);
        }
    }

    #[test]
    fn test_full_device_range() {
        assert_eq!(encode(&(1..=4094).collect::<Vec<u16>>()), "1-4094");
        assert_eq!(decode("1-4094").unwrap().len(), 4094);
    }
}
