//! BGP autonomous-system number normalization.
//!
//! ASNs appear in ASPLAIN (`"65001"`) and ASDOT (`"1.5"`) notations; both
//! address the same 32-bit number. Identity matching needs one canonical
//! form, so everything normalizes to the plain value.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors raised while normalizing an ASN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsnError {
    /// Input was not ASPLAIN or ASDOT.
    #[error("Malformed BGP ASN '{input}'")]
    Malformed {
        /// The offending input.
        input: String,
    },
}

/// Matches ASPLAIN (`55`) or ASDOT (`1.5`).
static ASN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\.(\d+))?$").expect("Invalid regex pattern"));

/// Normalizes an ASN string to its 32-bit ASPLAIN value.
///
/// # Example
///
/// ```
/// use nxcfg_types::asn::normalize;
///
/// assert_eq!(normalize("65001").unwrap(), 65001);
/// assert_eq!(normalize("1.5").unwrap(), 65541);
/// ```
pub fn normalize(input: &str) -> Result<u32, AsnError> {
    let trimmed = input.trim();
    let caps = ASN_RE
        .captures(trimmed)
        .ok_or_else(|| AsnError::Malformed {
            input: input.to_string(),
        })?;

    let malformed = || AsnError::Malformed {
        input: input.to_string(),
    };

    match caps.get(2) {
        // ASDOT: high 16 bits before the dot, low 16 after.
        Some(low) => {
            let high: u32 = caps[1].parse().map_err(|_| malformed())?;
            let low: u32 = low.as_str().parse().map_err(|_| malformed())?;
            if high > 0xFFFF || low > 0xFFFF {
                return Err(malformed());
            }
            Ok((high << 16) | low)
        }
        None => trimmed.parse().map_err(|_| malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asplain() {
        assert_eq!(normalize("55").unwrap(), 55);
        assert_eq!(normalize("65001").unwrap(), 65001);
        assert_eq!(normalize(" 4294967295 ").unwrap(), u32::MAX);
    }

    #[test]
    fn test_asdot() {
        assert_eq!(normalize("1.5").unwrap(), (1 << 16) | 5);
        assert_eq!(normalize("0.1").unwrap(), 1);
        assert_eq!(normalize("65535.65535").unwrap(), u32::MAX);
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "abc", "1.2.3", "-5", "65536.0", "0.65536"] {
            assert!(normalize(bad).is_err(), "expected failure for {:?}", bad);
        }
    }
}
