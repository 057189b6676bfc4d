//! Deterministic cache keys for search requests.
//!
//! Two requests that mean the same thing must produce the same fingerprint,
//! so every filter is normalized before hashing and absent filters are
//! written as an explicit sentinel instead of being left out.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

const UNSET: &str = "__unset__";

/// Filters as a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

/// Hex SHA-256 digest identifying an equivalence class of searches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchFingerprint(String);

impl SearchFingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyCodec {
    price_ceiling: f64,
}

impl KeyCodec {
    /// `price_ceiling` is the top of the client's price slider; a max price
    /// at or above it means "no upper bound".
    #[must_use]
    pub const fn new(price_ceiling: f64) -> Self {
        Self { price_ceiling }
    }

    /// Collapses runs of whitespace and trims. Case is preserved.
    #[must_use]
    pub fn normalize_query(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Maps every spelling of "no filter" to `None`.
    #[must_use]
    pub fn normalize(&self, filters: &SearchFilters) -> SearchFilters {
        SearchFilters {
            condition: normalize_label(filters.condition.as_deref())
                .map(|c| c.to_ascii_lowercase()),
            category: normalize_label(filters.category.as_deref()),
            min_price: filters
                .min_price
                .filter(|p| p.is_finite() && *p > 0.0),
            max_price: filters
                .max_price
                .filter(|p| p.is_finite() && *p < self.price_ceiling),
        }
    }

    #[must_use]
    pub fn fingerprint(&self, query: &str, filters: &SearchFilters) -> SearchFingerprint {
        let normalized = self.normalize(filters);

        let mut canonical = BTreeMap::new();
        canonical.insert("query", Self::normalize_query(query));
        canonical.insert("condition", or_unset(normalized.condition));
        canonical.insert("category", or_unset(normalized.category));
        canonical.insert(
            "min_price",
            or_unset(normalized.min_price.map(|p| format!("{p:.2}"))),
        );
        canonical.insert(
            "max_price",
            or_unset(normalized.max_price.map(|p| format!("{p:.2}"))),
        );

        // BTreeMap iteration order is sorted, so the encoding is stable.
        let encoded = canonical
            .iter()
            .map(|(k, v)| format!("{k}={}:{v}", v.len()))
            .collect::<Vec<_>>()
            .join("\n");

        SearchFingerprint(format!("{:x}", Sha256::digest(encoded.as_bytes())))
    }
}

fn normalize_label(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNSET.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> KeyCodec {
        KeyCodec::new(200.0)
    }

    fn filters(min: Option<f64>, max: Option<f64>) -> SearchFilters {
        SearchFilters {
            min_price: min,
            max_price: max,
            ..Default::default()
        }
    }

    #[test]
    fn fingerprint_is_fixed_length_hex() {
        let fp = codec().fingerprint("vintage camera", &SearchFilters::default());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ceiling_max_price_equals_omitted_max_price() {
        let c = codec();
        assert_eq!(
            c.fingerprint("vintage camera", &filters(Some(10.0), Some(200.0))),
            c.fingerprint("vintage camera", &filters(Some(10.0), None)),
        );
        assert_eq!(
            c.fingerprint("vintage camera", &filters(None, Some(500.0))),
            c.fingerprint("vintage camera", &filters(None, None)),
        );
    }

    #[test]
    fn zero_min_price_equals_omitted_min_price() {
        let c = codec();
        assert_eq!(
            c.fingerprint("lens", &filters(Some(0.0), None)),
            c.fingerprint("lens", &filters(None, None)),
        );
    }

    #[test]
    fn any_and_blank_labels_are_unset() {
        let c = codec();
        let explicit = SearchFilters {
            condition: Some("Any".to_string()),
            category: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            c.fingerprint("lens", &explicit),
            c.fingerprint("lens", &SearchFilters::default()),
        );
    }

    #[test]
    fn real_filters_change_the_fingerprint() {
        let c = codec();
        let base = c.fingerprint("lens", &SearchFilters::default());
        assert_ne!(base, c.fingerprint("lens", &filters(Some(10.0), None)));
        assert_ne!(base, c.fingerprint("lens", &filters(None, Some(150.0))));
        assert_ne!(base, c.fingerprint("lenses", &SearchFilters::default()));
    }

    #[test]
    fn whitespace_in_query_is_collapsed() {
        let c = codec();
        assert_eq!(
            c.fingerprint("  vintage   camera ", &SearchFilters::default()),
            c.fingerprint("vintage camera", &SearchFilters::default()),
        );
    }

    #[test]
    fn unicode_queries_hash_without_error() {
        let c = codec();
        let a = c.fingerprint("appareil photo ancien 📷", &SearchFilters::default());
        let b = c.fingerprint("appareil photo ancien 📷", &SearchFilters::default());
        assert_eq!(a, b);
    }

    #[test]
    fn filter_order_in_json_does_not_matter() {
        let a: SearchFilters =
            serde_json::from_str(r#"{"min_price": 10, "condition": "used"}"#).unwrap();
        let b: SearchFilters =
            serde_json::from_str(r#"{"condition": "used", "min_price": 10}"#).unwrap();
        assert_eq!(codec().fingerprint("x", &a), codec().fingerprint("x", &b));
    }
}
