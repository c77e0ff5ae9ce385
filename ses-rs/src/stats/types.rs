use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Point-in-time snapshot of the send counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total_emails_sent: u64,
    pub success_count: u64,
    pub total_err_count: u64,
    /// Error code -> occurrences
    #[serde(
        default,
        skip_serializing_if = "HashMap::is_empty",
        serialize_with = "serialize_sorted"
    )]
    pub errors: HashMap<String, u64>,
}

impl EmailStats {
    /// Sum of the per-code counters
    pub fn error_sum(&self) -> u64 {
        self.errors.values().sum()
    }

    /// Whether the top-level counters agree with each other
    pub fn is_consistent(&self) -> bool {
        self.total_emails_sent == self.success_count + self.total_err_count
    }
}

/// Serialize a map with keys in sorted order
fn serialize_sorted<S>(map: &HashMap<String, u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let sorted: BTreeMap<&String, &u64> = map.iter().collect();
    sorted.serialize(serializer)
}
