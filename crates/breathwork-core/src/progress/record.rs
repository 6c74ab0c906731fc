//! Persisted progress record and its partial-update form.
//!
//! The JSON shape matches the progress service: camelCase keys, and the
//! per-technique counters travel as `techniques: [{techniqueId, sessions}]`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueCount {
    pub technique_id: String,
    #[serde(default)]
    pub sessions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub streak: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_sessions: u32,
    #[serde(default, rename = "techniques", with = "technique_counts")]
    pub per_technique_sessions: BTreeMap<String, u32>,
    #[serde(default)]
    pub last_selected_technique: Option<String>,
    /// Minutes value of the last selected duration option.
    #[serde(default)]
    pub last_selected_duration: Option<u32>,
    /// Seconds. Signed so corrupted values survive parsing and are rejected
    /// by resume reconstruction instead.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub last_session_elapsed_time: i64,
    #[serde(default)]
    pub last_session_start_time: Option<DateTime<Utc>>,
    /// When the record was last written.
    #[serde(default)]
    pub last_session: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn technique_sessions(&self, technique_id: &str) -> u32 {
        self.per_technique_sessions
            .get(technique_id)
            .copied()
            .unwrap_or(0)
    }

    /// Share of all completed sessions that used `technique_id`, 0..=100.
    pub fn technique_share_pct(&self, technique_id: &str) -> f64 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        self.technique_sessions(technique_id) as f64 / self.total_sessions as f64 * 100.0
    }

    /// Full-record update carrying every field.
    pub fn to_update(&self) -> ProgressUpdate {
        ProgressUpdate {
            streak: Some(self.streak),
            total_sessions: Some(self.total_sessions),
            techniques: Some(technique_counts::to_list(&self.per_technique_sessions)),
            last_selected_technique: self.last_selected_technique.clone(),
            last_selected_duration: self.last_selected_duration,
            last_session_elapsed_time: Some(self.last_session_elapsed_time),
            last_session_start_time: self.last_session_start_time,
            last_session: self.last_session,
        }
    }
}

/// A partial record. Present fields overwrite, absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub techniques: Option<Vec<TechniqueCount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_selected_technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_selected_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session_elapsed_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a later update into this one; the later value wins per field.
    pub fn merge(&mut self, later: ProgressUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if later.$field.is_some() { self.$field = later.$field; })*
            };
        }
        take!(
            streak,
            total_sessions,
            techniques,
            last_selected_technique,
            last_selected_duration,
            last_session_elapsed_time,
            last_session_start_time,
            last_session
        );
    }

    /// Apply to a stored record, the way the service's `$set` does.
    pub fn apply_to(&self, record: &mut ProgressRecord) {
        if let Some(v) = self.streak {
            record.streak = v;
        }
        if let Some(v) = self.total_sessions {
            record.total_sessions = v;
        }
        if let Some(list) = &self.techniques {
            record.per_technique_sessions = technique_counts::from_list(list.clone());
        }
        if let Some(v) = &self.last_selected_technique {
            record.last_selected_technique = Some(v.clone());
        }
        if let Some(v) = self.last_selected_duration {
            record.last_selected_duration = Some(v);
        }
        if let Some(v) = self.last_session_elapsed_time {
            record.last_session_elapsed_time = v;
        }
        if let Some(v) = self.last_session_start_time {
            record.last_session_start_time = Some(v);
        }
        if let Some(v) = self.last_session {
            record.last_session = Some(v);
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeconds {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Accepts integers, floats (truncated), numeric strings and null. Anything
/// else decodes as 0 so the rest of the record survives.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawSeconds>::deserialize(deserializer)? {
        Some(RawSeconds::Number(v)) => Some(v),
        Some(RawSeconds::Text(text)) => text.trim().parse::<f64>().ok(),
        Some(RawSeconds::Other(_)) | None => None,
    };
    Ok(match value {
        Some(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    })
}

pub(crate) mod technique_counts {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::TechniqueCount;

    pub fn to_list(map: &BTreeMap<String, u32>) -> Vec<TechniqueCount> {
        map.iter()
            .map(|(id, &sessions)| TechniqueCount {
                technique_id: id.clone(),
                sessions,
            })
            .collect()
    }

    pub fn from_list(list: Vec<TechniqueCount>) -> BTreeMap<String, u32> {
        list.into_iter()
            .map(|c| (c.technique_id, c.sessions))
            .collect()
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        to_list(map).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, u32>, D::Error> {
        let list = Option::<Vec<TechniqueCount>>::deserialize(deserializer)?;
        Ok(from_list(list.unwrap_or_default()))
    }
}
