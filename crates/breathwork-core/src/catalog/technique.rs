use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// One labeled segment of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub label: String,
    /// Duration in seconds. Never zero once validated.
    pub duration_secs: u32,
}

/// Raw technique definition as written in configuration.
///
/// Labels and durations are parallel lists; [`Technique::try_from`] checks
/// that they line up before anything else sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub phases: Vec<String>,
    pub durations: Vec<u32>,
}

/// A validated breathing technique. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TechniqueSpec", into = "TechniqueSpec")]
pub struct Technique {
    id: String,
    name: String,
    description: String,
    benefits: Vec<String>,
    difficulty: Difficulty,
    phases: Vec<Phase>,
    cycle_secs: u32,
}

impl Technique {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn benefits(&self) -> &[String] {
        &self.benefits
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Duration of phase `index` in seconds, or 0 when out of range.
    pub fn phase_duration(&self, index: usize) -> u32 {
        self.phases.get(index).map(|p| p.duration_secs).unwrap_or(0)
    }

    pub fn phase_label(&self, index: usize) -> &str {
        self.phases.get(index).map(|p| p.label.as_str()).unwrap_or("")
    }

    /// Sum of all phase durations. Always > 0.
    pub fn cycle_secs(&self) -> u32 {
        self.cycle_secs
    }
}

impl TryFrom<TechniqueSpec> for Technique {
    type Error = CatalogError;

    fn try_from(spec: TechniqueSpec) -> Result<Self, Self::Error> {
        if spec.id.trim().is_empty() {
            return Err(CatalogError::EmptyTechniqueId);
        }
        if spec.phases.len() != spec.durations.len() {
            return Err(CatalogError::PhaseCountMismatch {
                id: spec.id,
                labels: spec.phases.len(),
                durations: spec.durations.len(),
            });
        }
        if spec.phases.len() < 2 {
            return Err(CatalogError::TooFewPhases {
                id: spec.id,
                count: spec.phases.len(),
            });
        }
        if let Some(index) = spec.durations.iter().position(|&d| d == 0) {
            return Err(CatalogError::ZeroPhaseDuration { id: spec.id, index });
        }

        let cycle_secs = spec
            .durations
            .iter()
            .fold(0u32, |acc, &d| acc.saturating_add(d));
        let phases = spec
            .phases
            .into_iter()
            .zip(spec.durations)
            .map(|(label, duration_secs)| Phase {
                label,
                duration_secs,
            })
            .collect();

        Ok(Self {
            id: spec.id,
            name: spec.name,
            description: spec.description,
            benefits: spec.benefits,
            difficulty: spec.difficulty,
            phases,
            cycle_secs,
        })
    }
}

impl From<Technique> for TechniqueSpec {
    fn from(t: Technique) -> Self {
        let (phases, durations) = t
            .phases
            .into_iter()
            .map(|p| (p.label, p.duration_secs))
            .unzip();
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            benefits: t.benefits,
            difficulty: t.difficulty,
            phases,
            durations,
        }
    }
}

/// How long a session runs, expressed as a target cycle count.
///
/// `cycles` is an approximation of `minutes` for typical techniques; the
/// engine only ever counts cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationOption {
    pub minutes: u32,
    pub cycles: u32,
}

impl DurationOption {
    pub fn label(&self) -> String {
        format!("{} min", self.minutes)
    }

    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        if self.minutes == 0 || self.cycles == 0 {
            return Err(CatalogError::InvalidDuration {
                minutes: self.minutes,
                cycles: self.cycles,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(phases: &[&str], durations: &[u32]) -> TechniqueSpec {
        TechniqueSpec {
            id: "t".into(),
            name: "Test".into(),
            description: String::new(),
            benefits: vec![],
            difficulty: Difficulty::Beginner,
            phases: phases.iter().map(|s| s.to_string()).collect(),
            durations: durations.to_vec(),
        }
    }

    #[test]
    fn cycle_time_is_sum_of_durations() {
        let t = Technique::try_from(spec(&["In", "Hold", "Out"], &[4, 7, 8])).unwrap();
        assert_eq!(t.cycle_secs(), 19);
        assert_eq!(t.phase_count(), 3);
        assert_eq!(t.phase_label(1), "Hold");
        assert_eq!(t.phase_duration(2), 8);
        assert_eq!(t.phase_duration(9), 0);
    }

    #[test]
    fn rejects_single_phase() {
        let err = Technique::try_from(spec(&["In"], &[4])).unwrap_err();
        assert_eq!(
            err,
            CatalogError::TooFewPhases {
                id: "t".into(),
                count: 1
            }
        );
    }

    #[test]
    fn rejects_empty_phase_list() {
        assert!(matches!(
            Technique::try_from(spec(&[], &[])),
            Err(CatalogError::TooFewPhases { count: 0, .. })
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(matches!(
            Technique::try_from(spec(&["In", "Out"], &[4])),
            Err(CatalogError::PhaseCountMismatch { labels: 2, durations: 1, .. })
        ));
    }

    #[test]
    fn rejects_zero_duration_phase() {
        assert!(matches!(
            Technique::try_from(spec(&["In", "Out"], &[4, 0])),
            Err(CatalogError::ZeroPhaseDuration { index: 1, .. })
        ));
    }

    #[test]
    fn deserialize_runs_validation() {
        let json = r#"{"id":"x","name":"X","phases":["In"],"durations":[3]}"#;
        assert!(serde_json::from_str::<Technique>(json).is_err());

        let json = r#"{"id":"x","name":"X","phases":["In","Out"],"durations":[3,5]}"#;
        let t: Technique = serde_json::from_str(json).unwrap();
        assert_eq!(t.cycle_secs(), 8);
    }

    #[test]
    fn difficulty_defaults_to_beginner() {
        assert_eq!(Difficulty::default(), Difficulty::Beginner);
        let json = r#"{"id":"x","name":"X","phases":["In","Out"],"durations":[3,3]}"#;
        let t: Technique = serde_json::from_str(json).unwrap();
        assert_eq!(t.difficulty(), Difficulty::Beginner);
    }

    #[test]
    fn duration_label() {
        let d = DurationOption {
            minutes: 5,
            cycles: 18,
        };
        assert_eq!(d.label(), "5 min");
        assert!(d.validate().is_ok());
        assert!(DurationOption { minutes: 0, cycles: 3 }.validate().is_err());
    }
}
