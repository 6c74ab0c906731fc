//! Static technique and duration catalog.
//!
//! Built once at startup, either from the built-in set or from definitions
//! in the configuration file. Every entry is validated here so the session
//! clock only ever sees well-formed techniques.

mod technique;

pub use technique::{Difficulty, DurationOption, Phase, Technique, TechniqueSpec};

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::CatalogError;

#[derive(Debug, Clone)]
pub struct Catalog {
    techniques: Vec<Arc<Technique>>,
    durations: Vec<DurationOption>,
}

impl Catalog {
    /// Validate and assemble a catalog. The first technique and the second
    /// duration option (or the only one) are the defaults.
    pub fn new(
        techniques: Vec<TechniqueSpec>,
        durations: Vec<DurationOption>,
    ) -> Result<Self, CatalogError> {
        if techniques.is_empty() {
            return Err(CatalogError::NoTechniques);
        }
        if durations.is_empty() {
            return Err(CatalogError::NoDurations);
        }

        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(techniques.len());
        for spec in techniques {
            if !seen.insert(spec.id.clone()) {
                return Err(CatalogError::DuplicateTechnique(spec.id));
            }
            validated.push(Arc::new(Technique::try_from(spec)?));
        }

        let mut minutes = HashSet::new();
        for d in &durations {
            d.validate()?;
            if !minutes.insert(d.minutes) {
                return Err(CatalogError::DuplicateDuration(d.minutes));
            }
        }

        Ok(Self {
            techniques: validated,
            durations,
        })
    }

    /// Box, 4-7-8 and diaphragmatic breathing with 1–10 minute presets.
    pub fn builtin() -> Self {
        Self::new(builtin_techniques(), builtin_durations())
            .unwrap_or_else(|e| unreachable!("built-in catalog is valid: {e}"))
    }

    pub fn techniques(&self) -> &[Arc<Technique>] {
        &self.techniques
    }

    pub fn durations(&self) -> &[DurationOption] {
        &self.durations
    }

    pub fn technique(&self, id: &str) -> Option<&Arc<Technique>> {
        self.techniques.iter().find(|t| t.id() == id)
    }

    pub fn duration(&self, minutes: u32) -> Option<DurationOption> {
        self.durations.iter().copied().find(|d| d.minutes == minutes)
    }

    pub fn default_technique(&self) -> &Arc<Technique> {
        &self.techniques[0]
    }

    pub fn default_duration(&self) -> DurationOption {
        self.durations
            .get(1)
            .or_else(|| self.durations.first())
            .copied()
            .unwrap_or(DurationOption {
                minutes: 1,
                cycles: 1,
            })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn builtin_techniques() -> Vec<TechniqueSpec> {
    vec![
        TechniqueSpec {
            id: "box".into(),
            name: "Box Breathing".into(),
            description: "Navy SEAL technique for stress reduction and improved focus".into(),
            benefits: vec![
                "Reduces stress and anxiety".into(),
                "Improves concentration".into(),
                "Lowers blood pressure".into(),
                "Enhances mental clarity".into(),
            ],
            difficulty: Difficulty::Beginner,
            phases: vec![
                "Breathe In".into(),
                "Hold".into(),
                "Breathe Out".into(),
                "Hold".into(),
            ],
            durations: vec![4, 4, 4, 4],
        },
        TechniqueSpec {
            id: "478".into(),
            name: "4-7-8 Breathing".into(),
            description: "Dr. Weil's technique for better sleep and anxiety relief".into(),
            benefits: vec![
                "Promotes better sleep".into(),
                "Reduces anxiety".into(),
                "Calms nervous system".into(),
                "Helps with insomnia".into(),
            ],
            difficulty: Difficulty::Intermediate,
            phases: vec!["Inhale".into(), "Hold".into(), "Exhale".into()],
            durations: vec![4, 7, 8],
        },
        TechniqueSpec {
            id: "diaphragmatic".into(),
            name: "Diaphragmatic Breathing".into(),
            description: "Deep belly breathing for stress relief and better oxygen flow".into(),
            benefits: vec![
                "Strengthens diaphragm".into(),
                "Reduces oxygen demand".into(),
                "Improves core stability".into(),
                "Enhances relaxation".into(),
            ],
            difficulty: Difficulty::Beginner,
            phases: vec!["Inhale".into(), "Exhale".into()],
            durations: vec![4, 6],
        },
    ]
}

pub fn builtin_durations() -> Vec<DurationOption> {
    [(1, 3), (2, 7), (3, 12), (5, 18), (10, 37)]
        .into_iter()
        .map(|(minutes, cycles)| DurationOption { minutes, cycles })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_three_techniques() {
        let c = Catalog::builtin();
        assert_eq!(c.techniques().len(), 3);
        assert_eq!(c.technique("box").unwrap().cycle_secs(), 16);
        assert_eq!(c.technique("478").unwrap().cycle_secs(), 19);
        assert_eq!(c.technique("diaphragmatic").unwrap().cycle_secs(), 10);
        assert!(c.technique("wim-hof").is_none());
    }

    #[test]
    fn defaults_match_first_technique_and_two_minutes() {
        let c = Catalog::builtin();
        assert_eq!(c.default_technique().id(), "box");
        assert_eq!(c.default_duration().minutes, 2);
        assert_eq!(c.duration(10).unwrap().cycles, 37);
        assert!(c.duration(4).is_none());
    }

    #[test]
    fn rejects_duplicate_technique_ids() {
        let mut techniques = builtin_techniques();
        techniques.push(techniques[0].clone());
        assert_eq!(
            Catalog::new(techniques, builtin_durations()).unwrap_err(),
            CatalogError::DuplicateTechnique("box".into())
        );
    }

    #[test]
    fn rejects_malformed_entry_before_use() {
        let mut techniques = builtin_techniques();
        techniques[1].durations = vec![4, 0, 8];
        assert!(matches!(
            Catalog::new(techniques, builtin_durations()),
            Err(CatalogError::ZeroPhaseDuration { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_empty_lists_and_bad_durations() {
        assert_eq!(
            Catalog::new(vec![], builtin_durations()).unwrap_err(),
            CatalogError::NoTechniques
        );
        assert_eq!(
            Catalog::new(builtin_techniques(), vec![]).unwrap_err(),
            CatalogError::NoDurations
        );
        assert!(matches!(
            Catalog::new(
                builtin_techniques(),
                vec![DurationOption { minutes: 2, cycles: 0 }]
            ),
            Err(CatalogError::InvalidDuration { .. })
        ));
        assert_eq!(
            Catalog::new(
                builtin_techniques(),
                vec![
                    DurationOption { minutes: 2, cycles: 7 },
                    DurationOption { minutes: 2, cycles: 8 }
                ]
            )
            .unwrap_err(),
            CatalogError::DuplicateDuration(2)
        );
    }

    #[test]
    fn single_duration_is_default() {
        let c = Catalog::new(
            builtin_techniques(),
            vec![DurationOption { minutes: 3, cycles: 12 }],
        )
        .unwrap();
        assert_eq!(c.default_duration().minutes, 3);
    }
}
