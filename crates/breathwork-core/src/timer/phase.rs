//! Position of a point in time inside one breathing cycle.

use serde::{Deserialize, Serialize};

use crate::catalog::Technique;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePosition {
    pub phase_index: usize,
    /// Seconds left in the phase, `1..=duration`.
    pub phase_remaining: u32,
}

/// Map seconds elapsed within a cycle to the active phase.
///
/// `elapsed_in_cycle` is expected to be reduced modulo the cycle time by the
/// caller. Values at or past the cycle length wrap to the start of phase 0.
pub fn compute_phase(technique: &Technique, elapsed_in_cycle: u32) -> PhasePosition {
    let mut remainder = elapsed_in_cycle;
    for (index, phase) in technique.phases().iter().enumerate() {
        if remainder < phase.duration_secs {
            return PhasePosition {
                phase_index: index,
                phase_remaining: phase.duration_secs - remainder,
            };
        }
        remainder -= phase.duration_secs;
    }
    PhasePosition {
        phase_index: 0,
        phase_remaining: technique.phase_duration(0),
    }
}

/// Phase position for an absolute elapsed time within a session.
pub fn phase_at(technique: &Technique, elapsed: u32) -> PhasePosition {
    compute_phase(technique, elapsed % technique.cycle_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, TechniqueSpec};
    use proptest::prelude::*;

    fn technique(durations: &[u32]) -> Technique {
        Technique::try_from(TechniqueSpec {
            id: "t".into(),
            name: "T".into(),
            description: String::new(),
            benefits: vec![],
            difficulty: Default::default(),
            phases: (0..durations.len()).map(|i| format!("P{i}")).collect(),
            durations: durations.to_vec(),
        })
        .unwrap()
    }

    #[test]
    fn start_of_cycle_is_phase_zero_full() {
        let t = technique(&[4, 7, 8]);
        assert_eq!(
            compute_phase(&t, 0),
            PhasePosition {
                phase_index: 0,
                phase_remaining: 4
            }
        );
    }

    #[test]
    fn boundaries_between_phases() {
        let t = technique(&[4, 7, 8]);
        assert_eq!(compute_phase(&t, 3).phase_index, 0);
        assert_eq!(compute_phase(&t, 3).phase_remaining, 1);
        assert_eq!(compute_phase(&t, 4).phase_index, 1);
        assert_eq!(compute_phase(&t, 4).phase_remaining, 7);
        assert_eq!(compute_phase(&t, 11).phase_index, 2);
        assert_eq!(compute_phase(&t, 18).phase_remaining, 1);
    }

    #[test]
    fn full_cycle_wraps_to_phase_zero() {
        let t = technique(&[4, 4, 4, 4]);
        assert_eq!(
            compute_phase(&t, 16),
            PhasePosition {
                phase_index: 0,
                phase_remaining: 4
            }
        );
        assert_eq!(compute_phase(&t, 500).phase_index, 0);
    }

    #[test]
    fn phase_at_reduces_modulo_cycle() {
        let t = Catalog::builtin().technique("diaphragmatic").unwrap().clone();
        assert_eq!(phase_at(&t, 25), compute_phase(&t, 5));
        assert_eq!(phase_at(&t, 30).phase_index, 0);
    }

    proptest! {
        #[test]
        fn scheduler_is_total(
            durations in prop::collection::vec(1u32..30, 2..8),
            seed in 0u32..10_000,
        ) {
            let t = technique(&durations);
            let e = seed % t.cycle_secs();
            let pos = compute_phase(&t, e);
            prop_assert!(pos.phase_index < t.phase_count());
            prop_assert!(pos.phase_remaining >= 1);
            prop_assert!(pos.phase_remaining <= t.phase_duration(pos.phase_index));
        }
    }
}
