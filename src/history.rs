//! Only the current period is real; earlier periods are synthesized until
//! another [`HistoryProvider`] serves stored history.

use uuid::Uuid;

use crate::aggregate;
use crate::config::HistoryConfig;
use crate::models::{HistorySeries, KpiDefinition, KpiHistory, Operator};

pub trait HistoryProvider {
    fn build_history(&mut self, operators: &[Operator], definitions: &[KpiDefinition]) -> KpiHistory;
}

/// Uniform samples in `[0, 1)`.
pub trait NoiseSource {
    fn next_unit(&mut self) -> f64;
}

/// SplitMix64 generator.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    state: u64,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_entropy() -> Self {
        Self::new(Uuid::new_v4().as_u128() as u64)
    }
}

impl NoiseSource for SeededNoise {
    fn next_unit(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }
}

pub struct SyntheticHistory<N> {
    config: HistoryConfig,
    noise: N,
}

impl<N: NoiseSource> SyntheticHistory<N> {
    pub fn new(config: HistoryConfig, noise: N) -> Self {
        Self { config, noise }
    }
}

impl<N: NoiseSource> HistoryProvider for SyntheticHistory<N> {
    fn build_history(&mut self, operators: &[Operator], definitions: &[KpiDefinition]) -> KpiHistory {
        let Self { config, noise } = self;
        let periods = config.labels.len();
        let series = definitions
            .iter()
            .filter(|definition| definition.active)
            .enumerate()
            .map(|(index, definition)| {
                // Groups with no data chart the midpoint between the targets.
                let current = aggregate::average(operators, &definition.name).unwrap_or(
                    (definition.thresholds.regular + definition.thresholds.critical) / 2.0,
                );

                let values = (0..periods)
                    .map(|period| {
                        let distance = periods - 1 - period;
                        if distance == 0 {
                            return current;
                        }
                        let factor = (noise.next_unit() - 0.5) * 2.0 * config.max_step_variation;
                        definition
                            .kpi_type
                            .clamp(current * (1.0 + factor * distance as f64))
                    })
                    .collect();

                HistorySeries {
                    kpi_name: definition.name.clone(),
                    kpi_type: definition.kpi_type,
                    color: config
                        .colors
                        .get(index % config.colors.len().max(1))
                        .cloned()
                        .unwrap_or_default(),
                    values,
                }
            })
            .collect();

        KpiHistory {
            labels: config.labels.clone(),
            series,
        }
    }
}
