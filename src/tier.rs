use crate::models::{KpiDefinition, Tier};

/// Single source of truth for turning a KPI value into a tier.
pub fn classify(value: f64, definition: &KpiDefinition) -> Tier {
    if !definition.active {
        return Tier::Inactive;
    }

    let thresholds = &definition.thresholds;
    if thresholds.inverse {
        if value <= thresholds.regular {
            Tier::Good
        } else if value <= thresholds.critical {
            Tier::Warning
        } else {
            Tier::Critical
        }
    } else if value >= thresholds.regular {
        Tier::Good
    } else if value >= thresholds.critical {
        Tier::Warning
    } else {
        Tier::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KpiType, Thresholds};
    use proptest::prelude::*;

    fn csat() -> KpiDefinition {
        KpiDefinition {
            name: "CSAT".to_string(),
            kpi_type: KpiType::Percentage,
            description: String::new(),
            active: true,
            thresholds: Thresholds {
                regular: 95.0,
                critical: 85.0,
                inverse: false,
            },
        }
    }

    fn aht() -> KpiDefinition {
        KpiDefinition {
            name: "AHT".to_string(),
            kpi_type: KpiType::TimeSeconds,
            description: String::new(),
            active: true,
            thresholds: Thresholds {
                regular: 180.0,
                critical: 300.0,
                inverse: true,
            },
        }
    }

    #[test]
    fn higher_is_better_tiers() {
        let definition = csat();
        assert_eq!(classify(96.0, &definition), Tier::Good);
        assert_eq!(classify(90.0, &definition), Tier::Warning);
        assert_eq!(classify(80.0, &definition), Tier::Critical);
    }

    #[test]
    fn boundaries_fall_into_better_tier() {
        let definition = csat();
        assert_eq!(classify(95.0, &definition), Tier::Good);
        assert_eq!(classify(85.0, &definition), Tier::Warning);

        let definition = aht();
        assert_eq!(classify(180.0, &definition), Tier::Good);
        assert_eq!(classify(300.0, &definition), Tier::Warning);
    }

    #[test]
    fn lower_is_better_tiers() {
        let definition = aht();
        assert_eq!(classify(170.0, &definition), Tier::Good);
        assert_eq!(classify(250.0, &definition), Tier::Warning);
        assert_eq!(classify(310.0, &definition), Tier::Critical);
    }

    proptest! {
        #[test]
        fn inactive_definitions_never_evaluate(
            value in proptest::num::f64::ANY,
            regular in -1000.0f64..1000.0,
            critical in -1000.0f64..1000.0,
            inverse in any::<bool>(),
        ) {
            let definition = KpiDefinition {
                active: false,
                thresholds: Thresholds { regular, critical, inverse },
                ..csat()
            };
            prop_assert_eq!(classify(value, &definition), Tier::Inactive);
        }

        #[test]
        fn active_definitions_never_yield_inactive(
            value in proptest::num::f64::ANY,
            regular in -1000.0f64..1000.0,
            critical in -1000.0f64..1000.0,
            inverse in any::<bool>(),
        ) {
            let definition = KpiDefinition {
                thresholds: Thresholds { regular, critical, inverse },
                ..csat()
            };
            let tier = classify(value, &definition);
            prop_assert_ne!(tier, Tier::Inactive);
            prop_assert_eq!(tier, classify(value, &definition));
        }
    }
}
