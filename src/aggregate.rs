use crate::models::{KpiAverage, KpiDefinition, Operator};
use crate::tier;

/// Mean of the operators' values for `kpi_name`.
///
/// Operators without that KPI are skipped. Returns `None` when no operator
/// carries a value, so callers never see a NaN.
pub fn average(operators: &[Operator], kpi_name: &str) -> Option<f64> {
    let values: Vec<f64> = operators
        .iter()
        .filter_map(|operator| operator.kpi_value(kpi_name))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Average and tier per active definition, in definition order.
pub fn kpi_averages(operators: &[Operator], definitions: &[KpiDefinition]) -> Vec<KpiAverage> {
    definitions
        .iter()
        .filter(|definition| definition.active)
        .map(|definition| {
            let average = average(operators, &definition.name);
            KpiAverage {
                name: definition.name.clone(),
                kpi_type: definition.kpi_type,
                average,
                tier: average.map(|value| tier::classify(value, definition)),
            }
        })
        .collect()
}
