use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::error::RegistryError;
use crate::models::{FeedbackAppointment, KpiDefinition, Operator, Tier, User};
use crate::store::OperatorStore;
use crate::tier;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackLine {
    pub kpi_name: String,
    pub formatted: String,
    pub tier: Tier,
}

/// Active KPIs of an operator, formatted and tiered for a feedback sheet.
pub fn feedback_summary(operator: &Operator, definitions: &[KpiDefinition]) -> Vec<FeedbackLine> {
    operator
        .kpis
        .iter()
        .filter_map(|kpi| {
            let definition = definitions
                .iter()
                .find(|definition| definition.name == kpi.name && definition.active)?;
            Some(FeedbackLine {
                kpi_name: kpi.name.clone(),
                formatted: definition.kpi_type.format_value(kpi.value),
                tier: tier::classify(kpi.value, definition),
            })
        })
        .collect()
}

/// Free-text sections of a feedback session. Blank sections render a
/// placeholder line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackNotes {
    pub positive: String,
    pub improvement: String,
    pub action_plan: String,
}

fn write_section(output: &mut String, title: &str, body: &str, empty: &str) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    let body = body.trim();
    if body.is_empty() {
        let _ = writeln!(output, "{empty}");
    } else {
        for line in body.lines() {
            let _ = writeln!(output, "{}", line.trim_end());
        }
    }
}

/// Printable markdown record of a feedback session, signed by both parties.
pub fn build_feedback_report(
    manager: &User,
    operator: &Operator,
    definitions: &[KpiDefinition],
    notes: &FeedbackNotes,
    date: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Feedback Report");
    let _ = writeln!(output, "Date: {}", date.format("%Y-%m-%d"));
    let _ = writeln!(output, "Manager: {}", manager.name);
    let _ = writeln!(output, "Operator: {}", operator.name);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Performance");

    let lines = feedback_summary(operator, definitions);
    if lines.is_empty() {
        let _ = writeln!(output, "No active KPIs recorded.");
    } else {
        for line in lines.iter() {
            let _ = writeln!(output, "- {}: {} ({})", line.kpi_name, line.formatted, line.tier);
        }
    }

    write_section(
        &mut output,
        "Positive Points",
        &notes.positive,
        "No positive points highlighted.",
    );
    write_section(
        &mut output,
        "Points to Develop",
        &notes.improvement,
        "No development points highlighted.",
    );
    write_section(
        &mut output,
        "Action Plan",
        &notes.action_plan,
        "No action plan defined.",
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Signatures");
    let _ = writeln!(output, "________________________  ________________________");
    let _ = writeln!(output, "{} ({})", manager.name, manager.role);
    let _ = writeln!(output, "{} (Operator)", operator.name);

    output
}

/// Validates the operator and returns the appointment. Appointments are
/// logged only; nothing is stored.
pub fn schedule_feedback<S: OperatorStore>(
    store: &S,
    operator_id: u32,
    scheduled_for: NaiveDateTime,
    notes: &str,
) -> Result<FeedbackAppointment, RegistryError> {
    let operator = store
        .get_operator(operator_id)
        .ok_or(RegistryError::OperatorNotFound(operator_id))?;

    info!(operator_id, %scheduled_for, "feedback scheduled");
    Ok(FeedbackAppointment {
        operator_id,
        operator_name: operator.name,
        scheduled_for,
        notes: notes.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{seed, KpiDefinitionStore, UserStore};
    use chrono::NaiveDate;

    #[test]
    fn summary_skips_inactive_kpis() {
        let store = seed();
        let maria = store.get_operator(1002).unwrap();
        let lines = feedback_summary(&maria, &store.list_definitions());

        let names: Vec<&str> = lines.iter().map(|line| line.kpi_name.as_str()).collect();
        assert_eq!(names, vec!["CSAT", "FCR", "Callback 24h", "AHT"]);
        assert_eq!(lines[0].formatted, "84.0%");
        assert_eq!(lines[0].tier, Tier::Critical);
        assert_eq!(lines[3].formatted, "5:10");
        assert_eq!(lines[3].tier, Tier::Critical);
    }

    #[test]
    fn scheduling_requires_known_operator() {
        let store = seed();
        let at = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();

        let appointment = schedule_feedback(&store, 1003, at, "Review callbacks").unwrap();
        assert_eq!(appointment.operator_name, "Peter Souza");
        assert_eq!(appointment.scheduled_for, at);

        assert_eq!(
            schedule_feedback(&store, 4242, at, ""),
            Err(RegistryError::OperatorNotFound(4242))
        );
    }

    fn session_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn report_falls_back_on_blank_sections() {
        let store = seed();
        let walter = store.get_user(3).unwrap();
        let maria = store.get_operator(1002).unwrap();
        let notes = FeedbackNotes {
            positive: "   ".to_string(),
            ..FeedbackNotes::default()
        };

        let report = build_feedback_report(&walter, &maria, &store.list_definitions(), &notes, session_date());
        assert!(report.contains("Date: 2026-03-02"));
        assert!(report.contains("Manager: Walter Supervisor"));
        assert!(report.contains("Operator: Maria Oliveira"));
        assert!(report.contains("No positive points highlighted."));
        assert!(report.contains("No development points highlighted."));
        assert!(report.contains("No action plan defined."));
        assert!(report.contains("Walter Supervisor (Supervisor)"));
        assert!(report.contains("Maria Oliveira (Operator)"));
    }

    #[test]
    fn report_lists_active_kpis_and_notes() {
        let store = seed();
        let walter = store.get_user(3).unwrap();
        let maria = store.get_operator(1002).unwrap();
        let notes = FeedbackNotes {
            positive: "Friendly tone".to_string(),
            improvement: "Callbacks\nHandle time".to_string(),
            action_plan: "Shadow John for a week".to_string(),
        };

        let report = build_feedback_report(&walter, &maria, &store.list_definitions(), &notes, session_date());
        assert!(report.contains("- CSAT: 84.0% (Critical)"));
        assert!(report.contains("- AHT: 5:10 (Critical)"));
        assert!(!report.contains("Abs"));
        assert!(report.contains("## Points to Develop\nCallbacks\nHandle time\n"));
        assert!(report.contains("Shadow John for a week"));
        assert!(!report.contains("No action plan defined."));
    }
}
