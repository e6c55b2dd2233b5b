use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::access::AccessPolicy;
use crate::aggregate;
use crate::models::{KpiDefinition, Notification, Operator, Role, User};
use crate::tier;

pub struct DashboardInput<'a> {
    pub user: &'a User,
    pub policy: &'a AccessPolicy,
    pub operators: &'a [Operator],
    pub definitions: &'a [KpiDefinition],
    pub notifications: &'a [Notification],
    pub generated_at: DateTime<Utc>,
}

fn cell(operator: &Operator, definition: &KpiDefinition) -> String {
    match operator.kpi_value(&definition.name) {
        Some(value) => format!(
            "{} ({})",
            definition.kpi_type.format_value(value),
            tier::classify(value, definition)
        ),
        None => "-".to_string(),
    }
}

pub fn build_dashboard(input: &DashboardInput<'_>) -> String {
    let visible = input.policy.visible_operators(input.operators);
    let active: Vec<&KpiDefinition> = input.definitions.iter().filter(|d| d.active).collect();

    let mut output = String::new();

    let _ = writeln!(output, "# KPI Dashboard");
    let _ = writeln!(
        output,
        "Generated for {} ({}) at {}",
        input.user.name,
        input.user.role,
        input.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## KPI Averages");

    let averages = aggregate::kpi_averages(&visible, input.definitions);
    if visible.is_empty() || averages.is_empty() {
        let _ = writeln!(output, "No operators in scope.");
    } else {
        for average in averages.iter() {
            match (average.average, average.tier) {
                (Some(value), Some(tier)) => {
                    let _ = writeln!(
                        output,
                        "- {}: {} ({})",
                        average.name,
                        average.kpi_type.format_value(value),
                        tier
                    );
                }
                _ => {
                    let _ = writeln!(output, "- {}: no data", average.name);
                }
            }
        }
    }

    if input.user.role != Role::Supervisor {
        let teams = input.policy.visible_teams(input.operators);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Teams");

        if teams.is_empty() {
            let _ = writeln!(output, "No teams in scope.");
        } else {
            for team in teams.iter() {
                let figures: Vec<String> = aggregate::kpi_averages(&team.operators, input.definitions)
                    .iter()
                    .map(|average| match (average.average, average.tier) {
                        (Some(value), Some(tier)) => format!(
                            "{} {} ({})",
                            average.name,
                            average.kpi_type.format_value(value),
                            tier
                        ),
                        _ => format!("{} -", average.name),
                    })
                    .collect();
                let _ = writeln!(
                    output,
                    "- {} (supervisor {}, {} members): {}",
                    team.team.name,
                    team.team.supervisor_name,
                    team.team.member_count,
                    figures.join(", ")
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Operators");

    if visible.is_empty() {
        let _ = writeln!(output, "No operators in scope.");
    } else {
        let header: Vec<&str> = active.iter().map(|definition| definition.name.as_str()).collect();
        let _ = writeln!(output, "| Operator | Team | {} |", header.join(" | "));
        let _ = writeln!(output, "|---|---|{}", "---|".repeat(active.len()));
        for operator in visible.iter() {
            let cells: Vec<String> = active.iter().map(|definition| cell(operator, definition)).collect();
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                operator.name,
                operator.team_name,
                cells.join(" | ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");

    if input.notifications.is_empty() {
        let _ = writeln!(output, "No alerts.");
    } else {
        for notification in input.notifications.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                notification.timestamp.format("%Y-%m-%d %H:%M"),
                notification.title,
                notification.message
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessConfig, AlertConfig};
    use crate::notifications::notifications_for;
    use crate::store::{seed, KpiDefinitionStore, OperatorStore, UserStore};

    fn render(user_id: u32) -> String {
        let store = seed();
        let user = store.get_user(user_id).unwrap();
        let policy = AccessPolicy::for_user(&user, &AccessConfig::default());
        let operators = store.list_operators();
        let definitions = store.list_definitions();
        let now = Utc::now();
        let notifications = notifications_for(&policy, &operators, &definitions, &AlertConfig::default(), now);

        build_dashboard(&DashboardInput {
            user: &user,
            policy: &policy,
            operators: &operators,
            definitions: &definitions,
            notifications: &notifications,
            generated_at: now,
        })
    }

    #[test]
    fn supervisor_dashboard_shows_own_team_only() {
        let report = render(3);
        assert!(report.contains("Generated for Walter Supervisor (Supervisor)"));
        assert!(report.contains("| John Silva | Team Walter | 98.0% (Good)"));
        assert!(!report.contains("Beatrice Costa"));
        assert!(!report.contains("## Teams"));
        assert!(report.contains("CSAT of Maria Oliveira is below the critical target."));
    }

    #[test]
    fn coordinator_dashboard_lists_teams() {
        let report = render(2);
        assert!(report.contains("## Teams"));
        assert!(report.contains("- Team Walter (supervisor Walter Supervisor, 3 members): CSAT 91.0% (Warning)"));
        assert!(report.contains("AHT 3:50 (Warning)"));
        assert!(report.contains("- CSAT: 91.4% (Warning)"));
        assert!(report.contains("No alerts."));
    }

    #[test]
    fn inactive_kpis_are_not_columns() {
        let report = render(1);
        assert!(report.contains("| Operator | Team | CSAT | FCR | Callback 24h | AHT |"));
        assert!(!report.contains("Abs"));
    }
}
