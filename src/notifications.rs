use chrono::{DateTime, Duration, Utc};

use crate::access::AccessPolicy;
use crate::aggregate;
use crate::config::AlertConfig;
use crate::models::{KpiDefinition, Notification, Operator, Role, Tier};
use crate::tier;

pub fn notifications_for(
    policy: &AccessPolicy,
    operators: &[Operator],
    definitions: &[KpiDefinition],
    alerts: &AlertConfig,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let Some(definition) = definitions
        .iter()
        .find(|definition| definition.name == alerts.kpi && definition.active)
    else {
        return Vec::new();
    };
    let thresholds = definition.thresholds;
    let direction = if thresholds.inverse { "above" } else { "below" };

    let mut notifications = Vec::new();
    let mut next_id = 1u32;
    let mut push = |title: &str, message: String, read: bool, timestamp: DateTime<Utc>| {
        notifications.push(Notification {
            id: next_id,
            user_id: policy.user_id,
            title: title.to_string(),
            message,
            read,
            timestamp,
        });
        next_id += 1;
    };

    match policy.role {
        Role::Supervisor => {
            for operator in policy.visible_operators(operators) {
                if let Some(value) = operator.kpi_value(&definition.name) {
                    if tier::classify(value, definition) == Tier::Critical {
                        push(
                            "Performance alert",
                            format!(
                                "{} of {} is {direction} the critical target.",
                                definition.name, operator.name
                            ),
                            false,
                            now,
                        );
                    }
                }
            }
        }
        Role::Coordinator => {
            for team in policy.visible_teams(operators) {
                let Some(average) = aggregate::average(&team.operators, &definition.name) else {
                    continue;
                };
                // The margin widens the alert band toward the good side.
                let near_critical = if thresholds.inverse {
                    average > thresholds.critical - alerts.coordinator_margin
                } else {
                    average < thresholds.critical + alerts.coordinator_margin
                };
                if near_critical {
                    push(
                        "Team alert",
                        format!(
                            "Average {} of {} is {}, {direction} expectations.",
                            definition.name,
                            team.team.name,
                            definition.kpi_type.format_value(average)
                        ),
                        true,
                        now - Duration::hours(1),
                    );
                }
            }
        }
        Role::Administrator => {}
    }

    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessConfig;
    use crate::store::{seed, KpiDefinitionStore, OperatorStore, UserStore};

    fn feed(user_id: u32, access: &AccessConfig) -> Vec<Notification> {
        let store = seed();
        let policy = AccessPolicy::for_user(&store.get_user(user_id).unwrap(), access);
        notifications_for(
            &policy,
            &store.list_operators(),
            &store.list_definitions(),
            &AlertConfig::default(),
            Utc::now(),
        )
    }

    #[test]
    fn supervisor_gets_one_entry_per_critical_operator() {
        let notifications = feed(3, &AccessConfig::default());
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("Maria Oliveira"));
        assert!(!notifications[0].read);
        assert_eq!(notifications[0].user_id, 3);

        assert!(feed(4, &AccessConfig::default()).is_empty());
    }

    #[test]
    fn coordinator_gets_team_entries_below_margin() {
        // Team Walter averages 91.0 and Team Carlos 92.0, both above 85 + 5.
        let notifications = feed(2, &AccessConfig::default());
        assert!(notifications.is_empty());

        let strict = AlertConfig {
            coordinator_margin: 6.5,
            ..AlertConfig::default()
        };
        let store = seed();
        let policy = AccessPolicy::for_user(&store.get_user(2).unwrap(), &AccessConfig::default());
        let notifications = notifications_for(
            &policy,
            &store.list_operators(),
            &store.list_definitions(),
            &strict,
            Utc::now(),
        );
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("Team Walter"));
        assert!(notifications[0].read);
    }

    #[test]
    fn team_entries_are_dated_an_hour_back() {
        let store = seed();
        let now = Utc::now();
        let policy = AccessPolicy::for_user(&store.get_user(2).unwrap(), &AccessConfig::default());
        let alerts = AlertConfig {
            coordinator_margin: 20.0,
            ..AlertConfig::default()
        };
        let notifications = notifications_for(
            &policy,
            &store.list_operators(),
            &store.list_definitions(),
            &alerts,
            now,
        );

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].id, 1);
        assert_eq!(notifications[1].id, 2);
        assert!(notifications
            .iter()
            .all(|notification| notification.timestamp == now - Duration::hours(1)));
        assert!(notifications
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    fn feed_for(user_id: u32, alerts: &AlertConfig) -> Vec<Notification> {
        let store = seed();
        let policy = AccessPolicy::for_user(&store.get_user(user_id).unwrap(), &AccessConfig::default());
        notifications_for(
            &policy,
            &store.list_operators(),
            &store.list_definitions(),
            alerts,
            Utc::now(),
        )
    }

    #[test]
    fn lower_is_better_alert_kpi_flags_only_critical_operators() {
        let alerts = AlertConfig {
            kpi: "AHT".to_string(),
            ..AlertConfig::default()
        };
        // Team Walter: John 170s, Maria 310s, Peter 210s against critical 300s.
        let notifications = feed_for(3, &alerts);
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].message,
            "AHT of Maria Oliveira is above the critical target."
        );
    }

    #[test]
    fn lower_is_better_team_margin_points_upward() {
        // Team Walter averages 230s, Team Carlos 205s.
        let alerts = AlertConfig {
            kpi: "AHT".to_string(),
            coordinator_margin: 80.0,
        };
        let notifications = feed_for(2, &alerts);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("Team Walter"));
        assert!(notifications[0].message.contains("3:50, above expectations"));

        let alerts = AlertConfig {
            kpi: "AHT".to_string(),
            coordinator_margin: 5.0,
        };
        assert!(feed_for(2, &alerts).is_empty());
    }

    #[test]
    fn administrators_and_missing_kpi_yield_nothing() {
        assert!(feed(1, &AccessConfig::default()).is_empty());

        let store = seed();
        let policy = AccessPolicy::for_user(&store.get_user(3).unwrap(), &AccessConfig::default());
        let alerts = AlertConfig {
            kpi: "NPS".to_string(),
            ..AlertConfig::default()
        };
        assert!(notifications_for(
            &policy,
            &store.list_operators(),
            &store.list_definitions(),
            &alerts,
            Utc::now()
        )
        .is_empty());
    }
}
