use anyhow::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::AccessConfig;
use crate::error::ImportError;
use crate::models::{ImportSummary, Kpi, KpiDefinition, Operator, User};
use crate::store::Store;

const FIXED_COLUMNS: [&str; 3] = ["id", "name", "email"];

#[derive(Debug, Clone, PartialEq)]
struct ImportRow {
    id: Option<u32>,
    name: Option<String>,
    email: Option<String>,
    kpis: Vec<Kpi>,
}

/// Merges `csv_text` into the operator store on behalf of `actor`.
///
/// The whole file is parsed before the store is touched. A file that cannot
/// be parsed counts every data row as ignored and reports the failure.
pub fn reconcile<S: Store>(
    store: &mut S,
    actor: &User,
    access: &AccessConfig,
    csv_text: &str,
) -> ImportSummary {
    let batch_id = Uuid::new_v4();
    let mut summary = ImportSummary {
        batch_id,
        updated: 0,
        created: 0,
        ignored: 0,
        failure: None,
    };

    let rows = match parse_rows(csv_text, &store.active_definitions()) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%batch_id, user_id = actor.id, error = %err, "import rejected");
            summary.ignored = data_row_count(csv_text);
            summary.failure = Some(err.to_string());
            return summary;
        }
    };

    let policy = AccessPolicy::for_user(actor, access);
    let manageable = policy.manageable_ids(&store.list_operators());

    for row in rows {
        match row.id.and_then(|id| store.get_operator(id)) {
            Some(mut operator) => {
                if !manageable.contains(&operator.id) {
                    debug!(%batch_id, operator_id = operator.id, "row outside actor scope");
                    summary.ignored += 1;
                    continue;
                }
                merge_kpis(&mut operator.kpis, row.kpis);
                store.upsert_operator(operator);
                summary.updated += 1;
            }
            None => match new_operator(store, actor, &policy, access, row) {
                Some(operator) => {
                    debug!(%batch_id, operator_id = operator.id, "operator created");
                    store.upsert_operator(operator);
                    summary.created += 1;
                }
                None => summary.ignored += 1,
            },
        }
    }

    info!(
        %batch_id,
        user_id = actor.id,
        updated = summary.updated,
        created = summary.created,
        ignored = summary.ignored,
        "import reconciled"
    );
    summary
}

fn merge_kpis(existing: &mut Vec<Kpi>, incoming: Vec<Kpi>) {
    for kpi in incoming {
        match existing.iter_mut().find(|current| current.name == kpi.name) {
            Some(current) => current.value = kpi.value,
            None => existing.push(kpi),
        }
    }
}

fn new_operator<S: Store>(
    store: &S,
    actor: &User,
    policy: &AccessPolicy,
    access: &AccessConfig,
    row: ImportRow,
) -> Option<Operator> {
    if !policy.can_create_operators() {
        return None;
    }
    let (Some(name), Some(email)) = (row.name, row.email) else {
        return None;
    };

    let operators = store.list_operators();
    if operators
        .iter()
        .any(|operator| operator.email.to_lowercase() == email.to_lowercase())
    {
        debug!(email = %email, "duplicate operator email");
        return None;
    }

    let supervisor = store.get_user(actor.id)?;
    let team_id = supervisor.team_id?;
    let (coordinator_id, team_name) = operators
        .iter()
        .find(|operator| operator.team_id == team_id)
        .map(|member| (member.coordinator_id, member.team_name.clone()))
        .unwrap_or_else(|| {
            (
                access.default_coordinator_id,
                format!("Team {}", supervisor.name),
            )
        });

    let id = operators.iter().map(|operator| operator.id).max().unwrap_or(0) + 1;

    Some(Operator {
        id,
        name,
        email,
        team_id,
        team_name,
        supervisor_id: supervisor.id,
        supervisor_name: supervisor.name,
        coordinator_id,
        kpis: row.kpis,
    })
}

fn parse_rows(csv_text: &str, active: &[KpiDefinition]) -> Result<Vec<ImportRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut records = reader
        .records()
        .filter(|record| record.as_ref().map_or(true, |record| !is_blank(record)));

    let header = records
        .next()
        .ok_or(ImportError::MissingHeader)?
        .map_err(|err| ImportError::Codec(err.to_string()))?;

    let fixed_ok = header.len() >= FIXED_COLUMNS.len()
        && FIXED_COLUMNS
            .iter()
            .zip(header.iter())
            .all(|(expected, found)| found.eq_ignore_ascii_case(expected));
    if !fixed_ok {
        return Err(ImportError::InvalidHeader(
            header.iter().collect::<Vec<_>>().join(","),
        ));
    }

    // Unknown or inactive columns resolve to None and are skipped per cell.
    let columns: Vec<Option<&KpiDefinition>> = header
        .iter()
        .skip(FIXED_COLUMNS.len())
        .map(|name| active.iter().find(|definition| definition.name == name))
        .collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|err| ImportError::Codec(err.to_string()))?;
        let text = |index: usize| {
            record
                .get(index)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let kpis = columns
            .iter()
            .enumerate()
            .filter_map(|(offset, definition)| {
                let definition = (*definition)?;
                let value: f64 = record.get(offset + FIXED_COLUMNS.len())?.parse().ok()?;
                value.is_finite().then(|| Kpi {
                    name: definition.name.clone(),
                    kpi_type: definition.kpi_type,
                    value,
                })
            })
            .collect();

        rows.push(ImportRow {
            id: record.get(0).and_then(|value| value.parse().ok()),
            name: text(1),
            email: text(2),
            kpis,
        });
    }

    Ok(rows)
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn data_row_count(csv_text: &str) -> usize {
    csv_text
        .trim()
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count()
}

/// CSV of the operators `policy` can see, one column per active KPI.
pub fn template_for(
    policy: &AccessPolicy,
    operators: &[Operator],
    definitions: &[KpiDefinition],
) -> anyhow::Result<String> {
    let active: Vec<&KpiDefinition> = definitions.iter().filter(|d| d.active).collect();
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let header = FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(active.iter().map(|definition| definition.name.clone()));
    writer.write_record(header).context("failed to write header")?;

    for operator in policy.visible_operators(operators) {
        let fields = [operator.id.to_string(), operator.name.clone(), operator.email.clone()]
            .into_iter()
            .chain(active.iter().map(|definition| {
                operator
                    .kpi_value(&definition.name)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
        writer
            .write_record(fields)
            .with_context(|| format!("failed to write operator {}", operator.id))?;
    }

    let bytes = writer.into_inner().context("failed to flush template")?;
    String::from_utf8(bytes).context("template is not valid UTF-8")
}
