use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kpi_dashboard::access::{all_teams, AccessPolicy};
use kpi_dashboard::auth;
use kpi_dashboard::config::{Config, DEFAULT_CONFIG_FILE};
use kpi_dashboard::error::RegistryError;
use kpi_dashboard::feedback;
use kpi_dashboard::history::{HistoryProvider, SeededNoise, SyntheticHistory};
use kpi_dashboard::import;
use kpi_dashboard::models::{KpiDefinition, KpiType, Role, Thresholds, User};
use kpi_dashboard::notifications::notifications_for;
use kpi_dashboard::registry::{self, Invitation};
use kpi_dashboard::report::{self, DashboardInput};
use kpi_dashboard::setup::{self, NewMember, SetupPlan};
use kpi_dashboard::store::{InMemoryStore, KpiDefinitionStore, OperatorStore, UserStore};

#[derive(Parser)]
#[command(name = "kpi-dashboard")]
#[command(about = "Role-based KPI tracking for call-center teams", long_about = None)]
struct Cli {
    /// Config file (defaults to .kpi-dashboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON snapshot carrying state between runs
    #[arg(long, global = true, env = "KPI_DASHBOARD_STATE")]
    state: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Login {
    #[arg(long)]
    email: String,
    #[arg(long, env = "KPI_DASHBOARD_PASSWORD")]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    InitConfig,
    /// Write the demo organization to the state snapshot
    Seed,
    /// Check credentials
    Login(Login),
    /// Render the markdown dashboard for a user
    Dashboard {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the import template for a user's operators
    Template {
        #[command(flatten)]
        login: Login,
        #[arg(long, default_value = "template.csv")]
        out: PathBuf,
    },
    /// Import operator KPI values from a CSV file
    Import {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the alert feed for a user
    Notifications {
        #[command(flatten)]
        login: Login,
    },
    /// Print the KPI evolution series
    History {
        #[command(flatten)]
        login: Login,
        /// Fixed noise seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a feedback report for an operator and optionally schedule a session
    Feedback {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        operator: u32,
        /// e.g. 2026-03-02T14:30:00
        #[arg(long)]
        at: Option<NaiveDateTime>,
        #[arg(long, default_value = "")]
        notes: String,
        /// Strengths to acknowledge
        #[arg(long, default_value = "")]
        positive: String,
        /// Points to develop
        #[arg(long, default_value = "")]
        improve: String,
        /// Agreed action plan
        #[arg(long, default_value = "")]
        plan: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Manage KPI definitions
    Kpi {
        #[command(flatten)]
        login: Login,
        #[command(subcommand)]
        action: KpiAction,
    },
    /// Manage users
    User {
        #[command(flatten)]
        login: Login,
        #[command(subcommand)]
        action: UserAction,
    },
    /// Replace the demo roster with a real organization
    Setup {
        #[command(flatten)]
        login: Login,
        /// "Name:email", repeatable
        #[arg(long = "coordinator")]
        coordinators: Vec<String>,
        /// "Name:email", repeatable
        #[arg(long = "supervisor")]
        supervisors: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KpiKind {
    Percentage,
    Number,
    Time,
}

impl From<KpiKind> for KpiType {
    fn from(kind: KpiKind) -> Self {
        match kind {
            KpiKind::Percentage => KpiType::Percentage,
            KpiKind::Number => KpiType::Number,
            KpiKind::Time => KpiType::TimeSeconds,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Administrator,
    Coordinator,
    Supervisor,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Administrator => Role::Administrator,
            RoleArg::Coordinator => Role::Coordinator,
            RoleArg::Supervisor => Role::Supervisor,
        }
    }
}

#[derive(Args)]
struct KpiFields {
    #[arg(long)]
    name: String,
    #[arg(long, value_enum, default_value_t = KpiKind::Percentage)]
    kind: KpiKind,
    #[arg(long)]
    regular: f64,
    #[arg(long)]
    critical: f64,
    /// Lower values are better
    #[arg(long)]
    inverse: bool,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    inactive: bool,
}

impl From<KpiFields> for KpiDefinition {
    fn from(fields: KpiFields) -> Self {
        KpiDefinition {
            name: fields.name,
            kpi_type: fields.kind.into(),
            description: fields.description,
            active: !fields.inactive,
            thresholds: Thresholds {
                regular: fields.regular,
                critical: fields.critical,
                inverse: fields.inverse,
            },
        }
    }
}

#[derive(Subcommand)]
enum KpiAction {
    List,
    Add(KpiFields),
    Update(KpiFields),
    Toggle {
        #[arg(long)]
        name: String,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    List,
    Invite {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
    Update {
        #[arg(long)]
        id: u32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    Delete {
        #[arg(long)]
        id: u32,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn sign_in(store: &InMemoryStore, config: &Config, login: &Login) -> anyhow::Result<User> {
    auth::authenticate(store, &config.auth, &login.email, &login.password)
        .with_context(|| format!("login failed for {}", login.email))
}

fn require_admin(policy: &AccessPolicy) -> anyhow::Result<()> {
    if !policy.can_manage_registry() {
        bail!("only administrators can change the registry");
    }
    Ok(())
}

/// Validation rejections are reported, not fatal.
fn report_outcome(result: Result<(), RegistryError>, done: &str) -> bool {
    match result {
        Ok(()) => {
            println!("{done}");
            true
        }
        Err(err) => {
            println!("Warning: {err}");
            false
        }
    }
}

fn parse_member(raw: &str) -> anyhow::Result<NewMember> {
    let (name, email) = raw
        .split_once(':')
        .with_context(|| format!("expected \"Name:email\", got \"{raw}\""))?;
    Ok(NewMember {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
    })
}

fn save(store: &InMemoryStore, state: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = state {
        store.save_snapshot(path)?;
        debug!(path = %path.display(), "snapshot saved");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    init_logging(cli.verbose || config.general.verbose);

    let state = cli.state.clone().or_else(|| config.general.state.clone());
    let mut store = InMemoryStore::open(state.as_deref())?;

    match cli.command {
        Commands::InitConfig => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, Config::default_toml()?)
                .with_context(|| format!("failed to write {DEFAULT_CONFIG_FILE}"))?;
            println!("Created {DEFAULT_CONFIG_FILE}.");
        }
        Commands::Seed => {
            let Some(path) = state.as_deref() else {
                bail!("--state is required to write seed data");
            };
            kpi_dashboard::store::seed().save_snapshot(path)?;
            println!("Seed data written to {}.", path.display());
        }
        Commands::Login(login) => {
            let user = sign_in(&store, &config, &login)?;
            println!("Signed in as {} ({}).", user.name, user.role);
            if setup::is_setup_needed(&store) && user.role == Role::Administrator {
                println!("Initial setup is pending; run `kpi-dashboard setup`.");
            }
        }
        Commands::Dashboard { login, out } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let operators = store.list_operators();
            let definitions = store.list_definitions();
            let now = Utc::now();
            let notifications = notifications_for(&policy, &operators, &definitions, &config.alerts, now);

            let dashboard = report::build_dashboard(&DashboardInput {
                user: &user,
                policy: &policy,
                operators: &operators,
                definitions: &definitions,
                notifications: &notifications,
                generated_at: now,
            });
            match out {
                Some(path) => {
                    std::fs::write(&path, dashboard)?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => print!("{dashboard}"),
            }
        }
        Commands::Template { login, out } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let template = import::template_for(&policy, &store.list_operators(), &store.list_definitions())?;
            std::fs::write(&out, template)?;
            println!("Template written to {}.", out.display());
        }
        Commands::Import { login, csv } => {
            let user = sign_in(&store, &config, &login)?;
            let text = std::fs::read_to_string(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let summary = import::reconcile(&mut store, &user, &config.access, &text);
            if let Some(failure) = &summary.failure {
                println!("Import failed: {failure}");
            }
            println!(
                "{} updated, {} created, {} ignored (batch {}).",
                summary.updated, summary.created, summary.ignored, summary.batch_id
            );
            save(&store, state.as_deref())?;
        }
        Commands::Notifications { login } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let notifications = notifications_for(
                &policy,
                &store.list_operators(),
                &store.list_definitions(),
                &config.alerts,
                Utc::now(),
            );
            if notifications.is_empty() {
                println!("No alerts.");
            }
            for notification in notifications {
                let marker = if notification.read { " " } else { "*" };
                println!(
                    "{marker} {} {}: {}",
                    notification.timestamp.format("%Y-%m-%d %H:%M"),
                    notification.title,
                    notification.message
                );
            }
        }
        Commands::History { login, seed } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let noise = seed.map(SeededNoise::new).unwrap_or_else(SeededNoise::from_entropy);
            let mut provider = SyntheticHistory::new(config.history.clone(), noise);
            let history = provider.build_history(
                &policy.visible_operators(&store.list_operators()),
                &store.list_definitions(),
            );

            println!("KPI | {}", history.labels.join(" | "));
            for series in history.series {
                let values: Vec<String> = series
                    .values
                    .iter()
                    .map(|value| series.kpi_type.format_value(*value))
                    .collect();
                println!("{} | {}", series.kpi_name, values.join(" | "));
            }
        }
        Commands::Feedback {
            login,
            operator,
            at,
            notes,
            positive,
            improve,
            plan,
            out,
        } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let Some(target) = store
                .get_operator(operator)
                .filter(|candidate| policy.can_view(candidate))
            else {
                println!("Warning: {}", RegistryError::OperatorNotFound(operator));
                return Ok(());
            };

            let sections = feedback::FeedbackNotes {
                positive,
                improvement: improve,
                action_plan: plan,
            };
            let sheet = feedback::build_feedback_report(
                &user,
                &target,
                &store.list_definitions(),
                &sections,
                Utc::now().date_naive(),
            );
            match out {
                Some(path) => {
                    std::fs::write(&path, sheet)?;
                    println!("Feedback report written to {}.", path.display());
                }
                None => print!("{sheet}"),
            }
            if let Some(at) = at {
                let appointment = feedback::schedule_feedback(&store, operator, at, &notes)?;
                println!(
                    "Feedback scheduled for {} on {}.",
                    appointment.operator_name, appointment.scheduled_for
                );
            }
        }
        Commands::Kpi { login, action } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let changed = match action {
                KpiAction::List => {
                    for definition in store.list_definitions() {
                        let t = definition.thresholds;
                        println!(
                            "- {} [{}] regular {} critical {}{}{}",
                            definition.name,
                            definition.kpi_type,
                            t.regular,
                            t.critical,
                            if t.inverse { " (inverse)" } else { "" },
                            if definition.active { "" } else { " inactive" }
                        );
                    }
                    false
                }
                KpiAction::Add(fields) => {
                    require_admin(&policy)?;
                    report_outcome(registry::add_kpi(&mut store, fields.into()), "KPI added.")
                }
                KpiAction::Update(fields) => {
                    require_admin(&policy)?;
                    report_outcome(registry::update_kpi(&mut store, fields.into()), "KPI updated.")
                }
                KpiAction::Toggle { name, active } => {
                    require_admin(&policy)?;
                    report_outcome(registry::set_kpi_active(&mut store, &name, active), "KPI updated.")
                }
            };
            if changed {
                save(&store, state.as_deref())?;
            }
        }
        Commands::User { login, action } => {
            let user = sign_in(&store, &config, &login)?;
            let policy = AccessPolicy::for_user(&user, &config.access);
            let changed = match action {
                UserAction::List => {
                    for visible in policy.visible_users(&store.list_users()) {
                        let team = visible
                            .team_id
                            .map(|id| format!(" team {id}"))
                            .unwrap_or_default();
                        println!(
                            "- {} {} <{}> {}{}",
                            visible.id, visible.name, visible.email, visible.role, team
                        );
                    }
                    if policy.can_manage_registry() {
                        for team in all_teams(&store) {
                            println!(
                                "  team {} {} ({} members, supervisor {})",
                                team.id, team.name, team.member_count, team.supervisor_name
                            );
                        }
                    }
                    false
                }
                UserAction::Invite { name, email, role } => {
                    require_admin(&policy)?;
                    let invitation = Invitation {
                        name,
                        email,
                        role: role.into(),
                    };
                    match registry::invite_user(&mut store, invitation) {
                        Ok(invited) => {
                            println!("Invited {} as user {}.", invited.email, invited.id);
                            true
                        }
                        Err(err) => {
                            println!("Warning: {err}");
                            false
                        }
                    }
                }
                UserAction::Update {
                    id,
                    name,
                    email,
                    role,
                } => {
                    require_admin(&policy)?;
                    match store.get_user(id) {
                        Some(mut existing) => {
                            if let Some(name) = name {
                                existing.name = name;
                            }
                            if let Some(email) = email {
                                existing.email = email;
                            }
                            if let Some(role) = role {
                                existing.role = role.into();
                            }
                            report_outcome(registry::update_user(&mut store, existing), "User updated.")
                        }
                        None => report_outcome(Err(RegistryError::UserNotFound(id)), ""),
                    }
                }
                UserAction::Delete { id } => {
                    require_admin(&policy)?;
                    report_outcome(registry::delete_user(&mut store, id), "User deleted.")
                }
            };
            if changed {
                save(&store, state.as_deref())?;
            }
        }
        Commands::Setup {
            login,
            coordinators,
            supervisors,
        } => {
            let user = sign_in(&store, &config, &login)?;
            require_admin(&AccessPolicy::for_user(&user, &config.access))?;
            if !setup::is_setup_needed(&store) {
                println!("Setup already done.");
                return Ok(());
            }

            let plan = SetupPlan {
                coordinators: coordinators
                    .iter()
                    .map(|raw| parse_member(raw))
                    .collect::<anyhow::Result<_>>()?,
                supervisors: supervisors
                    .iter()
                    .map(|raw| parse_member(raw))
                    .collect::<anyhow::Result<_>>()?,
            };
            let users = setup::perform_initial_setup(&mut store, &config.auth, plan);
            println!("Organization set up with {} users.", users.len());
            save(&store, state.as_deref())?;
        }
    }

    Ok(())
}
