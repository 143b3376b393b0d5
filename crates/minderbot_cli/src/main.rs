//! `minderbot` command line entry point.
//!
//! # Responsibility
//! - Expose the consistency trigger modes: interactive check, cron check,
//!   single-rule repair.
//! - Map core responses to stdout text or JSON and to exit codes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use minderbot_core::{
    default_log_level, init_logging, open_db, Caller, CheckRequest, CheckResponse,
    ConsistencyConfig, ConsistencyService, EntityStore, LogNotifier, RepairResponse, RuleName,
    RuleSummary, SqliteEntityStore,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when the caller lacks staff rights.
const EXIT_LOGIN_REQUIRED: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "minderbot: reference consistency checker",
    long_about = None
)]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "MINDERBOT_DB")]
    db: PathBuf,

    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, env = "MINDERBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, env = "MINDERBOT_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run every consistency rule",
        after_help = "EXAMPLES:\n    # Dashboard for a staff user\n    minderbot --db minder.db check --as-user admin\n\n    # Unattended run with plain-text report\n    minderbot --db minder.db check --cron"
    )]
    Check {
        /// Unattended scheduler run: no staff gate, plain-text report.
        #[arg(long)]
        cron: bool,
        /// User id the check runs as.
        #[arg(long)]
        as_user: Option<String>,
        /// Emit the dashboard as JSON.
        #[arg(long)]
        json: bool,
    },

    #[command(
        about = "Repair the problems of one rule",
        after_help = "EXAMPLES:\n    # Recompute tag counts\n    minderbot --db minder.db repair tag_count --as-user admin"
    )]
    Repair {
        /// Rule key, see `minderbot rules`.
        rule: String,
        /// Staff user id performing the repair.
        #[arg(long)]
        as_user: String,
        /// Emit the repair summary as JSON.
        #[arg(long)]
        json: bool,
    },

    #[command(about = "List rule keys and their repair actions")]
    Rules,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let config = match &cli.config {
        Some(path) => ConsistencyConfig::load(path)?,
        None => ConsistencyConfig::default(),
    };

    if let Commands::Rules = cli.command {
        for rule in RuleName::ALL {
            println!(
                "{:<26} {}",
                rule.as_str(),
                rule.action_label(config.dangling_owner_policy)
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let store = SqliteEntityStore::try_new(&conn)?;
    info!(
        "event=cli_start module=cli status=ok db={:?} policy={}",
        cli.db.display().to_string(),
        config.dangling_owner_policy.as_str()
    );

    match cli.command {
        Commands::Check {
            cron,
            as_user,
            json,
        } => {
            let caller = resolve_caller(&store, as_user.as_deref())?;
            let service = ConsistencyService::new(store, LogNotifier, config);
            let response = service.check(&CheckRequest {
                caller,
                batch: cron,
            })?;
            match response {
                CheckResponse::Redirect { location } => Ok(login_required(&location)),
                CheckResponse::PlainText { body } => {
                    info!("event=cli_check module=cli status=ok mode=batch");
                    println!("{body}");
                    Ok(ExitCode::SUCCESS)
                }
                CheckResponse::Dashboard { rules } => {
                    info!(
                        "event=cli_check module=cli status=ok mode=interactive failing_rules={}",
                        rules.iter().filter(|summary| !summary.is_success).count()
                    );
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rules)?);
                    } else {
                        print_dashboard(&rules);
                    }
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Commands::Repair {
            rule,
            as_user,
            json,
        } => {
            let caller = resolve_caller(&store, Some(&as_user))?;
            let service = ConsistencyService::new(store, LogNotifier, config);
            match service.repair(&caller, &rule)? {
                RepairResponse::Redirect { location } => Ok(login_required(&location)),
                RepairResponse::Repaired { summary, location } => {
                    info!(
                        "event=cli_repair module=cli status=ok rule={} writes={} deletes={} created={} skipped={}",
                        summary.rule,
                        summary.writes,
                        summary.deletes,
                        summary.created,
                        summary.skipped
                    );
                    if json {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                    } else {
                        println!(
                            "{}: {} writes, {} deletes, {} created, {} skipped",
                            summary.rule,
                            summary.writes,
                            summary.deletes,
                            summary.created,
                            summary.skipped
                        );
                        println!("re-check at {location}");
                    }
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Commands::Rules => Ok(ExitCode::SUCCESS),
    }
}

/// Unknown or absent user ids run as anonymous callers.
fn resolve_caller<S: EntityStore>(store: &S, user_id: Option<&str>) -> Result<Caller> {
    let Some(user_id) = user_id else {
        return Ok(Caller::Anonymous);
    };
    Ok(match store.get_user(user_id)? {
        Some(user) => Caller::User {
            id: user.id,
            is_staff: user.is_staff,
        },
        None => {
            warn!("event=cli_caller module=cli status=unknown_user user={user_id:?}");
            Caller::Anonymous
        }
    })
}

fn login_required(location: &str) -> ExitCode {
    warn!("event=cli_auth module=cli status=redirect location={location:?}");
    eprintln!("staff login required: {location}");
    ExitCode::from(EXIT_LOGIN_REQUIRED)
}

fn print_dashboard(rules: &[RuleSummary]) {
    for summary in rules {
        if summary.is_success {
            println!("[ok]   {}", summary.headline);
            continue;
        }
        println!(
            "[fail] {} (repair: `{}` {})",
            summary.headline, summary.rule, summary.action_label
        );
        for message in &summary.messages {
            println!("       * {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_caller, Cli, Commands};
    use clap::Parser;
    use minderbot_core::model::user::User;
    use minderbot_core::{open_db_in_memory, Caller, EntityStore, SqliteEntityStore};

    #[test]
    fn unknown_user_runs_as_anonymous() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteEntityStore::try_new(&conn).unwrap();
        store
            .put_user(&User {
                id: "admin".to_string(),
                email: "admin@example.com".to_string(),
                is_staff: true,
            })
            .unwrap();

        assert_eq!(resolve_caller(&store, None).unwrap(), Caller::Anonymous);
        assert_eq!(resolve_caller(&store, Some("ghost")).unwrap(), Caller::Anonymous);
        assert_eq!(
            resolve_caller(&store, Some("admin")).unwrap(),
            Caller::staff("admin")
        );
    }

    #[test]
    fn repair_requires_acting_user() {
        assert!(Cli::try_parse_from(["minderbot", "--db", "x.db", "repair", "tag_count"]).is_err());

        let cli = Cli::try_parse_from([
            "minderbot",
            "--db",
            "x.db",
            "repair",
            "tag_count",
            "--as-user",
            "admin",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Repair { ref rule, .. } if rule == "tag_count"));
    }
}
