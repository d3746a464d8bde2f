use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod mcp;
mod mem_home;
mod skill;

use commands::CommandContext;

#[derive(Parser, Debug)]
#[command(name = "mem", version, about = "git-backed task memory for agents")]
struct Cli {
    /// Central store location (defaults to ~/.mem).
    #[arg(long, global = true)]
    central_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: RootCommand,
}

#[derive(Subcommand, Debug)]
enum RootCommand {
    /// Create a local .mem store here and start a task.
    Init {
        slug: String,
        goal: Option<String>,
    },
    /// Start a task in the central store, mapped to this directory.
    New {
        slug: String,
        goal: Option<String>,
    },
    /// Show store, branch, and task state.
    Status,
    /// Show the goal, or replace the goal statement.
    Goal { text: Option<String> },
    /// Show the next step, or replace it.
    Next { text: Option<String> },
    /// Record a dated progress checkpoint.
    Checkpoint { message: String },
    /// Record a learning in task memory.
    Learn { insight: String },
    /// Manage Definition of Done criteria.
    Criteria {
        #[command(subcommand)]
        action: CriteriaAction,
    },
    /// Recompute and report progress.
    Progress,
    /// Manage goal constraints.
    Constraint {
        #[command(subcommand)]
        action: ConstraintAction,
    },
    /// Print goal, state, memory, and playbook for a fresh agent.
    Context,
    /// List task branches and mapped directories.
    Tasks,
    /// Switch this directory to another task.
    Switch { slug: String },
    /// Mark the task blocked.
    Stuck { reason: String },
    /// Mark a blocked task active again.
    Clear,
    /// Complete the task and merge it into main.
    Done {
        /// Delete the task branch after the merge.
        #[arg(long)]
        delete_branch: bool,
    },
    /// Commit outstanding changes and sync with the remote, if any.
    Sync,
    /// Set an arbitrary state value.
    Set { key: String, value: String },
    /// Read an arbitrary state value.
    Get { key: String },
    /// Append text to one of the memory documents.
    Append { file: String, text: String },
    /// Store a wake schedule for this task.
    Wake {
        schedule: String,
        #[arg(long)]
        command: Option<String>,
    },
    /// Cron helpers.
    Cron {
        #[command(subcommand)]
        action: CronAction,
    },
    /// Agent skill management.
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },
    /// Serve the MCP stdio interface.
    Mcp,
}

#[derive(Subcommand, Debug)]
enum CriteriaAction {
    /// Add a criterion to the Definition of Done.
    Add { text: String },
    /// Check off an open criterion by its current number.
    Check { number: usize },
    /// List criteria; open items carry the numbers `check` uses.
    List,
}

#[derive(Subcommand, Debug)]
enum ConstraintAction {
    /// Add a constraint bullet.
    Add { text: String },
    /// List constraints.
    List,
}

#[derive(Subcommand, Debug)]
enum CronAction {
    /// Print a crontab snippet for the stored wake schedule.
    Export,
}

#[derive(Subcommand, Debug)]
enum SkillAction {
    /// Install the mem skill file for agents.
    Install,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // stderr keeps stdout clean for command output and the MCP transport
    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
    if let Err(error) = init_result {
        eprintln!("warning: failed to initialize tracing subscriber: {error}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("error: cannot determine working directory: {error}");
            std::process::exit(1);
        }
    };
    let central_dir = mem_home::resolve_central_dir(&cwd, cli.central_dir.as_deref());
    let ctx = CommandContext { cwd, central_dir };

    let result = match cli.command {
        RootCommand::Init { slug, goal } => commands::init(&ctx, &slug, goal.as_deref()),
        RootCommand::New { slug, goal } => commands::new_task(&ctx, &slug, goal.as_deref()),
        RootCommand::Status => commands::status(&ctx),
        RootCommand::Goal { text } => commands::show_or_set_goal(&ctx, text.as_deref()),
        RootCommand::Next { text } => commands::show_or_set_next(&ctx, text.as_deref()),
        RootCommand::Checkpoint { message } => commands::checkpoint(&ctx, &message),
        RootCommand::Learn { insight } => commands::learn(&ctx, &insight),
        RootCommand::Criteria { action } => match action {
            CriteriaAction::Add { text } => commands::criteria_add(&ctx, &text),
            CriteriaAction::Check { number } => commands::criteria_check(&ctx, number),
            CriteriaAction::List => commands::criteria_list(&ctx),
        },
        RootCommand::Progress => commands::progress(&ctx),
        RootCommand::Constraint { action } => match action {
            ConstraintAction::Add { text } => commands::constraint_add(&ctx, &text),
            ConstraintAction::List => commands::constraint_list(&ctx),
        },
        RootCommand::Context => commands::context(&ctx),
        RootCommand::Tasks => commands::tasks(&ctx),
        RootCommand::Switch { slug } => commands::switch(&ctx, &slug),
        RootCommand::Stuck { reason } => commands::stuck(&ctx, &reason),
        RootCommand::Clear => commands::clear(&ctx),
        RootCommand::Done { delete_branch } => commands::done(&ctx, delete_branch),
        RootCommand::Sync => commands::sync(&ctx),
        RootCommand::Set { key, value } => commands::set_value(&ctx, &key, &value),
        RootCommand::Get { key } => commands::get_value(&ctx, &key),
        RootCommand::Append { file, text } => commands::append(&ctx, &file, &text),
        RootCommand::Wake { schedule, command } => {
            commands::wake(&ctx, &schedule, command.as_deref())
        }
        RootCommand::Cron { action } => match action {
            CronAction::Export => commands::cron_export(&ctx),
        },
        RootCommand::Skill { action } => match action {
            SkillAction::Install => match skill::install(&mem_home::home_dir()) {
                Ok(path) => {
                    println!("installed skill at {}", path.display());
                    Ok(())
                }
                Err(error) => Err(error),
            },
        },
        RootCommand::Mcp => mcp::serve(),
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_init_with_goal() {
        let parsed = Cli::try_parse_from(["mem", "init", "demo", "Build X"]);
        assert!(parsed.is_ok(), "mem init <slug> [goal] should parse");
    }

    #[test]
    fn cli_accepts_criteria_check_number() {
        let parsed = Cli::try_parse_from(["mem", "criteria", "check", "2"]);
        assert!(parsed.is_ok(), "mem criteria check <n> should parse");
    }

    #[test]
    fn cli_accepts_central_dir_global_flag() {
        let parsed = Cli::try_parse_from(["mem", "--central-dir", "/tmp/mem-central", "status"]);
        assert!(parsed.is_ok(), "mem should accept --central-dir globally");
    }

    #[test]
    fn cli_accepts_done_with_delete_branch() {
        let parsed = Cli::try_parse_from(["mem", "done", "--delete-branch"]);
        assert!(parsed.is_ok(), "mem done --delete-branch should parse");
    }

    #[test]
    fn cli_accepts_wake_with_command() {
        let parsed =
            Cli::try_parse_from(["mem", "wake", "8:30am daily", "--command", "mem status"]);
        assert!(parsed.is_ok(), "mem wake <schedule> --command should parse");
    }

    #[test]
    fn cli_rejects_missing_checkpoint_message() {
        let parsed = Cli::try_parse_from(["mem", "checkpoint"]);
        assert!(parsed.is_err(), "checkpoint requires a message");
    }
}
