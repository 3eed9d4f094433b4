//! Command-line inspector for a meeting desk database.
//!
//! # Responsibility
//! - Verify `meetdesk_core` linkage (`ping`).
//! - Inspect or switch the remembered workspace of a database file.
//! - Print read-only summaries of workspace data and live session state.

use log::error;
use meetdesk_core::{
    open_db, AggregationService, EntityService, PresenceService, ServiceContext,
    SqliteKvRepository, TimerService, VotingService, WorkspaceService,
};
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "meetdesk.sqlite3";
const USAGE: &str = "usage: meetdesk_cli [--db PATH] [--log-dir DIR] <ping | workspace [ID] | summary | timer | poll>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ping,
    Workspace(Option<String>),
    Summary,
    Timer,
    Poll,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    db_path: String,
    log_dir: Option<String>,
    command: Command,
}

fn main() -> ExitCode {
    let invocation = match parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Some(log_dir) = invocation.log_dir.as_deref() {
        if let Err(err) = meetdesk_core::init_logging(meetdesk_core::default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(&invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation, String> {
    let mut args = args.into_iter().peekable();
    let mut db_path = DEFAULT_DB_PATH.to_string();
    let mut log_dir = None;
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = args.next().ok_or("--db needs a path")?,
            "--log-dir" => log_dir = Some(args.next().ok_or("--log-dir needs a directory")?),
            "ping" => command = Some(Command::Ping),
            "workspace" => {
                let id = args.next_if(|next| !next.starts_with("--"));
                command = Some(Command::Workspace(id));
            }
            "summary" => command = Some(Command::Summary),
            "timer" => command = Some(Command::Timer),
            "poll" => command = Some(Command::Poll),
            other => return Err(format!("unknown argument `{other}`")),
        }
    }

    Ok(Invocation {
        db_path,
        log_dir,
        command: command.ok_or("missing command")?,
    })
}

fn run(invocation: &Invocation) -> Result<(), Box<dyn Error>> {
    if invocation.command == Command::Ping {
        println!("meetdesk_core ping={}", meetdesk_core::ping());
        println!("meetdesk_core version={}", meetdesk_core::core_version());
        return Ok(());
    }

    let conn = open_db(&invocation.db_path)?;
    let repo = SqliteKvRepository::new(&conn);
    let ctx = ServiceContext::system();
    let workspaces = WorkspaceService::new(repo, ctx.clone());

    match &invocation.command {
        Command::Ping => {}
        Command::Workspace(None) => {
            println!("current={}", workspaces.current()?);
            for workspace in workspaces.list_workspaces()? {
                println!("known={workspace}");
            }
        }
        Command::Workspace(Some(raw)) => {
            println!("current={}", workspaces.set(raw)?);
        }
        Command::Summary => {
            let workspace = workspaces.current()?;
            let entities = EntityService::new(repo, ctx.clone());
            let aggregation = AggregationService::new(repo, ctx);
            println!("workspace={workspace}");
            println!("employees={}", entities.employees(&workspace)?.len());
            println!("meetings={}", entities.meetings(&workspace)?.len());
            println!("actions={}", aggregation.all_actions(&workspace)?.len());
            println!("overdue_actions={}", aggregation.overdue_actions(&workspace)?.len());
            println!("decisions={}", aggregation.all_decisions(&workspace)?.len());
            println!("draft={}", entities.get_draft(&workspace)?.is_some());
        }
        Command::Timer => {
            let workspace = workspaces.current()?;
            let timer = TimerService::new(repo, ctx);
            let state = timer.state(&workspace)?;
            println!("workspace={workspace}");
            println!("running={}", state.is_running);
            println!("elapsed_secs={}", timer.elapsed(&workspace)?);
        }
        Command::Poll => {
            let workspace = workspaces.current()?;
            let voting = VotingService::new(repo, ctx.clone());
            let presence = PresenceService::new(repo, ctx);
            let poll = voting.state(&workspace)?;
            let participants = presence.active_count(&workspace)?;
            println!("workspace={workspace}");
            println!("active={}", poll.is_active);
            println!("topic={}", poll.topic);
            println!("votes={}", poll.votes.len());
            println!("participants={participants}");
            println!(
                "majority={}",
                meetdesk_core::majority_reached(poll.votes.len(), participants)
            );
        }
    }
    Ok(())
}
