use serde_json::json;
use tracing::{debug, info, warn};

use services::{AppServices, ProgressService};

mod args;
mod logging;
mod seed;

use args::{Args, Command, print_usage};

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(
        std::env::args().skip(1),
        std::env::var("ATTENDANCE_DB_URL").ok(),
    )
    .map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match &parsed.command {
        Command::Help => {
            print_usage();
            return Ok(());
        }
        Command::FromJson { path } => {
            // A saved response that cannot be read still yields a progress record.
            let body = std::fs::read_to_string(path).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "cannot read schedules response");
                String::new()
            });
            return print_json(&ProgressService::progress_from_json(&body));
        }
        _ => {}
    }

    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, parsed.clock).await?;

    match parsed.command {
        Command::Progress {
            course_id,
            student_id,
        } => {
            let progress = app.progress().course_progress(course_id, student_id).await;
            print_json(&progress)
        }
        Command::Schedules {
            course_id,
            student_id,
        } => {
            let resp = app
                .schedules()
                .list_schedules(course_id, student_id)
                .await?;
            print_json(&resp)
        }
        Command::MarkSeen {
            schedule_id,
            student_id,
        } => {
            let marked = app.schedules().mark_seen(student_id, schedule_id).await?;
            print_json(&json!({
                "schedule_id": marked.schedule_id,
                "phase": marked.phase,
                "newly_marked": marked.newly_marked,
            }))
        }
        Command::Seed => {
            let schedules = app.schedules();
            let written = seed::seed_demo_course(&schedules).await?;
            info!(
                db = %parsed.db_url,
                classes = written,
                course = %seed::DEMO_COURSE,
                student = %seed::DEMO_STUDENT,
                "seeded demo course"
            );
            Ok(())
        }
        Command::Help | Command::FromJson { .. } => Ok(()),
    }
}

/// Create the database file and its directory so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = args::sqlite_file_path(db_url)? else {
        return Ok(());
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.exists()) {
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "created database directory");
    }
    if !path.exists() {
        std::fs::File::create(&path)?;
        info!(path = %path.display(), "created database file");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
