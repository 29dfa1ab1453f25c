use std::fmt;
use std::path::{Path, PathBuf};

use attendance_core::Clock;
use attendance_core::model::{CourseId, ParseIdError, ScheduleId, StudentId};

pub const DEFAULT_DB_URL: &str = "sqlite://attendance.sqlite3";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    MissingPath,
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { flag: &'static str, source: ParseIdError },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::MissingPath => write!(f, "from-json requires a file path"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { flag, source } => write!(f, "invalid {flag} value: {source}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(
                    f,
                    "invalid --now value (expected RFC3339 or YYYY-MM-DD HH:MM[:SS]): {raw}"
                )
            }
        }
    }
}

impl std::error::Error for ArgsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArgsError::InvalidId { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  attendance progress  --course-id <id> --student-id <id> [--db <url>] [--now <ts>]");
    eprintln!("  attendance schedules --course-id <id> --student-id <id> [--db <url>] [--now <ts>]");
    eprintln!("  attendance mark-seen --schedule-id <id> --student-id <id> [--db <url>] [--now <ts>]");
    eprintln!("  attendance from-json <path>");
    eprintln!("  attendance seed [--db <url>] [--now <ts>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --now current system time");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ATTENDANCE_DB_URL, ATTENDANCE_LOG, ATTENDANCE_LOG_JSON");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Progress { course_id: CourseId, student_id: StudentId },
    Schedules { course_id: CourseId, student_id: StudentId },
    MarkSeen { schedule_id: ScheduleId, student_id: StudentId },
    FromJson { path: PathBuf },
    Seed,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub clock: Clock,
}

/// Flag values collected before a subcommand checks which ones it needs.
#[derive(Default)]
struct Flags {
    db_url: Option<String>,
    now: Option<Clock>,
    course_id: Option<CourseId>,
    student_id: Option<StudentId>,
    schedule_id: Option<ScheduleId>,
    positional: Vec<String>,
    help: bool,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T>(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<T, ArgsError>
where
    T: std::str::FromStr<Err = ParseIdError>,
{
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|source| ArgsError::InvalidId { flag, source })
}

fn required<T>(value: Option<T>, flag: &'static str) -> Result<T, ArgsError> {
    value.ok_or(ArgsError::MissingFlag { flag })
}

impl Flags {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut flags = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    flags.db_url = Some(value);
                }
                "--now" => {
                    let value = require_value(args, "--now")?;
                    let clock =
                        Clock::fixed_at(&value).ok_or(ArgsError::InvalidNow { raw: value })?;
                    flags.now = Some(clock);
                }
                "--course-id" => flags.course_id = Some(parse_id(args, "--course-id")?),
                "--student-id" => flags.student_id = Some(parse_id(args, "--student-id")?),
                "--schedule-id" => flags.schedule_id = Some(parse_id(args, "--schedule-id")?),
                "--help" | "-h" => flags.help = true,
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => flags.positional.push(arg),
            }
        }
        Ok(flags)
    }
}

impl Args {
    /// Parse `argv` (without the program name). `env_db_url` is the value of
    /// `ATTENDANCE_DB_URL`, if set.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut iter = argv.into_iter();
        let Some(cmd) = iter.next() else {
            return Ok(Self::help());
        };
        if matches!(cmd.as_str(), "--help" | "-h" | "help") {
            return Ok(Self::help());
        }

        let mut flags = Flags::parse(&mut iter)?;
        if flags.help {
            return Ok(Self::help());
        }
        let command = match cmd.as_str() {
            "progress" => Command::Progress {
                course_id: required(flags.course_id, "--course-id")?,
                student_id: required(flags.student_id, "--student-id")?,
            },
            "schedules" => Command::Schedules {
                course_id: required(flags.course_id, "--course-id")?,
                student_id: required(flags.student_id, "--student-id")?,
            },
            "mark-seen" => Command::MarkSeen {
                schedule_id: required(flags.schedule_id, "--schedule-id")?,
                student_id: required(flags.student_id, "--student-id")?,
            },
            "from-json" => {
                if flags.positional.is_empty() {
                    return Err(ArgsError::MissingPath);
                }
                Command::FromJson {
                    path: PathBuf::from(flags.positional.remove(0)),
                }
            }
            "seed" => Command::Seed,
            _ => return Err(ArgsError::UnknownCommand(cmd)),
        };
        if let Some(extra) = flags.positional.into_iter().next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        let db_url = flags
            .db_url
            .or(env_db_url.filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_DB_URL.to_string());

        Ok(Self {
            command,
            db_url: normalize_sqlite_url(db_url),
            clock: flags.now.unwrap_or_default(),
        })
    }

    fn help() -> Self {
        Self {
            command: Command::Help,
            db_url: DEFAULT_DB_URL.to_string(),
            clock: Clock::System,
        }
    }
}

/// In-memory databases and `file:` URIs are left to `SQLite` as written.
fn is_passthrough_url(url: &str) -> bool {
    url == "sqlite::memory:" || url.starts_with("sqlite:file:") || url.contains("mode=memory")
}

/// Rewrite a database argument into a `sqlite://` URL with an absolute path.
///
/// Accepts bare paths, `sqlite:<path>` and `sqlite://<path>`; a query string is
/// kept as is.
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if is_passthrough_url(trimmed) {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

/// Database file behind a normalized URL; `None` when nothing lives on disk
/// that the binary should create.
pub fn sqlite_file_path(url: &str) -> Result<Option<PathBuf>, ArgsError> {
    if is_passthrough_url(url) {
        return Ok(None);
    }
    let path = url
        .strip_prefix("sqlite://")
        .map(|rest| rest.split('?').next().unwrap_or(rest))
        .filter(|path| !path.is_empty())
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: url.to_string(),
        })?;
    Ok(Some(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::time::fixed_now;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_progress_with_all_flags() {
        let args = Args::parse(
            argv(&[
                "progress",
                "--course-id",
                "3",
                "--student-id",
                "11",
                "--db",
                "sqlite::memory:",
                "--now",
                "2023-11-14T22:13:20Z",
            ]),
            None,
        )
        .unwrap();

        assert_eq!(
            args.command,
            Command::Progress {
                course_id: CourseId::new(3),
                student_id: StudentId::new(11),
            }
        );
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.clock, Clock::fixed(fixed_now()));
    }

    #[test]
    fn flag_overrides_env_which_overrides_default() {
        let from_env = Args::parse(argv(&["seed"]), Some("sqlite:///tmp/env.db".into())).unwrap();
        assert_eq!(from_env.db_url, "sqlite:///tmp/env.db");

        let from_flag = Args::parse(
            argv(&["seed", "--db", "sqlite:///tmp/flag.db"]),
            Some("sqlite:///tmp/env.db".into()),
        )
        .unwrap();
        assert_eq!(from_flag.db_url, "sqlite:///tmp/flag.db");

        let default = Args::parse(argv(&["seed"]), None).unwrap();
        assert!(default.db_url.starts_with("sqlite:///"));
        assert!(default.db_url.ends_with("/attendance.sqlite3"));
    }

    #[test]
    fn missing_required_flag_is_reported() {
        let err = Args::parse(argv(&["mark-seen", "--student-id", "1"]), None).unwrap_err();
        assert!(matches!(err, ArgsError::MissingFlag { flag: "--schedule-id" }));
    }

    #[test]
    fn invalid_id_is_reported() {
        let err = Args::parse(argv(&["progress", "--course-id", "abc"]), None).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidId { flag: "--course-id", .. }));
    }

    #[test]
    fn from_json_takes_a_path() {
        let args = Args::parse(argv(&["from-json", "resp.json"]), None).unwrap();
        assert_eq!(
            args.command,
            Command::FromJson {
                path: PathBuf::from("resp.json")
            }
        );
        assert!(matches!(
            Args::parse(argv(&["from-json"]), None).unwrap_err(),
            ArgsError::MissingPath
        ));
    }

    #[test]
    fn unknown_command_and_flag_are_rejected() {
        assert!(matches!(
            Args::parse(argv(&["launch"]), None).unwrap_err(),
            ArgsError::UnknownCommand(_)
        ));
        assert!(matches!(
            Args::parse(argv(&["seed", "--verbose"]), None).unwrap_err(),
            ArgsError::UnknownArg(_)
        ));
    }

    #[test]
    fn no_arguments_means_help() {
        assert_eq!(Args::parse(Vec::new(), None).unwrap().command, Command::Help);
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/att.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/att.db"));

        let url = normalize_sqlite_url("sqlite://att.db?mode=rwc".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/att.db?mode=rwc"));

        let url = normalize_sqlite_url("att.db".into());
        assert!(url.starts_with("sqlite:///"));
    }

    #[test]
    fn in_memory_urls_are_kept_verbatim() {
        for url in [
            "sqlite::memory:",
            "sqlite:file:x?mode=memory&cache=shared",
            "sqlite://shared?mode=memory",
        ] {
            assert_eq!(normalize_sqlite_url(url.into()), url);
            assert_eq!(sqlite_file_path(url).unwrap(), None);
        }
    }

    #[test]
    fn file_path_is_taken_from_normalized_url() {
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/att.db?mode=rwc").unwrap(),
            Some(PathBuf::from("/var/lib/att.db"))
        );
        assert!(matches!(
            sqlite_file_path("postgres://db").unwrap_err(),
            ArgsError::InvalidDbUrl { .. }
        ));
    }

    #[test]
    fn help_flag_after_a_subcommand_shows_help() {
        let args = Args::parse(argv(&["progress", "--help"]), None).unwrap();
        assert_eq!(args.command, Command::Help);
    }

    #[test]
    fn naive_now_is_accepted() {
        let args = Args::parse(argv(&["seed", "--now", "2023-11-14 22:13:20"]), None).unwrap();
        assert_eq!(args.clock, Clock::fixed(fixed_now()));

        let err = Args::parse(argv(&["seed", "--now", "soon"]), None).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD HH:MM[:SS]"));
    }
}
