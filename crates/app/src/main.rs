use std::fmt;
use std::sync::Arc;

use quiz_core::model::{ProgressState, QuestionId, QuizId};
use services::{
    CatalogLoad, CatalogSource, DEFAULT_NAMESPACE, FileCatalogSource, HttpCatalogSource,
    QuizProgressStore,
};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidId { raw } => write!(f, "invalid id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz <command> [--db <sqlite_url>] [--catalog-file <path>] [--namespace <key>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  fetch                       load the quiz catalog");
    eprintln!("  list                        list quizzes in the catalog");
    eprintln!("  select <quiz-id>            start a fresh attempt");
    eprintln!("  show                        show the current question");
    eprintln!("  answer <question-id> <text> grade an answer");
    eprintln!("  next | prev                 move between questions");
    eprintln!("  complete                    finish the attempt and print the score");
    eprintln!("  reset                       drop the current attempt");
    eprintln!("  clear                       delete the stored snapshot");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --namespace {DEFAULT_NAMESPACE}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATALOG_FILE, QUIZ_NAMESPACE, QUIZ_API_URL, QUIZ_ENV, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Fetch,
    List,
    Select(QuizId),
    Show,
    Answer(QuestionId, String),
    Next,
    Prev,
    Complete,
    Reset,
    Clear,
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let cmd = match name {
            "fetch" => Self::Fetch,
            "list" => Self::List,
            "select" => {
                let raw = args.next().ok_or(ArgsError::MissingArgument { name: "quiz-id" })?;
                let id = raw.parse().map_err(|_| ArgsError::InvalidId { raw })?;
                Self::Select(id)
            }
            "show" => Self::Show,
            "answer" => {
                let raw = args.next().ok_or(ArgsError::MissingArgument {
                    name: "question-id",
                })?;
                let id = raw.parse().map_err(|_| ArgsError::InvalidId { raw })?;
                let text = args
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "answer" })?;
                Self::Answer(id, text)
            }
            "next" => Self::Next,
            "prev" => Self::Prev,
            "complete" => Self::Complete,
            "reset" => Self::Reset,
            "clear" => Self::Clear,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }
}

struct Args {
    command: Command,
    db_url: String,
    catalog_file: Option<String>,
    namespace: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut catalog_file = std::env::var("QUIZ_CATALOG_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut namespace =
            std::env::var("QUIZ_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.into());
        let mut command = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog-file" => catalog_file = Some(require_value(args, "--catalog-file")?),
                "--namespace" => namespace = require_value(args, "--namespace")?,
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                name if command.is_none() => command = Some(Command::parse(name, args)?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = command.ok_or(ArgsError::MissingArgument { name: "command" })?;
        Ok(Self {
            command,
            db_url,
            catalog_file,
            namespace,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_question(state: &ProgressState) {
    let Some(quiz) = state.selected_quiz() else {
        println!("no quiz selected");
        return;
    };
    let Some(question) = state.current_question() else {
        println!("{} has no questions", quiz.title());
        return;
    };

    println!(
        "{} [{}/{}] #{} {}",
        quiz.title(),
        state.cursor() + 1,
        state.questions().len(),
        question.id(),
        question.question().prompt()
    );
    for choice in question.question().choices() {
        let marker = if question.user_selected_answer() == Some(choice.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("  {marker} {choice}");
    }
    match (question.is_correct_user_answer(), question.correct_answer()) {
        (Some(true), _) => println!("  correct"),
        (Some(false), Some(expected)) => println!("  wrong, expected: {expected}"),
        _ => {}
    }
    if let Some(score) = state.score() {
        println!("score: {score}/{}", state.questions().len());
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1).peekable();
    if matches!(argv.peek().map(String::as_str), None | Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    log::debug!("opening snapshot database {}", parsed.db_url);
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let catalog: Arc<dyn CatalogSource> = match &parsed.catalog_file {
        Some(path) => Arc::new(FileCatalogSource::new(path)),
        None => {
            let source = HttpCatalogSource::from_env();
            log::debug!("catalog url {}", source.config().url());
            Arc::new(source)
        }
    };
    let store = QuizProgressStore::new(catalog, Arc::clone(&storage.snapshots))
        .with_namespace(parsed.namespace)
        .restore()
        .await?;

    match parsed.command {
        Command::Fetch => match store.load_catalog().await {
            CatalogLoad::Loaded(quizzes) => println!("loaded {} quizzes", quizzes.len()),
            CatalogLoad::Failed(err) => eprintln!("catalog unavailable: {err}"),
            CatalogLoad::Superseded => {}
        },
        Command::List => {
            let state = store.state().await;
            if state.catalog().is_empty() {
                println!("catalog is empty; run `quiz fetch` first");
            }
            for quiz in state.catalog() {
                println!(
                    "{:>4}  {} ({} questions)",
                    quiz.id().value(),
                    quiz.title(),
                    quiz.question_count()
                );
            }
        }
        Command::Select(id) => {
            store.select_quiz_by_id(id).await?;
            print_question(&store.state().await);
        }
        Command::Show => print_question(&store.state().await),
        Command::Answer(id, text) => {
            let correct = store.select_answer(id, text).await?;
            println!("{}", if correct { "correct" } else { "wrong" });
            print_question(&store.state().await);
        }
        Command::Next => {
            if !store.go_next().await {
                println!("already at the last question");
            }
            print_question(&store.state().await);
        }
        Command::Prev => {
            if !store.go_previous().await {
                println!("already at the first question");
            }
            print_question(&store.state().await);
        }
        Command::Complete => {
            let score = store.complete_questions().await;
            let total = store.state().await.questions().len();
            println!("score: {score}/{total}");
        }
        Command::Reset => {
            store.reset().await;
            println!("attempt reset");
        }
        Command::Clear => {
            store.clear_snapshot().await?;
            println!("snapshot cleared");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
