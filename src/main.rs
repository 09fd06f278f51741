use clap::{Parser, Subcommand};
use course_rag::commands::{clear, delete_course, ingest, list_courses, outline, run_tool, search};
use course_rag::config::{Config, run_interactive_config, show_config};
use course_rag::{App, RagError, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "course-rag")]
#[command(about = "Course material ingestion and semantic retrieval")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.course-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider, chunking and search settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a course document or a folder of them
    Ingest {
        /// Course document (.txt) or folder
        path: PathBuf,
        /// Skip documents whose course is already indexed
        #[arg(long)]
        skip_existing: bool,
    },
    /// Search course content
    Search {
        query: String,
        /// Course name or partial name
        #[arg(long)]
        course: Option<String>,
        /// Restrict to one lesson number
        #[arg(long)]
        lesson: Option<u32>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a course outline
    Outline {
        /// Course name or partial name
        course: String,
    },
    /// List indexed courses
    Courses,
    /// Delete a course by exact title
    Delete {
        title: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Delete every indexed course
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Run a model-facing tool with JSON arguments
    Tool {
        name: String,
        /// JSON object of tool arguments
        arguments: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::config_dir().map_err(|e| RagError::Config(e.to_string()))?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&config_dir)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let app = App::open(Config::load(&config_dir)?).await?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Ingest {
            path,
            skip_existing,
        } => {
            ingest(&app, &path, skip_existing).await?;
        }
        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            search(&app, query, course, lesson, limit).await?;
        }
        Commands::Outline { course } => {
            outline(&app, &course).await?;
        }
        Commands::Courses => {
            list_courses(&app).await?;
        }
        Commands::Delete { title, yes } => {
            delete_course(&app, &title, yes).await?;
        }
        Commands::Clear { yes } => {
            clear(&app, yes).await?;
        }
        Commands::Tool { name, arguments } => {
            run_tool(&app, &name, arguments.as_deref()).await?;
        }
    }

    Ok(())
}
