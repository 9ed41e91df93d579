use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gradebook::config::AppConfig;
use gradebook::models::{Grade, GradeChanges};
use gradebook::{db, import, prompt, report, seed, AnalyticsError, GradeBook};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Grade book analytics: class statistics, trends, comparisons and correlations", long_about = None)]
struct Cli {
    /// Use a JSON snapshot file instead of Postgres
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    Prompt,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample classes, students and grades
    Seed,
    /// Import grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the CSV import template
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Record one grade, creating the student if needed
    AddGrade {
        #[arg(long)]
        student: String,
        #[arg(long)]
        student_name: String,
        #[arg(long)]
        subject: String,
        #[arg(long, allow_negative_numbers = true)]
        score: f64,
        #[arg(long)]
        exam_date: NaiveDate,
        #[arg(long)]
        exam_name: String,
    },
    /// Change fields of an existing grade
    UpdateGrade {
        #[arg(long)]
        id: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        score: Option<f64>,
        #[arg(long)]
        exam_date: Option<NaiveDate>,
        #[arg(long)]
        exam_name: Option<String>,
    },
    /// Remove a grade
    DeleteGrade {
        #[arg(long)]
        id: String,
    },
    /// List a class's grades for one exam
    Grades {
        #[arg(long)]
        class: String,
        #[arg(long)]
        exam: String,
    },
    /// Per-subject statistics for a class
    ClassSummary {
        #[arg(long)]
        class: String,
        #[arg(long)]
        exam: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Score trends for one student
    Trend {
        #[arg(long)]
        student: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Compare students against the class average for an exam
    Compare {
        #[arg(long)]
        class: String,
        #[arg(long)]
        exam: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Correlate two subjects across a class
    Correlate {
        #[arg(long)]
        class: String,
        #[arg(long)]
        subject1: String,
        #[arg(long)]
        subject2: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Write the database contents to a JSON snapshot file
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

enum Backend {
    Snapshot(PathBuf),
    Postgres(PgPool),
}

impl Backend {
    async fn connect(snapshot: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<Self> {
        if let Some(path) = snapshot {
            return Ok(Self::Snapshot(path));
        }
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.database_url()?)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self::Postgres(pool))
    }

    fn pool(&self) -> anyhow::Result<&PgPool> {
        match self {
            Self::Postgres(pool) => Ok(pool),
            Self::Snapshot(_) => bail!("this command needs Postgres; drop --snapshot"),
        }
    }

    async fn load(&self) -> anyhow::Result<GradeBook> {
        match self {
            Self::Postgres(pool) => db::load_snapshot(pool).await,
            Self::Snapshot(path) => read_snapshot(path),
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<GradeBook> {
    if !path.exists() {
        return Ok(GradeBook::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let book: GradeBook = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    book.validate()?;
    Ok(book)
}

fn write_snapshot(path: &Path, book: &GradeBook) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(book)?;
    std::fs::write(path, raw)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints an engine error as a JSON body and maps it to a failing exit code.
fn report_error(err: &AnalyticsError) -> anyhow::Result<ExitCode> {
    tracing::info!(kind = err.kind(), %err, "analysis returned no result");
    print_json(&serde_json::json!({
        "error": err.to_string(),
        "kind": err.kind(),
    }))?;
    Ok(ExitCode::from(match err {
        AnalyticsError::NotFound { .. } => 3,
        AnalyticsError::NoData(_) => 4,
        AnalyticsError::InvalidInput(_) => 2,
    }))
}

fn render<T: Serialize>(
    outcome: Result<T, AnalyticsError>,
    format: OutputFormat,
    markdown: fn(&T) -> String,
    prompt_text: Option<fn(&T) -> String>,
) -> anyhow::Result<ExitCode> {
    let value = match outcome {
        Ok(value) => value,
        Err(err) => return report_error(&err),
    };
    match format {
        OutputFormat::Json => print_json(&value)?,
        OutputFormat::Markdown => print!("{}", markdown(&value)),
        OutputFormat::Prompt => match prompt_text {
            Some(build) => println!("{}", build(&value)),
            None => bail!("prompt output is only available for class-summary and trend"),
        },
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Template { out } => {
            match out {
                Some(path) => {
                    std::fs::write(&path, import::TEMPLATE)?;
                    println!("Template written to {}.", path.display());
                }
                None => print!("{}", import::TEMPLATE),
            }
            return Ok(ExitCode::SUCCESS);
        }
        Commands::InitDb => {
            let backend = Backend::connect(cli.snapshot, &config).await?;
            db::init_db(backend.pool()?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let backend = Backend::connect(cli.snapshot, &config).await?;
            match &backend {
                Backend::Postgres(pool) => db::seed(pool).await?,
                Backend::Snapshot(path) => {
                    let mut book = read_snapshot(path)?;
                    seed::seed_book(&mut book)?;
                    write_snapshot(path, &book)?;
                }
            }
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let parsed = import::parse_grades(file)?;
            let backend = Backend::connect(cli.snapshot, &config).await?;
            let summary = match &backend {
                Backend::Postgres(pool) => {
                    db::import_rows(pool, parsed, &config.default_class_id, &config.teacher_id)
                        .await?
                }
                Backend::Snapshot(path) => {
                    let mut book = read_snapshot(path)?;
                    let summary = import::apply_to_book(
                        &mut book,
                        parsed,
                        &config.default_class_id,
                        &config.teacher_id,
                    );
                    write_snapshot(path, &book)?;
                    summary
                }
            };
            tracing::info!(
                imported = summary.imported_count,
                errors = summary.errors.len(),
                "import finished"
            );
            print_json(&summary)?;
        }
        Commands::AddGrade {
            student,
            student_name,
            subject,
            score,
            exam_date,
            exam_name,
        } => {
            let grade = Grade {
                id: Uuid::new_v4().to_string(),
                student_id: student,
                subject,
                score,
                exam_date,
                exam_name,
                teacher_id: config.teacher_id.clone(),
            };
            let backend = Backend::connect(cli.snapshot, &config).await?;
            match &backend {
                Backend::Postgres(pool) => {
                    db::ensure_student(pool, &grade.student_id, &student_name, &config.default_class_id)
                        .await?;
                    db::insert_grade(pool, &grade).await?;
                }
                Backend::Snapshot(path) => {
                    let mut book = read_snapshot(path)?;
                    book.ensure_student(&grade.student_id, &student_name, &config.default_class_id)?;
                    book.add_grade(grade.clone())?;
                    write_snapshot(path, &book)?;
                }
            }
            print_json(&serde_json::json!({ "success": true, "grade": grade }))?;
        }
        Commands::UpdateGrade {
            id,
            subject,
            score,
            exam_date,
            exam_name,
        } => {
            let changes = GradeChanges {
                subject,
                score,
                exam_date,
                exam_name,
            };
            let backend = Backend::connect(cli.snapshot, &config).await?;
            let updated = match &backend {
                Backend::Postgres(pool) => db::update_grade(pool, &id, &changes).await?,
                Backend::Snapshot(path) => {
                    let mut book = read_snapshot(path)?;
                    let updated = match book.update_grade(&id, changes) {
                        Ok(grade) => Some(grade.clone()),
                        Err(AnalyticsError::NotFound { .. }) => None,
                        Err(err) => return Err(err.into()),
                    };
                    write_snapshot(path, &book)?;
                    updated
                }
            };
            match updated {
                Some(grade) => print_json(&serde_json::json!({ "success": true, "grade": grade }))?,
                None => {
                    return report_error(&AnalyticsError::NotFound {
                        entity: "Grade",
                        id,
                    })
                }
            }
        }
        Commands::DeleteGrade { id } => {
            let backend = Backend::connect(cli.snapshot, &config).await?;
            let deleted = match &backend {
                Backend::Postgres(pool) => db::delete_grade(pool, &id).await?,
                Backend::Snapshot(path) => {
                    let mut book = read_snapshot(path)?;
                    let deleted = book.delete_grade(&id);
                    write_snapshot(path, &book)?;
                    deleted
                }
            };
            match deleted {
                Some(grade) => print_json(&serde_json::json!({ "success": true, "grade": grade }))?,
                None => {
                    return report_error(&AnalyticsError::NotFound {
                        entity: "Grade",
                        id,
                    })
                }
            }
        }
        Commands::Grades { class, exam } => {
            let book = Backend::connect(cli.snapshot, &config).await?.load().await?;
            match report::list_exam_grades(&book, &class, &exam) {
                Ok(grades) => print_json(&serde_json::json!({ "grades": grades }))?,
                Err(err) => return report_error(&err),
            }
        }
        Commands::ClassSummary {
            class,
            exam,
            format,
        } => {
            let book = Backend::connect(cli.snapshot, &config).await?.load().await?;
            return render(
                report::analyze_class(&book, &class, exam.as_deref()),
                format,
                report::render_class_markdown,
                Some(prompt::class_summary_prompt as fn(&_) -> String),
            );
        }
        Commands::Trend { student, format } => {
            let book = Backend::connect(cli.snapshot, &config).await?.load().await?;
            return render(
                report::analyze_student(&book, &student),
                format,
                report::render_trend_markdown,
                Some(prompt::student_advice_prompt as fn(&_) -> String),
            );
        }
        Commands::Compare {
            class,
            exam,
            format,
        } => {
            let book = Backend::connect(cli.snapshot, &config).await?.load().await?;
            return render(
                report::analyze_comparison(&book, &class, &exam),
                format,
                report::render_comparison_markdown,
                None,
            );
        }
        Commands::Correlate {
            class,
            subject1,
            subject2,
            format,
        } => {
            let book = Backend::connect(cli.snapshot, &config).await?.load().await?;
            return render(
                report::analyze_correlation(&book, &class, &subject1, &subject2),
                format,
                report::render_correlation_markdown,
                None,
            );
        }
        Commands::Export { out } => {
            let backend = Backend::connect(cli.snapshot, &config).await?;
            let book = db::load_snapshot(backend.pool()?).await?;
            write_snapshot(&out, &book)?;
            println!(
                "Exported {} classes, {} students, {} grades to {}.",
                book.classes.len(),
                book.students.len(),
                book.grades.len(),
                out.display()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
