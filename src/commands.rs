use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Confirm;
use std::path::Path;
use tracing::info;

use crate::App;
use crate::database::CatalogIndex;
use crate::indexer::{DocumentOutcome, IngestOptions};
use crate::retrieval::RetrievalRequest;
use crate::tools::course::format_outline;

/// Ingest a single course document or every document in a folder
#[inline]
pub async fn ingest(app: &App, path: &Path, skip_existing: bool) -> Result<()> {
    if path.is_dir() {
        let report = app
            .indexer()
            .ingest_folder(path, IngestOptions { skip_existing })
            .await
            .with_context(|| format!("Failed to ingest folder {}", path.display()))?;

        for document in &report.documents {
            let name = document.path.display();
            match &document.outcome {
                DocumentOutcome::Ingested(course) => println!(
                    "{} {} ({} lessons, {} chunks)",
                    style("✓").green(),
                    course.title,
                    course.lesson_count,
                    course.chunk_count
                ),
                DocumentOutcome::SkippedExisting { title } => {
                    println!("{} {} (already indexed)", style("-").dim(), title);
                }
                DocumentOutcome::Unsupported => {
                    println!("{} {} (unsupported format)", style("-").dim(), name);
                }
                DocumentOutcome::Failed { error } => {
                    println!("{} {}: {}", style("✗").red(), name, error);
                }
            }
        }

        println!();
        println!(
            "Ingested {} courses ({} chunks), {} failed",
            report.ingested().count(),
            report.total_chunks(),
            report.failures().count()
        );
    } else {
        let course = app
            .indexer()
            .ingest_file(path)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        println!(
            "{} {} ({} lessons, {} chunks)",
            style("✓").green(),
            course.title,
            course.lesson_count,
            course.chunk_count
        );
    }

    Ok(())
}

/// Run a content search and print ranked results with their sources
#[inline]
pub async fn search(
    app: &App,
    query: String,
    course: Option<String>,
    lesson: Option<u32>,
    limit: Option<usize>,
) -> Result<()> {
    let request = RetrievalRequest {
        query,
        course_name: course,
        lesson_number: lesson,
        limit,
    };

    let retrieval = app.coordinator().retrieve(&request).await?;

    if let Some(title) = &retrieval.resolved_course {
        println!("Course: {}", style(title).cyan());
        println!();
    }

    if retrieval.is_empty() {
        println!("No relevant content found.");
        return Ok(());
    }

    for (result, source) in retrieval.results.iter().zip(&retrieval.sources) {
        println!(
            "{}. {} {}",
            result.rank,
            style(&source.label).bold(),
            style(format!("(distance {:.4})", result.distance)).dim()
        );
        if let Some(link) = &source.link {
            println!("   {}", style(link).underlined());
        }
        println!("   {}", result.content);
        println!();
    }

    Ok(())
}

#[inline]
pub async fn outline(app: &App, course: &str) -> Result<()> {
    let course = app.coordinator().outline(course).await?;
    println!("{}", format_outline(&course));
    Ok(())
}

/// List indexed courses
#[inline]
pub async fn list_courses(app: &App) -> Result<()> {
    let analytics = app.indexer().analytics().await?;

    if analytics.total_courses == 0 {
        println!("No courses have been indexed yet.");
        println!("Use 'course-rag ingest <path>' to add course documents.");
        return Ok(());
    }

    println!("Courses ({} total):", analytics.total_courses);
    for title in &analytics.course_titles {
        println!("  📚 {}", title);
    }
    println!();
    println!("Content chunks: {}", analytics.total_chunks);

    Ok(())
}

/// Delete a course by exact title
#[inline]
pub async fn delete_course(app: &App, title: &str, yes: bool) -> Result<()> {
    if app.catalog().get(title).await?.is_none() {
        bail!("Course not found: {}", title);
    }

    if !yes && !confirm(&format!("Delete course '{}' and all of its content?", title))? {
        println!("Nothing deleted.");
        return Ok(());
    }

    app.indexer().delete_course(title).await?;
    println!("{} Deleted course: {}", style("✓").green(), title);
    Ok(())
}

/// Remove every course from both indices
#[inline]
pub async fn clear(app: &App, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete all indexed courses?")? {
        println!("Nothing deleted.");
        return Ok(());
    }

    app.indexer().clear().await?;
    info!("Cleared all course data");
    println!("{} All courses deleted", style("✓").green());
    Ok(())
}

/// Execute a model-facing tool with JSON arguments and print its output
#[inline]
pub async fn run_tool(app: &App, name: &str, arguments: Option<&str>) -> Result<()> {
    let arguments = match arguments {
        Some(raw) => serde_json::from_str(raw).context("Tool arguments must be valid JSON")?,
        None => serde_json::json!({}),
    };

    let registry = app.tool_registry();
    if !registry.contains(name) {
        let available: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        bail!(
            "Unknown tool '{}'. Available tools: {}",
            name,
            available.join(", ")
        );
    }

    let output = registry.execute(name, arguments).await?;
    if output.is_error {
        println!("{}", style(&output.text).red());
    } else {
        println!("{}", output.text);
    }

    let sources = registry.last_sources();
    if !sources.is_empty() {
        println!();
        println!("{}", style("Sources:").bold());
        for source in &sources {
            match &source.link {
                Some(link) => println!("  {} <{}>", source.label, link),
                None => println!("  {}", source.label),
            }
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    if !console::user_attended() {
        bail!("Refusing to delete without confirmation; pass --yes");
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
