use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use manuscriptgen::core::config::Config;
use manuscriptgen::core::document::DocumentConfiguration;
use manuscriptgen::core::io::{NativeStorage, Storage};
use manuscriptgen::services::assist::{suggest_titles, suggest_variables};
use manuscriptgen::services::export::{export_document, ExportFormat};
use manuscriptgen::services::llm::{create_llm, LlmClient};
use manuscriptgen::services::pipeline::{Pipeline, PipelineOutcome};
use manuscriptgen::services::retry::RetryPolicy;
use manuscriptgen::services::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Load Config
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    // 2. Restore Session
    let storage: Arc<dyn Storage> = Arc::new(NativeStorage::new(&config.state_folder));
    let session = SessionStore::new(storage);
    let mut document = session.load_configuration().await.unwrap_or_else(|| {
        log::info!("No saved form state, starting from defaults");
        DocumentConfiguration::default()
    });

    // 3. Initialize LLM and fill in what the user left open
    let llm = create_llm(&config)?;
    let retry = config.llm.retry_policy();
    assist_form(&config, llm.as_ref(), retry, &mut document).await?;

    if let Err(e) = document.validate() {
        session.save_configuration(&document).await;
        eprintln!("Cannot generate yet: {}", e);
        eprintln!("Edit the saved form state in '{}' and run again.", config.state_folder);
        return Ok(());
    }

    let mode = document.mode();
    let mut chapters = session.chapter_list(mode).await;

    // 4. Run Pipeline
    let pb = ProgressBar::new(document.selected_chapters.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping after the current request");
                cancel.cancel();
            }
        }
    });

    let progress_bar = pb.clone();
    let pipeline = Pipeline::new(llm, retry)
        .with_cancellation(cancel.clone())
        .with_progress(move |p| {
            progress_bar.set_length(p.total as u64);
            progress_bar.set_position(p.index as u64);
            progress_bar.set_message(p.chapter.to_string());
        });

    let outcome = match pipeline.run(&document, &chapters).await {
        Ok(outcome) => outcome,
        Err(e) => {
            pb.abandon_with_message("Generation failed");
            log::error!("{}", e);
            session.save_configuration(&document).await;
            return Err(e.into());
        }
    };

    // 5. Record Result
    match outcome {
        PipelineOutcome::Document(result) => {
            pb.finish_with_message("Generation complete");
            session.record_generation(&document, &result).await;
            let path = export_document(
                &config.output_folder,
                &document.title,
                ExportFormat::Markdown,
                &result,
            )
            .await?;
            println!("Document written to {}", path.display());
            for source in &result.sources {
                println!("  - {} ({})", source.title(), source.uri());
            }
        }
        PipelineOutcome::ChapterTitleSuggestions(titles) => {
            pb.finish_and_clear();
            if titles.is_empty() {
                println!("No chapter titles were suggested.");
            } else if config.unattended || !mode.uses_editable_chapters() {
                println!("Suggested chapter titles:");
                for title in &titles {
                    println!("  - {}", title);
                }
            } else {
                let picked = Select::new("Add a suggested chapter:", titles).prompt()?;
                match session
                    .adopt_suggested_chapter(&mut document, &mut chapters, &picked)
                    .await
                {
                    Ok(name) => {
                        println!("Selected \"{}\" for the next run.", name);
                    }
                    Err(e) => eprintln!("Could not add chapter: {}", e),
                }
            }
        }
    }

    session.save_configuration(&document).await;
    Ok(())
}

/// Offers a title when only the topic is known, and fills in quantitative variables.
async fn assist_form(
    config: &Config,
    llm: &dyn LlmClient,
    retry: RetryPolicy,
    document: &mut DocumentConfiguration,
) -> Result<()> {
    if !config.unattended
        && document.title.trim().is_empty()
        && !document.topic_description.trim().is_empty()
    {
        match suggest_titles(llm, retry, document).await {
            Ok(titles) if !titles.is_empty() => {
                document.title = Select::new("Pick a title:", titles).prompt()?;
            }
            Ok(_) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    if document.variables.trim().is_empty() {
        match suggest_variables(llm, retry, document).await {
            Ok(Some(variables)) => {
                println!("Suggested variables: {}", variables);
                document.variables = variables;
            }
            Ok(None) => {}
            Err(e) => log::warn!("{}", e),
        }
    }
    Ok(())
}
