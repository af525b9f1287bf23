mod ui;

use color_eyre::eyre::{eyre, Result};
use insight_diary::analysis::build_engine;
use insight_diary::config::ConfigLoader;
use insight_diary::entry_store::EntryStore;
use insight_diary::error::DiaryError;
use insight_diary::logging;
use insight_diary::orchestrator::AnalysisOrchestrator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use ui::{Action, UI};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::load_from(Path::new(&path)),
        None => ConfigLoader::load(),
    }
    .map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    let _log_guard = logging::init(&config.logging)?;
    info!(storage = %config.storage.path.display(), "starting diary");

    let store = Arc::new(EntryStore::open(&config.storage.path));
    if let Err(e) = store.list().await {
        return Err(eyre!("Failed to load diary: {}", e));
    }

    let engine = build_engine(&config.engine);
    info!(engine = engine.name(), "analysis engine ready");
    let orchestrator = Arc::new(AnalysisOrchestrator::new(store.clone(), engine));
    let status = orchestrator.subscribe();

    let mut ui = UI::new()?;

    loop {
        let entries = match store.list().await {
            Ok(entries) => entries,
            Err(e) => {
                report(&mut ui, &e);
                Vec::new()
            }
        };
        let snapshot = status.borrow().clone();
        ui.display(&entries, &snapshot)?;

        let Some(action) = ui.handle_input(&entries)? else {
            continue;
        };

        let outcome = match action {
            Action::Write => match ui.get_new_entry()? {
                Some(draft) => store.create(draft).await.map(|_| ()),
                None => Ok(()),
            },
            Action::View => {
                ui.view_entries(&entries)?;
                Ok(())
            }
            Action::Edit => match ui.select_entry(&entries, "Select Entry to Edit")? {
                Some(entry) => {
                    let patch = ui.edit_entry(&entry)?;
                    store.update(entry.id, patch).await.map(|_| ())
                }
                None => Ok(()),
            },
            Action::Delete => match ui.select_entry(&entries, "Select Entry to Delete")? {
                Some(entry) => store.delete(entry.id).await,
                None => Ok(()),
            },
            Action::Search => {
                let query = ui.get_search_query()?;
                if query.is_empty() {
                    Ok(())
                } else {
                    match store.search(&query).await {
                        Ok(results) => {
                            ui.display_search_results(&results)?;
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
            }
            Action::Analyze => {
                if status.borrow().is_running() {
                    Err(DiaryError::AlreadyRunning)
                } else {
                    if let Some(entry) = ui.select_entry(&entries, "Select Entry to Analyze")? {
                        let orchestrator = orchestrator.clone();
                        tokio::spawn(async move {
                            // failures are published through the status channel
                            if let Err(e) = orchestrator.analyze(entry.id).await {
                                debug!(entry_id = %entry.id, error = %e, "background analysis ended with error");
                            }
                        });
                    }
                    Ok(())
                }
            }
            Action::Quit => break,
        };

        if let Err(e) = outcome {
            report(&mut ui, &e);
        }
    }

    info!("diary closed");
    Ok(())
}

fn report(ui: &mut UI, e: &DiaryError) {
    error!(error = %e, "diary operation failed");
    ui.notify(e.user_message());
}
