mod bootstrap;
mod report;

use anyhow::{anyhow, Result};
use dashboard_core::settings::Settings;
use dashboard_data::export::export_records;
use dashboard_runtime::data_manager::DataManager;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Account dashboard v{} starting", env!("CARGO_PKG_VERSION"));

    // Bad criteria never reach the data.
    let criteria = settings.filter_criteria()?;
    let config = settings.pipeline_config()?;
    tracing::debug!(?criteria, ?config, "criteria resolved");
    settings.persist_last_used();

    let mut manager = DataManager::new(settings.cache_ttl, settings.data.clone(), config);
    let snapshot = match manager.get_snapshot(false) {
        Some(snapshot) => snapshot,
        None => {
            return Err(anyhow!(
                "could not load {}: {}",
                settings.data.display(),
                manager.last_error().unwrap_or("unknown error")
            ))
        }
    };
    tracing::info!(
        "Loaded {} records from {}",
        snapshot.metadata().records_loaded,
        settings.data.display()
    );

    let json = settings.output == "json";

    if settings.list_options {
        let options = snapshot.filter_options();
        if json {
            println!("{}", serde_json::to_string_pretty(&options)?);
        } else {
            print!("{}", report::render_options(&options));
        }
        return Ok(());
    }

    let view = snapshot.run(&criteria)?;

    if let Some(path) = &settings.export {
        export_records(path, &view.records)?;
        tracing::info!("Exported {} records to {}", view.records.len(), path.display());
    }

    if json {
        let document = serde_json::json!({
            "metadata": snapshot.metadata(),
            "aggregates": &view.aggregates,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", report::render_text(&view.aggregates, snapshot.metadata()));
    }

    Ok(())
}
