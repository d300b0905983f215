pub mod application;
pub mod domain;
pub mod infrastructure;

use application::site::generate_site;
use infrastructure::error::InfraError;
use std::path::PathBuf;

pub fn run() -> Result<(), InfraError> {
    let workspace_root = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir()?,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(generate_site(&workspace_root))?;

    println!(
        "wrote {} files ({} days, {} months, {} quests, {} heatmaps) under {}",
        summary.files_written,
        summary.dates.len(),
        summary.months.len(),
        summary.quests.len(),
        summary.heatmaps_drawn,
        workspace_root.display()
    );
    Ok(())
}
