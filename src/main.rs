/// Print the review dashboard for the built-in mock reports.
fn main() {
    use hazard_review::{
        InMemoryReportRepository, LifecycleController, ReviewConfig, SystemClock, sample_data,
    };

    let loaded = ReviewConfig::load_or_init_default();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    if let Err(e) = &loaded {
        log::warn!("Using default configuration: {}", e);
    }

    let repository = InMemoryReportRepository::with_reports(sample_data::mock_reports());
    let mut controller = match LifecycleController::new(repository, SystemClock, config) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = controller.track_all() {
        eprintln!("Failed to load reports: {}", e);
        std::process::exit(1);
    }

    let rows = controller.dashboard();
    log::info!("Tracking {} reports", rows.len());
    match serde_json::to_string_pretty(&rows) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render dashboard: {}", e),
    }
}
