// qbrank entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load roster data through the cache
// 4. Build profiles for the configured mode
// 5. Score every eligible player
// 6. Print the ranked table and the leader's clutch breakdown

use qbrank_app::cache::RosterCache;
use qbrank_app::config;
use qbrank_app::ingest;
use qbrank_app::report;
use qbrank_core::category::CategorySet;
use qbrank_core::composer::{clutch_details, compose_all};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("qbrank starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let mode = config.mode();
    let options = config.scoring_options();
    info!(
        "Config loaded: {:?}, playoffs {}",
        mode,
        if options.include_playoffs { "included" } else { "excluded" }
    );

    // 3. Load roster data
    let mut cache = RosterCache::with_ttl_minutes(config.cache.ttl_minutes);
    let data = cache
        .get_or_load(Utc::now(), || ingest::load_all(&config))
        .context("failed to load roster data")?;
    info!(
        "Loaded {} season rows, {} split rows, {} playoff rows",
        data.seasons.len(),
        data.splits.len(),
        data.playoffs.len()
    );

    // 4. Build profiles
    let profiles = ingest::build_profiles(data, mode);
    info!("Built {} player profiles", profiles.len());

    // 5. Score
    let categories = CategorySet::default();
    let scores = compose_all(&profiles, &config.weights, &categories, options)
        .context("failed to score roster")?;
    info!("Scored {} eligible players", scores.len());

    if scores.is_empty() {
        warn!("no players met the eligibility thresholds");
        println!("No eligible players for {mode:?}.");
        return Ok(());
    }

    // 6. Output
    print!("{}", report::render_rankings(&scores));

    if let Some(leader) = scores
        .first()
        .and_then(|s| profiles.iter().find(|p| p.player_id == s.player_id))
    {
        let details = clutch_details(leader, &profiles, &categories, options);
        println!();
        print!("{}", report::render_clutch(&leader.name, &details));
    }

    info!("qbrank finished");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("qbrank.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("qbrank=info,qbrank_app=info,qbrank_core=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
