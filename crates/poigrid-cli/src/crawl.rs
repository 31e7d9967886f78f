//! `crawl` and `grid` command handlers.
//!
//! The run is audited in `crawl_runs`, but audit writes are best effort: a
//! crawl never fails because its bookkeeping row could not be updated.

use std::sync::Arc;

use poigrid_core::{AppConfig, CrawlProfile, PlanConfig};
use poigrid_scraper::{
    BatchWriter, CrawlReport, CrawlSettings, Crawler, FetchSettings, PlacesClient, RequestBudget,
    ResilientFetcher, TokioSleeper,
};

/// Tiles listed by `grid` before the output is truncated.
const MAX_LISTED_TILES: usize = 2_000;

/// Prints the tile plan for `profile`; with `list_tiles` every tile too.
///
/// # Errors
///
/// Returns an error if the profile's grid cannot be generated.
pub(crate) fn print_grid(
    profile: &CrawlProfile,
    max_pages: u32,
    list_tiles: bool,
) -> anyhow::Result<()> {
    let step = profile.step_meters();
    let (rows, cols) = poigrid_scraper::grid_dimensions(&profile.bbox, step)?;
    let tiles = poigrid_scraper::generate_grid(&profile.bbox, step)?;
    let pairs = tiles.len() * profile.keywords.len();

    println!("location:   {}", profile.location_label);
    println!(
        "bbox:       lat {}..{}  lng {}..{}",
        profile.bbox.min_lat, profile.bbox.max_lat, profile.bbox.min_lng, profile.bbox.max_lng
    );
    println!("radius:     {} m, step {step} m", profile.radius_m);
    println!("grid:       {rows} rows x {cols} cols = {} tiles", tiles.len());
    println!("keywords:   {}", profile.keywords.len());
    println!("pairs:      {pairs}");
    println!(
        "worst case: {} requests at {max_pages} page(s) per pair",
        pairs as u64 * u64::from(max_pages)
    );

    if list_tiles {
        for (i, tile) in tiles.iter().take(MAX_LISTED_TILES).enumerate() {
            println!("{:>6}  {}", i, tile.as_query_param());
        }
        if tiles.len() > MAX_LISTED_TILES {
            println!("... {} more", tiles.len() - MAX_LISTED_TILES);
        }
    }

    Ok(())
}

/// Prints the plan `crawl` would execute. Reads only the profile, so no
/// credentials are needed.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded or gridded.
pub(crate) fn dry_run(plan: &PlanConfig) -> anyhow::Result<()> {
    let profile = poigrid_core::load_crawl_profile(&plan.crawl_path)?;
    println!("dry-run: no requests will be sent");
    print_grid(&profile, plan.max_pages_per_tile, false)
}

/// Run one crawl of the configured profile into Postgres.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded, the database or the
/// search client cannot be set up, or the grid is invalid. Fetch and sink
/// failures during the crawl are counted, not propagated.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    budget_override: Option<u64>,
) -> anyhow::Result<()> {
    let profile = poigrid_core::load_crawl_profile(&config.crawl_path)?;

    let budget_limit = budget_override.unwrap_or(config.request_budget);

    let client = PlacesClient::new(
        &config.places_base_url,
        &config.places_api_key,
        config.request_timeout_secs,
        &config.user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build places client: {e}"))?;

    let pool_config = poigrid_db::PoolConfig::from_app_config(config);
    let pool = poigrid_db::connect_pool(&config.database_url, pool_config).await?;

    let run_id = match poigrid_db::create_crawl_run(
        &pool,
        &profile.location_label,
        "cli",
        budget_limit,
    )
    .await
    {
        Ok(run) => Some(run.id),
        Err(e) => {
            tracing::warn!(error = %e, "could not record crawl run; continuing without audit row");
            None
        }
    };

    let budget = Arc::new(RequestBudget::new(budget_limit));
    let fetcher = ResilientFetcher::new(
        client,
        TokioSleeper,
        Arc::clone(&budget),
        FetchSettings::from_config(config, &profile),
    );
    let writer = BatchWriter::new(poigrid_db::PgRowSink::new(pool.clone()), config.batch_size);
    let crawler = Crawler::new(fetcher, writer, CrawlSettings::from_config(config));

    match crawler.run(&profile).await {
        Ok(report) => {
            if let Some(id) = run_id {
                if let Err(e) =
                    poigrid_db::complete_crawl_run(&pool, id, report.status, &report.counters).await
                {
                    tracing::error!(run_id = id, error = %e, "failed to record crawl result");
                }
            }
            print_report(&report, &budget);
            Ok(())
        }
        Err(e) => {
            if let Some(id) = run_id {
                fail_run_best_effort(&pool, id, format!("{e:#}")).await;
            }
            Err(e.into())
        }
    }
}

fn print_report(report: &CrawlReport, budget: &RequestBudget) {
    let c = &report.counters;
    println!("status:            {}", report.status);
    println!(
        "requests:          {} / {} budget",
        budget.used(),
        budget.limit()
    );
    println!(
        "tile calls:        {} of {} pairs",
        c.tile_calls,
        report.tiles * report.keywords
    );
    println!("rows found (raw):  {}", c.rows_found_raw);
    println!("rows unique:       {}", c.rows_found_unique);
    println!("rows inserted:     {}", c.rows_inserted);
    println!("rows failed:       {}", c.rows_failed);
    println!("partial fetches:   {}", c.partial_fetches);
    println!("elapsed:           {:.1}s", report.elapsed.as_secs_f64());
    for sample in &report.failed_samples {
        println!("  failure: {sample}");
    }
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = poigrid_db::fail_crawl_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark crawl run as failed"
        );
    }
}
