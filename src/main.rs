//! Thin CLI front end over the Olsen crates: `olsen index <root>` runs the
//! indexing pipeline, `olsen query <url-ish>` runs a filter bundle against
//! the catalog and prints a page of results plus facet counts. Neither
//! subcommand owns any business logic — both just wire CLI args onto the
//! library crates' public entry points.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use olsen_catalog::CatalogDb;
use olsen_indexer::IndexerConfig;
use olsen_search::url;

#[derive(Parser)]
#[command(name = "olsen", about = "Faceted photo catalog indexer and search engine")]
struct Cli {
    /// Path to the SQLite catalog file. Defaults to ~/.olsen/catalog.db.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a directory and index every supported photo into the catalog.
    Index {
        root: PathBuf,
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Recompute burst groups after indexing finishes.
        #[arg(long)]
        detect_bursts: bool,
    },
    /// Run a filter against the catalog and print matching photos.
    ///
    /// `url` accepts anything the URL mapper understands: a legacy short
    /// path (`/2024/06`, `/camera/Canon/EOS-R5`, `/bursts`) or a canonical
    /// query string (`year=2024&color=red`).
    Query {
        url: String,
        /// Also print per-dimension facet counts for the resulting bundle.
        #[arg(long)]
        facets: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let db = match &cli.catalog {
        Some(path) => CatalogDb::open(path).context("failed to open catalog")?,
        None => CatalogDb::open(CatalogDb::default_path()).context("failed to open catalog")?,
    };

    match cli.command {
        Command::Index { root, workers, detect_bursts } => run_index(&db, &root, workers, detect_bursts),
        Command::Query { url, facets } => run_query(&db, &url, facets),
    }
}

fn run_index(db: &CatalogDb, root: &PathBuf, workers: usize, detect_bursts: bool) -> Result<()> {
    let config = IndexerConfig {
        worker_count: workers,
        progress: Some(std::sync::Arc::new(|done, total| {
            log::info!("indexed {done}/{total}");
        })),
        ..Default::default()
    };

    let stats = olsen_indexer::index(root, db, &config)?;
    println!(
        "found {}, processed {}, updated {}, skipped {}, failed {}, thumbnails {} ({:.1}s, {:.1}/s)",
        stats.found,
        stats.processed,
        stats.updated,
        stats.skipped,
        stats.failed,
        stats.thumbnails_generated,
        stats.duration.as_secs_f64(),
        stats.rate,
    );

    if detect_bursts {
        let (groups, assignments) = olsen_burst::BurstDetector::scan(db)?;
        let group_count = groups.len();
        db.write_burst_groups(&groups, &assignments)?;
        println!("detected {group_count} burst groups across {} photos", assignments.len());
    }

    Ok(())
}

fn run_query(db: &CatalogDb, url_ish: &str, show_facets: bool) -> Result<()> {
    let (path, query) = match url_ish.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url_ish, ""),
    };
    let filter = url::apply_query_string(url::parse_path(path), query);

    let page = olsen_search::query::execute(db, &filter)?;
    println!("{} of {} photos (page url: {})", page.photos.len(), page.total, url::render(&filter));
    for photo in &page.photos {
        println!(
            "  {:>6}  {}  {}",
            photo.id,
            photo.date_taken.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".to_string()),
            photo.file_path
        );
    }
    if page.has_more {
        println!("  ... more available (use --offset/limit in the query string)");
    }

    if show_facets {
        let facets = olsen_search::facet::compute(db, &filter)?;
        print_facet("camera", &facets.camera);
        print_facet("lens", &facets.lens);
        print_facet("year", &facets.year);
        print_facet("month", &facets.month);
        print_facet("time of day", &facets.time_of_day);
        print_facet("season", &facets.season);
        print_facet("focal category", &facets.focal_category);
        print_facet("shooting condition", &facets.shooting_condition);
        print_facet("in burst", &facets.in_burst);
        print_facet("color", &facets.color);
    }

    for crumb in url::breadcrumbs(&filter) {
        print!("{} > ", crumb.label);
    }
    if !url::breadcrumbs(&filter).is_empty() {
        println!();
    }

    Ok(())
}

fn print_facet(label: &str, values: &[olsen_search::FacetValue]) {
    if values.is_empty() {
        return;
    }
    println!("{label}:");
    for v in values {
        let marker = if v.selected { "*" } else { " " };
        println!("  {marker} {} ({})", v.label, v.count);
    }
}
