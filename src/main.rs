use vecsearch::cli::{Cli, Commands, ConfigAction};
use vecsearch::config::Config;
use vecsearch::error::{Result, VecSearchError};
use vecsearch::service::VectorSearchService;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { batch_size, force } => {
            cmd_index(cli.config, batch_size, force)?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            cmd_search(cli.config, &query, limit, threshold, json)?;
        }
        Commands::Clear { force } => {
            cmd_clear(cli.config, force)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Debug => {
            cmd_debug(cli.config)?;
        }
        Commands::Import { file } => {
            cmd_import(cli.config, &file)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "vecsearch=debug"
    } else {
        "vecsearch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    Config::load(&path)
}

fn open_service(config_path: Option<std::path::PathBuf>) -> Result<VectorSearchService> {
    let config = load_config(config_path)?;
    VectorSearchService::open(config)
}

fn cmd_index(
    config_path: Option<std::path::PathBuf>,
    batch_size: Option<usize>,
    force: bool,
) -> Result<()> {
    let service = open_service(config_path)?;

    if force {
        println!("! Force mode enabled - reindexing all items");
    }
    println!("Indexing catalog...");

    let report = service.index_all(batch_size, force)?;

    if report.errors > 0 {
        println!(
            "! Indexing completed with {} errors. Indexed: {}/{} items",
            report.errors, report.indexed, report.total_items
        );
    } else {
        println!("✓ Indexing completed");
    }

    println!("  Total items:   {}", report.total_items);
    println!("  Indexed items: {}", report.indexed);
    println!("  Batch size:    {}", report.batch_size);
    println!("  Errors:        {}", report.errors);

    Ok(())
}

fn cmd_search(
    config_path: Option<std::path::PathBuf>,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let service = open_service(config_path)?;
    let results = service.search(query, limit, threshold)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&results).map_err(|e| VecSearchError::Json {
                source: e,
                context: "Failed to render search results".to_string(),
            })?;
        println!("{}", rendered);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for \"{}\"", query);
        return Ok(());
    }

    println!("✓ {} results for \"{}\":", results.len(), query);
    for (rank, result) in results.iter().enumerate() {
        let mut text = result.content_text.clone();
        if text.chars().count() > 60 {
            text = text.chars().take(60).collect::<String>() + "...";
        }
        println!(
            "  {:>2}. [{:.3}] {}  ({})",
            rank + 1,
            result.similarity,
            text,
            result.item_id
        );
    }

    Ok(())
}

fn cmd_clear(config_path: Option<std::path::PathBuf>, force: bool) -> Result<()> {
    let service = open_service(config_path)?;

    let count = service.indexed_count()?;
    if count == 0 {
        println!("✓ No embedding records to clear");
        return Ok(());
    }

    if !force {
        println!(
            "! This will delete {} embedding records. Continue? [y/N]",
            count
        );
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(|e| VecSearchError::Io {
                source: e,
                context: "Failed to read confirmation".to_string(),
            })?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Operation cancelled");
            return Ok(());
        }
    }

    let deleted = service.clear_all()?;
    println!("✓ Deleted {} embedding records", deleted);
    println!("  Run 'vecsearch index' to rebuild the index");

    Ok(())
}

fn cmd_status(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let service = open_service(config_path)?;
    let status = service.status()?;

    println!("Vector search status");
    println!(
        "  Provider:      {}",
        if status.provider_healthy {
            "✓ healthy"
        } else {
            "✗ unreachable"
        }
    );
    println!("  Backend:       {}", status.backend);
    println!("  Model:         {}", status.model);
    println!("  Catalog items: {}", status.total_items);
    println!("  Indexed items: {}", status.indexed_items);

    Ok(())
}

fn cmd_debug(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let service = open_service(config_path)?;
    let debug = service.debug_info()?;

    println!("Storage engine diagnostics");
    println!("  Engine version:   {}", debug.engine_version);
    println!("  Required version: {} (binary vector backend)", debug.min_vector_version);
    println!("  Backend:          {}", debug.backend);
    println!("  Model:            {}", debug.model);
    println!("  Dimension:        {}", debug.dimension);
    println!(
        "  Distance fn:      {}",
        if debug.distance_function_ok {
            "✓ working"
        } else {
            "✗ failed self-check"
        }
    );

    if debug.backend == "json" {
        println!("! Engine below required version; using JSON fallback (in-process scan)");
    }

    Ok(())
}

fn cmd_import(config_path: Option<std::path::PathBuf>, file: &std::path::Path) -> Result<()> {
    let service = open_service(config_path)?;

    let content = std::fs::read_to_string(file).map_err(|e| VecSearchError::Io {
        source: e,
        context: format!("Failed to read item file: {:?}", file),
    })?;
    let items = vecsearch::catalog::items_from_json(&content)?;
    let imported = service.import_items(&items)?;

    println!("✓ Imported {} items", imported);
    println!("  Run 'vecsearch index' to embed them");

    Ok(())
}

fn cmd_config(config_path: Option<std::path::PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let rendered = toml::to_string_pretty(&config)?;
            println!("{}", rendered);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("! Config already exists at {:?} (use --force to overwrite)", path);
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Wrote default configuration to {:?}", path);
        }
    }

    Ok(())
}
