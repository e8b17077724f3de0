//! valais-energy entry point: CLI wiring, logging setup, import, report and serve.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use valais_energy::aggregate::Aggregator;
use valais_energy::config::AppConfig;
use valais_energy::estimator::RooftopEstimator;
use valais_energy::io::import::import_csv;
use valais_energy::store::{ProductionStore, SqliteStore};

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<PathBuf>,
    database_override: Option<PathBuf>,
    import_paths: Vec<PathBuf>,
    verbose: bool,
    init_config: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port_override: Option<u16>,
}

fn print_help() {
    eprintln!("valais-energy: renewable production estimates for Valais");
    eprintln!();
    eprintln!("Usage: valais-energy [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load configuration from TOML file");
    eprintln!("  --database <path>        Override the SQLite database path");
    eprintln!("  --import <path>          Import yearly production CSV (repeatable)");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start the REST API server");
        eprintln!("  --port <u16>             Override the API server port");
    }
    eprintln!("  --init-config            Print the default configuration and exit");
    eprintln!("  --verbose, -v            Debug logging (RUST_LOG takes precedence)");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("Without --serve, prints the production chart, PV series and breakdown.");
}

fn required_value(args: &[String], i: usize, flag: &str, kind: &str) -> String {
    match args.get(i) {
        Some(value) => value.clone(),
        None => {
            eprintln!("error: {flag} requires a {kind} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        database_override: None,
        import_paths: Vec::new(),
        verbose: false,
        init_config: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port_override: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(required_value(&args, i, "--config", "path").into());
            }
            "--database" => {
                i += 1;
                cli.database_override =
                    Some(required_value(&args, i, "--database", "path").into());
            }
            "--import" => {
                i += 1;
                cli.import_paths
                    .push(required_value(&args, i, "--import", "path").into());
            }
            "--verbose" | "-v" => cli.verbose = true,
            "--init-config" => cli.init_config = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let value = required_value(&args, i, "--port", "u16");
                if let Ok(p) = value.parse::<u16>() {
                    cli.port_override = Some(p);
                } else {
                    eprintln!("error: --port value \"{value}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &CliArgs) -> Result<AppConfig> {
    let mut config = match cli.config_path {
        Some(ref path) => AppConfig::from_toml_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(ref path) = cli.database_override {
        config.database.path = path.clone();
    }
    #[cfg(feature = "api")]
    if let Some(port) = cli.port_override {
        config.server.port = port;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("invalid configuration ({} error(s))", errors.len());
    }
    Ok(config)
}

fn print_report(store: &SqliteStore, config: &AppConfig) -> Result<()> {
    let aggregator = Aggregator::new(store, RooftopEstimator, &config.aggregation);

    let chart = aggregator
        .build_production_chart()
        .context("building production chart")?;
    println!("{chart}");

    let pv = aggregator
        .build_pv_series()
        .context("building photovoltaic series")?;
    println!("\n{pv}");

    match aggregator.build_production_breakdown() {
        Ok(breakdown) => println!("\n{breakdown}"),
        Err(e) => println!("\nNo breakdown available: {e}"),
    }

    match store
        .max_registration_number()
        .context("reading registration numbers")?
    {
        Some(number) => println!("\nLatest registration number: {number}"),
        None => println!("\nNo installation registered yet"),
    }
    Ok(())
}

#[cfg(feature = "api")]
fn run_server(store: SqliteStore, config: AppConfig) -> Result<()> {
    use std::net::{IpAddr, SocketAddr};
    use std::sync::Arc;

    use valais_energy::api::{AppState, serve};
    use valais_energy::workflow::MemorySessionStore;

    let ip: IpAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address \"{}\"", config.server.bind))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let state = Arc::new(AppState::new(
        Box::new(store),
        Box::new(MemorySessionStore::new()),
        config.aggregation,
    ));

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(serve(state, addr))
        .with_context(|| format!("serving API on {addr}"))
}

fn run(cli: CliArgs) -> Result<()> {
    if cli.init_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let db_path: &Path = &config.database.path;
    let store = SqliteStore::open(db_path)
        .with_context(|| format!("opening database \"{}\"", db_path.display()))?;
    info!(database = %db_path.display(), "store opened");

    for path in &cli.import_paths {
        import_csv(&store, path).with_context(|| format!("importing \"{}\"", path.display()))?;
    }

    #[cfg(feature = "api")]
    if cli.serve {
        return run_server(store, config);
    }

    print_report(&store, &config)
}

fn main() {
    let cli = parse_args();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
