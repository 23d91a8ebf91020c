//! Atmospheric profile command-line tool.
//!
//! Creates a profile from a registered source, runs the configured
//! transformations and writes the result as a JSON document.

mod altitudes;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use atmo_profile::{
    identifiers, make, write_dataset, InterpKind, MakeConfig, Params, RegularizeOptions, ZStep,
};
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "atmo-profile")]
#[command(about = "Create atmospheric thermophysical profiles")]
struct Args {
    /// Profile identifier
    #[arg(short, long, required_unless_present = "list")]
    identifier: Option<String>,

    /// Profile constructor parameter (key=value), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Output file
    #[arg(short, long, default_value = "profile.json")]
    file_name: PathBuf,

    /// Altitude grid file, one value per line
    #[arg(short, long)]
    altitudes: Option<PathBuf>,

    /// Units of the altitude grid file
    #[arg(long, default_value = "km")]
    altitude_units: String,

    /// Pressure interpolation method
    #[arg(short = 'p', long)]
    p_interp_method: Option<InterpKind>,

    /// Temperature interpolation method
    #[arg(short = 't', long)]
    t_interp_method: Option<InterpKind>,

    /// Number density interpolation method
    #[arg(short = 'n', long)]
    n_interp_method: Option<InterpKind>,

    /// Mole fraction interpolation method (all molecules)
    #[arg(short = 'x', long)]
    x_interp_method: Option<InterpKind>,

    /// Represent the profile in altitude cells
    #[arg(short = 's', long)]
    represent_in_cells: bool,

    /// Conserve column number densities when interpolating
    #[arg(long)]
    conserve_column: bool,

    /// Molecules to keep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    molecules: Vec<String>,

    /// Regularize the altitude grid
    #[arg(long)]
    regularize: bool,

    /// Number of points of the regular grid
    #[arg(long, conflicts_with = "zstep")]
    num: Option<usize>,

    /// Step of the regular grid ("auto" or a quantity such as "0.5 km")
    #[arg(long)]
    zstep: Option<ZStep>,

    /// Target amount (MOLECULE=QUANTITY), repeatable
    #[arg(long, value_name = "M=QTY")]
    rescale_to: Vec<String>,

    /// Check that mole fractions never sum above one
    #[arg(long)]
    check_x_sum: bool,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// List registered profile identifiers and exit
    #[arg(long)]
    list: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    if args.list {
        for identifier in identifiers() {
            println!("{}", identifier);
        }
        return Ok(());
    }

    run(&args)
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), log_level);
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, otherwise the `--log-level` flag.
fn log_filter(directives: Option<String>, log_level: &str) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(log_level))
}

fn run(args: &Args) -> Result<()> {
    let identifier = args
        .identifier
        .as_deref()
        .ok_or_else(|| anyhow!("a profile identifier is required"))?;
    let config = build_config(args)?;
    let params = parse_params(&args.params)?;
    debug!(?params, "constructor parameters");

    let z = match &args.altitudes {
        Some(path) => Some(altitudes::read_altitudes(path, &args.altitude_units)?),
        None => None,
    };

    let ds = make(identifier, z.as_ref(), &params, &config)?;
    write_dataset(&ds, &args.file_name)
        .with_context(|| format!("cannot write '{}'", args.file_name.display()))?;
    info!(
        identifier,
        path = %args.file_name.display(),
        points = ds.len(),
        molecules = ?ds.molecules(),
        "profile written"
    );
    Ok(())
}

/// Environment, then the YAML file, then command-line flags.
fn build_config(args: &Args) -> Result<MakeConfig> {
    let mut config = MakeConfig::from_env();
    if let Some(path) = &args.config {
        config = config.with_yaml_file(path)?;
    }

    let methods = [
        ("p", args.p_interp_method),
        ("t", args.t_interp_method),
        ("n", args.n_interp_method),
        ("x", args.x_interp_method),
    ];
    for (var, kind) in methods {
        if let Some(kind) = kind {
            config.interp_method.set(var, kind);
        }
    }

    if args.conserve_column {
        config.conserve_column = true;
    }
    if args.represent_in_cells {
        config.represent_in_cells = true;
    }
    if args.check_x_sum {
        config.check_mole_fraction_sum = true;
    }
    if !args.molecules.is_empty() {
        config.molecules = Some(args.molecules.clone());
    }

    if args.regularize || args.num.is_some() || args.zstep.is_some() {
        config.regularize = Some(RegularizeOptions {
            num: args.num,
            zstep: args.zstep.clone(),
        });
    }

    for item in &args.rescale_to {
        let (m, amount) = split_key_value(item)?;
        config.rescale_to.insert(m.to_string(), amount.to_string());
    }

    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn parse_params(items: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for item in items {
        let (key, value) = split_key_value(item)?;
        params.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}

fn split_key_value(item: &str) -> Result<(&str, &str)> {
    let (key, value) = item
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", item))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(anyhow!("expected KEY=VALUE, got '{}'", item));
    }
    Ok((key, value))
}
