use clap::Parser;
use permafrost_core::{
    Celsius, Column, ColumnSetup, ForcingInterval, GiplResult, HeatFlux, IntervalResults,
    MaterialCatalog, Meters, SnowSpec, SoilLayerSpec, SolverConfig, DEFAULT_GEOTHERMAL_HEAT_FLUX,
};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Permafrost column demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "permafrost-demo")]
#[command(about = "Soil temperature under a freezing air-temperature ramp", long_about = None)]
struct Args {
    /// Number of simulated days
    #[arg(short, long, default_value_t = 30)]
    days: usize,

    /// Air temperature on the first day in °C
    #[arg(long, default_value_t = 2.0, allow_hyphen_values = true)]
    start_temperature: f64,

    /// Air temperature on the last day in °C
    #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
    end_temperature: f64,

    /// Layer type of the single soil layer
    #[arg(short, long, default_value = "MineralSoil")]
    layer_type: String,

    /// Soil nodes in the layer
    #[arg(short, long, default_value_t = 10)]
    nodes: usize,

    /// Depth of the column in meters
    #[arg(long, default_value_t = 1.0)]
    depth: f64,

    /// Initial soil temperature in °C
    #[arg(long, default_value_t = 2.0, allow_hyphen_values = true)]
    initial_temperature: f64,

    /// Initial volumetric water content (m³/m³)
    #[arg(long, default_value_t = 0.4)]
    water_content: f64,

    /// Constant snow thickness in meters (0 = no snow)
    #[arg(long, default_value_t = 0.0)]
    snow: f64,

    /// Geothermal heat flux in W/m² (the catalog value otherwise)
    #[arg(long)]
    geothermal_flux: Option<f64>,

    /// Properties file with layer types (built-in presets otherwise)
    #[arg(short, long)]
    properties: Option<PathBuf>,

    /// Column setup as JSON (replaces the single-layer options)
    #[arg(long)]
    setup: Option<PathBuf>,

    /// Forcing interval as JSON (replaces the ramp options)
    #[arg(long)]
    forcing: Option<PathBuf>,

    /// Write daily profiles to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Report every N days
    #[arg(short, long, default_value_t = 5)]
    report_interval: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn ramp_setup(args: &Args) -> ColumnSetup {
    ColumnSetup {
        snow: if args.snow > 0.0 {
            SnowSpec {
                nodes: 10,
                max_thickness: Meters::new((2.0 * args.snow).max(1.0)),
                initial_temperature: Celsius::new(args.start_temperature.min(0.0)),
            }
        } else {
            SnowSpec::default()
        },
        soil_layers: vec![SoilLayerSpec {
            layer_type: args.layer_type.clone(),
            nodes: args.nodes,
            max_depth: Meters::new(args.depth),
            initial_temperature: Celsius::new(args.initial_temperature),
            initial_water_content: args.water_content,
        }],
        porosity_profile: None,
        output_depths: None,
        geothermal_heat_flux: args.geothermal_flux.map(HeatFlux::from),
        solver: SolverConfig::default(),
    }
}

fn ramp_forcing(args: &Args) -> ForcingInterval {
    let last = args.days.saturating_sub(1).max(1) as f64;
    let air = (0..args.days).map(|d| {
        args.start_temperature + (args.end_temperature - args.start_temperature) * d as f64 / last
    });
    let mut forcing = ForcingInterval::air_only(air);
    if args.snow > 0.0 {
        forcing.snow_thickness = vec![Meters::new(args.snow)];
        forcing.snow_conductivity = vec![0.2];
        forcing.snow_heat_capacity = vec![0.5e6];
    }
    forcing
}

fn write_csv(path: &PathBuf, depths: &[f64], results: &IntervalResults) -> std::io::Result<()> {
    let mut text = String::from("day");
    for z in depths {
        let _ = write!(text, ",{z:.3}");
    }
    text.push('\n');
    for (day, profile) in results.daily_profiles.iter().enumerate() {
        let _ = write!(text, "{day}");
        for t in profile {
            let _ = write!(text, ",{t:.4}");
        }
        text.push('\n');
    }
    fs::write(path, text)
}

fn run(args: &Args) -> Result<(), String> {
    let catalog = match &args.properties {
        Some(path) => MaterialCatalog::load(path),
        None => MaterialCatalog::presets(
            args.geothermal_flux.unwrap_or(DEFAULT_GEOTHERMAL_HEAT_FLUX),
        ),
    }
    .map_err(|e| e.to_string())?
    .into_shared();
    println!(
        "Layer types: {}",
        catalog.names().collect::<Vec<_>>().join(", ")
    );

    let setup = match &args.setup {
        Some(path) => read_json(path)?,
        None => ramp_setup(args),
    };
    let forcing = match &args.forcing {
        Some(path) => read_json(path)?,
        None => ramp_forcing(args),
    };

    let build_and_run = || -> GiplResult<(Column, IntervalResults)> {
        let mut column = Column::new("demo", catalog.clone(), &setup)?;
        let results = column.run_interval(&forcing)?;
        Ok((column, results))
    };
    let (column, results) = build_and_run().map_err(|e| e.to_string())?;

    let depths = column.soil_depths();
    let mid = depths.len() / 2;
    println!(
        "\nColumn: {} soil nodes down to {:.2} m, geothermal flux {} W/m²",
        depths.len(),
        depths[depths.len() - 1],
        column.geothermal_heat_flux()
    );
    println!(
        "\n{:>5} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "day", "air", "surface", format!("{:.2} m", depths[mid]), "bottom", "front"
    );

    let interval = args.report_interval.max(1);
    for (day, profile) in results.daily_profiles.iter().enumerate() {
        if day % interval != 0 && day + 1 != results.days() {
            continue;
        }
        let front = results.daily_front_depth[day]
            .map_or_else(|| "-".to_string(), |z| format!("{z:.3} m"));
        println!(
            "{:>5} {:>8.2} {:>10.3} {:>10.3} {:>10.3} {:>10}",
            day,
            forcing.surface_temperature(day as f64 + 1.0),
            profile[0],
            profile[mid],
            profile[profile.len() - 1],
            front
        );
    }

    println!(
        "\nSolver: {} steps, {} rejected, {} iterations",
        results.stats.accepted_steps, results.stats.rejected_steps, results.stats.iterations
    );
    println!("Average profile:");
    for (z, t) in depths.iter().zip(&results.average_profile) {
        println!("  {z:>7.3} m  {t:>8.3} °C");
    }

    if let Some(path) = &args.csv {
        write_csv(path, &depths, &results).map_err(|e| format!("{}: {e}", path.display()))?;
        println!("\nDaily profiles written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    println!("=== Permafrost Column Demo ===\n");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}
