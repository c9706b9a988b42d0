use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use morph_sim::{
    report, Axis, CorrelationMethod, GrowthPreference, Label, Morphology, MorphologyError, Parameters,
    PathAlgorithm, Result, SwapConfig,
};

#[derive(Parser)]
#[command(name = "opv-morph")]
#[command(about = "Generate and characterize phase-separated lattice morphologies")]
#[command(version)]
struct Cli {
    /// Lattice length (x)
    #[arg(long, default_value_t = 50)]
    length: usize,

    /// Lattice width (y)
    #[arg(long, default_value_t = 50)]
    width: usize,

    /// Lattice height (z)
    #[arg(long, default_value_t = 50)]
    height: usize,

    /// Use hard boundaries along z
    #[arg(long)]
    non_periodic_z: bool,

    /// Fraction of PRIMARY sites
    #[arg(long, default_value_t = 0.5)]
    mix_fraction: f64,

    /// Interaction energy of PRIMARY sites
    #[arg(long, default_value_t = 0.4)]
    energy1: f64,

    /// Interaction energy of SECONDARY sites
    #[arg(long, default_value_t = 0.4)]
    energy2: f64,

    /// Monte Carlo steps per morphology
    #[arg(short = 's', long, default_value_t = 200)]
    mc_steps: usize,

    /// Enable the third-neighbor interaction shell
    #[arg(long)]
    third_neighbor: bool,

    /// Preferred growth axis (x, y or z)
    #[arg(long)]
    growth_axis: Option<String>,

    /// Growth preference strength
    #[arg(long, default_value_t = 0.0)]
    growth_strength: f64,

    /// Stretch each site into a k x k x k block after phase separation
    #[arg(long)]
    rescale: Option<usize>,

    /// Dissimilar-neighbor fraction above which smoothing flips a site
    #[arg(long)]
    smoothing_threshold: Option<f64>,

    /// Interfacial width and PRIMARY concentration for interfacial mixing
    #[arg(long, num_args = 2, value_names = ["WIDTH", "CONC"])]
    interfacial_mixing: Option<Vec<f64>>,

    /// Domain size method: mix_fraction or e
    #[arg(long, default_value = "mix_fraction")]
    correlation_method: String,

    /// Fixed starting cutoff for the correlation calculation
    #[arg(long)]
    extended_cutoff: Option<usize>,

    /// Maximum number of sampled sites per correlation calculation
    #[arg(long, default_value_t = 100_000)]
    n_sampling_max: usize,

    /// Calculate depth dependent composition and domain size
    #[arg(long)]
    depth: bool,

    /// Calculate tortuosity with the given path algorithm (indexed or reduced_memory)
    #[arg(long)]
    tortuosity: Option<String>,

    /// Write the mid-length cross-section of each final morphology
    #[arg(long)]
    cross_section: bool,

    /// Number of independent morphologies
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Write uncompressed morphology files
    #[arg(long)]
    uncompressed: bool,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Process morphologies one at a time
    #[arg(long)]
    sequential: bool,

    /// Number of threads to use (default: all available cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Descriptors logged after a morphology is finished.
struct Summary {
    id: usize,
    domain_sizes: Vec<(Label, Option<f64>)>,
    anisotropies: Vec<(Label, Option<f64>)>,
    area_ratio: f64,
    volume_fraction: f64,
    tortuosity: Vec<(Label, Option<f64>, Option<f64>)>,
    acceptance: f64,
}

fn configuration(e: impl std::fmt::Display) -> MorphologyError {
    MorphologyError::Configuration(e.to_string())
}

fn create_file(dir: &Path, name: String) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

fn process(morph: &mut Morphology, cli: &Cli, swap: &SwapConfig, pb: &ProgressBar) -> Result<Summary> {
    let id = morph.id();
    let primary = cli.mix_fraction;
    morph.create_random_morphology(&[primary, 1.0 - primary])?;
    let swap_summary = morph.execute_ising_swapping(swap, &|| pb.inc(1))?;

    if let Some(k) = cli.rescale {
        morph.stretch_lattice(k)?;
    }
    if let Some(threshold) = cli.smoothing_threshold {
        morph.execute_smoothing(threshold, cli.rescale.unwrap_or(1))?;
    }
    if let Some(mixing) = &cli.interfacial_mixing {
        morph.execute_mixing(mixing[0], mixing[1])?;
    }

    morph.calculate_correlation_distances()?;
    morph.calculate_anisotropies()?;
    let area_ratio = morph.calculate_interfacial_area_volume_ratio();
    let volume_fraction = morph.calculate_interfacial_volume_fraction(1.0);
    morph.calculate_interfacial_distance_histogram();
    if cli.depth {
        morph.calculate_depth_dependent_data()?;
        report::write_depth_csv(morph, create_file(&cli.output, format!("depth_dependent_data_{id}.csv"))?)?;
    }

    let mut tortuosity = Vec::new();
    if cli.tortuosity.is_some() {
        for label in [Label::PRIMARY, Label::SECONDARY] {
            morph.calculate_configured_tortuosity(label)?;
            let data = morph.tortuosity_data(label)?;
            let mean = (!data.is_empty()).then(|| data.iter().sum::<f64>() / data.len() as f64);
            tortuosity.push((label, mean, morph.island_volume_fraction(label)?));
            report::write_tortuosity_map_csv(
                morph,
                label,
                create_file(&cli.output, format!("tortuosity_map_{label}_{id}.csv"))?,
            )?;
        }
    }

    morph.write_morphology(create_file(&cli.output, format!("morphology_{id}.txt"))?, !cli.uncompressed)?;
    report::write_correlation_csv(morph, create_file(&cli.output, format!("correlation_data_{id}.csv"))?)?;
    report::write_composition_map_csv(morph, create_file(&cli.output, format!("composition_map_{id}.csv"))?)?;
    if cli.cross_section {
        report::write_cross_section_csv(morph, create_file(&cli.output, format!("cross_section_{id}.csv"))?)?;
    }
    for label in morph.labels() {
        report::write_interfacial_histogram_csv(
            morph,
            label,
            create_file(&cli.output, format!("interfacial_distance_hist_{label}_{id}.csv"))?,
        )?;
    }

    let labels = morph.labels();
    Ok(Summary {
        id,
        domain_sizes: labels.iter().map(|&l| (l, morph.domain_size(l).ok().flatten())).collect(),
        anisotropies: labels.iter().map(|&l| (l, morph.domain_anisotropy(l).ok().flatten())).collect(),
        area_ratio,
        volume_fraction,
        tortuosity,
        acceptance: swap_summary.acceptance_ratio(),
    })
}

fn log_summary(s: &Summary) {
    info!("{}: swap acceptance ratio {:.3}", s.id, s.acceptance);
    for (label, size) in &s.domain_sizes {
        match size {
            Some(d) => info!("{}: phase {label} domain size {d:.3}", s.id),
            None => warn!("{}: phase {label} domain size unavailable", s.id),
        }
    }
    for (label, ratio) in &s.anisotropies {
        match ratio {
            Some(r) => info!("{}: phase {label} anisotropy {r:.3}", s.id),
            None => warn!("{}: phase {label} anisotropy unavailable", s.id),
        }
    }
    info!(
        "{}: interfacial area to volume ratio {:.4}, interfacial volume fraction {:.4}",
        s.id, s.area_ratio, s.volume_fraction
    );
    for (label, mean, islands) in &s.tortuosity {
        info!(
            "{}: phase {label} mean tortuosity {}, island volume fraction {}",
            s.id,
            mean.map_or("n/a".to_string(), |t| format!("{t:.4}")),
            islands.map_or("n/a".to_string(), |f| format!("{f:.4}"))
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(configuration)?;
        info!("Using {threads} threads");
    }

    let mut params = Parameters::new(cli.length, cli.width, cli.height);
    params.periodic_z = !cli.non_periodic_z;
    params.n_sampling_max = cli.n_sampling_max;
    params.correlation_method = CorrelationMethod::try_from(cli.correlation_method.as_str()).map_err(configuration)?;
    params.extended_correlation_cutoff = cli.extended_cutoff;
    params.enable_third_neighbor_interaction = cli.third_neighbor;
    if let Some(algorithm) = &cli.tortuosity {
        params.path_algorithm = PathAlgorithm::try_from(algorithm.as_str()).map_err(configuration)?;
    }

    let growth = match &cli.growth_axis {
        Some(axis) => Some(GrowthPreference {
            axis: Axis::try_from(axis.as_str()).map_err(configuration)?,
            strength: cli.growth_strength,
        }),
        None => None,
    };
    let swap = SwapConfig {
        n_steps: cli.mc_steps,
        interaction_energy1: cli.energy1,
        interaction_energy2: cli.energy2,
        growth,
    };

    fs::create_dir_all(&cli.output)?;
    info!(
        "Starting opv-morph v{}: {} morphologies of {}x{}x{}",
        env!("CARGO_PKG_VERSION"),
        cli.count,
        cli.length,
        cli.width,
        cli.height
    );

    let mut morphologies = (0..cli.count)
        .map(|id| Morphology::new(params.clone(), id))
        .collect::<Result<Vec<_>>>()?;

    let pb = ProgressBar::new((swap.n_steps * cli.count) as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]")
            .map_err(configuration)?
            .progress_chars("=> "),
    );
    pb.set_message("MC steps");

    let results = morph_sim::par_over_morphologies(&mut morphologies, cli.sequential, |morph| {
        process(morph, &cli, &swap, &pb)
    });
    pb.finish();

    for result in results {
        log_summary(&result?);
    }
    info!("Finished, results written to {}", cli.output.display());
    Ok(())
}
