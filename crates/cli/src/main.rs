use anyhow::{anyhow, bail, Context};
use config::{Config, File};
use hexstead::{timed, Settlement, SettlementConfig};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    fs::{self, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
    process,
};
use structopt::StructOpt;
use strum::{Display, EnumString};

/// CLI for generating hex settlements via Hexstead.
#[derive(Debug, StructOpt)]
#[structopt(name = "hexstead")]
struct Opt {
    /// Path to a config file that defines the settlement to be generated.
    /// Supported formats: JSON, TOML. If neither this nor `--input` is given,
    /// the default config is used (with a random seed).
    #[structopt(short, long)]
    config: Option<PathBuf>,

    /// Path to an existing .json settlement file to load
    #[structopt(short, long)]
    input: Option<PathBuf>,

    /// If given, the generated settlement will be saved to this directory.
    /// The exact files that appear in the directory are defined by the output
    /// formats. See `--output-formats` for more info
    #[structopt(short, long)]
    output: Option<PathBuf>,

    /// The format(s) to output the settlement in. Supported formats:
    ///
    /// json - The full settlement, which can be reloaded with `--input`
    ///
    /// cfg - The full config object used for the settlement, in TOML format
    ///
    /// steps - Just the ground solver's step trace, as JSON
    #[structopt(short = "f", long)]
    output_formats: Vec<OutputFormat>,

    /// The logging level to use during generation. See
    /// https://docs.rs/log/0.4.11/log/enum.LevelFilter.html for options
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Different output formats.
#[derive(Copy, Clone, Debug, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
enum OutputFormat {
    // If you change this, make sure to update the help text for
    // `--output-formats`!
    /// Export the settlement as JSON, which can be loaded back later
    Json,
    /// Export the settlement's full config in a human-readable file
    Cfg,
    /// Export the solver trace, for playback
    Steps,
}

impl OutputFormat {
    fn file_name(self) -> &'static str {
        match self {
            Self::Json => "settlement.json",
            Self::Cfg => "settlement.toml",
            Self::Steps => "steps.json",
        }
    }
}

fn load_config(config_path: &Path) -> anyhow::Result<SettlementConfig> {
    let mut settings = Config::new();
    let config_path = config_path.to_str().ok_or_else(|| {
        anyhow!("invalid character in path {:?}", config_path)
    })?;
    settings
        .merge(File::with_name(config_path))
        .context("error reading config file")?;
    settings.try_into().context("error reading config")
}

fn load_settlement(input_path: &Path) -> anyhow::Result<Settlement> {
    let mut json = String::new();
    OpenOptions::new()
        .read(true)
        .open(input_path)
        .and_then(|mut file| file.read_to_string(&mut json))
        .with_context(|| {
            format!("error reading settlement file {:?}", input_path)
        })?;
    Settlement::from_json(&json)
}

/// Generate an output form of the settlement in the given format.
fn gen_output(
    output_dir: &Path,
    output_format: OutputFormat,
    settlement: &Settlement,
) -> anyhow::Result<()> {
    fn generate_bytes(
        output_format: OutputFormat,
        settlement: &Settlement,
    ) -> anyhow::Result<Vec<u8>> {
        Ok(match output_format {
            OutputFormat::Json => settlement.to_json()?.into_bytes(),
            OutputFormat::Cfg => toml::to_string_pretty(settlement.config())
                .context("error serializing config")?
                .into_bytes(),
            OutputFormat::Steps => serde_json::to_vec(settlement.steps())
                .context("error serializing steps")?,
        })
    }

    let output_file_path = output_dir.join(output_format.file_name());

    timed!(
        format!(
            "Generating {} output and writing to {:?}",
            output_format, &output_file_path
        ),
        log::Level::Info,
        {
            let bytes = generate_bytes(output_format, settlement)?;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&output_file_path)
                .with_context(|| {
                    format!("error opening output file {:?}", &output_file_path)
                })?;
            file.write_all(&bytes).with_context(|| {
                format!("error writing to file {:?}", &output_file_path)
            })?;
        }
    );

    Ok(())
}

/// Run the CLI with some options
fn run(opt: Opt) -> anyhow::Result<()> {
    SimpleLogger::new().with_level(opt.log_level).init()?;

    let settlement = match (&opt.config, &opt.input) {
        (Some(config_path), None) => {
            let config = load_config(config_path)?;
            Settlement::generate(config)?
        }
        (None, Some(input_path)) => {
            let settlement = load_settlement(input_path)?;
            info!("Loaded settlement from {:?}", input_path);
            settlement
        }
        (None, None) => Settlement::generate(SettlementConfig::default())?,
        (Some(_), Some(_)) => bail!(
            "pass at most one of --config (to generate a new settlement) \
            or --input (to load an existing settlement)"
        ),
    };

    let wall = settlement.wall();
    info!(
        "{} ground tiles, {} wall tiles ({} inside, {} outside adjacent)",
        settlement.tiles().len(),
        wall.wall_tiles.len(),
        wall.inside_tiles.len(),
        wall.outside_adjacent_tiles.len()
    );
    for (i, island) in settlement.islands().iter().enumerate() {
        info!(
            "Island {}: center {}, area {}, clear radius {}",
            i, island.center, island.area, island.radius_available
        );
    }

    // If an output dir was specified, write out output format(s) there
    if let Some(output_dir) = opt.output {
        if opt.output_formats.is_empty() {
            bail!("output dir was specified, but no output formats were given")
        }
        fs::create_dir_all(&output_dir)?;
        for output_format in opt.output_formats {
            gen_output(&output_dir, output_format, &settlement)?;
        }
    }

    Ok(())
}

fn main() {
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
