//! Converts VISSIM files to GeoJSON and CSV, writing results next to each input.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod discover;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use structopt::StructOpt;

use vissim::{
    aggregate, network, trajectory, AggregateConfig, PiConvention, ReferenceFrame,
    TrajectoryConfig, Transformer, PI_LONG,
};

use self::discover::FileKind;

#[derive(StructOpt)]
#[structopt(
    name = "vissim2geojson",
    about = "Converts VISSIM networks (.inpx), vehicle records (.fzp), and aggregate records (.fhz)"
)]
struct Args {
    /// A single file, or a directory to search recursively
    #[structopt()]
    input: PathBuf,
    /// X of the background map's reference point, in Mercator meters
    #[structopt(long, default_value = "-9772674.016", allow_hyphen_values = true)]
    x_refmap: f64,
    /// Y of the background map's reference point, in Mercator meters
    #[structopt(long, default_value = "5317775.409", allow_hyphen_values = true)]
    y_refmap: f64,
    /// X of the same point in the network's coordinates
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    x_refnet: f64,
    /// Y of the same point in the network's coordinates
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    y_refnet: f64,
    /// The vehicle record column holding the local x coordinate
    #[structopt(long, default_value = "POS")]
    x_col: String,
    /// The vehicle record column holding the local y coordinate
    #[structopt(long, default_value = "POSLAT")]
    y_col: String,
    /// How many characters of unit suffix to drop from every value in the y column
    #[structopt(long, default_value = "5")]
    lat_suffix_len: usize,
    /// Use one value of pi everywhere. Results will differ slightly from previously published
    /// conversions.
    #[structopt(long)]
    unify_pi: bool,
}

impl Args {
    fn transformer(&self) -> Result<Transformer> {
        let frame = ReferenceFrame {
            x_refmap: self.x_refmap,
            y_refmap: self.y_refmap,
            x_refnet: self.x_refnet,
            y_refnet: self.y_refnet,
        };
        let pi = if self.unify_pi {
            PiConvention::Single(PI_LONG)
        } else {
            PiConvention::Dual
        };
        Ok(Transformer::with_pi(frame, pi)?)
    }

    fn trajectory_config(&self) -> TrajectoryConfig {
        TrajectoryConfig {
            x_column: self.x_col.clone(),
            y_column: self.y_col.clone(),
            y_suffix_len: self.lat_suffix_len,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::from_args();
    let transformer = args.transformer()?;
    info!(
        "Reference latitude {}, local scale {}",
        transformer.reference_latitude(),
        transformer.local_scale()
    );

    let files = discover::find_inputs(&args.input)?;
    if files.is_empty() {
        bail!("No VISSIM files found in {}", args.input.display());
    }

    let mut failed = 0;
    for (path, kind) in &files {
        if let Err(err) = convert(path, *kind, &args, &transformer) {
            error!("Couldn't convert {}: {:#}", path.display(), err);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files failed", files.len());
    }
    Ok(())
}

fn convert(path: &Path, kind: FileKind, args: &Args, transformer: &Transformer) -> Result<()> {
    info!("Converting {} ({:?})", path.display(), kind);
    match kind {
        FileKind::Network => {
            let network = network::load_path(path, transformer)?;
            info!(
                "{} links with {} vertices",
                network.links.len(),
                network.vertex_count()
            );
            let output = with_suffix(path, ".geojson");
            write_json(&output, &network.to_geojson())?;
            info!("Wrote {}", output.display());
        }
        FileKind::Vehicles => {
            let table = trajectory::load_path(path, &args.trajectory_config(), transformer)?;
            summarize(&table);

            let output = with_suffix(path, ".geojson");
            write_json(&output, &table.to_geojson())?;
            info!("Wrote {}", output.display());

            let output = with_suffix(&output, ".csv");
            let file = fs_err::File::create(&output)?;
            table
                .write_csv(std::io::BufWriter::new(file))
                .with_context(|| output.display().to_string())?;
            info!("Wrote {}", output.display());
        }
        FileKind::Aggregate => {
            let table = aggregate::load_path(path, &AggregateConfig::default())?;
            summarize(&table);

            let output = with_suffix(path, ".csv");
            let mut file = std::io::BufWriter::new(fs_err::File::create(&output)?);
            // Spreadsheet software expects the byte order mark
            file.write_all("\u{feff}".as_bytes())?;
            table
                .write_csv(file)
                .with_context(|| output.display().to_string())?;
            info!("Wrote {}", output.display());
        }
    }
    Ok(())
}

fn summarize(table: &vissim::Table) {
    info!(
        "{} rows, {} columns",
        table.len(),
        table.output_columns().len()
    );
    if table.spatial.is_some() {
        info!("{} rows have a position", table.rows_with_position());
    }
    if !table.failures.is_empty() {
        warn!(
            "{} problems decoding rows; the first is: {}",
            table.failures.len(),
            table.failures[0]
        );
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut file = std::io::BufWriter::new(fs_err::File::create(path)?);
    serde_json::to_writer(&mut file, value).with_context(|| path.display().to_string())?;
    file.flush()?;
    Ok(())
}

/// `foo.fzp` becomes `foo.fzp.geojson`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    name.into()
}
