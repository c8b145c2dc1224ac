use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Write a synthetic penguin dataset in the palmerpenguins column layout.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file; `.csv` or `.parquet`
    #[arg(default_value = "penguins.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Per-species measurement distributions: (mean, std) for bill length,
/// bill depth, flipper length and body mass.
struct SpeciesProfile {
    name: &'static str,
    islands: &'static [&'static str],
    count: usize,
    bill_length: (f64, f64),
    bill_depth: (f64, f64),
    flipper_length: (f64, f64),
    body_mass: (f64, f64),
}

const PROFILES: [SpeciesProfile; 3] = [
    SpeciesProfile {
        name: "Adelie",
        islands: &["Torgersen", "Biscoe", "Dream"],
        count: 152,
        bill_length: (38.8, 2.7),
        bill_depth: (18.3, 1.2),
        flipper_length: (190.0, 6.5),
        body_mass: (3700.0, 460.0),
    },
    SpeciesProfile {
        name: "Gentoo",
        islands: &["Biscoe"],
        count: 124,
        bill_length: (47.5, 3.1),
        bill_depth: (15.0, 1.0),
        flipper_length: (217.0, 6.5),
        body_mass: (5076.0, 504.0),
    },
    SpeciesProfile {
        name: "Chinstrap",
        islands: &["Dream"],
        count: 68,
        bill_length: (48.8, 3.3),
        bill_depth: (18.4, 1.1),
        flipper_length: (196.0, 7.1),
        body_mass: (3733.0, 384.0),
    },
];

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut impl Rng, (mean, std_dev): (f64, f64)) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Column-oriented sample table; `None` marks a missing cell.
#[derive(Default)]
struct Columns {
    species: Vec<Option<String>>,
    island: Vec<Option<String>>,
    bill_length_mm: Vec<Option<f64>>,
    bill_depth_mm: Vec<Option<f64>>,
    flipper_length_mm: Vec<Option<i64>>,
    body_mass_g: Vec<Option<i64>>,
    sex: Vec<Option<String>>,
    year: Vec<Option<i64>>,
}

impl Columns {
    fn len(&self) -> usize {
        self.species.len()
    }
}

fn generate(seed: u64) -> Columns {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cols = Columns::default();

    for profile in &PROFILES {
        for i in 0..profile.count {
            let island = profile.islands[i % profile.islands.len()];
            // A few birds were never measured, some were never sexed
            let measured = rng.gen::<f64>() > 0.006;
            let sexed = measured && rng.gen::<f64>() > 0.03;

            let round1 = |v: f64| (v * 10.0).round() / 10.0;

            cols.species.push(Some(profile.name.to_string()));
            cols.island.push(Some(island.to_string()));
            cols.bill_length_mm
                .push(measured.then(|| round1(gauss(&mut rng, profile.bill_length))));
            cols.bill_depth_mm
                .push(measured.then(|| round1(gauss(&mut rng, profile.bill_depth))));
            cols.flipper_length_mm
                .push(measured.then(|| gauss(&mut rng, profile.flipper_length).round() as i64));
            cols.body_mass_g.push(
                measured.then(|| (gauss(&mut rng, profile.body_mass) / 25.0).round() as i64 * 25),
            );
            let sex = if rng.gen::<bool>() { "male" } else { "female" };
            cols.sex.push(sexed.then(|| sex.to_string()));
            cols.year.push(Some(2007 + rng.gen_range(0..3)));
        }
    }

    cols
}

fn write_csv(path: &Path, cols: &Columns) -> Result<()> {
    fn cell<T: ToString>(v: &Option<T>) -> String {
        v.as_ref().map_or_else(|| "NA".to_string(), |v| v.to_string())
    }

    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record([
        "species",
        "island",
        "bill_length_mm",
        "bill_depth_mm",
        "flipper_length_mm",
        "body_mass_g",
        "sex",
        "year",
    ])?;
    for i in 0..cols.len() {
        writer.write_record([
            cell(&cols.species[i]),
            cell(&cols.island[i]),
            cell(&cols.bill_length_mm[i]),
            cell(&cols.bill_depth_mm[i]),
            cell(&cols.flipper_length_mm[i]),
            cell(&cols.body_mass_g[i]),
            cell(&cols.sex[i]),
            cell(&cols.year[i]),
        ])?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, cols: &Columns) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("species", DataType::Utf8, true),
        Field::new("island", DataType::Utf8, true),
        Field::new("bill_length_mm", DataType::Float64, true),
        Field::new("bill_depth_mm", DataType::Float64, true),
        Field::new("flipper_length_mm", DataType::Int64, true),
        Field::new("body_mass_g", DataType::Int64, true),
        Field::new("sex", DataType::Utf8, true),
        Field::new("year", DataType::Int64, true),
    ]));

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(cols.species.clone())),
        Arc::new(StringArray::from(cols.island.clone())),
        Arc::new(Float64Array::from(cols.bill_length_mm.clone())),
        Arc::new(Float64Array::from(cols.bill_depth_mm.clone())),
        Arc::new(Int64Array::from(cols.flipper_length_mm.clone())),
        Arc::new(Int64Array::from(cols.body_mass_g.clone())),
        Arc::new(StringArray::from(cols.sex.clone())),
        Arc::new(Int64Array::from(cols.year.clone())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cols = generate(args.seed);

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &cols)?,
        "parquet" | "pq" => write_parquet(&args.output, &cols)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!(
        "Wrote {} penguins ({} species) to {}",
        cols.len(),
        PROFILES.len(),
        args.output.display()
    );
    Ok(())
}
