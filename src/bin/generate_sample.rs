use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use listing_lens::{CategoricalAttr, Listing, NumericAttr};

/// Write a synthetic listings dataset as CSV and Parquet.
#[derive(Parser)]
#[command(name = "generate_sample", version)]
struct Args {
    /// Number of listings to generate.
    #[arg(long, default_value_t = 2000)]
    count: usize,

    /// Output path without extension.
    #[arg(long, default_value = "sample_listings")]
    output: String,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (country, city, latitude, longitude, typical nightly price)
const CITIES: [(&str, &str, f64, f64, f64); 5] = [
    ("Portugal", "Lisbon", 38.72, -9.14, 85.0),
    ("Spain", "Barcelona", 41.39, 2.17, 110.0),
    ("Brazil", "Rio", -22.91, -43.17, 70.0),
    ("Australia", "Sydney", -33.87, 151.21, 160.0),
    ("United States", "New York", 40.71, -74.0, 190.0),
];

const PROPERTY_TYPES: [&str; 6] = ["Apartment", "House", "Loft", "Condominium", "Guesthouse", "Boat"];
const ROOM_TYPES: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];
const POLICIES: [&str; 4] = ["flexible", "moderate", "strict", "super_strict_30"];
const ADJECTIVES: [&str; 6] = ["Cozy", "Sunny", "Quiet", "Modern", "Charming", "Ocean"];
const NOUNS: [&str; 5] = ["Loft", "Studio", "Retreat", "Nest", "Hideaway"];

fn generate_listing(rng: &mut SimpleRng) -> Listing {
    let &(country, city, lat, lon, base_price) = rng.pick(&CITIES);
    let room = *rng.pick(&ROOM_TYPES);
    let room_factor = match room {
        "Entire home/apt" => 1.6,
        "Private room" => 0.8,
        _ => 0.45,
    };
    let name = format!("{} {} in {city}", rng.pick(&ADJECTIVES), rng.pick(&NOUNS));
    let price = (base_price * room_factor * rng.between(0.5, 1.8)).round();
    let reviews = (rng.next_f64().powi(3) * 400.0).floor();

    let mut listing = Listing::named(name)
        .with_category(CategoricalAttr::Country, country)
        .with_category(CategoricalAttr::PropertyType, *rng.pick(&PROPERTY_TYPES))
        .with_category(CategoricalAttr::RoomType, room)
        .with_category(CategoricalAttr::CancellationPolicy, *rng.pick(&POLICIES))
        .with_numeric(NumericAttr::Price, price)
        .with_numeric(NumericAttr::NumberOfReviews, reviews)
        .with_numeric(NumericAttr::Latitude, rng.gauss(lat, 0.03))
        .with_numeric(NumericAttr::Longitude, rng.gauss(lon, 0.03));

    // Listings without reviews have no rating.
    if reviews > 0.0 {
        let rating = rng.gauss(92.0, 6.0).clamp(20.0, 100.0).round();
        listing.set_numeric(NumericAttr::ReviewScoresRating, Some(rating));
    }

    let a30 = (rng.next_f64() * 31.0).floor();
    let a60 = a30 + (rng.next_f64() * 31.0).floor();
    let a90 = a60 + (rng.next_f64() * 31.0).floor();
    let a365 = a90 + (rng.next_f64() * 276.0).floor();
    listing
        .with_numeric(NumericAttr::Availability30, a30)
        .with_numeric(NumericAttr::Availability60, a60)
        .with_numeric(NumericAttr::Availability90, a90)
        .with_numeric(NumericAttr::Availability365, a365)
}

fn write_csv(path: &str, listings: &[Listing]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, listings: &[Listing]) -> Result<()> {
    let mut fields = vec![Field::new("name", DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        listings.iter().map(|l| l.name.as_str()),
    ))];

    for attr in CategoricalAttr::ALL {
        fields.push(Field::new(attr.as_str(), DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            listings.iter().map(|l| l.categorical(attr)),
        )));
    }
    for attr in NumericAttr::ALL {
        fields.push(Field::new(attr.as_str(), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            listings.iter().map(|l| l.numeric(attr)).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch =
        RecordBatch::try_new(schema.clone(), columns).context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let listings: Vec<Listing> = (0..args.count).map(|_| generate_listing(&mut rng)).collect();

    let csv_path = format!("{}.csv", args.output);
    let parquet_path = format!("{}.parquet", args.output);
    write_csv(&csv_path, &listings)?;
    write_parquet(&parquet_path, &listings)?;

    println!(
        "Wrote {} listings to {csv_path} and {parquet_path}",
        listings.len()
    );
    Ok(())
}
