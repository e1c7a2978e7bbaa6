use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct FieldRng {
    state: [u64; 4],
}

impl FieldRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        FieldRng { state: s }
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Uniform integer in `1..=max`.
    fn replicates(&mut self, max: u64) -> u64 {
        1 + self.next_u64() % max
    }
}

fn main() {
    let mut rng = FieldRng::new(42);

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    // Weekly sampling rounds, Mondays from 2023-01-02.
    let first_round = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let n_weeks: i64 = 104;

    let stations = [
        ("Cedar Creek Upstream Reference", 0.8),
        ("Cedar Creek Below Outfall", 3.6),
        ("Mill Race Wetland Margin", 1.9),
        ("Stonebridge Reservoir Intake", 1.2),
    ];
    // Colorimetric kits read slightly high relative to ion chromatography.
    let methods = [("Ion Chromatography", 0.0), ("Colorimetric", 0.15)];

    let mut all_sampled: Vec<i32> = Vec::new();
    let mut all_station: Vec<String> = Vec::new();
    let mut all_method: Vec<String> = Vec::new();
    let mut all_replicate: Vec<i64> = Vec::new();
    let mut all_nitrate: Vec<f64> = Vec::new();

    for week in 0..n_weeks {
        let date = first_round + Duration::weeks(week);
        let day_number = date.signed_duration_since(epoch).num_days() as i32;
        let season = (2.0 * std::f64::consts::PI * week as f64 / 52.0).sin();

        for (si, &(station, baseline)) in stations.iter().enumerate() {
            // Stations peak at slightly different times of year.
            let seasonal = 0.6 * (season + si as f64 * 0.15);

            for &(method, bias) in &methods {
                for replicate in 1..=rng.replicates(3) {
                    let nitrate =
                        (baseline + seasonal + bias + rng.gauss(0.0, 0.25)).max(0.02);

                    all_sampled.push(day_number);
                    all_station.push(station.to_string());
                    all_method.push(method.to_string());
                    all_replicate.push(replicate as i64);
                    all_nitrate.push(nitrate);
                }
            }
        }
    }

    let n_rows = all_nitrate.len();

    // Build Arrow arrays
    let sampled_array = Date32Array::from(all_sampled);
    let station_array = StringArray::from(
        all_station.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    );
    let method_array = StringArray::from(
        all_method.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    );
    let replicate_array = Int64Array::from(all_replicate);
    let nitrate_array = Float64Array::from(all_nitrate);

    let schema = Arc::new(Schema::new(vec![
        Field::new("sampled", DataType::Date32, false),
        Field::new("station", DataType::Utf8, false),
        Field::new("method", DataType::Utf8, false),
        Field::new("replicate", DataType::Int64, false),
        Field::new("nitrate_mg_l", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(sampled_array),
            Arc::new(station_array),
            Arc::new(method_array),
            Arc::new(replicate_array),
            Arc::new(nitrate_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let output_path = "field_samples.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {n_rows} samples ({} stations, {n_weeks} weeks) to {output_path}",
        stations.len()
    );
}
