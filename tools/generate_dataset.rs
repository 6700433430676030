//! Synthetic Dataset Generator
//!
//! Writes a `Time,V1..V28,Amount,Class` transactions file shaped like the
//! public credit card fraud dataset, for exercising the training pipeline.

use anyhow::{Context, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Number of anonymized principal-component columns
const COMPONENTS: usize = 28;

/// Components whose mean moves for fraudulent rows, with the shift applied
const FRAUD_SHIFTS: [(usize, f64); 7] = [
    (1, -3.0),
    (3, -4.5),
    (4, 3.5),
    (10, -4.0),
    (12, -5.0),
    (14, -6.0),
    (17, -4.5),
];

/// Transaction generator for testing
struct TransactionGenerator {
    rng: ChaCha8Rng,
    elapsed: f64,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            elapsed: 0.0,
        }
    }

    /// Standard normal draw (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn next_time(&mut self) -> f64 {
        self.elapsed += self.rng.gen_range(0.0..2.0_f64).floor();
        self.elapsed
    }

    /// Generate a legitimate transaction row
    fn generate_legitimate(&mut self) -> Vec<String> {
        let time = self.next_time();
        let components: Vec<f64> = (0..COMPONENTS).map(|_| self.gaussian()).collect();
        let amount = (self.gaussian() * 1.2 + 3.5).exp().min(25_000.0);
        Self::row(time, &components, amount, 0)
    }

    /// Generate a fraudulent transaction row
    fn generate_fraud(&mut self) -> Vec<String> {
        let time = self.next_time();
        let mut components: Vec<f64> = (0..COMPONENTS).map(|_| self.gaussian() * 1.5).collect();
        for (component, shift) in FRAUD_SHIFTS {
            components[component - 1] += shift;
        }
        let amount = if self.rng.gen_bool(0.3) {
            self.rng.gen_range(0.0..2.0)
        } else {
            (self.gaussian() * 1.5 + 4.0).exp().min(2_500.0)
        };
        Self::row(time, &components, amount, 1)
    }

    fn row(time: f64, components: &[f64], amount: f64, class: u8) -> Vec<String> {
        let mut row = Vec::with_capacity(COMPONENTS + 3);
        row.push(format!("{time:.1}"));
        row.extend(components.iter().map(|v| format!("{v:.6}")));
        row.push(format!("{amount:.2}"));
        row.push(class.to_string());
        row
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).map(|s| s.as_str()).unwrap_or("creditcard.csv");
    let rows: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50_000);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.0017);
    let seed: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(42);

    anyhow::ensure!(
        (0.0..=1.0).contains(&fraud_rate),
        "fraud rate must be in [0, 1], got {fraud_rate}"
    );

    info!(
        path = %path,
        rows = rows,
        fraud_rate = fraud_rate,
        seed = seed,
        "Generating synthetic dataset"
    );

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {path}"))?;

    let mut header = vec!["Time".to_string()];
    header.extend((1..=COMPONENTS).map(|i| format!("V{i}")));
    header.push("Amount".to_string());
    header.push("Class".to_string());
    writer.write_record(&header)?;

    let mut generator = TransactionGenerator::new(seed);
    let mut legitimate_count = 0u64;
    let mut fraud_count = 0u64;

    for i in 0..rows {
        let record = if generator.rng.gen_bool(fraud_rate) {
            fraud_count += 1;
            generator.generate_fraud()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };
        writer.write_record(&record)?;

        if (i + 1) % 10_000 == 0 {
            info!("Generated {}/{} rows", i + 1, rows);
        }
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} rows ({} legitimate, {} fraud) to {}",
        rows, legitimate_count, fraud_count, path
    );

    Ok(())
}
