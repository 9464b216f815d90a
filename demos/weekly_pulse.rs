//! Weekly Pulse, Offline
//!
//! Runs the full pipeline over a small batch of reviews with a toy
//! embedder and no language model, then prints the pulse as JSON.
//!
//! ```bash
//! RUST_LOG=reviewpulse=debug cargo run --example weekly_pulse
//! ```

use chrono::NaiveDate;
use reviewpulse::{
    EmbeddingError, OfflineGenerator, PatternScrubber, Pipeline, PulseConfig, ReportWindow, Review,
};
use tracing_subscriber::EnvFilter;

/// Places each review on the axis of the first topic word it mentions.
fn keyword_embedder(texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    const TOPICS: [&str; 3] = ["kyc", "withdraw", "crash"];
    Ok(texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let lower = text.to_lowercase();
            let mut v = vec![0.0; TOPICS.len() + 1];
            let axis = TOPICS
                .iter()
                .position(|t| lower.contains(t))
                .unwrap_or(TOPICS.len());
            v[axis] = 1.0 + (i % 5) as f32 * 0.02;
            v
        })
        .collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let texts = [
        (1.0, "KYC verification pending for five days, no update at all"),
        (2.0, "My KYC got rejected without any reason given"),
        (1.0, "Still waiting on KYC, support says wait 48 hours"),
        (2.0, "KYC upload keeps failing on the PAN card step"),
        (1.0, "KYC has been in review for a week now"),
        (1.0, "Withdraw request stuck, money not in my bank"),
        (2.0, "Cannot withdraw funds since Monday, mail me at ravi.k@example.com"),
        (1.0, "Withdrawal pending for 3 days, call 9876543210"),
        (2.0, "Withdraw button does nothing after the update"),
        (3.0, "App crash every time I open the portfolio tab"),
        (2.0, "Crash on launch after the latest update"),
        (5.0, "Love the clean design and fast order placement"),
    ];
    let reviews: Vec<Review> = texts
        .iter()
        .enumerate()
        .map(|(i, (rating, text))| Review::new(format!("r{i:02}"), *text).with_rating(*rating))
        .collect();

    let config = PulseConfig::default()
        .with_min_cluster_size(3)
        .with_min_samples(2)
        .with_quotes_per_theme(2);
    let embedder = keyword_embedder;
    let scrubber = PatternScrubber::new();
    let pipeline = Pipeline::new(config, &embedder, &OfflineGenerator, &scrubber)?;

    let week_end = NaiveDate::from_ymd_opt(2024, 6, 9).ok_or("invalid date")?;
    let run = pipeline.run(&reviews, &ReportWindow::week_ending("Groww", week_end))?;

    println!("{}", serde_json::to_string_pretty(&run.document)?);

    eprintln!(
        "\n{} themes, {} noise reviews, {} fallbacks, {} words",
        run.themes.len(),
        run.report.stats.n_noise,
        run.report.fallbacks.len(),
        run.document.metadata.word_count,
    );
    for event in &run.report.fallbacks {
        eprintln!("  fallback [{}] {}: {}", event.stage, event.subject, event.reason);
    }

    Ok(())
}
