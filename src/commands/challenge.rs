use anyhow::{Context, Result};

use crate::commands::utils::render_challenge;
use crate::lock::{ChallengeGenerator, Palette};

/// Generate one challenge and print it
pub fn generate(seed: Option<u64>, json: bool) -> Result<()> {
    let mut generator = match seed {
        Some(seed) => ChallengeGenerator::seeded(Palette::default(), seed),
        None => ChallengeGenerator::from_entropy(),
    };
    let challenge = generator.generate();

    if json {
        let content = serde_json::to_string_pretty(&challenge)
            .context("Failed to serialize challenge")?;
        println!("{}", content);
    } else {
        print!("{}", render_challenge(&challenge));
        println!("Answer: {}", challenge.expected_answer());
    }

    Ok(())
}
