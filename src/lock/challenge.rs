use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Number of option buttons in the answer grid
pub const GRID_SIZE: usize = 9;

/// A named color that can appear as a word, an ink color or an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Orange,
    Pink,
    Brown,
    Cyan,
}

impl ColorName {
    pub const ALL: [ColorName; 9] = [
        ColorName::Red,
        ColorName::Green,
        ColorName::Blue,
        ColorName::Yellow,
        ColorName::Purple,
        ColorName::Orange,
        ColorName::Pink,
        ColorName::Brown,
        ColorName::Cyan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorName::Red => "Red",
            ColorName::Green => "Green",
            ColorName::Blue => "Blue",
            ColorName::Yellow => "Yellow",
            ColorName::Purple => "Purple",
            ColorName::Orange => "Orange",
            ColorName::Pink => "Pink",
            ColorName::Brown => "Brown",
            ColorName::Cyan => "Cyan",
        }
    }

    /// RGB value used when rendering text in this color
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorName::Red => (255, 0, 0),
            ColorName::Green => (0, 255, 0),
            ColorName::Blue => (0, 0, 255),
            ColorName::Yellow => (255, 255, 0),
            ColorName::Purple => (128, 0, 128),
            ColorName::Orange => (255, 165, 0),
            ColorName::Pink => (255, 192, 203),
            ColorName::Brown => (165, 42, 42),
            ColorName::Cyan => (0, 255, 255),
        }
    }

    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ColorName::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("Unknown color: {}", s))
    }
}

/// Ordered set of distinct colors a challenge draws from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<ColorName>,
}

impl Palette {
    pub fn new(colors: Vec<ColorName>) -> Result<Self> {
        if colors.len() < 2 {
            anyhow::bail!(
                "Palette needs at least two colors so word and ink can differ, got {}",
                colors.len()
            );
        }

        for (i, color) in colors.iter().enumerate() {
            if colors[..i].contains(color) {
                anyhow::bail!("Duplicate color in palette: {}", color);
            }
        }

        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[ColorName] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: ColorName::ALL.to_vec(),
        }
    }
}

/// One button in the answer grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChallengeOption {
    /// Text shown on the button
    pub label: ColorName,
    /// Color the label text is drawn in; never equal to `label`
    pub display_color: ColorName,
}

/// A single Stroop puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StroopChallenge {
    /// Color name spelled out in the prompt
    pub word: ColorName,
    /// Color the prompt is drawn in, which is also the correct answer
    pub ink_color: ColorName,
    pub options: Vec<ChallengeOption>,
}

impl StroopChallenge {
    pub fn check_answer(&self, selected: ColorName) -> bool {
        selected == self.ink_color
    }

    pub fn expected_answer(&self) -> ColorName {
        self.ink_color
    }
}

/// Produces randomized Stroop challenges from a palette
pub struct ChallengeGenerator<R: Rng = StdRng> {
    palette: Palette,
    grid_size: usize,
    rng: R,
}

impl ChallengeGenerator<StdRng> {
    /// Generator over the full palette, seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(Palette::default(), StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs
    pub fn seeded(palette: Palette, seed: u64) -> Self {
        Self::new(palette, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ChallengeGenerator<R> {
    pub fn new(palette: Palette, rng: R) -> Self {
        Self {
            palette,
            grid_size: GRID_SIZE,
            rng,
        }
    }

    /// Override the answer grid size (must fit at least two options)
    pub fn with_grid_size(mut self, grid_size: usize) -> Result<Self> {
        if grid_size < 2 {
            anyhow::bail!("Grid size must be at least 2, got {}", grid_size);
        }
        self.grid_size = grid_size;
        Ok(self)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn generate(&mut self) -> StroopChallenge {
        let colors = self.palette.colors();

        let word = colors[self.rng.gen_range(0..colors.len())];

        let ink_color = loop {
            let candidate = colors[self.rng.gen_range(0..colors.len())];
            if candidate != word {
                break candidate;
            }
        };

        let options = self.build_options(ink_color);

        debug!("Generated challenge: word={}, ink={}", word, ink_color);

        StroopChallenge {
            word,
            ink_color,
            options,
        }
    }

    fn build_options(&mut self, correct: ColorName) -> Vec<ChallengeOption> {
        let mut labels = self.palette.colors().to_vec();
        labels.shuffle(&mut self.rng);
        labels.truncate(self.grid_size);

        if !labels.contains(&correct) {
            let slot = self.rng.gen_range(0..labels.len());
            labels[slot] = correct;
        }

        // Each label is drawn in the next label's color. Labels are distinct,
        // so with two or more of them nothing lands on its own color.
        let n = labels.len();
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| ChallengeOption {
                label,
                display_color: labels[(i + 1) % n],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(challenge: &StroopChallenge) {
        assert_ne!(challenge.word, challenge.ink_color);
        assert!(challenge.options.iter().any(|o| o.label == challenge.ink_color));
        for option in &challenge.options {
            assert_ne!(option.label, option.display_color);
        }
    }

    #[test]
    fn test_generated_challenges_hold_invariants() {
        let mut generator = ChallengeGenerator::seeded(Palette::default(), 42);

        for _ in 0..1000 {
            let challenge = generator.generate();
            assert_invariants(&challenge);
            assert_eq!(challenge.options.len(), GRID_SIZE);
        }
    }

    #[test]
    fn test_options_are_distinct() {
        let mut generator = ChallengeGenerator::seeded(Palette::default(), 7);
        let challenge = generator.generate();

        let mut labels: Vec<_> = challenge.options.iter().map(|o| o.label).collect();
        labels.sort_by_key(|c| c.name());
        labels.dedup();
        assert_eq!(labels.len(), challenge.options.len());
    }

    #[test]
    fn test_small_grid_still_contains_answer() {
        let mut generator = ChallengeGenerator::seeded(Palette::default(), 3)
            .with_grid_size(3)
            .unwrap();

        for _ in 0..500 {
            let challenge = generator.generate();
            assert_eq!(challenge.options.len(), 3);
            assert_invariants(&challenge);
        }
    }

    #[test]
    fn test_two_color_palette() {
        let palette = Palette::new(vec![ColorName::Red, ColorName::Blue]).unwrap();
        let mut generator = ChallengeGenerator::seeded(palette, 1);

        for _ in 0..100 {
            let challenge = generator.generate();
            assert_invariants(&challenge);
            assert_eq!(challenge.options.len(), 2);
        }
    }

    #[test]
    fn test_palette_rejects_too_few_colors() {
        assert!(Palette::new(vec![]).is_err());
        assert!(Palette::new(vec![ColorName::Red]).is_err());
    }

    #[test]
    fn test_palette_rejects_duplicates() {
        let result = Palette::new(vec![ColorName::Red, ColorName::Blue, ColorName::Red]);
        assert!(result.is_err());
    }

    #[test]
    fn test_grid_size_must_fit_two_options() {
        let generator = ChallengeGenerator::seeded(Palette::default(), 0);
        assert!(generator.with_grid_size(1).is_err());
    }

    #[test]
    fn test_check_answer_uses_ink_color() {
        let mut generator = ChallengeGenerator::seeded(Palette::default(), 99);
        let challenge = generator.generate();

        assert!(challenge.check_answer(challenge.ink_color));
        assert!(!challenge.check_answer(challenge.word));
    }

    #[test]
    fn test_word_and_ink_cover_palette() {
        let mut generator = ChallengeGenerator::seeded(Palette::default(), 5);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..500 {
            seen.insert(generator.generate().ink_color);
        }

        assert_eq!(seen.len(), ColorName::ALL.len());
    }

    #[test]
    fn test_color_name_parsing() {
        assert_eq!("red".parse::<ColorName>().unwrap(), ColorName::Red);
        assert_eq!(" Cyan ".parse::<ColorName>().unwrap(), ColorName::Cyan);
        assert!("magenta".parse::<ColorName>().is_err());
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(ColorName::Orange.hex(), "#FFA500");
        assert_eq!(ColorName::Blue.hex(), "#0000FF");
    }
}
