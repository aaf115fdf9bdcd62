//! Prompt mixer: blends two prompts into one.
//!
//! Prompts are treated as ordered comma-separated segments. Five blend modes
//! are available; `append` and `interpolate` never consume randomness, the
//! others draw from a generator seeded with the request seed, so a fixed
//! request always yields the same prompt.

pub mod segments;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolsError};

pub use self::segments::{join_truncated, split_segments, SEPARATOR};

/// Preview text shown when the blended prompt is empty.
pub const EMPTY_PREVIEW: &str = "(empty prompt)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Append,
    Interpolate,
    Shuffle,
    Replace,
    RandomInsert,
}

impl BlendMode {
    pub const ALL: [BlendMode; 5] = [
        BlendMode::Append,
        BlendMode::Interpolate,
        BlendMode::Shuffle,
        BlendMode::Replace,
        BlendMode::RandomInsert,
    ];

    /// Parse a mode name, falling back to `append` for unknown names.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|e| {
            tracing::warn!(mode = name, error = %e, "unknown blend mode, using append");
            BlendMode::Append
        })
    }

    /// Whether output depends on the seed.
    pub fn is_seeded(&self) -> bool {
        !matches!(self, BlendMode::Append | BlendMode::Interpolate)
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlendMode::Append => write!(f, "append"),
            BlendMode::Interpolate => write!(f, "interpolate"),
            BlendMode::Shuffle => write!(f, "shuffle"),
            BlendMode::Replace => write!(f, "replace"),
            BlendMode::RandomInsert => write!(f, "random_insert"),
        }
    }
}

impl std::str::FromStr for BlendMode {
    type Err = ToolsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(BlendMode::Append),
            "interpolate" => Ok(BlendMode::Interpolate),
            "shuffle" => Ok(BlendMode::Shuffle),
            "replace" => Ok(BlendMode::Replace),
            "random_insert" | "random-insert" => Ok(BlendMode::RandomInsert),
            _ => Err(ToolsError::Config(format!("Invalid blend mode: {}", s))),
        }
    }
}

/// Inputs of one blend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendRequest {
    pub main_prompt: String,
    pub secondary_prompt: String,
    /// Share of the secondary prompt to mix in; clamped to 0..=100.
    pub blend_percent: i64,
    pub mode: BlendMode,
    pub seed: u64,
    /// Maximum length of the result in characters; must be positive.
    pub max_length: usize,
}

impl BlendRequest {
    pub fn new(main_prompt: impl Into<String>, secondary_prompt: impl Into<String>) -> Self {
        Self {
            main_prompt: main_prompt.into(),
            secondary_prompt: secondary_prompt.into(),
            blend_percent: 50,
            mode: BlendMode::Append,
            seed: 0,
            max_length: 300,
        }
    }

    pub fn with_percent(mut self, blend_percent: i64) -> Self {
        self.blend_percent = blend_percent;
        self
    }

    pub fn with_mode(mut self, mode: BlendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Blend percentage clamped into range, logging when it had to move.
    fn effective_percent(&self) -> u8 {
        let clamped = self.blend_percent.clamp(0, 100);
        if clamped != self.blend_percent {
            let issue = ToolsError::Config(format!(
                "blend_percent {} outside 0..=100",
                self.blend_percent
            ));
            tracing::warn!(error = %issue, clamped, "clamping blend percent");
        }
        clamped as u8
    }
}

/// Result of a blend: the prompt for downstream nodes and its UI preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlendOutcome {
    pub prompt: String,
    pub preview: String,
    pub truncated: bool,
}

impl BlendOutcome {
    fn new(prompt: String, truncated: bool) -> Self {
        let preview = if prompt.is_empty() {
            EMPTY_PREVIEW.to_string()
        } else {
            prompt.clone()
        };
        Self {
            prompt,
            preview,
            truncated,
        }
    }
}

/// Blend two prompts according to `request`.
///
/// Only a zero `max_length` is rejected; every other input is accepted.
pub fn blend(request: &BlendRequest) -> Result<BlendOutcome> {
    if request.max_length == 0 {
        tracing::error!(
            main_len = request.main_prompt.len(),
            secondary_len = request.secondary_prompt.len(),
            "max_length must be positive"
        );
        return Err(ToolsError::Config("max_length must be positive".to_string()));
    }

    let percent = request.effective_percent();
    let main = split_segments(&request.main_prompt);
    let secondary = split_segments(&request.secondary_prompt);

    let mixed = if percent == 0 {
        main.clone()
    } else {
        match request.mode {
            BlendMode::Append => append(&main, &secondary, percent),
            BlendMode::Interpolate => interpolate(&main, &secondary, percent),
            BlendMode::Shuffle => shuffle(&main, &secondary, percent, request.seed),
            BlendMode::Replace => replace(&main, &secondary, percent, request.seed),
            BlendMode::RandomInsert => random_insert(&main, &secondary, percent, request.seed),
        }
    };

    let (prompt, truncated) = join_truncated(&mixed, request.max_length);
    if truncated {
        tracing::info!(
            mode = %request.mode,
            max_length = request.max_length,
            kept = prompt.chars().count(),
            "blended prompt truncated at segment boundary"
        );
    }
    tracing::debug!(
        mode = %request.mode,
        seeded = request.mode.is_seeded(),
        percent,
        main_segments = main.len(),
        secondary_segments = secondary.len(),
        output_len = prompt.len(),
        "prompts blended"
    );

    Ok(BlendOutcome::new(prompt, truncated))
}

/// Number of secondary segments a percentage selects, rounded up.
fn secondary_share(percent: u8, len: usize) -> usize {
    (percent as usize * len).div_ceil(100)
}

fn append<'a>(main: &[&'a str], secondary: &[&'a str], percent: u8) -> Vec<&'a str> {
    let take = secondary_share(percent, secondary.len());
    main.iter().chain(&secondary[..take]).copied().collect()
}

fn interpolate<'a>(main: &[&'a str], secondary: &[&'a str], percent: u8) -> Vec<&'a str> {
    if percent >= 100 {
        return main.iter().chain(secondary).copied().collect();
    }

    // percent is 1..=99 here, so the step is at least 1
    let step = 100 / percent as usize;
    let mut pending = secondary.iter();
    let mut inserted = 0;
    let mut mixed = Vec::with_capacity(main.len() + secondary.len());
    for (i, segment) in main.iter().enumerate() {
        mixed.push(*segment);
        if (i + 1) % step == 0 {
            if let Some(extra) = pending.next() {
                mixed.push(*extra);
                inserted += 1;
            }
        }
    }

    // Main ran out first: keep walking the secondary up to its share.
    let share = secondary_share(percent, secondary.len());
    mixed.extend(pending.take(share.saturating_sub(inserted)).copied());
    mixed
}

fn shuffle<'a>(main: &[&'a str], secondary: &[&'a str], percent: u8, seed: u64) -> Vec<&'a str> {
    let mut rng = StdRng::seed_from_u64(seed);
    let probability = f64::from(percent) / 100.0;

    let mut pool = main.to_vec();
    for segment in secondary {
        if rng.gen_bool(probability) {
            pool.push(*segment);
        }
    }
    pool.shuffle(&mut rng);
    pool
}

fn replace<'a>(main: &[&'a str], secondary: &[&'a str], percent: u8, seed: u64) -> Vec<&'a str> {
    let mut rng = StdRng::seed_from_u64(seed);
    let take = secondary_share(percent, secondary.len());

    let mut mixed = main.to_vec();
    let mut slots: Vec<usize> = (0..mixed.len()).collect();
    slots.shuffle(&mut rng);
    for (slot, segment) in slots.into_iter().zip(&secondary[..take]) {
        mixed[slot] = *segment;
    }
    mixed
}

fn random_insert<'a>(
    main: &[&'a str],
    secondary: &[&'a str],
    percent: u8,
    seed: u64,
) -> Vec<&'a str> {
    let mut rng = StdRng::seed_from_u64(seed);
    let take = secondary_share(percent, secondary.len());

    let mut mixed = main.to_vec();
    for segment in &secondary[..take] {
        let at = rng.gen_range(0..=mixed.len());
        mixed.insert(at, *segment);
    }
    mixed
}

/// Stateful front end that can reuse the previous blend.
#[derive(Debug, Default)]
pub struct PromptMixer {
    last: Option<(BlendRequest, BlendOutcome)>,
}

impl PromptMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend `request`. With `overwrite` off, an unchanged request returns the
    /// previous outcome untouched.
    pub fn mix(&mut self, request: BlendRequest, overwrite: bool) -> Result<BlendOutcome> {
        if !overwrite {
            if let Some((last_request, last_outcome)) = &self.last {
                if *last_request == request {
                    tracing::debug!("inputs unchanged, reusing previous blend");
                    return Ok(last_outcome.clone());
                }
            }
        }

        let outcome = blend(&request)?;
        self.last = Some((request, outcome.clone()));
        Ok(outcome)
    }

    /// Preview of the most recent blend, if any.
    pub fn last_preview(&self) -> Option<&str> {
        self.last.as_ref().map(|(_, outcome)| outcome.preview.as_str())
    }
}
