// Price odometer: per-digit reels that roll through decoys before settling.

use std::time::Duration;

use rand::Rng;

use crate::config::{OverlayTiming, ODOMETER_DECOYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCharacter {
    pub character: char,
    pub is_digit: bool,
}

/// Animated reel for one digit of the price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitStrip {
    /// Position among the digits only, left to right.
    pub digit_index: usize,
    /// Decoy digits followed by the target as the last entry.
    pub reel: Vec<u8>,
    pub target: u8,
    pub delay: Duration,
    pub duration: Duration,
}

impl DigitStrip {
    /// Time from roll start until this strip rests on its target.
    pub fn settles_after(&self) -> Duration {
        self.delay + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    Static(char),
    Strip(DigitStrip),
}

pub fn parse_price(price: &str) -> Vec<PriceCharacter> {
    price
        .chars()
        .map(|character| PriceCharacter {
            character,
            is_digit: character.is_ascii_digit(),
        })
        .collect()
}

/// Layout of the whole price: static glyphs in place, one strip per digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdometerPlan {
    glyphs: Vec<Glyph>,
    digit_count: usize,
}

impl OdometerPlan {
    pub fn new<R: Rng + ?Sized>(price: &str, timing: &OverlayTiming, rng: &mut R) -> Self {
        let mut digit_count = 0usize;
        let glyphs = parse_price(price)
            .into_iter()
            .map(|pc| {
                if !pc.is_digit {
                    return Glyph::Static(pc.character);
                }
                let target = pc.character as u8 - b'0';
                let mut reel: Vec<u8> = (0..ODOMETER_DECOYS).map(|_| rng.gen_range(0..10)).collect();
                reel.push(target);
                let strip = DigitStrip {
                    digit_index: digit_count,
                    reel,
                    target,
                    delay: timing.digit_stagger * digit_count as u32,
                    duration: timing.roll_duration,
                };
                digit_count += 1;
                Glyph::Strip(strip)
            })
            .collect();

        Self {
            glyphs,
            digit_count,
        }
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn strips(&self) -> impl Iterator<Item = &DigitStrip> {
        self.glyphs.iter().filter_map(|g| match g {
            Glyph::Strip(s) => Some(s),
            Glyph::Static(_) => None,
        })
    }

    pub fn digit_count(&self) -> usize {
        self.digit_count
    }

    /// When the last strip settles; zero when there are no digits.
    pub fn total_duration(&self) -> Duration {
        self.strips()
            .map(DigitStrip::settles_after)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

/// Turns per-strip settle events into a single completion signal.
#[derive(Debug, Clone)]
pub struct RollTracker {
    digit_count: usize,
    completed: bool,
}

impl RollTracker {
    pub fn new(digit_count: usize) -> Self {
        Self {
            digit_count,
            completed: digit_count == 0,
        }
    }

    /// Record that a strip has settled. Returns `true` exactly once: when the
    /// last digit's strip settles.
    pub fn settle(&mut self, digit_index: usize) -> bool {
        if self.completed || digit_index + 1 != self.digit_count {
            return false;
        }
        self.completed = true;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}
