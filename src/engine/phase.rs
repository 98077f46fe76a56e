// Phase transitions as pure functions: no timers, no storage.

use std::time::Duration;

use crate::config::OverlayTiming;

use super::block_wipe::GridSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnimationPhase {
    Intro,
    PriceRoll,
    DayChange,
    FadeText,
    Blocks,
    Done,
}

/// What has to happen before a phase may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A fixed hold measured from phase entry.
    After(Duration),
    /// The odometer completion signal, then a hold.
    RollThen(Duration),
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    HoldElapsed,
    RollComplete,
}

impl AnimationPhase {
    pub const ORDER: [AnimationPhase; 6] = [
        AnimationPhase::Intro,
        AnimationPhase::PriceRoll,
        AnimationPhase::DayChange,
        AnimationPhase::FadeText,
        AnimationPhase::Blocks,
        AnimationPhase::Done,
    ];

    pub fn next(self) -> Option<Self> {
        match self {
            AnimationPhase::Intro => Some(AnimationPhase::PriceRoll),
            AnimationPhase::PriceRoll => Some(AnimationPhase::DayChange),
            AnimationPhase::DayChange => Some(AnimationPhase::FadeText),
            AnimationPhase::FadeText => Some(AnimationPhase::Blocks),
            AnimationPhase::Blocks => Some(AnimationPhase::Done),
            AnimationPhase::Done => None,
        }
    }

    pub fn trigger(self, timing: &OverlayTiming, grid: &GridSpec) -> Trigger {
        match self {
            AnimationPhase::Intro => Trigger::After(timing.intro_hold),
            AnimationPhase::PriceRoll => Trigger::RollThen(timing.post_roll_hold),
            AnimationPhase::DayChange => Trigger::After(timing.day_change_hold),
            AnimationPhase::FadeText => Trigger::After(timing.text_fade + timing.fade_buffer),
            AnimationPhase::Blocks => {
                Trigger::After(grid.wipe_duration(timing) + timing.block_buffer)
            }
            AnimationPhase::Done => Trigger::Terminal,
        }
    }

    /// The phase to enter when `signal` arrives, or `None` if it does not advance.
    ///
    /// `PriceRoll` only advances on the hold scheduled after the roll completes;
    /// the completion itself never moves the phase.
    pub fn on_signal(self, signal: Signal) -> Option<Self> {
        match (self, signal) {
            (AnimationPhase::Done, _) => None,
            (_, Signal::HoldElapsed) => self.next(),
            (_, Signal::RollComplete) => None,
        }
    }

    /// Company name, price and day change are on screen.
    pub fn shows_text(self) -> bool {
        matches!(
            self,
            AnimationPhase::Intro
                | AnimationPhase::PriceRoll
                | AnimationPhase::DayChange
                | AnimationPhase::FadeText
        )
    }
}
