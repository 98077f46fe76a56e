// Overlay controller: drives the phase machine, owns its timers and the session flag.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::block_wipe::{GridSpec, WipeCell};
use super::odometer::{Glyph, OdometerPlan, RollTracker};
use super::phase::{AnimationPhase, Signal, Trigger};
use super::timers::{TimerId, TimerQueue};
use crate::api::overlay_api::{Environment, OverlayProps};
use crate::config::{OverlayTiming, SESSION_FLAG_KEY};
use crate::storage::session_flag::{has_run, mark_run, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// First render pass not finished yet; nothing on screen.
    Pending,
    /// Already played this session. Renders nothing, schedules nothing.
    Skipped,
    /// Single fade in place of the full sequence.
    ReducedMotion { complete: bool },
    Running(AnimationPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    PhaseHold,
    StripSettled(usize),
    FallbackFade,
}

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    pub visible: bool,
    pub phase: Option<AnimationPhase>,
    pub company_name: String,
    pub ticker: String,
    pub text_visible: bool,
    /// Odometer strips are animating.
    pub rolling: bool,
    pub day_change: Option<String>,
    pub day_change_negative: bool,
    pub fading_out: bool,
    pub glyphs: Vec<Glyph>,
    pub wipe: Vec<WipeCell>,
    pub accent_color: String,
    pub background_color: String,
}

pub struct LoadInOverlay {
    props: OverlayProps,
    timing: OverlayTiming,
    store: Arc<dyn SessionStore>,
    flag_key: String,
    grid: GridSpec,
    mode: OverlayMode,
    odometer: Option<OdometerPlan>,
    roll: Option<RollTracker>,
    timers: TimerQueue<TimerKind>,
    phase_timer: Option<TimerId>,
    strip_timers: Vec<TimerId>,
    prefers_reduced_motion: bool,
    rng: StdRng,
    revision: u64,
}

impl LoadInOverlay {
    pub fn new(props: OverlayProps, env: Environment, store: Arc<dyn SessionStore>) -> Self {
        Self {
            props,
            timing: OverlayTiming::default(),
            store,
            flag_key: SESSION_FLAG_KEY.to_string(),
            grid: GridSpec::compute(env.viewport_width, env.viewport_height),
            mode: OverlayMode::Pending,
            odometer: None,
            roll: None,
            timers: TimerQueue::new(),
            phase_timer: None,
            strip_timers: Vec::new(),
            prefers_reduced_motion: env.prefers_reduced_motion,
            rng: StdRng::from_entropy(),
            revision: 0,
        }
    }

    pub fn with_timing(mut self, timing: OverlayTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Fix the decoy digits, mainly for reproducible previews and tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_flag_key(mut self, key: impl Into<String>) -> Self {
        self.flag_key = key.into();
        self
    }

    /// Called once the first render pass has completed. Decides between
    /// skipping, the reduced-motion fade and the full sequence.
    pub fn mount(&mut self) -> OverlayMode {
        if self.mode != OverlayMode::Pending {
            return self.mode;
        }

        if !self.props.force_replay && has_run(self.store.as_ref(), &self.flag_key) {
            debug!("overlay skipped, already played key={}", self.flag_key);
            self.set_mode(OverlayMode::Skipped);
            return self.mode;
        }

        if self.prefers_reduced_motion {
            info!(
                "overlay reduced motion fade_ms={}",
                self.timing.reduced_motion_fade.as_millis()
            );
            self.set_mode(OverlayMode::ReducedMotion { complete: false });
            self.phase_timer = Some(
                self.timers
                    .schedule(self.timing.reduced_motion_fade, TimerKind::FallbackFade),
            );
            return self.mode;
        }

        let plan = OdometerPlan::new(&self.props.stock_price, &self.timing, &mut self.rng);
        info!(
            "overlay start ticker={} digits={} grid={}x{} force_replay={}",
            self.props.ticker,
            plan.digit_count(),
            self.grid.columns,
            self.grid.rows,
            self.props.force_replay
        );
        self.odometer = Some(plan);
        self.enter(AnimationPhase::Intro);
        self.mode
    }

    /// Advance the overlay clock by `by`, firing every timer that comes due.
    pub fn advance(&mut self, by: Duration) {
        let until = self.timers.now() + by;
        self.advance_to(until);
    }

    /// Advance the overlay clock to `until` (elapsed time since mount).
    pub fn advance_to(&mut self, until: Duration) {
        while let Some((id, kind)) = self.timers.pop_due(until) {
            self.fire(id, kind);
        }
        self.timers.settle_at(until);
    }

    /// Tear down: every outstanding timer is cancelled and nothing fires afterwards.
    pub fn unmount(&mut self) {
        let pending = self.timers.len();
        self.timers.cancel_all();
        self.phase_timer = None;
        self.strip_timers.clear();
        debug!("overlay unmounted cancelled_timers={}", pending);
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn phase(&self) -> Option<AnimationPhase> {
        match self.mode {
            OverlayMode::Running(phase) => Some(phase),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.mode,
            OverlayMode::Skipped
                | OverlayMode::ReducedMotion { complete: true }
                | OverlayMode::Running(AnimationPhase::Done)
        )
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn odometer(&self) -> Option<&OdometerPlan> {
        self.odometer.as_ref()
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Bumped on every mode or phase change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view(&self) -> OverlayView {
        let phase = self.phase();
        let (visible, text_visible, fading_out) = match self.mode {
            OverlayMode::Pending | OverlayMode::Skipped => (false, false, false),
            OverlayMode::ReducedMotion { complete } => (!complete, !complete, !complete),
            OverlayMode::Running(p) => (
                p != AnimationPhase::Done,
                p.shows_text(),
                p == AnimationPhase::FadeText,
            ),
        };
        let day_change = match phase {
            Some(AnimationPhase::DayChange) | Some(AnimationPhase::FadeText) => {
                Some(self.props.day_change_label())
            }
            _ => None,
        };
        let wipe = if phase == Some(AnimationPhase::Blocks) {
            self.grid.cells(self.timing.block_stagger)
        } else {
            Vec::new()
        };

        OverlayView {
            visible,
            phase,
            company_name: self.props.company_name.clone(),
            ticker: self.props.ticker.clone(),
            text_visible,
            rolling: phase == Some(AnimationPhase::PriceRoll),
            day_change,
            day_change_negative: self.props.day_change_is_negative(),
            fading_out,
            glyphs: self
                .odometer
                .as_ref()
                .map(|plan| plan.glyphs().to_vec())
                .unwrap_or_default(),
            wipe,
            accent_color: self.props.accent_color.clone(),
            background_color: self.props.background_color.clone(),
        }
    }

    fn set_mode(&mut self, mode: OverlayMode) {
        self.mode = mode;
        self.revision += 1;
    }

    fn enter(&mut self, phase: AnimationPhase) {
        if let Some(id) = self.phase_timer.take() {
            self.timers.cancel(id);
        }
        debug!(
            "overlay phase={:?} at_ms={}",
            phase,
            self.timers.now().as_millis()
        );
        self.set_mode(OverlayMode::Running(phase));

        match phase.trigger(&self.timing, &self.grid) {
            Trigger::After(hold) => {
                self.phase_timer = Some(self.timers.schedule(hold, TimerKind::PhaseHold));
            }
            Trigger::RollThen(_) => self.start_roll(),
            Trigger::Terminal => self.finish(),
        }
    }

    fn start_roll(&mut self) {
        let digits = self.odometer.as_ref().map_or(0, OdometerPlan::digit_count);
        self.roll = Some(RollTracker::new(digits));
        if digits == 0 {
            self.on_roll_complete();
            return;
        }
        if let Some(plan) = &self.odometer {
            for strip in plan.strips() {
                let id = self.timers.schedule(
                    strip.settles_after(),
                    TimerKind::StripSettled(strip.digit_index),
                );
                self.strip_timers.push(id);
            }
        }
    }

    fn on_roll_complete(&mut self) {
        self.strip_timers.clear();
        let Some(phase) = self.phase() else {
            return;
        };
        if let Trigger::RollThen(hold) = phase.trigger(&self.timing, &self.grid) {
            debug!(
                "odometer settled at_ms={} hold_ms={}",
                self.timers.now().as_millis(),
                hold.as_millis()
            );
            self.phase_timer = Some(self.timers.schedule(hold, TimerKind::PhaseHold));
        }
    }

    fn finish(&mut self) {
        self.timers.cancel_all();
        self.phase_timer = None;
        self.strip_timers.clear();
        mark_run(self.store.as_ref(), &self.flag_key);
        info!("overlay done at_ms={}", self.timers.now().as_millis());
    }

    fn fire(&mut self, id: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::PhaseHold => {
                if self.phase_timer != Some(id) {
                    return;
                }
                self.phase_timer = None;
                if let Some(next) = self
                    .phase()
                    .and_then(|phase| phase.on_signal(Signal::HoldElapsed))
                {
                    self.enter(next);
                }
            }
            TimerKind::StripSettled(digit_index) => {
                self.strip_timers.retain(|t| *t != id);
                let completed = self
                    .roll
                    .as_mut()
                    .is_some_and(|roll| roll.settle(digit_index));
                if completed {
                    self.on_roll_complete();
                }
            }
            TimerKind::FallbackFade => {
                self.phase_timer = None;
                mark_run(self.store.as_ref(), &self.flag_key);
                self.set_mode(OverlayMode::ReducedMotion { complete: true });
                info!("overlay reduced motion fade done");
            }
        }
    }
}
