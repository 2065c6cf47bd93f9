// Ramp-up / hold / ramp-down duty schedule and the runner that plays it
//
// Note: every exit path of the runner leaves the motor at zero duty. A clean
// run ends on the schedule's final 0.0 step; a failed or interrupted run gets
// an emergency zero-duty write before the error is handed back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;
use tracing::{error, info};

use crate::config::{
    ABORT_POLL_INTERVAL, ConfigError, HOLD_MS, KEEPALIVE_INTERVAL, RAMP_DELAY_MS, RAMP_STEPS,
    TARGET_DUTY,
};
use crate::vesc::{Result, Transport, VescError, VescLink};

/// Shape of one ramp test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampProfile {
    /// Duty cycle held at the top of the ramp (negative = reverse)
    pub target_duty: f64,
    /// Number of increments between 0 and the target
    pub steps: u32,
    pub step_delay_ms: u64,
    pub hold_ms: u64,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            target_duty: TARGET_DUTY,
            steps: RAMP_STEPS,
            step_delay_ms: RAMP_DELAY_MS,
            hold_ms: HOLD_MS,
        }
    }
}

impl RampProfile {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.target_duty.is_finite() || self.target_duty.abs() > 1.0 {
            return Err(ConfigError::InvalidProfile(format!(
                "target duty {} is outside [-1.0, 1.0]",
                self.target_duty
            )));
        }
        if self.steps == 0 {
            return Err(ConfigError::InvalidProfile(
                "steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// A fresh pass over the schedule; call again to restart
    pub fn schedule(&self) -> RampSchedule {
        RampSchedule {
            profile: *self,
            index: 0,
        }
    }

    /// Duty at increment `i` of `steps`; exact at both ends
    fn duty_at(&self, i: u32) -> f64 {
        let steps = self.steps.max(1);
        if i == 0 {
            0.0
        } else if i >= steps {
            self.target_duty
        } else {
            self.target_duty * f64::from(i) / f64::from(steps)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPhase {
    RampUp,
    Hold,
    RampDown,
}

impl fmt::Display for RampPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RampPhase::RampUp => write!(f, "ramping up"),
            RampPhase::Hold => write!(f, "holding"),
            RampPhase::RampDown => write!(f, "ramping down"),
        }
    }
}

/// One set-point and how long to stay on it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStep {
    pub phase: RampPhase,
    pub duty: f64,
    pub dwell: Duration,
}

/// Finite iterator over the steps of a profile
///
/// `steps` increments up (excluding 0), one hold at the target, then
/// `steps` decrements down to exactly 0.0: `2 * steps + 1` items.
#[derive(Debug, Clone)]
pub struct RampSchedule {
    profile: RampProfile,
    index: usize,
}

impl RampSchedule {
    fn total(&self) -> usize {
        2 * self.profile.steps.max(1) as usize + 1
    }
}

impl Iterator for RampSchedule {
    type Item = RampStep;

    fn next(&mut self) -> Option<RampStep> {
        let n = self.profile.steps.max(1) as usize;
        if self.index >= self.total() {
            return None;
        }
        let index = self.index;
        self.index += 1;

        let step = if index < n {
            RampStep {
                phase: RampPhase::RampUp,
                duty: self.profile.duty_at(index as u32 + 1),
                dwell: self.profile.step_delay(),
            }
        } else if index == n {
            RampStep {
                phase: RampPhase::Hold,
                duty: self.profile.target_duty,
                dwell: self.profile.hold(),
            }
        } else {
            RampStep {
                phase: RampPhase::RampDown,
                duty: self.profile.duty_at((2 * n - index) as u32),
                dwell: self.profile.step_delay(),
            }
        };
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RampSchedule {}

/// Runner behaviour
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Send alive frames this often while dwelling (None disables them)
    pub keepalive: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            keepalive: Some(KEEPALIVE_INTERVAL),
        }
    }
}

/// What a run put on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RampReport {
    pub duty_frames: usize,
    pub keepalive_frames: usize,
    /// Largest |duty| commanded
    pub peak_duty: f64,
}

/// Play a schedule on the link, then close it
///
/// On any error (bad duty, failed write, abort) the link gets a zero-duty
/// write and is closed before the error is returned.
pub fn run_ramp<T: Transport>(
    link: &mut VescLink<T>,
    schedule: impl IntoIterator<Item = RampStep>,
    options: &RunOptions,
    abort: &AtomicBool,
) -> Result<RampReport> {
    let mut report = RampReport::default();

    match drive(link, schedule, options, abort, &mut report) {
        Ok(()) => {
            link.close();
            info!(
                "Ramp complete: {} duty frames, {} keepalives, peak duty {:.2}",
                report.duty_frames, report.keepalive_frames, report.peak_duty
            );
            Ok(report)
        }
        Err(e) => {
            error!("Ramp aborted: {}", e);
            link.emergency_stop();
            Err(e)
        }
    }
}

fn drive<T: Transport>(
    link: &mut VescLink<T>,
    schedule: impl IntoIterator<Item = RampStep>,
    options: &RunOptions,
    abort: &AtomicBool,
    report: &mut RampReport,
) -> Result<()> {
    let mut phase = None;

    for step in schedule {
        check_abort(abort)?;

        if phase != Some(step.phase) {
            info!("Motor {}", step.phase);
            phase = Some(step.phase);
        }

        info!("Setting duty: {:.2}", step.duty);
        link.set_duty_cycle(step.duty)?;
        report.duty_frames += 1;
        report.peak_duty = report.peak_duty.max(step.duty.abs());

        dwell(link, step.dwell, options, abort, report)?;
    }

    Ok(())
}

/// Wait on the current set-point, feeding keepalives and watching for aborts
fn dwell<T: Transport>(
    link: &mut VescLink<T>,
    duration: Duration,
    options: &RunOptions,
    abort: &AtomicBool,
    report: &mut RampReport,
) -> Result<()> {
    let keepalive = options.keepalive.filter(|interval| !interval.is_zero());
    let tick = keepalive.unwrap_or(ABORT_POLL_INTERVAL);

    let mut remaining = duration;
    let mut first = true;
    while !remaining.is_zero() {
        check_abort(abort)?;

        // The set-point write itself counts as the first keepalive
        if !first && keepalive.is_some() {
            link.send_alive()?;
            report.keepalive_frames += 1;
        }
        first = false;

        let chunk = remaining.min(tick);
        sleep(chunk);
        remaining -= chunk;
    }

    Ok(())
}

fn check_abort(abort: &AtomicBool) -> Result<()> {
    if abort.load(Ordering::SeqCst) {
        Err(VescError::Interrupted)
    } else {
        Ok(())
    }
}
