//! Thermal cycling between two setpoints.
//!
//! [`CycleMachine`] is the bare state machine: it owns the phase, dwell
//! deadline and cycle counters, and is fed one `(now, measured)` pair per
//! poll. [`run`] drives it against a live controller, programming setpoints
//! through the property layer only and never touching the wire format.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::controller::Tc4820;
use crate::error::Error;

/// Tolerance within which the measured temperature counts as having reached
/// its target.
pub const STABLE_BAND_C: f32 = 0.2;

/// Default pause between polls of the control temperature.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How many times a setpoint write is attempted before the run is abandoned.
const SETPOINT_ATTEMPTS: u32 = 3;

/// One end of the cycle: a target temperature and how long to sit there
/// once it is reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePoint {
    pub temperature_c: f32,
    pub dwell: Duration,
}

impl CyclePoint {
    pub const fn new(temperature_c: f32, dwell: Duration) -> Self {
        Self { temperature_c, dwell }
    }
}

/// Full description of a cycling run.
#[derive(Debug, Clone, Copy)]
pub struct CycleConfig {
    /// The starting point. The run always ramps here first.
    pub point_a: CyclePoint,
    pub point_b: CyclePoint,
    /// Number of full cycles to perform; `None` cycles until cancelled.
    pub cycles: Option<u32>,
    pub poll_interval: Duration,
}

impl CycleConfig {
    pub const fn new(point_a: CyclePoint, point_b: CyclePoint, cycles: Option<u32>) -> Self {
        Self {
            point_a,
            point_b,
            cycles,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Where the run currently is. The warm/cold labels are fixed at start from
/// whichever of A/B has the higher temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RampingToWarm,
    HoldingWarm,
    RampingToCold,
    HoldingCold,
}

/// What the driving loop must do after a poll has been fed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Keep ramping or holding; nothing to send.
    Idle,
    /// The target was just reached; the dwell timer is now running.
    Stable,
    /// A dwell elapsed; the new target must be programmed.
    Ramp(f32),
    /// The cycle limit is exhausted. No further ramp is issued, so the
    /// controller keeps holding its final position.
    Finished,
}

/// Per-poll progress report.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub elapsed: Duration,
    pub phase: Phase,
    pub measured_c: f32,
    /// Output power fraction, when the read succeeded this tick.
    pub output_power: Option<f32>,
    pub completed_cycles: u32,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The configured number of cycles finished.
    Completed,
    /// The caller's cancel flag was observed. Not an error.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    pub outcome: CycleOutcome,
    pub completed_cycles: u32,
    pub elapsed: Duration,
}

/// Failures that end a run.
///
/// A failed temperature poll is only ever skipped, so the one fatal
/// condition is a setpoint write the controller never acknowledged: at that
/// point a phase transition is committed on our side but possibly not on
/// the controller's.
#[derive(Error, Debug)]
pub enum CycleError<I: embedded_io::Error> {
    #[error("failed to program setpoint after {attempts} attempts: {last_error}")]
    SetpointWrite {
        attempts: u32,
        last_error: Error<I>,
    },
}

/// The cycling state machine, free of any I/O or real clock.
#[derive(Debug)]
pub struct CycleMachine {
    warm: CyclePoint,
    cold: CyclePoint,
    /// Whether point A (the defined starting point) is the warm one.
    start_is_warm: bool,
    phase: Phase,
    hold_until: Option<Instant>,
    completed: u32,
    remaining: Option<u32>,
}

impl CycleMachine {
    /// Labels warm/cold (ties go to A) and aims the first ramp at point A.
    pub fn new(config: &CycleConfig) -> Self {
        let a_is_warm = config.point_a.temperature_c >= config.point_b.temperature_c;
        let (warm, cold) = if a_is_warm {
            (config.point_a, config.point_b)
        } else {
            (config.point_b, config.point_a)
        };
        Self {
            warm,
            cold,
            start_is_warm: a_is_warm,
            phase: if a_is_warm {
                Phase::RampingToWarm
            } else {
                Phase::RampingToCold
            },
            hold_until: None,
            completed: 0,
            remaining: config.cycles,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Temperature the controller should currently be driving towards.
    pub fn target_c(&self) -> f32 {
        match self.phase {
            Phase::RampingToWarm | Phase::HoldingWarm => self.warm.temperature_c,
            Phase::RampingToCold | Phase::HoldingCold => self.cold.temperature_c,
        }
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed
    }

    /// Feed one poll into the machine.
    ///
    /// Skipped polls (transport trouble) must simply not call this; phase,
    /// target and dwell deadline then stay as they were.
    pub fn tick(&mut self, now: Instant, measured_c: f32) -> Step {
        // An exhausted limit (including a zero limit at construction) never
        // cycles; nothing is counted and no ramp is ever requested.
        if self.remaining == Some(0) {
            return Step::Finished;
        }
        match self.phase {
            Phase::RampingToWarm => self.check_stable(now, measured_c, true),
            Phase::HoldingWarm => self.check_dwell(now, true),
            Phase::RampingToCold => self.check_stable(now, measured_c, false),
            Phase::HoldingCold => self.check_dwell(now, false),
        }
    }

    fn check_stable(&mut self, now: Instant, measured_c: f32, warm: bool) -> Step {
        let point = if warm { self.warm } else { self.cold };
        if (measured_c - point.temperature_c).abs() > STABLE_BAND_C {
            return Step::Idle;
        }
        self.phase = if warm {
            Phase::HoldingWarm
        } else {
            Phase::HoldingCold
        };
        self.hold_until = Some(now + point.dwell);
        Step::Stable
    }

    fn check_dwell(&mut self, now: Instant, warm: bool) -> Step {
        let Some(deadline) = self.hold_until else {
            return Step::Idle;
        };
        if now < deadline {
            return Step::Idle;
        }
        self.hold_until = None;

        // Leaving the warm hold ramps cold, and vice versa. A full cycle
        // completes on the transition whose new target is point A. When
        // that completion exhausts the limit the ramp is never issued and
        // the phase stays at the final hold.
        let returning_to_start = if warm {
            !self.start_is_warm
        } else {
            self.start_is_warm
        };
        if returning_to_start && self.complete_cycle() {
            return Step::Finished;
        }
        self.phase = if warm {
            Phase::RampingToCold
        } else {
            Phase::RampingToWarm
        };
        Step::Ramp(self.target_c())
    }

    /// Returns true when the cycle limit is exhausted.
    fn complete_cycle(&mut self) -> bool {
        self.completed += 1;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                return true;
            }
        }
        false
    }
}

/// Drive a cycling run against a controller.
///
/// Per iteration: the cancel flag is checked first, then the control
/// temperature is polled. A failed poll is logged and skipped without
/// touching machine state. On success the machine decides whether a new
/// setpoint must be programmed (retried a bounded number of times) and a
/// [`Progress`] event is emitted before sleeping out the poll interval.
pub fn run<S, F>(
    tc: &mut Tc4820<S>,
    config: &CycleConfig,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> Result<CycleSummary, CycleError<S::Error>>
where
    S: embedded_io::Read + embedded_io::Write,
    F: FnMut(&Progress),
{
    let started = Instant::now();
    if config.cycles == Some(0) {
        return Ok(CycleSummary {
            outcome: CycleOutcome::Completed,
            completed_cycles: 0,
            elapsed: started.elapsed(),
        });
    }

    let mut machine = CycleMachine::new(config);
    tracing::info!("ramping to start point at {:.1} °C", machine.target_c());
    program_setpoint(tc, machine.target_c())?;

    let outcome = loop {
        if cancel.load(Ordering::Relaxed) {
            break CycleOutcome::Cancelled;
        }

        let now = Instant::now();
        match tc.read_control_temperature_c() {
            Ok(measured_c) => {
                match machine.tick(now, measured_c) {
                    Step::Idle => {}
                    Step::Stable => {
                        tracing::info!(
                            "reached {measured_c:.1} °C, holding ({:?})",
                            machine.phase()
                        );
                    }
                    Step::Ramp(target_c) => {
                        tracing::info!(
                            "dwell finished, ramping to {target_c:.1} °C ({} cycles done)",
                            machine.completed_cycles()
                        );
                        program_setpoint(tc, target_c)?;
                    }
                    Step::Finished => break CycleOutcome::Completed,
                }
                let output_power = tc.read_output_power().ok();
                on_progress(&Progress {
                    elapsed: now.duration_since(started),
                    phase: machine.phase(),
                    measured_c,
                    output_power,
                    completed_cycles: machine.completed_cycles(),
                });
            }
            Err(err) => {
                // Phase and deadlines are untouched; next poll retries.
                tracing::warn!("temperature poll failed, skipping tick: {err}");
            }
        }

        thread::sleep(config.poll_interval);
    };

    Ok(CycleSummary {
        outcome,
        completed_cycles: machine.completed_cycles(),
        elapsed: started.elapsed(),
    })
}

fn program_setpoint<S>(tc: &mut Tc4820<S>, target_c: f32) -> Result<(), CycleError<S::Error>>
where
    S: embedded_io::Read + embedded_io::Write,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match tc.set_setpoint_c(target_c) {
            Ok(_) => return Ok(()),
            Err(last_error) if attempt >= SETPOINT_ATTEMPTS => {
                return Err(CycleError::SetpointWrite {
                    attempts: attempt,
                    last_error,
                });
            }
            Err(err) => {
                tracing::warn!("setpoint write attempt {attempt} failed, retrying: {err}");
            }
        }
    }
}
