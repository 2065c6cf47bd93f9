// Command-line arguments
//
// Precedence for ramp settings: flags > --profile file > built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigError, DEFAULT_BAUDRATE, DEFAULT_PORT, load_profile};
use crate::ramp::{RampProfile, RunOptions};

#[derive(Debug, Parser)]
#[command(
    name = "vesc-ramp",
    version,
    about = "Ramp a VESC motor controller's duty cycle up, hold it, and ramp back down"
)]
pub struct Args {
    /// Serial device of the VESC
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUDRATE)]
    pub baud: u32,

    /// JSON ramp profile (target_duty, steps, step_delay_ms, hold_ms)
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Duty cycle to hold, -1.0..=1.0 (negative = reverse)
    #[arg(long, allow_negative_numbers = true)]
    pub target_duty: Option<f64>,

    #[arg(long)]
    pub steps: Option<u32>,

    #[arg(long)]
    pub step_delay_ms: Option<u64>,

    #[arg(long)]
    pub hold_ms: Option<u64>,

    /// Don't send alive frames while dwelling
    #[arg(long)]
    pub no_keepalive: bool,

    /// Encode and log frames without opening the serial port
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the safety confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

impl Args {
    /// Resolve the ramp profile and check it
    pub fn ramp_profile(&self) -> Result<RampProfile, ConfigError> {
        let mut profile = match &self.profile {
            Some(path) => load_profile(path)?,
            None => RampProfile::default(),
        };

        if let Some(target_duty) = self.target_duty {
            profile.target_duty = target_duty;
        }
        if let Some(steps) = self.steps {
            profile.steps = steps;
        }
        if let Some(step_delay_ms) = self.step_delay_ms {
            profile.step_delay_ms = step_delay_ms;
        }
        if let Some(hold_ms) = self.hold_ms {
            profile.hold_ms = hold_ms;
        }

        profile.validate()?;
        Ok(profile)
    }

    pub fn run_options(&self) -> RunOptions {
        if self.no_keepalive {
            RunOptions { keepalive: None }
        } else {
            RunOptions::default()
        }
    }
}
