// Wires the CLI settings to a link and plays the ramp on it.
// Runs on one blocking thread; the abort flag is the only shared state.

use std::sync::atomic::AtomicBool;
use tracing::info;

use crate::cli::Args;
use crate::ramp::{RampProfile, RampReport, RunOptions, run_ramp};
use crate::vesc::{LinkConfig, MockTransport, Transport, VescLink};

pub fn run(
    args: &Args,
    abort: &AtomicBool,
) -> Result<RampReport, Box<dyn std::error::Error + Send + Sync>> {
    let profile = args.ramp_profile()?;
    let options = args.run_options();

    info!(
        "Ramp profile: target duty {:.2}, {} steps, {}ms per step, hold {}ms",
        profile.target_duty, profile.steps, profile.step_delay_ms, profile.hold_ms
    );

    if args.dry_run {
        info!("Dry run: frames are recorded in memory, serial port untouched");
        let link = VescLink::new(MockTransport::new(), LinkConfig::default());
        return play(link, &profile, &options, abort);
    }

    info!("Connecting to VESC at {} ...", args.port);
    let link = VescLink::open(&args.port, args.baud, LinkConfig::default())?;
    info!("Connected to VESC");
    play(link, &profile, &options, abort)
}

fn play<T: Transport>(
    mut link: VescLink<T>,
    profile: &RampProfile,
    options: &RunOptions,
    abort: &AtomicBool,
) -> Result<RampReport, Box<dyn std::error::Error + Send + Sync>> {
    Ok(run_ramp(&mut link, profile.schedule(), options, abort)?)
}
