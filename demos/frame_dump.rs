// Frame dump: prints the exact bytes a ramp would put on the wire.
//
// Touches no hardware - useful for checking frames against a logic analyzer
// capture or another VESC implementation.
//
// Usage: cargo run --example frame_dump -- [target_duty] [steps]
// Example: cargo run --example frame_dump -- 0.5 10

use vesc_ramp::ramp::RampProfile;
use vesc_ramp::vesc::{Frame, encode_alive, encode_duty_cycle};

fn hex(frame: &Frame) -> String {
    frame
        .as_bytes()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let target_duty: f64 = args.next().map(|s| s.parse::<f64>()).transpose()?.unwrap_or(0.5);
    let steps: u32 = args.next().map(|s| s.parse::<u32>()).transpose()?.unwrap_or(10);

    let profile = RampProfile {
        target_duty,
        steps,
        ..RampProfile::default()
    };
    profile.validate()?;

    println!("Ramp to {:.2} in {} steps", target_duty, steps);
    println!();
    println!("{:<10} {:>8}  frame", "phase", "duty");

    for step in profile.schedule() {
        let frame = encode_duty_cycle(step.duty)?;
        println!(
            "{:<10} {:>8.5}  {}",
            format!("{:?}", step.phase),
            step.duty,
            hex(&frame)
        );
    }

    println!();
    println!("{:<10} {:>8}  {}", "Alive", "-", hex(&encode_alive()));

    Ok(())
}
