use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vesc_ramp::cli::Args;
use vesc_ramp::vesc::list_ports;

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_ports {
        match list_ports() {
            Ok(ports) if ports.is_empty() => println!("No serial ports found"),
            Ok(ports) => {
                for port in ports {
                    println!("{}  {:?}", port.port_name, port.port_type);
                }
            }
            Err(e) => {
                eprintln!("Cannot enumerate serial ports: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if !args.yes && !args.dry_run {
        match confirm("The motor WILL spin. Is it clear to run?") {
            Ok(true) => {}
            Ok(false) => {
                println!("Aborted.");
                return;
            }
            Err(e) => {
                eprintln!("Cannot read confirmation: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Serial writes stay on one blocking thread; Ctrl+C only flips the flag
    let abort = Arc::new(AtomicBool::new(false));
    let mut worker = tokio::task::spawn_blocking({
        let abort = Arc::clone(&abort);
        move || vesc_ramp::runtime::run(&args, &abort)
    });

    let finished = tokio::select! {
        joined = &mut worker => Some(joined),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            warn!("Ctrl+C received, stopping motor");
            abort.store(true, Ordering::SeqCst);
            worker.await
        }
    };

    match joined {
        Ok(Ok(report)) => info!(
            "Test complete: {} duty frames, peak duty {:.2}",
            report.duty_frames, report.peak_duty
        ),
        Ok(Err(e)) => {
            eprintln!("Runtime error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Ramp task failed: {}", e);
            std::process::exit(1);
        }
    }
}
