//! Audio output device listing command.

use clap::Args;
use compas_io::{default_output_device, list_output_devices};

#[derive(Args)]
pub struct DevicesArgs {}

pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let devices = list_output_devices()?;

    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    let default = default_output_device()?;

    println!("Available Output Devices");
    println!("========================\n");

    for (idx, device) in devices.iter().enumerate() {
        let marker = if default.as_ref().is_some_and(|d| d.name == device.name) {
            " (default)"
        } else {
            ""
        };
        println!(
            "  [{}] {} ({} ch, {} Hz){}",
            idx, device.name, device.channels, device.default_sample_rate, marker
        );
    }

    println!("\nTotal: {} output(s)", devices.len());
    println!();
    println!("Tip: Use device index or partial name with play --device:");
    println!("  compas play song.toml --device 0");
    println!("  compas play song.toml --device \"USB\"");

    Ok(())
}
