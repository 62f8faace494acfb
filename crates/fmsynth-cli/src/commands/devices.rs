//! Audio output device listing.

use clap::Args;
use fmsynth_io::{AudioBackend, CpalBackend};

#[derive(Args)]
pub struct DevicesArgs {}

pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::new();
    let devices = backend.output_devices()?;
    let default = backend.default_output_device()?;

    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    println!("Output Devices ({})", backend.name());
    println!("==============\n");
    for (idx, name) in devices.iter().enumerate() {
        let marker = if default.as_ref() == Some(name) {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", idx, name, marker);
    }
    println!();
    println!("Tip: use a partial name with --device or the [audio] device key:");
    println!("  fmsynth play --device \"{}\"", devices[0]);
    Ok(())
}
