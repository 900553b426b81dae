//! Send commands to the playback device and print what it says back.
//!
//! ```text
//! surround-link -p /dev/ttyACM0 CONNECT GET_FILELIST
//! surround-link MODE:MANUEL SET_ANGLE:90 --listen 10
//! ```
//!
//! Without `--port` a picker lists the serial ports present.

use clap::Parser;
use hrirdb::{
    args::LinkArgs,
    gui::device_selector,
    link::{DeviceState, LineLink, SerialLink},
    protocol::Command,
};

use log::{debug, error, info};
use std::{
    error::Error,
    process,
    thread::sleep,
    time::{Duration, Instant},
};

// The device drops commands that arrive back to back
const COMMAND_GAP: Duration = Duration::from_millis(50);

fn main() {
    env_logger::init();
    let args = LinkArgs::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("surround-link: {}", e);
        process::exit(1);
    }
}

fn run(args: LinkArgs) -> Result<(), Box<dyn Error>> {
    // Check every command before touching the port
    let commands = args
        .commands
        .iter()
        .map(|c| c.parse::<Command>())
        .collect::<Result<Vec<_>, _>>()?;
    let listen = args.listen_duration()?;

    let port = match args.port {
        Some(port) => port,
        None => match device_selector(SerialLink::available_ports()?)? {
            Some(port) => port,
            None => {
                info!("No port selected");
                return Ok(());
            }
        },
    };

    let mut link = SerialLink::open(&port, args.baud)?;
    let mut state = DeviceState::default();

    for command in &commands {
        link.send(command)?;
        println!("> {}", command);
        sleep(COMMAND_GAP);
    }

    let deadline = Instant::now() + listen;
    while Instant::now() < deadline {
        for msg in state.poll(&mut link)? {
            println!("< {}", msg);
        }
    }

    debug!("Final state of {}: {:#?}", link.name(), state);
    if state.unrecognized > 0 {
        info!("{} unrecognized lines", state.unrecognized);
    }

    Ok(())
}
