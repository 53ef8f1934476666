//! Virtual device: serves the register protocol on stdin/stdout against
//! simulated registers. Logs go to stderr, filtered by `RUST_LOG`.

mod stdio;

use register_proxy::{RegisterProxy, SerialChannel, SimulatedRegisters};

use stdio::{StreamRx, StreamTx};

fn main() {
    env_logger::init();

    let channel = SerialChannel::new(StreamTx(std::io::stdout()), StreamRx(std::io::stdin()));
    let mut proxy = RegisterProxy::new(channel, SimulatedRegisters::new());
    log::info!("serving register commands on stdin/stdout");

    match proxy.run() {
        Ok(never) => match never {},
        Err(e) => std::process::exit(stdio::exit_code(&e)),
    }
}
