//! Example of running the tracker on a Raspberry Pi with the modem on the
//! primary UART and DTR wired to BCM pin 4.

use sim7k_tracker::{
    config::TrackerConfig,
    port::{DtrLine, SystemClock, UartTransport},
    store::FileContactStore,
    Tracker,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // optional JSON config; absent file means the field-proven defaults
    let config = match TrackerConfig::load("/etc/sim7k-tracker.json") {
        Ok(config) => config,
        Err(_) => TrackerConfig::default(),
    };

    let transport = UartTransport::new("/dev/ttyS0", 9600)?;
    let wake_line = DtrLine::new(4)?;
    let store = FileContactStore::new("/var/lib/sim7k-tracker/contact");

    let mut tracker = Tracker::new(
        transport,
        SystemClock,
        wake_line,
        store,
        config,
        sim7k_tracker::LogLevelFilter::Info,
    )?;

    // never returns unless the link fails
    tracker.run()?;
    Ok(())
}
