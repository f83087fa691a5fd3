//! # SIM7K Tracker
//!
//! SIM7K Tracker is an SMS-controlled GPS tracking engine for SIMCom
//! SIM7000-family modems, written for battery-powered installs on a
//! Raspberry Pi. The modem spends most of its life in software sleep with
//! SMS delivery armed; a text containing a keyword wakes the engine up:
//!
//! * `SINGLE` - one position report to the sender,
//! * `MULTI` - a sequence of reports, three minutes apart,
//! * `ACTIVATE` - persist the sender as the alert contact,
//! * `GUARD` - poll continuously and alert when the position moves,
//! * `STOP` - end guard mode (only honoured while guarding).
//!
//! Reports carry the position, the battery voltage and a Google Maps link.
//! All timing, retry and threshold policy lives in [`config::TrackerConfig`]
//! as plain data.
//!
//! The engine talks to the modem over a raw UART and toggles the DTR line to
//! wake it; both sit behind small traits in [`port`], so the whole protocol
//! stack is testable against scripted transports.
//!
//! ## Example usage
//! ```no_run
//! use sim7k_tracker::config::TrackerConfig;
//! use sim7k_tracker::port::{DtrLine, SystemClock, UartTransport};
//! use sim7k_tracker::store::FileContactStore;
//! use sim7k_tracker::Tracker;
//!
//! fn main() -> Result<(), sim7k_tracker::Error> {
//!     let transport = UartTransport::new("/dev/ttyS0", 9600)?;
//!     let wake_line = DtrLine::new(4)?;
//!     let store = FileContactStore::new("/var/lib/sim7k-tracker/contact");
//!     let config = TrackerConfig::default();
//!
//!     let mut tracker = Tracker::new(
//!         transport,
//!         SystemClock,
//!         wake_line,
//!         store,
//!         config,
//!         sim7k_tracker::LogLevelFilter::Info,
//!     )?;
//!     tracker.run()
//! }
//! ```

pub mod config;
pub mod gnss;
pub mod guard;
pub mod line;
pub mod matcher;
pub mod modem;
pub mod port;
pub mod session;
pub mod sms;
pub mod store;
pub mod tracker;

mod error;
#[cfg(test)]
pub(crate) mod mock;

pub use error::{Error, ErrorKind};
pub use log::LevelFilter as LogLevelFilter;
pub use tracker::{SessionMode, Tracker};

use lazy_static::lazy_static;
use regex::Regex;

const REGEX_COMP_ERROR: &str = "Critical error: Regex compilation has failed.";

lazy_static! {
    static ref GNSS_DATA_REGEX: Regex =
        Regex::new(r"\+CGNSINF: (?<data>.+)").expect(REGEX_COMP_ERROR);
    static ref SMS_SENDER_REGEX: Regex =
        Regex::new(r#":[^"]*"(?<msisdn>[^"]*)""#).expect(REGEX_COMP_ERROR);
    static ref BATTERY_REGEX: Regex =
        Regex::new(r"\+CBC: \d+,\d+,(?<millivolts>\d+)").expect(REGEX_COMP_ERROR);
}
