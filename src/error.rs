/// returned by [`Error::kind`] method.
pub enum ErrorKind {
    Config,
    Gpio,
    Io,
    LinkClosed,
    Uart,
}

/// sim7k-tracker Error enum.
#[derive(Debug)]
pub enum Error {
    Config(serde_json::Error),
    Gpio(rppal::gpio::Error),
    Io(std::io::Error),
    LinkClosed,
    Uart(rppal::uart::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Config(ref err) => write!(f, "Config - the tracker configuration could not be parsed: {}", err),
            Error::Gpio(ref err) => write!(f, "GPIO error on the modem wake line: {}", err),
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
            Error::LinkClosed => write!(f, "Link - the transport produced no further bytes - check the modem wiring and power."),
            Error::Uart(ref err) => write!(f, "Uart error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(ref _e) => ErrorKind::Config,
            Error::Gpio(ref _e) => ErrorKind::Gpio,
            Error::Io(ref _e) => ErrorKind::Io,
            Error::LinkClosed => ErrorKind::LinkClosed,
            Error::Uart(ref _e) => ErrorKind::Uart,
        }
    }
}

impl From<rppal::uart::Error> for Error {
    fn from(err: rppal::uart::Error) -> Error {
        Error::Uart(err)
    }
}

impl From<rppal::gpio::Error> for Error {
    fn from(err: rppal::gpio::Error) -> Error {
        Error::Gpio(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Config(err)
    }
}
