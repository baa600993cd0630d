use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by sfmod.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    ParameterError(String),
    InvalidModulator(String),
    ModulatorNotFound,
    ChannelNotFound(usize),
    SendError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::InvalidModulator(str) => write!(f, "Invalid modulator: {str}"),
            Self::ModulatorNotFound => write!(f, "No identical modulator found"),
            Self::ChannelNotFound(channel) => write!(f, "MIDI channel {channel} not found"),
            Self::SendError(str) => write!(f, "Failed to send synth message: {str}"),
        }
    }
}

impl<T> From<crossbeam_channel::TrySendError<T>> for Error {
    fn from(err: crossbeam_channel::TrySendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}
