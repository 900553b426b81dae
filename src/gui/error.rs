use std::{borrow::Cow, error::Error, fmt, io};

/// Returned when the terminal cannot be driven.
#[derive(Debug)]
pub enum GuiError {
    /// Terminal setup, drawing, or event reading failed.
    IoError(io::Error),
    /// There was nothing to choose from.
    NoPorts,
}

impl fmt::Display for GuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GuiError::IoError(e) => Cow::from(format!("terminal error: {}", e)),
            GuiError::NoPorts => Cow::from("no serial ports found"),
        };
        write!(f, "{}", msg)
    }
}

impl Error for GuiError {}

impl From<io::Error> for GuiError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}
