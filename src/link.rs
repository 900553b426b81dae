//! The transport side of the device protocol: moving lines in and out of a
//! serial port, and folding what comes back into a [DeviceState].

use crate::protocol::{Command, DeviceMessage};

use log::{debug, info, warn};
use serial2::SerialPort;
use std::{borrow::Cow, fmt, io, str, time::Duration};

/// Baud rate the device listens at.
pub const BAUD_RATE: u32 = 115200;

/// How long one [SerialLink::receive_lines] call waits for data.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Returned when the link itself fails. Lines that do not parse are not
/// errors, see [DeviceMessage::Unrecognized].
#[derive(Debug)]
pub enum LinkError {
    /// The port could not be opened or configured.
    OpenError(String, io::Error),
    /// Reading from or writing to the port failed.
    IoError(io::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            LinkError::OpenError(name, error) => {
                Cow::from(format!("cannot open {}: {}", name, error))
            }
            LinkError::IoError(error) => Cow::from(format!("io error: {}", error)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for LinkError {}

impl From<io::Error> for LinkError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

/// `LineLink`
///
/// A bidirectional, newline-delimited text channel to the device.
pub trait LineLink {
    /// Send one line. The terminating `\n` is added here.
    fn send_line(&mut self, line: &str) -> Result<(), LinkError>;

    /// Return the complete lines received since the last call, without their
    /// line endings. An empty `Vec` means nothing arrived in time.
    fn receive_lines(&mut self) -> Result<Vec<String>, LinkError>;

    /// Send a [Command] in its wire form.
    fn send(&mut self, command: &Command) -> Result<(), LinkError> {
        debug!("Sending {}", command);
        self.send_line(&command.to_string())
    }
}

/// Longest line kept by a [LineAssembler], in bytes.
pub const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into lines.
///
/// Bytes are buffered until a `\n` arrives. Lines that are not valid UTF-8
/// are logged and dropped; that mostly happens right after the port opens,
/// while the hardware buffer still holds garbage. A line longer than
/// [MAX_LINE_LEN] is dropped as well, up to and including its `\n`.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
    discarding: bool,
}

impl LineAssembler {
    /// An assembler with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes in, get every line they complete back.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &c in bytes {
            if c != b'\n' {
                if self.discarding {
                    continue;
                }
                if self.buf.len() >= MAX_LINE_LEN {
                    warn!("Dropping a line longer than {} bytes", MAX_LINE_LEN);
                    self.buf.clear();
                    self.discarding = true;
                    continue;
                }
                self.buf.push(c);
                continue;
            }

            if self.discarding {
                self.discarding = false;
                continue;
            }

            match str::from_utf8(&self.buf) {
                Ok(s) => lines.push(s.trim_end_matches('\r').to_owned()),
                Err(e) => warn!("Failed to decode utf-8: {:?}", e),
            }
            self.buf.clear();
        }
        lines
    }

    /// Number of bytes waiting for their line to end.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// A [LineLink] over a serial port.
pub struct SerialLink {
    name: String,
    port: SerialPort,
    assembler: LineAssembler,
}

impl SerialLink {
    /// Open `name` at `baud` with a [READ_TIMEOUT] read timeout.
    pub fn open(name: &str, baud: u32) -> Result<Self, LinkError> {
        let open_err = |e| LinkError::OpenError(name.to_owned(), e);
        let mut port = SerialPort::open(name, baud).map_err(open_err)?;
        port.set_read_timeout(READ_TIMEOUT).map_err(open_err)?;
        info!("Opened {} at {} baud", name, baud);

        Ok(Self {
            name: name.to_owned(),
            port,
            assembler: LineAssembler::new(),
        })
    }

    /// The serial ports present on this machine.
    pub fn available_ports() -> Result<Vec<String>, LinkError> {
        Ok(SerialPort::available_ports()?
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    /// The port this link was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LineLink for SerialLink {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.port.write_all(&bytes)?;
        Ok(())
    }

    fn receive_lines(&mut self) -> Result<Vec<String>, LinkError> {
        let mut buffer = [0; 256];
        match self.port.read(&mut buffer) {
            Ok(read_len) => Ok(self.assembler.push(&buffer[..read_len])),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The latest known state of the device, built up from its messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    /// Angle the device reports playing at
    pub angle: Option<i32>,
    /// Last angle the device acknowledged
    pub selected_angle: Option<i32>,
    /// File now playing
    pub track: Option<String>,
    /// Playback position in percent
    pub progress: Option<u8>,
    /// Output volume
    pub volume: Option<i32>,
    /// File list as `(index, name)`, in arrival order
    pub files: Vec<(u32, String)>,
    /// Whether `FILELIST_END` has arrived for the current list
    pub file_list_complete: bool,
    /// Lines that were not understood
    pub unrecognized: usize,
}

impl DeviceState {
    /// Fold one message in. A `FILE` entry arriving after a finished list
    /// starts a new list.
    pub fn apply(&mut self, msg: DeviceMessage) {
        match msg {
            DeviceMessage::Angle(a) => self.angle = Some(a),
            DeviceMessage::SelectedAngle(a) => self.selected_angle = Some(a),
            DeviceMessage::Track(name) => self.track = Some(name),
            DeviceMessage::Progress(p) => self.progress = Some(p),
            DeviceMessage::Volume(v) => self.volume = Some(v),
            DeviceMessage::File { index, name } => {
                if self.file_list_complete {
                    self.files.clear();
                    self.file_list_complete = false;
                }
                self.files.push((index, name));
            }
            DeviceMessage::FileListEnd => self.file_list_complete = true,
            DeviceMessage::Unrecognized(line) => {
                warn!("Unknown message: {:?}", line);
                self.unrecognized += 1;
            }
        }
    }

    /// Read whatever the link has, apply it, and return the parsed messages.
    pub fn poll<L>(&mut self, link: &mut L) -> Result<Vec<DeviceMessage>, LinkError>
    where
        L: LineLink + ?Sized,
    {
        let msgs: Vec<DeviceMessage> = link
            .receive_lines()?
            .iter()
            .map(|line| DeviceMessage::parse(line))
            .collect();

        for msg in &msgs {
            debug!("Received {:?}", msg);
            self.apply(msg.clone());
        }
        Ok(msgs)
    }

    /// Name of the file at `index` in the current list.
    pub fn file_name(&self, index: u32) -> Option<&str> {
        self.files
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, name)| name.as_str())
    }
}
