//! The line protocol spoken with the playback device.
//!
//! Every message is one line of ASCII terminated by `\n`. We send
//! [Command]s and read back [DeviceMessage]s. Reading never fails: a line we
//! do not understand becomes [DeviceMessage::Unrecognized] so a noisy link
//! cannot take the receiver down.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i32, u32, u8},
    combinator::{all_consuming, map, map_res, rest, value, verify},
    error::{Error, ErrorKind},
    sequence::{preceded, separated_pair},
    Finish, IResult,
};
use std::{borrow::Cow, fmt, str::FromStr};

/// Largest angle the device accepts, in degrees.
pub const MAX_ANGLE: u16 = 359;
/// Largest volume or progress value, in percent.
pub const MAX_PERCENT: u8 = 100;

/// Returned when a command cannot be built or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An angle above [MAX_ANGLE].
    AngleOutOfRange(u32),
    /// A volume above [MAX_PERCENT].
    PercentOutOfRange(u32),
    /// Text that is not a command.
    ParseError {
        /// Where parsing stopped
        input: String,
        /// What the parser was looking for
        code: ErrorKind,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ProtocolError::AngleOutOfRange(a) => {
                Cow::from(format!("angle {} is outside 0..={}", a, MAX_ANGLE))
            }
            ProtocolError::PercentOutOfRange(p) => {
                Cow::from(format!("value {} is outside 0..={}", p, MAX_PERCENT))
            }
            ProtocolError::ParseError { input, code } => Cow::from(format!(
                "not a command: {:?} at {:?}",
                code, input
            )),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ProtocolError {}

/// A source angle in whole degrees, 0 to 359.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Angle(u16);

impl Angle {
    /// Reject anything above [MAX_ANGLE].
    pub fn new(degrees: u32) -> Result<Self, ProtocolError> {
        if degrees > MAX_ANGLE as u32 {
            return Err(ProtocolError::AngleOutOfRange(degrees));
        }
        Ok(Self(degrees as u16))
    }

    /// The angle in degrees.
    pub fn degrees(self) -> u16 {
        self.0
    }
}

/// A volume in percent, 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(u8);

impl Percent {
    /// Reject anything above [MAX_PERCENT].
    pub fn new(value: u32) -> Result<Self, ProtocolError> {
        if value > MAX_PERCENT as u32 {
            return Err(ProtocolError::PercentOutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    /// The value in percent.
    pub fn value(self) -> u8 {
        self.0
    }
}

/// How the device picks the source angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The device sweeps the angle itself.
    Auto,
    /// The angle follows `SET_ANGLE` commands. Sent as `MANUEL`.
    Manual,
}

/// A command sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `CONNECT`
    Connect,
    /// `MODE:AUTO` or `MODE:MANUEL`
    Mode(Mode),
    /// `SET_ANGLE:<0-359>`
    SetAngle(Angle),
    /// `GET_ANGLE`
    GetAngle,
    /// `VOLUME:<0-100>`
    Volume(Percent),
    /// `GET_FILELIST`
    GetFileList,
    /// `PLAY_INDEX:<n>`
    PlayIndex(u32),
    /// `PREV`
    Prev,
    /// `NEXT`
    Next,
    /// `PAUSE`
    Pause,
    /// `PLAY`
    Play,
}

impl Command {
    /// `SET_ANGLE`, checking the range.
    pub fn set_angle(degrees: u32) -> Result<Self, ProtocolError> {
        Angle::new(degrees).map(Command::SetAngle)
    }

    /// `VOLUME`, checking the range.
    pub fn volume(percent: u32) -> Result<Self, ProtocolError> {
        Percent::new(percent).map(Command::Volume)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "CONNECT"),
            Command::Mode(Mode::Auto) => write!(f, "MODE:AUTO"),
            Command::Mode(Mode::Manual) => write!(f, "MODE:MANUEL"),
            Command::SetAngle(angle) => write!(f, "SET_ANGLE:{}", angle.degrees()),
            Command::GetAngle => write!(f, "GET_ANGLE"),
            Command::Volume(volume) => write!(f, "VOLUME:{}", volume.value()),
            Command::GetFileList => write!(f, "GET_FILELIST"),
            Command::PlayIndex(index) => write!(f, "PLAY_INDEX:{}", index),
            Command::Prev => write!(f, "PREV"),
            Command::Next => write!(f, "NEXT"),
            Command::Pause => write!(f, "PAUSE"),
            Command::Play => write!(f, "PLAY"),
        }
    }
}

// Longer tags come before their prefixes so `alt` does not stop early.
fn parse_command(s: &str) -> IResult<&str, Command> {
    alt((
        value(Command::Connect, tag("CONNECT")),
        value(Command::Mode(Mode::Auto), tag("MODE:AUTO")),
        value(Command::Mode(Mode::Manual), tag("MODE:MANUEL")),
        map_res(preceded(tag("SET_ANGLE:"), u32), Command::set_angle),
        value(Command::GetAngle, tag("GET_ANGLE")),
        map_res(preceded(tag("VOLUME:"), u32), Command::volume),
        value(Command::GetFileList, tag("GET_FILELIST")),
        map(preceded(tag("PLAY_INDEX:"), u32), Command::PlayIndex),
        value(Command::Prev, tag("PREV")),
        value(Command::Next, tag("NEXT")),
        value(Command::Pause, tag("PAUSE")),
        value(Command::Play, tag("PLAY")),
    ))(s)
}

impl FromStr for Command {
    type Err = ProtocolError;

    /// Parse the wire form of a command, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        // Give range errors their own variant rather than a bare parse failure
        if let Some(Ok(degrees)) = s.strip_prefix("SET_ANGLE:").map(str::parse::<u32>) {
            return Command::set_angle(degrees);
        }
        if let Some(Ok(percent)) = s.strip_prefix("VOLUME:").map(str::parse::<u32>) {
            return Command::volume(percent);
        }

        match all_consuming(parse_command)(s).finish() {
            Ok((_remaining, command)) => Ok(command),
            Err(Error { input, code }) => Err(ProtocolError::ParseError {
                input: input.to_string(),
                code,
            }),
        }
    }
}

/// A line received from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// `GET_ANGLE:<n>`, the angle the device is playing at
    Angle(i32),
    /// `SET_ANGLE:<n>`, acknowledgement of a requested angle
    SelectedAngle(i32),
    /// `TRACK:<name>`, the file now playing
    Track(String),
    /// `PROGRESS:<0-100>`, playback position in percent
    Progress(u8),
    /// `VOLUME:<n>`
    Volume(i32),
    /// `FILE:<index>|<name>`, one entry of the file list
    File {
        /// Index to pass to `PLAY_INDEX`
        index: u32,
        /// File name as the device shows it
        name: String,
    },
    /// `FILELIST_END`, the file list is complete
    FileListEnd,
    /// Anything else, kept verbatim.
    Unrecognized(String),
}

fn parse_file_entry(s: &str) -> IResult<&str, DeviceMessage> {
    map(
        preceded(
            tag("FILE:"),
            separated_pair(u32, char('|'), verify(rest, |name: &str| !name.contains('|'))),
        ),
        |(index, name): (u32, &str)| DeviceMessage::File {
            index,
            name: name.trim().to_owned(),
        },
    )(s)
}

fn parse_device_message(s: &str) -> IResult<&str, DeviceMessage> {
    alt((
        map(preceded(tag("GET_ANGLE:"), i32), DeviceMessage::Angle),
        map(preceded(tag("SET_ANGLE:"), i32), DeviceMessage::SelectedAngle),
        map(preceded(tag("TRACK:"), rest), |name: &str| {
            DeviceMessage::Track(name.to_owned())
        }),
        map(
            preceded(tag("PROGRESS:"), verify(u8, |p: &u8| *p <= MAX_PERCENT)),
            DeviceMessage::Progress,
        ),
        map(preceded(tag("VOLUME:"), i32), DeviceMessage::Volume),
        parse_file_entry,
        value(DeviceMessage::FileListEnd, tag("FILELIST_END")),
    ))(s)
}

impl DeviceMessage {
    /// Interpret one received line. Surrounding whitespace, including the
    /// `\r` of a `\r\n` ending, is ignored.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match all_consuming(parse_device_message)(line).finish() {
            Ok((_remaining, msg)) => msg,
            Err(_) => DeviceMessage::Unrecognized(line.to_owned()),
        }
    }
}

impl fmt::Display for DeviceMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceMessage::Angle(a) => write!(f, "GET_ANGLE:{}", a),
            DeviceMessage::SelectedAngle(a) => write!(f, "SET_ANGLE:{}", a),
            DeviceMessage::Track(name) => write!(f, "TRACK:{}", name),
            DeviceMessage::Progress(p) => write!(f, "PROGRESS:{}", p),
            DeviceMessage::Volume(v) => write!(f, "VOLUME:{}", v),
            DeviceMessage::File { index, name } => write!(f, "FILE:{}|{}", index, name),
            DeviceMessage::FileListEnd => write!(f, "FILELIST_END"),
            DeviceMessage::Unrecognized(line) => write!(f, "{}", line),
        }
    }
}
