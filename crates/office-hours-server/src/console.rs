//! Line-oriented development console.
//!
//! Stands in for the platform gateway: each line describes one voice or
//! command event. Ids are plain numbers.
//!
//! ```text
//! join <student>                      student enters the waiting channel
//! leave <student>                     student leaves the waiting channel
//! enter <student> <staff>             student arrives in a staff room
//! exit <student> <staff>              student leaves a staff room
//! staff-in <staff> [room|elsewhere|queue]
//! staff-out <staff>
//! request <student> <staff,..|any> <purpose> [| <tried>]
//! break <staff> <minutes>
//! end-break <staff>
//! position <student> <index>
//! tick
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use office_hours_core::{Event, StaffId, StudentId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::runtime::EventSender;

/// Console input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// The first word is not a command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument is missing.
    #[error("{command}: missing {argument}")]
    MissingArgument {
        /// Command being parsed
        command: &'static str,
        /// Name of the missing argument
        argument: &'static str,
    },

    /// An argument is not a valid number.
    #[error("not a number: {0}")]
    InvalidNumber(String),

    /// `staff-in` with an unknown location.
    #[error("unknown location: {0} (expected room, elsewhere or queue)")]
    UnknownLocation(String),
}

struct Args<'a> {
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, argument: &'static str) -> Result<&'a str, ConsoleError> {
        self.words.next().ok_or(ConsoleError::MissingArgument { command: self.command, argument })
    }

    fn number(&mut self, argument: &'static str) -> Result<u64, ConsoleError> {
        let word = self.word(argument)?;
        word.parse().map_err(|_| ConsoleError::InvalidNumber(word.to_string()))
    }

    fn student(&mut self) -> Result<StudentId, ConsoleError> {
        self.number("student").map(StudentId)
    }

    fn staff(&mut self) -> Result<StaffId, ConsoleError> {
        self.number("staff").map(StaffId)
    }
}

/// Parse one console line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Event>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let event = match command {
        "join" => {
            let mut args = Args { command: "join", words };
            Event::StudentJoinedQueue { student: args.student()? }
        },
        "leave" => {
            let mut args = Args { command: "leave", words };
            Event::StudentLeftQueue { student: args.student()? }
        },
        "enter" => {
            let mut args = Args { command: "enter", words };
            Event::StudentEnteredRoom { student: args.student()?, staff: args.staff()? }
        },
        "exit" => {
            let mut args = Args { command: "exit", words };
            Event::StudentLeftRoom { student: args.student()?, staff: args.staff()? }
        },
        "staff-in" => {
            let mut args = Args { command: "staff-in", words };
            let staff = args.staff()?;
            match args.words.next().unwrap_or("room") {
                "room" => Event::StaffEnteredVoice { staff, own_room: true },
                "elsewhere" => Event::StaffEnteredVoice { staff, own_room: false },
                "queue" => Event::StaffJoinedQueue { staff },
                other => return Err(ConsoleError::UnknownLocation(other.to_string())),
            }
        },
        "staff-out" => {
            let mut args = Args { command: "staff-out", words };
            Event::StaffLeftVoice { staff: args.staff()? }
        },
        "request" => {
            let mut args = Args { command: "request", words };
            let student = args.student()?;
            let preferences = match args.word("preferences")? {
                "any" => Vec::new(),
                list => list
                    .split(',')
                    .map(|id| {
                        id.trim()
                            .parse()
                            .map(StaffId)
                            .map_err(|_| ConsoleError::InvalidNumber(id.to_string()))
                    })
                    .collect::<Result<_, _>>()?,
            };
            let rest: Vec<&str> = args.words.collect();
            let rest = rest.join(" ");
            let (purpose, tried) = match rest.split_once('|') {
                Some((purpose, tried)) => (purpose.trim(), tried.trim()),
                None => (rest.trim(), ""),
            };
            Event::MetadataSubmitted {
                student,
                preferences,
                purpose: purpose.to_string(),
                tried: tried.to_string(),
            }
        },
        "break" => {
            let mut args = Args { command: "break", words };
            let staff = args.staff()?;
            let minutes = args.number("minutes")?;
            Event::BreakRequested {
                staff,
                minutes: u32::try_from(minutes)
                    .map_err(|_| ConsoleError::InvalidNumber(minutes.to_string()))?,
            }
        },
        "end-break" => {
            let mut args = Args { command: "end-break", words };
            Event::BreakEndRequested { staff: args.staff()? }
        },
        "position" => {
            let mut args = Args { command: "position", words };
            let student = args.student()?;
            let index = args.number("index")?;
            Event::QueuePositionOverride {
                student,
                position: usize::try_from(index)
                    .map_err(|_| ConsoleError::InvalidNumber(index.to_string()))?,
            }
        },
        "tick" => Event::Tick,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };

    Ok(Some(event))
}

/// Read lines from `reader` until EOF, sending each parsed event.
///
/// Bad lines are logged and skipped. Returns early if the runtime stops.
pub async fn read_events<R: AsyncBufRead + Unpin>(reader: R, events: EventSender) {
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("console read failed: {e}");
                break;
            },
        };

        match parse_line(&line) {
            Ok(Some(event)) => {
                if let Err(e) = events.send(event) {
                    tracing::warn!("{e}");
                    break;
                }
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(line = %line, "{e}"),
        }
    }
    tracing::info!("console closed");
}
