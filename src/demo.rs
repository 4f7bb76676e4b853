//! The demo itself: write a URI to the tag, then print the tag contents on
//! every button press.
//!
//! Failures never abort anything. Each one prints a line on the console,
//! leaves the status LEDs as they are and the demo carries on.

use core::fmt::Write;

use embedded_hal::digital::v2::OutputPin;

use crate::{
    board::{Board, Indicator, StatusLeds},
    button::{ButtonFlag, RunMode},
    fmt::Dbg,
    ndef::{Message, Record, UriPrefix, UriRecord},
    tag::{EnergyHarvesting, NdefTag},
};

pub struct Config {
    pub uri_prefix: UriPrefix,
    pub uri_content: &'static str,
    pub run_mode: RunMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri_prefix: UriPrefix::HttpWww,
            uri_content: "st.com/st25",
            run_mode: RunMode::ButtonLoop,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteOutcome {
    pub opened: bool,
    pub written: bool,
    pub closed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadOutcome {
    OpenFailed,
    /// The session opened but the tag held no records, or could not be read.
    Empty,
    /// Number of records found, printed or not.
    Records(usize),
}

/// Print one console line. Console errors are logged and otherwise ignored.
fn line<W: Write>(console: &mut W, args: core::fmt::Arguments) {
    if console
        .write_fmt(args)
        .and_then(|_| console.write_str("\r\n"))
        .is_err()
    {
        warn!("console write failed");
    }
}

macro_rules! say {
    ($console:expr, $($arg:tt)*) => {
        line($console, format_args!($($arg)*))
    };
}

/// Turn on energy harvesting and report how it went. Returns whether it is on.
///
/// A failure is only reported, the tag keeps working without it.
pub fn initialize<T, S, RF, W>(board: &mut Board<T, S, RF>, console: &mut W) -> bool
where
    T: EnergyHarvesting,
    S: StatusLeds,
    RF: OutputPin,
    RF::Error: core::fmt::Debug,
    W: Write,
{
    match board.enable_energy_harvesting() {
        Ok(()) => {
            say!(console, "System initialization done");
            true
        }
        Err(e) => {
            error!("energy harvesting: {:?}", Dbg(&e));
            say!(console, "Error enabling energy harvesting");
            false
        }
    }
}

/// Write a message holding a single URI record.
///
/// LED1 lights when the session opens and goes dark again if the write
/// fails, LED2 lights on a successful write, LED3 on a successful close.
pub fn write_uri<T, S, RF, W>(
    board: &mut Board<T, S, RF>,
    console: &mut W,
    prefix: UriPrefix,
    content: &str,
) -> WriteOutcome
where
    T: EnergyHarvesting,
    S: StatusLeds,
    RF: OutputPin,
    RF::Error: core::fmt::Debug,
    W: Write,
{
    let mut outcome = WriteOutcome::default();

    if let Err(e) = board.tag().open_session() {
        warn!("open session: {:?}", Dbg(&e));
        say!(console, "Error opening the session");
        return outcome;
    }
    outcome.opened = true;
    say!(console, "Session opened");
    board.set_indicator(Indicator::Led1, true);

    let mut msg = Message::new();
    let res = UriRecord::new(prefix, content)
        .and_then(|uri| msg.add_record(uri))
        .map_err(|e| warn!("building message: {:?}", e))
        .and_then(|_| {
            board
                .tag()
                .write(&msg)
                .map_err(|e| warn!("write: {:?}", Dbg(&e)))
        });
    if res.is_ok() {
        outcome.written = true;
        say!(console, "Tag written");
        board.set_indicator(Indicator::Led2, true);
    } else {
        say!(console, "Error writing");
        board.set_indicator(Indicator::Led1, false);
    }

    match board.tag().close_session() {
        Ok(()) => {
            outcome.closed = true;
            say!(console, "Session closed");
            board.set_indicator(Indicator::Led3, true);
        }
        Err(e) => {
            warn!("close session: {:?}", Dbg(&e));
            say!(console, "Error closing the session");
        }
    }

    outcome
}

/// Read the tag and print every URI record on it, in tag order.
///
/// Records of any other kind are reported and skipped.
pub fn read_and_print<T, W>(tag: &mut T, console: &mut W) -> ReadOutcome
where
    T: NdefTag,
    W: Write,
{
    if let Err(e) = tag.open_session() {
        warn!("open read session: {:?}", Dbg(&e));
        say!(console, "Error open read Session");
        return ReadOutcome::OpenFailed;
    }
    say!(console, "Open Session");

    let mut msg = Message::new();
    if let Err(e) = tag.read(&mut msg) {
        warn!("read: {:?}", Dbg(&e));
        msg.clear();
    }
    say!(console, "Message Read");

    let outcome = if msg.is_empty() {
        say!(console, "Error Read");
        ReadOutcome::Empty
    } else {
        for record in &msg {
            match record {
                Record::Uri(uri) => {
                    say!(console, "Read uriId: {}", uri.id());
                    say!(console, "Read uriType: {}", uri.prefix().as_str());
                    say!(console, "Read uriContent: {}", uri.content());
                }
                other => {
                    say!(console, "Unsupported record kind: {:?}", other.kind());
                }
            }
        }
        ReadOutcome::Records(msg.len())
    };

    match tag.close_session() {
        Ok(()) => say!(console, "Close session"),
        Err(e) => {
            warn!("close read session: {:?}", Dbg(&e));
            say!(console, "Error closing the session");
        }
    }

    outcome
}

/// One pass of the button loop. Returns whether the tag was read.
///
/// The flag is cleared after the read, so a press that lands while the tag
/// is being read is dropped.
pub fn poll<T, S, RF, W>(flag: &ButtonFlag, board: &mut Board<T, S, RF>, console: &mut W) -> bool
where
    T: EnergyHarvesting,
    S: StatusLeds,
    RF: OutputPin,
    RF::Error: core::fmt::Debug,
    W: Write,
{
    if !flag.is_set() {
        return false;
    }
    debug!("button pressed");
    read_and_print(board.tag(), console);
    flag.clear();
    true
}

/// Run the whole demo.
///
/// In [`RunMode::ButtonLoop`] this never returns; `idle` is called whenever
/// no press was pending. A press can land between that check and the call,
/// so `idle` must look at the flag again before it sleeps, with the button
/// interrupt held off. In [`RunMode::SingleShot`] the tag is read once.
pub fn run<T, S, RF, W, I>(
    config: &Config,
    flag: &ButtonFlag,
    board: &mut Board<T, S, RF>,
    console: &mut W,
    mut idle: I,
) where
    T: EnergyHarvesting,
    S: StatusLeds,
    RF: OutputPin,
    RF::Error: core::fmt::Debug,
    W: Write,
    I: FnMut(&ButtonFlag),
{
    let harvesting = initialize(board, console);
    debug!("energy harvesting on: {}", harvesting);
    let written = write_uri(board, console, config.uri_prefix, config.uri_content);
    info!("write sequence: {:?}", written);

    match config.run_mode {
        RunMode::SingleShot => {
            read_and_print(board.tag(), console);
        }
        RunMode::ButtonLoop => loop {
            if !poll(flag, board, console) {
                idle(flag);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::m24lr::fake::Bus;

    fn lines(console: &str) -> std::vec::Vec<&str> {
        console.split("\r\n").filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn every_record_of_a_full_tag_is_printed() {
        let bus = Bus::new();
        let mut ndef = std::vec::Vec::new();
        for (i, header) in [0x91, 0x11, 0x11, 0x11, 0x51].into_iter().enumerate() {
            ndef.extend_from_slice(&[header, 0x01, 0x02, b'U', 0x01, b'a' + i as u8]);
        }
        bus.load_ndef(&ndef);
        let mut tag = bus.driver();
        let mut console = String::new();

        let outcome = read_and_print(&mut tag, &mut console);

        assert_eq!(outcome, ReadOutcome::Records(5));
        let out = lines(&console);
        assert_eq!(out.len(), 2 + 5 * 3 + 1);
        assert_eq!(
            out[2..5],
            ["Read uriId: 1", "Read uriType: http://www.", "Read uriContent: a"]
        );
        assert_eq!(out[16], "Read uriContent: e");
        assert_eq!(out.last(), Some(&"Close session"));
    }

    #[test]
    fn long_uri_is_printed_in_full() {
        let bus = Bus::new();
        let mut ndef = std::vec::Vec::from([0xd1, 0x01, 0xc9, b'U', 0x04]);
        ndef.extend_from_slice(&[b'x'; 200]);
        bus.load_ndef(&ndef);
        let mut tag = bus.driver();
        let mut console = String::new();

        assert_eq!(read_and_print(&mut tag, &mut console), ReadOutcome::Records(1));

        let content = std::format!("Read uriContent: {}", "x".repeat(200));
        assert_eq!(
            lines(&console),
            [
                "Open Session",
                "Message Read",
                "Read uriId: 4",
                "Read uriType: https://",
                content.as_str(),
                "Close session",
            ]
        );
    }

    #[test]
    fn unparseable_records_are_reported_between_uris() {
        let bus = Bus::new();
        bus.load_ndef(&[
            0x91, 0x01, 0x02, b'U', 0x24, b'a',
            0x11, 0x01, 0x05, b'T', 0x82, b'e', b'n', 0x00, b'h',
            0x51, 0x01, 0x02, b'U', 0x05, b'1',
        ]);
        let mut tag = bus.driver();
        let mut console = String::new();

        assert_eq!(read_and_print(&mut tag, &mut console), ReadOutcome::Records(3));
        assert_eq!(
            lines(&console),
            [
                "Open Session",
                "Message Read",
                "Unsupported record kind: Other",
                "Unsupported record kind: Other",
                "Read uriId: 5",
                "Read uriType: tel:",
                "Read uriContent: 1",
                "Close session",
            ]
        );
    }
}
