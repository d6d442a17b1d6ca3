//! Telnet protocol bits: option negotiation and command stripping (RFC 854).

/// Interpret As Command.
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

pub const OPT_BINARY: u8 = 0;
pub const OPT_ECHO: u8 = 1;
pub const OPT_SUPPRESS_GO_AHEAD: u8 = 3;

/// Sent once on connect: the server echoes and runs in character mode over
/// a binary channel.
pub const NEGOTIATION: [u8; 12] = [
    IAC,
    WILL,
    OPT_ECHO,
    IAC,
    WILL,
    OPT_SUPPRESS_GO_AHEAD,
    IAC,
    DO,
    OPT_BINARY,
    IAC,
    WILL,
    OPT_BINARY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    /// Saw IAC.
    Command,
    /// Saw IAC WILL/WONT/DO/DONT, next byte is the option.
    Option,
    /// Inside IAC SB ... IAC SE.
    Sub,
    /// Saw IAC inside a subnegotiation.
    SubCommand,
}

/// Removes telnet command sequences from a client byte stream.
///
/// State carries across calls, so a sequence split over two reads is still
/// recognised.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data bytes in `input`, with every command sequence removed.
    pub fn filter(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        for &byte in input {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Command,
                (State::Data, _) => {
                    out.push(byte);
                    State::Data
                },
                (State::Command, IAC) => {
                    out.push(IAC);
                    State::Data
                },
                (State::Command, WILL | WONT | DO | DONT) => State::Option,
                (State::Command, SB) => State::Sub,
                // NOP, GA, AYT and friends carry no argument.
                (State::Command, _) => State::Data,
                (State::Option, _) => State::Data,
                (State::Sub, IAC) => State::SubCommand,
                (State::Sub, _) => State::Sub,
                (State::SubCommand, SE) => State::Data,
                (State::SubCommand, _) => State::Sub,
            };
        }
        out
    }
}
