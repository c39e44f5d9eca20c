//! Telnet IAC handling (RFC 854).
//!
//! The codec is stateful so a negotiation sequence split across two socket
//! reads (`IAC DO` | `ECHO`) is still absorbed instead of leaking into the
//! text stream. No option is ever enabled: every DO is answered WONT and
//! every WILL is answered DONT. DONT/WONT need no answer since every
//! option is already off.

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use memchr::memchr;

use super::config::NegotiationMode;

/// Interpret As Command.
pub const IAC: u8 = 255;
/// Refuse to let the peer perform an option.
pub const DONT: u8 = 254;
/// Ask the peer to perform an option.
pub const DO: u8 = 253;
/// Refuse to perform an option.
pub const WONT: u8 = 252;
/// Offer to perform an option.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Output of one [`TelnetCodec::decode`] call.
#[derive(Debug, Default)]
pub struct Decoded {
    /// Text bytes for the session, negotiation removed.
    pub data: BytesMut,

    /// Bytes to write back to the peer.
    pub replies: BytesMut,
}

/// Stateful Telnet stream decoder.
#[derive(Debug)]
pub struct TelnetCodec {
    state: State,
    mode: NegotiationMode,
}

impl TelnetCodec {
    /// Create a codec in the given negotiation mode.
    pub fn new(mode: NegotiationMode) -> Self {
        Self {
            state: State::Data,
            mode,
        }
    }

    /// Split a raw read into session data and negotiation replies.
    pub fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut out = Decoded {
            data: BytesMut::with_capacity(input.len()),
            replies: BytesMut::new(),
        };

        let mut i = 0;
        while i < input.len() {
            match self.state {
                State::Data => match memchr(IAC, &input[i..]) {
                    Some(offset) => {
                        out.data.extend_from_slice(&input[i..i + offset]);
                        i += offset + 1;
                        self.state = State::Iac;
                    }
                    None => {
                        out.data.extend_from_slice(&input[i..]);
                        i = input.len();
                    }
                },
                State::Iac => {
                    let byte = input[i];
                    i += 1;
                    self.state = match byte {
                        IAC => {
                            out.data.put_u8(IAC);
                            State::Data
                        }
                        WILL | WONT | DO | DONT => State::Negotiate(byte),
                        SB => State::Subnegotiation,
                        // NOP, GA, AYT and friends carry no option byte
                        _ => State::Data,
                    };
                }
                State::Negotiate(command) => {
                    let option = input[i];
                    i += 1;
                    self.answer(command, option, &mut out.replies);
                    self.state = State::Data;
                }
                State::Subnegotiation => match memchr(IAC, &input[i..]) {
                    Some(offset) => {
                        i += offset + 1;
                        self.state = State::SubnegotiationIac;
                    }
                    None => i = input.len(),
                },
                State::SubnegotiationIac => {
                    let byte = input[i];
                    i += 1;
                    self.state = if byte == SE {
                        State::Data
                    } else {
                        State::Subnegotiation
                    };
                }
            }
        }

        out
    }

    /// Escape outgoing data so a literal 0xFF is not read as IAC.
    pub fn encode(data: &[u8]) -> Bytes {
        if memchr(IAC, data).is_none() {
            return Bytes::copy_from_slice(data);
        }

        let mut out = BytesMut::with_capacity(data.len() + 4);
        for &byte in data {
            out.put_u8(byte);
            if byte == IAC {
                out.put_u8(IAC);
            }
        }
        out.freeze()
    }

    fn answer(&self, command: u8, option: u8, replies: &mut BytesMut) {
        let reply = match command {
            DO => WONT,
            WILL => DONT,
            _ => return,
        };

        trace!(
            "telnet negotiation: command={} option={} mode={:?}",
            command, option, self.mode
        );

        if self.mode == NegotiationMode::Refuse {
            replies.extend_from_slice(&[IAC, reply, option]);
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        Self::new(NegotiationMode::Refuse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: u8 = 1;
    const SUPPRESS_GO_AHEAD: u8 = 3;
    const TERMINAL_TYPE: u8 = 24;

    #[test]
    fn test_refuses_options() {
        let mut codec = TelnetCodec::default();
        let decoded = codec.decode(&[
            IAC, DO, TERMINAL_TYPE, IAC, WILL, ECHO, IAC, WONT, SUPPRESS_GO_AHEAD, b'h', b'i',
        ]);
        assert_eq!(&decoded.data[..], b"hi");
        assert_eq!(
            &decoded.replies[..],
            &[IAC, WONT, TERMINAL_TYPE, IAC, DONT, ECHO]
        );
    }

    #[test]
    fn test_sequence_split_across_reads() {
        let mut codec = TelnetCodec::default();

        let first = codec.decode(&[b'l', b'o', IAC]);
        assert_eq!(&first.data[..], b"lo");
        assert!(first.replies.is_empty());

        let second = codec.decode(&[DO]);
        assert!(second.data.is_empty());
        assert!(second.replies.is_empty());

        let third = codec.decode(&[ECHO, b'g', b'i', b'n', b':']);
        assert_eq!(&third.data[..], b"gin:");
        assert_eq!(&third.replies[..], &[IAC, WONT, ECHO]);
    }

    #[test]
    fn test_subnegotiation_absorbed() {
        let mut codec = TelnetCodec::default();
        let decoded = codec.decode(&[
            b'a', IAC, SB, TERMINAL_TYPE, 1, IAC, SE, b'b',
        ]);
        assert_eq!(&decoded.data[..], b"ab");
        assert!(decoded.replies.is_empty());
    }

    #[test]
    fn test_escaped_iac() {
        let mut codec = TelnetCodec::default();
        let decoded = codec.decode(&[b'x', IAC, IAC, b'y']);
        assert_eq!(&decoded.data[..], &[b'x', IAC, b'y']);
    }

    #[test]
    fn test_passive_mode_absorbs_silently() {
        let mut codec = TelnetCodec::new(NegotiationMode::Passive);
        let decoded = codec.decode(&[IAC, DO, ECHO, b'o', b'k']);
        assert_eq!(&decoded.data[..], b"ok");
        assert!(decoded.replies.is_empty());
    }

    #[test]
    fn test_encode_escapes_iac() {
        assert_eq!(&TelnetCodec::encode(b"show run\r\n")[..], b"show run\r\n");
        assert_eq!(&TelnetCodec::encode(&[1, IAC, 2])[..], &[1, IAC, IAC, 2]);
    }
}
