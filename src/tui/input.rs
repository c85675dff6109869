//! Remote terminal input decoding.
//!
//! An SSH channel delivers whatever bytes the client's terminal produced.
//! `InputDecoder` turns them back into crossterm `Event`s so the rest of the
//! session can match keys the same way a local TUI would. Handles:
//! - UTF-8 characters and Ctrl+letter control codes
//! - Enter, Tab, Backspace, and a lone Escape
//! - CSI and SS3 cursor keys, Home/End, PageUp/PageDown, Insert/Delete
//! - SGR mouse reports (wheel up/down, press, release)
//! - Alt+key as an ESC prefix
//!
//! Sequences split across reads are buffered until complete. A CSI sequence
//! longer than `MAX_CSI_LEN` bytes, or one interrupted by a byte that cannot
//! belong to it, is dropped so the buffer stays bounded.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Longest CSI sequence kept while waiting for its final byte.
const MAX_CSI_LEN: usize = 32;

#[derive(Debug, Default)]
pub struct InputDecoder {
    pending: Vec<u8>,
}

enum Parsed {
    /// An event and the number of bytes it consumed.
    Event(Event, usize),
    /// Recognized and ignored.
    Skip(usize),
    /// Need more bytes to decide.
    Incomplete,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes, returning every complete event.
    ///
    /// A trailing lone ESC is reported as the Escape key rather than held,
    /// since a remote client sends an escape sequence in a single write.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        let mut pos = 0;
        while pos < self.pending.len() {
            match parse(&self.pending[pos..]) {
                Parsed::Event(event, used) => {
                    events.push(event);
                    pos += used;
                }
                Parsed::Skip(used) => pos += used,
                Parsed::Incomplete => break,
            }
        }
        self.pending.drain(..pos);
        events
    }
}

fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
    Event::Key(KeyEvent::new(code, modifiers))
}

fn parse(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x1b => parse_escape(buf),
        b'\r' | b'\n' => Parsed::Event(key(KeyCode::Enter, KeyModifiers::NONE), 1),
        b'\t' => Parsed::Event(key(KeyCode::Tab, KeyModifiers::NONE), 1),
        0x7f | 0x08 => Parsed::Event(key(KeyCode::Backspace, KeyModifiers::NONE), 1),
        0x00 => Parsed::Event(key(KeyCode::Char(' '), KeyModifiers::CONTROL), 1),
        b @ 0x01..=0x1a => {
            let letter = (b - 1 + b'a') as char;
            Parsed::Event(key(KeyCode::Char(letter), KeyModifiers::CONTROL), 1)
        }
        0x1c..=0x1f => Parsed::Skip(1),
        _ => parse_char(buf),
    }
}

fn parse_char(buf: &[u8]) -> Parsed {
    let len = utf8_len(buf[0]);
    if len == 0 {
        return Parsed::Skip(1);
    }
    if buf.len() < len {
        return Parsed::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => {
            let modifiers = if ch.is_uppercase() {
                KeyModifiers::SHIFT
            } else {
                KeyModifiers::NONE
            };
            Parsed::Event(key(KeyCode::Char(ch), modifiers), len)
        }
        None => Parsed::Skip(1),
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => 0,
    }
}

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&next) = buf.get(1) else {
        return Parsed::Event(key(KeyCode::Esc, KeyModifiers::NONE), 1);
    };
    match next {
        b'[' => parse_csi(buf),
        b'O' => match buf.get(2) {
            None => Parsed::Incomplete,
            Some(&b) => match ss3_key(b) {
                Some(code) => Parsed::Event(key(code, KeyModifiers::NONE), 3),
                None => Parsed::Skip(3),
            },
        },
        0x1b => Parsed::Event(key(KeyCode::Esc, KeyModifiers::NONE), 1),
        _ => match parse(&buf[1..]) {
            Parsed::Event(Event::Key(inner), used) => Parsed::Event(
                key(inner.code, inner.modifiers | KeyModifiers::ALT),
                used + 1,
            ),
            Parsed::Event(_, used) | Parsed::Skip(used) => Parsed::Skip(used + 1),
            Parsed::Incomplete => Parsed::Incomplete,
        },
    }
}

fn ss3_key(b: u8) -> Option<KeyCode> {
    match b {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        _ => None,
    }
}

/// `ESC [ params final`: parameter and intermediate bytes are in
/// `0x20..=0x3f`, the final byte in `0x40..=0x7e`.
fn parse_csi(buf: &[u8]) -> Parsed {
    let Some(end) = buf[2..].iter().position(|b| !(0x20..=0x3f).contains(b)) else {
        if buf.len() > MAX_CSI_LEN {
            return Parsed::Skip(buf.len());
        }
        return Parsed::Incomplete;
    };
    let final_byte = buf[2 + end];
    if !(0x40..=0x7e).contains(&final_byte) {
        // Not part of the sequence; drop the prefix and decode this byte on its own.
        return Parsed::Skip(2 + end);
    }
    let used = 2 + end + 1;
    if used > MAX_CSI_LEN {
        return Parsed::Skip(used);
    }
    let params = &buf[2..2 + end];

    if params.first() == Some(&b'<') && matches!(final_byte, b'M' | b'm') {
        return match sgr_mouse(&params[1..], final_byte == b'M') {
            Some(event) => Parsed::Event(event, used),
            None => Parsed::Skip(used),
        };
    }

    let params = std::str::from_utf8(params).unwrap_or("");
    let mut fields = params.split(';');
    let first = fields.next().unwrap_or("");
    let modifiers = fields
        .next()
        .and_then(|m| m.parse::<u8>().ok())
        .map(decode_modifiers)
        .unwrap_or(KeyModifiers::NONE);

    let code = match final_byte {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'Z' => Some(KeyCode::BackTab),
        b'~' => match first {
            "1" | "7" => Some(KeyCode::Home),
            "2" => Some(KeyCode::Insert),
            "3" => Some(KeyCode::Delete),
            "4" | "8" => Some(KeyCode::End),
            "5" => Some(KeyCode::PageUp),
            "6" => Some(KeyCode::PageDown),
            _ => None,
        },
        _ => None,
    };

    match code {
        Some(code) => Parsed::Event(key(code, modifiers), used),
        None => Parsed::Skip(used),
    }
}

/// xterm modifier parameter: 1 + (shift | alt << 1 | ctrl << 2).
fn decode_modifiers(param: u8) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut modifiers = KeyModifiers::NONE;
    if bits & 1 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }
    modifiers
}

/// `ESC [ < button ; column ; row (M|m)`, 1-based coordinates.
fn sgr_mouse(params: &[u8], pressed: bool) -> Option<Event> {
    let params = std::str::from_utf8(params).ok()?;
    let mut fields = params.split(';').map(|f| f.parse::<u16>().ok());
    let button = fields.next()??;
    let column = fields.next()??.saturating_sub(1);
    let row = fields.next()??.saturating_sub(1);

    let kind = match (button & 0b1100_0011, pressed) {
        (64, _) => MouseEventKind::ScrollUp,
        (65, _) => MouseEventKind::ScrollDown,
        (b, true) if b & 0b0100_0000 == 0 => MouseEventKind::Down(mouse_button(b & 0b11)?),
        (b, false) if b & 0b0100_0000 == 0 => MouseEventKind::Up(mouse_button(b & 0b11)?),
        _ => return None,
    };
    Some(Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }))
}

fn mouse_button(bits: u16) -> Option<MouseButton> {
    match bits {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    }
}
