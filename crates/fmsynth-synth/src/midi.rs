//! Decoding of raw MIDI channel messages.
//!
//! Only the messages the engine acts on are decoded; everything else is
//! [`MidiMessage::Other`] and gets logged by the engine.

/// Controller number of the channel-mode "All Notes Off" message.
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// A decoded MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Key pressed.
    NoteOn {
        /// Channel 0-15.
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity, never zero.
        velocity: u8,
    },
    /// Key released, including note-on with velocity zero.
    NoteOff {
        /// Channel 0-15.
        channel: u8,
        /// Note number.
        note: u8,
        /// Release velocity.
        velocity: u8,
    },
    /// Controller moved.
    ControlChange {
        /// Channel 0-15.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Controller value.
        value: u8,
    },
    /// Any other status byte.
    Other {
        /// The raw status byte.
        status: u8,
    },
}

impl MidiMessage {
    /// Decode a raw message. Returns `None` for an empty slice.
    ///
    /// ```rust
    /// use fmsynth_synth::MidiMessage;
    ///
    /// let msg = MidiMessage::from_bytes(&[0x91, 60, 0]).unwrap();
    /// assert_eq!(msg, MidiMessage::NoteOff { channel: 1, note: 60, velocity: 0 });
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let msg = match (status & 0xF0, data) {
            (0x90, &[note, velocity, ..]) if velocity > 0 => Self::NoteOn {
                channel,
                note,
                velocity,
            },
            (0x90, &[note, _, ..]) => Self::NoteOff {
                channel,
                note,
                velocity: 0,
            },
            (0x80, &[note, velocity, ..]) => Self::NoteOff {
                channel,
                note,
                velocity,
            },
            (0xB0, &[controller, value, ..]) => Self::ControlChange {
                channel,
                controller,
                value,
            },
            _ => Self::Other { status },
        };
        Some(msg)
    }

    /// Encode back to three bytes. `Other` encodes as its status byte
    /// followed by zeros.
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note, velocity],
            Self::NoteOff {
                channel,
                note,
                velocity,
            } => [0x80 | (channel & 0x0F), note, velocity],
            Self::ControlChange {
                channel,
                controller,
                value,
            } => [0xB0 | (channel & 0x0F), controller, value],
            Self::Other { status } => [status, 0, 0],
        }
    }

    /// Channel of a channel message.
    pub fn channel(self) -> Option<u8> {
        match self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. } => Some(channel),
            Self::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        assert_eq!(
            MidiMessage::from_bytes(&[0x90, 69, 100]),
            Some(MidiMessage::NoteOn {
                channel: 0,
                note: 69,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_parse_note_on_zero_velocity_is_note_off() {
        assert!(matches!(
            MidiMessage::from_bytes(&[0x90, 60, 0]),
            Some(MidiMessage::NoteOff { note: 60, .. })
        ));
    }

    #[test]
    fn test_parse_note_off_and_cc() {
        assert!(matches!(
            MidiMessage::from_bytes(&[0x8F, 60, 64]),
            Some(MidiMessage::NoteOff {
                channel: 15,
                note: 60,
                velocity: 64
            })
        ));
        assert!(matches!(
            MidiMessage::from_bytes(&[0xB0, 0x16, 64]),
            Some(MidiMessage::ControlChange {
                controller: 0x16,
                value: 64,
                ..
            })
        ));
    }

    #[test]
    fn test_other_and_truncated() {
        assert_eq!(
            MidiMessage::from_bytes(&[0xE0, 0, 64]),
            Some(MidiMessage::Other { status: 0xE0 })
        );
        assert_eq!(
            MidiMessage::from_bytes(&[0x90, 60]),
            Some(MidiMessage::Other { status: 0x90 })
        );
        assert_eq!(MidiMessage::from_bytes(&[]), None);
    }

    #[test]
    fn test_to_bytes() {
        let msg = MidiMessage::ControlChange {
            channel: 2,
            controller: 3,
            value: 127,
        };
        assert_eq!(msg.to_bytes(), [0xB2, 3, 127]);
        assert_eq!(MidiMessage::from_bytes(&msg.to_bytes()), Some(msg));
        assert_eq!(msg.channel(), Some(2));
    }
}
