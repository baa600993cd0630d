//! MIDI channel controller state, as read by modulator sources.

use crate::modulator::ModulatorSource;

// -------------------------------------------------------------------------------------------------

/// MIDI CC numbers the channel handles specially.
pub(crate) const MIDI_CC_DATA_ENTRY: u8 = 6;
pub(crate) const MIDI_CC_VOLUME: u8 = 7;
pub(crate) const MIDI_CC_EXPRESSION: u8 = 11;
pub(crate) const MIDI_CC_SUSTAIN: u8 = 64;
pub(crate) const MIDI_CC_RPN_LSB: u8 = 100;
pub(crate) const MIDI_CC_RPN_MSB: u8 = 101;
pub(crate) const MIDI_CC_ALL_SOUND_OFF: u8 = 120;
pub(crate) const MIDI_CC_RESET_CONTROLLERS: u8 = 121;
pub(crate) const MIDI_CC_ALL_NOTES_OFF: u8 = 123;

/// Center value of the 14-bit pitch wheel.
pub const PITCH_BEND_CENTER: u16 = 8192;
/// Default pitch wheel sensitivity in semitones.
pub const DEFAULT_PITCH_WHEEL_SENSITIVITY: u8 = 2;

// -------------------------------------------------------------------------------------------------

/// Read access to the controller values modulator sources are reading from.
pub trait ControllerState {
    /// Current value of the given MIDI CC, 0..=127.
    fn cc(&self, cc: u8) -> u8;
    /// Polyphonic key pressure of the given key, 0..=127.
    fn key_pressure(&self, key: u8) -> u8;
    /// Channel pressure, 0..=127.
    fn channel_pressure(&self) -> u8;
    /// 14-bit pitch bend value, 0..=16383 with center 8192.
    fn pitch_bend(&self) -> u16;
    /// Pitch wheel sensitivity in semitones.
    fn pitch_wheel_sensitivity(&self) -> u8;
}

// -------------------------------------------------------------------------------------------------

/// Controller state of a single MIDI channel.
#[derive(Debug, Clone)]
pub struct Channel {
    ccs: [u8; 128],
    key_pressures: [u8; 128],
    channel_pressure: u8,
    pitch_bend: u16,
    pitch_wheel_sensitivity: u8,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    /// Create a new channel with all controllers at their default values.
    pub fn new() -> Self {
        let mut channel = Self {
            ccs: [0; 128],
            key_pressures: [0; 128],
            channel_pressure: 0,
            pitch_bend: PITCH_BEND_CENTER,
            pitch_wheel_sensitivity: DEFAULT_PITCH_WHEEL_SENSITIVITY,
        };
        channel.reset_controllers();
        channel
    }

    /// Reset all controllers to their defaults: volume 100, pan and balance centered,
    /// full expression, pitch wheel centered.
    pub fn reset_controllers(&mut self) {
        self.ccs.fill(0);
        self.ccs[MIDI_CC_VOLUME as usize] = 100;
        self.ccs[crate::modulator::MIDI_CC_PAN as usize] = 64;
        self.ccs[crate::modulator::MIDI_CC_BALANCE as usize] = 64;
        self.ccs[MIDI_CC_EXPRESSION as usize] = 127;
        // no RPN selected
        self.ccs[MIDI_CC_RPN_LSB as usize] = 127;
        self.ccs[MIDI_CC_RPN_MSB as usize] = 127;
        self.key_pressures.fill(0);
        self.channel_pressure = 0;
        self.pitch_bend = PITCH_BEND_CENTER;
        self.pitch_wheel_sensitivity = DEFAULT_PITCH_WHEEL_SENSITIVITY;
    }

    /// Set a MIDI CC value. Data entry with RPN 0 selected sets the pitch wheel sensitivity.
    /// Returns the modulator source which changed.
    pub fn set_cc(&mut self, cc: u8, value: u8) -> ModulatorSource {
        let (cc, value) = (cc & 0x7F, value & 0x7F);
        self.ccs[cc as usize] = value;
        if cc == MIDI_CC_DATA_ENTRY
            && self.ccs[MIDI_CC_RPN_MSB as usize] == 0
            && self.ccs[MIDI_CC_RPN_LSB as usize] == 0
        {
            self.pitch_wheel_sensitivity = value;
            return ModulatorSource::PitchWheelSensitivity;
        }
        ModulatorSource::Cc(cc)
    }

    pub fn set_key_pressure(&mut self, key: u8, value: u8) {
        self.key_pressures[(key & 0x7F) as usize] = value & 0x7F;
    }

    pub fn set_channel_pressure(&mut self, value: u8) {
        self.channel_pressure = value & 0x7F;
    }

    /// Set the 14-bit pitch bend value. Values out of range are clamped.
    pub fn set_pitch_bend(&mut self, value: u16) {
        self.pitch_bend = value.min(16383);
    }

    pub fn set_pitch_wheel_sensitivity(&mut self, semitones: u8) {
        self.pitch_wheel_sensitivity = semitones & 0x7F;
    }

    /// Returns true while the sustain pedal is held down.
    pub fn is_sustain_pedal_down(&self) -> bool {
        self.ccs[MIDI_CC_SUSTAIN as usize] >= 64
    }
}

impl ControllerState for Channel {
    fn cc(&self, cc: u8) -> u8 {
        self.ccs[(cc & 0x7F) as usize]
    }

    fn key_pressure(&self, key: u8) -> u8 {
        self.key_pressures[(key & 0x7F) as usize]
    }

    fn channel_pressure(&self) -> u8 {
        self.channel_pressure
    }

    fn pitch_bend(&self) -> u16 {
        self.pitch_bend
    }

    fn pitch_wheel_sensitivity(&self) -> u8 {
        self.pitch_wheel_sensitivity
    }
}

// -------------------------------------------------------------------------------------------------

/// Everything a modulator reads while being evaluated for a voice: the channel's controllers
/// plus the voice's note-on key and velocity.
#[derive(Clone, Copy)]
pub struct VoiceContext<'a> {
    controllers: &'a dyn ControllerState,
    key: u8,
    velocity: u8,
}

impl<'a> VoiceContext<'a> {
    pub fn new(controllers: &'a dyn ControllerState, key: u8, velocity: u8) -> Self {
        Self {
            controllers,
            key,
            velocity,
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Raw value of the given source. `None` and `Link` have no controller value and read
    /// as 0, as do undefined general controllers.
    pub fn read_controller(&self, source: ModulatorSource) -> f64 {
        match source {
            ModulatorSource::Velocity => self.velocity as f64,
            ModulatorSource::Key => self.key as f64,
            ModulatorSource::KeyPressure => self.controllers.key_pressure(self.key) as f64,
            ModulatorSource::ChannelPressure => self.controllers.channel_pressure() as f64,
            ModulatorSource::PitchWheel => self.controllers.pitch_bend() as f64,
            ModulatorSource::PitchWheelSensitivity => {
                self.controllers.pitch_wheel_sensitivity() as f64
            }
            ModulatorSource::Cc(cc) => self.controllers.cc(cc) as f64,
            ModulatorSource::None | ModulatorSource::Link | ModulatorSource::Undefined(_) => 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------
