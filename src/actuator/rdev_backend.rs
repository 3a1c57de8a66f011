// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! OS-level key synthesis using rdev.

use anyhow::{anyhow, Result};
use rdev::{simulate, EventType, Key};

use super::KeyActuator;

/// Actuator that injects real key events into the focused window
#[derive(Debug, Default)]
pub struct RdevActuator;

impl RdevActuator {
    /// Create a new OS key actuator
    pub fn new() -> Self {
        Self
    }

    fn send(&self, event: EventType) -> Result<()> {
        simulate(&event).map_err(|e| anyhow!("Failed to simulate {:?}: {:?}", event, e))
    }
}

impl KeyActuator for RdevActuator {
    fn press(&mut self, key: &str) -> Result<()> {
        let key = parse_key(key).ok_or_else(|| anyhow!("Unknown key name: {}", key))?;
        self.send(EventType::KeyPress(key))
    }

    fn release(&mut self, key: &str) -> Result<()> {
        let key = parse_key(key).ok_or_else(|| anyhow!("Unknown key name: {}", key))?;
        self.send(EventType::KeyRelease(key))
    }
}

/// Map a physical key name from the key mapping to an rdev key
pub fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim().to_ascii_lowercase();

    let key = match name.as_str() {
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,

        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,

        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,

        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "shift" => Key::ShiftLeft,
        "ctrl" | "control" => Key::ControlLeft,
        "alt" => Key::Alt,

        "," | "comma" => Key::Comma,
        "." | "dot" | "period" => Key::Dot,
        "/" | "slash" => Key::Slash,
        ";" | "semicolon" => Key::SemiColon,
        "'" | "quote" => Key::Quote,
        "[" => Key::LeftBracket,
        "]" => Key::RightBracket,
        "-" | "minus" => Key::Minus,
        "=" | "equal" => Key::Equal,

        _ => return None,
    };

    Some(key)
}
