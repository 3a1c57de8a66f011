// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Maps terminal key events to control actions. Bindings come from a default
//! set and can be overridden by the `keyboard` section of the config.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use crossterm::event::{KeyCode, KeyModifiers};

use super::ControlAction;

/// A terminal key plus the modifiers held with it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub code: KeyCode,
    /// SHIFT is never stored for character keys
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// Shortcut for a key event, with modifiers normalized
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            code,
            modifiers: normalize(code, modifiers),
        }
    }

    /// Bare key
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Ctrl plus key
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }
}

// Terminals report shifted characters as the character itself, sometimes
// with SHIFT set and sometimes without.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> KeyModifiers {
    match code {
        KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
        _ => modifiers,
    }
}

/// Parse a shortcut name like `space`, `l`, `f5` or `ctrl+c`
pub fn parse_shortcut(name: &str) -> Option<Shortcut> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut modifiers = KeyModifiers::NONE;
    let mut parts: Vec<&str> = name.split('+').collect();
    // "+" alone, or a trailing "ctrl++"
    let key = if name.ends_with('+') {
        parts.retain(|p| !p.is_empty());
        "+".to_string()
    } else {
        parts.pop()?.to_string()
    };

    for part in parts {
        match part.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            _ => return None,
        }
    }

    let lower = key.trim().to_ascii_lowercase();
    let code = match lower.as_str() {
        "space" => KeyCode::Char(' '),
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        f if f.len() > 1 && f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
        _ => {
            let mut chars = lower.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            KeyCode::Char(c)
        }
    };

    Some(Shortcut::new(code, modifiers))
}

/// Format a shortcut for display, in the form [`parse_shortcut`] accepts
pub fn format_shortcut(shortcut: &Shortcut) -> String {
    let modifiers = [
        (KeyModifiers::CONTROL, "Ctrl"),
        (KeyModifiers::ALT, "Alt"),
        (KeyModifiers::SHIFT, "Shift"),
    ];
    let mut label: String = modifiers
        .iter()
        .filter(|(m, _)| shortcut.modifiers.contains(*m))
        .map(|(_, name)| format!("{}+", name))
        .collect();

    match shortcut.code {
        KeyCode::Char(' ') => label.push_str("Space"),
        KeyCode::Char(c) => label.extend(c.to_uppercase()),
        KeyCode::F(n) => label.push_str(&format!("F{}", n)),
        KeyCode::PageUp => label.push_str("PageUp"),
        KeyCode::PageDown => label.push_str("PageDown"),
        // Esc, Enter, Up and the rest print as their variant name
        other => label.push_str(&format!("{:?}", other)),
    }
    label
}

/// Shortcut bound to a control action
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub shortcut: Shortcut,
    pub action: ControlAction,
}

impl KeyBinding {
    pub fn new(shortcut: Shortcut, action: ControlAction) -> Self {
        Self { shortcut, action }
    }

    /// Help text of the bound action
    pub fn description(&self) -> &'static str {
        self.action.description()
    }
}

/// Resolves terminal key events to control actions
#[derive(Debug, Clone, Default)]
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
}

impl KeyboardController {
    /// No bindings at all
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock hotkeys
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        controller.add_default_bindings();
        controller
    }

    /// Default bindings plus overrides from a `shortcut -> action` table
    pub fn from_config(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut controller = Self::with_defaults();

        let mut entries: Vec<_> = overrides.iter().collect();
        entries.sort();
        for (key, action) in entries {
            let shortcut =
                parse_shortcut(key).ok_or_else(|| anyhow!("Unknown key name: {:?}", key))?;
            let action: ControlAction = action
                .parse()
                .with_context(|| format!("Invalid binding for key {:?}", key))?;
            controller.add(KeyBinding::new(shortcut, action));
        }

        Ok(controller)
    }

    fn add_default_bindings(&mut self) {
        let defaults = [
            (Shortcut::key(KeyCode::Char(' ')), ControlAction::TogglePlay),
            (Shortcut::key(KeyCode::Esc), ControlAction::Stop),
            (Shortcut::key(KeyCode::Char('l')), ControlAction::ToggleLoop),
            (Shortcut::key(KeyCode::Char('v')), ControlAction::ToggleVariation),
            (Shortcut::key(KeyCode::Char('n')), ControlAction::Next),
            (Shortcut::key(KeyCode::Char('p')), ControlAction::Previous),
            (Shortcut::key(KeyCode::Char('q')), ControlAction::Quit),
            // Raw mode swallows the interrupt signal
            (Shortcut::ctrl(KeyCode::Char('c')), ControlAction::Quit),
        ];

        for (shortcut, action) in defaults {
            self.add(KeyBinding::new(shortcut, action));
        }
    }

    /// Add a key binding, replacing any binding for the same shortcut
    pub fn add(&mut self, binding: KeyBinding) {
        self.bindings.insert(binding.shortcut.clone(), binding);
    }

    /// Action bound to a key event, if any
    pub fn get_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        let shortcut = Shortcut::new(code, modifiers);
        self.bindings.get(&shortcut).map(|b| b.action)
    }

    /// Bindings in help display order
    pub fn bindings(&self) -> Vec<&KeyBinding> {
        let mut bindings: Vec<&KeyBinding> = self.bindings.values().collect();
        bindings.sort_by_key(|b| {
            let rank = ControlAction::ALL
                .iter()
                .position(|a| *a == b.action)
                .unwrap_or(usize::MAX);
            (rank, format_shortcut(&b.shortcut))
        });
        bindings
    }

    /// One line per binding, for a help screen
    pub fn help_lines(&self) -> Vec<String> {
        self.bindings()
            .into_iter()
            .map(|b| format!("{:>8}  {}", format_shortcut(&b.shortcut), b.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_normalizes_shift() {
        let upper = Shortcut::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(upper, Shortcut::key(KeyCode::Char('?')));

        let ctrl = Shortcut::new(KeyCode::Char('c'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(ctrl, Shortcut::ctrl(KeyCode::Char('c')));

        let tab = Shortcut::new(KeyCode::Tab, KeyModifiers::SHIFT);
        assert_eq!(tab.modifiers, KeyModifiers::SHIFT);
    }

    #[test]
    fn test_shifted_characters_resolve() {
        let controller = KeyboardController::with_defaults();
        assert_eq!(
            controller.get_action(KeyCode::Char('q'), KeyModifiers::SHIFT),
            Some(ControlAction::Quit)
        );
        assert_eq!(
            controller.get_action(KeyCode::Char('c'), KeyModifiers::CONTROL | KeyModifiers::SHIFT),
            Some(ControlAction::Quit)
        );
        assert_eq!(controller.get_action(KeyCode::Char('c'), KeyModifiers::NONE), None);

        // Shift stays significant for non-character keys
        let mut controller = KeyboardController::new();
        controller.add(KeyBinding::new(Shortcut::key(KeyCode::Tab), ControlAction::Next));
        assert_eq!(controller.get_action(KeyCode::Tab, KeyModifiers::SHIFT), None);
    }

    #[test]
    fn test_parse_shortcut() {
        assert_eq!(parse_shortcut("space"), Some(Shortcut::key(KeyCode::Char(' '))));
        assert_eq!(parse_shortcut("L"), Some(Shortcut::key(KeyCode::Char('l'))));
        assert_eq!(parse_shortcut("Esc"), Some(Shortcut::key(KeyCode::Esc)));
        assert_eq!(parse_shortcut("f5"), Some(Shortcut::key(KeyCode::F(5))));
        assert_eq!(parse_shortcut("ctrl+x"), Some(Shortcut::ctrl(KeyCode::Char('x'))));
        assert_eq!(parse_shortcut("+"), Some(Shortcut::key(KeyCode::Char('+'))));
        assert_eq!(parse_shortcut("f13"), None);
        assert_eq!(parse_shortcut("hyper+x"), None);
        assert_eq!(parse_shortcut("spacebar"), None);
        assert_eq!(parse_shortcut(""), None);
    }

    #[test]
    fn test_keyboard_controller_defaults() {
        let controller = KeyboardController::with_defaults();

        let cases = [
            (KeyCode::Char(' '), ControlAction::TogglePlay),
            (KeyCode::Esc, ControlAction::Stop),
            (KeyCode::Char('l'), ControlAction::ToggleLoop),
            (KeyCode::Char('v'), ControlAction::ToggleVariation),
            (KeyCode::Char('n'), ControlAction::Next),
            (KeyCode::Char('p'), ControlAction::Previous),
            (KeyCode::Char('q'), ControlAction::Quit),
        ];
        for (code, action) in cases {
            assert_eq!(controller.get_action(code, KeyModifiers::NONE), Some(action));
        }

        assert_eq!(
            controller.get_action(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(ControlAction::Quit)
        );
        assert_eq!(controller.get_action(KeyCode::Char('z'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_config_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("enter".to_string(), "toggle_play".to_string());
        overrides.insert("l".to_string(), "next".to_string());

        let controller = KeyboardController::from_config(&overrides).unwrap();
        assert_eq!(
            controller.get_action(KeyCode::Enter, KeyModifiers::NONE),
            Some(ControlAction::TogglePlay)
        );
        assert_eq!(
            controller.get_action(KeyCode::Char('l'), KeyModifiers::NONE),
            Some(ControlAction::Next)
        );
        // Untouched defaults remain
        assert_eq!(
            controller.get_action(KeyCode::Char(' '), KeyModifiers::NONE),
            Some(ControlAction::TogglePlay)
        );
    }

    #[test]
    fn test_config_errors() {
        let mut overrides = HashMap::new();
        overrides.insert("hyperkey".to_string(), "stop".to_string());
        assert!(KeyboardController::from_config(&overrides).is_err());

        let mut overrides = HashMap::new();
        overrides.insert("x".to_string(), "tap_tempo".to_string());
        let err = KeyboardController::from_config(&overrides).unwrap_err();
        assert!(format!("{:#}", err).contains("tap_tempo"));
    }

    #[test]
    fn test_add_replaces_binding() {
        let mut controller = KeyboardController::new();
        assert!(controller.bindings().is_empty());

        controller.add(KeyBinding::new(Shortcut::key(KeyCode::Char('x')), ControlAction::Stop));
        controller.add(KeyBinding::new(Shortcut::key(KeyCode::Char('x')), ControlAction::Next));
        assert_eq!(controller.bindings().len(), 1);
        assert_eq!(
            controller.get_action(KeyCode::Char('x'), KeyModifiers::NONE),
            Some(ControlAction::Next)
        );
    }

    #[test]
    fn test_format_shortcut() {
        assert_eq!(format_shortcut(&Shortcut::key(KeyCode::Char(' '))), "Space");
        assert_eq!(format_shortcut(&Shortcut::ctrl(KeyCode::Char('c'))), "Ctrl+C");
        assert_eq!(format_shortcut(&Shortcut::key(KeyCode::Esc)), "Esc");
        assert_eq!(format_shortcut(&Shortcut::key(KeyCode::F(5))), "F5");

        for name in ["ctrl+x", "alt+enter", "pagedown", "up", "space", "f12"] {
            let shortcut = parse_shortcut(name).unwrap();
            assert_eq!(parse_shortcut(&format_shortcut(&shortcut)), Some(shortcut));
        }
    }

    #[test]
    fn test_help_order() {
        let controller = KeyboardController::with_defaults();
        let lines = controller.help_lines();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].contains("Space"));
        assert!(lines[0].contains("Play/Stop"));
        assert!(lines.last().unwrap().contains("Quit"));
    }
}
