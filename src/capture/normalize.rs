//! Key identity normalization
//!
//! Hosts report the same physical key with different logical labels
//! depending on modifiers, layout and platform. Whitespace and the named
//! control keys are mapped to one canonical label per key; everything else
//! keeps the host label, falling back to the physical code when the label is
//! missing.

/// Label the host reports when it cannot identify a key
pub const UNIDENTIFIED_KEY: &str = "Unidentified";

/// Canonical label for the space bar
pub const SPACE_KEY: &str = "Space";

/// Physical code to canonical label for named control keys
const CONTROL_KEYS: &[(&str, &str)] = &[
    ("Enter", "Enter"),
    ("NumpadEnter", "Enter"),
    ("Tab", "Tab"),
    ("Escape", "Escape"),
    ("Backspace", "Backspace"),
    ("Delete", "Delete"),
    ("Insert", "Insert"),
    ("Home", "Home"),
    ("End", "End"),
    ("PageUp", "PageUp"),
    ("PageDown", "PageDown"),
    ("ArrowUp", "ArrowUp"),
    ("ArrowDown", "ArrowDown"),
    ("ArrowLeft", "ArrowLeft"),
    ("ArrowRight", "ArrowRight"),
    ("ShiftLeft", "Shift"),
    ("ShiftRight", "Shift"),
    ("ControlLeft", "Control"),
    ("ControlRight", "Control"),
    ("AltLeft", "Alt"),
    ("AltRight", "Alt"),
    ("MetaLeft", "Meta"),
    ("MetaRight", "Meta"),
    ("CapsLock", "CapsLock"),
];

/// Look up the canonical label of a named control key by physical code
pub fn control_key_label(code: &str) -> Option<&'static str> {
    CONTROL_KEYS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Normalize a host key label into the logical identifier used for pairing
pub fn normalize_key(key: &str, code: &str) -> String {
    if key == " " || code == "Space" {
        return SPACE_KEY.to_string();
    }

    if let Some(label) = control_key_label(code) {
        return label.to_string();
    }

    if key.trim().is_empty() || key == UNIDENTIFIED_KEY {
        code.to_string()
    } else {
        key.to_string()
    }
}
