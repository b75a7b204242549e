//! Test data builders for creating test objects

use keyhistory_rs::KeyEvent;

/// Builder for creating test KeyEvents
pub struct KeyEventBuilder {
    key: String,
    code: String,
    duration: f64,
    timestamp: f64,
}

impl KeyEventBuilder {
    /// Start from a letter key, e.g. `"a"` gives code `"KeyA"`
    pub fn letter(key: &str) -> Self {
        Self {
            key: key.to_string(),
            code: format!("Key{}", key.to_uppercase()),
            duration: 50.0,
            timestamp: 100.0,
        }
    }

    pub fn code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> KeyEvent {
        KeyEvent::new(self.key, self.code, self.duration, self.timestamp)
    }
}

/// Build a sequence of letter events at the given timestamps
pub fn typed(keys: &str, timestamps: &[f64]) -> Vec<KeyEvent> {
    keys.chars()
        .zip(timestamps)
        .map(|(c, &t)| KeyEventBuilder::letter(&c.to_string()).at(t).build())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_builder() {
        let event = KeyEventBuilder::letter("q").duration(12.5).at(300.0).build();

        assert_eq!(event.key, "q");
        assert_eq!(event.code, "KeyQ");
        assert_eq!(event.duration, 12.5);
        assert_eq!(event.timestamp, 300.0);
    }
}
