use std::collections::HashMap;

/// Looks up the localised form of a UI string.
pub trait Translator: Send + Sync {
    fn translate(&self, message: &str) -> String;
}

/// Translator backed by a fixed message table. Unknown strings pass through.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    pub locale: String,
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: HashMap::new(),
        }
    }

    pub fn with_message(mut self, source: impl Into<String>, translated: impl Into<String>) -> Self {
        self.messages.insert(source.into(), translated.into());
        self
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, message: &str) -> String {
        self.messages
            .get(message)
            .cloned()
            .unwrap_or_else(|| message.to_string())
    }
}
