#[cfg(test)]
use std::sync::Mutex;

/// Everything bacpacman shows the user goes through this trait
pub trait Output: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn warning(&self, message: &str);

    fn info(&self, message: &str);

    fn section(&self, title: &str);

    /// A labelled row, as in the confirmation summary
    fn key_value(&self, key: &str, value: &str);

    fn dimmed(&self, message: &str);

    fn list_item(&self, text: &str);

    /// A command line the user can run to fix something
    fn command_suggestion(&self, description: &str, command: &str);

    fn blank(&self);

    /// Result of a prerequisite check
    fn status_check(&self, item: &str, available: bool);

    /// Text captured from the external tool
    fn tool_output(&self, text: &str);
}

/// Terminal output backed by the `output` module
pub struct TerminalOutput;

impl Output for TerminalOutput {
    fn success(&self, message: &str) {
        crate::output::success(message);
    }

    fn error(&self, message: &str) {
        crate::output::error(message);
    }

    fn warning(&self, message: &str) {
        crate::output::warning(message);
    }

    fn info(&self, message: &str) {
        crate::output::info(message);
    }

    fn section(&self, title: &str) {
        crate::output::section(title);
    }

    fn key_value(&self, key: &str, value: &str) {
        crate::output::key_value(key, value);
    }

    fn dimmed(&self, message: &str) {
        crate::output::dimmed(message);
    }

    fn list_item(&self, text: &str) {
        crate::output::list_item(text);
    }

    fn command_suggestion(&self, description: &str, command: &str) {
        crate::output::command_suggestion(description, command);
    }

    fn blank(&self) {
        crate::output::blank();
    }

    fn status_check(&self, item: &str, available: bool) {
        crate::output::status_check(item, available);
    }

    fn tool_output(&self, text: &str) {
        crate::output::tool_output(text);
    }
}

/// Output message captured by MockOutput for testing
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    Success(String),
    Error(String),
    Warning(String),
    Info(String),
    Section(String),
    KeyValue(String, String),
    Dimmed(String),
    ListItem(String),
    Command(String, String),
    StatusCheck(String, bool),
    ToolOutput(String),
    Blank,
}

/// Mock output implementation for testing (captures output)
#[cfg(test)]
#[derive(Default)]
pub struct MockOutput {
    messages: Mutex<Vec<OutputMessage>>,
}

#[cfg(test)]
impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                OutputMessage::Warning(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Value of the last key-value row with this key
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|m| match m {
                OutputMessage::KeyValue(k, v) if k == key => Some(v.clone()),
                _ => None,
            })
    }

    /// Everything captured, one message per line
    pub fn to_text(&self) -> String {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|msg| match msg {
                OutputMessage::Success(s) => format!("✓ {}", s),
                OutputMessage::Error(s) => format!("✗ {}", s),
                OutputMessage::Warning(s) => format!("⚠ {}", s),
                OutputMessage::Info(s) | OutputMessage::Dimmed(s) => s.clone(),
                OutputMessage::Section(s) => format!("\n=== {} ===", s),
                OutputMessage::KeyValue(k, v) => format!("{}: {}", k, v),
                OutputMessage::ListItem(s) => format!("• {}", s),
                OutputMessage::Command(d, c) => format!("{} {}", d, c),
                OutputMessage::StatusCheck(item, true) => format!("{} available", item),
                OutputMessage::StatusCheck(item, false) => format!("{} not found", item),
                OutputMessage::ToolOutput(s) => format!("│ {}", s),
                OutputMessage::Blank => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&self, message: OutputMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[cfg(test)]
impl Output for MockOutput {
    fn success(&self, message: &str) {
        self.push(OutputMessage::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(OutputMessage::Error(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(OutputMessage::Warning(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(OutputMessage::Info(message.to_string()));
    }

    fn section(&self, title: &str) {
        self.push(OutputMessage::Section(title.to_string()));
    }

    fn key_value(&self, key: &str, value: &str) {
        self.push(OutputMessage::KeyValue(key.to_string(), value.to_string()));
    }

    fn dimmed(&self, message: &str) {
        self.push(OutputMessage::Dimmed(message.to_string()));
    }

    fn list_item(&self, text: &str) {
        self.push(OutputMessage::ListItem(text.to_string()));
    }

    fn command_suggestion(&self, description: &str, command: &str) {
        self.push(OutputMessage::Command(
            description.to_string(),
            command.to_string(),
        ));
    }

    fn blank(&self) {
        self.push(OutputMessage::Blank);
    }

    fn status_check(&self, item: &str, available: bool) {
        self.push(OutputMessage::StatusCheck(item.to_string(), available));
    }

    fn tool_output(&self, text: &str) {
        self.push(OutputMessage::ToolOutput(text.to_string()));
    }
}
