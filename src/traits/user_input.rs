use crate::error::BacpacError;
use anyhow::Result;
use secrecy::SecretString;
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;

/// Response type for mock user input
#[derive(Debug, Clone)]
#[cfg(test)]
pub enum MockResponse {
    Select(String),
    Text(String),
    /// Accept the default offered by a text prompt
    AcceptDefault,
    Password(String),
    Confirm(bool),
    /// Behave like Esc/Ctrl-C on whatever prompt comes next
    Cancel,
}

/// A prompt recorded by the mock, with the default it offered
#[derive(Debug, Clone, PartialEq)]
#[cfg(test)]
pub struct AskedPrompt {
    pub prompt: String,
    pub default: Option<String>,
}

/// Trait for user input operations to enable testing with mocks.
///
/// Cancelling any prompt yields an error carrying [`BacpacError::Cancelled`].
pub trait UserInput: Send + Sync {
    /// Display a selection prompt with options
    fn select(&self, prompt: &str, options: Vec<String>) -> Result<String>;

    /// Display a text input prompt
    fn text(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Display a masked password prompt
    fn password(&self, prompt: &str) -> Result<SecretString>;

    /// Display a confirmation prompt (yes/no)
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Real user input implementation using inquire crate
pub struct InquireUserInput;

fn map_inquire_error(err: inquire::InquireError) -> anyhow::Error {
    match err {
        inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
            anyhow::Error::new(BacpacError::Cancelled)
        }
        other => anyhow::Error::new(other).context("Failed to read user input"),
    }
}

impl UserInput for InquireUserInput {
    fn select(&self, prompt: &str, options: Vec<String>) -> Result<String> {
        use inquire::Select;
        Select::new(prompt, options)
            .prompt()
            .map_err(map_inquire_error)
    }

    fn text(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        use inquire::Text;
        let mut text_prompt = Text::new(prompt);
        if let Some(default_val) = default {
            text_prompt = text_prompt.with_default(default_val);
        }
        let answer = text_prompt.prompt().map_err(map_inquire_error)?;
        Ok(answer.trim().to_string())
    }

    fn password(&self, prompt: &str) -> Result<SecretString> {
        use inquire::{Password, PasswordDisplayMode};
        let answer = Password::new(prompt)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .map_err(map_inquire_error)?;
        Ok(SecretString::from(answer))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        use inquire::Confirm;
        Confirm::new(prompt)
            .with_default(default)
            .prompt()
            .map_err(map_inquire_error)
    }
}

/// Mock user input implementation for testing
#[cfg(test)]
pub struct MockUserInput {
    responses: Mutex<VecDeque<MockResponse>>,
    asked: Mutex<Vec<AskedPrompt>>,
}

#[cfg(test)]
impl MockUserInput {
    /// Create new mock with no pre-configured responses
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create mock with pre-configured responses
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Add a response to the queue
    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Every prompt shown so far, in order
    pub fn asked(&self) -> Vec<AskedPrompt> {
        self.asked.lock().unwrap().clone()
    }

    /// Number of scripted responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    fn record(&self, prompt: &str, default: Option<&str>) {
        self.asked.lock().unwrap().push(AskedPrompt {
            prompt: prompt.to_string(),
            default: default.map(str::to_string),
        });
    }

    /// Get the next response from the queue
    fn next_response(&self, prompt: &str) -> Result<MockResponse> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("No more mock responses available for '{}'", prompt))?;

        if let MockResponse::Cancel = response {
            return Err(anyhow::Error::new(BacpacError::Cancelled));
        }
        Ok(response)
    }
}

#[cfg(test)]
impl Default for MockUserInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl UserInput for MockUserInput {
    fn select(&self, prompt: &str, options: Vec<String>) -> Result<String> {
        self.record(prompt, None);
        match self.next_response(prompt)? {
            MockResponse::Select(answer) => {
                // Verify the answer is in the options
                if options.contains(&answer) {
                    Ok(answer)
                } else {
                    anyhow::bail!(
                        "Mock response '{}' is not in the provided options: {:?}",
                        answer,
                        options
                    )
                }
            }
            other => anyhow::bail!("Expected Select response for '{}' but got {:?}", prompt, other),
        }
    }

    fn text(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        self.record(prompt, default);
        match self.next_response(prompt)? {
            MockResponse::Text(answer) => Ok(answer),
            MockResponse::AcceptDefault => default
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Prompt '{}' offered no default", prompt)),
            other => anyhow::bail!("Expected Text response for '{}' but got {:?}", prompt, other),
        }
    }

    fn password(&self, prompt: &str) -> Result<SecretString> {
        self.record(prompt, None);
        match self.next_response(prompt)? {
            MockResponse::Password(answer) => Ok(SecretString::from(answer)),
            other => anyhow::bail!(
                "Expected Password response for '{}' but got {:?}",
                prompt,
                other
            ),
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.record(prompt, Some(if default { "yes" } else { "no" }));
        match self.next_response(prompt)? {
            MockResponse::Confirm(answer) => Ok(answer),
            other => anyhow::bail!(
                "Expected Confirm response for '{}' but got {:?}",
                prompt,
                other
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_cancelled;
    use secrecy::ExposeSecret;

    #[test]
    fn test_mock_accept_default_returns_offered_default() {
        let input = MockUserInput::with_responses(vec![MockResponse::AcceptDefault]);
        let answer = input.text("Database name:", Some("orders_2024")).unwrap();

        assert_eq!(answer, "orders_2024");
        assert_eq!(
            input.asked(),
            vec![AskedPrompt {
                prompt: "Database name:".to_string(),
                default: Some("orders_2024".to_string()),
            }]
        );
    }

    #[test]
    fn test_mock_cancel_surfaces_cancelled() {
        let input = MockUserInput::with_responses(vec![MockResponse::Cancel]);
        let err = input.confirm("Proceed?", true).unwrap_err();
        assert!(is_cancelled(&err));
    }

    #[test]
    fn test_mock_select_rejects_unknown_option() {
        let input = MockUserInput::with_responses(vec![MockResponse::Select("c".to_string())]);
        let result = input.select("Pick", vec!["a".to_string(), "b".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_password() {
        let input =
            MockUserInput::with_responses(vec![MockResponse::Password("s3cret".to_string())]);
        let secret = input.password("Password:").unwrap();
        assert_eq!(secret.expose_secret(), "s3cret");
        assert_eq!(input.remaining(), 0);
    }
}
