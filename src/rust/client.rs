//! Interactive command line client for a running `shipclass serve`.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/predict";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not connect to the API at {url}. Is the server running?")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("The request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("Unexpected client error: {0}")]
    Other(#[source] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightInputError {
    #[error("Invalid input. Please enter a number (e.g., 300.0).")]
    NotANumber,
    #[error("Weight must be a positive number. Please try again.")]
    NotPositive,
}

/// What the server answered. Non-2xx statuses are data here, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientResponse {
    Success(Value),
    /// Body is the JSON error document, or the raw text wrapped in a string
    HttpError { status: u16, body: Value },
}

/// `sair` or `exit`, in any case, ends the session.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("sair") || input.eq_ignore_ascii_case("exit")
}

pub fn parse_weight(input: &str) -> Result<f64, WeightInputError> {
    let weight: f64 = input.trim().parse().map_err(|_| WeightInputError::NotANumber)?;
    if !weight.is_finite() {
        return Err(WeightInputError::NotANumber);
    }
    if weight <= 0.0 {
        return Err(WeightInputError::NotPositive);
    }
    Ok(weight)
}

#[derive(Debug, Clone)]
pub struct PredictClient {
    http: Client,
    url: String,
}

impl PredictClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Other)?;
        Ok(Self { http, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends both values as typed; the server does the numeric conversion.
    pub async fn predict(&self, weight: &str, size: &str) -> Result<ClientResponse, ClientError> {
        let payload = json!({
            "package_weight_gr": weight,
            "package_size": size,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            Ok(ClientResponse::Success(body))
        } else {
            Ok(ClientResponse::HttpError {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(err)
        } else if err.is_connect() {
            ClientError::Connection {
                url: self.url.clone(),
                source: err,
            }
        } else {
            ClientError::Other(err)
        }
    }
}

/// Reads one line after printing `prompt`. `None` on exit command or EOF.
fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<Option<String>> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if is_exit_command(&line) {
        return Ok(None);
    }
    Ok(Some(line))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Prompt loop: weight (re-asked until valid), then size, then one request.
pub async fn run_interactive<R: BufRead, W: Write>(
    client: &PredictClient,
    mut input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(output, "--- API Prediction Client ---")?;
    writeln!(output, "Connecting to: {}", client.url())?;
    writeln!(output, "Type 'sair' or 'exit' at any prompt to quit.")?;

    'session: loop {
        let weight = loop {
            let Some(line) = ask(
                &mut input,
                &mut output,
                "\nEnter package weight in grams (e.g., 300.0) or 'sair' to exit: ",
            )?
            else {
                break 'session;
            };
            match parse_weight(&line) {
                Ok(_) => break line.trim().to_string(),
                Err(e) => writeln!(output, "  [ERROR] {}", e)?,
            }
        };

        let Some(size) = ask(
            &mut input,
            &mut output,
            "Enter package size ('Small Package' or 'Large Package') or 'sair' to exit: ",
        )?
        else {
            break;
        };

        writeln!(output, "\nSending request to {}...", client.url())?;
        match client.predict(&weight, &size).await {
            Ok(ClientResponse::Success(body)) => {
                writeln!(output, "\n--- API Success Response ---")?;
                writeln!(output, "{}", pretty(&body))?;
            }
            Ok(ClientResponse::HttpError { status, body }) => {
                writeln!(output, "\n--- API Error (HTTP {}) ---", status)?;
                match &body {
                    Value::String(text) => writeln!(output, "{}", text)?,
                    other => writeln!(output, "{}", pretty(other))?,
                }
            }
            Err(e) => {
                log::debug!("Request failed: {:?}", e);
                writeln!(output, "\n--- API Request Failed ---")?;
                writeln!(output, "Error: {}", e)?;
            }
        }
        writeln!(output, "{}", SEPARATOR)?;
    }

    writeln!(output, "\nExiting client. Goodbye!")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_exit_commands() {
        for input in ["sair", "EXIT", " Sair \n", "exit"] {
            assert!(is_exit_command(input), "{input:?}");
        }
        assert!(!is_exit_command("exiting"));
        assert!(!is_exit_command("300"));
    }

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("300.0"), Ok(300.0));
        assert_eq!(parse_weight(" 42 "), Ok(42.0));
        assert_eq!(parse_weight("0"), Err(WeightInputError::NotPositive));
        assert_eq!(parse_weight("-1.5"), Err(WeightInputError::NotPositive));
        assert_eq!(parse_weight("heavy"), Err(WeightInputError::NotANumber));
        assert_eq!(parse_weight("inf"), Err(WeightInputError::NotANumber));
        assert_eq!(parse_weight(""), Err(WeightInputError::NotANumber));
    }

    #[tokio::test]
    async fn test_interactive_reprompts_then_exits() {
        let client = PredictClient::new("http://127.0.0.1:9/predict").unwrap();
        let input = Cursor::new("abc\n-3\nsair\n");
        let mut output = Vec::new();

        run_interactive(&client, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Please enter a number"));
        assert!(text.contains("Weight must be a positive number"));
        assert!(text.ends_with("Goodbye!\n"));
        assert!(!text.contains("Sending request"));
    }

    #[tokio::test]
    async fn test_exit_at_size_prompt() {
        let client = PredictClient::new("http://127.0.0.1:9/predict").unwrap();
        let mut output = Vec::new();

        run_interactive(&client, Cursor::new("300\nEXIT\n"), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Enter package size"));
        assert!(!text.contains("Sending request"));
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let client = PredictClient::new(DEFAULT_API_URL).unwrap();
        let mut output = Vec::new();
        run_interactive(&client, Cursor::new(""), &mut output).await.unwrap();
        assert!(String::from_utf8(output).unwrap().contains("Goodbye!"));
    }
}
