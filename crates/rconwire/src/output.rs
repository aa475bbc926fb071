use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use serde::Serialize;

/// Minecraft formatting codes are `§` followed by one character.
const FORMAT_MARKER: char = '\u{00a7}';

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    server: &'a str,
    command: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<f64>,
    timestamp: String,
}

/// Print one command response on stdout.
pub fn print_response(
    server: &str,
    command: &str,
    response: &str,
    elapsed: Option<Duration>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                server,
                command,
                response,
                elapsed_ms: elapsed.map(millis),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Pretty => {
            let text = strip_formatting(response);
            if !text.is_empty() {
                println!("{}", text.trim_end());
            }
        }
        OutputFormat::Raw => {
            print_raw(response.as_bytes());
            if !response.ends_with('\n') {
                print_raw(b"\n");
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Drop `§x` formatting codes so responses read cleanly in a terminal.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == FORMAT_MARKER {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Milliseconds with two decimals.
pub fn millis(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_codes() {
        assert_eq!(
            strip_formatting("\u{a7}6There are \u{a7}c0\u{a7}6 players online"),
            "There are 0 players online"
        );
        assert_eq!(strip_formatting("plain"), "plain");
        assert_eq!(strip_formatting("dangling \u{a7}"), "dangling ");
    }

    #[test]
    fn millis_rounds_to_two_places() {
        assert_eq!(millis(Duration::from_micros(1_234_567)), 1234.57);
        assert_eq!(millis(Duration::ZERO), 0.0);
    }
}
