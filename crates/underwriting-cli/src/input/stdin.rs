use serde_json::Value;
use std::io::{self, Read};

use super::file::{parse, InputFormat};

/// Read a JSON (or YAML) document from stdin if data is being piped.
/// Returns None if stdin is a TTY or the pipe is empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // JSON is the common case; YAML is the fallback
    let format = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        InputFormat::Json
    } else {
        InputFormat::Yaml
    };
    Ok(Some(parse(trimmed, format)?))
}
