//! Stdio message framing.
//!
//! MCP hosts send one JSON message per line. Older clients wrap each message
//! in `Content-Length` headers instead. Both are accepted and a reply is
//! written with the framing of the message it answers.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Lines,
    ContentLength,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Value),
    /// The frame was read completely but its payload is not JSON.
    Malformed(String),
}

pub async fn read_message<R>(reader: &mut R) -> Result<Option<(Frame, Framing)>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let trimmed = line.trim();
        if !in_headers {
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.to_ascii_lowercase().starts_with("content-length:")
                && !trimmed.to_ascii_lowercase().starts_with("content-type:")
            {
                let frame = match serde_json::from_str::<Value>(trimmed) {
                    Ok(value) => Frame::Message(value),
                    Err(e) => Frame::Malformed(format!("Invalid JSON payload: {e}")),
                };
                return Ok(Some((frame, Framing::Lines)));
            }
            in_headers = true;
        }

        if trimmed.is_empty() {
            break;
        }

        if trimmed.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = trimmed
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let frame = match serde_json::from_slice::<Value>(&payload) {
        Ok(value) => Frame::Message(value),
        Err(e) => Frame::Malformed(format!("Invalid JSON payload: {e}")),
    };
    Ok(Some((frame, Framing::ContentLength)))
}

pub async fn write_message<W>(
    writer: &mut W,
    value: &Value,
    framing: Framing,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
