//! Minimal HTTP/1.1 framing for streaming uploads over a raw socket.

use crate::{Result, TranscribeError};

/// Upload chunk size for chunked transfer encoding.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Frame `payload` with chunked transfer encoding, terminator included.
pub fn encode_chunked(payload: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 32);
    for chunk in payload.chunks(chunk_size.max(1)) {
        framed.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        framed.extend_from_slice(chunk);
        framed.extend_from_slice(b"\r\n");
    }
    framed.extend_from_slice(b"0\r\n\r\n");
    framed
}

/// Request line and headers for a chunked audio upload.
pub(crate) fn request_head(host: &str, path_and_query: &str, content_type: &str) -> String {
    format!(
        "POST {path_and_query} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Accept-Encoding: identity\r\n\
         Connection: close\r\n\
         Content-Type: {content_type}\r\n\
         Transfer-Encoding: chunked\r\n\
         \r\n"
    )
}

/// A parsed HTTP/1.1 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Parse a complete response as read until the peer closed the connection.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let head_end = find(raw, b"\r\n\r\n")
            .ok_or_else(|| malformed("response has no header terminator"))?;
        let head = std::str::from_utf8(&raw[..head_end])
            .map_err(|_| malformed("response head is not UTF-8"))?;
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap_or_default();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| malformed(&format!("bad status line: {status_line}")))?;

        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        let mut response = Self {
            status,
            headers,
            body: Vec::new(),
        };

        let rest = &raw[head_end + 4..];
        let chunked = response
            .header("transfer-encoding")
            .is_some_and(|value| value.eq_ignore_ascii_case("chunked"));
        response.body = if chunked {
            decode_chunked(rest)?
        } else if let Some(length) = response
            .header("content-length")
            .and_then(|value| value.parse::<usize>().ok())
        {
            rest[..length.min(rest.len())].to_vec()
        } else {
            rest.to_vec()
        };

        Ok(response)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = find(data, b"\r\n").ok_or_else(|| malformed("truncated chunk size"))?;
        let size_line = std::str::from_utf8(&data[..line_end])
            .map_err(|_| malformed("chunk size is not UTF-8"))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| malformed(&format!("bad chunk size: {size_line}")))?;

        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        if data.len() < size {
            return Err(malformed("truncated chunk"));
        }
        body.extend_from_slice(&data[..size]);
        data = data[size..].strip_prefix(b"\r\n").unwrap_or(&data[size..]);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn malformed(message: &str) -> TranscribeError {
    TranscribeError::MalformedResponse(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_count(framed: &[u8]) -> usize {
        decode_sizes(framed).len()
    }

    fn decode_sizes(mut data: &[u8]) -> Vec<usize> {
        let mut sizes = Vec::new();
        loop {
            let end = find(data, b"\r\n").unwrap();
            let size = usize::from_str_radix(std::str::from_utf8(&data[..end]).unwrap(), 16).unwrap();
            sizes.push(size);
            if size == 0 {
                return sizes;
            }
            data = &data[end + 2 + size + 2..];
        }
    }

    #[test]
    fn test_two_mebibytes_is_two_chunks_plus_terminator() {
        let payload = vec![7u8; 2 * CHUNK_SIZE];
        let framed = encode_chunked(&payload, CHUNK_SIZE);
        assert_eq!(decode_sizes(&framed), vec![CHUNK_SIZE, CHUNK_SIZE, 0]);
        assert!(framed.starts_with(b"100000\r\n"));
        assert!(framed.ends_with(b"\r\n0\r\n\r\n"));
    }

    #[test]
    fn test_short_payload_is_one_chunk() {
        let framed = encode_chunked(b"RIFF....WAVE", CHUNK_SIZE);
        assert_eq!(chunk_count(&framed), 2);
        assert_eq!(framed, b"c\r\nRIFF....WAVE\r\n0\r\n\r\n".to_vec());
    }

    #[test]
    fn test_empty_payload_is_terminator_only() {
        assert_eq!(encode_chunked(b"", CHUNK_SIZE), b"0\r\n\r\n".to_vec());
    }

    #[test]
    fn test_request_head() {
        let head = request_head("asr.example.net", "/asr_xml?key=k", "audio/x-wav");
        assert!(head.starts_with("POST /asr_xml?key=k HTTP/1.1\r\nHost: asr.example.net\r\n"));
        assert!(head.contains("Transfer-Encoding: chunked\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_content_length_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 5\r\n\r\nhello trailing";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/xml"));
        assert_eq!(response.body_text(), "hello");
    }

    #[test]
    fn test_parse_chunked_response() {
        let raw = b"HTTP/1.1 400 Bad Request\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nbad \r\n7\r\nrequest\r\n0\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.body_text(), "bad request");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            HttpResponse::parse(b"not http"),
            Err(TranscribeError::MalformedResponse(_))
        ));
    }
}
