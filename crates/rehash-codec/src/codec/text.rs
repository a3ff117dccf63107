//! Commit and tag objects: `\n`-separated header lines, a blank line, then
//! an opaque body.
//!
//! Only `tree`, `parent` and `object` headers carry references. The dual
//! form prepends `sha1 <own source hash>` and appends ` <target hex>` to
//! each reference line. Bodies are copied byte for byte and never decoded.

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::utils::hex::is_lower_hex;
use rehash_core::{ObjectId, ObjectKind, TargetHash};

use super::{Links, PatchLocation};

/// Keyword of the identity line prepended to the dual form
pub const IDENTITY_KEYWORD: &str = "sha1";

const REFERENCE_KEYWORDS: [&str; 3] = ["tree", "parent", "object"];

/// Split into header and body; the body keeps its leading blank line
fn split_header(content: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < content.len() {
        if content[pos] == b'\n' {
            return content.split_at(pos);
        }
        match content[pos..].iter().position(|&b| b == b'\n') {
            Some(i) => pos += i + 1,
            None => break,
        }
    }
    (content, &[])
}

/// Header lines including their `\n` terminators
fn header_lines(header: &[u8]) -> impl Iterator<Item = &[u8]> {
    header.split_inclusive(|&b| b == b'\n')
}

fn strip_newline(line: &[u8]) -> (&[u8], &[u8]) {
    match line.strip_suffix(b"\n") {
        Some(text) => (text, b"\n"),
        None => (line, b""),
    }
}

fn first_token(text: &[u8]) -> &[u8] {
    text.split(|&b| b == b' ').next().unwrap_or_default()
}

fn is_reference_line(text: &[u8]) -> bool {
    let keyword = first_token(text);
    REFERENCE_KEYWORDS.iter().any(|k| k.as_bytes() == keyword)
}

/// Collect the hashes on `tree`/`parent`/`object` header lines
pub fn parse_links(kind: ObjectKind, content: &[u8]) -> RehashResult<Links> {
    let (header, _) = split_header(content);
    let mut links = Links::new();
    for (index, line) in header_lines(header).enumerate() {
        let (text, _) = strip_newline(line);
        if !is_reference_line(text) {
            continue;
        }
        let token = text
            .split(|&b| b == b' ')
            .nth(1)
            .ok_or_else(|| RehashError::malformed(kind, format!("header line {} has no hash", index)))?;
        let hex = std::str::from_utf8(token)
            .map_err(|_| RehashError::malformed(kind, format!("header line {} is not UTF-8", index)))?;
        let id = ObjectId::from_hex(hex)
            .map_err(|e| RehashError::malformed(kind, format!("header line {}: {}", index, e)))?;
        links.entry(id).or_default().push(PatchLocation::Line(index));
    }
    Ok(links)
}

/// Build the dual form; `patches` must be sorted by line
pub fn patch(
    kind: ObjectKind,
    content: &[u8],
    self_id: &ObjectId,
    patches: &[(PatchLocation, &TargetHash)],
) -> RehashResult<Vec<u8>> {
    let (header, body) = split_header(content);
    let appended: usize = patches.iter().map(|(_, target)| target.len() * 2 + 1).sum();
    let identity_len = IDENTITY_KEYWORD.len() + 1 + ObjectId::HEX_LEN + 1;
    let mut out = Vec::with_capacity(content.len() + identity_len + appended);
    out.extend_from_slice(IDENTITY_KEYWORD.as_bytes());
    out.push(b' ');
    out.extend_from_slice(self_id.to_hex().as_bytes());
    out.push(b'\n');

    let mut pending = patches.iter().peekable();
    for (index, line) in header_lines(header).enumerate() {
        match pending.peek() {
            Some((PatchLocation::Line(target_line), target)) if *target_line == index => {
                let (text, newline) = strip_newline(line);
                out.extend_from_slice(text);
                out.push(b' ');
                out.extend_from_slice(target.to_hex().as_bytes());
                out.extend_from_slice(newline);
                pending.next();
            }
            _ => out.extend_from_slice(line),
        }
    }
    if let Some((location, _)) = pending.next() {
        return Err(RehashError::malformed(
            kind,
            format!("patch location {:?} is outside the header", location),
        ));
    }

    out.extend_from_slice(body);
    Ok(out)
}

/// Strip the identity line and the appended target tokens
pub fn restore(kind: ObjectKind, content: &[u8], target_width: usize) -> RehashResult<Vec<u8>> {
    let (header, body) = split_header(content);
    let mut lines = header_lines(header);

    let identity = lines
        .next()
        .map(|line| strip_newline(line).0)
        .filter(|text| first_token(text) == IDENTITY_KEYWORD.as_bytes())
        .ok_or_else(|| RehashError::malformed(kind, "missing sha1 identity line"))?;
    if identity.len() != IDENTITY_KEYWORD.len() + 1 + ObjectId::HEX_LEN {
        return Err(RehashError::malformed(kind, "identity line does not hold a source hash"));
    }

    let mut out = Vec::with_capacity(content.len());
    for (index, line) in lines.enumerate() {
        let (text, newline) = strip_newline(line);
        if !is_reference_line(text) {
            out.extend_from_slice(line);
            continue;
        }
        let split = text
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| RehashError::malformed(kind, format!("header line {} has no target hash", index)))?;
        let token = std::str::from_utf8(&text[split + 1..]).unwrap_or_default();
        if token.len() != target_width * 2 || !is_lower_hex(token) {
            return Err(RehashError::malformed(
                kind,
                format!("header line {} does not end with a {}-byte target hash", index, target_width),
            ));
        }
        out.extend_from_slice(&text[..split]);
        out.extend_from_slice(newline);
    }

    out.extend_from_slice(body);
    Ok(out)
}
