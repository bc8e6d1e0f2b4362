//! Magic-byte media type detection.
//!
//! Only the leading bytes are inspected; nothing is decoded. Container formats that can carry
//! video (WebM, Matroska, ISO BMFF) report their `video/*` type unless a brand or codec
//! header says otherwise, so an audio-only WebM download still probes as `video/webm`.

use super::MediaType;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const EBML_DOCTYPE_ID: [u8; 2] = [0x42, 0x82];
const EBML_SCAN_WINDOW: usize = 4096;

/// Detect the media type of `buf`, or `None` when no signature matches
pub fn probe(buf: &[u8]) -> Option<MediaType> {
    detect(buf).map(MediaType::from)
}

fn detect(buf: &[u8]) -> Option<&'static str> {
    if buf.starts_with(b"ID3") {
        return Some(detect_after_id3(buf));
    }

    if let Some(mime) = detect_mpeg_frame(buf) {
        return Some(mime);
    }

    if buf.starts_with(b"fLaC") {
        return Some("audio/x-flac");
    }

    if buf.starts_with(b"#!AMR") {
        return Some("audio/amr");
    }

    if buf.starts_with(b"MThd") {
        return Some("audio/midi");
    }

    if buf.len() >= 12 && buf.starts_with(b"RIFF") {
        match &buf[8..12] {
            b"WAVE" => return Some("audio/wav"),
            b"AVI " => return Some("video/vnd.avi"),
            _ => {}
        }
    }

    if buf.len() >= 12 && buf.starts_with(b"FORM") && matches!(&buf[8..12], b"AIFF" | b"AIFC") {
        return Some("audio/aiff");
    }

    if buf.starts_with(b"OggS") {
        return Some(detect_ogg(buf));
    }

    if buf.starts_with(&EBML_MAGIC) {
        return Some(detect_ebml(buf));
    }

    if buf.len() >= 12 && &buf[4..8] == b"ftyp" {
        return Some(detect_ftyp(&buf[8..12]));
    }

    None
}

/// ID3v2 tags can front any stream, several in a row; skip them all and fall back to MP3.
fn detect_after_id3(buf: &[u8]) -> &'static str {
    let mut rest = buf;

    while rest.starts_with(b"ID3") {
        if rest.len() < 10 {
            return MediaType::MPEG;
        }

        // Tag size is a 28-bit syncsafe integer
        let size = rest[6..10]
            .iter()
            .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
        let footer = if rest[5] & 0x10 != 0 { 10 } else { 0 };

        match rest.get(10 + size + footer..) {
            Some(next) if !next.is_empty() => rest = next,
            _ => return MediaType::MPEG,
        }
    }

    // `rest` no longer starts with a tag, so this cannot come back here
    detect(rest).unwrap_or(MediaType::MPEG)
}

fn detect_mpeg_frame(buf: &[u8]) -> Option<&'static str> {
    if buf.len() < 3 || buf[0] != 0xFF || buf[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = (buf[1] >> 3) & 0x03;
    let layer = (buf[1] >> 1) & 0x03;

    if layer == 0 {
        // ADTS: sync 0xFFF, layer 00
        return (buf[1] & 0xF6 == 0xF0).then_some("audio/aac");
    }

    let bitrate_index = buf[2] >> 4;
    let sample_rate_index = (buf[2] >> 2) & 0x03;
    if version == 0x01 || bitrate_index == 0x0F || sample_rate_index == 0x03 {
        return None;
    }

    Some(MediaType::MPEG)
}

fn detect_ogg(buf: &[u8]) -> &'static str {
    let payload = buf
        .get(26)
        .map(|segments| 27 + *segments as usize)
        .and_then(|start| buf.get(start..))
        .unwrap_or(&[]);

    if payload.starts_with(b"OpusHead") {
        "audio/opus"
    } else if payload.starts_with(b"\x80theora") {
        "video/ogg"
    } else {
        // Vorbis, Speex, FLAC-in-Ogg and unknown payloads
        "audio/ogg"
    }
}

fn detect_ebml(buf: &[u8]) -> &'static str {
    match ebml_doctype(buf) {
        Some(doctype) if doctype == b"webm" => "video/webm",
        _ => "video/x-matroska",
    }
}

fn ebml_doctype(buf: &[u8]) -> Option<&[u8]> {
    let window = &buf[..buf.len().min(EBML_SCAN_WINDOW)];
    let id_pos = window
        .windows(EBML_DOCTYPE_ID.len())
        .position(|w| w == EBML_DOCTYPE_ID)?;

    let size_pos = id_pos + EBML_DOCTYPE_ID.len();
    let (size, size_len) = read_vint(buf.get(size_pos..)?)?;
    let start = size_pos + size_len;
    let doctype = buf.get(start..start.checked_add(size)?)?;

    // Writers may pad the string with trailing NULs
    let end = doctype.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    Some(&doctype[..end])
}

/// Decode an EBML variable-length integer, returning the value and its encoded length
fn read_vint(buf: &[u8]) -> Option<(usize, usize)> {
    let first = *buf.first()?;
    if first == 0 {
        return None;
    }

    let len = first.leading_zeros() as usize + 1;
    let bytes = buf.get(..len)?;
    let mask = 0xFFu8.checked_shr(len as u32).unwrap_or(0);
    let value = bytes[1..]
        .iter()
        .fold((first & mask) as usize, |acc, b| (acc << 8) | *b as usize);

    Some((value, len))
}

fn detect_ftyp(brand: &[u8]) -> &'static str {
    match brand {
        b"M4A " => "audio/x-m4a",
        b"M4B " | b"M4P " | b"F4A " | b"F4B " => "audio/mp4",
        b"qt  " => "video/quicktime",
        b"M4V " | b"M4VH" | b"M4VP" => "video/x-m4v",
        _ => "video/mp4",
    }
}
