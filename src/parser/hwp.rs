//! HWP 5.0 text extraction.
//!
//! HWP documents are OLE compound files. Body text is split across
//! `BodyText/SectionN` streams, raw-deflated when the `FileHeader` says so.
//! Each stream is a sequence of tagged records; paragraph text lives in
//! `PARA_TEXT` records as UTF-16LE interleaved with control codes.

use flate2::read::DeflateDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AppError, Result};

const SIGNATURE: &[u8] = b"HWP Document File";
const FLAG_COMPRESSED: u32 = 0x01;
const FLAG_ENCRYPTED: u32 = 0x02;

const HWPTAG_BEGIN: u32 = 0x10;
const HWPTAG_PARA_TEXT: u32 = HWPTAG_BEGIN + 51;

pub fn extract_text(path: &Path) -> Result<String> {
    info!("Parsing HWP: {}", path.display());

    let file = File::open(path)?;
    let mut compound = cfb::CompoundFile::open(file)
        .map_err(|e| AppError::ParseError(format!("HWP 파일을 열 수 없습니다: {}", e)))?;

    let flags = read_header_flags(&mut compound)?;
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(AppError::ParseError("암호가 설정된 HWP 파일은 지원하지 않습니다.".to_string()));
    }
    let compressed = flags & FLAG_COMPRESSED != 0;

    let mut sections = Vec::new();
    loop {
        let name = format!("/BodyText/Section{}", sections.len());
        if !compound.exists(&name) {
            break;
        }

        let mut raw = Vec::new();
        compound.open_stream(&name)?.read_to_end(&mut raw)?;

        let data = if compressed {
            inflate(&raw).unwrap_or_else(|e| {
                warn!("Section {} did not inflate ({}), reading as stored", sections.len(), e);
                raw
            })
        } else {
            raw
        };

        sections.push(section_text(&data));
    }

    info!("Parsed HWP: {} sections", sections.len());
    Ok(sections.join("\n\n").trim().to_string())
}

fn read_header_flags<F: Read + std::io::Seek>(compound: &mut cfb::CompoundFile<F>) -> Result<u32> {
    let mut header = Vec::new();
    compound
        .open_stream("/FileHeader")
        .map_err(|e| AppError::ParseError(format!("HWP 헤더가 없습니다: {}", e)))?
        .read_to_end(&mut header)?;

    if !header.starts_with(SIGNATURE) {
        return Err(AppError::ParseError("HWP 5.0 형식이 아닙니다.".to_string()));
    }

    read_u32(&header, 36).ok_or_else(|| AppError::ParseError("HWP 헤더가 손상되었습니다.".to_string()))
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos..pos + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Walks the record stream and collects every `PARA_TEXT` payload.
fn section_text(data: &[u8]) -> String {
    let mut text = String::new();
    let mut pos = 0;

    while let Some(header) = read_u32(data, pos) {
        pos += 4;
        let tag = header & 0x3ff;
        let mut size = (header >> 20) as usize;
        if size == 0xfff {
            match read_u32(data, pos) {
                Some(extended) => {
                    size = extended as usize;
                    pos += 4;
                }
                None => break,
            }
        }

        let Some(payload) = data.get(pos..pos + size) else {
            break;
        };
        if tag == HWPTAG_PARA_TEXT {
            text.push_str(&para_text(payload));
            text.push('\n');
        }
        pos += size;
    }

    text
}

/// Decodes paragraph text, skipping inline and extended controls (8 code units each).
fn para_text(payload: &[u8]) -> String {
    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let mut plain = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        match unit {
            9 => {
                plain.push(u16::from(b'\t'));
                i += 8;
            }
            10 | 13 => {
                plain.push(u16::from(b'\n'));
                i += 1;
            }
            30 | 31 => {
                plain.push(u16::from(b' '));
                i += 1;
            }
            0 | 24..=29 => i += 1,
            1..=31 => i += 8,
            _ => {
                plain.push(unit);
                i += 1;
            }
        }
    }

    String::from_utf16_lossy(&plain).trim_end().to_string()
}
