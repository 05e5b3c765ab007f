// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outlook .msg reader on top of the `cfb` compound-file crate.
//
// A .msg file stores each MAPI property either as its own stream named
// `__substg1.0_<ID><TYPE>` (variable-length values) or as a 16-byte record in
// the `__properties_version1.0` stream (fixed-length values such as times).
// Attachments live in `__attach_version1.0_#NNNNNNNN` sub-storages laid out
// the same way.
//
// 8-bit string properties (PT_STRING8) are in the message's ANSI code page,
// named by PR_MESSAGE_CODEPAGE or PR_INTERNET_CPID, windows-1252 when neither
// is present.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use chrono::{DateTime, FixedOffset};
use encoding_rs::Encoding;
use mailpdf_core::error::{ConversionError, Result};
use mailpdf_core::{MessageDate, ParsedMessage, RawAttachment};
use tracing::{debug, info, instrument, warn};

use super::{MessageHandle, MessageParser};

// Property ids.
const PR_TRANSPORT_HEADERS: u16 = 0x007D;
const PR_SUBJECT: u16 = 0x0037;
const PR_CLIENT_SUBMIT_TIME: u16 = 0x0039;
const PR_SENDER_NAME: u16 = 0x0C1A;
const PR_SENDER_EMAIL: u16 = 0x0C1F;
const PR_DISPLAY_CC: u16 = 0x0E03;
const PR_DISPLAY_TO: u16 = 0x0E04;
const PR_MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
const PR_BODY: u16 = 0x1000;
const PR_ATTACH_DATA: u16 = 0x3701;
const PR_ATTACH_FILENAME: u16 = 0x3704;
const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
const PR_SENDER_SMTP_ADDRESS: u16 = 0x5D01;
const PR_INTERNET_CPID: u16 = 0x3FDE;
const PR_MESSAGE_CODEPAGE: u16 = 0x3FFD;

// Property types.
const PT_LONG: u16 = 0x0003;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_SYSTIME: u16 = 0x0040;
const PT_BINARY: u16 = 0x0102;

const PROPERTIES_STREAM: &str = "__properties_version1.0";
const ATTACH_PREFIX: &str = "__attach_version1.0_#";
/// Header length of the top-level properties stream.
const MESSAGE_PROPS_HEADER: usize = 32;
const PROPERTY_ENTRY_LEN: usize = 16;
/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// Reads Outlook .msg files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlookParser;

impl OutlookParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an in-memory .msg file.
    pub fn parse_bytes(&self, bytes: Vec<u8>) -> Result<ParsedMessage> {
        let mut file = CompoundFile::open(Cursor::new(bytes))
            .map_err(|err| ConversionError::Parse(format!("not an Outlook message: {err}")))?;
        read_message(&mut file)
    }
}

impl MessageParser for OutlookParser {
    type Handle = OutlookHandle;

    #[instrument(skip_all, fields(path = %path.display()))]
    fn parse(&self, path: &Path) -> Result<OutlookHandle> {
        let bytes = std::fs::read(path).map_err(|err| {
            ConversionError::Parse(format!("cannot read {}: {err}", path.display()))
        })?;
        let message = self.parse_bytes(bytes)?;
        info!(
            attachments = message.attachments.len(),
            has_body = message.body.is_some(),
            "Message parsed"
        );
        Ok(OutlookHandle {
            message,
            closed: false,
        })
    }
}

/// Parsed message held in memory until closed.
#[derive(Debug)]
pub struct OutlookHandle {
    message: ParsedMessage,
    closed: bool,
}

impl OutlookHandle {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl MessageHandle for OutlookHandle {
    fn message(&self) -> &ParsedMessage {
        &self.message
    }

    fn close(&mut self) {
        if self.closed {
            warn!("Message handle closed twice");
            return;
        }
        self.closed = true;
        self.message = ParsedMessage::default();
        debug!("Message handle released");
    }
}

fn read_message<F: Read + Seek>(file: &mut CompoundFile<F>) -> Result<ParsedMessage> {
    let props = read_stream(file, &format!("/{PROPERTIES_STREAM}"))?;
    let encoding = props
        .as_deref()
        .map_or(encoding_rs::WINDOWS_1252, message_encoding);
    let mut reader = StringReader { file, encoding };

    let headers = reader.read("", PR_TRANSPORT_HEADERS)?;

    let sender = format_sender(
        reader.read("", PR_SENDER_NAME)?,
        match reader.read("", PR_SENDER_EMAIL)? {
            Some(email) if email.contains('@') => Some(email),
            _ => reader.read("", PR_SENDER_SMTP_ADDRESS)?,
        },
    );

    let date = headers
        .as_deref()
        .and_then(header_date)
        .or_else(|| {
            props.as_deref().and_then(|props| {
                systime(props, MESSAGE_PROPS_HEADER, PR_CLIENT_SUBMIT_TIME)
                    .or_else(|| systime(props, MESSAGE_PROPS_HEADER, PR_MESSAGE_DELIVERY_TIME))
            })
        })
        .map(MessageDate::Structured)
        .or_else(|| {
            headers
                .as_deref()
                .and_then(header_value_date)
                .map(MessageDate::Text)
        });

    let message = ParsedMessage {
        sender,
        to: reader.read("", PR_DISPLAY_TO)?.filter(|s| !s.is_empty()),
        cc: reader.read("", PR_DISPLAY_CC)?.filter(|s| !s.is_empty()),
        subject: reader.read("", PR_SUBJECT)?,
        date,
        body: reader.read("", PR_BODY)?,
        attachments: read_attachments(&mut reader)?,
    };
    debug!(
        subject = message.subject.as_deref().unwrap_or_default(),
        attachments = message.attachments.len(),
        "Message properties read"
    );
    Ok(message)
}

fn read_attachments<F: Read + Seek>(reader: &mut StringReader<'_, F>) -> Result<Vec<RawAttachment>> {
    let mut storages: Vec<String> = reader
        .file
        .read_storage("/")
        .map_err(|err| ConversionError::Parse(format!("cannot list message storage: {err}")))?
        .filter(|entry| entry.is_storage() && entry.name().starts_with(ATTACH_PREFIX))
        .map(|entry| entry.name().to_string())
        .collect();
    // Storage names carry the zero-padded attachment number.
    storages.sort();

    let mut attachments = Vec::with_capacity(storages.len());
    for name in storages {
        let storage = format!("/{name}");
        let attachment = RawAttachment {
            long_name: reader.read(&storage, PR_ATTACH_LONG_FILENAME)?,
            short_name: reader.read(&storage, PR_ATTACH_FILENAME)?,
            data: read_property(&mut *reader.file, &storage, PR_ATTACH_DATA, PT_BINARY)?,
        };
        debug!(storage = %name, bytes = attachment.size(), "Attachment read");
        attachments.push(attachment);
    }
    Ok(attachments)
}

fn read_stream<F: Read + Seek>(file: &mut CompoundFile<F>, path: &str) -> Result<Option<Vec<u8>>> {
    if !file.is_stream(path) {
        return Ok(None);
    }
    let mut data = Vec::new();
    file.open_stream(path)
        .and_then(|mut stream| stream.read_to_end(&mut data))
        .map_err(|err| ConversionError::Parse(format!("cannot read stream {path}: {err}")))?;
    Ok(Some(data))
}

fn read_property<F: Read + Seek>(
    file: &mut CompoundFile<F>,
    storage: &str,
    id: u16,
    kind: u16,
) -> Result<Option<Vec<u8>>> {
    read_stream(file, &format!("{storage}/__substg1.0_{id:04X}{kind:04X}"))
}

/// Reads string properties, decoding PT_STRING8 values with the message's
/// code page.
struct StringReader<'a, F> {
    file: &'a mut CompoundFile<F>,
    encoding: &'static Encoding,
}

impl<F: Read + Seek> StringReader<'_, F> {
    /// String property in either the UTF-16 or the 8-bit encoding.
    fn read(&mut self, storage: &str, id: u16) -> Result<Option<String>> {
        if let Some(raw) = read_property(&mut *self.file, storage, id, PT_UNICODE)? {
            return Ok(Some(decode_utf16(&raw)));
        }
        Ok(read_property(&mut *self.file, storage, id, PT_STRING8)?.map(|raw| {
            let (text, _, had_errors) = self.encoding.decode(&raw);
            if had_errors {
                debug!(id, encoding = self.encoding.name(), "Malformed 8-bit string property");
            }
            text.trim_end_matches('\0').to_string()
        }))
    }
}

/// Encoding for PT_STRING8 values, from the message's code page properties.
fn message_encoding(props: &[u8]) -> &'static Encoding {
    [PR_MESSAGE_CODEPAGE, PR_INTERNET_CPID]
        .into_iter()
        .filter_map(|id| long_property(props, MESSAGE_PROPS_HEADER, id))
        .find_map(codepage_encoding)
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Map a Windows code page number to an encoding.
fn codepage_encoding(codepage: u32) -> Option<&'static Encoding> {
    let label = match codepage {
        // ISO-8859-1 decodes as windows-1252, its superset.
        1252 | 28591 | 20127 => "windows-1252",
        874 | 1250..=1258 => return Encoding::for_label(format!("windows-{codepage}").as_bytes()),
        28592..=28606 => return Encoding::for_label(format!("iso-8859-{}", codepage - 28590).as_bytes()),
        65001 => "utf-8",
        932 => "shift_jis",
        936 => "gbk",
        949 => "euc-kr",
        950 => "big5",
        866 => "ibm866",
        20866 => "koi8-r",
        21866 => "koi8-u",
        50220..=50222 => "iso-2022-jp",
        51932 => "euc-jp",
        54936 => "gb18030",
        10000 => "macintosh",
        _ => {
            warn!(codepage, "Unknown message code page");
            return None;
        }
    };
    Encoding::for_label(label.as_bytes())
}

fn decode_utf16(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

fn format_sender(name: Option<String>, email: Option<String>) -> Option<String> {
    let name = name.filter(|n| !n.trim().is_empty());
    let email = email.filter(|e| !e.trim().is_empty());
    match (name, email) {
        (Some(name), Some(email)) if name != email => Some(format!("{name} <{email}>")),
        (Some(name), _) => Some(name),
        (None, email) => email,
    }
}

/// Value bytes of the fixed-length property `id` of type `kind`.
fn fixed_property(props: &[u8], header_len: usize, kind: u16, id: u16) -> Option<[u8; 8]> {
    props
        .get(header_len..)?
        .chunks_exact(PROPERTY_ENTRY_LEN)
        .find(|entry| {
            u16::from_le_bytes([entry[0], entry[1]]) == kind
                && u16::from_le_bytes([entry[2], entry[3]]) == id
        })
        .map(|entry| {
            let mut value = [0u8; 8];
            value.copy_from_slice(&entry[8..16]);
            value
        })
}

fn long_property(props: &[u8], header_len: usize, id: u16) -> Option<u32> {
    fixed_property(props, header_len, PT_LONG, id)
        .map(|value| u32::from_le_bytes([value[0], value[1], value[2], value[3]]))
}

/// Find a PT_SYSTIME value in a fixed-length properties stream.
fn systime(props: &[u8], header_len: usize, id: u16) -> Option<DateTime<FixedOffset>> {
    fixed_property(props, header_len, PT_SYSTIME, id)
        .and_then(|value| filetime(u64::from_le_bytes(value)))
}

fn filetime(ticks: u64) -> Option<DateTime<FixedOffset>> {
    if ticks == 0 {
        return None;
    }
    let secs = (ticks / 10_000_000) as i64 - FILETIME_UNIX_OFFSET;
    let nanos = ((ticks % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).map(|utc| utc.fixed_offset())
}

/// Raw value of the `Date:` line of the transport headers.
fn header_value_date(headers: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("date")
            .then(|| value.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn header_date(headers: &str) -> Option<DateTime<FixedOffset>> {
    let raw = header_value_date(headers)?;
    // Some mailers append a zone comment, e.g. "+0100 (CET)".
    let trimmed = raw.split(" (").next().unwrap_or(&raw);
    DateTime::parse_from_rfc2822(trimmed).ok()
}
