//! Line-oriented descriptor text parser.
//!
//! Produces a `Document`: the `SectionUseCase` headers in file order, each
//! with the sections that follow it, plus any sections that precede the
//! first header (the whole body of a per-verb file).

use tracing::trace;
use ucm_core::{Capability, Result, UcmError};
use ucm_mixer::{ControlMutation, ControlSequence, ControlValue, MultiValue};

use crate::model::Descriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Verb,
    Device,
    Modifier,
}

#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub kind: SectionKind,
    pub line: usize,
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone)]
pub(crate) struct UseCaseHeader {
    pub name: String,
    pub file: Option<String>,
    pub line: usize,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Document {
    pub preamble: Vec<Section>,
    pub use_cases: Vec<UseCaseHeader>,
}

impl Document {
    /// Master-index shape: some header points at a per-verb file.
    pub fn is_indexed(&self) -> bool {
        self.use_cases.iter().any(|uc| uc.file.is_some())
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.preamble
            .iter()
            .chain(self.use_cases.iter().flat_map(|uc| uc.sections.iter()))
    }
}

/// Case-insensitive keyword match at the start of a trimmed line.
///
/// Returns the remainder of the line when the keyword is followed by a
/// non-identifier character or the end of the line.
fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let head = line.get(..kw.len())?;
    if !head.eq_ignore_ascii_case(kw) {
        return None;
    }
    let rest = &line[kw.len()..];
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// First double-quoted string in `text`.
fn quoted(text: &str) -> Option<&str> {
    let start = text.find('"')? + 1;
    let len = text[start..].find('"')?;
    Some(&text[start..start + len])
}

/// Quoted value, or the bare trimmed remainder when unquoted.
fn value(text: &str) -> Option<&str> {
    quoted(text).or_else(|| {
        let bare = text.trim();
        (!bare.is_empty()).then_some(bare)
    })
}

#[derive(Clone)]
struct Cursor<'a> {
    file: &'a str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    /// Next meaningful line, trimmed, skipping blanks and `#` comments.
    fn next_line(&mut self) -> Option<&'a str> {
        for (idx, raw) in self.lines.by_ref() {
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            self.line = idx + 1;
            return Some(text);
        }
        None
    }

    fn peek_line(&self) -> Option<&'a str> {
        self.clone().next_line()
    }

    fn error(&self, msg: impl std::fmt::Display) -> UcmError {
        UcmError::config_at(self.file, self.line, msg)
    }
}

/// Parse descriptor text. `card_number` expands bare PCM device numbers.
pub(crate) fn parse_document(source: &str, file: &str, card_number: u32) -> Result<Document> {
    let mut cursor = Cursor {
        file,
        lines: source.lines().enumerate(),
        line: 0,
    };
    let mut doc = Document::default();

    while let Some(text) = cursor.next_line() {
        if let Some(rest) = keyword(text, "SectionUseCase") {
            let header = parse_use_case_header(&mut cursor, rest)?;
            doc.use_cases.push(header);
        } else if let Some(kind) = section_kind(text) {
            let section = parse_section(&mut cursor, kind, card_number)?;
            match doc.use_cases.last_mut() {
                Some(uc) => uc.sections.push(section),
                None => doc.preamble.push(section),
            }
        } else if keyword(text, "EndSection").is_some() {
            return Err(cursor.error("EndSection outside of a section"));
        } else if keyword(text, "File").is_some() {
            return Err(cursor.error("File outside of SectionUseCase"));
        } else {
            trace!(file, line = cursor.line, text, "ignoring top-level line");
        }
    }
    Ok(doc)
}

fn section_kind(text: &str) -> Option<SectionKind> {
    if keyword(text, "SectionVerb").is_some() {
        Some(SectionKind::Verb)
    } else if keyword(text, "SectionDevice").is_some() {
        Some(SectionKind::Device)
    } else if keyword(text, "SectionModifier").is_some() {
        Some(SectionKind::Modifier)
    } else {
        None
    }
}

fn parse_use_case_header(cursor: &mut Cursor<'_>, rest: &str) -> Result<UseCaseHeader> {
    let line = cursor.line;
    let name = quoted(rest)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| cursor.error("SectionUseCase without a quoted name"))?
        .to_string();
    let mut header = UseCaseHeader {
        name,
        file: None,
        line,
        sections: Vec::new(),
    };

    // The opening brace may sit on a line of its own.
    let body = match rest.find('{') {
        Some(open) => &rest[open..],
        None => match cursor.peek_line() {
            Some(text) if text.starts_with('{') => {
                cursor.next_line();
                text
            }
            _ => return Ok(header),
        },
    };
    if body.contains('}') {
        return Ok(header);
    }
    loop {
        let Some(text) = cursor.next_line() else {
            return Err(UcmError::config_at(
                cursor.file,
                line,
                format!("SectionUseCase \"{}\" is not closed", header.name),
            ));
        };
        if let Some(rest) = keyword(text, "File") {
            header.file = Some(
                value(rest)
                    .ok_or_else(|| cursor.error("File without a value"))?
                    .to_string(),
            );
        } else if section_kind(text).is_some() || keyword(text, "SectionUseCase").is_some() {
            return Err(cursor.error("section opened inside SectionUseCase"));
        }
        if text.contains('}') {
            return Ok(header);
        }
    }
}

fn parse_section(cursor: &mut Cursor<'_>, kind: SectionKind, card_number: u32) -> Result<Section> {
    let line = cursor.line;
    let mut name: Option<String> = None;
    let mut desc = Descriptor::default();

    loop {
        let Some(text) = cursor.next_line() else {
            return Err(UcmError::config_at(cursor.file, line, "section missing EndSection"));
        };
        if keyword(text, "EndSection").is_some() {
            break;
        } else if let Some(rest) = keyword(text, "Name") {
            let n = value(rest).ok_or_else(|| cursor.error("Name without a value"))?;
            name = Some(n.to_string());
        } else if let Some(rest) = keyword(text, "PlaybackPCM") {
            desc.playback_pcm = Some(parse_pcm(cursor, rest, card_number)?);
        } else if let Some(rest) = keyword(text, "CapturePCM") {
            desc.capture_pcm = Some(parse_pcm(cursor, rest, card_number)?);
        } else if let Some(rest) = keyword(text, "ACDBID") {
            let (id, caps) = parse_acdb(rest);
            desc.acdb_id = id;
            desc.capability = caps;
        } else if let Some(rest) = keyword(text, "EffectsMixerCTL") {
            desc.effects_mixer_ctl = value(rest).map(str::to_string);
        } else if keyword(text, "EnableSequence").is_some() {
            desc.enable = parse_sequence(cursor)?;
        } else if keyword(text, "DisableSequence").is_some() {
            desc.disable = parse_sequence(cursor)?;
        } else if section_kind(text).is_some() || keyword(text, "SectionUseCase").is_some() {
            return Err(UcmError::config_at(cursor.file, line, "section missing EndSection"));
        } else {
            trace!(line = cursor.line, text, "ignoring section key");
        }
    }

    desc.name = name.ok_or_else(|| UcmError::config_at(cursor.file, line, "section without Name"))?;
    Ok(Section {
        kind,
        line,
        descriptor: desc,
    })
}

fn parse_pcm(cursor: &Cursor<'_>, rest: &str, card_number: u32) -> Result<String> {
    let raw = value(rest).ok_or_else(|| cursor.error("PCM without a value"))?;
    if raw.starts_with("hw:") {
        return Ok(raw.to_string());
    }
    raw.parse::<u32>()
        .map(|device| format!("hw:{},{}", card_number, device))
        .map_err(|_| cursor.error(format!("invalid PCM device '{}'", raw)))
}

/// `id:mask`; missing digits mean no calibration id.
fn parse_acdb(rest: &str) -> (Option<i32>, Capability) {
    let text = value(rest).unwrap_or_default();
    let (id, mask) = match text.split_once(':') {
        Some((id, mask)) => (id, mask),
        None => (text, ""),
    };
    let id = id.trim().parse::<i32>().ok();
    let mask = mask.trim().parse::<u32>().unwrap_or(0);
    (id, Capability::from_bits_truncate(mask))
}

fn parse_sequence(cursor: &mut Cursor<'_>) -> Result<ControlSequence> {
    let start = cursor.line;
    let mut sequence = ControlSequence::new();
    loop {
        let Some(text) = cursor.next_line() else {
            return Err(UcmError::config_at(cursor.file, start, "sequence missing EndSequence"));
        };
        if keyword(text, "EndSequence").is_some() {
            return Ok(sequence);
        }
        if keyword(text, "EndSection").is_some() {
            return Err(UcmError::config_at(cursor.file, start, "sequence missing EndSequence"));
        }
        let mutation = parse_control_line(text).map_err(|msg| cursor.error(msg))?;
        sequence.push(mutation);
    }
}

/// Parse one `'control name' type:value` line.
///
/// Type 0 selects an option label, 1 writes an integer, 2 writes several
/// hexadecimal values (or one `N%` percentage for every slot).
pub fn parse_control_line(text: &str) -> std::result::Result<ControlMutation, String> {
    let body = text
        .strip_prefix('\'')
        .ok_or_else(|| format!("expected a quoted control name: {}", text))?;
    let (control, after) = body
        .split_once('\'')
        .ok_or_else(|| format!("unterminated control name: {}", text))?;
    if control.is_empty() {
        return Err("empty control name".into());
    }
    let after = after.trim_start();
    let after = after.strip_prefix(':').unwrap_or(after).trim_start();
    let (kind, raw) = after
        .split_once(':')
        .ok_or_else(|| format!("missing type for '{}'", control))?;
    let raw = raw.trim();

    let value = match kind.trim() {
        "0" => ControlValue::Str(quoted(raw).unwrap_or(raw).to_string()),
        "1" => ControlValue::Int(
            raw.parse::<i64>()
                .map_err(|_| format!("invalid integer '{}' for '{}'", raw, control))?,
        ),
        "2" => ControlValue::Multi(parse_multi(raw).map_err(|e| format!("{} for '{}'", e, control))?),
        other => return Err(format!("unknown control type '{}' for '{}'", other, control)),
    };
    Ok(ControlMutation::new(control, value))
}

fn parse_multi(raw: &str) -> std::result::Result<MultiValue, String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Err("empty multi-value".into()),
        [single] if single.ends_with('%') => single
            .trim_end_matches('%')
            .parse::<i64>()
            .map(MultiValue::Percent)
            .map_err(|_| format!("invalid percentage '{}'", single)),
        _ => tokens
            .iter()
            .map(|t| {
                let digits = t.trim_start_matches("0x").trim_start_matches("0X");
                i64::from_str_radix(digits, 16).map_err(|_| format!("invalid hex value '{}'", t))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(MultiValue::Raw),
    }
}
