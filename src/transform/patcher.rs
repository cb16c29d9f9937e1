// Offset-preserving text patcher with source map output

use crate::utils::{IceError, Result};
use sourcemap::{SourceMap, SourceMapBuilder};

/// Collects insertions against an immutable original text.
///
/// Offsets always refer to the original text, so insertions can be recorded
/// in any order without shifting each other.
#[derive(Debug, Clone)]
pub struct TextPatcher<'a> {
    original: &'a str,
    insertions: Vec<(usize, String)>,
}

impl<'a> TextPatcher<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            insertions: Vec::new(),
        }
    }

    /// Insert `text` at byte `offset` of the original.
    ///
    /// Text inserted at the same offset keeps insertion order. Offsets past
    /// the end or inside a UTF-8 sequence are rejected.
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) -> Result<()> {
        if offset > self.original.len() || !self.original.is_char_boundary(offset) {
            return Err(IceError::parse(format!(
                "insertion offset {} is not a character boundary",
                offset
            )));
        }
        self.insertions.push((offset, text.into()));
        Ok(())
    }

    pub fn has_changed(&self) -> bool {
        self.insertions.iter().any(|(_, text)| !text.is_empty())
    }

    fn sorted_insertions(&self) -> Vec<&(usize, String)> {
        let mut sorted: Vec<&(usize, String)> = self.insertions.iter().collect();
        sorted.sort_by_key(|(offset, _)| *offset);
        sorted
    }

    pub fn render(&self) -> String {
        let extra: usize = self.insertions.iter().map(|(_, t)| t.len()).sum();
        let mut out = String::with_capacity(self.original.len() + extra);
        let mut cursor = 0;
        for (offset, text) in self.sorted_insertions() {
            out.push_str(&self.original[cursor..*offset]);
            out.push_str(text);
            cursor = *offset;
        }
        out.push_str(&self.original[cursor..]);
        out
    }

    /// Build a v3 source map from the patched text back to the original.
    ///
    /// With `hires` every original character gets a mapping, otherwise only
    /// line starts and the first character after an insertion. Columns are
    /// counted in UTF-16 code units.
    pub fn generate_map(&self, source_name: &str, hires: bool) -> Result<String> {
        let mut builder = SourceMapBuilder::new(None);
        let src_id = builder.add_source(source_name);
        builder.set_source_contents(src_id, Some(self.original));

        let insertions = self.sorted_insertions();
        let mut next = 0;

        let (mut src_line, mut src_col) = (0u32, 0u32);
        let (mut dst_line, mut dst_col) = (0u32, 0u32);
        let mut line_start = true;

        for (offset, ch) in self.original.char_indices() {
            let mut after_insertion = false;
            while next < insertions.len() && insertions[next].0 == offset {
                for inserted in insertions[next].1.chars() {
                    advance(inserted, &mut dst_line, &mut dst_col);
                }
                after_insertion = true;
                next += 1;
            }

            if ch != '\n' && (hires || line_start || after_insertion) {
                builder.add(dst_line, dst_col, src_line, src_col, Some(source_name), None, false);
            }
            line_start = ch == '\n';

            advance(ch, &mut src_line, &mut src_col);
            advance(ch, &mut dst_line, &mut dst_col);
        }

        write_map(builder.into_sourcemap())
    }
}

/// Chain `next` (intermediate -> output) onto `previous` (original ->
/// intermediate) so the result maps the output back to the original.
///
/// Output positions whose intermediate position has no mapping on the same
/// line of `previous` are dropped.
pub fn compose_maps(previous: &str, next: &str) -> Result<String> {
    let previous = parse_map(previous)?;
    let next = parse_map(next)?;

    let mut builder = SourceMapBuilder::new(None);
    for idx in 0..previous.get_source_count() {
        if let Some(source) = previous.get_source(idx) {
            let src_id = builder.add_source(source);
            builder.set_source_contents(src_id, previous.get_source_contents(idx));
        }
    }

    for token in next.tokens() {
        let (line, col) = (token.get_src_line(), token.get_src_col());
        let Some(origin) = previous.lookup_token(line, col) else {
            continue;
        };
        if origin.get_dst_line() != line || origin.get_src_line() == u32::MAX {
            continue;
        }
        builder.add(
            token.get_dst_line(),
            token.get_dst_col(),
            origin.get_src_line(),
            origin.get_src_col() + (col - origin.get_dst_col()),
            origin.get_source(),
            origin.get_name(),
            false,
        );
    }

    write_map(builder.into_sourcemap())
}

fn parse_map(map: &str) -> Result<SourceMap> {
    SourceMap::from_slice(map.as_bytes())
        .map_err(|e| IceError::parse(format!("invalid source map: {}", e)))
}

fn write_map(map: SourceMap) -> Result<String> {
    let mut buf = Vec::new();
    map.to_writer(&mut buf)
        .map_err(|e| IceError::parse(format!("failed to write source map: {}", e)))?;
    String::from_utf8(buf).map_err(|e| IceError::parse(e.to_string()))
}

fn advance(ch: char, line: &mut u32, col: &mut u32) {
    if ch == '\n' {
        *line += 1;
        *col = 0;
    } else {
        *col += ch.len_utf16() as u32;
    }
}
