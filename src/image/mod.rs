//! Binary images of values and whole machines.
//!
//! Little-endian, no header. Every value starts with a one-byte tag:
//!
//! | tag | payload |
//! |-----|---------|
//! | 0 | symbol: u32 length, UTF-8 |
//! | 1 | string: u32 length, UTF-8 |
//! | 2 | number: f64 |
//! | 3 | list: u32 count, elements |
//! | 4 | map: u32 count, (u32-length key, value) pairs |
//! | 5 | word: u32 length, primitive name |
//! | 6 | control marker, only inside a saved continuation: kind byte, then payload |
//!
//! Marker kinds: 0 pop-scope, 1 pause, 2 break, 3 restore (a dictionary
//! value), 4 literal (a value), 5 restore sharing the machine's root frame
//! (a list of the frames above it).
//!
//! A machine is a map with exactly `continuation`, `dictionary` and `stack`.
//! The stack list is top first. The dictionary is a map when it has one frame
//! and a list of maps, outermost first, when it has more. Pending restores
//! store only the frames above the root, so an image taken deep in a
//! recursion does not repeat the primitive table per level.
//!
//! `encode` and `save` refuse values nested deeper than [`MAX_DEPTH`], the
//! same bound `decode` enforces, so every image written can be read back.

use std::collections::BTreeMap;
use std::path::Path;

use crate::machine::{Item, Machine, Marker, PList};
use crate::primitives::Registry;
use crate::scope::Scope;
use crate::value::Value;

const TAG_SYMBOL: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_LIST: u8 = 3;
const TAG_MAP: u8 = 4;
const TAG_WORD: u8 = 5;
const TAG_MARKER: u8 = 6;

const MARK_POP_SCOPE: u8 = 0;
const MARK_PAUSE: u8 = 1;
const MARK_BREAK: u8 = 2;
const MARK_RESTORE: u8 = 3;
const MARK_LITERAL: u8 = 4;
const MARK_RESTORE_ROOTED: u8 = 5;

const KEY_STACK: &str = "stack";
const KEY_CONTINUATION: &str = "continuation";
const KEY_DICTIONARY: &str = "dictionary";

/// Deepest nesting `encode` writes and `decode` accepts.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image references unknown primitive '{name}'")]
    UnknownPrimitive { name: String },
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn invalid(reason: impl Into<String>) -> ImageError {
    ImageError::InvalidImage { reason: reason.into() }
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Fails with `InvalidImage` when `value` nests deeper than `decode` accepts.
pub fn encode(value: &Value) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    write_value(&mut buf, value, 0)?;
    Ok(buf)
}

fn too_deep() -> ImageError {
    invalid(format!("nesting deeper than {MAX_DEPTH}"))
}

fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u32).to_le_bytes());
}

fn write_text(buf: &mut Vec<u8>, text: &str) {
    write_len(buf, text.len());
    buf.extend_from_slice(text.as_bytes());
}

fn write_value(buf: &mut Vec<u8>, value: &Value, depth: usize) -> Result<(), ImageError> {
    if depth > MAX_DEPTH {
        return Err(too_deep());
    }
    match value {
        Value::Symbol(name) => {
            buf.push(TAG_SYMBOL);
            write_text(buf, name);
        }
        Value::String(text) => {
            buf.push(TAG_STRING);
            write_text(buf, text);
        }
        Value::Number(n) => {
            buf.push(TAG_NUMBER);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            write_len(buf, items.len());
            for item in items.iter() {
                write_value(buf, item, depth + 1)?;
            }
        }
        Value::Map(entries) => {
            buf.push(TAG_MAP);
            write_len(buf, entries.len());
            for (key, item) in entries.iter() {
                write_text(buf, key);
                write_value(buf, item, depth + 1)?;
            }
        }
        Value::Word(word) => {
            buf.push(TAG_WORD);
            write_text(buf, word.name());
        }
    }
    Ok(())
}

// Continuation items sit one level below the root map.
fn write_item(buf: &mut Vec<u8>, item: &Item, root: &Scope) -> Result<(), ImageError> {
    let marker = match item {
        Item::Value(value) => return write_value(buf, value, 1),
        Item::Marker(marker) => marker,
    };
    buf.push(TAG_MARKER);
    match marker {
        Marker::PopScope => buf.push(MARK_POP_SCOPE),
        Marker::Pause => buf.push(MARK_PAUSE),
        Marker::Break => buf.push(MARK_BREAK),
        Marker::Restore(scope) if scope.shares_root(root) => {
            buf.push(MARK_RESTORE_ROOTED);
            let above = scope.frames().into_iter().skip(1).map(Value::map).collect();
            write_value(buf, &Value::list(above), 1)?;
        }
        Marker::Restore(scope) => {
            buf.push(MARK_RESTORE);
            write_value(buf, &scope_to_value(scope), 1)?;
        }
        Marker::Literal(value) => {
            buf.push(MARK_LITERAL);
            write_value(buf, value, 1)?;
        }
    }
    Ok(())
}

/// The dictionary register as a value: a map, or a list of maps when nested.
pub fn scope_to_value(scope: &Scope) -> Value {
    let mut frames: Vec<Value> = scope.frames().into_iter().map(Value::map).collect();
    if frames.len() == 1 {
        frames.remove(0)
    } else {
        Value::list(frames)
    }
}

fn frame_of(value: &Value) -> Result<BTreeMap<String, Value>, ImageError> {
    match value {
        Value::Map(entries) => Ok(entries.as_ref().clone()),
        other => Err(invalid(format!("dictionary frame is a {}, not a map", other.type_name()))),
    }
}

fn scope_from_value(value: Value) -> Result<Scope, ImageError> {
    match &value {
        Value::Map(_) => Ok(Scope::from_frames([frame_of(&value)?])),
        Value::List(frames) if !frames.is_empty() => {
            let frames = frames.iter().map(frame_of).collect::<Result<Vec<_>, _>>()?;
            Ok(Scope::from_frames(frames))
        }
        other => Err(invalid(format!("dictionary is a {}, not a map", other.type_name()))),
    }
}

/// Serializes all three registers. Keys are written in sorted order.
pub fn save(machine: &Machine) -> Result<Vec<u8>, ImageError> {
    let root = machine.scope();
    let mut buf = vec![TAG_MAP];
    write_len(&mut buf, 3);

    write_text(&mut buf, KEY_CONTINUATION);
    buf.push(TAG_LIST);
    write_len(&mut buf, machine.continuation().len());
    for item in machine.continuation().iter() {
        write_item(&mut buf, item, root)?;
    }

    write_text(&mut buf, KEY_DICTIONARY);
    write_value(&mut buf, &scope_to_value(root), 1)?;

    write_text(&mut buf, KEY_STACK);
    buf.push(TAG_LIST);
    write_len(&mut buf, machine.stack().len());
    for value in machine.stack().iter() {
        write_value(&mut buf, value, 1)?;
    }
    Ok(buf)
}

/// Nothing is written unless the whole machine encodes.
pub fn save_file(machine: &Machine, path: &Path) -> Result<(), ImageError> {
    std::fs::write(path, save(machine)?)?;
    Ok(())
}

// ── Decoding ─────────────────────────────────────────────────────────

/// A decoded continuation item. A rooted restore waits for the dictionary,
/// whose root frame it is rebuilt on.
enum Pending {
    Ready(Item),
    Rooted(Vec<BTreeMap<String, Value>>),
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    registry: &'a Registry,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], registry: &'a Registry) -> Self {
        Reader { data, pos: 0, registry }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| invalid(format!("truncated at byte {}", self.pos)))?;
        let data = self.data;
        self.pos = end;
        Ok(&data[end - n..end])
    }

    fn byte(&mut self) -> Result<u8, ImageError> {
        Ok(self.bytes(1)?[0])
    }

    fn len(&mut self) -> Result<usize, ImageError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(4)?);
        Ok(u32::from_le_bytes(raw) as usize)
    }

    fn number(&mut self) -> Result<f64, ImageError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.bytes(8)?);
        Ok(f64::from_le_bytes(raw))
    }

    fn text(&mut self) -> Result<&'a str, ImageError> {
        let len = self.len()?;
        let start = self.pos;
        std::str::from_utf8(self.bytes(len)?)
            .map_err(|_| invalid(format!("string at byte {start} is not UTF-8")))
    }

    /// Capacity hint that a hostile count cannot blow up: every element
    /// needs at least one byte.
    fn capacity(&self, count: usize) -> usize {
        count.min(self.data.len() - self.pos)
    }

    fn finish(&self) -> Result<(), ImageError> {
        if self.pos != self.data.len() {
            return Err(invalid(format!("{} trailing byte(s)", self.data.len() - self.pos)));
        }
        Ok(())
    }

    fn value(&mut self, depth: usize) -> Result<Value, ImageError> {
        if depth > MAX_DEPTH {
            return Err(invalid(format!("nesting deeper than {MAX_DEPTH}")));
        }
        let tag = self.byte()?;
        self.tagged_value(tag, depth)
    }

    fn tagged_value(&mut self, tag: u8, depth: usize) -> Result<Value, ImageError> {
        match tag {
            TAG_SYMBOL => Ok(Value::symbol(self.text()?)),
            TAG_STRING => Ok(Value::string(self.text()?)),
            TAG_NUMBER => Ok(Value::Number(self.number()?)),
            TAG_LIST => {
                let count = self.len()?;
                let mut items = Vec::with_capacity(self.capacity(count));
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                Ok(Value::list(items))
            }
            TAG_MAP => {
                let count = self.len()?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let key = self.text()?.to_string();
                    let item = self.value(depth + 1)?;
                    entries.insert(key, item);
                }
                Ok(Value::map(entries))
            }
            TAG_WORD => {
                let name = self.text()?;
                self.registry
                    .get(name)
                    .map(|word| Value::Word(word.clone()))
                    .ok_or_else(|| ImageError::UnknownPrimitive { name: name.to_string() })
            }
            TAG_MARKER => Err(invalid("control marker outside a continuation")),
            other => Err(invalid(format!("unknown tag {other} at byte {}", self.pos - 1))),
        }
    }

    fn item(&mut self) -> Result<Pending, ImageError> {
        let tag = self.byte()?;
        if tag != TAG_MARKER {
            return Ok(Pending::Ready(Item::Value(self.tagged_value(tag, 1)?)));
        }
        let marker = match self.byte()? {
            MARK_POP_SCOPE => Marker::PopScope,
            MARK_PAUSE => Marker::Pause,
            MARK_BREAK => Marker::Break,
            MARK_RESTORE => Marker::Restore(scope_from_value(self.value(1)?)?),
            MARK_RESTORE_ROOTED => {
                let frames = match self.value(1)? {
                    Value::List(frames) => {
                        frames.iter().map(frame_of).collect::<Result<Vec<_>, _>>()?
                    }
                    other => {
                        return Err(invalid(format!(
                            "restore frames are a {}, not a list",
                            other.type_name()
                        )));
                    }
                };
                return Ok(Pending::Rooted(frames));
            }
            MARK_LITERAL => Marker::Literal(self.value(1)?),
            other => return Err(invalid(format!("unknown marker kind {other}"))),
        };
        Ok(Pending::Ready(Item::Marker(marker)))
    }

    fn list_header(&mut self, key: &str) -> Result<usize, ImageError> {
        match self.byte()? {
            TAG_LIST => self.len(),
            _ => Err(invalid(format!("'{key}' is not a list"))),
        }
    }
}

/// Decodes one value; the whole buffer must be consumed.
pub fn decode(data: &[u8], registry: &Registry) -> Result<Value, ImageError> {
    let mut reader = Reader::new(data, registry);
    let value = reader.value(0)?;
    reader.finish()?;
    Ok(value)
}

/// Rebuilds a machine. Nothing is installed unless the whole image is valid.
pub fn load(data: &[u8], registry: &Registry) -> Result<Machine, ImageError> {
    let mut reader = Reader::new(data, registry);
    if reader.byte()? != TAG_MAP {
        return Err(invalid("image root is not a map"));
    }
    let count = reader.len()?;
    let mut stack = None;
    let mut continuation = None;
    let mut scope = None;
    for _ in 0..count {
        let key = reader.text()?;
        match key {
            KEY_STACK if stack.is_none() => {
                let count = reader.list_header(key)?;
                let mut values = Vec::with_capacity(reader.capacity(count));
                for _ in 0..count {
                    values.push(reader.value(1)?);
                }
                stack = Some(values.into_iter().collect::<PList<Value>>());
            }
            KEY_CONTINUATION if continuation.is_none() => {
                let count = reader.list_header(key)?;
                let mut items = Vec::with_capacity(reader.capacity(count));
                for _ in 0..count {
                    items.push(reader.item()?);
                }
                continuation = Some(items);
            }
            KEY_DICTIONARY if scope.is_none() => {
                scope = Some(scope_from_value(reader.value(1)?)?);
            }
            KEY_STACK | KEY_CONTINUATION | KEY_DICTIONARY => {
                return Err(invalid(format!("duplicate key '{key}'")));
            }
            other => return Err(invalid(format!("unexpected key '{other}'"))),
        }
    }
    reader.finish()?;
    match (stack, continuation, scope) {
        (Some(stack), Some(pending), Some(scope)) => {
            let root = scope.outermost();
            let continuation = pending
                .into_iter()
                .map(|item| match item {
                    Pending::Ready(item) => item,
                    Pending::Rooted(frames) => Item::Marker(Marker::Restore(root.extend(frames))),
                })
                .collect::<PList<Item>>();
            Ok(Machine::from_parts(stack, continuation, scope))
        }
        _ => Err(invalid("image must contain stack, continuation and dictionary")),
    }
}

pub fn load_file(path: &Path, registry: &Registry) -> Result<Machine, ImageError> {
    let data = std::fs::read(path)?;
    load(&data, registry)
}
