//! Constant-pool rewriting for compiled class files
//!
//! Only `CONSTANT_Utf8` entries are touched. Every other byte of the class
//! file is copied as-is, so field and method tables keep their indices.

use crate::packaging::PackagingError;

const MAGIC: u32 = 0xCAFE_BABE;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Byte cursor over the class file that reports truncation as an error
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(format!("truncated at offset {}", self.pos)),
        }
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Rewrite the UTF-8 constants of a class file
///
/// `rewrite` returns `Some(new)` for a constant that changes. Returns
/// `Ok(None)` when no constant changed, so callers can keep the original bytes.
/// Constants that are not valid standard UTF-8 (modified UTF-8 escapes) are
/// left untouched.
pub fn rewrite_constant_pool<F>(
    path: &str,
    data: &[u8],
    rewrite: F,
) -> Result<Option<Vec<u8>>, PackagingError>
where
    F: Fn(&str) -> Option<String>,
{
    rewrite_pool(data, rewrite).map_err(|reason| PackagingError::MalformedClass {
        path: path.to_string(),
        reason,
    })
}

fn rewrite_pool<F>(data: &[u8], rewrite: F) -> Result<Option<Vec<u8>>, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut reader = Reader { data, pos: 0 };

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(format!("bad magic 0x{:08X}", magic));
    }
    reader.take(4)?; // minor + major version
    let count = reader.u16()?;

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..reader.pos]);
    let mut changed = false;

    // Slot 0 is unused; long and double constants occupy two slots
    let mut slot = 1u16;
    while slot < count {
        let start = reader.pos;
        let tag = reader.u8()?;
        match tag {
            TAG_UTF8 => {
                let len = reader.u16()? as usize;
                let bytes = reader.take(len)?;
                let replacement = std::str::from_utf8(bytes).ok().and_then(&rewrite);
                match replacement {
                    Some(text) => {
                        let len = u16::try_from(text.len())
                            .map_err(|_| format!("constant #{} exceeds 65535 bytes after relocation", slot))?;
                        out.push(TAG_UTF8);
                        out.extend_from_slice(&len.to_be_bytes());
                        out.extend_from_slice(text.as_bytes());
                        changed = true;
                    }
                    None => out.extend_from_slice(&data[start..reader.pos]),
                }
            }
            _ => {
                let size = match tag {
                    TAG_INTEGER | TAG_FLOAT => 4,
                    TAG_LONG | TAG_DOUBLE => 8,
                    TAG_CLASS | TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => 2,
                    TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_NAME_AND_TYPE
                    | TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => 4,
                    TAG_METHOD_HANDLE => 3,
                    other => return Err(format!("unknown constant tag {} in slot {}", other, slot)),
                };
                reader.take(size)?;
                out.extend_from_slice(&data[start..reader.pos]);
                if tag == TAG_LONG || tag == TAG_DOUBLE {
                    slot += 1;
                }
            }
        }
        slot += 1;
    }

    if !changed {
        return Ok(None);
    }
    out.extend_from_slice(&data[reader.pos..]);
    Ok(Some(out))
}

/// Assemble a minimal class file around the given constants (tests only)
#[cfg(test)]
pub(crate) fn build_class(utf8_constants: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&MAGIC.to_be_bytes());
    data.extend_from_slice(&[0, 0, 0, 52]);
    // one long (two slots) + one class ref + the utf8 constants
    let count = (utf8_constants.len() + 3 + 1) as u16;
    data.extend_from_slice(&count.to_be_bytes());
    data.push(TAG_LONG);
    data.extend_from_slice(&42u64.to_be_bytes());
    data.push(TAG_CLASS);
    data.extend_from_slice(&4u16.to_be_bytes());
    for constant in utf8_constants {
        data.push(TAG_UTF8);
        data.extend_from_slice(&(constant.len() as u16).to_be_bytes());
        data.extend_from_slice(constant.as_bytes());
    }
    // access flags, this, super, and empty tables
    data.extend_from_slice(&[0x00, 0x21, 0x00, 0x03, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]);
    data
}

/// Read back the UTF-8 constants of a class file (tests only)
#[cfg(test)]
pub(crate) fn utf8_constants(data: &[u8]) -> Vec<String> {
    use std::cell::RefCell;
    let seen = RefCell::new(Vec::new());
    rewrite_pool(data, |s| {
        seen.borrow_mut().push(s.to_string());
        None
    })
    .unwrap();
    seen.into_inner()
}
