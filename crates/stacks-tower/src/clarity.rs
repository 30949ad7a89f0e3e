//! Raw contract values returned by read-only calls.
//!
//! [RawValue] is a tagged variant over the Clarity type vocabulary. It can be built from the
//! node's consensus serialization ([RawValue::from_hex]) or from the JSON shapes produced by
//! client-side `cvToJSON` encoders ([RawValue::from_json]). Typed extraction lives in
//! [crate::decode].

use crate::c32::c32_address;
use crate::error::ReadError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Clarity type ids in the consensus serialization.
const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_PRINCIPAL_STANDARD: u8 = 0x05;
const TYPE_PRINCIPAL_CONTRACT: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Clarity's own nesting limit.
const MAX_DEPTH: usize = 32;

/// A contract value as returned by a read-only call.
///
/// Integer and principal payloads are optional because some JSON encodings omit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Int(Option<String>),
    UInt(Option<String>),
    Bool(bool),
    Buffer(Vec<u8>),
    /// Principal address (`SP...` or `SP....contract-name`).
    Principal(Option<String>),
    ResponseOk(Option<Box<RawValue>>),
    ResponseErr(Option<Box<RawValue>>),
    Optional(Option<Box<RawValue>>),
    List(Vec<RawValue>),
    Tuple(BTreeMap<String, RawValue>),
    StringAscii(String),
    StringUtf8(String),
    /// Bare string: an encoding that flattened its wrapper.
    Text(String),
    /// Unrecognized tag.
    Unknown(String),
}

impl RawValue {
    /// Short tag name, for logs.
    pub fn tag(&self) -> &str {
        match self {
            RawValue::Int(_) => "int",
            RawValue::UInt(_) => "uint",
            RawValue::Bool(_) => "bool",
            RawValue::Buffer(_) => "buffer",
            RawValue::Principal(_) => "principal",
            RawValue::ResponseOk(_) => "ok",
            RawValue::ResponseErr(_) => "err",
            RawValue::Optional(_) => "optional",
            RawValue::List(_) => "list",
            RawValue::Tuple(_) => "tuple",
            RawValue::StringAscii(_) => "string-ascii",
            RawValue::StringUtf8(_) => "string-utf8",
            RawValue::Text(_) => "text",
            RawValue::Unknown(tag) => tag,
        }
    }

    /// Decode a `0x`-prefixed (or bare) hex consensus serialization.
    pub fn from_hex(s: &str) -> Result<RawValue, ReadError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| ReadError::Malformed(format!("hex: {}", e)))?;
        RawValue::from_bytes(&bytes)
    }

    /// Decode a consensus-serialized value; trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<RawValue, ReadError> {
        let mut reader = ByteReader { data: bytes, pos: 0 };
        let value = reader.value(0)?;
        if reader.pos != bytes.len() {
            return Err(ReadError::Malformed(format!(
                "{} trailing bytes after value",
                bytes.len() - reader.pos
            )));
        }
        Ok(value)
    }

    /// Read a cvToJSON-style value. Total: unknown shapes become [RawValue::Unknown].
    pub fn from_json(v: &Value) -> RawValue {
        let obj = match v {
            Value::String(s) => return RawValue::Text(s.clone()),
            Value::Object(obj) => obj,
            Value::Null => return RawValue::Unknown("null".into()),
            Value::Bool(_) => return RawValue::Unknown("json-bool".into()),
            Value::Number(_) => return RawValue::Unknown("json-number".into()),
            Value::Array(_) => return RawValue::Unknown("json-array".into()),
        };
        let tag = obj.get("type").and_then(Value::as_str).unwrap_or("");
        let value = obj.get("value").filter(|v| !v.is_null());
        let boxed = |v: Option<&Value>| v.map(|v| Box::new(RawValue::from_json(v)));

        match tag {
            // {type: "response", value: {type: "ok" | "err", value}}
            "response" => match value.map(RawValue::from_json) {
                Some(inner @ (RawValue::ResponseOk(_) | RawValue::ResponseErr(_))) => inner,
                _ => RawValue::Unknown("response".into()),
            },
            "ok" => RawValue::ResponseOk(boxed(value)),
            "err" => RawValue::ResponseErr(boxed(value)),
            "optional" => RawValue::Optional(boxed(value)),
            "uint" => RawValue::UInt(value.and_then(json_integer_text)),
            "int" => RawValue::Int(value.and_then(json_integer_text)),
            "bool" => match value.and_then(Value::as_bool) {
                Some(b) => RawValue::Bool(b),
                None => RawValue::Unknown("bool".into()),
            },
            "principal" => RawValue::Principal(
                value
                    .or_else(|| obj.get("address"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            t if t.starts_with("(response") => {
                match obj.get("success").and_then(Value::as_bool) {
                    Some(true) => RawValue::ResponseOk(boxed(value)),
                    Some(false) => RawValue::ResponseErr(boxed(value)),
                    None => RawValue::Unknown(t.to_string()),
                }
            }
            t if t.starts_with("(optional") => RawValue::Optional(boxed(value)),
            t if t == "buffer" || t.starts_with("(buff") => {
                match value.and_then(Value::as_str).map(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s))) {
                    Some(Ok(bytes)) => RawValue::Buffer(bytes),
                    _ => RawValue::Unknown(t.to_string()),
                }
            }
            t if t.starts_with("(string-ascii") || t == "string-ascii" => match value.and_then(Value::as_str) {
                Some(s) => RawValue::StringAscii(s.to_string()),
                None => RawValue::Unknown(t.to_string()),
            },
            t if t.starts_with("(string-utf8") || t == "string-utf8" => match value.and_then(Value::as_str) {
                Some(s) => RawValue::StringUtf8(s.to_string()),
                None => RawValue::Unknown(t.to_string()),
            },
            t if t.starts_with("(list") || t == "list" => match value.and_then(Value::as_array) {
                Some(items) => RawValue::List(items.iter().map(RawValue::from_json).collect()),
                None => RawValue::Unknown(t.to_string()),
            },
            t if t.starts_with("(tuple") || t == "tuple" => match value.and_then(Value::as_object) {
                Some(fields) => RawValue::Tuple(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
                        .collect(),
                ),
                None => RawValue::Unknown(t.to_string()),
            },
            t => RawValue::Unknown(t.to_string()),
        }
    }
}

fn json_integer_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                ReadError::Malformed(format!("need {} bytes at offset {}", n, self.pos))
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn word128(&mut self) -> Result<[u8; 16], ReadError> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.take(16)?);
        Ok(out)
    }

    fn len_prefixed(&mut self) -> Result<&'a [u8], ReadError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn name(&mut self) -> Result<String, ReadError> {
        let len = usize::from(self.u8()?);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ReadError::Malformed(format!("name: {}", e)))
    }

    fn standard_principal(&mut self) -> Result<String, ReadError> {
        let version = self.u8()?;
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(self.take(20)?);
        c32_address(version, &hash160)
            .ok_or_else(|| ReadError::Malformed(format!("principal version {}", version)))
    }

    fn value(&mut self, depth: usize) -> Result<RawValue, ReadError> {
        if depth > MAX_DEPTH {
            return Err(ReadError::Malformed("value nested too deeply".into()));
        }
        let type_id = self.u8()?;
        let v = match type_id {
            TYPE_INT => RawValue::Int(Some(i128::from_be_bytes(self.word128()?).to_string())),
            TYPE_UINT => RawValue::UInt(Some(u128::from_be_bytes(self.word128()?).to_string())),
            TYPE_BUFFER => RawValue::Buffer(self.len_prefixed()?.to_vec()),
            TYPE_TRUE => RawValue::Bool(true),
            TYPE_FALSE => RawValue::Bool(false),
            TYPE_PRINCIPAL_STANDARD => RawValue::Principal(Some(self.standard_principal()?)),
            TYPE_PRINCIPAL_CONTRACT => {
                let issuer = self.standard_principal()?;
                let name = self.name()?;
                RawValue::Principal(Some(format!("{}.{}", issuer, name)))
            }
            TYPE_RESPONSE_OK => RawValue::ResponseOk(Some(Box::new(self.value(depth + 1)?))),
            TYPE_RESPONSE_ERR => RawValue::ResponseErr(Some(Box::new(self.value(depth + 1)?))),
            TYPE_OPTIONAL_NONE => RawValue::Optional(None),
            TYPE_OPTIONAL_SOME => RawValue::Optional(Some(Box::new(self.value(depth + 1)?))),
            TYPE_LIST => {
                let len = self.u32()?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                RawValue::List(items)
            }
            TYPE_TUPLE => {
                let len = self.u32()?;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let key = self.name()?;
                    fields.insert(key, self.value(depth + 1)?);
                }
                RawValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let bytes = self.len_prefixed()?;
                if !bytes.is_ascii() {
                    return Err(ReadError::Malformed("string-ascii with non-ascii bytes".into()));
                }
                RawValue::StringAscii(String::from_utf8_lossy(bytes).into_owned())
            }
            TYPE_STRING_UTF8 => {
                let bytes = self.len_prefixed()?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| ReadError::Malformed(format!("string-utf8: {}", e)))?;
                RawValue::StringUtf8(s.to_string())
            }
            other => return Err(ReadError::Malformed(format!("unknown type id 0x{:02x}", other))),
        };
        Ok(v)
    }
}
