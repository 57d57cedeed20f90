//! # Value Emitter
//!
//! Turns constant `Value`s into source expressions. Numbers carry the
//! literal suffix of their width, out-of-range and special floats use the
//! named constants of their type, and host object references are hoisted
//! into one field per object.

use super::debug::MarkerId;
use super::records::{RecordKey, Storage, VariableSpec};
use super::statements;
use super::CodeGenerator;
use crate::error::{GeneratorError, Result};
use crate::graph::{ObjectRef, TypeRef, Value};

/// Named members for common constructor argument lists
const WELL_KNOWN: &[(&str, &[f64], &str)] = &[
    ("Vector2", &[0.0, 0.0], "zero"),
    ("Vector2", &[1.0, 1.0], "one"),
    ("Vector2", &[0.0, 1.0], "up"),
    ("Vector2", &[0.0, -1.0], "down"),
    ("Vector2", &[1.0, 0.0], "right"),
    ("Vector2", &[-1.0, 0.0], "left"),
    ("Vector3", &[0.0, 0.0, 0.0], "zero"),
    ("Vector3", &[1.0, 1.0, 1.0], "one"),
    ("Vector3", &[0.0, 1.0, 0.0], "up"),
    ("Vector3", &[0.0, -1.0, 0.0], "down"),
    ("Vector3", &[1.0, 0.0, 0.0], "right"),
    ("Vector3", &[-1.0, 0.0, 0.0], "left"),
    ("Vector3", &[0.0, 0.0, 1.0], "forward"),
    ("Vector3", &[0.0, 0.0, -1.0], "back"),
    ("Vector4", &[0.0, 0.0, 0.0, 0.0], "zero"),
    ("Vector4", &[1.0, 1.0, 1.0, 1.0], "one"),
    ("Quaternion", &[0.0, 0.0, 0.0, 1.0], "identity"),
    ("Color", &[1.0, 0.0, 0.0, 1.0], "red"),
    ("Color", &[0.0, 1.0, 0.0, 1.0], "green"),
    ("Color", &[0.0, 0.0, 1.0, 1.0], "blue"),
    ("Color", &[1.0, 1.0, 1.0, 1.0], "white"),
    ("Color", &[0.0, 0.0, 0.0, 1.0], "black"),
    ("Color", &[0.0, 0.0, 0.0, 0.0], "clear"),
];

pub fn well_known_member(type_name: &str, arguments: &[f64]) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(ty, args, _)| *ty == type_name && *args == arguments)
        .map(|(_, _, member)| *member)
}

pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        "float.NaN".to_string()
    } else if value == f32::INFINITY {
        "float.PositiveInfinity".to_string()
    } else if value == f32::NEG_INFINITY {
        "float.NegativeInfinity".to_string()
    } else if value == f32::MAX {
        "float.MaxValue".to_string()
    } else if value == f32::MIN {
        "float.MinValue".to_string()
    } else {
        format!("{}f", value)
    }
}

pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "double.NaN".to_string()
    } else if value == f64::INFINITY {
        "double.PositiveInfinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "double.NegativeInfinity".to_string()
    } else if value == f64::MAX {
        "double.MaxValue".to_string()
    } else if value == f64::MIN {
        "double.MinValue".to_string()
    } else {
        let text = value.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}D", text)
        }
    }
}

macro_rules! integer_literal {
    ($value:expr, $int:ty, $keyword:literal, $suffix:literal) => {{
        let value: $int = $value;
        if value == <$int>::MAX {
            concat!($keyword, ".MaxValue").to_string()
        } else if value == <$int>::MIN && <$int>::MIN != 0 {
            concat!($keyword, ".MinValue").to_string()
        } else {
            format!(concat!("{}", $suffix), value)
        }
    }};
}

/// Narrow integers have no literal suffix and need a cast
macro_rules! narrow_literal {
    ($value:expr, $int:ty, $keyword:literal) => {{
        let value: $int = $value;
        if value == <$int>::MAX {
            concat!($keyword, ".MaxValue").to_string()
        } else if value == <$int>::MIN && <$int>::MIN != 0 {
            concat!($keyword, ".MinValue").to_string()
        } else {
            statements::cast($keyword, &value.to_string())
        }
    }};
}

pub fn escape_char(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\0' => "\\0".to_string(),
        c if c == quote => format!("\\{}", c),
        c if c.is_control() => format!("\\u{:04x}", c as u32),
        c => c.to_string(),
    }
}

pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        out.push_str(&escape_char(c, '"'));
    }
    out.push('"');
    out
}

pub fn char_literal(c: char) -> String {
    format!("'{}'", escape_char(c, '\''))
}

/// Items of an initializer list, `{ a, b }`, or nothing when empty
fn initializer_list(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!(" {{ {} }}", items.join(", "))
    }
}

impl<'a> CodeGenerator<'a> {
    /// Source expression for a constant value
    pub fn value(&mut self, value: &Value) -> Result<String> {
        let code = match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => char_literal(*c),
            Value::SByte(v) => narrow_literal!(*v, i8, "sbyte"),
            Value::Byte(v) => narrow_literal!(*v, u8, "byte"),
            Value::Short(v) => narrow_literal!(*v, i16, "short"),
            Value::UShort(v) => narrow_literal!(*v, u16, "ushort"),
            Value::Int(v) => integer_literal!(*v, i32, "int", ""),
            Value::UInt(v) => integer_literal!(*v, u32, "uint", "U"),
            Value::Long(v) => integer_literal!(*v, i64, "long", "L"),
            Value::ULong(v) => integer_literal!(*v, u64, "ulong", "UL"),
            Value::Float(v) => format_float(*v),
            Value::Double(v) => format_double(*v),
            Value::Decimal(text) => {
                if !is_decimal_literal(text) {
                    return Err(GeneratorError::UnsupportedValue(format!("decimal '{}'", text)));
                }
                format!("{}M", text)
            }
            Value::String(text) => string_literal(text),
            Value::Enum { ty, members, raw } => {
                let type_name = self.type_name(ty);
                if members.is_empty() {
                    statements::cast(&type_name, &raw.to_string())
                } else {
                    members
                        .iter()
                        .map(|m| format!("{}.{}", type_name, m))
                        .collect::<Vec<_>>()
                        .join(" | ")
                }
            }
            Value::Collection { ty, items } => {
                let type_name = self.type_name(ty);
                let items = self.values(items)?;
                format!("new {}(){}", type_name, initializer_list(&items))
            }
            Value::Array { element, items } => {
                let element_name = self.type_name(element);
                if items.is_empty() {
                    // Jagged arrays put the length before the inner rank
                    match element_name.find('[') {
                        Some(split) => format!("new {}[0]{}", &element_name[..split], &element_name[split..]),
                        None => format!("new {}[0]", element_name),
                    }
                } else {
                    let items = self.values(items)?;
                    format!("new {}[]{}", element_name, initializer_list(&items))
                }
            }
            Value::Dictionary { ty, entries } => {
                let type_name = self.type_name(ty);
                let mut items = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    items.push(format!("{{ {}, {} }}", self.value(key)?, self.value(value)?));
                }
                format!("new {}(){}", type_name, initializer_list(&items))
            }
            Value::Construct {
                ty,
                arguments,
                initializers,
            } => self.construct(ty, arguments, initializers)?,
            Value::Delegate { owner, method } => match owner {
                Some(owner) => statements::member(&self.type_name(owner), method),
                None => method.clone(),
            },
            Value::Type(ty) => format!("typeof({})", self.type_name(ty)),
            Value::Default(ty) => format!("default({})", self.type_name(ty)),
            Value::Object(object) => self.object_reference(object),
            Value::Runtime { ty, value } => {
                let inner = self.value(value)?;
                let type_name = self.type_name(ty);
                format!("{}<{}>({})", self.options.runtime_convert, type_name, inner)
            }
            Value::Expression(code) => code.clone(),
        };
        Ok(code)
    }

    fn values(&mut self, items: &[Value]) -> Result<Vec<String>> {
        items.iter().map(|item| self.value(item)).collect()
    }

    fn construct(&mut self, ty: &TypeRef, arguments: &[Value], initializers: &[(String, Value)]) -> Result<String> {
        let type_name = self.type_name(ty);
        if initializers.is_empty() {
            let numbers: Option<Vec<f64>> = arguments.iter().map(Value::as_f64).collect();
            if let Some(member) = numbers.and_then(|n| well_known_member(ty.simple_name(), &n)) {
                return Ok(statements::member(&type_name, member));
            }
        }

        let arguments = self.values(arguments)?;
        let mut code = statements::new_object(&type_name, &arguments);
        if !initializers.is_empty() {
            let mut items = Vec::with_capacity(initializers.len());
            for (member, value) in initializers {
                items.push(format!("{} = {}", member, self.value(value)?));
            }
            code.push_str(&initializer_list(&items));
        }
        Ok(code)
    }

    /// Field holding a host object, created on first reference
    fn object_reference(&mut self, object: &ObjectRef) -> String {
        let key = RecordKey::Object(object.id);
        let name = match self.class.variables.get(&key) {
            Some(record) => record.name.clone(),
            None => {
                let spec = VariableSpec::new(&object.name, object.ty.clone(), Storage::Instance)
                    .with_modifiers("public ".to_string());
                let name = self.class.variables.register(key, spec, &mut self.class.names).name.clone();
                tracing::debug!("[GEN] Hoisted object #{} into field '{}'", object.id, name);
                if !self.hoisted.iter().any(|o| o.id == object.id) {
                    self.hoisted.push(object.clone());
                }
                name
            }
        };
        self.mark(MarkerId::Reference(object.id), &name)
    }
}

/// Finite number spelled with digits, sign, `.` and exponent only
fn is_decimal_literal(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && text.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}
