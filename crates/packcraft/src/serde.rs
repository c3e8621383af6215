//! JSON-deserializable layout description.
//!
//! These types describe a descriptor tree in a form that can ship as a data
//! file next to an application:
//!
//! - a string is a format string: `"<I4"`
//! - `{"count": 3, "element": ...}` is an array
//! - `{"sequence": [...]}` is a sequence of unnamed members
//! - `[{"name": ...}, ...]` is a struct; each map holds exactly one member
//!
//! A [PackDef] converts into a [Layout] and is resolved through a [Registry].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{descriptor::DescriptorRef, errors::CompileError, pack::Layout, registry::Registry};

/// Declarative layout node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PackDef {
    /// Format string.
    Format(String),
    /// Fixed number of repetitions of one element.
    Array {
        count: usize,
        element: Box<PackDef>,
    },
    /// Unnamed members in order.
    Sequence { sequence: Vec<PackDef> },
    /// Named members in order, one `{name: def}` map per member.
    Struct(Vec<BTreeMap<String, PackDef>>),
}

impl TryFrom<PackDef> for Layout {
    type Error = CompileError;

    fn try_from(def: PackDef) -> Result<Self, Self::Error> {
        Ok(match def {
            PackDef::Format(format) => Layout::Format(format),
            PackDef::Array { count, element } => Layout::Array {
                count,
                element: Box::new(Layout::try_from(*element)?),
            },
            PackDef::Sequence { sequence } => Layout::Sequence(
                sequence
                    .into_iter()
                    .map(Layout::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            PackDef::Struct(entries) => {
                let mut members = Vec::with_capacity(entries.len());
                for (position, entry) in entries.into_iter().enumerate() {
                    let mut pairs = entry.into_iter();
                    match (pairs.next(), pairs.next()) {
                        (Some((name, def)), None) => members.push((name, Layout::try_from(def)?)),
                        _ => return Err(CompileError::InvalidStructEntry(position)),
                    }
                }
                Layout::Struct(members)
            }
        })
    }
}

impl Registry {
    /// Resolves a declarative layout.
    pub fn pack_def(&self, def: PackDef) -> Result<DescriptorRef, CompileError> {
        self.pack(&Layout::try_from(def)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::FormatConfig, reader::Reader, value::Value};

    use super::*;

    const PACKET: &str = r#"[
        {"version": "B"},
        {"flags": {"sequence": ["r", "r", "R6"]}},
        {"samples": {"count": 2, "element": ">h"}},
        {"tag": "c3"}
    ]"#;

    #[test]
    fn test_deserialize_shapes() {
        let def: PackDef = serde_json::from_str(PACKET).unwrap();
        let PackDef::Struct(entries) = &def else {
            panic!("expected a struct, got {def:?}");
        };
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["version"], PackDef::Format("B".to_string()));
        assert!(matches!(entries[1]["flags"], PackDef::Sequence { .. }));
        assert!(matches!(entries[2]["samples"], PackDef::Array { count: 2, .. }));
    }

    #[test]
    fn test_pack_and_read() {
        let registry = Registry::with_config(FormatConfig::little());
        let def: PackDef = serde_json::from_str(PACKET).unwrap();
        let descriptor = registry.pack_def(def).unwrap();
        assert_eq!(descriptor.size(), 9);

        let data = [2, 0b10_000011, 0xFF, 0xFE, 0x00, 0x10, b'a', b'b', b'c'];
        let value = Reader::new(descriptor, 0).read(&data).unwrap();
        assert_eq!(value.get("version"), Some(&Value::UInt(2)));
        assert_eq!(
            value.get("flags"),
            Some(&Value::List(vec![Value::Bool(true), Value::Bool(false), Value::UInt(3)]))
        );
        assert_eq!(
            value.get("samples"),
            Some(&Value::List(vec![Value::Int(-2), Value::Int(16)]))
        );
        assert_eq!(value.get("tag"), Some(&Value::Bytes(b"abc".to_vec())));

        let json = serde_json::to_string(&value).unwrap();
        assert!(json.starts_with(r#"{"version":2,"flags":[true,false,3]"#));
    }

    #[test]
    fn test_struct_entry_needs_one_pair() {
        let def: PackDef = serde_json::from_str(r#"[{"a": "B"}, {"b": "B", "c": "B"}]"#).unwrap();
        assert_eq!(
            Layout::try_from(def).unwrap_err(),
            CompileError::InvalidStructEntry(1)
        );

        let def: PackDef = serde_json::from_str(r#"[{}]"#).unwrap();
        assert_eq!(
            Layout::try_from(def).unwrap_err(),
            CompileError::InvalidStructEntry(0)
        );
    }

    #[test]
    fn test_compile_errors_surface() {
        let registry = Registry::new();
        let def: PackDef = serde_json::from_str(r#"{"count": 2, "element": "Q"}"#).unwrap();
        assert!(matches!(
            registry.pack_def(def),
            Err(CompileError::UnknownToken { token: 'Q', position: 0 })
        ));
    }
}
