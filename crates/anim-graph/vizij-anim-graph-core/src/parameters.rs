//! Named control parameters written by the host and read by graph nodes.
//!
//! Parameters are declared by the graph definition. Each declaration reserves a
//! typed slot; `ControlParameter` nodes resolve their name to a
//! [`ParameterHandle`] once while wiring and read the live slot every tick.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::target::Target;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Bool,
    Float,
    Vector,
    Id,
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ParameterValue {
    Bool(bool),
    Float(f32),
    Vector([f32; 4]),
    Id(String),
    Target(Target),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Bool(_) => ParameterKind::Bool,
            ParameterValue::Float(_) => ParameterKind::Float,
            ParameterValue::Vector(_) => ParameterKind::Vector,
            ParameterValue::Id(_) => ParameterKind::Id,
            ParameterValue::Target(_) => ParameterKind::Target,
        }
    }
}

/// A parameter declared by a graph definition, with its initial value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    pub value: ParameterValue,
}

/// Pre-resolved slot of a control parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterHandle {
    pub kind: ParameterKind,
    slot: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ControlParameters {
    index: HashMap<String, ParameterHandle>,
    bools: Vec<bool>,
    floats: Vec<f32>,
    vectors: Vec<[f32; 4]>,
    ids: Vec<String>,
    targets: Vec<Target>,
}

impl ControlParameters {
    pub fn from_declarations(decls: &[ParameterDeclaration]) -> Result<Self, GraphError> {
        let mut params = ControlParameters::default();
        for decl in decls {
            if params.index.contains_key(&decl.name) {
                return Err(GraphError::DuplicateParameter(decl.name.clone()));
            }
            let slot = match &decl.value {
                ParameterValue::Bool(v) => push_slot(&mut params.bools, *v),
                ParameterValue::Float(v) => push_slot(&mut params.floats, *v),
                ParameterValue::Vector(v) => push_slot(&mut params.vectors, *v),
                ParameterValue::Id(v) => push_slot(&mut params.ids, v.clone()),
                ParameterValue::Target(v) => push_slot(&mut params.targets, v.clone()),
            };
            params.index.insert(
                decl.name.clone(),
                ParameterHandle {
                    kind: decl.value.kind(),
                    slot,
                },
            );
        }
        Ok(params)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn handle(&self, name: &str) -> Option<ParameterHandle> {
        self.index.get(name).copied()
    }

    /// Resolve `name` and check that it holds a value of `kind`.
    pub fn resolve(&self, name: &str, kind: ParameterKind) -> Result<ParameterHandle, GraphError> {
        let handle = self
            .handle(name)
            .ok_or_else(|| GraphError::UnknownParameter(name.to_string()))?;
        if handle.kind != kind {
            return Err(GraphError::ParameterKindMismatch {
                name: name.to_string(),
                expected: kind,
                found: handle.kind,
            });
        }
        Ok(handle)
    }

    pub fn bool(&self, handle: ParameterHandle) -> bool {
        self.bools.get(handle.slot).copied().unwrap_or_default()
    }

    pub fn float(&self, handle: ParameterHandle) -> f32 {
        self.floats.get(handle.slot).copied().unwrap_or_default()
    }

    pub fn vector(&self, handle: ParameterHandle) -> [f32; 4] {
        self.vectors.get(handle.slot).copied().unwrap_or_default()
    }

    pub fn id(&self, handle: ParameterHandle) -> &str {
        self.ids.get(handle.slot).map(String::as_str).unwrap_or("")
    }

    pub fn target(&self, handle: ParameterHandle) -> Target {
        self.targets.get(handle.slot).cloned().unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<ParameterValue> {
        let handle = self.handle(name)?;
        Some(match handle.kind {
            ParameterKind::Bool => ParameterValue::Bool(self.bool(handle)),
            ParameterKind::Float => ParameterValue::Float(self.float(handle)),
            ParameterKind::Vector => ParameterValue::Vector(self.vector(handle)),
            ParameterKind::Id => ParameterValue::Id(self.id(handle).to_string()),
            ParameterKind::Target => ParameterValue::Target(self.target(handle)),
        })
    }

    /// Write a parameter by name. Unknown names and mismatched kinds leave the table untouched.
    pub fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), GraphError> {
        let handle = self.resolve(name, value.kind())?;
        self.write(handle, value);
        Ok(())
    }

    /// Write through a handle obtained from [`ControlParameters::handle`].
    pub fn set_by_handle(
        &mut self,
        handle: ParameterHandle,
        value: ParameterValue,
    ) -> Result<(), GraphError> {
        if handle.kind != value.kind() {
            let name = self
                .index
                .iter()
                .find(|(_, h)| **h == handle)
                .map(|(name, _)| name.clone())
                .unwrap_or_default();
            return Err(GraphError::ParameterKindMismatch {
                name,
                expected: handle.kind,
                found: value.kind(),
            });
        }
        self.write(handle, value);
        Ok(())
    }

    fn write(&mut self, handle: ParameterHandle, value: ParameterValue) {
        match value {
            ParameterValue::Bool(v) => store(&mut self.bools, handle.slot, v),
            ParameterValue::Float(v) => store(&mut self.floats, handle.slot, v),
            ParameterValue::Vector(v) => store(&mut self.vectors, handle.slot, v),
            ParameterValue::Id(v) => store(&mut self.ids, handle.slot, v),
            ParameterValue::Target(v) => store(&mut self.targets, handle.slot, v),
        }
    }
}

fn push_slot<T>(slots: &mut Vec<T>, value: T) -> usize {
    slots.push(value);
    slots.len() - 1
}

fn store<T>(slots: &mut [T], slot: usize, value: T) {
    if let Some(entry) = slots.get_mut(slot) {
        *entry = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, value: ParameterValue) -> ParameterDeclaration {
        ParameterDeclaration {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn declarations_seed_typed_slots() {
        let params = ControlParameters::from_declarations(&[
            decl("speed", ParameterValue::Float(1.5)),
            decl("grounded", ParameterValue::Bool(true)),
            decl("stance", ParameterValue::Id("idle".into())),
        ])
        .expect("valid declarations");

        let speed = params.resolve("speed", ParameterKind::Float).unwrap();
        assert_eq!(params.float(speed), 1.5);
        let stance = params.resolve("stance", ParameterKind::Id).unwrap();
        assert_eq!(params.id(stance), "idle");
        assert_eq!(params.get("grounded"), Some(ParameterValue::Bool(true)));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let err = ControlParameters::from_declarations(&[
            decl("a", ParameterValue::Float(0.0)),
            decl("a", ParameterValue::Bool(false)),
        ])
        .unwrap_err();
        assert_eq!(err, GraphError::DuplicateParameter("a".into()));
    }

    #[test]
    fn set_rejects_unknown_and_mistyped_writes() {
        let mut params =
            ControlParameters::from_declarations(&[decl("speed", ParameterValue::Float(0.0))])
                .unwrap();

        assert_eq!(
            params.set("missing", ParameterValue::Float(1.0)),
            Err(GraphError::UnknownParameter("missing".into()))
        );
        assert!(matches!(
            params.set("speed", ParameterValue::Bool(true)),
            Err(GraphError::ParameterKindMismatch { .. })
        ));
        assert_eq!(params.get("speed"), Some(ParameterValue::Float(0.0)));

        params.set("speed", ParameterValue::Float(4.0)).unwrap();
        assert_eq!(params.get("speed"), Some(ParameterValue::Float(4.0)));
    }

    #[test]
    fn values_use_tagged_json() {
        let json = serde_json::to_value(ParameterValue::Float(2.0)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "float", "data": 2.0 }));
    }
}
