//! The Crucible: a hierarchical, access-controlled variable container.
//!
//! Crucibles form parent chains. A child scope references its parent; the
//! parent may be shared by siblings, so a `Crucible` is a cheap-clone handle
//! over shared scope state. Access flags are the sole mutation discipline
//! between scopes.

use std::cell::RefCell;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

use crate::error::CrucibleError;
use crate::serialize::{ClassRegistry, deserialize_value, serialize_value};
use crate::value::{Value, ValueMap};

/// Access flags controlling how a scope reads and writes through its chain.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Access(u8);

impl Access {
    pub const NONE: Access = Access(0);
    /// Reads try the parent first, then self.
    pub const READ_FROM_BASE: Access = Access(0x01);
    /// Writes try the parent first, then self.
    pub const WRITE_TO_BASE: Access = Access(0x02);
    /// Writes into this scope are rejected.
    pub const READ_ONLY: Access = Access(0x04);
    /// Writes may only replace existing keys with same-typed values.
    pub const PROTECTED: Access = Access(0x08);
    /// Writes may not shadow variables defined in an ancestor scope.
    pub const NO_SHADOWING: Access = Access(0x10);

    pub fn contains(self, other: Access) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Access {
        Access(bits & 0x1f)
    }
}

impl BitOr for Access {
    type Output = Access;

    fn bitor(self, rhs: Access) -> Access {
        Access(self.0 | rhs.0)
    }
}

impl BitOrAssign for Access {
    fn bitor_assign(&mut self, rhs: Access) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(Access::READ_FROM_BASE) {
            flags.push("RFB");
        }
        if self.contains(Access::WRITE_TO_BASE) {
            flags.push("WTB");
        }
        if self.contains(Access::READ_ONLY) {
            flags.push("RO");
        }
        if self.contains(Access::PROTECTED) {
            flags.push("PT");
        }
        if self.contains(Access::NO_SHADOWING) {
            flags.push("NS");
        }
        write!(f, "{}", flags.join(" "))
    }
}

struct Scope {
    variables: ValueMap,
    parent: Option<Crucible>,
    access: Access,
    constants: Vec<String>,
}

/// Outcome of a local write attempt that could not complete in this scope
/// but is allowed to escalate to the parent.
enum LocalWrite {
    Done,
    /// Missing intermediate under a read-only or protected scope: the write
    /// is pushed to the outer scope, or surfaces the carried error at the
    /// top of the chain.
    Deferred(CrucibleError),
}

/// Hierarchical named-value store with access modes and dotted paths.
#[derive(Clone)]
pub struct Crucible {
    inner: Rc<RefCell<Scope>>,
}

impl Default for Crucible {
    fn default() -> Self {
        Crucible::new(Access::NONE)
    }
}

impl Crucible {
    pub fn new(access: Access) -> Crucible {
        Crucible {
            inner: Rc::new(RefCell::new(Scope {
                variables: ValueMap::new(),
                parent: None,
                access,
                constants: Vec::new(),
            })),
        }
    }

    pub fn with_parent(access: Access, parent: Crucible) -> Crucible {
        let crucible = Crucible::new(access);
        crucible.inner.borrow_mut().parent = Some(parent);
        crucible
    }

    pub fn access(&self) -> Access {
        self.inner.borrow().access
    }

    pub fn parent(&self) -> Option<Crucible> {
        self.inner.borrow().parent.clone()
    }

    /// Rebind the parent scope. The host uses this to attach a local scope
    /// to the current user scope before resuming a script.
    pub fn set_parent(&self, parent: Option<Crucible>) {
        self.inner.borrow_mut().parent = parent;
    }

    /// Two handles referring to the same scope state.
    pub fn ptr_eq(&self, other: &Crucible) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Merge a map of variables into this scope, chainable.
    pub fn update(self, source: ValueMap) -> Crucible {
        {
            let mut scope = self.inner.borrow_mut();
            for (key, value) in source {
                scope.variables.insert(key, value);
            }
        }
        self
    }

    /// Merge variables and freeze the given top-level keys, chainable.
    pub fn update_with(self, source: ValueMap, constants: Vec<String>) -> Crucible {
        {
            let mut scope = self.inner.borrow_mut();
            for (key, value) in source {
                scope.variables.insert(key, value);
            }
            scope.constants.extend(constants);
        }
        self
    }

    /// Freeze a top-level key against further writes in this scope.
    pub fn mark_constant(&self, key: impl Into<String>) {
        let key = key.into();
        let mut scope = self.inner.borrow_mut();
        if !scope.constants.contains(&key) {
            scope.constants.push(key);
        }
    }

    pub fn is_constant(&self, key: &str) -> bool {
        self.inner.borrow().constants.iter().any(|c| c == key)
    }

    pub fn constant_names(&self) -> Vec<String> {
        self.inner.borrow().constants.clone()
    }

    /// Snapshot of this scope's own variables (not the chain).
    pub fn variables(&self) -> ValueMap {
        self.inner.borrow().variables.clone()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Read a dotted path, honoring the `READ_FROM_BASE` policy.
    pub fn get(&self, path: &str) -> Result<Value, CrucibleError> {
        if self.access().contains(Access::READ_FROM_BASE) {
            match self.read_base(path) {
                Ok(value) => Ok(value),
                Err(_) => self.read_local(path),
            }
        } else {
            match self.read_local(path) {
                Ok(value) => Ok(value),
                Err(local) => self.read_base(path).map_err(|_| local),
            }
        }
    }

    /// Write a dotted path, selecting a target scope per the access flags.
    pub fn set(&self, path: &str, value: Value) -> Result<(), CrucibleError> {
        let first = match path.split('.').next() {
            Some(first) if !first.is_empty() => first,
            _ => return Err(CrucibleError::ValueNotFound(path.to_owned())),
        };

        if self.access().contains(Access::WRITE_TO_BASE)
            && let Some(parent) = self.parent()
            && parent.set(path, value.clone()).is_ok()
        {
            return Ok(());
        }

        if self.access().contains(Access::NO_SHADOWING) && self.shadows(first) {
            return match self.parent() {
                Some(parent) => parent
                    .set(path, value)
                    .map_err(|_| CrucibleError::Shadowing(first.to_owned())),
                None => Err(CrucibleError::Shadowing(first.to_owned())),
            };
        }

        match self.write_local(path, value.clone())? {
            LocalWrite::Done => Ok(()),
            LocalWrite::Deferred(reason) => match self.parent() {
                Some(parent) => parent.set(path, value),
                None => Err(reason),
            },
        }
    }

    /// Fetch a callable at `path` and invoke it with this scope as the
    /// environment argument.
    pub fn call(&self, path: &str, args: &[Value]) -> Result<Value, CrucibleError> {
        match self.get(path)? {
            Value::Callable(call) => call.invoke(self, args),
            _ => Err(CrucibleError::NotCallable(path.to_owned())),
        }
    }

    /// Serialize this scope (not its chain) into a tagged JSON tree.
    pub fn serialize(&self) -> Result<serde_json::Value, CrucibleError> {
        let scope = self.inner.borrow();
        let mut variables = serde_json::Map::new();
        for (key, value) in &scope.variables {
            variables.insert(key.clone(), serialize_value(value)?);
        }
        Ok(serde_json::json!({
            "access": scope.access.bits(),
            "constants": scope.constants,
            "variables": variables,
        }))
    }

    /// Rehydrate a scope from its serialized form. Non-primitive tags are
    /// resolved through the class registry.
    pub fn deserialize(
        data: &serde_json::Value,
        classes: &ClassRegistry,
    ) -> Result<Crucible, CrucibleError> {
        let access = data
            .get("access")
            .and_then(|v| v.as_u64())
            .map(|bits| Access::from_bits(bits as u8))
            .unwrap_or(Access::NONE);
        let crucible = Crucible::new(access);
        {
            let mut scope = crucible.inner.borrow_mut();
            if let Some(constants) = data.get("constants").and_then(|v| v.as_array()) {
                scope.constants = constants
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_owned))
                    .collect();
            }
            let variables = data
                .get("variables")
                .and_then(|v| v.as_object())
                .ok_or_else(|| {
                    CrucibleError::Deserialization("missing 'variables' object".to_owned())
                })?;
            for (key, tagged) in variables {
                scope
                    .variables
                    .insert(key.clone(), deserialize_value(tagged, classes)?);
            }
        }
        Ok(crucible)
    }

    fn read_base(&self, path: &str) -> Result<Value, CrucibleError> {
        match self.parent() {
            Some(parent) => parent.get(path),
            None => Err(CrucibleError::ValueNotFound(path.to_owned())),
        }
    }

    fn read_local(&self, path: &str) -> Result<Value, CrucibleError> {
        let scope = self.inner.borrow();
        let mut parts = path.split('.');
        let first = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CrucibleError::ValueNotFound(path.to_owned()))?;
        let mut current = scope
            .variables
            .get(first)
            .cloned()
            .ok_or_else(|| CrucibleError::ValueNotFound(path.to_owned()))?;
        let mut walked = first.to_owned();
        for part in parts {
            current = index_component(&current, part).ok_or_else(|| {
                CrucibleError::KeyNotFound {
                    key: part.to_owned(),
                    at: walked.clone(),
                }
            })?;
            walked.push('.');
            walked.push_str(part);
        }
        Ok(current)
    }

    fn shadows(&self, key: &str) -> bool {
        let mut scope = self.parent();
        while let Some(current) = scope {
            if current.inner.borrow().variables.contains_key(key) {
                return true;
            }
            scope = current.parent();
        }
        false
    }

    fn write_local(&self, path: &str, value: Value) -> Result<LocalWrite, CrucibleError> {
        let parts: Vec<&str> = path.split('.').collect();
        let mut scope = self.inner.borrow_mut();
        let access = scope.access;
        let readonly = access.contains(Access::READ_ONLY);
        let protected = access.contains(Access::PROTECTED);

        if scope.constants.iter().any(|c| c == parts[0]) {
            return Err(CrucibleError::Constant(parts[0].to_owned()));
        }

        let Some((leaf, dirs)) = parts.split_last() else {
            return Err(CrucibleError::ValueNotFound(path.to_owned()));
        };

        if dirs.is_empty() {
            if readonly {
                return Err(CrucibleError::ReadOnly(path.to_owned()));
            }
            if protected {
                match scope.variables.get(*leaf) {
                    None => return Err(CrucibleError::ProtectedScope(path.to_owned())),
                    Some(existing) if existing.type_name() != value.type_name() => {
                        return Err(CrucibleError::Protected {
                            path: path.to_owned(),
                            existing: existing.type_name(),
                            incoming: value.type_name(),
                        });
                    }
                    Some(_) => {}
                }
            }
            scope.variables.insert(leaf.to_string(), value);
            return Ok(LocalWrite::Done);
        }

        // Descend to the container holding the leaf, creating intermediate
        // maps where the access flags allow it.
        if !scope.variables.contains_key(dirs[0]) {
            if readonly || protected {
                return Ok(LocalWrite::Deferred(missing_scope_error(
                    readonly, path,
                )));
            }
            scope
                .variables
                .insert(dirs[0].to_string(), Value::Map(ValueMap::new()));
        }
        let mut walked = dirs[0].to_owned();
        let Some(mut current) = scope.variables.get_mut(dirs[0]) else {
            return Err(CrucibleError::ValueNotFound(path.to_owned()));
        };
        for part in &dirs[1..] {
            match current {
                Value::Map(map) => {
                    if !map.contains_key(*part) {
                        if readonly || protected {
                            return Ok(LocalWrite::Deferred(missing_scope_error(
                                readonly, path,
                            )));
                        }
                        map.insert(part.to_string(), Value::Map(ValueMap::new()));
                    }
                    let Some(next) = map.get_mut(*part) else {
                        return Err(CrucibleError::ValueNotFound(path.to_owned()));
                    };
                    current = next;
                }
                Value::List(items) => {
                    let index = part
                        .parse::<usize>()
                        .ok()
                        .filter(|i| *i < items.len())
                        .ok_or_else(|| CrucibleError::KeyNotFound {
                            key: part.to_string(),
                            at: walked.clone(),
                        })?;
                    current = &mut items[index];
                }
                _ => {
                    return Err(CrucibleError::KeyNotFound {
                        key: part.to_string(),
                        at: walked.clone(),
                    });
                }
            }
            walked.push('.');
            walked.push_str(part);
        }

        if readonly {
            return Err(CrucibleError::ReadOnly(path.to_owned()));
        }
        match current {
            Value::Map(map) => {
                if protected {
                    match map.get(*leaf) {
                        None => return Err(CrucibleError::ProtectedScope(path.to_owned())),
                        Some(existing) if existing.type_name() != value.type_name() => {
                            return Err(CrucibleError::Protected {
                                path: path.to_owned(),
                                existing: existing.type_name(),
                                incoming: value.type_name(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                map.insert(leaf.to_string(), value);
            }
            Value::List(items) => {
                let index = leaf
                    .parse::<usize>()
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| CrucibleError::KeyNotFound {
                        key: leaf.to_string(),
                        at: walked.clone(),
                    })?;
                if protected && items[index].type_name() != value.type_name() {
                    return Err(CrucibleError::Protected {
                        path: path.to_owned(),
                        existing: items[index].type_name(),
                        incoming: value.type_name(),
                    });
                }
                items[index] = value;
            }
            _ => {
                return Err(CrucibleError::KeyNotFound {
                    key: leaf.to_string(),
                    at: walked,
                });
            }
        }
        Ok(LocalWrite::Done)
    }
}

fn missing_scope_error(readonly: bool, path: &str) -> CrucibleError {
    if readonly {
        CrucibleError::ReadOnly(path.to_owned())
    } else {
        CrucibleError::ProtectedScope(path.to_owned())
    }
}

/// Index one path component into a value: maps by key, lists by integer,
/// foreign objects by attribute.
fn index_component(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Map(map) => map.get(key).cloned(),
        Value::List(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned(),
        Value::Foreign(obj) => obj.get(key),
        _ => None,
    }
}

impl fmt::Debug for Crucible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.inner.borrow();
        write!(f, "Crucible[{:?}](", scope.access)?;
        for (i, (key, value)) in scope.variables.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str(")")
    }
}
