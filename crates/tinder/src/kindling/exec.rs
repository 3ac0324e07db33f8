//! Evaluation and execution of kindling operations.
//!
//! Expressions evaluate to a [`Value`]; statements execute and return an
//! [`Outcome`] the runtime loop acts on. Jumps are not outcomes: they write
//! `__LINE__`/`__JUMPED__` into the environment and continue.

use firestarter::Operand;
use tinder_core::{Crucible, CrucibleError, Value, ValueMap};

use super::{AccessKind, BinaryOp, Kindling, Position, UNLINKED, UnaryKind};
use crate::error::RuntimeError;

/// What an executed operation asks of the runtime loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue,
    /// Suspend, optionally carrying a payload for the host stack frame.
    Yielded(Option<ValueMap>),
    /// Terminate the script.
    Halted,
    /// Suspend until the host binds the library's exports.
    Imported {
        library: String,
        alias: Option<String>,
        request: Option<Vec<String>>,
    },
    /// Register a runtime error handler.
    Interrupt { name: String, label: String },
}

impl Kindling {
    /// Evaluate this node to a value. Statement nodes evaluate to null.
    pub fn eval(&self, env: &Crucible) -> Result<Value, RuntimeError> {
        match self {
            Kindling::String(text) => Ok(Value::Str(text.clone())),
            Kindling::Number(value) | Kindling::Constant(value) => Ok(value.clone()),
            Kindling::Identifier(path) => Ok(env.get(path)?),
            Kindling::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.eval(env)?);
                }
                Ok(Value::List(out))
            }
            Kindling::Table(pairs) => {
                let mut out = ValueMap::new();
                for (key, value) in pairs {
                    out.insert(key.clone(), value.eval(env)?);
                }
                Ok(Value::Map(out))
            }
            Kindling::KeyValuePair(_, value) => value.eval(env),
            Kindling::Binary { op, left, right } => {
                binary(*op, left.eval(env)?, right.eval(env)?)
            }
            Kindling::Access { op, left, right } => {
                access(*op, left.eval(env)?, right.eval(env)?)
            }
            Kindling::And(items) => {
                for item in items {
                    if !item.eval(env)?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Kindling::Or(items) => {
                for item in items {
                    let value = item.eval(env)?;
                    if value.truthy() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            Kindling::Not(inner) => Ok(Value::Bool(!inner.eval(env)?.truthy())),
            Kindling::Function { target, args } => {
                let callee = target.eval(env)?;
                let Value::Callable(call) = callee else {
                    return Err(CrucibleError::NotCallable(target.describe()).into());
                };
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(arg.eval(env)?);
                }
                Ok(call.invoke(env, &evaluated)?)
            }
            _ => Ok(Value::Null),
        }
    }

    /// Execute this node in statement position.
    pub fn execute(&self, env: &Crucible) -> Result<Outcome, RuntimeError> {
        match self {
            Kindling::Set { targets, values } => {
                let mut evaluated = Vec::with_capacity(values.len());
                for value in values {
                    evaluated.push(value.eval(env)?);
                }
                for (target, value) in targets.iter().zip(evaluated) {
                    env.set(target, value)?;
                }
                Ok(Outcome::Continue)
            }
            Kindling::Swap { left, right } => {
                let a = env.get(left)?;
                let b = env.get(right)?;
                env.set(left, b)?;
                env.set(right, a)?;
                Ok(Outcome::Continue)
            }
            Kindling::Const { target, value } => {
                let value = value.eval(env)?;
                env.set(target, value)?;
                if let Some(first) = target.split('.').next() {
                    env.mark_constant(first);
                }
                Ok(Outcome::Continue)
            }
            Kindling::Put {
                value,
                position,
                target,
            } => {
                let value = value.eval(env)?;
                match env.get(target)? {
                    Value::List(mut items) => {
                        match position {
                            Position::Before => items.insert(0, value),
                            Position::After => items.push(value),
                        }
                        env.set(target, Value::List(items))?;
                        Ok(Outcome::Continue)
                    }
                    other => Err(RuntimeError::TypeMismatch {
                        op: "insert into",
                        left: other.type_name(),
                        right: value.type_name(),
                    }),
                }
            }
            Kindling::Write { text, target } => {
                let rendered = text.eval(env)?.to_string();
                match env.get(target)? {
                    Value::Str(mut current) => {
                        current.push_str(&rendered);
                        current.push('\n');
                        env.set(target, Value::Str(current))?;
                        Ok(Outcome::Continue)
                    }
                    other => Err(RuntimeError::TypeMismatch {
                        op: "append",
                        left: "str",
                        right: other.type_name(),
                    }),
                }
            }
            Kindling::Input { prompt, target } => {
                let value = prompt.eval(env)?;
                env.set(target, value)?;
                Ok(Outcome::Yielded(None))
            }
            Kindling::Jump { target } => {
                let index = jump_index(target, env)?;
                jump_to(env, index)?;
                Ok(Outcome::Continue)
            }
            Kindling::JumpAhead { count } => {
                let value = count.eval(env)?;
                let Some(delta) = value.as_f64() else {
                    return Err(RuntimeError::BadJumpTarget(count.describe()));
                };
                let line = current_line(env)?;
                set_line(env, line + delta as i64)?;
                Ok(Outcome::Continue)
            }
            Kindling::Return => {
                let back = env.get("__JUMPED__")?;
                env.set("__LINE__", back)?;
                Ok(Outcome::Continue)
            }
            Kindling::Goto {
                otherwise: Some(label),
                ..
            } => {
                let value = env.get(label)?;
                let index = value
                    .as_index()
                    .ok_or_else(|| RuntimeError::BadJumpTarget(label.clone()))?;
                jump_to(env, index)?;
                Ok(Outcome::Continue)
            }
            Kindling::Goto { .. } | Kindling::EndIf | Kindling::NoOp => Ok(Outcome::Continue),
            Kindling::Stop => Ok(Outcome::Halted),
            Kindling::Yield { payload } => match payload {
                None => Ok(Outcome::Yielded(None)),
                Some(expr) => match expr.eval(env)? {
                    Value::Map(map) => Ok(Outcome::Yielded(Some(map))),
                    Value::Null => Ok(Outcome::Yielded(None)),
                    other => Err(RuntimeError::TypeMismatch {
                        op: "yield",
                        left: "map",
                        right: other.type_name(),
                    }),
                },
            },
            Kindling::Interrupt { name, label } => Ok(Outcome::Interrupt {
                name: name.clone(),
                label: label.clone(),
            }),
            Kindling::Import { library, alias } => Ok(Outcome::Imported {
                library: library.clone(),
                alias: alias.clone(),
                request: None,
            }),
            Kindling::ImportFrom { library, symbols } => Ok(Outcome::Imported {
                library: library.clone(),
                alias: None,
                request: Some(symbols.clone()),
            }),
            Kindling::If { cond, or_else } | Kindling::Elif { cond, or_else } => {
                linked(*or_else)?;
                if !cond.eval(env)?.truthy() {
                    set_line(env, *or_else as i64)?;
                }
                Ok(Outcome::Continue)
            }
            Kindling::Else { end } => {
                linked(*end)?;
                set_line(env, *end as i64)?;
                Ok(Outcome::Continue)
            }
            Kindling::Foreach {
                var,
                key,
                iterable,
                exit,
            } => {
                linked(*exit)?;
                let own = current_line(env)? - 1;
                let counter = format!("__FOREACH_{own}__");
                let items = iterate(iterable.eval(env)?)?;
                let index = read_counter(env, &counter);
                if index >= items.len() {
                    env.set(&counter, Value::Null)?;
                    set_line(env, *exit as i64)?;
                } else {
                    let (item_key, item) = items[index].clone();
                    env.set(var, item)?;
                    if let Some(key) = key {
                        env.set(key, item_key)?;
                    }
                    env.set(&counter, Value::Int(index as i64 + 1))?;
                }
                Ok(Outcome::Continue)
            }
            Kindling::Foriter {
                var,
                init,
                cond,
                step,
                exit,
            } => {
                linked(*exit)?;
                let own = current_line(env)? - 1;
                let flag = format!("__FORITER_{own}__");
                let started = env
                    .get(&flag)
                    .map(|value| value.truthy())
                    .unwrap_or(false);
                if !started {
                    let value = init.eval(env)?;
                    env.set(var, value)?;
                    env.set(&flag, Value::Bool(true))?;
                } else {
                    let current = env.get(var)?;
                    let delta = step.eval(env)?;
                    let next = binary(BinaryOp::Add, current, delta)?;
                    env.set(var, next)?;
                }
                if !cond.eval(env)?.truthy() {
                    env.set(&flag, Value::Null)?;
                    set_line(env, *exit as i64)?;
                }
                Ok(Outcome::Continue)
            }
            Kindling::EndFor { back } => {
                linked(*back)?;
                set_line(env, *back as i64)?;
                Ok(Outcome::Continue)
            }
            Kindling::Statement { op, cond } => {
                if cond.eval(env)?.truthy() {
                    op.execute(env)
                } else {
                    Ok(Outcome::Continue)
                }
            }
            other => {
                other.eval(env)?;
                Ok(Outcome::Continue)
            }
        }
    }
}

fn linked(target: usize) -> Result<(), RuntimeError> {
    if target == UNLINKED {
        Err(RuntimeError::UnlinkedBlock)
    } else {
        Ok(())
    }
}

fn current_line(env: &Crucible) -> Result<i64, RuntimeError> {
    match env.get("__LINE__")? {
        Value::Int(line) => Ok(line),
        _ => Err(RuntimeError::BadJumpTarget("__LINE__".to_owned())),
    }
}

fn set_line(env: &Crucible, line: i64) -> Result<(), RuntimeError> {
    env.set("__LINE__", Value::Int(line))?;
    Ok(())
}

/// Record the current line in `__JUMPED__` and move `__LINE__` past the
/// target instruction.
fn jump_to(env: &Crucible, index: usize) -> Result<(), RuntimeError> {
    let current = current_line(env)?;
    env.set("__JUMPED__", Value::Int(current))?;
    set_line(env, index as i64 + 1)
}

fn jump_index(target: &Kindling, env: &Crucible) -> Result<usize, RuntimeError> {
    let value = target.eval(env)?;
    value
        .as_index()
        .ok_or_else(|| RuntimeError::BadJumpTarget(target.describe()))
}

fn read_counter(env: &Crucible, key: &str) -> usize {
    match env.get(key) {
        Ok(Value::Int(n)) if n >= 0 => n as usize,
        _ => 0,
    }
}

/// Expand an iterable into `(key, value)` pairs: lists by index, tables by
/// key, strings by character.
fn iterate(value: Value) -> Result<Vec<(Value, Value)>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (Value::Int(i as i64), item))
            .collect()),
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(key, item)| (Value::Str(key), item))
            .collect()),
        Value::Str(text) => Ok(text
            .chars()
            .enumerate()
            .map(|(i, c)| (Value::Int(i as i64), Value::Str(c.to_string())))
            .collect()),
        other => Err(RuntimeError::NotIterable(other.type_name())),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let numeric = |op_name: &'static str| -> Result<(f64, f64), RuntimeError> {
        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(RuntimeError::TypeMismatch {
                op: op_name,
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    };

    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::List(items))
            }
            _ => {
                let (a, b) = numeric("add")?;
                Ok(Value::number(a + b))
            }
        },
        BinaryOp::Sub => {
            let (a, b) = numeric("subtract")?;
            Ok(Value::number(a - b))
        }
        BinaryOp::Mul => {
            let (a, b) = numeric("multiply")?;
            Ok(Value::number(a * b))
        }
        BinaryOp::Div => {
            let (a, b) = numeric("divide")?;
            if b == 0.0 {
                return Err(RuntimeError::DivideByZero);
            }
            Ok(Value::number(a / b))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => {
                    let (a, b) = numeric("compare")?;
                    a.partial_cmp(&b).ok_or(RuntimeError::TypeMismatch {
                        op: "compare",
                        left: "float",
                        right: "float",
                    })?
                }
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
    }
}

/// Key coercion for table lookup: strings as-is, whole numbers by digits.
fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

fn access(op: AccessKind, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        AccessKind::In => match &right {
            Value::List(items) => {
                if items.contains(&left) {
                    Ok(left)
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Map(map) => match key_string(&left) {
                Some(key) if map.contains_key(&key) => Ok(left),
                _ => Ok(Value::Null),
            },
            Value::Str(text) => match &left {
                Value::Str(needle) if text.contains(needle.as_str()) => Ok(left),
                Value::Str(_) => Ok(Value::Null),
                other => Err(RuntimeError::TypeMismatch {
                    op: "search",
                    left: other.type_name(),
                    right: "str",
                }),
            },
            other => Err(RuntimeError::TypeMismatch {
                op: "search",
                left: left.type_name(),
                right: other.type_name(),
            }),
        },
        AccessKind::From => match &right {
            Value::List(items) => Ok(left
                .as_index()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null)),
            Value::Map(map) => {
                let direct = key_string(&left).and_then(|key| map.get(&key).cloned());
                Ok(direct
                    .or_else(|| map.get("_").cloned())
                    .unwrap_or(Value::Null))
            }
            _ => Ok(Value::Null),
        },
        AccessKind::At => match &right {
            Value::List(items) => {
                let index = left.as_index().ok_or_else(|| RuntimeError::BadIndex {
                    index: left.to_string(),
                    container: "list",
                })?;
                items.get(index).cloned().ok_or_else(|| RuntimeError::BadIndex {
                    index: index.to_string(),
                    container: "list",
                })
            }
            Value::Map(map) => {
                let key = key_string(&left).ok_or_else(|| RuntimeError::BadIndex {
                    index: left.to_string(),
                    container: "map",
                })?;
                map.get(&key).cloned().ok_or_else(|| RuntimeError::BadIndex {
                    index: key,
                    container: "map",
                })
            }
            other => Err(RuntimeError::TypeMismatch {
                op: "index",
                left: left.type_name(),
                right: other.type_name(),
            }),
        },
    }
}

/// Negation folding for unary construction: flip numeric literals, wrap
/// logical negations.
pub(crate) fn negate(kind: UnaryKind, operand: Kindling) -> Kindling {
    match kind {
        UnaryKind::Not => Kindling::Not(Box::new(operand)),
        UnaryKind::Neg => match operand {
            Kindling::Number(Value::Int(n)) => Kindling::Number(Value::Int(-n)),
            Kindling::Number(Value::Float(n)) => Kindling::Number(Value::Float(-n)),
            other => Kindling::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Kindling::Number(Value::Int(0))),
                right: Box::new(other),
            },
        },
    }
}
