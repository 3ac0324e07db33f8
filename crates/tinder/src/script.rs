//! The Tinder script object and its cooperative execution loop.

use std::collections::HashMap;

use indexmap::IndexMap;
use tinder_core::{Crucible, Value, ValueMap};

use crate::error::{RuntimeError, ScriptError};
use crate::kindling::{Kindling, Outcome};

/// Cooperative signal a run returns to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSignal {
    /// The script suspended; resume by calling [`Tinder::run`] again. The
    /// payload, when present, is for the host's stack frame.
    Yielded(Option<ValueMap>),
    /// The script needs a library bound into its scope before resuming.
    Imported {
        library: String,
        alias: Option<String>,
        request: Option<Vec<String>>,
    },
    /// The script ran off the end or executed `stop`.
    Halted,
}

/// A compiled script: a linear instruction list with its jump table and the
/// interrupt handlers registered during execution.
#[derive(Debug, Clone)]
pub struct Tinder {
    instructions: Vec<(usize, Kindling)>,
    jump_table: IndexMap<String, usize>,
    interrupts: HashMap<String, String>,
    permissions: Vec<String>,
}

impl Tinder {
    pub(crate) fn new(
        instructions: Vec<(usize, Kindling)>,
        jump_table: IndexMap<String, usize>,
    ) -> Tinder {
        Tinder {
            instructions,
            jump_table,
            interrupts: HashMap::new(),
            permissions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[(usize, Kindling)] {
        &self.instructions
    }

    /// Label -> instruction index for every declared `Goto`.
    pub fn jump_table(&self) -> &IndexMap<String, usize> {
        &self.jump_table
    }

    /// Permission tags granted to this script; libraries check them on
    /// import.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn set_permissions(&mut self, permissions: Vec<String>) {
        self.permissions = permissions;
    }

    /// Write every label -> instruction index into the environment so that
    /// `jump label` resolves through identifier lookup.
    pub fn write_jump_table(&self, env: &Crucible) -> Result<(), RuntimeError> {
        for (label, index) in &self.jump_table {
            env.set(label, Value::Int(*index as i64))?;
        }
        Ok(())
    }

    /// Drive the instruction loop until the script suspends, halts, or
    /// fails.
    ///
    /// `__LINE__` is initialized on first entry and pre-incremented before
    /// each instruction executes, so suspension resumes past the suspending
    /// instruction. A runtime error whose name has a registered interrupt
    /// handler jumps to the handler's label; anything else is wrapped with
    /// its source line and surfaced.
    pub fn run(&mut self, env: &Crucible) -> Result<RunSignal, ScriptError> {
        if !env.contains("__LINE__") {
            bookkeep(env.set("__LINE__", Value::Int(0)))?;
        }

        loop {
            let line = match bookkeep(env.get("__LINE__"))? {
                Value::Int(line) if line >= 0 => line as usize,
                _ => {
                    return Err(ScriptError {
                        line: 0,
                        cause: RuntimeError::BadJumpTarget("__LINE__".to_owned()),
                    });
                }
            };
            if line >= self.instructions.len() {
                return Ok(RunSignal::Halted);
            }

            let (source_line, op) = &self.instructions[line];
            bookkeep(env.set("__LINE__", Value::Int(line as i64 + 1)))?;

            match op.execute(env) {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Interrupt { name, label }) => {
                    self.interrupts.insert(name, label);
                }
                Ok(Outcome::Yielded(payload)) => return Ok(RunSignal::Yielded(payload)),
                Ok(Outcome::Halted) => return Ok(RunSignal::Halted),
                Ok(Outcome::Imported {
                    library,
                    alias,
                    request,
                }) => {
                    return Ok(RunSignal::Imported {
                        library,
                        alias,
                        request,
                    });
                }
                Err(cause) => match self.interrupts.get(cause.name()) {
                    Some(label) => {
                        let label = label.clone();
                        dispatch(env, &label).map_err(|cause| ScriptError {
                            line: *source_line,
                            cause,
                        })?;
                    }
                    None => {
                        return Err(ScriptError {
                            line: *source_line,
                            cause,
                        });
                    }
                },
            }
        }
    }
}

/// Jump to a handler label through the environment jump table.
fn dispatch(env: &Crucible, label: &str) -> Result<(), RuntimeError> {
    let index = env
        .get(label)?
        .as_index()
        .ok_or_else(|| RuntimeError::BadJumpTarget(label.to_owned()))?;
    let current = env.get("__LINE__")?;
    env.set("__JUMPED__", current)?;
    env.set("__LINE__", Value::Int(index as i64 + 1))?;
    Ok(())
}

/// Loop bookkeeping failures have no script line to blame.
fn bookkeep<T>(result: Result<T, tinder_core::CrucibleError>) -> Result<T, ScriptError> {
    result.map_err(|cause| ScriptError {
        line: 0,
        cause: cause.into(),
    })
}
