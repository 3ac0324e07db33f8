//! Post-compile resolver: constant folding and structured-block linking.
//!
//! The folding pass evaluates pure sub-trees against a compile-time Crucible
//! seeded with the host's resolvable library exports. `const` declarations
//! encountered in the instruction stream are recorded there so later
//! identifier references fold too. The linking pass runs a strict block
//! stack over `if`/`else`/`endif` and the loop forms, patching every jump
//! target; mismatched markers are compile errors.

use tinder_core::{Crucible, Value};

use crate::error::CompileError;
use crate::kindling::Kindling;

pub struct Resolver {
    env: Crucible,
}

impl Resolver {
    /// `env` is the compile-time environment: pure library exports plus any
    /// host constants. Script `const` declarations are written into it as
    /// the pass walks the instruction list.
    pub fn new(env: Crucible) -> Resolver {
        Resolver { env }
    }

    pub fn resolve(&self, instructions: &mut [(usize, Kindling)]) -> Result<(), CompileError> {
        for (_, op) in instructions.iter_mut() {
            self.fold_statement(op);
            self.record_const(op);
        }
        link_blocks(instructions)
    }

    /// Record a constant declaration with a compile-time-known value so
    /// later identifier references can fold to it.
    fn record_const(&self, op: &Kindling) {
        let Kindling::Const { target, value } = op else {
            return;
        };
        if !value.is_constant() {
            return;
        }
        if let Ok(folded) = value.eval(&self.env)
            && self.env.set(target, folded).is_ok()
            && let Some(first) = target.split('.').next()
        {
            self.env.mark_constant(first);
        }
    }

    /// Fold the expression operands of a statement node.
    fn fold_statement(&self, op: &mut Kindling) {
        match op {
            Kindling::Set { values, .. } => {
                for value in values {
                    self.fold_expr(value);
                }
            }
            Kindling::Const { value, .. } => self.fold(value),
            Kindling::Put { value, .. } => self.fold(value),
            Kindling::Write { text, .. } => self.fold(text),
            Kindling::Input { prompt, .. } => self.fold(prompt),
            Kindling::Jump { target } => self.fold(target),
            Kindling::JumpAhead { count } => self.fold(count),
            Kindling::Yield {
                payload: Some(payload),
            } => self.fold(payload),
            Kindling::If { cond, .. } | Kindling::Elif { cond, .. } => self.fold(cond),
            Kindling::Foreach { iterable, .. } => self.fold(iterable),
            Kindling::Foriter {
                init, cond, step, ..
            } => {
                self.fold(init);
                self.fold(cond);
                self.fold(step);
            }
            Kindling::Statement { op, cond } => {
                self.fold_statement(op);
                self.fold(cond);
            }
            other => self.fold_expr(other),
        }
    }

    fn fold(&self, node: &mut Box<Kindling>) {
        self.fold_expr(&mut **node);
    }

    /// Fold one expression sub-tree bottom-up. A node whose children all
    /// carry compile-time values executes against the resolver environment;
    /// on success it becomes a `Constant`, on failure it is left as-is.
    fn fold_expr(&self, node: &mut Kindling) {
        match node {
            Kindling::Identifier(name) => {
                if self.chain_constant(name)
                    && let Ok(value) = self.env.get(name)
                {
                    *node = Kindling::Constant(value);
                }
            }
            Kindling::Array(items) => {
                for item in items.iter_mut() {
                    self.fold_expr(item);
                }
                if items.iter().all(Kindling::is_constant) {
                    self.try_fold(node);
                }
            }
            Kindling::Table(pairs) => {
                for (_, value) in pairs.iter_mut() {
                    self.fold_expr(value);
                }
                if pairs.iter().all(|(_, value)| value.is_constant()) {
                    self.try_fold(node);
                }
            }
            Kindling::Binary { left, right, .. } | Kindling::Access { left, right, .. } => {
                self.fold_expr(left);
                self.fold_expr(right);
                if left.is_constant() && right.is_constant() {
                    self.try_fold(node);
                }
            }
            Kindling::And(items) | Kindling::Or(items) => {
                for item in items.iter_mut() {
                    self.fold_expr(item);
                }
                if items.iter().all(Kindling::is_constant) {
                    self.try_fold(node);
                }
            }
            Kindling::Not(inner) => {
                self.fold_expr(inner);
                if inner.is_constant() {
                    self.try_fold(node);
                }
            }
            Kindling::Function { target, args } => {
                for arg in args.iter_mut() {
                    self.fold_expr(arg);
                }
                if args.iter().all(Kindling::is_constant) && self.resolvable_target(target) {
                    self.try_fold(node);
                }
            }
            Kindling::KeyValuePair(_, value) => self.fold_expr(value),
            _ => {}
        }
    }

    fn try_fold(&self, node: &mut Kindling) {
        if let Ok(value) = node.eval(&self.env) {
            *node = Kindling::Constant(value);
        }
    }

    /// A function folds only when its target is a library method the host
    /// declared pure.
    fn resolvable_target(&self, target: &Kindling) -> bool {
        let Kindling::Identifier(name) = target else {
            return false;
        };
        matches!(self.env.get(name), Ok(Value::Callable(call)) if call.is_resolvable())
    }

    /// Constants are checked across the whole resolver chain: the scratch
    /// scope holding script constants plus the host's seeded snapshot.
    fn chain_constant(&self, name: &str) -> bool {
        let Some(key) = name.split('.').next().filter(|k| !k.is_empty()) else {
            return false;
        };
        let mut scope = Some(self.env.clone());
        while let Some(current) = scope {
            if current.is_constant(key) {
                return true;
            }
            scope = current.parent();
        }
        false
    }
}

enum Block {
    Branch {
        guard: Option<usize>,
        exits: Vec<usize>,
        line: usize,
    },
    Loop {
        cond: usize,
        line: usize,
    },
}

enum Marker {
    If,
    Elif,
    Else,
    EndIf,
    LoopHead,
    EndFor,
    Other,
}

/// Strict block stack over the instruction list.
///
/// An `else` patches the previous guard's jump target to its own end (the
/// following instruction) and waits for `endif` to patch its exit; `endif`
/// patches every dangling jump in its block to the instruction after
/// itself. `endfor` becomes the unconditional back-edge to its loop head
/// and patches the loop exit.
fn link_blocks(instructions: &mut [(usize, Kindling)]) -> Result<(), CompileError> {
    let mut stack: Vec<Block> = Vec::new();

    for index in 0..instructions.len() {
        let line = instructions[index].0;
        let marker = match &instructions[index].1 {
            Kindling::If { .. } => Marker::If,
            Kindling::Elif { .. } => Marker::Elif,
            Kindling::Else { .. } => Marker::Else,
            Kindling::EndIf => Marker::EndIf,
            Kindling::Foreach { .. } | Kindling::Foriter { .. } => Marker::LoopHead,
            Kindling::EndFor { .. } => Marker::EndFor,
            _ => Marker::Other,
        };

        match marker {
            Marker::If => stack.push(Block::Branch {
                guard: Some(index),
                exits: Vec::new(),
                line,
            }),
            Marker::Elif => match stack.last_mut() {
                Some(Block::Branch { guard, .. }) => *guard = Some(index),
                _ => {
                    return Err(CompileError::UnmatchedBlock {
                        line,
                        marker: "else if",
                    });
                }
            },
            Marker::Else => match stack.last_mut() {
                Some(Block::Branch { guard, exits, .. }) => {
                    match guard.take() {
                        Some(at) => patch_guard(instructions, at, index + 1),
                        None => {
                            return Err(CompileError::UnmatchedBlock {
                                line,
                                marker: "else",
                            });
                        }
                    }
                    exits.push(index);
                }
                _ => {
                    return Err(CompileError::UnmatchedBlock {
                        line,
                        marker: "else",
                    });
                }
            },
            Marker::EndIf => match stack.pop() {
                Some(Block::Branch { guard, exits, .. }) => {
                    if let Some(at) = guard {
                        patch_guard(instructions, at, index + 1);
                    }
                    for exit in exits {
                        patch_exit(instructions, exit, index + 1);
                    }
                }
                _ => {
                    return Err(CompileError::UnmatchedBlock {
                        line,
                        marker: "endif",
                    });
                }
            },
            Marker::LoopHead => stack.push(Block::Loop { cond: index, line }),
            Marker::EndFor => match stack.pop() {
                Some(Block::Loop { cond, .. }) => {
                    patch_loop(instructions, cond, index + 1);
                    instructions[index].1 = Kindling::EndFor { back: cond };
                }
                _ => {
                    return Err(CompileError::UnmatchedBlock {
                        line,
                        marker: "endfor",
                    });
                }
            },
            Marker::Other => {}
        }
    }

    if let Some(open) = stack.pop() {
        let (line, marker) = match open {
            Block::Branch { line, .. } => (line, "if"),
            Block::Loop { line, .. } => (line, "for"),
        };
        return Err(CompileError::UnmatchedBlock { line, marker });
    }
    Ok(())
}

fn patch_guard(instructions: &mut [(usize, Kindling)], at: usize, target: usize) {
    if let Kindling::If { or_else, .. } | Kindling::Elif { or_else, .. } =
        &mut instructions[at].1
    {
        *or_else = target;
    }
}

fn patch_exit(instructions: &mut [(usize, Kindling)], at: usize, target: usize) {
    if let Kindling::Else { end } = &mut instructions[at].1 {
        *end = target;
    }
}

fn patch_loop(instructions: &mut [(usize, Kindling)], at: usize, target: usize) {
    if let Kindling::Foreach { exit, .. } | Kindling::Foriter { exit, .. } =
        &mut instructions[at].1
    {
        *exit = target;
    }
}
