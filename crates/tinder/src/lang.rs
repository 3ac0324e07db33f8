//! The Tinder language definition: grammar text, opcode registration, and
//! the `Tinderstarter` compile pipeline.
//!
//! Grammars are selected by version label; the default version is embedded
//! at build time. No filesystem access happens at load: hosts pass
//! additional grammar texts to [`Tinderstarter::register_version`].

use firestarter::{
    ArgSpec, Bound, Firestarter, FirestarterError, GrammarFlags, Preprocessor, Reduced,
    make_grammar,
};
use indexmap::IndexMap;
use tinder_core::{Access, Crucible, Value};

use crate::error::CompileError;
use crate::kindling::{
    AccessKind, ArgKind, BinaryOp, Kindling, Position, UNLINKED, UnaryKind, negate,
};
use crate::resolver::Resolver;
use crate::script::Tinder;

/// The embedded default grammar text.
pub const GRAMMAR: &str = include_str!("grammar/tinder.peg");

/// Version label the embedded grammar registers under.
pub const DEFAULT_VERSION: &str = "1";

/// Compiles Tinder source into executable [`Tinder`] scripts.
pub struct Tinderstarter {
    versions: IndexMap<String, Firestarter<Kindling>>,
    resolve_env: Crucible,
    preprocessor: Option<Preprocessor>,
}

impl Tinderstarter {
    /// Build a compiler with the embedded grammar registered under
    /// [`DEFAULT_VERSION`].
    pub fn new() -> Result<Tinderstarter, CompileError> {
        let mut starter = Tinderstarter {
            versions: IndexMap::new(),
            resolve_env: Crucible::default(),
            preprocessor: None,
        };
        starter.register_version(DEFAULT_VERSION, GRAMMAR)?;
        Ok(starter)
    }

    /// Register a grammar text under a version label.
    pub fn register_version(
        &mut self,
        version: impl Into<String>,
        text: &str,
    ) -> Result<&mut Self, CompileError> {
        let grammar = make_grammar(text, GrammarFlags::SKIP_SPACES | GrammarFlags::FLATTEN)
            .map_err(FirestarterError::from)?;
        let mut compiler = Firestarter::new(grammar);
        register_ops(&mut compiler)?;
        self.versions.insert(version.into(), compiler);
        Ok(self)
    }

    /// Seed the resolver's compile-time environment (pure library exports
    /// and host constants).
    pub fn resolve_env(&mut self, env: Crucible) -> &mut Self {
        self.resolve_env = env;
        self
    }

    /// Install a preprocessor run over the source before parsing.
    pub fn set_preprocessor(&mut self, preprocessor: Preprocessor) -> &mut Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Compile with the default-version grammar.
    pub fn compile(&self, source: &str) -> Result<Tinder, CompileError> {
        self.compile_version(DEFAULT_VERSION, source)
    }

    /// Reduce source to raw instructions without the resolver pass. The
    /// result still carries unlinked blocks and unfolded constants.
    pub fn reduce(&self, source: &str) -> Result<Vec<(usize, Kindling)>, CompileError> {
        let Some(compiler) = self.versions.get(DEFAULT_VERSION) else {
            return Err(CompileError::UnknownVersion(DEFAULT_VERSION.to_owned()));
        };
        let source = match &self.preprocessor {
            Some(pre) => pre.process(source),
            None => source.to_owned(),
        };
        Ok(compiler.compile(&source)?)
    }

    /// Compile with the grammar registered under `version`.
    pub fn compile_version(&self, version: &str, source: &str) -> Result<Tinder, CompileError> {
        let Some(compiler) = self.versions.get(version) else {
            return Err(CompileError::UnknownVersion(version.to_owned()));
        };
        let source = match &self.preprocessor {
            Some(pre) => pre.process(source),
            None => source.to_owned(),
        };
        let mut instructions = compiler.compile(&source)?;

        // Folding writes script constants into a scratch child so repeated
        // compiles never pollute the host's environment snapshot.
        let scratch = Crucible::with_parent(Access::NONE, self.resolve_env.clone());
        Resolver::new(scratch).resolve(&mut instructions)?;

        let jump_table = build_jump_table(&instructions)?;
        Ok(Tinder::new(instructions, jump_table))
    }
}

fn build_jump_table(
    instructions: &[(usize, Kindling)],
) -> Result<IndexMap<String, usize>, CompileError> {
    let mut table = IndexMap::new();
    for (index, (line, op)) in instructions.iter().enumerate() {
        if let Kindling::Goto { label, .. } = op
            && table.insert(label.clone(), index).is_some()
        {
            return Err(CompileError::DuplicateLabel {
                line: *line,
                label: label.clone(),
            });
        }
    }
    Ok(table)
}

// ----------------------------------------------------------------------
// Opcode registration
// ----------------------------------------------------------------------

fn register_ops(fs: &mut Firestarter<Kindling>) -> Result<(), FirestarterError> {
    use ArgKind::*;
    use ArgSpec::{Optional, Required, Rest};

    // value leaves
    fs.register_leaf("Number", leaf_number);
    fs.register_leaf("String", leaf_string);
    fs.register_leaf("Constant", leaf_constant);
    fs.register_leaf("Identifier", |text| {
        Ok(Kindling::Identifier(text.to_owned()))
    });
    fs.register_leaf("BinOp", leaf_operator);
    fs.register_leaf("AccessOp", leaf_accessor);
    fs.register_leaf("UnaryOp", leaf_unary);
    fs.register_leaf("Position", leaf_position);
    fs.register_leaf("Stop", |_| Ok(Kindling::Stop));
    fs.register_leaf("Return", |_| Ok(Kindling::Return));
    fs.register_leaf("EndIf", |_| Ok(Kindling::EndIf));
    fs.register_leaf("EndFor", |_| Ok(Kindling::EndFor { back: UNLINKED }));

    // expressions
    fs.register("Array", vec![Rest(Any)], build_array)?;
    fs.register("Table", vec![Rest(Pair)], build_table)?;
    fs.register("KeyValuePair", vec![Required(Any), Required(Any)], build_pair)?;
    fs.register("Binary", vec![Rest(Any)], build_binary)?;
    fs.register("Access", vec![Rest(Any)], build_access)?;
    fs.register("Unary", vec![Required(UnaryOp), Required(Any)], build_unary)?;
    fs.register("Or", vec![Rest(Any)], build_or)?;
    fs.register("And", vec![Rest(Any)], build_and)?;
    fs.register("Not", vec![Required(Any)], build_not)?;
    fs.register("Function", vec![Required(Ident), Rest(Any)], build_function)?;

    // statements
    fs.register(
        "Statement",
        vec![Required(Any), Optional(Any)],
        build_statement,
    )?;
    fs.register("Set", vec![Rest(Any)], build_set)?;
    fs.register("Const", vec![Required(Ident), Required(Any)], build_const)?;
    fs.register("Inc", vec![Required(Ident), Optional(Any)], build_inc)?;
    fs.register("Dec", vec![Required(Ident), Optional(Any)], build_dec)?;
    fs.register_defaults("Inc", vec![Kindling::NoOp, Kindling::Number(Value::Int(1))])?;
    fs.register_defaults("Dec", vec![Kindling::NoOp, Kindling::Number(Value::Int(1))])?;
    fs.register("Swap", vec![Required(Ident), Required(Ident)], build_swap)?;
    fs.register(
        "Put",
        vec![Required(Any), Required(Placement), Required(Ident)],
        build_put,
    )?;
    fs.register("Write", vec![Required(Any), Required(Ident)], build_write)?;
    fs.register("Input", vec![Required(Any), Required(Ident)], build_input)?;
    fs.register(
        "Interrupt",
        vec![Required(Str), Required(Ident)],
        build_interrupt,
    )?;
    fs.register(
        "Import",
        vec![Required(Ident), Optional(Ident)],
        build_import,
    )?;
    fs.register("From", vec![Required(Ident), Rest(Ident)], build_from)?;
    fs.register("Jump", vec![Required(Any)], build_jump)?;
    fs.register("JumpAhead", vec![Required(Any)], build_jump_ahead)?;
    fs.register(
        "Goto",
        vec![Required(Ident), Optional(Ident)],
        build_goto,
    )?;
    fs.register("Yield", vec![Optional(Any)], build_yield)?;

    // structured blocks
    fs.register("If", vec![Required(Any)], build_if)?;
    fs.register("Elif", vec![Required(Any)], build_elif)?;
    fs.register("Else", vec![], build_else)?;
    fs.register(
        "Foreach",
        vec![Required(Ident), Optional(Ident), Required(Any)],
        build_foreach,
    )?;
    fs.register(
        "Foriter",
        vec![
            Required(Ident),
            Required(Any),
            Required(Any),
            Required(Any),
        ],
        build_foriter,
    )?;

    Ok(())
}

// ----------------------------------------------------------------------
// Leaf builders
// ----------------------------------------------------------------------

fn leaf_number(text: &str) -> Result<Kindling, String> {
    text.parse::<f64>()
        .map(|raw| Kindling::Number(Value::number(raw)))
        .map_err(|_| format!("invalid number: {text}"))
}

fn leaf_string(text: &str) -> Result<Kindling, String> {
    if text.len() < 2 {
        return Err(format!("invalid string: {text}"));
    }
    Ok(Kindling::String(unescape(&text[1..text.len() - 1])))
}

fn leaf_constant(text: &str) -> Result<Kindling, String> {
    match text {
        "true" => Ok(Kindling::Constant(Value::Bool(true))),
        "false" => Ok(Kindling::Constant(Value::Bool(false))),
        "null" => Ok(Kindling::Constant(Value::Null)),
        other => Err(format!("unknown constant: {other}")),
    }
}

fn leaf_operator(text: &str) -> Result<Kindling, String> {
    let op = match text {
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        other => return Err(format!("unknown operator: {other}")),
    };
    Ok(Kindling::Operator(op))
}

fn leaf_accessor(text: &str) -> Result<Kindling, String> {
    let op = match text {
        "in" => AccessKind::In,
        "from" => AccessKind::From,
        "at" => AccessKind::At,
        other => return Err(format!("unknown accessor: {other}")),
    };
    Ok(Kindling::Accessor(op))
}

fn leaf_unary(text: &str) -> Result<Kindling, String> {
    match text {
        "-" => Ok(Kindling::UnaryOperator(UnaryKind::Neg)),
        "!" => Ok(Kindling::UnaryOperator(UnaryKind::Not)),
        other => Err(format!("unknown unary operator: {other}")),
    }
}

fn leaf_position(text: &str) -> Result<Kindling, String> {
    match text {
        "before" => Ok(Kindling::Placement(Position::Before)),
        "after" => Ok(Kindling::Placement(Position::After)),
        other => Err(format!("unknown position: {other}")),
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ----------------------------------------------------------------------
// Bound-argument helpers
// ----------------------------------------------------------------------

fn one(bound: Option<Bound<Kindling>>) -> Result<Kindling, String> {
    match bound {
        Some(Bound::One(op)) => Ok(op),
        _ => Err("missing argument".to_owned()),
    }
}

fn opt(bound: Option<Bound<Kindling>>) -> Result<Option<Kindling>, String> {
    match bound {
        Some(Bound::One(op)) => Ok(Some(op)),
        Some(Bound::Missing) | None => Ok(None),
        Some(Bound::Rest(_)) => Err("unexpected argument list".to_owned()),
    }
}

fn rest(bound: Option<Bound<Kindling>>) -> Result<Vec<Kindling>, String> {
    match bound {
        Some(Bound::Rest(ops)) => Ok(ops),
        _ => Err("missing argument list".to_owned()),
    }
}

fn ident(bound: Option<Bound<Kindling>>) -> Result<String, String> {
    match one(bound)? {
        Kindling::Identifier(name) => Ok(name),
        other => Err(format!("expected an identifier, got {other:?}")),
    }
}

fn opt_ident(bound: Option<Bound<Kindling>>) -> Result<Option<String>, String> {
    match opt(bound)? {
        Some(Kindling::Identifier(name)) => Ok(Some(name)),
        Some(other) => Err(format!("expected an identifier, got {other:?}")),
        None => Ok(None),
    }
}

// ----------------------------------------------------------------------
// Expression builders
// ----------------------------------------------------------------------

fn build_array(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let items = rest(args.pop())?;
    Ok(Reduced::One(Kindling::Array(items)))
}

fn build_table(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let mut pairs = Vec::new();
    for entry in rest(args.pop())? {
        let Kindling::KeyValuePair(key, value) = entry else {
            return Err("table entries must be key/value pairs".to_owned());
        };
        let key = match *key {
            Kindling::String(text) => text,
            Kindling::Identifier(name) => name,
            Kindling::Number(value) => value.to_string(),
            other => return Err(format!("invalid table key: {other:?}")),
        };
        pairs.push((key, *value));
    }
    Ok(Reduced::One(Kindling::Table(pairs)))
}

fn build_pair(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let value = one(args.pop())?;
    let key = one(args.pop())?;
    Ok(Reduced::One(Kindling::KeyValuePair(
        Box::new(key),
        Box::new(value),
    )))
}

/// Shunting-yard over a flat `operand op operand op ...` list, emitting a
/// left-associative tree ordered by the precedence table.
fn build_binary(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    fn apply(output: &mut Vec<Kindling>, op: BinaryOp) -> Result<(), String> {
        let right = output.pop().ok_or("malformed expression")?;
        let left = output.pop().ok_or("malformed expression")?;
        output.push(Kindling::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        Ok(())
    }

    let items = rest(args.pop())?;
    let mut supply = items.into_iter();
    let first = supply.next().ok_or("empty expression")?;
    if matches!(first, Kindling::Operator(_)) {
        return Err("expression begins with an operator".to_owned());
    }

    let mut output = vec![first];
    let mut pending: Vec<BinaryOp> = Vec::new();
    while let Some(node) = supply.next() {
        let Kindling::Operator(op) = node else {
            return Err("expected an operator between operands".to_owned());
        };
        let operand = supply
            .next()
            .ok_or("operator without a right operand")?;
        if matches!(operand, Kindling::Operator(_)) {
            return Err("expected an operand after the operator".to_owned());
        }
        while let Some(&top) = pending.last() {
            if top.precedence() <= op.precedence() {
                pending.pop();
                apply(&mut output, top)?;
            } else {
                break;
            }
        }
        pending.push(op);
        output.push(operand);
    }
    while let Some(op) = pending.pop() {
        apply(&mut output, op)?;
    }

    match output.pop() {
        Some(tree) if output.is_empty() => Ok(Reduced::One(tree)),
        _ => Err("malformed expression".to_owned()),
    }
}

/// Left-associative chain of `in` / `from` / `at` accesses.
fn build_access(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let items = rest(args.pop())?;
    let mut supply = items.into_iter();
    let mut acc = supply.next().ok_or("empty access expression")?;
    while let Some(node) = supply.next() {
        let Kindling::Accessor(op) = node else {
            return Err("expected an access operator".to_owned());
        };
        let right = supply.next().ok_or("access without a right operand")?;
        acc = Kindling::Access {
            op,
            left: Box::new(acc),
            right: Box::new(right),
        };
    }
    Ok(Reduced::One(acc))
}

fn build_unary(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let operand = one(args.pop())?;
    let kind = match one(args.pop())? {
        Kindling::UnaryOperator(kind) => kind,
        other => return Err(format!("expected a unary operator, got {other:?}")),
    };
    Ok(Reduced::One(negate(kind, operand)))
}

fn build_or(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let mut items = rest(args.pop())?;
    match items.len() {
        0 => Err("empty expression".to_owned()),
        1 => Ok(Reduced::One(items.remove(0))),
        _ => Ok(Reduced::One(Kindling::Or(items))),
    }
}

fn build_and(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let mut items = rest(args.pop())?;
    match items.len() {
        0 => Err("empty expression".to_owned()),
        1 => Ok(Reduced::One(items.remove(0))),
        _ => Ok(Reduced::One(Kindling::And(items))),
    }
}

fn build_not(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let inner = one(args.pop())?;
    Ok(Reduced::One(Kindling::Not(Box::new(inner))))
}

fn build_function(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let call_args = rest(args.pop())?;
    let target = one(args.pop())?;
    Ok(Reduced::One(Kindling::Function {
        target: Box::new(target),
        args: call_args,
    }))
}

// ----------------------------------------------------------------------
// Statement builders
// ----------------------------------------------------------------------

fn build_statement(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let cond = opt(args.pop())?;
    let op = one(args.pop())?;
    match cond {
        // No guard: the wrapper replaces itself with the operation.
        None => Ok(Reduced::One(op)),
        Some(cond) => Ok(Reduced::One(Kindling::Statement {
            op: Box::new(op),
            cond: Box::new(cond),
        })),
    }
}

fn build_set(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let items = rest(args.pop())?;
    if items.is_empty() || items.len() % 2 != 0 {
        return Err("set expects matching identifiers and values".to_owned());
    }
    let mut values = items;
    let targets_ops = values.drain(..values.len() / 2).collect::<Vec<_>>();
    let mut targets = Vec::with_capacity(targets_ops.len());
    for op in targets_ops {
        match op {
            Kindling::Identifier(name) => targets.push(name),
            other => return Err(format!("set target must be an identifier, got {other:?}")),
        }
    }
    Ok(Reduced::One(Kindling::Set { targets, values }))
}

fn build_const(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let value = one(args.pop())?;
    let target = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Const {
        target,
        value: Box::new(value),
    }))
}

/// `inc x by n` desugars to `set x to x + n`.
fn build_inc(args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    build_step(args, BinaryOp::Add)
}

/// `dec x by n` desugars to `set x to x - n`.
fn build_dec(args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    build_step(args, BinaryOp::Sub)
}

fn build_step(
    mut args: Vec<Bound<Kindling>>,
    op: BinaryOp,
) -> Result<Reduced<Kindling>, String> {
    let step = opt(args.pop())?.unwrap_or(Kindling::Number(Value::Int(1)));
    let target = ident(args.pop())?;
    let value = Kindling::Binary {
        op,
        left: Box::new(Kindling::Identifier(target.clone())),
        right: Box::new(step),
    };
    Ok(Reduced::One(Kindling::Set {
        targets: vec![target],
        values: vec![value],
    }))
}

fn build_swap(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let right = ident(args.pop())?;
    let left = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Swap { left, right }))
}

fn build_put(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let target = ident(args.pop())?;
    let position = match one(args.pop())? {
        Kindling::Placement(position) => position,
        other => return Err(format!("expected before/after, got {other:?}")),
    };
    let value = one(args.pop())?;
    Ok(Reduced::One(Kindling::Put {
        value: Box::new(value),
        position,
        target,
    }))
}

fn build_write(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let target = ident(args.pop())?;
    let text = one(args.pop())?;
    Ok(Reduced::One(Kindling::Write {
        text: Box::new(text),
        target,
    }))
}

fn build_input(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let target = ident(args.pop())?;
    let prompt = one(args.pop())?;
    Ok(Reduced::One(Kindling::Input {
        prompt: Box::new(prompt),
        target,
    }))
}

fn build_interrupt(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let label = ident(args.pop())?;
    let name = match one(args.pop())? {
        Kindling::String(name) => name,
        other => return Err(format!("interrupt name must be a string, got {other:?}")),
    };
    Ok(Reduced::One(Kindling::Interrupt { name, label }))
}

fn build_import(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let alias = opt_ident(args.pop())?;
    let library = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Import { library, alias }))
}

fn build_from(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let mut symbols = Vec::new();
    for op in rest(args.pop())? {
        match op {
            Kindling::Identifier(name) => symbols.push(name),
            other => return Err(format!("imported symbol must be an identifier, got {other:?}")),
        }
    }
    if symbols.is_empty() {
        return Err("from-import needs at least one symbol".to_owned());
    }
    let library = ident(args.pop())?;
    Ok(Reduced::One(Kindling::ImportFrom { library, symbols }))
}

fn build_jump(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let target = one(args.pop())?;
    Ok(Reduced::One(Kindling::Jump {
        target: Box::new(target),
    }))
}

fn build_jump_ahead(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let count = one(args.pop())?;
    Ok(Reduced::One(Kindling::JumpAhead {
        count: Box::new(count),
    }))
}

fn build_goto(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let otherwise = opt_ident(args.pop())?;
    let label = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Goto { label, otherwise }))
}

fn build_yield(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let payload = opt(args.pop())?;
    Ok(Reduced::One(Kindling::Yield {
        payload: payload.map(Box::new),
    }))
}

// ----------------------------------------------------------------------
// Structured block builders
// ----------------------------------------------------------------------

fn build_if(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let cond = one(args.pop())?;
    Ok(Reduced::One(Kindling::If {
        cond: Box::new(cond),
        or_else: UNLINKED,
    }))
}

/// `else if` expands into an exit jump for the previous branch followed by
/// a fresh guard, sharing one source line.
fn build_elif(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let cond = one(args.pop())?;
    Ok(Reduced::Many(vec![
        Kindling::Else { end: UNLINKED },
        Kindling::Elif {
            cond: Box::new(cond),
            or_else: UNLINKED,
        },
    ]))
}

fn build_else(_args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    Ok(Reduced::One(Kindling::Else { end: UNLINKED }))
}

fn build_foreach(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let iterable = one(args.pop())?;
    let key = opt_ident(args.pop())?;
    let var = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Foreach {
        var,
        key,
        iterable: Box::new(iterable),
        exit: UNLINKED,
    }))
}

fn build_foriter(mut args: Vec<Bound<Kindling>>) -> Result<Reduced<Kindling>, String> {
    let step = one(args.pop())?;
    let cond = one(args.pop())?;
    let init = one(args.pop())?;
    let var = ident(args.pop())?;
    Ok(Reduced::One(Kindling::Foriter {
        var,
        init: Box::new(init),
        cond: Box::new(cond),
        step: Box::new(step),
        exit: UNLINKED,
    }))
}
