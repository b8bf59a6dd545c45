//! Cranelift code generator: turns one instantiation's body into Cranelift
//! IR against a [`FuncBuilder`], the per-function slice of
//! [`crate::driver`]'s JIT module.
//!
//! Built on the standard `JITBuilder`/`JITModule` setup:
//! `declare_function`/`FunctionBuilder`/block lifecycle. rill's statement
//! list has simple block-structured scoping (no SSA merge points beyond
//! `if`/`while`), so this generator uses [`cranelift_frontend::Variable`]
//! mutable slots rather than explicit phi parameters — the simpler of the
//! two idioms `cranelift_frontend`'s own docs recommend, and a better match
//! for a tree-walking generator than hand-rolled phi nodes.

mod expr;
mod stmt;

use crate::cache::Cache;
use crate::error::{InternalError, Result};
use crate::symbols::GlobalScope;
use crate::types::{Kind, Type};
use crate::{bail_internal, constants::Constants};
use cranelift_codegen::ir::{self, InstBuilder, MemFlags, Value};
use cranelift_frontend::{FunctionBuilder, Variable};
use cranelift_jit::JITModule;
use cranelift_module::{FuncId, Module};
use std::collections::HashMap;

/// `FuncId`s for every `rill_runtime` entry point, declared once against the
/// JIT module by [`crate::driver`] and shared read-only by every
/// instantiation compiled into that module.
pub struct RuntimeImports {
    pub ids: HashMap<&'static str, FuncId>,
}

impl RuntimeImports {
    pub fn get(&self, name: &'static str) -> FuncId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("runtime function '{name}' was not registered with the JIT module"))
    }
}

/// One local variable's Cranelift slot and static type, the codegen-side
/// analogue of `symbols::LocalScope`'s `(name, Type)` pairs — kept separate
/// because a type-pass slot and a Cranelift `Variable` serve different
/// owners and needn't share representation.
#[derive(Clone)]
struct LocalSlot {
    var: Variable,
    ty: Type,
    /// True for a method's `_this` slot: the receiver is passed by
    /// reference (see `expr::load_receiver`), so the callee never owns it
    /// and must not destroy it when its scope exits.
    borrowed: bool,
}

/// A value still awaiting destruction at the end of its owning block,
/// mirroring §4.4's "temporaries list" adopt/drain discipline: every
/// heap-kind intermediate result is pushed here when produced and popped
/// (and destroyed) either when adopted by a `let`/assignment/return or when
/// its block exits.
struct Temporary {
    value: Value,
    ty: Type,
}

/// Per-function codegen state: the active `FunctionBuilder`, the scope
/// stack of declared locals, and the pending-destruction temporaries list.
/// Built fresh by [`crate::driver`] for each instantiation and for the
/// top-level `program` function.
pub struct FuncBuilder<'m, 'f> {
    module: &'m mut JITModule,
    builder: FunctionBuilder<'f>,
    runtime: &'m RuntimeImports,
    cache: &'m Cache,
    globals: &'m GlobalScope,
    constants: &'m mut Constants,
    ptr_type: ir::Type,
    /// The `*mut RuntimeContext` passed as this function's first parameter.
    ctx_value: Value,
    /// Each block's locals in declaration order (a `Vec`, not a `HashMap`,
    /// so `pop_scope` can destroy heap-kind locals in the reverse order
    /// they were declared — §4.4's LIFO destruction rule).
    scopes: Vec<Vec<(String, LocalSlot)>>,
    temporaries: Vec<Vec<Temporary>>,
    this_class: Option<String>,
    next_var: usize,
    func_refs: HashMap<&'static str, cranelift_codegen::ir::FuncRef>,
    /// Mangled instantiation name -> the `FuncId` [`crate::driver`] declared
    /// for it. Populated once, before any instantiation body is compiled, so
    /// a call site can reach a callee regardless of declaration order
    /// (mutual recursion).
    instantiation_funcs: &'m HashMap<String, FuncId>,
    inst_func_refs: HashMap<String, cranelift_codegen::ir::FuncRef>,
    /// The function's single exit block, set by [`crate::driver`] before any
    /// statement codegen runs. `return` branches here directly; a block that
    /// falls off its own end also lands here (it is the outermost `merge`
    /// target passed to [`FuncBuilder::gen_block`]).
    func_exit: Option<ir::Block>,
    /// The `_return` slot, `None` for a function/method/program with no
    /// return value.
    return_var: Option<Variable>,
}

impl<'m, 'f> FuncBuilder<'m, 'f> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        module: &'m mut JITModule,
        builder: FunctionBuilder<'f>,
        runtime: &'m RuntimeImports,
        cache: &'m Cache,
        globals: &'m GlobalScope,
        constants: &'m mut Constants,
        ptr_type: ir::Type,
        ctx_value: Value,
        this_class: Option<String>,
        instantiation_funcs: &'m HashMap<String, FuncId>,
    ) -> Self {
        FuncBuilder {
            module,
            builder,
            runtime,
            cache,
            globals,
            constants,
            ptr_type,
            ctx_value,
            scopes: Vec::new(),
            temporaries: Vec::new(),
            this_class,
            next_var: 0,
            func_refs: HashMap::new(),
            instantiation_funcs,
            inst_func_refs: HashMap::new(),
            func_exit: None,
            return_var: None,
        }
    }

    /// Records the function's exit block and `_return` slot (if any),
    /// called once by [`crate::driver`] right after the entry block's
    /// parameters are declared and before any statement codegen.
    pub fn set_function_exit(&mut self, exit: ir::Block, return_var: Option<Variable>) {
        self.func_exit = Some(exit);
        self.return_var = return_var;
    }

    /// Declares a `_return` slot, called by [`crate::driver`] for every
    /// instantiation whose return type is not `None` before any statement
    /// codegen runs, so `gen_return` has somewhere to store into.
    pub fn declare_return_slot(&mut self, ty: &Type) -> Variable {
        self.fresh_var(ty)
    }

    /// Pushes the function's parameter scope and binds each entry-block
    /// value to a fresh local slot (§4.5 step 3: "allocate one mutable slot
    /// per parameter"). Called once by [`crate::driver`], right after the
    /// entry block's own parameters are read out, before compiling the
    /// body.
    pub fn begin_parameter_scope(&mut self, parameters: &[(String, Type, Value)]) {
        self.push_scope();
        for (name, ty, value) in parameters {
            let borrowed = name == "_this";
            self.declare_local_with(name, ty.clone(), *value, borrowed);
        }
    }

    /// Destroys the parameter scope's heap-kind locals. §4.4's `return`
    /// cascade stops one frame short of this one by design (`return` may
    /// fire from arbitrarily deep inside the body, long before the
    /// function's real exit); whichever path reaches the exit block — an
    /// explicit `return` or the body simply falling off its own end — ends
    /// up here exactly once, via [`crate::driver`].
    pub fn end_parameter_scope(&mut self) {
        self.pop_scope();
    }

    /// Reads the `_return` slot's current value, for [`crate::driver`] to
    /// hand to Cranelift's `return` instruction once control reaches the
    /// exit block.
    pub fn read_return_slot(&mut self) -> Option<Value> {
        self.return_var.map(|var| self.builder.use_var(var))
    }

    /// Finishes an instantiation's body once `gen_block` has wired every
    /// path to `exit`: switches into it, destroys the parameter scope
    /// (§4.4 — the one frame `return`'s own cascade deliberately leaves
    /// untouched), reads the `_return` slot (or synthesizes the `I64` zero
    /// every instantiation returns in place of `None`), and closes out the
    /// function.
    pub fn finish_instantiation_exit(&mut self, exit: ir::Block) {
        self.builder.switch_to_block(exit);
        self.builder.seal_block(exit);
        self.end_parameter_scope();
        let result = self
            .read_return_slot()
            .unwrap_or_else(|| self.builder.ins().iconst(ir::types::I64, 0));
        self.builder.ins().return_(&[result]);
        self.builder.seal_all_blocks();
        self.builder.finalize();
    }

    /// Finishes the top-level `program` function's body: the program has no
    /// parameter scope to destroy (its own outermost block owns the
    /// submission's globals directly, per [`FuncBuilder::declares_global`]),
    /// and returns nothing.
    pub fn finish_program_exit(&mut self, exit: ir::Block) {
        self.builder.switch_to_block(exit);
        self.builder.seal_block(exit);
        self.builder.ins().return_(&[]);
        self.builder.seal_all_blocks();
        self.builder.finalize();
    }

    /// The Cranelift storage type backing a rill [`Type`] (§4.4's value
    /// representation table): `Boolean` as `I8`, `Integer` as `I64`,
    /// `Floating` as `F64`, everything else (`None` included — always zero)
    /// as a pointer-width integer or, for the four heap kinds, the target's
    /// native pointer type.
    fn clif_type(&self, ty: &Type) -> ir::Type {
        clif_type_for(ty, self.ptr_type)
    }

    fn is_heap_kind(kind: Kind) -> bool {
        matches!(kind, Kind::Complex | Kind::String | Kind::Instance | Kind::List)
    }

    fn fresh_var(&mut self, ty: &Type) -> Variable {
        let var = Variable::new(self.next_var);
        self.next_var += 1;
        let clif_ty = self.clif_type(ty);
        self.builder.declare_var(var, clif_ty);
        var
    }

    fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
        self.temporaries.push(Vec::new());
    }

    /// Pops the innermost scope, destroying (in reverse declaration order)
    /// every local it owns and every still-pending temporary — §4.4's block
    /// exit discipline.
    fn pop_scope(&mut self) {
        let locals = self.scopes.pop().expect("push_scope/pop_scope are paired");
        let pending = self.temporaries.pop().expect("push_scope/pop_scope are paired");
        for temp in pending.into_iter().rev() {
            self.destroy_value(temp.value, &temp.ty);
        }
        for (_, slot) in locals.into_iter().rev() {
            if !slot.borrowed && Self::is_heap_kind(slot.ty.kind()) {
                let value = self.builder.use_var(slot.var);
                self.destroy_value(value, &slot.ty);
            }
        }
    }

    /// Pops the innermost scope's bookkeeping without emitting any destroy
    /// calls — used after a block whose last statement was a literal
    /// `return`, which has already destroyed this frame's contents itself
    /// (§4.4's return-time cascade) before jumping to the function exit.
    /// Calling the ordinary [`FuncBuilder::pop_scope`] here would append
    /// instructions after that jump, which Cranelift rejects.
    fn discard_scope(&mut self) {
        self.scopes.pop().expect("push_scope/discard_scope are paired");
        self.temporaries.pop().expect("push_scope/discard_scope are paired");
    }

    /// Whether a `let`/list-`let` reached at the current nesting declares a
    /// top-level global rather than a block-local (§4.2's "only the
    /// outermost block of a top-level submission populates `globals`"):
    /// true exactly when exactly one scope is active, which is only ever
    /// the case for the `program` function's own outermost block — every
    /// other function/method always has a leading parameter frame pushed
    /// first, so its own body frame sits at depth 2 even with zero
    /// parameters.
    fn declares_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// `return`'s own cleanup cascade (§4.4): destroys every temporary and
    /// heap-kind local from the current (innermost) frame down to, but not
    /// including, frame 0 (the function's parameter scope — still owned
    /// until the function's real exit, see [`crate::driver`]). Frames are
    /// cleared in place rather than popped, so the ordinary `gen_block`
    /// machinery that owns each frame can still balance its own
    /// push/pop(-or-discard) bookkeeping afterwards without re-destroying
    /// anything.
    fn destroy_frames_above_parameters(&mut self) {
        for idx in (1..self.scopes.len()).rev() {
            let pending = std::mem::take(&mut self.temporaries[idx]);
            for temp in pending.into_iter().rev() {
                self.destroy_value(temp.value, &temp.ty);
            }
            let locals = std::mem::take(&mut self.scopes[idx]);
            for (_, slot) in locals.into_iter().rev() {
                if !slot.borrowed && Self::is_heap_kind(slot.ty.kind()) {
                    let value = self.builder.use_var(slot.var);
                    self.destroy_value(value, &slot.ty);
                }
            }
        }
    }

    fn declare_local(&mut self, name: &str, ty: Type, init: Value) {
        self.declare_local_with(name, ty, init, false);
    }

    fn declare_local_with(&mut self, name: &str, ty: Type, init: Value, borrowed: bool) {
        let var = self.fresh_var(&ty);
        self.builder.def_var(var, init);
        let scope = self.scopes.last_mut().expect("a scope is always pushed before statements run");
        scope.push((name.to_string(), LocalSlot { var, ty, borrowed }));
    }

    /// Looks up a local by walking the scope stack innermost-out, the
    /// codegen mirror of `symbols::ScopeChain::find`.
    fn find_local(&self, name: &str) -> Option<(Variable, Type)> {
        for scope in self.scopes.iter().rev() {
            if let Some((_, slot)) = scope.iter().rev().find(|(n, _)| n == name) {
                return Some((slot.var, slot.ty.clone()));
            }
        }
        None
    }

    fn push_temporary(&mut self, value: Value, ty: Type) {
        if Self::is_heap_kind(ty.kind()) {
            self.temporaries.last_mut().expect("at least one scope is always active").push(Temporary { value, ty });
        }
    }

    /// Removes `value` from the pending-temporaries list without destroying
    /// it — called when a temporary is adopted into a `let`, assignment,
    /// field, list element, or `return` (§4.4's "adopt-on-store").
    fn adopt_temporary(&mut self, value: Value) {
        for frame in self.temporaries.iter_mut().rev() {
            if let Some(pos) = frame.iter().position(|t| t.value == value) {
                frame.remove(pos);
                return;
            }
        }
    }

    fn clone_value(&mut self, value: Value, ty: &Type) -> Value {
        match ty.kind() {
            Kind::Complex => self.call_runtime1("clone_complex", value),
            Kind::String => self.call_runtime1("clone_string", value),
            Kind::Instance => self.call_runtime1("clone_instance", value),
            Kind::List => self.call_runtime1("clone_list", value),
            _ => value,
        }
    }

    fn destroy_value(&mut self, value: Value, ty: &Type) {
        match ty.kind() {
            Kind::Complex => {
                self.call_runtime("destroy_complex", &[value]);
            }
            Kind::String => {
                self.call_runtime("destroy_string", &[value]);
            }
            Kind::Instance => {
                self.call_runtime("destroy_instance", &[value]);
            }
            Kind::List => {
                self.call_runtime("destroy_list", &[value]);
            }
            _ => {}
        }
    }

    /// Imports `name` into the current function (memoized) and emits a call,
    /// returning the raw `Inst` so callers can fetch zero, one, or more
    /// results.
    fn call_runtime(&mut self, name: &'static str, args: &[Value]) -> ir::Inst {
        let func_ref = *self.func_refs.entry(name).or_insert_with(|| {
            let id = self.runtime.get(name);
            self.module.declare_func_in_func(id, self.builder.func)
        });
        self.builder.ins().call(func_ref, args)
    }

    /// Convenience for the overwhelmingly common case of a single-result
    /// call.
    fn call_runtime1(&mut self, name: &'static str, arg: Value) -> Value {
        let call = self.call_runtime(name, &[arg]);
        self.builder.inst_results(call)[0]
    }

    fn call_runtime_n(&mut self, name: &'static str, args: &[Value]) -> Value {
        let call = self.call_runtime(name, args);
        self.builder.inst_results(call)[0]
    }

    /// Calls a JIT-compiled instantiation by its mangled name. Every
    /// instantiation function, whatever its rill return type, is declared
    /// with exactly one Cranelift return value (`I64` zero standing in for
    /// `None`), so this always has exactly one result to hand back.
    fn call_instantiation(&mut self, mangled: &str, args: &[Value]) -> Value {
        let func_ref = if let Some(&f) = self.inst_func_refs.get(mangled) {
            f
        } else {
            let id = *self
                .instantiation_funcs
                .get(mangled)
                .unwrap_or_else(|| panic!("instantiation '{mangled}' was not declared before codegen"));
            let f = self.module.declare_func_in_func(id, self.builder.func);
            self.inst_func_refs.insert(mangled.to_string(), f);
            f
        };
        let call = self.builder.ins().call(func_ref, args);
        self.builder.inst_results(call)[0]
    }

    fn internal(&self, message: impl Into<String>) -> crate::error::Error {
        InternalError {
            file: file!(),
            line: line!(),
            message: message.into(),
        }
        .into()
    }

    /// Loads global slot `index`'s current value through `context_global_slot`,
    /// bit-casting the raw word to `ty`'s Cranelift type.
    fn load_global(&mut self, index: usize, ty: &Type) -> Value {
        let index_val = self.builder.ins().iconst(ir::types::I64, index as i64);
        let slot_ptr = self.call_runtime_n("context_global_slot", &[self.ctx_value, index_val]);
        let clif_ty = self.clif_type(ty);
        self.builder.ins().load(clif_ty, MemFlags::trusted(), slot_ptr, 0)
    }

    fn store_global(&mut self, index: usize, ty: &Type, value: Value) {
        let index_val = self.builder.ins().iconst(ir::types::I64, index as i64);
        let slot_ptr = self.call_runtime_n("context_global_slot", &[self.ctx_value, index_val]);
        let _ = ty;
        self.builder.ins().store(MemFlags::trusted(), value, slot_ptr, 0);
    }

    /// Promotes `(left, left_ty)`/`(right, right_ty)` to a common numeric
    /// Cranelift type per the promotion lattice (§4.2), returning the
    /// promoted values and the [`Kind`] they now share.
    fn promote_pair(&mut self, left: Value, left_ty: Kind, right: Value, right_ty: Kind) -> (Value, Value, Kind) {
        let target = if left_ty.promotion_rank() >= right_ty.promotion_rank() { left_ty } else { right_ty };
        (self.promote_to(left, left_ty, target), self.promote_to(right, right_ty, target), target)
    }

    fn promote_to(&mut self, value: Value, from: Kind, to: Kind) -> Value {
        if from == to {
            return value;
        }
        match (from, to) {
            (Kind::Boolean, Kind::Integer) => self.builder.ins().uextend(ir::types::I64, value),
            (Kind::Boolean, Kind::Floating) => {
                let as_int = self.builder.ins().uextend(ir::types::I64, value);
                self.builder.ins().fcvt_from_sint(ir::types::F64, as_int)
            }
            (Kind::Boolean, Kind::Complex) => {
                let as_float = self.promote_to(value, Kind::Boolean, Kind::Floating);
                self.call_runtime1("float_to_complex", as_float)
            }
            (Kind::Integer, Kind::Floating) => self.builder.ins().fcvt_from_sint(ir::types::F64, value),
            (Kind::Integer, Kind::Complex) => self.call_runtime1("int_to_complex", value),
            (Kind::Floating, Kind::Complex) => self.call_runtime1("float_to_complex", value),
            _ => value,
        }
    }

    /// Boolean truthiness test used by `if`/`while`/`repeat` conditions and
    /// the `not` operator: Cranelift booleans travel as `I8` (0/1), so a
    /// condition value is already a legal `brif`/`select` predicate.
    fn truthy(&mut self, value: Value, ty: &Type) -> Value {
        match ty.kind() {
            Kind::Boolean => value,
            Kind::Integer => {
                let zero = self.builder.ins().iconst(ir::types::I64, 0);
                self.builder.ins().icmp(ir::condcodes::IntCC::NotEqual, value, zero)
            }
            Kind::Floating => {
                let zero = self.builder.ins().f64const(0.0);
                self.builder.ins().fcmp(ir::condcodes::FloatCC::NotEqual, value, zero)
            }
            Kind::String => {
                let len = self.call_runtime1("string_length", value);
                let zero = self.builder.ins().iconst(ir::types::I64, 0);
                self.builder.ins().icmp(ir::condcodes::IntCC::NotEqual, len, zero)
            }
            _ => self.builder.ins().iconst(ir::types::I8, 1),
        }
    }
}

/// The Cranelift storage type backing a rill [`Type`] — a free function so
/// [`crate::driver`] can build a `Signature` for an instantiation before any
/// [`FuncBuilder`] for it exists yet.
pub fn clif_type_for(ty: &Type, ptr_type: ir::Type) -> ir::Type {
    match ty.kind() {
        Kind::None => ir::types::I64,
        Kind::Boolean => ir::types::I8,
        Kind::Integer => ir::types::I64,
        Kind::Floating => ir::types::F64,
        Kind::Complex | Kind::String | Kind::Instance | Kind::List => ptr_type,
    }
}

pub(crate) use expr::ExprResult;
