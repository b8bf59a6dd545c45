//! Statement codegen (§4.4): block entry/exit scoping, assignment forms,
//! control flow, and `return`.
//!
//! Mirrors `crate::infer`'s `infer_stmt` dispatch table statement for
//! statement — by the time a body reaches this generator the type pass has
//! already validated every variant, so this file only has to pick the right
//! runtime call and emit it, never re-check the semantics `infer_stmt`
//! already enforced. `Stmt::Function`/`Stmt::ExprFunction`/`Stmt::Class` are
//! pure template registrations (`crate::cache::Cache::add_function_template`/
//! `add_class_template`, run during the type pass only) and emit no code
//! here.

use super::FuncBuilder;
use crate::error::{LogicError, Result};
use crate::types::{Kind, Type};
use cranelift_codegen::ir::{self, condcodes::IntCC, InstBuilder, Value};
use rill_parser::ast::{Expr, PrintPart, PrintStmt, Stmt, Variable, WhenArm};

impl<'m, 'f> FuncBuilder<'m, 'f> {
    /// Runs `statements` inside a fresh scope, destroying its temporaries and
    /// locals on the way out (§4.4's block-exit discipline) and, unless the
    /// block's last statement was a literal `return` (which has already
    /// jumped away and destroyed this frame itself — see
    /// [`FuncBuilder::gen_return`]), jumping to `merge` if one was given.
    pub(crate) fn gen_block(&mut self, statements: &[Stmt], merge: Option<ir::Block>) -> Result<()> {
        self.push_scope();
        for stmt in statements {
            self.gen_stmt(stmt)?;
        }
        if matches!(statements.last(), Some(Stmt::Return(_))) {
            self.discard_scope();
        } else {
            self.pop_scope();
            if let Some(target) = merge {
                self.builder.ins().jump(target, &[]);
            }
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Print(p) => self.gen_print(p),
            Stmt::Init { name, mutable, value } => self.gen_init(name, *mutable, value),
            Stmt::ListInit { name, mutable, element_type, elements } => {
                self.gen_list_init(name, *mutable, element_type.as_deref(), elements)
            }
            Stmt::Assign { name, value } => self.gen_assign(name, value),
            Stmt::ListAssign { name, indexes, value } => self.gen_list_assign(name, indexes, value),
            Stmt::DataAssign { name, member_list, value } => self.gen_data_assign(name, member_list, value),
            Stmt::DataListAssign { name, member_list, indexes, value } => {
                self.gen_data_list_assign(name, member_list, indexes, value)
            }
            Stmt::If { condition, true_block, false_block } => self.gen_if(condition, true_block, false_block),
            Stmt::While { condition, body } => self.gen_while(condition, body),
            Stmt::Repeat { body, condition } => self.gen_repeat(body, condition),
            Stmt::Case { scrutinee, arms, otherwise } => self.gen_case(scrutinee, arms, otherwise),
            // Pure type-pass registrations; nothing to emit here.
            Stmt::Function(_) | Stmt::ExprFunction { .. } | Stmt::Class { .. } => Ok(()),
            Stmt::FunctionCall { name, args } => self.gen_function_call_stmt(name, args),
            Stmt::MethodCall { name, member_list, method, args } => {
                self.gen_method_call_stmt(name, member_list, method, args)
            }
            Stmt::Return(expr) => self.gen_return(expr.as_ref()),
            Stmt::Expression(expr) => {
                self.gen_expr(expr)?;
                Ok(())
            }
        }
    }

    fn gen_print(&mut self, print_stmt: &PrintStmt) -> Result<()> {
        let mut suppress_newline = false;
        for part in &print_stmt.parts {
            match part {
                PrintPart::Value(expr) => {
                    let r = self.gen_expr(expr)?;
                    self.adopt_temporary(r.value);
                    self.gen_print_value(&r.value, &r.ty);
                    self.destroy_value(r.value, &r.ty);
                    suppress_newline = false;
                }
                PrintPart::Comma => {
                    self.call_runtime("print_comma", &[self.ctx_value]);
                    suppress_newline = true;
                }
            }
        }
        if !suppress_newline {
            self.call_runtime("print_line", &[self.ctx_value]);
        }
        Ok(())
    }

    /// Dispatches to the `print*` runtime entry point matching a value's
    /// kind. `Kind::None` has no print entry point of its own since a rill
    /// expression never statically types as bare `nil` outside an
    /// uninitialized field — it prints the same way a null `Instance` does.
    fn gen_print_value(&mut self, value: &Value, ty: &Type) {
        match ty.kind() {
            Kind::None => {
                let null = self.builder.ins().iconst(self.ptr_type, 0);
                self.call_runtime("print_instance", &[self.ctx_value, null]);
            }
            Kind::Boolean => {
                self.call_runtime("print_bool", &[self.ctx_value, *value]);
            }
            Kind::Integer => {
                self.call_runtime("print_integer", &[self.ctx_value, *value]);
            }
            Kind::Floating => {
                self.call_runtime("print_floating", &[self.ctx_value, *value]);
            }
            Kind::Complex => {
                self.call_runtime("print_complex", &[self.ctx_value, *value]);
            }
            Kind::String => {
                self.call_runtime("print_string", &[self.ctx_value, *value]);
            }
            Kind::Instance => {
                self.call_runtime("print_instance", &[self.ctx_value, *value]);
            }
            Kind::List => {
                self.call_runtime("print_list", &[self.ctx_value, *value]);
            }
        }
    }

    fn gen_init(&mut self, name: &Variable, mutable: bool, value: &Expr) -> Result<()> {
        let r = self.gen_expr(value)?;
        self.adopt_temporary(r.value);
        let ty = if mutable { r.ty.remove_const() } else { r.ty.add_const() };
        self.store_declared(name, ty, r.value);
        Ok(())
    }

    fn gen_list_init(&mut self, name: &Variable, mutable: bool, element_type: Option<&str>, elements: &[Expr]) -> Result<()> {
        let r = self.gen_list_literal(elements, element_type)?;
        self.adopt_temporary(r.value);
        let ty = if mutable { r.ty } else { r.ty.add_const() };
        self.store_declared(name, ty, r.value);
        Ok(())
    }

    /// Shared tail of `Init`/`ListInit`: a global slot if this `let` sits at
    /// the outermost block of the top-level submission, a fresh local
    /// otherwise — see [`FuncBuilder::declares_global`].
    fn store_declared(&mut self, name: &Variable, ty: Type, value: Value) {
        if self.declares_global() {
            let slot = self.globals.find(&name.name).expect("the type pass already registered this global");
            self.store_global(slot, &ty, value);
        } else {
            self.declare_local(&name.name, ty, value);
        }
    }

    fn gen_assign(&mut self, name: &Variable, value: &Expr) -> Result<()> {
        let r = self.gen_expr(value)?;
        self.adopt_temporary(r.value);
        if let Some((var, ty)) = self.find_local(&name.name) {
            let old = self.builder.use_var(var);
            self.destroy_value(old, &ty);
            self.builder.def_var(var, r.value);
            return Ok(());
        }
        let slot = self.globals.find(&name.name).ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
        let ty = self.globals.get_type(slot).expect("slot came from globals").clone();
        let old = self.load_global(slot, &ty);
        self.destroy_value(old, &ty);
        self.store_global(slot, &ty, r.value);
        Ok(())
    }

    fn gen_list_assign(&mut self, name: &Variable, indexes: &[Expr], value: &Expr) -> Result<()> {
        let (list_ptr, ty) = self.load_base_instance(name)?;
        let element_ty = list_element_type(&ty, &name.name)?;
        let elem_ptr = self.list_element_pointer(list_ptr, &indexes[0])?;
        self.overwrite_slot(elem_ptr, &element_ty, value)
    }

    fn gen_data_assign(&mut self, name: &Variable, member_list: &[Variable], value: &Expr) -> Result<()> {
        let (mut ptr, mut ty) = self.load_base_instance(name)?;
        for (i, member) in member_list.iter().enumerate() {
            let (field_ptr, field_ty) = self.field_pointer(ptr, &ty, member)?;
            if i + 1 == member_list.len() {
                return self.overwrite_slot(field_ptr, &field_ty, value);
            }
            ptr = self.builder.ins().load(self.ptr_type, ir::MemFlags::trusted(), field_ptr, 0);
            ty = field_ty;
        }
        unreachable!("DataAssign always has at least one member")
    }

    fn gen_data_list_assign(&mut self, name: &Variable, member_list: &[Variable], indexes: &[Expr], value: &Expr) -> Result<()> {
        let (mut ptr, mut ty) = self.load_base_instance(name)?;
        for member in member_list {
            let (field_ptr, field_ty) = self.field_pointer(ptr, &ty, member)?;
            ptr = self.builder.ins().load(self.ptr_type, ir::MemFlags::trusted(), field_ptr, 0);
            ty = field_ty;
        }
        let element_ty = list_element_type(&ty, &name.name)?;
        let elem_ptr = self.list_element_pointer(ptr, &indexes[0])?;
        self.overwrite_slot(elem_ptr, &element_ty, value)
    }

    /// `*slot_ptr`'s old value is destroyed, `value` is evaluated and stored
    /// in its place — the common tail of every assignment form that targets
    /// a memory slot rather than a Cranelift `Variable` (list elements and
    /// instance fields).
    fn overwrite_slot(&mut self, slot_ptr: Value, slot_ty: &Type, value: &Expr) -> Result<()> {
        let old = self.builder.ins().load(self.clif_type(slot_ty), ir::MemFlags::trusted(), slot_ptr, 0);
        self.destroy_value(old, slot_ty);
        let r = self.gen_expr(value)?;
        self.adopt_temporary(r.value);
        self.builder.ins().store(ir::MemFlags::trusted(), r.value, slot_ptr, 0);
        Ok(())
    }

    /// Address of `list[index]`, the codegen twin of `expr::gen_list_index`
    /// that returns a pointer instead of a loaded-and-cloned value. Bounds
    /// and negative-index resolution happen on the runtime side in
    /// `list_element_ptr`, which also records `IndexOutOfRange` rather than
    /// handing back an address outside the element array.
    fn list_element_pointer(&mut self, list_ptr: Value, index: &Expr) -> Result<Value> {
        let idx = self.gen_expr(index)?;
        self.adopt_temporary(idx.value);
        Ok(self.call_runtime_n("list_element_ptr", &[list_ptr, idx.value]))
    }

    /// Lowers `if`/`else` into a diamond of blocks. A merge block is always
    /// created and sealed, even when both arms end in `return` — any such
    /// merge simply ends up with zero predecessors (dead but legal IR),
    /// which is far simpler than tracking "did every arm terminate" through
    /// arbitrarily nested blocks.
    fn gen_if(&mut self, condition: &Expr, true_block: &[Stmt], false_block: &[Stmt]) -> Result<()> {
        let cond = self.gen_expr(condition)?;
        self.adopt_temporary(cond.value);
        let predicate = self.truthy(cond.value, &cond.ty);
        self.destroy_value(cond.value, &cond.ty);

        let then_blk = self.builder.create_block();
        let else_blk = self.builder.create_block();
        let merge_blk = self.builder.create_block();
        self.builder.ins().brif(predicate, then_blk, &[], else_blk, &[]);

        self.builder.switch_to_block(then_blk);
        self.builder.seal_block(then_blk);
        self.gen_block(true_block, Some(merge_blk))?;

        self.builder.switch_to_block(else_blk);
        self.builder.seal_block(else_blk);
        self.gen_block(false_block, Some(merge_blk))?;

        self.builder.switch_to_block(merge_blk);
        self.builder.seal_block(merge_blk);
        Ok(())
    }

    /// `head` (the condition test) is left unsealed until after `body` has
    /// been generated, since its second predecessor is `body`'s own
    /// back-edge — standard `cranelift_frontend::Variable`-based loop
    /// codegen.
    fn gen_while(&mut self, condition: &Expr, body: &[Stmt]) -> Result<()> {
        let head = self.builder.create_block();
        let body_blk = self.builder.create_block();
        let exit_blk = self.builder.create_block();

        self.builder.ins().jump(head, &[]);
        self.builder.switch_to_block(head);
        let cond = self.gen_expr(condition)?;
        self.adopt_temporary(cond.value);
        let predicate = self.truthy(cond.value, &cond.ty);
        self.destroy_value(cond.value, &cond.ty);
        self.builder.ins().brif(predicate, body_blk, &[], exit_blk, &[]);

        self.builder.switch_to_block(body_blk);
        self.builder.seal_block(body_blk);
        self.gen_block(body, Some(head))?;
        self.builder.seal_block(head);

        self.builder.switch_to_block(exit_blk);
        self.builder.seal_block(exit_blk);
        Ok(())
    }

    /// `repeat ... until condition`: the body always runs once, the loop
    /// continues while the condition is still false. If `body` itself ends
    /// in `return`, the condition check after it would be dead code
    /// appended past a terminator, so it is skipped entirely in that case.
    fn gen_repeat(&mut self, body: &[Stmt], condition: &Expr) -> Result<()> {
        let body_blk = self.builder.create_block();
        let exit_blk = self.builder.create_block();
        let terminates = matches!(body.last(), Some(Stmt::Return(_)));

        self.builder.ins().jump(body_blk, &[]);
        self.builder.switch_to_block(body_blk);
        self.gen_block(body, None)?;
        if !terminates {
            let cond = self.gen_expr(condition)?;
            self.adopt_temporary(cond.value);
            let predicate = self.truthy(cond.value, &cond.ty);
            self.destroy_value(cond.value, &cond.ty);
            self.builder.ins().brif(predicate, exit_blk, &[], body_blk, &[]);
        }
        self.builder.seal_block(body_blk);

        self.builder.switch_to_block(exit_blk);
        self.builder.seal_block(exit_blk);
        Ok(())
    }

    /// `case scrutinee when p1 ... when p2 ... otherwise ...`: a cascade of
    /// pairwise equality tests, first match wins. The scrutinee is read
    /// once; since every comparison only reads through it (never consumes
    /// it), it is destroyed once per exit edge (one of which runs at
    /// runtime) rather than once up front.
    fn gen_case(&mut self, scrutinee: &Expr, arms: &[WhenArm], otherwise: &[Stmt]) -> Result<()> {
        let scrut = self.gen_expr(scrutinee)?;
        self.adopt_temporary(scrut.value);
        let merge = self.builder.create_block();
        let mut check_blk = self.builder.create_block();
        self.builder.ins().jump(check_blk, &[]);

        for arm in arms {
            self.builder.switch_to_block(check_blk);
            self.builder.seal_block(check_blk);
            let pattern = self.gen_expr(&arm.pattern)?;
            self.adopt_temporary(pattern.value);
            let matched = self.gen_case_eq(&scrut, &pattern);
            self.destroy_value(pattern.value, &pattern.ty);

            let body_blk = self.builder.create_block();
            let next_blk = self.builder.create_block();
            self.builder.ins().brif(matched, body_blk, &[], next_blk, &[]);

            self.builder.switch_to_block(body_blk);
            self.builder.seal_block(body_blk);
            self.destroy_value(scrut.value, &scrut.ty);
            self.gen_block(&arm.body, Some(merge))?;

            check_blk = next_blk;
        }

        self.builder.switch_to_block(check_blk);
        self.builder.seal_block(check_blk);
        self.destroy_value(scrut.value, &scrut.ty);
        self.gen_block(otherwise, Some(merge))?;

        self.builder.switch_to_block(merge);
        self.builder.seal_block(merge);
        Ok(())
    }

    fn gen_case_eq(&mut self, a: &super::ExprResult, b: &super::ExprResult) -> Value {
        if a.ty.kind() == Kind::String || b.ty.kind() == Kind::String {
            let cmp = self.call_runtime_n("compare_string", &[a.value, b.value]);
            let zero = self.builder.ins().iconst(ir::types::I32, 0);
            return self.builder.ins().icmp(IntCC::Equal, cmp, zero);
        }
        if a.ty.kind() == Kind::Complex || b.ty.kind() == Kind::Complex {
            let av = self.promote_to(a.value, a.ty.kind(), Kind::Complex);
            let bv = self.promote_to(b.value, b.ty.kind(), Kind::Complex);
            let code = self.builder.ins().iconst(ir::types::I8, rill_runtime::ops::EQUAL as i64);
            return self.call_runtime_n("complex_compare", &[code, av, bv]);
        }
        let (av, bv, kind) = self.promote_pair(a.value, a.ty.kind(), b.value, b.ty.kind());
        if kind == Kind::Floating {
            self.builder.ins().fcmp(ir::condcodes::FloatCC::Equal, av, bv)
        } else {
            self.builder.ins().icmp(IntCC::Equal, av, bv)
        }
    }

    /// A call in statement position: same codegen as the expression form,
    /// its result simply left in the pending-temporaries list to be
    /// destroyed at this block's own exit rather than adopted anywhere.
    fn gen_function_call_stmt(&mut self, name: &str, args: &[Expr]) -> Result<()> {
        let call = Expr::FunctionCall { name: name.to_string(), args: args.to_vec() };
        self.gen_expr(&call)?;
        Ok(())
    }

    fn gen_method_call_stmt(&mut self, name: &Variable, member_list: &[Variable], method: &str, args: &[Expr]) -> Result<()> {
        let call = Expr::MethodCall {
            name: name.clone(),
            member_list: member_list.to_vec(),
            method: method.to_string(),
            args: args.to_vec(),
        };
        self.gen_expr(&call)?;
        Ok(())
    }

    /// `return [expr]`: stores into the `_return` slot (adopting, never
    /// cloning, the returned value), destroys every frame above the
    /// function's own parameter scope *including the current block's own
    /// frame* (the current block's own `gen_block` caller is relying on
    /// exactly that — see its `discard_scope` branch), then jumps straight
    /// to the function's exit block.
    fn gen_return(&mut self, expr: Option<&Expr>) -> Result<()> {
        if let Some(e) = expr {
            let r = self.gen_expr(e)?;
            self.adopt_temporary(r.value);
            if let Some(var) = self.return_var {
                self.builder.def_var(var, r.value);
            } else {
                self.destroy_value(r.value, &r.ty);
            }
        }
        self.destroy_frames_above_parameters();
        let exit = self.func_exit.expect("driver sets func_exit before compiling any statement");
        self.builder.ins().jump(exit, &[]);
        Ok(())
    }
}

/// Unwraps a list's element type for `ListAssign`/`DataListAssign`, erroring
/// the way `expr::gen_list_index` does when `name` doesn't actually name a
/// list.
fn list_element_type(ty: &Type, name: &str) -> Result<Type> {
    match ty {
        Type::List { element, .. } => Ok((**element).clone().remove_const()),
        _ => Err(LogicError::BadObject(name.to_string()).into()),
    }
}
