//! Expression codegen (§4.3): one Cranelift value (plus its static [`Type`])
//! per AST node, with numeric promotion and heap-kind temporaries tracked
//! exactly as the type pass already validated them.

use super::FuncBuilder;
use crate::error::{LogicError, Result};
use crate::infer;
use crate::types::{self, ConvTarget, Kind, Type};
use cranelift_codegen::ir::{self, condcodes::IntCC, InstBuilder, Value};
use rill_parser::ast::{Expr, Literal, Operator};

/// One expression's compiled value together with its static type — codegen
/// needs the type at essentially every call site (to pick the right runtime
/// entry point, to decide whether a clone/destroy is owed, to promote a
/// numeric operand), so it travels alongside the `Value` rather than being
/// re-derived by the caller.
pub(crate) struct ExprResult {
    pub value: Value,
    pub ty: Type,
}

impl<'m, 'f> FuncBuilder<'m, 'f> {
    /// The static type of `expr`, recomputed by the same rules
    /// [`crate::infer::TypeEngine`] used during the type pass. Safe to call
    /// repeatedly: every function/method call this can reach was already
    /// instantiated by that pass, so the cache lookups here are pure reads.
    pub(crate) fn static_type(&self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::Literal(lit) => Ok(infer::literal_type(lit)),
            Expr::This => self
                .find_local("_this")
                .map(|(_, ty)| ty)
                .ok_or_else(|| LogicError::VariableNotExist("this".to_string()).into()),
            Expr::Variable(v) => self
                .find_local(&v.name)
                .map(|(_, ty)| ty.remove_const())
                .or_else(|| self.global_type(&v.name))
                .ok_or_else(|| LogicError::VariableNotExist(v.name.clone()).into()),
            Expr::DataMember { name, member_list } => Ok(self.member_chain_type(name, member_list)?.remove_const()),
            Expr::Unary { op, operand } => infer::unary_result(*op, &self.static_type(operand)?),
            Expr::Binary { op, left, right } => {
                infer::binary_result(*op, &self.static_type(left)?, &self.static_type(right)?)
            }
            Expr::CompareChain { .. } => Ok(Type::scalar(Kind::Boolean)),
            Expr::FunctionCall { name, args } => self.call_return_type(name, args),
            Expr::MethodCall { name, member_list, method, args } => {
                self.method_return_type(name, member_list, method, args)
            }
            Expr::UserInput => Ok(Type::scalar(Kind::String)),
            Expr::TypeConv { to_type, .. } => Ok(ConvTarget::parse(to_type)
                .ok_or_else(|| LogicError::BadConvType(to_type.clone()))?
                .result_type()),
            Expr::List { elements, element_type } => {
                let element = if let Some(first) = elements.first() {
                    self.static_type(first)?
                } else {
                    ConvTarget::parse(element_type.as_deref().unwrap_or(""))
                        .map(ConvTarget::result_type)
                        .ok_or(LogicError::EmptyListNeedsType)?
                };
                Ok(Type::List { element: Box::new(element.remove_const()), is_const: false })
            }
            Expr::ListIndex { name, .. } => {
                let ty = self
                    .find_local(&name.name)
                    .map(|(_, ty)| ty)
                    .or_else(|| self.global_type(&name.name))
                    .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
                match ty {
                    Type::List { element, .. } => Ok((*element).remove_const()),
                    _ => Err(LogicError::BadObject(name.name.clone()).into()),
                }
            }
            Expr::DataListIndex { name, member_list, .. } => {
                match self.member_chain_type(name, member_list)? {
                    Type::List { element, .. } => Ok((*element).remove_const()),
                    _ => Err(LogicError::BadObject(name.name.clone()).into()),
                }
            }
        }
    }

    fn global_type(&self, name: &str) -> Option<Type> {
        self.globals.find(name).and_then(|slot| self.globals.get_type(slot)).cloned().map(|t| t.remove_const())
    }

    fn member_chain_type(&self, name: &rill_parser::ast::Variable, member_list: &[rill_parser::ast::Variable]) -> Result<Type> {
        let mut current = if name.name == "this" {
            self.find_local("_this").map(|(_, ty)| ty).ok_or_else(|| LogicError::VariableNotExist("this".to_string()))?
        } else {
            self.find_local(&name.name)
                .map(|(_, ty)| ty)
                .or_else(|| self.global_type(&name.name))
                .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?
        };
        for member in member_list {
            let Type::Instance { class_name, field_types, .. } = &current else {
                return Err(LogicError::BadObject(name.name.clone()).into());
            };
            let template = self.cache.class_template(class_name).ok_or_else(|| LogicError::BadObject(class_name.clone()))?;
            let idx = template.member_index(&member.name).ok_or_else(|| LogicError::BadObject(member.name.clone()))?;
            current = field_types.get(idx).cloned().unwrap_or(Type::scalar(Kind::None));
        }
        Ok(current)
    }

    fn call_return_type(&self, name: &str, args: &[Expr]) -> Result<Type> {
        if self.cache.has_class(name) {
            let arg_types: Vec<Type> = args.iter().map(|a| self.static_type(a)).collect::<Result<_>>()?;
            return Ok(Type::instance(name, arg_types.into_iter().map(|t| t.remove_const()).collect()));
        }
        let arg_types: Vec<Type> = args.iter().map(|a| self.static_type(a)).collect::<Result<_>>()?;
        let mangled = types::mangle(name, &arg_types);
        match self.cache.instantiation_return_type(&mangled) {
            Some(Some(ty)) => Ok(ty.clone()),
            Some(None) => Ok(Type::scalar(Kind::None)),
            None => Err(LogicError::CallableNotExist(name.to_string()).into()),
        }
    }

    fn method_return_type(
        &self,
        name: &rill_parser::ast::Variable,
        member_list: &[rill_parser::ast::Variable],
        method: &str,
        args: &[Expr],
    ) -> Result<Type> {
        let receiver_ty = if member_list.is_empty() {
            if name.name == "this" {
                self.find_local("_this").map(|(_, ty)| ty).ok_or_else(|| LogicError::VariableNotExist("this".to_string()))?
            } else {
                self.find_local(&name.name)
                    .map(|(_, ty)| ty)
                    .or_else(|| self.global_type(&name.name))
                    .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?
            }
        } else {
            self.member_chain_type(name, member_list)?
        };
        let Type::Instance { class_name, .. } = &receiver_ty else {
            return Err(LogicError::BadObject(name.name.clone()).into());
        };
        let mut full_types = vec![receiver_ty.clone()];
        for a in args {
            full_types.push(self.static_type(a)?);
        }
        let mangled = types::mangle(&format!("{class_name}.{method}"), &full_types);
        match self.cache.instantiation_return_type(&mangled) {
            Some(Some(ty)) => Ok(ty.clone()),
            Some(None) => Ok(Type::scalar(Kind::None)),
            None => Err(LogicError::CallableNotExist(method.to_string()).into()),
        }
    }

    pub(crate) fn gen_expr(&mut self, expr: &Expr) -> Result<ExprResult> {
        match expr {
            Expr::Literal(lit) => self.gen_literal(lit),
            Expr::This => self.gen_variable_read("_this", true),
            Expr::Variable(v) => self.gen_variable_read(&v.name, false),
            Expr::DataMember { name, member_list } => self.gen_member_read(name, member_list),
            Expr::Unary { op, operand } => self.gen_unary(*op, operand),
            Expr::Binary { op, left, right } => self.gen_binary(*op, left, right),
            Expr::CompareChain { ops, operands } => self.gen_compare_chain(ops, operands),
            Expr::FunctionCall { name, args } => self.gen_call(name, args),
            Expr::MethodCall { name, member_list, method, args } => self.gen_method_call(name, member_list, method, args),
            Expr::UserInput => {
                let value = self.call_runtime1("user_input", self.ctx_value);
                Ok(ExprResult { value, ty: Type::scalar(Kind::String) })
            }
            Expr::TypeConv { to_type, expr } => self.gen_conversion(to_type, expr),
            Expr::List { elements, element_type } => self.gen_list_literal(elements, element_type.as_deref()),
            Expr::ListIndex { name, indexes } => self.gen_list_index(name, indexes),
            Expr::DataListIndex { name, member_list, indexes } => self.gen_data_list_index(name, member_list, indexes),
        }
    }

    /// Free-function call or class construction. Both read every argument
    /// once (adopting its temporary so the callee — not this call site —
    /// owns the value) and hand the results straight to the callee/
    /// constructor, matching §4.4's "arguments are passed by ownership
    /// transfer, never cloned a second time at the call boundary".
    fn gen_call(&mut self, name: &str, args: &[Expr]) -> Result<ExprResult> {
        if self.cache.has_class(name) {
            return self.gen_construct(name, args);
        }
        let arg_results: Vec<ExprResult> = args.iter().map(|a| self.gen_expr(a)).collect::<Result<_>>()?;
        for r in &arg_results {
            self.adopt_temporary(r.value);
        }
        let arg_types: Vec<Type> = arg_results.iter().map(|r| r.ty.clone()).collect();
        let mangled = types::mangle(name, &arg_types);
        let return_ty = match self.cache.instantiation_return_type(&mangled) {
            Some(Some(ty)) => ty.clone(),
            Some(None) => Type::scalar(Kind::None),
            None => return Err(LogicError::CallableNotExist(name.to_string()).into()),
        };
        let mut call_args = vec![self.ctx_value];
        call_args.extend(arg_results.iter().map(|r| r.value));
        let value = self.call_instantiation(&mangled, &call_args);
        self.push_temporary(value, return_ty.clone());
        Ok(ExprResult { value, ty: return_ty })
    }

    fn gen_method_call(
        &mut self,
        name: &rill_parser::ast::Variable,
        member_list: &[rill_parser::ast::Variable],
        method: &str,
        args: &[Expr],
    ) -> Result<ExprResult> {
        let (receiver_ptr, receiver_ty) = self.load_receiver(name, member_list)?;
        let Type::Instance { class_name, .. } = &receiver_ty else {
            return Err(LogicError::BadObject(name.name.clone()).into());
        };
        let class_name = class_name.clone();
        let arg_results: Vec<ExprResult> = args.iter().map(|a| self.gen_expr(a)).collect::<Result<_>>()?;
        for r in &arg_results {
            self.adopt_temporary(r.value);
        }
        let mut full_types = vec![receiver_ty.clone()];
        full_types.extend(arg_results.iter().map(|r| r.ty.clone()));
        let mangled = types::mangle(&format!("{class_name}.{method}"), &full_types);
        let return_ty = match self.cache.instantiation_return_type(&mangled) {
            Some(Some(ty)) => ty.clone(),
            Some(None) => Type::scalar(Kind::None),
            None => return Err(LogicError::CallableNotExist(method.to_string()).into()),
        };
        let mut call_args = vec![self.ctx_value, receiver_ptr];
        call_args.extend(arg_results.iter().map(|r| r.value));
        let value = self.call_instantiation(&mangled, &call_args);
        self.push_temporary(value, return_ty.clone());
        Ok(ExprResult { value, ty: return_ty })
    }

    /// Resolves a method-call receiver's instance pointer through the field
    /// chain without cloning: the receiver is passed to the method by
    /// reference, so ownership never leaves the caller's variable or field.
    /// Shares `load_base_instance`/`field_pointer` with `gen_member_read`,
    /// but (unlike that function) never clones the value it lands on, not
    /// even the last member in the chain.
    fn load_receiver(&mut self, name: &rill_parser::ast::Variable, member_list: &[rill_parser::ast::Variable]) -> Result<(Value, Type)> {
        let (mut instance_ptr, mut current_ty) = self.load_base_instance(name)?;
        for member in member_list {
            let (field_ptr, field_ty) = self.field_pointer(instance_ptr, &current_ty, member)?;
            instance_ptr = self.builder.ins().load(self.clif_type(&field_ty), ir::MemFlags::trusted(), field_ptr, 0);
            current_ty = field_ty;
        }
        Ok((instance_ptr, current_ty))
    }

    /// `ClassName(args...)`: allocates the instance shell, then writes each
    /// evaluated argument directly into the corresponding field slot —
    /// construction is the one place a value moves straight from an
    /// expression result into heap storage without passing through a named
    /// local first.
    fn gen_construct(&mut self, class_name: &str, args: &[Expr]) -> Result<ExprResult> {
        let arg_results: Vec<ExprResult> = args.iter().map(|a| self.gen_expr(a)).collect::<Result<_>>()?;
        for r in &arg_results {
            self.adopt_temporary(r.value);
        }
        let field_types: Vec<Type> = arg_results.iter().map(|r| r.ty.clone()).collect();
        let field_count = field_types.len();

        let kinds_slot = self.builder.create_sized_stack_slot(ir::StackSlotData::new(
            ir::StackSlotKind::ExplicitSlot,
            field_count.max(1) as u32,
            0,
        ));
        for (i, ty) in field_types.iter().enumerate() {
            let tag = self.builder.ins().iconst(ir::types::I8, ty.kind().raw_tag() as i64);
            self.builder.ins().stack_store(tag, kinds_slot, i as i32);
        }
        let kinds_ptr = self.builder.ins().stack_addr(self.ptr_type, kinds_slot, 0);

        let name_index = self.constants.add_string(class_name) as i64;
        let constants_ptr = self.call_runtime1("context_constants_ptr", self.ctx_value);
        let idx_val = self.builder.ins().iconst(ir::types::I64, name_index);
        let name_value = self.call_runtime_n("constants_get_string", &[constants_ptr, idx_val]);

        let count_val = self.builder.ins().iconst(ir::types::I64, field_count as i64);
        let instance_ptr = self.call_runtime_n("make_instance_named", &[name_value, count_val, kinds_ptr]);
        self.call_runtime("destroy_string", &[name_value]);

        let fields_array = self.call_runtime1("instance_fields_ptr", instance_ptr);
        for (i, r) in arg_results.iter().enumerate() {
            let offset = (i * std::mem::size_of::<u64>()) as i32;
            let ptr = self.builder.ins().iadd_imm(fields_array, offset as i64);
            self.builder.ins().store(ir::MemFlags::trusted(), r.value, ptr, 0);
        }

        let ty = Type::instance(class_name, field_types);
        self.push_temporary(instance_ptr, ty.clone());
        Ok(ExprResult { value: instance_ptr, ty })
    }

    fn gen_literal(&mut self, lit: &Literal) -> Result<ExprResult> {
        let (value, ty) = match lit {
            Literal::Nil => (self.builder.ins().iconst(ir::types::I64, 0), Type::scalar(Kind::None)),
            Literal::Bool(b) => (self.builder.ins().iconst(ir::types::I8, *b as i64), Type::scalar(Kind::Boolean)),
            Literal::Int(i) => (self.builder.ins().iconst(ir::types::I64, *i), Type::scalar(Kind::Integer)),
            Literal::Float(f) => (self.builder.ins().f64const(*f), Type::scalar(Kind::Floating)),
            Literal::Complex(re, im) => {
                let index = self.constants.add_complex(*re, *im) as i64;
                let constants_ptr = self.call_runtime1("context_constants_ptr", self.ctx_value);
                let idx_val = self.builder.ins().iconst(ir::types::I64, index);
                let value = self.call_runtime_n("constants_get_complex", &[constants_ptr, idx_val]);
                (value, Type::scalar(Kind::Complex))
            }
            Literal::Str(s) => {
                let index = self.constants.add_string(s) as i64;
                let constants_ptr = self.call_runtime1("context_constants_ptr", self.ctx_value);
                let idx_val = self.builder.ins().iconst(ir::types::I64, index);
                let value = self.call_runtime_n("constants_get_string", &[constants_ptr, idx_val]);
                (value, Type::scalar(Kind::String))
            }
        };
        self.push_temporary(value, ty.clone());
        Ok(ExprResult { value, ty })
    }

    fn gen_variable_read(&mut self, name: &str, is_this: bool) -> Result<ExprResult> {
        let _ = is_this;
        if let Some((var, ty)) = self.find_local(name) {
            let raw = self.builder.use_var(var);
            let value = self.clone_value(raw, &ty);
            self.push_temporary(value, ty.clone());
            return Ok(ExprResult { value, ty: ty.remove_const() });
        }
        let slot = self
            .globals
            .find(name)
            .ok_or_else(|| LogicError::VariableNotExist(name.to_string()))?;
        let ty = self.globals.get_type(slot).expect("slot came from globals").clone();
        let raw = self.load_global(slot, &ty);
        let value = self.clone_value(raw, &ty);
        self.push_temporary(value, ty.clone());
        Ok(ExprResult { value, ty: ty.remove_const() })
    }

    /// Resolves a `name.member.member...` chain down to the field slot,
    /// reading the instance pointer at each step without adopting/cloning
    /// intermediate instances (only the final scalar/heap field is cloned
    /// out, matching §4.3's "field access reads through the chain, clones
    /// only the leaf").
    fn gen_member_read(&mut self, name: &rill_parser::ast::Variable, member_list: &[rill_parser::ast::Variable]) -> Result<ExprResult> {
        let (mut instance_ptr, mut current_ty) = self.load_base_instance(name)?;
        for (i, member) in member_list.iter().enumerate() {
            let (field_ptr, field_ty) = self.field_pointer(instance_ptr, &current_ty, member)?;
            if i + 1 == member_list.len() {
                let raw = self.builder.ins().load(self.clif_type(&field_ty), ir::MemFlags::trusted(), field_ptr, 0);
                let value = self.clone_value(raw, &field_ty);
                self.push_temporary(value, field_ty.clone());
                return Ok(ExprResult { value, ty: field_ty.remove_const() });
            }
            instance_ptr = self.builder.ins().load(self.ptr_type, ir::MemFlags::trusted(), field_ptr, 0);
            current_ty = field_ty;
        }
        unreachable!("DataMember always has at least one member")
    }

    pub(super) fn load_base_instance(&mut self, name: &rill_parser::ast::Variable) -> Result<(Value, Type)> {
        if name.name == "this" {
            let (var, ty) = self.find_local("_this").ok_or_else(|| LogicError::VariableNotExist("this".to_string()))?;
            return Ok((self.builder.use_var(var), ty));
        }
        if let Some((var, ty)) = self.find_local(&name.name) {
            return Ok((self.builder.use_var(var), ty));
        }
        let slot = self.globals.find(&name.name).ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
        let ty = self.globals.get_type(slot).expect("slot came from globals").clone();
        Ok((self.load_global(slot, &ty), ty))
    }

    /// Byte offset + static type of `instance.member`, where `Instance`'s
    /// Cranelift layout mirrors [`rill_runtime::heap::Instance`]'s
    /// `#[repr(C)]` field order.
    pub(super) fn field_pointer(&mut self, instance_ptr: Value, instance_ty: &Type, member: &rill_parser::ast::Variable) -> Result<(Value, Type)> {
        let Type::Instance { class_name, field_types, .. } = instance_ty else {
            return Err(LogicError::BadObject(member.name.clone()).into());
        };
        let template = self.cache.class_template(class_name).ok_or_else(|| LogicError::BadObject(class_name.clone()))?;
        let idx = template.member_index(&member.name).ok_or_else(|| LogicError::BadObject(member.name.clone()))?;
        let field_ty = field_types.get(idx).cloned().unwrap_or(Type::scalar(Kind::None));
        let fields_array = self.call_runtime1("instance_fields_ptr", instance_ptr);
        let offset = (idx * std::mem::size_of::<u64>()) as i32;
        let field_ptr = self.builder.ins().iadd_imm(fields_array, offset as i64);
        Ok((field_ptr, field_ty))
    }

    fn gen_unary(&mut self, op: Operator, operand: &Expr) -> Result<ExprResult> {
        let operand_result = self.gen_expr(operand)?;
        self.adopt_temporary(operand_result.value);
        let result_ty = infer::unary_result(op, &operand_result.ty)?;
        let value = match op {
            Operator::Minus => match operand_result.ty.kind() {
                Kind::Integer => self.builder.ins().ineg(operand_result.value),
                Kind::Floating => self.builder.ins().fneg(operand_result.value),
                Kind::Complex => {
                    let v = self.call_runtime1("complex_negate", operand_result.value);
                    self.destroy_value(operand_result.value, &operand_result.ty);
                    v
                }
                _ => self.builder.ins().ineg(operand_result.value),
            },
            Operator::Not => {
                let truthy = self.truthy(operand_result.value, &operand_result.ty);
                self.builder.ins().bxor_imm(truthy, 1)
            }
            Operator::Compl => self.builder.ins().bnot(operand_result.value),
            Operator::Bang => match &operand_result.ty {
                Type::List { .. } => self.call_runtime1("list_length", operand_result.value),
                _ => self.call_runtime1("string_length", operand_result.value),
            },
            Operator::Question => {
                let name = operand_result.ty.display_name();
                let index = self.constants.add_string(&name) as i64;
                let constants_ptr = self.call_runtime1("context_constants_ptr", self.ctx_value);
                let idx_val = self.builder.ins().iconst(ir::types::I64, index);
                self.call_runtime_n("constants_get_string", &[constants_ptr, idx_val])
            }
            _ => return Err(self.internal(format!("{op:?} is not a unary operator"))),
        };
        if !matches!(op, Operator::Bang) {
            self.destroy_if_heap(operand_result.value, &operand_result.ty, matches!(op, Operator::Minus));
        } else {
            self.destroy_value(operand_result.value, &operand_result.ty);
        }
        self.push_temporary(value, result_ty.clone());
        Ok(ExprResult { value, ty: result_ty })
    }

    /// Frees `value` unless `already_consumed` (the `Complex` negate path
    /// already destroyed its operand after reading it).
    fn destroy_if_heap(&mut self, value: Value, ty: &Type, already_consumed: bool) {
        if !already_consumed {
            self.destroy_value(value, ty);
        }
    }

    fn gen_binary(&mut self, op: Operator, left: &Expr, right: &Expr) -> Result<ExprResult> {
        let l = self.gen_expr(left)?;
        let r = self.gen_expr(right)?;
        self.adopt_temporary(l.value);
        self.adopt_temporary(r.value);
        let result_ty = infer::binary_result(op, &l.ty, &r.ty)?;

        let value = if l.ty.kind() == Kind::String || r.ty.kind() == Kind::String {
            self.gen_string_binary(op, &l, &r)
        } else if matches!(l.ty, Type::List { .. }) {
            self.gen_list_concat(&l, &r)
        } else if l.ty.kind() == Kind::Complex || r.ty.kind() == Kind::Complex {
            self.gen_complex_binary(op, &l, &r)
        } else {
            self.gen_scalar_binary(op, &l, &r)
        };
        self.destroy_value(l.value, &l.ty);
        self.destroy_value(r.value, &r.ty);
        self.push_temporary(value, result_ty.clone());
        Ok(ExprResult { value, ty: result_ty })
    }

    /// Strings only support `+` (concatenation) and `==`/`!=` (byte
    /// equality) — `infer::binary_scalar_result` rejects every other
    /// operator before this is ever reached, so string ordering
    /// (`<`/`<=`/`>`/`>=`) has no lowering here.
    fn gen_string_binary(&mut self, op: Operator, l: &ExprResult, r: &ExprResult) -> Value {
        match op {
            Operator::Plus => self.call_runtime_n("concat_string", &[l.value, r.value]),
            _ => {
                let cmp = self.call_runtime_n("compare_string", &[l.value, r.value]);
                let zero = self.builder.ins().iconst(ir::types::I32, 0);
                let cc = if op == Operator::NotEqual { IntCC::NotEqual } else { IntCC::Equal };
                self.builder.ins().icmp(cc, cmp, zero)
            }
        }
    }

    fn gen_list_concat(&mut self, l: &ExprResult, r: &ExprResult) -> Value {
        self.call_runtime_n("concat_list", &[l.value, r.value])
    }

    fn gen_complex_binary(&mut self, op: Operator, l: &ExprResult, r: &ExprResult) -> Value {
        let lv = self.promote_to(l.value, l.ty.kind(), Kind::Complex);
        let rv = self.promote_to(r.value, r.ty.kind(), Kind::Complex);
        match op {
            Operator::Equal | Operator::NotEqual => {
                let op_code = if op == Operator::Equal { rill_runtime::ops::EQUAL } else { rill_runtime::ops::NOT_EQUAL };
                let code = self.builder.ins().iconst(ir::types::I8, op_code as i64);
                self.call_runtime_n("complex_compare", &[code, lv, rv])
            }
            Operator::Exponent => self.call_runtime_n("complex_pow", &[lv, rv]),
            _ => {
                let op_code = match op {
                    Operator::Plus => rill_runtime::ops::PLUS,
                    Operator::Minus => rill_runtime::ops::MINUS,
                    Operator::Times => rill_runtime::ops::TIMES,
                    Operator::Divide => rill_runtime::ops::DIVIDE,
                    _ => rill_runtime::ops::PLUS,
                };
                let code = self.builder.ins().iconst(ir::types::I8, op_code as i64);
                self.call_runtime_n("complex_arith", &[code, lv, rv])
            }
        }
    }

    fn gen_scalar_binary(&mut self, op: Operator, l: &ExprResult, r: &ExprResult) -> Value {
        let (lv, rv, kind) = self.promote_pair(l.value, l.ty.kind(), r.value, r.ty.kind());
        match op {
            Operator::Plus => self.arith(kind, lv, rv, InstBuilderArith::Add),
            Operator::Minus => self.arith(kind, lv, rv, InstBuilderArith::Sub),
            Operator::Times => self.arith(kind, lv, rv, InstBuilderArith::Mul),
            Operator::Divide => {
                if kind == Kind::Integer {
                    let lf = self.promote_to(lv, Kind::Integer, Kind::Floating);
                    let rf = self.promote_to(rv, Kind::Integer, Kind::Floating);
                    self.builder.ins().fdiv(lf, rf)
                } else {
                    self.builder.ins().fdiv(lv, rv)
                }
            }
            Operator::FloorDivide => self.builder.ins().sdiv(lv, rv),
            Operator::Modulo => self.builder.ins().srem(lv, rv),
            Operator::Exponent => self.gen_exponent(kind, lv, rv),
            Operator::BitAnd => self.builder.ins().band(lv, rv),
            Operator::BitOr => self.builder.ins().bor(lv, rv),
            Operator::BitXor => self.builder.ins().bxor(lv, rv),
            Operator::Equal | Operator::NotEqual | Operator::Less | Operator::LessEqual | Operator::Greater | Operator::GreaterEqual => {
                self.gen_compare(kind, op, lv, rv)
            }
            _ => lv,
        }
    }

    fn gen_exponent(&mut self, kind: Kind, lv: Value, rv: Value) -> Value {
        if kind == Kind::Integer {
            let lf = self.promote_to(lv, Kind::Integer, Kind::Floating);
            let rf = self.promote_to(rv, Kind::Integer, Kind::Floating);
            self.call_runtime_n("pow", &[lf, rf])
        } else {
            self.call_runtime_n("pow", &[lv, rv])
        }
    }

    fn arith(&mut self, kind: Kind, lv: Value, rv: Value, op: InstBuilderArith) -> Value {
        match (kind, op) {
            (Kind::Floating, InstBuilderArith::Add) => self.builder.ins().fadd(lv, rv),
            (Kind::Floating, InstBuilderArith::Sub) => self.builder.ins().fsub(lv, rv),
            (Kind::Floating, InstBuilderArith::Mul) => self.builder.ins().fmul(lv, rv),
            (_, InstBuilderArith::Add) => self.builder.ins().iadd(lv, rv),
            (_, InstBuilderArith::Sub) => self.builder.ins().isub(lv, rv),
            (_, InstBuilderArith::Mul) => self.builder.ins().imul(lv, rv),
        }
    }

    fn gen_compare(&mut self, kind: Kind, op: Operator, lv: Value, rv: Value) -> Value {
        if kind == Kind::Floating {
            let cc = match op {
                Operator::Equal => ir::condcodes::FloatCC::Equal,
                Operator::NotEqual => ir::condcodes::FloatCC::NotEqual,
                Operator::Less => ir::condcodes::FloatCC::LessThan,
                Operator::LessEqual => ir::condcodes::FloatCC::LessThanOrEqual,
                Operator::Greater => ir::condcodes::FloatCC::GreaterThan,
                Operator::GreaterEqual => ir::condcodes::FloatCC::GreaterThanOrEqual,
                _ => ir::condcodes::FloatCC::Equal,
            };
            self.builder.ins().fcmp(cc, lv, rv)
        } else {
            let cc = match op {
                Operator::Equal => IntCC::Equal,
                Operator::NotEqual => IntCC::NotEqual,
                Operator::Less => IntCC::SignedLessThan,
                Operator::LessEqual => IntCC::SignedLessThanOrEqual,
                Operator::Greater => IntCC::SignedGreaterThan,
                Operator::GreaterEqual => IntCC::SignedGreaterThanOrEqual,
                _ => IntCC::Equal,
            };
            self.builder.ins().icmp(cc, lv, rv)
        }
    }

    /// `a < b < c`-style chains: each pairwise comparison is evaluated and
    /// the results folded with logical `and`, short-circuiting is not
    /// attempted since every operand must be evaluated regardless (§3).
    fn gen_compare_chain(&mut self, ops: &[Operator], operands: &[Expr]) -> Result<ExprResult> {
        let evaluated: Vec<ExprResult> = operands.iter().map(|e| self.gen_expr(e)).collect::<Result<_>>()?;
        for r in &evaluated {
            self.adopt_temporary(r.value);
        }
        let mut acc: Option<Value> = None;
        for (op, pair) in ops.iter().zip(evaluated.windows(2)) {
            let step = if pair[0].ty.kind() == Kind::String || pair[1].ty.kind() == Kind::String {
                self.gen_string_binary(*op, &pair[0], &pair[1])
            } else if pair[0].ty.kind() == Kind::Complex || pair[1].ty.kind() == Kind::Complex {
                self.gen_complex_binary(*op, &pair[0], &pair[1])
            } else {
                let (lv, rv, kind) = self.promote_pair(pair[0].value, pair[0].ty.kind(), pair[1].value, pair[1].ty.kind());
                self.gen_compare(kind, *op, lv, rv)
            };
            acc = Some(match acc {
                None => step,
                Some(prev) => self.builder.ins().band(prev, step),
            });
        }
        for r in &evaluated {
            self.destroy_value(r.value, &r.ty);
        }
        let value = acc.unwrap_or_else(|| self.builder.ins().iconst(ir::types::I8, 1));
        self.push_temporary(value, Type::scalar(Kind::Boolean));
        Ok(ExprResult { value, ty: Type::scalar(Kind::Boolean) })
    }

    fn gen_conversion(&mut self, to_type: &str, expr: &Expr) -> Result<ExprResult> {
        let source = self.gen_expr(expr)?;
        self.adopt_temporary(source.value);
        let target = ConvTarget::parse(to_type).ok_or_else(|| LogicError::BadConvType(to_type.to_string()))?;
        if !target.accepts(source.ty.kind()) {
            return Err(LogicError::BadConvTarget { from: source.ty.display_name(), to: to_type.to_string() }.into());
        }
        let value = self.gen_typed_conversion(target, &source);
        self.destroy_value(source.value, &source.ty);
        let ty = target.result_type();
        self.push_temporary(value, ty.clone());
        Ok(ExprResult { value, ty })
    }

    /// Dispatches to the narrow typed runtime conversion entry point rather
    /// than the generic `to_type` dispatcher, since `source`/`target` are
    /// both known statically here (§4.6's note that the generic dispatcher
    /// exists for parity, not as the primary call path).
    fn gen_typed_conversion(&mut self, target: ConvTarget, source: &ExprResult) -> Value {
        use Kind::*;
        match (source.ty.kind(), target) {
            (Boolean, ConvTarget::Bool) | (Integer, ConvTarget::Int) | (Floating, ConvTarget::Float) | (String, ConvTarget::Str) => {
                source.value
            }
            (Boolean, ConvTarget::Int) => self.builder.ins().uextend(ir::types::I64, source.value),
            (Boolean, ConvTarget::Float) => self.call_runtime1("bool_to_float", source.value),
            (Boolean, ConvTarget::Str) => self.call_runtime1("bool_to_string_value", source.value),
            (Integer, ConvTarget::Bool) => {
                let zero = self.builder.ins().iconst(ir::types::I64, 0);
                self.builder.ins().icmp(IntCC::NotEqual, source.value, zero)
            }
            (Integer, ConvTarget::Float) => self.builder.ins().fcvt_from_sint(ir::types::F64, source.value),
            (Integer, ConvTarget::Str) => self.call_runtime1("int_to_string", source.value),
            (Floating, ConvTarget::Bool) => {
                let zero = self.builder.ins().f64const(0.0);
                self.builder.ins().fcmp(ir::condcodes::FloatCC::NotEqual, source.value, zero)
            }
            (Floating, ConvTarget::Int) => self.builder.ins().fcvt_to_sint_sat(ir::types::I64, source.value),
            (Floating, ConvTarget::Str) => self.call_runtime1("float_to_string", source.value),
            (Complex, ConvTarget::Int) => {
                let re = self.call_runtime1("complex_real", source.value);
                self.builder.ins().fcvt_to_sint_sat(ir::types::I64, re)
            }
            (Complex, ConvTarget::Float) | (Complex, ConvTarget::Real) => self.call_runtime1("complex_real", source.value),
            (Complex, ConvTarget::Imag) => self.call_runtime1("complex_imag", source.value),
            (Complex, ConvTarget::Str) => self.call_runtime1("complex_to_string", source.value),
            (String, ConvTarget::Bool) => {
                let len = self.call_runtime1("string_length", source.value);
                let zero = self.builder.ins().iconst(ir::types::I64, 0);
                self.builder.ins().icmp(IntCC::NotEqual, len, zero)
            }
            (String, ConvTarget::Int) => self.call_runtime1("string_to_int", source.value),
            (String, ConvTarget::Float) => self.call_runtime1("string_to_float", source.value),
            (String, ConvTarget::Complex) => self.call_runtime1("string_to_complex", source.value),
            (Integer, ConvTarget::Complex) => self.call_runtime1("int_to_complex", source.value),
            (Floating, ConvTarget::Complex) => self.call_runtime1("float_to_complex", source.value),
            _ => source.value,
        }
    }

    pub(super) fn gen_list_literal(&mut self, elements: &[Expr], element_type: Option<&str>) -> Result<ExprResult> {
        let element_ty = if let Some(first) = elements.first() {
            self.static_type(first)?.remove_const()
        } else {
            ConvTarget::parse(element_type.unwrap_or("")).map(ConvTarget::result_type).ok_or(LogicError::EmptyListNeedsType)?
        };
        let raw_kind = self.builder.ins().iconst(ir::types::I8, element_ty.kind().raw_tag() as i64);
        let length = self.builder.ins().iconst(ir::types::I64, elements.len() as i64);
        let list_ptr = self.call_runtime_n("make_list", &[length, raw_kind]);
        let elements_array = self.call_runtime1("list_elements_ptr", list_ptr);
        let clif_ty = self.clif_type(&element_ty);
        for (i, e) in elements.iter().enumerate() {
            let r = self.gen_expr(e)?;
            self.adopt_temporary(r.value);
            let offset = (i * std::mem::size_of::<u64>()) as i32;
            let ptr = self.builder.ins().iadd_imm(elements_array, offset as i64);
            let _ = clif_ty;
            self.builder.ins().store(ir::MemFlags::trusted(), r.value, ptr, 0);
        }
        let ty = Type::List { element: Box::new(element_ty), is_const: false };
        self.push_temporary(list_ptr, ty.clone());
        Ok(ExprResult { value: list_ptr, ty })
    }

    fn gen_list_index(&mut self, name: &rill_parser::ast::Variable, indexes: &[Expr]) -> Result<ExprResult> {
        let (var, ty) = self
            .find_local(&name.name)
            .map(|(v, t)| (Some(v), t))
            .or_else(|| self.globals.find(&name.name).map(|slot| (None, self.globals.get_type(slot).expect("slot came from globals").clone())))
            .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
        let Type::List { element, .. } = &ty else {
            return Err(LogicError::BadObject(name.name.clone()).into());
        };
        let element_ty = (**element).clone().remove_const();
        let list_ptr = match var {
            Some(v) => self.builder.use_var(v),
            None => {
                let slot = self.globals.find(&name.name).expect("checked above");
                self.load_global(slot, &ty)
            }
        };
        let idx_result = self.gen_expr(&indexes[0])?;
        self.adopt_temporary(idx_result.value);
        let ptr = self.call_runtime_n("list_element_ptr", &[list_ptr, idx_result.value]);
        let raw = self.builder.ins().load(self.clif_type(&element_ty), ir::MemFlags::trusted(), ptr, 0);
        let value = self.clone_value(raw, &element_ty);
        self.push_temporary(value, element_ty.clone());
        Ok(ExprResult { value, ty: element_ty })
    }

    fn gen_data_list_index(
        &mut self,
        name: &rill_parser::ast::Variable,
        member_list: &[rill_parser::ast::Variable],
        indexes: &[Expr],
    ) -> Result<ExprResult> {
        let (instance_ptr, instance_ty) = self.load_base_instance(name)?;
        let mut ptr = instance_ptr;
        let mut ty = instance_ty;
        for member in member_list {
            let (field_ptr, field_ty) = self.field_pointer(ptr, &ty, member)?;
            ptr = self.builder.ins().load(self.ptr_type, ir::MemFlags::trusted(), field_ptr, 0);
            ty = field_ty;
        }
        let Type::List { element, .. } = &ty else {
            return Err(LogicError::BadObject(name.name.clone()).into());
        };
        let element_ty = (**element).clone().remove_const();
        let idx_result = self.gen_expr(&indexes[0])?;
        self.adopt_temporary(idx_result.value);
        let elem_ptr = self.call_runtime_n("list_element_ptr", &[ptr, idx_result.value]);
        let raw = self.builder.ins().load(self.clif_type(&element_ty), ir::MemFlags::trusted(), elem_ptr, 0);
        let value = self.clone_value(raw, &element_ty);
        self.push_temporary(value, element_ty.clone());
        Ok(ExprResult { value, ty: element_ty })
    }
}

#[derive(Clone, Copy)]
enum InstBuilderArith {
    Add,
    Sub,
    Mul,
}
