//! The type inference / instantiation pass (§4.2).
//!
//! One expression-typing function and one statement-visiting function,
//! called both by the top-level type pass (which populates the instance
//! cache with everything the code generator will need, §4.5 step 2) and,
//! unchanged, by the JIT driver's per-instantiation nested pass (§4.5 step
//! 3: "run a nested type pass ... over the body (this legitimises nested
//! instantiations inside nested calls)"). Re-running this pass over a body
//! whose instantiations already exist is cheap: [`Cache::begin_instantiation`]
//! just hands back the existing slot instead of re-walking anything.
//!
//! Grounded on `original_source/src/engine/TypeInference.hpp`'s two
//! `StatementVisitor`/`ExpressionVisitor` callback classes; here they are
//! ordinary recursive functions returning `Type` directly (§9's "Type pass
//! returning types via stack" design note explicitly allows this).

use crate::cache::Cache;
use crate::error::{LogicError, Result};
use crate::symbols::{GlobalScope, LocalScope, ScopeChain, NO_VARIABLE};
use crate::types::{self, ConvTarget, Kind, Type};
use crate::{bail_internal, constants::Constants};
use rill_parser::ast::*;

/// Which body is currently being walked; controls whether `return` is legal
/// and (for `Method`) makes `this` resolve to the receiver type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMode {
    TopLevel,
    FreeFunction,
    Method,
}

/// Where a name resolved to, so callers (codegen) know whether to address a
/// local slot, an enclosing-scope slot, or a global slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarLocation {
    Local { depth: usize, slot: usize },
    Global { slot: usize },
}

pub struct TypeEngine<'a> {
    pub cache: &'a mut Cache,
    pub globals: &'a mut GlobalScope,
    pub constants: &'a mut Constants,
}

/// One function/method body's accumulated return-type observation (§4.2:
/// "infers return types by analyzing the callee body once per argument-type
/// signature"). Shared by reference across every nested block of the body
/// so a `return` inside an `if`/`while`/`case` arm still contributes.
#[derive(Default)]
struct ReturnAcc {
    ty: Option<Type>,
}

impl ReturnAcc {
    fn observe(&mut self, name_for_error: &str, ty: Option<Type>) -> Result<()> {
        match (&self.ty, &ty) {
            (None, _) => self.ty = ty,
            (Some(_), None) => {}
            (Some(existing), Some(new_ty)) => {
                if !existing.equals_ignoring_const(new_ty) {
                    return Err(LogicError::FunctionTypeSet(name_for_error.to_string()).into());
                }
            }
        }
        Ok(())
    }
}

impl<'a> TypeEngine<'a> {
    pub fn new(cache: &'a mut Cache, globals: &'a mut GlobalScope, constants: &'a mut Constants) -> Self {
        TypeEngine { cache, globals, constants }
    }

    /// Type-checks a whole top-level submission, populating `globals` and
    /// requesting every instantiation the submission's calls need.
    pub fn infer_program(&mut self, statements: &[Stmt]) -> Result<()> {
        let mut scopes: Vec<LocalScope> = Vec::new();
        let mut acc = ReturnAcc::default();
        self.infer_block(statements, &mut scopes, TypeMode::TopLevel, None, &mut acc)?;
        Ok(())
    }

    /// Type-checks one function/method body under a fresh parameter scope,
    /// returning the return type observed across every `return` in the body
    /// (`None` if none fired, §4.2's "recursive functions therefore
    /// type-check to None" limitation).
    pub fn infer_function_body(
        &mut self,
        mangled_name: &str,
        parameters: &[Variable],
        parameter_types: &[Type],
        body: &[Stmt],
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Option<Type>> {
        let mut scope = LocalScope::new();
        for (param, ty) in parameters.iter().zip(parameter_types) {
            scope.add(&param.name, ty.add_const());
        }
        let mut scopes = vec![scope];
        let mut acc = ReturnAcc::default();
        self.infer_block(body, &mut scopes, mode, this_class, &mut acc)?;
        Ok(acc.ty)
    }

    fn infer_block(
        &mut self,
        statements: &[Stmt],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
        acc: &mut ReturnAcc,
    ) -> Result<()> {
        scopes.push(LocalScope::new());
        let result = self.infer_block_inner(statements, scopes, mode, this_class, acc);
        scopes.pop();
        result
    }

    /// Walks `statements` using the scope already pushed at the top of
    /// `scopes` as this block's own frame (so declarations accumulate in
    /// place while later statements in the same block can see them).
    fn infer_block_inner(
        &mut self,
        statements: &[Stmt],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
        acc: &mut ReturnAcc,
    ) -> Result<()> {
        for (i, stmt) in statements.iter().enumerate() {
            let is_last = i == statements.len() - 1;
            if matches!(stmt, Stmt::Return(_)) && !is_last {
                return Err(LogicError::ReturnAtEnd.into());
            }
            self.infer_stmt(stmt, scopes, mode, this_class, acc)?;
        }
        Ok(())
    }

    fn current_scope_mut<'s>(scopes: &'s mut [LocalScope]) -> &'s mut LocalScope {
        scopes.last_mut().expect("a block scope is always pushed before statements run")
    }

    fn chain<'s>(scopes: &'s [LocalScope]) -> ScopeChain<'s> {
        let mut chain = ScopeChain::new();
        for s in scopes {
            chain.push(s);
        }
        chain
    }

    fn lookup_variable(&self, name: &str, scopes: &[LocalScope]) -> Option<(VarLocation, Type)> {
        let chain = Self::chain(scopes);
        if let Some((depth, slot)) = chain.find(name) {
            let scope = &scopes[scopes.len() - 1 - depth];
            let ty = scope.get_type(slot).expect("slot came from this scope").clone();
            return Some((VarLocation::Local { depth, slot }, ty));
        }
        if let Some(slot) = self.globals.find(name) {
            let ty = self.globals.get_type(slot).expect("slot came from globals").clone();
            return Some((VarLocation::Global { slot }, ty));
        }
        None
    }

    fn infer_stmt(
        &mut self,
        stmt: &Stmt,
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
        acc: &mut ReturnAcc,
    ) -> Result<()> {
        match stmt {
            Stmt::Print(print_stmt) => {
                for part in &print_stmt.parts {
                    if let PrintPart::Value(expr) = part {
                        self.infer_expr(expr, scopes, mode, this_class)?;
                    }
                }
                Ok(())
            }
            Stmt::Init { name, mutable, value } => {
                let value_ty = self.infer_expr(value, scopes, mode, this_class)?;
                self.declare(name, value_ty, *mutable, scopes, mode)
            }
            Stmt::ListInit { name, mutable, element_type, elements } => {
                let element_ty = self.infer_list_elements(element_type.as_deref(), elements, scopes, mode, this_class)?;
                let list_ty = Type::List { element: Box::new(element_ty), is_const: false };
                self.declare(name, list_ty, *mutable, scopes, mode)
            }
            Stmt::Assign { name, value } => {
                let value_ty = self.infer_expr(value, scopes, mode, this_class)?;
                let (_, declared) = self
                    .lookup_variable(&name.name, scopes)
                    .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
                if declared.is_const() {
                    return Err(LogicError::NoConstantAssign(name.name.clone()).into());
                }
                if !declared.equals_ignoring_const(&value_ty) {
                    return Err(LogicError::VariableType(name.name.clone()).into());
                }
                Ok(())
            }
            Stmt::ListAssign { name, indexes, value } => {
                let (_, declared) = self
                    .lookup_variable(&name.name, scopes)
                    .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
                let Type::List { element, is_const } = &declared else {
                    return Err(LogicError::BadObject(name.name.clone()).into());
                };
                if *is_const {
                    return Err(LogicError::NoConstantAssign(name.name.clone()).into());
                }
                if indexes.len() != 1 {
                    return Err(LogicError::TooManyIndexes.into());
                }
                let idx_ty = self.infer_expr(&indexes[0], scopes, mode, this_class)?;
                if idx_ty.kind() != Kind::Integer {
                    return Err(LogicError::IndexNotInt.into());
                }
                let value_ty = self.infer_expr(value, scopes, mode, this_class)?;
                if !element.equals_ignoring_const(&value_ty) {
                    return Err(LogicError::ListAssignMismatch.into());
                }
                Ok(())
            }
            Stmt::DataAssign { name, member_list, value } => {
                let field_ty = self.resolve_member_chain(name, member_list, scopes, mode, this_class)?;
                if field_ty.is_const() {
                    return Err(LogicError::NoConstantAssign(name.name.clone()).into());
                }
                let value_ty = self.infer_expr(value, scopes, mode, this_class)?;
                if !field_ty.equals_ignoring_const(&value_ty) {
                    return Err(LogicError::VariableType(name.name.clone()).into());
                }
                Ok(())
            }
            Stmt::DataListAssign { name, member_list, indexes, value } => {
                let field_ty = self.resolve_member_chain(name, member_list, scopes, mode, this_class)?;
                let Type::List { element, .. } = &field_ty else {
                    return Err(LogicError::BadObject(name.name.clone()).into());
                };
                if indexes.len() != 1 {
                    return Err(LogicError::TooManyIndexes.into());
                }
                let idx_ty = self.infer_expr(&indexes[0], scopes, mode, this_class)?;
                if idx_ty.kind() != Kind::Integer {
                    return Err(LogicError::IndexNotInt.into());
                }
                let value_ty = self.infer_expr(value, scopes, mode, this_class)?;
                if !element.equals_ignoring_const(&value_ty) {
                    return Err(LogicError::ListAssignMismatch.into());
                }
                Ok(())
            }
            Stmt::If { condition, true_block, false_block } => {
                self.infer_expr(condition, scopes, mode, this_class)?;
                self.infer_block(true_block, scopes, mode, this_class, acc)?;
                self.infer_block(false_block, scopes, mode, this_class, acc)?;
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.infer_expr(condition, scopes, mode, this_class)?;
                self.infer_block(body, scopes, mode, this_class, acc)
            }
            Stmt::Repeat { body, condition } => {
                self.infer_block(body, scopes, mode, this_class, acc)?;
                self.infer_expr(condition, scopes, mode, this_class)?;
                Ok(())
            }
            Stmt::Case { scrutinee, arms, otherwise } => {
                self.infer_expr(scrutinee, scopes, mode, this_class)?;
                for arm in arms {
                    self.infer_expr(&arm.pattern, scopes, mode, this_class)?;
                    self.infer_block(&arm.body, scopes, mode, this_class, acc)?;
                }
                self.infer_block(otherwise, scopes, mode, this_class, acc)
            }
            Stmt::Function(def) => {
                self.cache.add_function_template(
                    &def.name,
                    crate::cache::FunctionTemplate {
                        parameters: def.parameters.clone(),
                        body: def.body.clone(),
                    },
                )
            }
            Stmt::ExprFunction { name, parameters, expression } => self.cache.add_function_template(
                name,
                crate::cache::FunctionTemplate {
                    parameters: parameters.clone(),
                    body: vec![Stmt::Return(Some(expression.clone()))],
                },
            ),
            Stmt::Class { name, variables, methods } => {
                let mut method_map = std::collections::HashMap::new();
                for m in methods {
                    method_map.insert(
                        m.name.clone(),
                        crate::cache::FunctionTemplate {
                            parameters: m.parameters.clone(),
                            body: m.body.clone(),
                        },
                    );
                }
                self.cache.add_class_template(
                    name,
                    crate::cache::ClassTemplate {
                        variables: variables.clone(),
                        methods: method_map,
                    },
                )
            }
            Stmt::FunctionCall { name, args } => {
                self.infer_call(name, args, scopes, mode, this_class)?;
                Ok(())
            }
            Stmt::MethodCall { name, member_list, method, args } => {
                self.infer_method_call(name, member_list, method, args, scopes, mode, this_class)?;
                Ok(())
            }
            Stmt::Expression(expr) => {
                self.infer_expr(expr, scopes, mode, this_class)?;
                Ok(())
            }
            Stmt::Return(expr) => {
                if mode == TypeMode::TopLevel {
                    return Err(LogicError::ReturnOnlyInFunction.into());
                }
                let ty = match expr {
                    Some(e) => Some(self.infer_expr(e, scopes, mode, this_class)?),
                    None => None,
                };
                acc.observe("<function>", ty)
            }
        }
    }

    fn declare(
        &mut self,
        name: &Variable,
        value_ty: Type,
        mutable: bool,
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
    ) -> Result<()> {
        let stored_ty = if mutable { value_ty.remove_const() } else { value_ty.add_const() };
        if mode == TypeMode::TopLevel && scopes.len() == 1 {
            if self.globals.find(&name.name).is_some() {
                return Err(LogicError::VariableExists(name.name.clone()).into());
            }
            self.globals.add(&name.name, stored_ty);
        } else {
            let scope = Self::current_scope_mut(scopes);
            if scope.local_index(&name.name).is_some() {
                return Err(LogicError::VariableExists(name.name.clone()).into());
            }
            scope.add(&name.name, stored_ty);
        }
        Ok(())
    }

    fn infer_list_elements(
        &mut self,
        element_type: Option<&str>,
        elements: &[Expr],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        if elements.is_empty() {
            return match element_type {
                Some(name) => ConvTarget::parse(name)
                    .map(ConvTarget::result_type)
                    .ok_or_else(|| LogicError::BadConvType(name.to_string()).into()),
                None => Err(LogicError::EmptyListNeedsType.into()),
            };
        }
        let mut element_ty: Option<Type> = None;
        for e in elements {
            let ty = self.infer_expr(e, scopes, mode, this_class)?;
            match &element_ty {
                None => element_ty = Some(ty),
                Some(existing) if existing.equals_ignoring_const(&ty) => {}
                Some(_) => return Err(LogicError::ListTypeMismatch.into()),
            }
        }
        let inferred = element_ty.expect("checked non-empty above");
        if let Some(name) = element_type {
            let annotated = ConvTarget::parse(name)
                .map(ConvTarget::result_type)
                .ok_or_else(|| LogicError::BadConvType(name.to_string()))?;
            if !annotated.equals_ignoring_const(&inferred) {
                return Err(LogicError::ListTypeMismatch.into());
            }
        }
        Ok(inferred.remove_const())
    }

    fn resolve_member_chain(
        &mut self,
        name: &Variable,
        member_list: &[Variable],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        let mut current = self.resolve_base(name, scopes, mode, this_class)?;
        for member in member_list {
            let Type::Instance { class_name, field_types, .. } = &current else {
                return Err(LogicError::BadObject(name.name.clone()).into());
            };
            let template = self.cache.class_template(class_name).ok_or_else(|| LogicError::BadObject(class_name.clone()))?;
            let idx = template
                .member_index(&member.name)
                .ok_or_else(|| LogicError::BadObject(member.name.clone()))?;
            current = field_types
                .get(idx)
                .cloned()
                .unwrap_or(Type::scalar(Kind::None));
        }
        Ok(current)
    }

    /// Resolves the head of a member chain: either `this` (inside a method)
    /// or an ordinary local/global variable.
    fn resolve_base(
        &mut self,
        name: &Variable,
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        if name.name == "this" {
            if mode != TypeMode::Method {
                return Err(LogicError::VariableNotExist("this".to_string()).into());
            }
            let (_, ty) = self
                .lookup_variable("_this", scopes)
                .ok_or_else(|| LogicError::VariableNotExist("this".to_string()))?;
            let _ = this_class;
            return Ok(ty);
        }
        self.lookup_variable(&name.name, scopes)
            .map(|(_, ty)| ty)
            .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()).into())
    }

    fn infer_call(
        &mut self,
        name: &str,
        args: &[Expr],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        let arg_types: Vec<Type> = args
            .iter()
            .map(|a| self.infer_expr(a, scopes, mode, this_class))
            .collect::<Result<_>>()?;

        if self.cache.has_class(name) {
            let template = self.cache.class_template(name).expect("just checked");
            if template.variables.len() != arg_types.len() {
                return Err(LogicError::WrongArgs(name.to_string()).into());
            }
            return Ok(Type::instance(name, arg_types));
        }

        if !self.cache.has_function(name) {
            return Err(LogicError::CallableNotExist(name.to_string()).into());
        }
        let template = self.cache.function_template(name).expect("just checked");
        if template.parameters.len() != arg_types.len() {
            return Err(LogicError::WrongArgs(name.to_string()).into());
        }
        let parameters = template.parameters.clone();
        let body = template.body.clone();
        self.instantiate_function(name, &parameters, &arg_types, &body, TypeMode::FreeFunction, None)
    }

    fn infer_method_call(
        &mut self,
        name: &Variable,
        member_list: &[Variable],
        method: &str,
        args: &[Expr],
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        let receiver_ty = if member_list.is_empty() {
            self.resolve_base(name, scopes, mode, this_class)?
        } else {
            self.resolve_member_chain(name, member_list, scopes, mode, this_class)?
        };
        let Type::Instance { class_name, .. } = &receiver_ty else {
            return Err(LogicError::BadObject(name.name.clone()).into());
        };
        let class_name = class_name.clone();
        let arg_types: Vec<Type> = args
            .iter()
            .map(|a| self.infer_expr(a, scopes, mode, this_class))
            .collect::<Result<_>>()?;
        let template = self
            .cache
            .class_template(&class_name)
            .ok_or_else(|| LogicError::BadObject(class_name.clone()))?;
        let method_template = template
            .methods
            .get(method)
            .ok_or_else(|| LogicError::CallableNotExist(method.to_string()))?;
        if method_template.parameters.len() != arg_types.len() {
            return Err(LogicError::WrongArgs(method.to_string()).into());
        }
        let mut full_params = vec![Variable::from("_this")];
        full_params.extend(method_template.parameters.clone());
        let mut full_types = vec![receiver_ty.clone()];
        full_types.extend(arg_types);
        let body = method_template.body.clone();
        let mangled_prefix = format!("{class_name}.{method}");
        self.instantiate_function(&mangled_prefix, &full_params, &full_types, &body, TypeMode::Method, Some(&class_name))
    }

    fn instantiate_function(
        &mut self,
        name: &str,
        parameters: &[Variable],
        arg_types: &[Type],
        body: &[Stmt],
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        let mangled = types::mangle(name, arg_types);
        if let Some(cached) = self.cache.instantiation_return_type(&mangled) {
            return Ok(cached.cloned().unwrap_or(Type::scalar(Kind::None)));
        }
        let idx = self.cache.begin_instantiation(
            &mangled,
            arg_types.to_vec(),
            parameters.to_vec(),
            body.to_vec(),
            mode,
            this_class.map(str::to_string),
        );
        let observed = self.infer_function_body(&mangled, parameters, arg_types, body, mode, this_class)?;
        self.cache.finish_instantiation(idx, observed.clone());
        Ok(observed.unwrap_or(Type::scalar(Kind::None)))
    }

    pub fn infer_expr(
        &mut self,
        expr: &Expr,
        scopes: &mut Vec<LocalScope>,
        mode: TypeMode,
        this_class: Option<&str>,
    ) -> Result<Type> {
        match expr {
            Expr::Literal(lit) => Ok(literal_type(lit)),
            Expr::This => self.resolve_base(&Variable::from("this"), scopes, mode, this_class),
            Expr::Variable(v) => self
                .lookup_variable(&v.name, scopes)
                .map(|(_, ty)| ty.remove_const())
                .ok_or_else(|| LogicError::VariableNotExist(v.name.clone()).into()),
            Expr::DataMember { name, member_list } => {
                Ok(self.resolve_member_chain(name, member_list, scopes, mode, this_class)?.remove_const())
            }
            Expr::Unary { op, operand } => {
                let ty = self.infer_expr(operand, scopes, mode, this_class)?;
                unary_result(*op, &ty)
            }
            Expr::Binary { op, left, right } => {
                let lt = self.infer_expr(left, scopes, mode, this_class)?;
                let rt = self.infer_expr(right, scopes, mode, this_class)?;
                binary_result(*op, &lt, &rt)
            }
            Expr::CompareChain { ops, operands } => {
                let types: Vec<Type> = operands
                    .iter()
                    .map(|e| self.infer_expr(e, scopes, mode, this_class))
                    .collect::<Result<_>>()?;
                for (op, pair) in ops.iter().zip(types.windows(2)) {
                    binary_result(*op, &pair[0], &pair[1])?;
                }
                Ok(Type::scalar(Kind::Boolean))
            }
            Expr::FunctionCall { name, args } => self.infer_call(name, args, scopes, mode, this_class),
            Expr::MethodCall { name, member_list, method, args } => {
                self.infer_method_call(name, member_list, method, args, scopes, mode, this_class)
            }
            Expr::UserInput => Ok(Type::scalar(Kind::String)),
            Expr::TypeConv { to_type, expr } => {
                let source = self.infer_expr(expr, scopes, mode, this_class)?;
                let target = ConvTarget::parse(to_type).ok_or_else(|| LogicError::BadConvType(to_type.clone()))?;
                if !target.accepts(source.kind()) {
                    return Err(LogicError::BadConvTarget {
                        from: source.display_name(),
                        to: to_type.clone(),
                    }
                    .into());
                }
                Ok(target.result_type())
            }
            Expr::List { elements, element_type } => {
                let element_ty = self.infer_list_elements(element_type.as_deref(), elements, scopes, mode, this_class)?;
                Ok(Type::List { element: Box::new(element_ty), is_const: false })
            }
            Expr::ListIndex { name, indexes } => {
                let (_, ty) = self
                    .lookup_variable(&name.name, scopes)
                    .ok_or_else(|| LogicError::VariableNotExist(name.name.clone()))?;
                let Type::List { element, .. } = &ty else {
                    return Err(LogicError::BadObject(name.name.clone()).into());
                };
                if indexes.len() != 1 {
                    return Err(LogicError::TooManyIndexes.into());
                }
                let idx_ty = self.infer_expr(&indexes[0], scopes, mode, this_class)?;
                if idx_ty.kind() != Kind::Integer {
                    return Err(LogicError::IndexNotInt.into());
                }
                Ok((**element).clone().remove_const())
            }
            Expr::DataListIndex { name, member_list, indexes } => {
                let ty = self.resolve_member_chain(name, member_list, scopes, mode, this_class)?;
                let Type::List { element, .. } = &ty else {
                    return Err(LogicError::BadObject(name.name.clone()).into());
                };
                if indexes.len() != 1 {
                    return Err(LogicError::TooManyIndexes.into());
                }
                let idx_ty = self.infer_expr(&indexes[0], scopes, mode, this_class)?;
                if idx_ty.kind() != Kind::Integer {
                    return Err(LogicError::IndexNotInt.into());
                }
                Ok((**element).clone().remove_const())
            }
        }
    }
}

pub(crate) fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Nil => Type::scalar(Kind::None),
        Literal::Bool(_) => Type::scalar(Kind::Boolean),
        Literal::Int(_) => Type::scalar(Kind::Integer),
        Literal::Float(_) => Type::scalar(Kind::Floating),
        Literal::Complex(..) => Type::scalar(Kind::Complex),
        Literal::Str(_) => Type::scalar(Kind::String),
    }
}

fn op_name(op: Operator) -> &'static str {
    match op {
        Operator::Plus => "+",
        Operator::Minus => "-",
        Operator::Times => "*",
        Operator::Divide => "/",
        Operator::Modulo => "%",
        Operator::FloorDivide => "//",
        Operator::Exponent => "**",
        Operator::Equal => "==",
        Operator::NotEqual => "!=",
        Operator::Less => "<",
        Operator::LessEqual => "<=",
        Operator::GreaterEqual => ">=",
        Operator::Greater => ">",
        Operator::Not => "not",
        Operator::And => "and",
        Operator::Or => "or",
        Operator::Compl => "~",
        Operator::BitAnd => "&",
        Operator::BitOr => "|",
        Operator::BitXor => "^",
        Operator::Comma => ",",
        Operator::SemiColon => ";",
        Operator::From => "<-",
        Operator::To => "->",
        Operator::Bang => "!",
        Operator::Question => "?",
    }
}

fn is_relational(op: Operator) -> bool {
    matches!(
        op,
        Operator::Less | Operator::LessEqual | Operator::GreaterEqual | Operator::Greater | Operator::Equal | Operator::NotEqual
    )
}

/// §4.2's binary operator/type table, generalized with the promotion
/// lattice for mixed numeric operands. `None`-typed operands always yield
/// `None` (§3: "Any operation involving `None` yields `None`").
pub(crate) fn binary_result(op: Operator, left: &Type, right: &Type) -> Result<Type> {
    if left.kind() == Kind::None || right.kind() == Kind::None {
        return Ok(Type::scalar(Kind::None));
    }
    if matches!(op, Operator::And | Operator::Or) {
        if left.kind() == Kind::Boolean && right.kind() == Kind::Boolean {
            return Ok(Type::scalar(Kind::Boolean));
        }
        return Err(bad_op(op, left));
    }
    match (left, right) {
        (Type::List { element: le, .. }, Type::List { element: re, .. }) => {
            if op == Operator::Plus && le.equals_ignoring_const(re) {
                Ok(Type::List { element: le.clone(), is_const: false })
            } else {
                Err(bad_op(op, left))
            }
        }
        (Type::Instance { .. }, _) | (_, Type::Instance { .. }) => Err(bad_op(op, left)),
        (Type::List { .. }, _) | (_, Type::List { .. }) => Err(bad_op(op, left)),
        _ => binary_scalar_result(op, left.kind(), right.kind()).map(Type::scalar),
    }
}

fn binary_scalar_result(op: Operator, left: Kind, right: Kind) -> Result<Kind> {
    if left == Kind::String || right == Kind::String {
        if left != Kind::String || right != Kind::String {
            return Err(bad_op(op, &Type::scalar(left)));
        }
        return match op {
            Operator::Plus => Ok(Kind::String),
            Operator::Equal | Operator::NotEqual => Ok(Kind::Boolean),
            _ => Err(bad_op(op, &Type::scalar(Kind::String))),
        };
    }

    let (Some(lr), Some(rr)) = (left.promotion_rank(), right.promotion_rank()) else {
        return Err(bad_op(op, &Type::scalar(left)));
    };
    let promoted = if lr >= rr { left } else { right };

    if is_relational(op) {
        let ok = match promoted {
            Kind::Boolean => matches!(op, Operator::Equal | Operator::NotEqual),
            Kind::Integer | Kind::Floating => true,
            Kind::Complex => matches!(op, Operator::Equal | Operator::NotEqual),
            _ => false,
        };
        return if ok { Ok(Kind::Boolean) } else { Err(bad_op(op, &Type::scalar(promoted))) };
    }

    match op {
        Operator::BitAnd | Operator::BitOr | Operator::BitXor => {
            if matches!(promoted, Kind::Boolean | Kind::Integer) {
                Ok(promoted)
            } else {
                Err(bad_op(op, &Type::scalar(promoted)))
            }
        }
        Operator::Modulo | Operator::FloorDivide => {
            if promoted == Kind::Integer {
                Ok(Kind::Integer)
            } else {
                Err(bad_op(op, &Type::scalar(promoted)))
            }
        }
        Operator::Divide => match promoted {
            Kind::Integer | Kind::Floating => Ok(Kind::Floating),
            Kind::Complex => Ok(Kind::Complex),
            _ => Err(bad_op(op, &Type::scalar(promoted))),
        },
        Operator::Exponent => match promoted {
            Kind::Integer => Ok(Kind::Floating),
            Kind::Floating | Kind::Complex => Ok(promoted),
            _ => Err(bad_op(op, &Type::scalar(promoted))),
        },
        Operator::Plus | Operator::Minus | Operator::Times => match promoted {
            Kind::Integer | Kind::Floating | Kind::Complex => Ok(promoted),
            _ => Err(bad_op(op, &Type::scalar(promoted))),
        },
        _ => Err(bad_op(op, &Type::scalar(promoted))),
    }
}

pub(crate) fn unary_result(op: Operator, ty: &Type) -> Result<Type> {
    if ty.kind() == Kind::None {
        return Ok(Type::scalar(Kind::None));
    }
    match op {
        Operator::Minus => match ty.kind() {
            Kind::Integer | Kind::Floating | Kind::Complex => Ok(Type::scalar(ty.kind())),
            _ => Err(bad_op(op, ty)),
        },
        Operator::Not => match ty.kind() {
            Kind::Boolean | Kind::Integer | Kind::Floating => Ok(Type::scalar(Kind::Boolean)),
            _ => Err(bad_op(op, ty)),
        },
        Operator::Compl => match ty.kind() {
            Kind::Boolean | Kind::Integer => Ok(Type::scalar(ty.kind())),
            _ => Err(bad_op(op, ty)),
        },
        Operator::Bang => match ty {
            Type::List { .. } => Ok(Type::scalar(Kind::Integer)),
            Type::Scalar { kind: Kind::String, .. } => Ok(Type::scalar(Kind::Integer)),
            _ => Err(bad_op(op, ty)),
        },
        Operator::Question => Ok(Type::scalar(Kind::String)),
        _ => bail_internal!("unary_result called with non-unary operator {op:?}"),
    }
}

fn bad_op(op: Operator, ty: &Type) -> crate::error::Error {
    LogicError::BadOperatorForType {
        op: op_name(op).to_string(),
        ty: ty.display_name(),
    }
    .into()
}

#[allow(dead_code)]
fn unused_no_variable_sentinel() -> usize {
    NO_VARIABLE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::constants::Constants;

    fn engine(cache: &mut Cache, globals: &mut GlobalScope, constants: &mut Constants) -> TypeEngine<'_> {
        TypeEngine::new(cache, globals, constants)
    }

    #[test]
    fn integer_division_promotes_to_float() {
        let mut cache = Cache::new();
        let mut globals = GlobalScope::new();
        let mut constants = Constants::new();
        let mut eng = engine(&mut cache, &mut globals, &mut constants);
        let ty = binary_result(Operator::Divide, &Type::scalar(Kind::Integer), &Type::scalar(Kind::Integer)).unwrap();
        assert_eq!(ty, Type::scalar(Kind::Floating));
        let _ = &mut eng;
    }

    #[test]
    fn mismatched_assignment_type_is_rejected() {
        let mut cache = Cache::new();
        let mut globals = GlobalScope::new();
        let mut constants = Constants::new();
        let mut eng = TypeEngine::new(&mut cache, &mut globals, &mut constants);
        let program = rill_parser::parse("let f = 2; f <- 2.5;").unwrap();
        let err = eng.infer_program(&program.statements).unwrap_err();
        assert!(matches!(err, crate::error::Error::Logic(LogicError::NoConstantAssign(_))));
    }

    #[test]
    fn function_instantiates_once_per_argument_signature() {
        let mut cache = Cache::new();
        let mut globals = GlobalScope::new();
        let mut constants = Constants::new();
        let mut eng = TypeEngine::new(&mut cache, &mut globals, &mut constants);
        let program = rill_parser::parse(
            "fn difference(c,d) if c<d return d-c; else return c-d; endif endfn \
             print difference(2,5); print difference(4.4,1.1);",
        )
        .unwrap();
        eng.infer_program(&program.statements).unwrap();
        assert_eq!(cache.instantiations().len(), 2);
    }

    #[test]
    fn empty_untyped_list_is_rejected() {
        let mut cache = Cache::new();
        let mut globals = GlobalScope::new();
        let mut constants = Constants::new();
        let mut eng = TypeEngine::new(&mut cache, &mut globals, &mut constants);
        let program = rill_parser::parse("let e <- [];").unwrap();
        let err = eng.infer_program(&program.statements).unwrap_err();
        assert!(matches!(err, crate::error::Error::Logic(LogicError::EmptyListNeedsType)));
    }
}
