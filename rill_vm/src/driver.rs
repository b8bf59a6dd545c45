//! The JIT driver: links one compilation unit's Cranelift IR against the
//! runtime support library and runs its `program` entry point.
//!
//! Standard `JITBuilder`/`JITModule` setup: `builder.symbol(name, ptr as
//! *const u8)` native-symbol registration, the declare-then-
//! `compile_function`-then-`finalize`/`get_typed_function`
//! transmute-and-call pipeline. Unlike compiling one `IrModule` handed over
//! whole, this driver interleaves a nested type pass
//! ([`crate::infer::TypeEngine`]) with codegen — for each instantiation the
//! type pass requested, emit its body — and must persist already-compiled
//! instantiations across REPL submissions rather than linking a single
//! module once.

use crate::cache::Cache;
use crate::codegen::{clif_type_for, FuncBuilder, RuntimeImports};
use crate::constants::{constants_get_complex, constants_get_string, Constants};
use crate::error::{InternalError, Result};
use crate::infer::{TypeEngine, TypeMode};
use crate::symbols::GlobalScope;
use crate::types::Type;
use cranelift_codegen::ir::{self, AbiParam, Function, Signature, UserFuncName};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Linkage, Module};
use rill_parser::ast::{Stmt, Variable};
use rill_runtime::context::{take_last_error, RuntimeContext};
use std::collections::HashMap;
use std::ffi::c_void;
use target_lexicon::Triple;

fn internal(message: impl Into<String>) -> crate::error::Error {
    InternalError {
        file: file!(),
        line: line!(),
        message: message.into(),
    }
    .into()
}

/// One runtime-support entry point's calling convention, described
/// abstractly so one table both registers its native address
/// ([`JITBuilder::symbol`]) and declares its Cranelift [`Signature`].
#[derive(Clone, Copy)]
enum Param {
    Ptr,
    I8,
    I32,
    I64,
    F64,
}

impl Param {
    fn clif(self, ptr_type: ir::Type) -> ir::Type {
        match self {
            Param::Ptr => ptr_type,
            Param::I8 => ir::types::I8,
            Param::I32 => ir::types::I32,
            Param::I64 => ir::types::I64,
            Param::F64 => ir::types::F64,
        }
    }
}

/// `(symbol name, native address, parameter kinds, return kinds)` for every
/// `rill_runtime` entry point plus the two `rill_vm::constants` literal
/// accessors — the complete runtime contract table of §4.6.
fn runtime_table() -> Vec<(&'static str, *const u8, &'static [Param], &'static [Param])> {
    use rill_runtime::{context, convert, format, heap, ops, strings};
    use Param::*;
    vec![
        ("context_global_slot", context::context_global_slot as *const u8, &[Ptr, I64], &[Ptr]),
        ("context_constants_ptr", context::context_constants_ptr as *const u8, &[Ptr], &[Ptr]),
        ("print_bool", format::print_bool as *const u8, &[Ptr, I8], &[]),
        ("print_integer", format::print_integer as *const u8, &[Ptr, I64], &[]),
        ("print_floating", format::print_floating as *const u8, &[Ptr, F64], &[]),
        ("print_complex", format::print_complex as *const u8, &[Ptr, Ptr], &[]),
        ("print_string", format::print_string as *const u8, &[Ptr, Ptr], &[]),
        ("print_instance", format::print_instance as *const u8, &[Ptr, Ptr], &[]),
        ("print_list", format::print_list as *const u8, &[Ptr, Ptr], &[]),
        ("print_comma", format::print_comma as *const u8, &[Ptr], &[]),
        ("print_line", format::print_line as *const u8, &[Ptr], &[]),
        ("complex_negate", ops::complex_negate as *const u8, &[Ptr], &[Ptr]),
        ("complex_arith", ops::complex_arith as *const u8, &[I8, Ptr, Ptr], &[Ptr]),
        ("complex_compare", ops::complex_compare as *const u8, &[I8, Ptr, Ptr], &[I8]),
        ("pow", ops::pow as *const u8, &[F64, F64], &[F64]),
        ("complex_pow", ops::complex_pow as *const u8, &[Ptr, Ptr], &[Ptr]),
        ("make_complex", heap::make_complex as *const u8, &[F64, F64], &[Ptr]),
        ("clone_complex", heap::clone_complex as *const u8, &[Ptr], &[Ptr]),
        ("destroy_complex", heap::destroy_complex as *const u8, &[Ptr], &[]),
        ("make_string", heap::make_string as *const u8, &[Ptr, I64], &[Ptr]),
        ("clone_string", heap::clone_string as *const u8, &[Ptr], &[Ptr]),
        ("destroy_string", heap::destroy_string as *const u8, &[Ptr], &[]),
        ("make_instance", heap::make_instance as *const u8, &[Ptr, I64, I64, Ptr], &[Ptr]),
        ("make_instance_named", heap::make_instance_named as *const u8, &[Ptr, I64, Ptr], &[Ptr]),
        ("clone_instance", heap::clone_instance as *const u8, &[Ptr], &[Ptr]),
        ("destroy_instance", heap::destroy_instance as *const u8, &[Ptr], &[]),
        ("make_list", heap::make_list as *const u8, &[I64, I8], &[Ptr]),
        ("clone_list", heap::clone_list as *const u8, &[Ptr], &[Ptr]),
        ("destroy_list", heap::destroy_list as *const u8, &[Ptr], &[]),
        ("instance_fields_ptr", heap::instance_fields_ptr as *const u8, &[Ptr], &[Ptr]),
        ("list_elements_ptr", heap::list_elements_ptr as *const u8, &[Ptr], &[Ptr]),
        ("list_element_ptr", heap::list_element_ptr as *const u8, &[Ptr, I64], &[Ptr]),
        ("list_length", heap::list_length as *const u8, &[Ptr], &[I64]),
        ("concat_list", heap::concat_list as *const u8, &[Ptr, Ptr], &[Ptr]),
        ("index_string", strings::index_string as *const u8, &[Ptr, I64], &[Ptr]),
        ("slice_string", strings::slice_string as *const u8, &[Ptr, I64, I64], &[Ptr]),
        ("splice_string", strings::splice_string as *const u8, &[Ptr, I64, I64, Ptr], &[Ptr]),
        ("compare_string", strings::compare_string as *const u8, &[Ptr, Ptr], &[I32]),
        ("concat_string", strings::concat_string as *const u8, &[Ptr, Ptr], &[Ptr]),
        ("string_length", strings::string_length as *const u8, &[Ptr], &[I64]),
        ("int_to_int", convert::int_to_int as *const u8, &[I64], &[I64]),
        ("bool_to_int", convert::bool_to_int as *const u8, &[I8], &[I64]),
        ("bool_to_float", convert::bool_to_float as *const u8, &[I8], &[F64]),
        ("int_to_float", convert::int_to_float as *const u8, &[I64], &[F64]),
        ("float_to_int", convert::float_to_int as *const u8, &[F64], &[I64]),
        ("string_to_int", convert::string_to_int as *const u8, &[Ptr], &[I64]),
        ("string_to_float", convert::string_to_float as *const u8, &[Ptr], &[F64]),
        ("int_to_complex", convert::int_to_complex as *const u8, &[I64], &[Ptr]),
        ("float_to_complex", convert::float_to_complex as *const u8, &[F64], &[Ptr]),
        ("string_to_complex", convert::string_to_complex as *const u8, &[Ptr], &[Ptr]),
        ("bool_to_string_value", convert::bool_to_string_value as *const u8, &[I8], &[Ptr]),
        ("int_to_string", convert::int_to_string as *const u8, &[I64], &[Ptr]),
        ("float_to_string", convert::float_to_string as *const u8, &[F64], &[Ptr]),
        ("complex_to_string", convert::complex_to_string as *const u8, &[Ptr], &[Ptr]),
        ("complex_real", convert::complex_real as *const u8, &[Ptr], &[F64]),
        ("complex_imag", convert::complex_imag as *const u8, &[Ptr], &[F64]),
        ("user_input", convert::user_input as *const u8, &[Ptr], &[Ptr]),
        ("to_type", convert::to_type as *const u8, &[I8, I64, I8], &[I64]),
        ("constants_get_string", constants_get_string as *const u8, &[Ptr, I64], &[Ptr]),
        ("constants_get_complex", constants_get_complex as *const u8, &[Ptr, I64], &[Ptr]),
    ]
}

/// One instantiation's mangled name plus the template data [`compile_instantiation`]
/// needs, snapshotted out of [`Cache`] before `module`/`ctx` borrow `self`
/// mutably for the rest of the submission.
struct PendingInstantiation {
    mangled: String,
    parameter_types: Vec<Type>,
    return_type: Option<Type>,
    parameters: Vec<Variable>,
    body: Vec<Stmt>,
    mode: TypeMode,
    this_class: Option<String>,
}

/// One JIT compilation session: the live Cranelift module plus the state
/// that must survive across REPL submissions — function/class templates,
/// already-compiled instantiations, and the constants pool (§4.5, §6).
pub struct Jit {
    module: JITModule,
    builder_context: FunctionBuilderContext,
    ctx: Context,
    runtime: RuntimeImports,
    cache: Cache,
    globals: GlobalScope,
    constants: Constants,
    /// Mangled name -> `FuncId`, persisted across submissions so a later
    /// submission calling an already-compiled instantiation reuses it rather
    /// than asking Cranelift to redefine the same symbol. §4.5 step 5 clears
    /// [`Cache`]'s own instantiation list every submission ("the module has
    /// absorbed them; next submission recomputes"); this map is the part of
    /// that bookkeeping the module itself must not forget.
    instantiation_funcs: HashMap<String, FuncId>,
    submission: usize,
}

impl Jit {
    /// Builds a fresh JIT session: sets up the ISA for the host triple,
    /// registers every runtime support symbol's native address, and declares
    /// each one's prototype against the module (§4.5 step 1).
    pub fn new() -> Result<Self> {
        let mut flag_builder = settings::builder();
        flag_builder.set("opt_level", "speed").map_err(|e| internal(format!("bad cranelift flag: {e}")))?;
        let isa_builder =
            cranelift_codegen::isa::lookup(Triple::host()).map_err(|e| internal(format!("unsupported host triple: {e}")))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| internal(format!("isa setup failed: {e}")))?;
        let ptr_type = isa.frontend_config().pointer_type();
        let call_conv = isa.default_call_conv();

        let mut jit_builder = JITBuilder::with_isa(isa, default_libcall_names());
        let table = runtime_table();
        for (name, addr, ..) in &table {
            jit_builder.symbol(*name, *addr);
        }
        let mut module = JITModule::new(jit_builder);

        let mut ids = HashMap::new();
        for (name, _, params, returns) in &table {
            let mut sig = Signature::new(call_conv);
            for p in *params {
                sig.params.push(AbiParam::new(p.clif(ptr_type)));
            }
            for r in *returns {
                sig.returns.push(AbiParam::new(r.clif(ptr_type)));
            }
            let id = module
                .declare_function(name, Linkage::Import, &sig)
                .map_err(|e| internal(format!("failed to declare '{name}': {e}")))?;
            ids.insert(*name, id);
        }

        Ok(Jit {
            module,
            builder_context: FunctionBuilderContext::new(),
            ctx: Context::new(),
            runtime: RuntimeImports { ids },
            cache: Cache::new(),
            globals: GlobalScope::new(),
            constants: Constants::new(),
            instantiation_funcs: HashMap::new(),
            submission: 0,
        })
    }

    fn ptr_type(&self) -> ir::Type {
        self.module.target_config().pointer_type()
    }

    /// Compiles and runs one top-level submission against `ctx`, following
    /// §4.5's pipeline: type pass, declare and emit every instantiation the
    /// pass requested, emit the submission's `program` function, link,
    /// execute, then surface whatever [`rill_runtime`] runtime error (if
    /// any) the run recorded.
    pub fn run(&mut self, source: &str, ctx: &mut RuntimeContext) -> Result<()> {
        let program = rill_parser::parse(source)?;

        TypeEngine::new(&mut self.cache, &mut self.globals, &mut self.constants).infer_program(&program.statements)?;

        ctx.ensure_globals(self.globals.len());
        ctx.constants_ptr = &mut self.constants as *mut Constants as *mut c_void;
        ctx.globals_symbols_ptr = &self.globals as *const GlobalScope as *mut c_void;
        ctx.cache_ptr = &self.cache as *const Cache as *mut c_void;

        let ptr_type = self.ptr_type();

        let pending: Vec<PendingInstantiation> = self
            .cache
            .instantiations()
            .iter()
            .filter(|inst| !self.instantiation_funcs.contains_key(&inst.mangled))
            .map(|inst| PendingInstantiation {
                mangled: inst.mangled.clone(),
                parameter_types: inst.parameter_types.clone(),
                return_type: inst.return_type.clone(),
                parameters: inst.parameters.clone(),
                body: inst.body.clone(),
                mode: inst.mode,
                this_class: inst.this_class.clone(),
            })
            .collect();

        for inst in &pending {
            let sig = self.instantiation_signature(&inst.parameter_types, inst.return_type.as_ref(), ptr_type);
            let id = self
                .module
                .declare_function(&inst.mangled, Linkage::Export, &sig)
                .map_err(|e| internal(format!("failed to declare '{}': {e}", inst.mangled)))?;
            self.instantiation_funcs.insert(inst.mangled.clone(), id);
        }

        for inst in &pending {
            self.compile_instantiation(inst, ptr_type)?;
        }

        let program_name = format!("program_{}", self.submission);
        let program_id = self.compile_program(&program_name, ptr_type, &program.statements)?;

        // §4.5 step 5: the module has absorbed this submission's
        // instantiations; the next one recomputes from a clean cache.
        self.cache.clear_instantiations();

        self.module.finalize_definitions().map_err(|e| internal(format!("link failed: {e}")))?;

        let code = self.module.get_finalized_function(program_id);
        // SAFETY: `program_id` was just declared and defined above with this
        // exact signature (one `*mut RuntimeContext` parameter, no return).
        let entry: extern "C" fn(*mut RuntimeContext) = unsafe { std::mem::transmute(code) };
        entry(ctx as *mut RuntimeContext);

        self.submission += 1;

        if let Some(err) = take_last_error() {
            return Err(err.into());
        }
        Ok(())
    }

    fn instantiation_signature(&self, parameter_types: &[Type], return_type: Option<&Type>, ptr_type: ir::Type) -> Signature {
        let mut sig = Signature::new(self.module.target_config().default_call_conv);
        sig.params.push(AbiParam::new(ptr_type));
        for ty in parameter_types {
            sig.params.push(AbiParam::new(clif_type_for(ty, ptr_type)));
        }
        // Every instantiation returns exactly one Cranelift value, whatever
        // its rill return type — an `I64` zero stands in for `None`, the
        // convention [`FuncBuilder::call_instantiation`] already hard-codes.
        let return_clif = return_type.map(|ty| clif_type_for(ty, ptr_type)).unwrap_or(ir::types::I64);
        sig.returns.push(AbiParam::new(return_clif));
        sig
    }

    /// Emits one instantiation's body: entry block with one mutable slot per
    /// parameter (§4.5 step 3), the body itself, and an exit block that
    /// destroys the parameter scope and returns the `_return` slot (or a
    /// zero placeholder for a function with no return value).
    fn compile_instantiation(&mut self, inst: &PendingInstantiation, ptr_type: ir::Type) -> Result<()> {
        let func_id = *self.instantiation_funcs.get(&inst.mangled).expect("declared before compiling");
        let sig = self.instantiation_signature(&inst.parameter_types, inst.return_type.as_ref(), ptr_type);
        self.ctx.func = Function::with_name_signature(UserFuncName::user(0, func_id.as_u32()), sig);

        {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_context);
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);
            let block_params = builder.block_params(entry).to_vec();
            let ctx_value = block_params[0];
            let exit = builder.create_block();

            let mut fb = FuncBuilder::new(
                &mut self.module,
                builder,
                &self.runtime,
                &self.cache,
                &self.globals,
                &mut self.constants,
                ptr_type,
                ctx_value,
                inst.this_class.clone(),
                &self.instantiation_funcs,
            );

            let return_var = inst.return_type.as_ref().map(|ty| fb.declare_return_slot(ty));
            fb.set_function_exit(exit, return_var);

            let bound_params: Vec<(String, Type, ir::Value)> = inst
                .parameters
                .iter()
                .zip(&inst.parameter_types)
                .zip(block_params.iter().skip(1))
                .map(|((param, ty), value)| (param.name.clone(), ty.clone(), *value))
                .collect();
            fb.begin_parameter_scope(&bound_params);

            fb.gen_block(&inst.body, Some(exit))?;
            fb.finish_instantiation_exit(exit);
        }

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(|e| internal(format!("failed to define '{}': {e}", inst.mangled)))?;
        self.module.clear_context(&mut self.ctx);
        Ok(())
    }

    /// Emits the submission's top-level `program` function: its own
    /// outermost block IS the function body (no parameter scope — this is
    /// the one function [`FuncBuilder::declares_global`] recognises), ending
    /// in a true `return void` (§4.5 step 4).
    fn compile_program(&mut self, name: &str, ptr_type: ir::Type, statements: &[Stmt]) -> Result<FuncId> {
        let mut sig = Signature::new(self.module.target_config().default_call_conv);
        sig.params.push(AbiParam::new(ptr_type));
        let func_id = self
            .module
            .declare_function(name, Linkage::Export, &sig)
            .map_err(|e| internal(format!("failed to declare '{name}': {e}")))?;
        self.ctx.func = Function::with_name_signature(UserFuncName::user(0, func_id.as_u32()), sig);

        {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_context);
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);
            let ctx_value = builder.block_params(entry)[0];
            let exit = builder.create_block();

            let mut fb = FuncBuilder::new(
                &mut self.module,
                builder,
                &self.runtime,
                &self.cache,
                &self.globals,
                &mut self.constants,
                ptr_type,
                ctx_value,
                None,
                &self.instantiation_funcs,
            );
            fb.set_function_exit(exit, None);
            fb.gen_block(statements, Some(exit))?;
            fb.finish_program_exit(exit);
        }

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(|e| internal(format!("failed to define '{name}': {e}")))?;
        self.module.clear_context(&mut self.ctx);
        Ok(func_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// `RuntimeContext::with_streams` takes `Box<dyn Write>` (implicitly
    /// `+ 'static`), so a plain `&mut Vec<u8>` borrow can't be boxed into it —
    /// sharing ownership through `Rc<RefCell<_>>` sidesteps that without
    /// touching the public signature.
    #[derive(Clone)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run_capturing(jit: &mut Jit, source: &str) -> String {
        let buf = SharedBuf(Rc::new(RefCell::new(Vec::new())));
        let mut ctx = RuntimeContext::with_streams(Box::new(Cursor::new(Vec::new())), Box::new(buf.clone()));
        jit.run(source, &mut ctx).unwrap();
        String::from_utf8(buf.0.borrow().clone()).unwrap()
    }

    #[test]
    fn prints_an_integer_literal() {
        let mut jit = Jit::new().unwrap();
        let out = run_capturing(&mut jit, "print 2 + 3;");
        assert_eq!(out, "5");
    }

    #[test]
    fn calls_a_free_function_across_two_argument_types() {
        let mut jit = Jit::new().unwrap();
        let out = run_capturing(
            &mut jit,
            "fn twice(x) return x + x; endfn print twice(3); print twice(1.5);",
        );
        assert_eq!(out, "63");
    }

    #[test]
    fn globals_and_instantiations_persist_across_submissions() {
        let mut jit = Jit::new().unwrap();
        run_capturing(&mut jit, "let total <- 10;");
        let out = run_capturing(&mut jit, "total <- total + 5; print total;");
        assert_eq!(out, "15");
    }

    #[test]
    fn string_concatenation_round_trips_through_the_constants_pool() {
        let mut jit = Jit::new().unwrap();
        let out = run_capturing(&mut jit, "print \"hello, \" + \"world\";");
        assert_eq!(out, "hello, world");
    }
}
