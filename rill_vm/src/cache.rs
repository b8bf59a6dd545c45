//! Function/class template cache and instantiation table (§4.1, §4.5).
//!
//! Grounded on `original_source/src/engine/Cache.hpp`/`.cpp`: `addClassTemplate`
//! / `addFunctionTemplate` fail if the name is already registered;
//! `addFunctionInstantiation` resolves a recursive function's return type
//! with a placeholder-insert-then-replace scheme (insert an instantiation
//! with no return type yet, so a recursive call found while walking the body
//! sees "no known return type" rather than looping forever, then overwrite
//! the placeholder once the body walk completes); `addNativeFunction` loads
//! a `dlopen`/`dlsym` symbol (only the Unix path is built, matching
//! SPEC_FULL §14).

use crate::error::{LogicError, Result};
use crate::infer::TypeMode;
use crate::types::Type;
use rill_parser::ast::{Stmt, Variable};
use std::collections::{HashMap, HashSet};

pub struct FunctionTemplate {
    pub parameters: Vec<Variable>,
    pub body: Vec<rill_parser::ast::Stmt>,
}

pub struct ClassTemplate {
    pub variables: Vec<Variable>,
    pub methods: HashMap<String, FunctionTemplate>,
}

impl ClassTemplate {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Instantiation {
    /// Mangled linkage name (§4.1) — the symbol [`crate::driver`] declares
    /// this instantiation's IR function under.
    pub mangled: String,
    pub parameter_types: Vec<Type>,
    /// `None` while the instantiation is a recursion-guard placeholder or
    /// the function genuinely returns nothing.
    pub return_type: Option<Type>,
    /// The template body to compile, carried alongside the mangled name
    /// since the mangling scheme (§4.1) isn't reversible: a method's
    /// unmangled callable name is `"ClassName.methodName"`, which is itself
    /// a valid (if unusual) free-function name, so splitting the mangled
    /// string back apart would be ambiguous.
    pub parameters: Vec<Variable>,
    pub body: Vec<Stmt>,
    pub mode: TypeMode,
    /// `Some(class_name)` for a method instantiation, so codegen knows to
    /// treat parameter 0 as `_this` and resolve field accesses against that
    /// class (§4.3's "Field access chain").
    pub this_class: Option<String>,
}

pub struct Cache {
    functions: HashMap<String, FunctionTemplate>,
    classes: HashMap<String, ClassTemplate>,
    instantiations: Vec<Instantiation>,
    instantiation_index: HashMap<String, usize>,
    in_progress: HashSet<String>,
    #[cfg(unix)]
    native_libraries: HashMap<String, libloading::Library>,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            functions: HashMap::new(),
            classes: HashMap::new(),
            instantiations: Vec::new(),
            instantiation_index: HashMap::new(),
            in_progress: HashSet::new(),
            #[cfg(unix)]
            native_libraries: HashMap::new(),
        }
    }

    pub fn add_function_template(&mut self, name: &str, template: FunctionTemplate) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(LogicError::FunctionExists(name.to_string()).into());
        }
        self.functions.insert(name.to_string(), template);
        Ok(())
    }

    pub fn add_class_template(&mut self, name: &str, template: ClassTemplate) -> Result<()> {
        if self.classes.contains_key(name) {
            return Err(LogicError::ClassExists(name.to_string()).into());
        }
        self.classes.insert(name.to_string(), template);
        Ok(())
    }

    pub fn function_template(&self, name: &str) -> Option<&FunctionTemplate> {
        self.functions.get(name)
    }

    pub fn class_template(&self, name: &str) -> Option<&ClassTemplate> {
        self.classes.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Looks up an existing instantiation's return type by mangled name.
    /// `Some(None)` means the instantiation exists but has no resolved
    /// return type yet (either mid-inference or genuinely returns nothing);
    /// `None` means no such instantiation has been started.
    pub fn instantiation_return_type(&self, mangled: &str) -> Option<Option<&Type>> {
        self.instantiation_index
            .get(mangled)
            .map(|&idx| self.instantiations[idx].return_type.as_ref())
    }

    /// Starts (or reuses) an instantiation record for `mangled`, inserting a
    /// return-type-less placeholder the first time. Call this *before*
    /// walking the function body so a recursive call resolves against the
    /// placeholder instead of recursing into inference forever.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_instantiation(
        &mut self,
        mangled: &str,
        parameter_types: Vec<Type>,
        parameters: Vec<Variable>,
        body: Vec<Stmt>,
        mode: TypeMode,
        this_class: Option<String>,
    ) -> usize {
        if let Some(&idx) = self.instantiation_index.get(mangled) {
            return idx;
        }
        let idx = self.instantiations.len();
        self.instantiations.push(Instantiation {
            mangled: mangled.to_string(),
            parameter_types,
            return_type: None,
            parameters,
            body,
            mode,
            this_class,
        });
        self.instantiation_index.insert(mangled.to_string(), idx);
        self.in_progress.insert(mangled.to_string());
        idx
    }

    /// Records the inferred return type once the body walk completes,
    /// clearing the recursion guard.
    pub fn finish_instantiation(&mut self, idx: usize, return_type: Option<Type>) {
        self.instantiations[idx].return_type = return_type;
        self.in_progress.remove(&self.instantiations[idx].mangled);
    }

    pub fn is_in_progress(&self, mangled: &str) -> bool {
        self.in_progress.contains(mangled)
    }

    pub fn instantiation(&self, idx: usize) -> &Instantiation {
        &self.instantiations[idx]
    }

    pub fn instantiations(&self) -> &[Instantiation] {
        &self.instantiations
    }

    /// Drops this submission's instantiation list once [`crate::driver`] has
    /// emitted IR for all of it (§4.5 step 5: "the module has absorbed them;
    /// next submission recomputes"). Function/class templates and the
    /// instantiation *index* of mangled names already defined in the JIT
    /// module are unaffected — those live on `driver::Jit` so a later
    /// submission calling the same instantiation again reuses its compiled
    /// code instead of re-emitting it.
    pub fn clear_instantiations(&mut self) {
        self.instantiations.clear();
        self.instantiation_index.clear();
        self.in_progress.clear();
    }

    /// Loads a native function symbol. An empty `library` means "look in
    /// the current process" (the host binary and everything statically
    /// linked into it, matching `Cache::addNativeFunction`'s
    /// empty-libraryName special case).
    ///
    /// # Safety
    /// Calling arbitrary native code through the returned pointer is
    /// inherently unsafe; the caller is responsible for matching the
    /// symbol's real signature.
    #[cfg(unix)]
    pub unsafe fn load_native_symbol(&mut self, library: &str, symbol: &str) -> Result<*const ()> {
        let lib = if library.is_empty() {
            self.native_libraries.entry(String::new()).or_insert_with(|| {
                libloading::os::unix::Library::this().into()
            })
        } else if let Some(lib) = self.native_libraries.get(library) {
            lib
        } else {
            let loaded = libloading::Library::new(library)
                .map_err(|_| LogicError::BadLibrary(library.to_string()))?;
            self.native_libraries.entry(library.to_string()).or_insert(loaded)
        };
        let sym: libloading::Symbol<*const ()> = lib
            .get(symbol.as_bytes())
            .map_err(|_| LogicError::BadNativeFn(symbol.to_string()))?;
        Ok(*sym)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    #[test]
    fn duplicate_function_template_is_rejected() {
        let mut cache = Cache::new();
        cache
            .add_function_template("f", FunctionTemplate { parameters: vec![], body: vec![] })
            .unwrap();
        let err = cache
            .add_function_template("f", FunctionTemplate { parameters: vec![], body: vec![] })
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Logic(LogicError::FunctionExists(_))));
    }

    #[test]
    fn instantiation_placeholder_then_resolved() {
        let mut cache = Cache::new();
        let idx = cache.begin_instantiation("f.2", vec![Type::scalar(Kind::Integer)], vec![], vec![], TypeMode::FreeFunction, None);
        assert_eq!(cache.instantiation_return_type("f.2"), Some(None));
        assert!(cache.is_in_progress("f.2"));
        cache.finish_instantiation(idx, Some(Type::scalar(Kind::Integer)));
        assert_eq!(cache.instantiation_return_type("f.2"), Some(Some(&Type::scalar(Kind::Integer))));
        assert!(!cache.is_in_progress("f.2"));
    }

    #[test]
    fn reentering_an_instantiation_reuses_the_same_slot() {
        let mut cache = Cache::new();
        let first = cache.begin_instantiation("f.2", vec![], vec![], vec![], TypeMode::FreeFunction, None);
        let second = cache.begin_instantiation("f.2", vec![], vec![], vec![], TypeMode::FreeFunction, None);
        assert_eq!(first, second);
    }

    #[test]
    fn clearing_instantiations_keeps_templates() {
        let mut cache = Cache::new();
        cache
            .add_function_template("f", FunctionTemplate { parameters: vec![], body: vec![] })
            .unwrap();
        cache.begin_instantiation("f.2", vec![], vec![], vec![], TypeMode::FreeFunction, None);
        cache.clear_instantiations();
        assert!(cache.instantiations().is_empty());
        assert!(cache.instantiation_return_type("f.2").is_none());
        assert!(cache.has_function("f"));
    }
}
