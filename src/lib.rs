//! JScript-compatible ECMAScript engine core
//!
//! Source text is compiled into a shareable bytecode unit and executed by a
//! stack interpreter over dispatch objects. Objects are reference counted;
//! a trial-deletion collector reclaims cycles.
//!
//! # Example
//!
//! ```
//! use jscore::{Engine, JsValue};
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("1 + 2 * 3").unwrap();
//! assert_eq!(result, JsValue::Int(7));
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod gc;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod string_dict;
pub mod typeinfo;
pub mod value;

pub use compiler::{Bytecode, CompileOptions, LanguageMode};
pub use error::{ErrorCode, ErrorKind, ErrorReport, HostError, JsError};
pub use gc::GcStats;
pub use host::{HostObject, HostPropDesc, SetOutcome};
pub use interpreter::{EngineConfig, Interpreter};
pub use object::{CaseMode, PropFlags};
pub use typeinfo::{TypeInfo, TypeInfoError};
pub use value::{CheapClone, JsObjectRef, JsString, JsValue};

use std::rc::Rc;

use log::debug;

use object::{ObjectData, get_member, lookup_member};

/// Unit name used when the host does not supply one
const DEFAULT_UNIT: &str = "script";

/// One script engine instance.
///
/// Owns the interpreter context: global object, heap and configuration.
/// Failures that escape a top-level call are offered to the error handler
/// once before being returned.
pub struct Engine {
    interp: Interpreter,
}

impl Engine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            interp: Interpreter::new(config),
        }
    }

    /// Run `source` in eval mode; the result is the value of the last
    /// expression statement
    pub fn eval(&mut self, source: &str) -> Result<JsValue, JsError> {
        let options = CompileOptions {
            eval_mode: true,
            ..CompileOptions::program(DEFAULT_UNIT)
        };
        let code = self.compile_with(source, options)?;
        self.run(&code)
    }

    /// Run `source` as a program, for its side effects
    pub fn exec(&mut self, source: &str) -> Result<(), JsError> {
        let code = self.compile(source)?;
        self.run(&code).map(|_| ())
    }

    /// Compile `source` into a unit that can be run any number of times
    pub fn compile(&mut self, source: &str) -> Result<Rc<Bytecode>, JsError> {
        self.compile_with(source, CompileOptions::program(DEFAULT_UNIT))
    }

    pub fn compile_with(&mut self, source: &str, options: CompileOptions) -> Result<Rc<Bytecode>, JsError> {
        let unit = options.name.clone();
        match self.interp.compile(source, options) {
            Ok(code) => {
                debug!("compiled '{}': {} instructions", code.name, code.instrs.len());
                Ok(code)
            }
            Err(err) => Err(self.interp.report_error(err, Some((&unit, source)))),
        }
    }

    /// Execute a compiled unit as global code
    pub fn run(&mut self, code: &Rc<Bytecode>) -> Result<JsValue, JsError> {
        self.interp
            .execute(code)
            .map_err(|err| self.interp.report_error(err, None))
    }

    /// Call a function value with `this` set to the global `this`
    pub fn call(&mut self, func: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let this = self.interp.global_this.clone();
        self.interp
            .call_function(func, this, args)
            .map_err(|err| self.interp.report_error(err, None))
    }

    /// Read a global variable
    pub fn get_global(&mut self, name: &str) -> Result<JsValue, JsError> {
        let global = self.interp.global.cheap_clone();
        get_member(&mut self.interp, &global, name)
    }

    /// Look up a member of `obj` the way a host dispatch call does. With
    /// [`CaseMode::Insensitive`] an exact spelling still wins, and two
    /// members differing only by case resolve to `None`.
    pub fn lookup_member(
        &mut self,
        obj: &JsObjectRef,
        name: &str,
        case: CaseMode,
    ) -> Result<Option<JsValue>, JsError> {
        lookup_member(&mut self.interp, obj, name, case)
    }

    /// Force a collection; returns the number of objects reclaimed
    pub fn collect_garbage(&mut self) -> Result<usize, JsError> {
        self.interp.collect_garbage()
    }

    pub fn gc_stats(&self) -> GcStats {
        self.interp.gc_stats()
    }

    /// Publish a host object as the global `name`
    pub fn add_named_item(&mut self, name: &str, host: Rc<dyn HostObject>) -> JsObjectRef {
        let obj = self.interp.alloc(
            ObjectData::Host(object::HostData { host }),
            Some(self.interp.object_prototype.cheap_clone()),
        );
        self.interp.define_global(name, JsValue::Object(obj.cheap_clone()));
        obj
    }

    /// Set the value of `this` in global code
    pub fn set_global_this(&mut self, value: JsValue) {
        self.interp.global_this = value;
    }

    /// Install the callback that sees unhandled failures. Returning true
    /// marks the failure handled: the call then fails with
    /// [`JsError::AlreadyReported`] instead of the original error.
    pub fn set_error_handler(&mut self, handler: impl FnMut(&ErrorReport) -> bool + 'static) {
        self.interp.error_handler = Some(Box::new(handler));
    }

    /// Project the enumerable members of `obj`
    pub fn type_info(&mut self, obj: &JsObjectRef) -> Result<TypeInfo, TypeInfoError> {
        typeinfo::project(&mut self.interp, obj)
    }

    pub fn global(&self) -> JsObjectRef {
        self.interp.global.cheap_clone()
    }

    /// The underlying interpreter context
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
