//! Best-effort resolution of call receivers to class names.
//!
//! No type checking happens here: a receiver's class comes from the
//! declared type of the variable it names, looked up in a fixed order, or
//! from its literal spelling. Inheritance, generics and interface binding
//! are out of reach by construction.

mod qualify;

pub use qualify::{reduce_type_name, FileContext};

use std::collections::HashMap;
use std::sync::Arc;

/// Syntactic shape of the expression a method is invoked on.
///
/// Produced by the Java syntax layer, consumed by a [`ReceiverResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver<'a> {
    /// `m()`
    Implicit,
    /// `this.m()`
    This,
    /// `super.m()`
    Super,
    /// `x.m()` or `this.x.m()`
    Identifier(&'a str),
    /// `a.b.c.m()`, the full dotted text
    Dotted(&'a str),
    /// `new T(..).m()` or `((T) x).m()`, the written type
    Typed(&'a str),
    /// Anything else: call results, array elements, literals
    Opaque,
}

/// Declarations visible from inside one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeScope {
    /// Fully qualified name, nested types as `pkg.Outer.Inner`
    pub name: String,
    pub superclass: Option<String>,
    /// Field (and record component) name -> reduced declared type
    pub fields: HashMap<String, String>,
}

impl TypeScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Declarations visible from inside one method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodScope {
    pub parameters: HashMap<String, String>,
    /// Local variables, enhanced-for variables, catch parameters and
    /// try resources anywhere in the body
    pub locals: HashMap<String, String>,
}

/// Everything a resolver may consult for one call site.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub file: &'a FileContext,
    pub enclosing_type: &'a TypeScope,
    pub method: &'a MethodScope,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        file: &'a FileContext,
        enclosing_type: &'a TypeScope,
        method: &'a MethodScope,
    ) -> Self {
        Self {
            file,
            enclosing_type,
            method,
        }
    }
}

/// Maps a call receiver to the fully qualified class it dispatches on.
pub trait ReceiverResolver: Send + Sync {
    /// `None` when the receiver cannot be resolved at all; such calls are
    /// not recorded.
    fn resolve(&self, receiver: Receiver<'_>, context: &ResolutionContext<'_>) -> Option<String>;
}

pub type SharedResolver = Arc<dyn ReceiverResolver>;

/// Default resolver: field, then parameter, then local declaration, then the
/// literal spelling as a class reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeResolver;

impl ScopeResolver {
    pub fn shared() -> SharedResolver {
        Arc::new(Self)
    }

    /// Declared type of a variable name, first match in lookup order
    pub fn declared_type<'c>(name: &str, context: &ResolutionContext<'c>) -> Option<&'c str> {
        context
            .enclosing_type
            .fields
            .get(name)
            .or_else(|| context.method.parameters.get(name))
            .or_else(|| context.method.locals.get(name))
            .map(String::as_str)
    }

    fn resolve_name(name: &str, context: &ResolutionContext<'_>) -> String {
        match Self::declared_type(name, context) {
            Some(declared) => context.file.qualify(&reduce_type_name(declared)),
            None => context.file.qualify(name),
        }
    }
}

impl ReceiverResolver for ScopeResolver {
    fn resolve(&self, receiver: Receiver<'_>, context: &ResolutionContext<'_>) -> Option<String> {
        let resolved = match receiver {
            Receiver::Implicit | Receiver::This => context.enclosing_type.name.clone(),
            Receiver::Super => match &context.enclosing_type.superclass {
                Some(superclass) => context.file.qualify(&reduce_type_name(superclass)),
                None => context.enclosing_type.name.clone(),
            },
            Receiver::Identifier(name) => Self::resolve_name(name, context),
            Receiver::Dotted(text) => {
                let last = text.rsplit('.').next().unwrap_or(text).trim();
                Self::resolve_name(last, context)
            }
            Receiver::Typed(type_text) => context.file.qualify(&reduce_type_name(type_text)),
            Receiver::Opaque => return None,
        };
        (!resolved.is_empty()).then_some(resolved)
    }
}
