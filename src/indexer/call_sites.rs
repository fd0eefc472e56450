//! Reverse call-site index over every Java source file.
//!
//! Files are parsed on the rayon pool. Each worker sends its call sites
//! over a channel to one consumer thread, which owns the index and the
//! on-disk call log.

use crossbeam::channel::unbounded;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info_span;
use tree_sitter::Node;

use crate::cache::{CacheStore, CallLogAppender, CallLogRecord};
use crate::config::{IndexingConfig, ResolutionConfig};
use crate::core::{CallReference, CallSiteIndex};
use crate::errors::Result;
use crate::observability::{CancellationToken, DiagnosticSink};
use crate::parsers::java::{self, JavaAst};
use crate::resolver::{
    FileContext, MethodScope, ReceiverResolver, ResolutionContext, SharedResolver, TypeScope,
};

/// Every recorded call in `ast` as `(callee, call site)` pairs, in source order.
///
/// Calls made outside any method body (field initializers, static blocks)
/// are not recorded. Calls inside lambdas and anonymous class bodies belong
/// to the enclosing method.
pub fn extract_call_sites(
    ast: &JavaAst,
    resolver: &dyn ReceiverResolver,
    resolution: &ResolutionConfig,
) -> Vec<(String, CallReference)> {
    let file = java::file_context(ast);
    let mut visitor = CallSiteVisitor {
        source: &ast.source,
        ast,
        file: &file,
        resolver,
        resolution,
        calls: Vec::new(),
    };
    let root = ast.tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if java::is_type_declaration(&child) {
            if let Some(name) = java::type_declaration_name(&child, visitor.source) {
                visitor.visit_type(&child, name.to_string());
            }
        }
    }
    visitor.calls
}

struct CallSiteVisitor<'a> {
    source: &'a str,
    ast: &'a JavaAst,
    file: &'a FileContext,
    resolver: &'a dyn ReceiverResolver,
    resolution: &'a ResolutionConfig,
    calls: Vec<(String, CallReference)>,
}

impl CallSiteVisitor<'_> {
    /// `nested_name` is the type's name within its file, `Outer.Inner`
    fn visit_type(&mut self, node: &Node, nested_name: String) {
        let qualified = self.file.declared_type_name(&nested_name);
        let scope = java::type_scope(node, self.source, qualified);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_members(&body, &nested_name, &scope);
        }
    }

    fn visit_members(&mut self, node: &Node, nested_name: &str, scope: &TypeScope) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if java::is_type_declaration(&child) {
                self.visit_nested_type(&child, nested_name);
            } else if java::is_method_declaration(&child) {
                self.visit_method(&child, nested_name, scope);
            } else {
                self.visit_members(&child, nested_name, scope);
            }
        }
    }

    fn visit_nested_type(&mut self, node: &Node, outer: &str) {
        if let Some(name) = java::type_declaration_name(node, self.source) {
            self.visit_type(node, format!("{outer}.{name}"));
        }
    }

    fn visit_method(&mut self, node: &Node, nested_name: &str, scope: &TypeScope) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let caller = format!("{}.{}", scope.name, java::node_text(&name, self.source));
        let method = java::method_scope(node, self.source);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_body(&body, nested_name, &caller, scope, &method);
        }
    }

    fn visit_body(
        &mut self,
        node: &Node,
        nested_name: &str,
        caller: &str,
        scope: &TypeScope,
        method: &MethodScope,
    ) {
        if java::is_type_declaration(node) {
            // local class: its own scope and callers
            self.visit_nested_type(node, nested_name);
            return;
        }
        if node.kind() == "method_invocation" {
            self.record_call(node, caller, scope, method);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_body(&child, nested_name, caller, scope, method);
        }
    }

    fn record_call(&mut self, node: &Node, caller: &str, scope: &TypeScope, method: &MethodScope) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let method_name = java::node_text(&name, self.source);
        if self.resolution.is_ignored_method(method_name) {
            return;
        }
        let receiver = java::receiver_of(node, self.source);
        let context = ResolutionContext::new(self.file, scope, method);
        let Some(class) = self.resolver.resolve(receiver, &context) else {
            return;
        };
        self.calls.push((
            format!("{class}.{method_name}"),
            CallReference::new(caller, &self.ast.path, java::node_line(&name)),
        ));
    }
}

/// Builds the [`CallSiteIndex`] for a set of source files.
pub struct CallSiteIndexer {
    resolver: SharedResolver,
    resolution: ResolutionConfig,
}

impl CallSiteIndexer {
    pub fn new(resolver: SharedResolver, resolution: ResolutionConfig) -> Self {
        Self {
            resolver,
            resolution,
        }
    }

    /// Parse `files` in parallel and merge every call site.
    ///
    /// The call log, when the store has one, is rewritten from scratch and
    /// receives records in batches of `call_log_batch`.
    pub fn build(
        &self,
        files: &[PathBuf],
        config: &IndexingConfig,
        store: &CacheStore,
        sink: &dyn DiagnosticSink,
        cancel: &CancellationToken,
    ) -> Result<CallSiteIndex> {
        let _span = info_span!("call_sites", files = files.len()).entered();

        let mut appender = store.call_log_path().and_then(|path| {
            match CallLogAppender::create(&path, config.call_log_batch) {
                Ok(appender) => Some(appender),
                Err(e) => {
                    sink.warn(&format!("Call log disabled: {e}"));
                    None
                }
            }
        });

        let (sender, receiver) = unbounded::<Vec<(String, CallReference)>>();

        let index = std::thread::scope(|scope| {
            let consumer = scope.spawn(|| {
                let mut index = CallSiteIndex::new();
                for calls in receiver {
                    for (callee, reference) in calls {
                        if let Some(appender) = appender.as_mut() {
                            appender.push(CallLogRecord::new(&callee, &reference), sink);
                        }
                        index.insert(callee, reference);
                    }
                }
                if let Some(appender) = appender.as_mut() {
                    appender.flush(sink);
                    sink.debug(&format!("Call log holds {} records", appender.written()));
                }
                index
            });

            files.par_iter().for_each_with(sender, |sender, path| {
                if cancel.is_cancelled() {
                    return;
                }
                let calls = self.extract_file(path, sink);
                if !calls.is_empty() {
                    // the consumer only stops once every sender is gone
                    let _ = sender.send(calls);
                }
            });

            consumer.join()
        });

        let mut index = match index {
            Ok(index) => index,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        cancel.check()?;

        index.finalize();
        sink.info(&format!(
            "Indexed {} call sites for {} callees from {} files",
            index.total_references(),
            index.distinct_callees(),
            files.len()
        ));
        Ok(index)
    }

    fn extract_file(&self, path: &Path, sink: &dyn DiagnosticSink) -> Vec<(String, CallReference)> {
        let ast = match java::parse_file(path) {
            Ok(ast) => ast,
            Err(e) => {
                sink.warn(&format!("Skipping source file: {e}"));
                return Vec::new();
            }
        };
        if java::has_parse_errors(&ast.tree) {
            sink.debug(&format!(
                "Syntax errors in {}, indexing what parsed",
                path.display()
            ));
        }
        extract_call_sites(&ast, self.resolver.as_ref(), &self.resolution)
    }
}
