//! The query surface: build the indices once, answer table queries many
//! times.

pub mod chains;

pub use chains::{ChainTracer, TraceOutcome};

use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info_span;

use crate::cache::CacheStore;
use crate::config::{ImpactmapConfig, LayerPolicy, NamingConventionPolicy, SharedLayerPolicy};
use crate::core::{
    split_method_identifier, CallChain, CallSiteIndex, ImpactAnalysisResult, IndexStatistics,
    MapperStatement, Module, TableImpact, TableIndex, TableRepositoryMapping,
};
use crate::errors::{ImpactError, Result};
use crate::indexer::{build_table_index, CallSiteIndexer, RepositoryLinker};
use crate::observability::{CancellationToken, SharedSink, TracingSink};
use crate::parsers::normalize_table_name;
use crate::resolver::{ScopeResolver, SharedResolver};
use crate::scanner::{discover_modules, find_java_sources};

/// Read-only indices of one initialized root
struct AnalysisState {
    root: PathBuf,
    modules: Vec<Module>,
    tables: Arc<TableIndex>,
    mappings: Arc<HashMap<String, TableRepositoryMapping>>,
    call_sites: Arc<CallSiteIndex>,
}

/// Answers "which business methods reach this table?".
///
/// ```no_run
/// use impactmap::{ImpactAnalyzer, ImpactmapConfig};
/// use std::path::Path;
///
/// let analyzer = ImpactAnalyzer::new(ImpactmapConfig::default());
/// analyzer.initialize(Path::new("/src/monolith"))?;
/// let result = analyzer.analyze_table_impact("orders")?;
/// for chain in &result.call_chains {
///     println!("{chain}");
/// }
/// # Ok::<(), impactmap::ImpactError>(())
/// ```
pub struct ImpactAnalyzer {
    config: ImpactmapConfig,
    sink: SharedSink,
    policy: SharedLayerPolicy,
    resolver: SharedResolver,
    cancel: CancellationToken,
    state: RwLock<Option<Arc<AnalysisState>>>,
}

impl ImpactAnalyzer {
    pub fn new(config: ImpactmapConfig) -> Self {
        let policy = NamingConventionPolicy::shared(config.layers.clone());
        Self {
            config,
            sink: TracingSink::shared(),
            policy,
            resolver: ScopeResolver::shared(),
            cancel: CancellationToken::new(),
            state: RwLock::new(None),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_layer_policy(mut self, policy: SharedLayerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: SharedResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ImpactmapConfig {
        &self.config
    }

    /// Token that stops a running [`initialize`](Self::initialize)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Root of the last successful initialization
    pub fn root(&self) -> Option<PathBuf> {
        self.state.read().as_ref().map(|state| state.root.clone())
    }

    pub fn modules(&self) -> Vec<Module> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.modules.clone())
            .unwrap_or_default()
    }

    /// Build every index for `root`.
    ///
    /// The table index and repository mapping are built while the call-site
    /// index builds alongside. On error the analyzer stays uninitialized.
    pub fn initialize(&self, root: &Path) -> Result<()> {
        let _span = info_span!("initialize", root = %root.display()).entered();
        *self.state.write() = None;

        if !root.is_dir() {
            return Err(ImpactError::InvalidRoot {
                path: root.to_path_buf(),
            });
        }
        let modules = discover_modules(root)?;
        self.sink.info(&format!(
            "Discovered {} modules under {}",
            modules.len(),
            root.display()
        ));
        let store = CacheStore::for_root(root, &self.config.cache, self.sink.as_ref());
        let sources = find_java_sources(&modules, &self.config.indexing.source_exclude);

        let pool = self
            .config
            .parallel
            .build_thread_pool()
            .map_err(|e| ImpactError::Config(format!("Failed to build thread pool: {e}")))?;

        let (linked, call_sites) = pool.install(|| {
            rayon::join(
                || self.build_mappings(&modules, &store),
                || self.build_call_sites(&sources, &store),
            )
        });
        let (tables, mappings) = linked?;
        let call_sites = call_sites?;
        self.cancel.check()?;

        let mappings = mappings
            .into_iter()
            .map(|mapping| (mapping.table_name.clone(), mapping))
            .collect();
        *self.state.write() = Some(Arc::new(AnalysisState {
            root: root.to_path_buf(),
            modules,
            tables: Arc::new(tables),
            mappings: Arc::new(mappings),
            call_sites: Arc::new(call_sites),
        }));
        self.sink.info("Impact analyzer initialized");
        Ok(())
    }

    fn build_mappings(
        &self,
        modules: &[Module],
        store: &CacheStore,
    ) -> Result<(TableIndex, Vec<TableRepositoryMapping>)> {
        let sink = self.sink.as_ref();
        let build = build_table_index(modules, &self.config.indexing, store, sink, &self.cancel)?;
        sink.debug(&format!(
            "Table index of {} tables over {} mapper files ({})",
            build.index.len(),
            build.mapper_files,
            if build.from_cache { "cached" } else { "rebuilt" }
        ));
        let linker = RepositoryLinker::new(self.policy.clone());
        let mappings = linker.link(
            &build.index,
            &build.fingerprint,
            &self.config.indexing,
            store,
            sink,
            &self.cancel,
        )?;
        Ok((build.index, mappings))
    }

    fn build_call_sites(&self, sources: &[PathBuf], store: &CacheStore) -> Result<CallSiteIndex> {
        CallSiteIndexer::new(self.resolver.clone(), self.config.resolution.clone()).build(
            sources,
            &self.config.indexing,
            store,
            self.sink.as_ref(),
            &self.cancel,
        )
    }

    fn state(&self) -> Result<Arc<AnalysisState>> {
        self.state.read().clone().ok_or(ImpactError::NotInitialized)
    }

    /// Every call chain from a business-layer (or outermost) method down to
    /// the repository methods touching `table_name`. The name is matched
    /// case-insensitively and without schema prefix.
    pub fn analyze_table_impact(&self, table_name: &str) -> Result<ImpactAnalysisResult> {
        let state = self.state()?;
        Ok(self.analyze_with(&state, table_name))
    }

    /// [`analyze_table_impact`](Self::analyze_table_impact) for several
    /// tables at once, results in input order
    pub fn analyze_tables<S: AsRef<str> + Sync>(
        &self,
        table_names: &[S],
    ) -> Result<Vec<ImpactAnalysisResult>> {
        let state = self.state()?;
        Ok(table_names
            .par_iter()
            .map(|name| self.analyze_with(&state, name.as_ref()))
            .collect())
    }

    /// Names of every indexed table, sorted
    pub fn indexed_tables(&self) -> Result<Vec<String>> {
        let state = self.state()?;
        Ok(state.tables.tables().map(String::from).collect())
    }

    fn analyze_with(&self, state: &AnalysisState, table_name: &str) -> ImpactAnalysisResult {
        let _span = info_span!("analyze_table", table = table_name).entered();
        let table = normalize_table_name(table_name);
        let mut result = ImpactAnalysisResult::empty(table.clone());

        let Some(mapping) = state.mappings.get(&table) else {
            return result.with_warning(format!("No mapper methods found for table: {table}"));
        };

        let mut seen = HashSet::new();
        result.unresolved_repository_references = mapping
            .unresolved_methods()
            .map(ToString::to_string)
            .filter(|m| seen.insert(m.clone()))
            .collect();

        let mut seen = HashSet::new();
        let resolved: Vec<String> = mapping
            .resolved_methods()
            .map(ToString::to_string)
            .filter(|m| seen.insert(m.clone()))
            .collect();
        if resolved.is_empty() {
            return result.with_warning(format!(
                "No resolved repository methods found for table: {table}"
            ));
        }

        let tracer = ChainTracer::new(&state.call_sites, self.policy.as_ref())
            .with_max_chains(self.config.analysis.max_chains_per_method);
        let outcomes: Vec<TraceOutcome> = resolved
            .par_iter()
            .map(|method| tracer.trace(method, &table))
            .collect();

        for (method, outcome) in resolved.iter().zip(outcomes) {
            if outcome.truncated {
                result.warnings.push(format!(
                    "Call chains for {method} truncated at {} chains",
                    outcome.chains.len()
                ));
            }
            result.call_chains.extend(outcome.chains);
        }

        let statements = state.tables.get(&table).unwrap_or(&[]);
        result.impacts = business_impacts(
            &result.call_chains,
            mapping,
            statements,
            self.policy.as_ref(),
        );
        self.sink.debug(&format!(
            "{table}: {} chains, {} impacts",
            result.call_chains.len(),
            result.impacts.len()
        ));
        result
    }

    /// Counts over the built indices; all zero before initialization
    pub fn get_statistics(&self) -> IndexStatistics {
        let Ok(state) = self.state() else {
            return IndexStatistics::default();
        };
        IndexStatistics {
            tables_indexed: state.tables.len(),
            repository_mappings: state.mappings.len(),
            resolved_repository_methods: state
                .mappings
                .values()
                .map(|m| m.resolved_methods().count())
                .sum(),
            unresolved_repository_methods: state
                .mappings
                .values()
                .map(|m| m.unresolved_methods().count())
                .sum(),
            distinct_callees: state.call_sites.distinct_callees(),
            total_call_references: state.call_sites.total_references(),
        }
    }

    /// Delete the cached artifacts of `root`, returning how many existed
    pub fn clear_cache(&self, root: &Path) -> Result<usize> {
        CacheStore::for_root(root, &self.config.cache, self.sink.as_ref()).clear()
    }
}

/// Flat business-method pairs for every chain whose outermost caller is in
/// the business layer, one per linked statement, without duplicates.
fn business_impacts(
    chains: &[CallChain],
    mapping: &TableRepositoryMapping,
    statements: &[MapperStatement],
    policy: &dyn LayerPolicy,
) -> Vec<TableImpact> {
    let mut seen = HashSet::new();
    let mut impacts = Vec::new();
    for chain in chains {
        let Some(head) = chain.call_path.first() else {
            continue;
        };
        let Some((class, method)) = split_method_identifier(head) else {
            continue;
        };
        if !policy.is_business_layer(class) {
            continue;
        }
        let linked = statements.iter().filter(|statement| {
            mapping
                .method_for(statement)
                .is_some_and(|m| m.to_string() == chain.repository_method)
        });
        for statement in linked {
            let impact = TableImpact {
                module: statement.module.clone(),
                mapper_file: statement.mapper_path.clone(),
                mapper_namespace: statement.namespace.clone(),
                statement_id: statement.id.clone(),
                business_class: class.to_string(),
                business_method: method.to_string(),
            };
            if seen.insert(impact.clone()) {
                impacts.push(impact);
            }
        }
    }
    impacts
}
