//! Backward breadth-first search from a repository method to its callers.

use std::collections::{HashSet, VecDeque};

use crate::config::LayerPolicy;
use crate::core::{split_method_identifier, CallChain, CallReference, CallSiteIndex};

/// Chains found for one repository method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOutcome {
    pub chains: Vec<CallChain>,
    /// Emission stopped at the configured chain limit
    pub truncated: bool,
}

struct SearchState {
    method: String,
    path: Vec<String>,
    lines: Vec<usize>,
    visited: HashSet<String>,
}

/// Walks the reverse call graph.
///
/// Each search state carries its own visited set, so a method may appear
/// in many chains but never twice in one.
pub struct ChainTracer<'a> {
    call_sites: &'a CallSiteIndex,
    policy: &'a dyn LayerPolicy,
    max_chains: Option<usize>,
}

impl<'a> ChainTracer<'a> {
    pub fn new(call_sites: &'a CallSiteIndex, policy: &'a dyn LayerPolicy) -> Self {
        Self {
            call_sites,
            policy,
            max_chains: None,
        }
    }

    pub fn with_max_chains(mut self, max_chains: Option<usize>) -> Self {
        self.max_chains = max_chains;
        self
    }

    /// True when the caller's declaring type is a business-layer type
    pub fn is_business_method(&self, method: &str) -> bool {
        split_method_identifier(method)
            .map(|(class, _)| self.policy.is_business_layer(class))
            .unwrap_or(false)
    }

    pub fn trace(&self, repository_method: &str, table_name: &str) -> TraceOutcome {
        let mut chains = Vec::new();
        let mut truncated = false;
        let seed: HashSet<&str> = self
            .call_sites
            .matching_callees(repository_method)
            .into_iter()
            .chain(std::iter::once(repository_method))
            .collect();
        let mut queue = VecDeque::new();
        queue.push_back(SearchState {
            method: repository_method.to_string(),
            path: Vec::new(),
            lines: Vec::new(),
            visited: HashSet::new(),
        });

        'search: while let Some(state) = queue.pop_front() {
            let callers: Vec<&CallReference> = if state.path.is_empty() {
                self.call_sites.callers_matching(&state.method)
            } else {
                self.call_sites.callers(&state.method).iter().collect()
            };

            if callers.is_empty() && !state.path.is_empty() {
                if self.at_limit(chains.len()) {
                    truncated = true;
                    break;
                }
                chains.push(CallChain::new(
                    state.path,
                    state.lines,
                    repository_method,
                    table_name,
                ));
                continue;
            }

            for reference in callers {
                let caller = &reference.caller;
                if seed.contains(caller.as_str()) || state.visited.contains(caller) {
                    continue;
                }

                let mut path = Vec::with_capacity(state.path.len() + 1);
                path.push(caller.clone());
                path.extend(state.path.iter().cloned());
                let mut lines = Vec::with_capacity(state.lines.len() + 1);
                lines.push(reference.line);
                lines.extend(state.lines.iter().copied());

                if self.is_business_method(caller) {
                    if self.at_limit(chains.len()) {
                        truncated = true;
                        break 'search;
                    }
                    chains.push(CallChain::new(path, lines, repository_method, table_name));
                } else {
                    let mut visited = state.visited.clone();
                    visited.insert(caller.clone());
                    queue.push_back(SearchState {
                        method: caller.clone(),
                        path,
                        lines,
                        visited,
                    });
                }
            }
        }

        if chains.is_empty() {
            chains.push(CallChain::direct(repository_method, table_name));
        }
        TraceOutcome { chains, truncated }
    }

    fn at_limit(&self, emitted: usize) -> bool {
        self.max_chains.is_some_and(|max| emitted >= max)
    }
}
