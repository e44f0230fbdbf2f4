use super::sequence::LOAD_SEQUENCE;
use super::types::LoadSpec;
use std::collections::{HashMap, HashSet, VecDeque};

/// Resolves FK dependencies between load steps
pub struct DependencyResolver {
    sequence: &'static [&'static LoadSpec],
    /// Map of table name -> tables it depends on
    deps: HashMap<&'static str, HashSet<&'static str>>,
    /// Map of table name -> tables that depend on it
    reverse_deps: HashMap<&'static str, HashSet<&'static str>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::for_sequence(LOAD_SEQUENCE)
    }

    pub fn for_sequence(sequence: &'static [&'static LoadSpec]) -> Self {
        let mut deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        let mut reverse_deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();

        for spec in sequence {
            let spec_deps = spec.dependencies();
            for dep in &spec_deps {
                reverse_deps.entry(*dep).or_default().insert(spec.table);
            }
            deps.insert(spec.table, spec_deps);
        }

        Self {
            sequence,
            deps,
            reverse_deps,
        }
    }

    /// Check that every table appears after all of its FK parents
    pub fn validate_order(&self) -> Result<(), String> {
        let mut seen: HashSet<&str> = HashSet::new();

        for spec in self.sequence {
            for dep in &self.deps[spec.table] {
                if !self.deps.contains_key(dep) {
                    return Err(format!(
                        "{} depends on {}, which is not in the load sequence",
                        spec.table, dep
                    ));
                }
                if !seen.contains(dep) {
                    return Err(format!(
                        "{} is loaded before its parent {}",
                        spec.table, dep
                    ));
                }
            }
            seen.insert(spec.table);
        }

        Ok(())
    }

    /// Requested tables plus all of their FK ancestors, in load order
    pub fn resolve_includes(&self, requested: &[&str]) -> Result<Vec<&'static LoadSpec>, String> {
        let mut included: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = requested.iter().copied().collect();

        while let Some(table) = queue.pop_front() {
            if included.contains(table) {
                continue;
            }

            let Some(table_deps) = self.deps.get(table) else {
                return Err(format!("Unknown table: {}", table));
            };

            included.insert(table);

            for dep in table_deps {
                if !included.contains(dep) {
                    queue.push_back(*dep);
                }
            }
        }

        Ok(self.in_sequence_order(&included))
    }

    /// Everything except the excluded tables and their FK descendants
    pub fn resolve_excludes(&self, excluded: &[&str]) -> Result<Vec<&'static LoadSpec>, String> {
        let mut dropped: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        for name in excluded {
            if !self.deps.contains_key(name) {
                return Err(format!("Unknown table: {}", name));
            }
            queue.push_back(*name);
        }

        // A child without its parent would fail its FK checks
        while let Some(table) = queue.pop_front() {
            if !dropped.insert(table) {
                continue;
            }
            if let Some(children) = self.reverse_deps.get(table) {
                queue.extend(children.iter().copied());
            }
        }

        let included: HashSet<&str> = self
            .sequence
            .iter()
            .map(|s| s.table)
            .filter(|t| !dropped.contains(t))
            .collect();

        Ok(self.in_sequence_order(&included))
    }

    /// Return all load steps in sequence order
    pub fn all_in_order(&self) -> Vec<&'static LoadSpec> {
        self.sequence.to_vec()
    }

    fn in_sequence_order(&self, included: &HashSet<&str>) -> Vec<&'static LoadSpec> {
        self.sequence
            .iter()
            .filter(|s| included.contains(s.table))
            .copied()
            .collect()
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}
