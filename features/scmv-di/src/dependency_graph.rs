use std::{
    any::TypeId,
    collections::{BTreeMap, HashSet},
};

use thiserror::Error;

use crate::{
    builder::DiBuilder,
    scope::{ScopeDefinition, ScopeMarker},
    types::{DependencyInfo, TypeInfo},
};

/// Graph of the entire object graph, grouped by scope
/// Used to check missing and circular dependencies, and to derive construction order
pub struct DependencyGraph {
    scopes: BTreeMap<TypeId, ScopeNode>,
}

struct ScopeNode {
    info: TypeInfo,
    parent: Option<TypeId>,
    entries: BTreeMap<TypeId, DependencyGraphEntry>,
}

struct DependencyGraphEntry {
    info: TypeInfo,
    dependencies: Vec<DependencyInfo>,
}

impl DependencyGraph {
    pub(crate) fn new(builder: &DiBuilder) -> Result<Self, DependencyGraphErrors> {
        let mut graph = Self {
            scopes: BTreeMap::new(),
        };
        let mut errors = Vec::new();

        for definition in std::iter::once(&builder.root).chain(&builder.scopes) {
            graph.add_scope(definition, &mut errors);
        }

        // A type must not shadow one provided by an ancestor scope
        for node in graph.scopes.values() {
            let mut ancestor = node.parent.and_then(|parent| graph.scopes.get(&parent));
            while let Some(current) = ancestor {
                for type_id in node.entries.keys() {
                    if let Some(shadowed) = current.entries.get(type_id) {
                        errors.push(DependencyGraphError::Duplicate {
                            type_info: shadowed.info,
                            scope: node.info,
                        });
                    }
                }
                ancestor = current.parent.and_then(|parent| graph.scopes.get(&parent));
            }
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        Ok(graph)
    }

    fn add_scope(&mut self, definition: &ScopeDefinition, errors: &mut Vec<DependencyGraphError>) {
        let mut node = ScopeNode {
            info: definition.info,
            parent: definition.parent.map(|parent| parent.type_id),
            entries: BTreeMap::new(),
        };

        let provided = definition
            .required
            .iter()
            .map(|info| (*info, Vec::new()))
            .chain(definition.instances.iter().map(|instance| (instance.info, Vec::new())))
            .chain(
                definition
                    .registrations
                    .iter()
                    .map(|registration| {
                        (
                            registration.factory.supplies(),
                            registration.factory.dependencies(),
                        )
                    }),
            );

        for (info, dependencies) in provided {
            if node
                .entries
                .insert(info.type_id, DependencyGraphEntry { info, dependencies })
                .is_some()
            {
                errors.push(DependencyGraphError::Duplicate {
                    type_info: info,
                    scope: definition.info,
                });
            }
        }

        self.scopes.insert(definition.info.type_id, node);
    }

    /// Finds the entry for a type as seen from `scope` - returns the owning scope with it
    fn lookup(&self, scope: TypeId, type_id: TypeId) -> Option<(TypeId, &DependencyGraphEntry)> {
        let mut current = self.scopes.get(&scope);
        while let Some(node) = current {
            if let Some(entry) = node.entries.get(&type_id) {
                return Some((node.info.type_id, entry));
            }
            current = node.parent.and_then(|parent| self.scopes.get(&parent));
        }
        None
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for (scope, node) in &self.scopes {
            for entry in node.entries.values() {
                let mut dependency_chain = Vec::new();
                check_recurse(
                    self,
                    &mut checked,
                    &mut errors,
                    &mut dependency_chain,
                    *scope,
                    entry,
                );
            }
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse(
            graph: &DependencyGraph,
            checked: &mut HashSet<(TypeId, TypeId)>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<TypeInfo>,
            scope: TypeId,
            entry: &DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if let Some(start) = dependency_chain.iter().position(|info| *info == entry.info) {
                let mut chain = dependency_chain[start..].to_vec();
                chain.push(entry.info); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from: chain[0],
                    to: dependency_chain[dependency_chain.len() - 1],
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert((scope, entry.info.type_id)) {
                return;
            };

            dependency_chain.push(entry.info);

            for dependency in &entry.dependencies {
                let Some((owner, next_entry)) =
                    graph.lookup(scope, dependency.type_info.type_id)
                else {
                    if !dependency.optional {
                        errors.push(DependencyGraphError::MissingDependency {
                            dependency: dependency.type_info,
                            required_by: entry.info,
                            scope: graph.scopes[&scope].info,
                        });
                    }

                    continue;
                };

                if dependency.lazy {
                    // Don't recurse, this will be checked by itself
                    continue;
                }

                check_recurse(graph, checked, errors, dependency_chain, owner, next_entry);
            }

            dependency_chain.pop();
        }
    }

    /// Types provided by scope `S`, ordered so every type comes after its dependencies
    pub fn topological_order<S: ScopeMarker>(&self) -> Vec<TypeInfo> {
        self.topological_order_of(TypeId::of::<S>())
    }

    pub(crate) fn topological_order_of(&self, scope: TypeId) -> Vec<TypeInfo> {
        let Some(node) = self.scopes.get(&scope) else {
            return Vec::new();
        };

        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(node.entries.len());
        for entry in node.entries.values() {
            visit(self, scope, entry, &mut visited, &mut order);
        }

        return order;

        fn visit(
            graph: &DependencyGraph,
            scope: TypeId,
            entry: &DependencyGraphEntry,
            visited: &mut HashSet<TypeId>,
            order: &mut Vec<TypeInfo>,
        ) {
            if !visited.insert(entry.info.type_id) {
                return;
            }

            for dependency in entry.dependencies.iter().filter(|d| !d.lazy) {
                // Dependencies owned by parent scopes are not part of this scope's order
                if let Some((owner, next_entry)) = graph.lookup(scope, dependency.type_info.type_id)
                {
                    if owner == scope {
                        visit(graph, scope, next_entry, visited, order);
                    }
                }
            }

            order.push(entry.info);
        }
    }

    /// Direct dependencies of `T` as registered in scope `S`
    pub fn dependencies_of<S: ScopeMarker, T: ?Sized + 'static>(&self) -> Option<&[DependencyInfo]> {
        self.scopes
            .get(&TypeId::of::<S>())?
            .entries
            .get(&TypeId::of::<T>())
            .map(|entry| entry.dependencies.as_slice())
    }
}

impl std::fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for node in self.scopes.values() {
            writeln!(f, "{}", node.info)?;
            for entry in node.entries.values() {
                let dependencies = entry
                    .dependencies
                    .iter()
                    .map(|d| d.type_info.type_name)
                    .collect::<Vec<_>>();
                writeln!(f, "  {} <- [{}]", entry.info, dependencies.join(", "))?;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error("'{type_info}' has been registered twice along scope '{scope}'")]
    Duplicate { type_info: TypeInfo, scope: TypeInfo },
    #[error("'{required_by}' needs '{dependency}' but it is not visible from scope '{scope}'")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: TypeInfo,
        scope: TypeInfo,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through [{}] - Consider using `Lazy`", join_chain(.chain))]
    CircularDependency {
        from: TypeInfo,
        to: TypeInfo,
        chain: Vec<TypeInfo>,
    },
}

fn join_chain(chain: &[TypeInfo]) -> String {
    chain
        .iter()
        .map(|info| info.type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
