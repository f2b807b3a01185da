//! Installer dependency resolution.
//!
//! Installers declare dependencies on other installers of the same machine;
//! before launch the declared list is resolved into a topological order so
//! the bootstrap agent can run them sequentially. Ties keep declaration
//! order, which makes resolution deterministic.

use crate::error::ProvisionError;
use crate::model::Installer;
use std::collections::HashMap;

/// Why an ordering attempt failed; mapped to a domain error by callers.
#[derive(Debug)]
pub(crate) enum OrderError {
    Unknown { node: String, dependency: String },
    Cycle(String),
}

/// Kahn's algorithm over `(name, dependencies)` pairs.
///
/// Always picks the earliest-declared ready node, so the result is stable
/// across runs for the same input.
pub(crate) fn kahn_order(nodes: &[(&str, &[String])]) -> Result<Vec<String>, OrderError> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (*name, i))
        .collect();

    let mut indegree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (i, (name, deps)) in nodes.iter().enumerate() {
        for dep in *deps {
            let Some(&dep_idx) = index.get(dep.as_str()) else {
                return Err(OrderError::Unknown {
                    node: name.to_string(),
                    dependency: dep.clone(),
                });
            };
            indegree[i] += 1;
            dependents[dep_idx].push(i);
        }
    }

    let mut resolved = Vec::with_capacity(nodes.len());
    let mut done = vec![false; nodes.len()];

    while resolved.len() < nodes.len() {
        let Some(next) = (0..nodes.len()).find(|&i| !done[i] && indegree[i] == 0) else {
            let cycle: Vec<&str> = (0..nodes.len())
                .filter(|&i| !done[i])
                .map(|i| nodes[i].0)
                .collect();
            return Err(OrderError::Cycle(cycle.join(", ")));
        };
        done[next] = true;
        resolved.push(nodes[next].0.to_string());
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
        }
    }

    Ok(resolved)
}

/// Resolves a machine's declared installers into launch order.
pub fn resolve_installers(installers: &[Installer]) -> Result<Vec<Installer>, ProvisionError> {
    let nodes: Vec<(&str, &[String])> = installers
        .iter()
        .map(|i| (i.id.as_str(), i.depends_on.as_slice()))
        .collect();

    let order = kahn_order(&nodes).map_err(|e| match e {
        OrderError::Unknown { node, dependency } => ProvisionError::UnknownDependency {
            installer: node,
            dependency,
        },
        OrderError::Cycle(members) => ProvisionError::DependencyCycle(members),
    })?;

    let by_id: HashMap<&str, &Installer> = installers.iter().map(|i| (i.id.as_str(), i)).collect();
    Ok(order
        .iter()
        .map(|id| by_id[id.as_str()].clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order_without_dependencies() {
        let installers = vec![
            Installer::new("org.hatch.ws-agent", "ws-agent.sh"),
            Installer::new("org.hatch.terminal", "terminal.sh"),
        ];

        let resolved = resolve_installers(&installers).unwrap();
        let ids: Vec<&str> = resolved.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["org.hatch.ws-agent", "org.hatch.terminal"]);
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let installers = vec![
            Installer::new("org.hatch.ws-agent", "ws-agent.sh")
                .with_dependency("org.hatch.jdk"),
            Installer::new("org.hatch.terminal", "terminal.sh"),
            Installer::new("org.hatch.jdk", "jdk.sh"),
        ];

        let resolved = resolve_installers(&installers).unwrap();
        let ids: Vec<&str> = resolved.iter().map(|i| i.id.as_str()).collect();
        let jdk = ids.iter().position(|&id| id == "org.hatch.jdk").unwrap();
        let agent = ids.iter().position(|&id| id == "org.hatch.ws-agent").unwrap();
        assert!(jdk < agent);
    }

    #[test]
    fn detects_cycles() {
        let installers = vec![
            Installer::new("a", "a.sh").with_dependency("b"),
            Installer::new("b", "b.sh").with_dependency("a"),
        ];

        assert!(matches!(
            resolve_installers(&installers),
            Err(ProvisionError::DependencyCycle(_))
        ));
    }

    #[test]
    fn detects_unknown_dependency() {
        let installers = vec![Installer::new("a", "a.sh").with_dependency("missing")];

        match resolve_installers(&installers) {
            Err(ProvisionError::UnknownDependency { installer, dependency }) => {
                assert_eq!(installer, "a");
                assert_eq!(dependency, "missing");
            }
            other => panic!("expected unknown dependency, got {:?}", other),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let installers = vec![
            Installer::new("c", "c.sh"),
            Installer::new("a", "a.sh").with_dependency("c"),
            Installer::new("b", "b.sh").with_dependency("c"),
        ];

        let first = resolve_installers(&installers).unwrap();
        let second = resolve_installers(&installers).unwrap();
        assert_eq!(first, second);
    }
}
