//! Dependency-graph helpers shared by sync validation and the auto-fixer.

use std::collections::{HashMap, HashSet, VecDeque};

use planboard_core::ids::TaskId;

/// Kahn's algorithm over `nodes` with the given predecessor→successor
/// edges. Returns `(ordered, stuck)`: `ordered` holds every node that
/// could be scheduled topologically, `stuck` holds nodes on a cycle plus
/// everything downstream of one.
pub(crate) fn topo_order(
    nodes: &HashSet<TaskId>,
    edges: &[(TaskId, TaskId)],
) -> (Vec<TaskId>, Vec<TaskId>) {
    let mut in_degree: HashMap<TaskId, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for (pred, succ) in edges {
        if !nodes.contains(pred) || !nodes.contains(succ) {
            continue;
        }
        successors.entry(*pred).or_default().push(*succ);
        if let Some(d) = in_degree.get_mut(succ) {
            *d += 1;
        }
    }

    // Stable processing order keeps results deterministic.
    let mut roots: Vec<TaskId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    roots.sort();
    let mut queue: VecDeque<TaskId> = roots.into();

    let mut ordered = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        ordered.push(node);
        if let Some(succs) = successors.get(&node) {
            for succ in succs {
                if let Some(d) = in_degree.get_mut(succ) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(*succ);
                    }
                }
            }
        }
    }

    let done: HashSet<TaskId> = ordered.iter().copied().collect();
    let mut stuck: Vec<TaskId> = nodes.difference(&done).copied().collect();
    stuck.sort();
    (ordered, stuck)
}

/// Strip nodes that are merely downstream of a cycle, leaving the nodes
/// that actually sit on one.
pub(crate) fn cycle_core(stuck: &[TaskId], edges: &[(TaskId, TaskId)]) -> Vec<TaskId> {
    let mut core: HashSet<TaskId> = stuck.iter().copied().collect();
    loop {
        let out_degrees: HashMap<TaskId, usize> = core
            .iter()
            .map(|n| {
                let d = edges
                    .iter()
                    .filter(|(p, s)| p == n && core.contains(s))
                    .count();
                (*n, d)
            })
            .collect();
        let leaves: Vec<TaskId> = out_degrees
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        if leaves.is_empty() {
            break;
        }
        for leaf in leaves {
            core.remove(&leaf);
        }
    }
    let mut result: Vec<TaskId> = core.into_iter().collect();
    result.sort();
    result
}

/// Group cycle members into their connected components, treating edges
/// as undirected within the set. Disjoint cycles come back as separate
/// groups, each sorted.
pub(crate) fn cycle_components(core: &[TaskId], edges: &[(TaskId, TaskId)]) -> Vec<Vec<TaskId>> {
    let members: HashSet<TaskId> = core.iter().copied().collect();
    let mut neighbours: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for (pred, succ) in edges {
        if members.contains(pred) && members.contains(succ) {
            neighbours.entry(*pred).or_default().push(*succ);
            neighbours.entry(*succ).or_default().push(*pred);
        }
    }

    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut components = Vec::new();
    for start in core {
        if !seen.insert(*start) {
            continue;
        }
        let mut component = vec![*start];
        let mut queue: VecDeque<TaskId> = VecDeque::from([*start]);
        while let Some(node) = queue.pop_front() {
            for next in neighbours.get(&node).into_iter().flatten() {
                if seen.insert(*next) {
                    component.push(*next);
                    queue.push_back(*next);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

/// Detects a cycle in the edge set; returns the nodes on it.
pub(crate) fn find_cycle(edges: &[(TaskId, TaskId)]) -> Option<Vec<TaskId>> {
    let nodes: HashSet<TaskId> = edges.iter().flat_map(|(p, s)| [*p, *s]).collect();
    let (_, stuck) = topo_order(&nodes, edges);
    if stuck.is_empty() {
        return None;
    }
    Some(cycle_core(&stuck, edges))
}

/// Forward closure: every node reachable from `seeds` along
/// predecessor→successor edges, seeds included.
pub(crate) fn reachable_from(seeds: &HashSet<TaskId>, edges: &[(TaskId, TaskId)]) -> HashSet<TaskId> {
    let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for (pred, succ) in edges {
        successors.entry(*pred).or_default().push(*succ);
    }
    let mut seen: HashSet<TaskId> = seeds.clone();
    let mut queue: VecDeque<TaskId> = seeds.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        if let Some(succs) = successors.get(&node) {
            for succ in succs {
                if seen.insert(*succ) {
                    queue.push_back(*succ);
                }
            }
        }
    }
    seen
}
