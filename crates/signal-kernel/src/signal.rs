//! Per-signal state machine and glitch avoidance.
//!
//! [`SignalState`] holds everything one signal actor owns and performs no
//! I/O: every operation returns a [`Propagation`] describing what the actor
//! should publish, if anything.
//!
//! ```text
//! STARTING ──gather──▶ DISCOVERING ──all graphs──▶ READY ◀──┐
//!                                                   │        │
//!                                                   └─update─┘
//! ```
//!
//! A signal with two dependencies recomputes only when every dependency has
//! reported, and, with glitch avoidance on, only when every diamond id
//! (an ancestor reachable through more than one path) carries the same
//! event counter on every branch that can see it.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::chain::SignalChain;
use crate::config::SignalConfig;
use crate::graph::{SignalGraph, SignalId};
use crate::operator::CombineOperator;
use crate::tracker::{DependencyTracker, Discovery, GraphRequests};

/// A value published on a signal's value address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub value: i64,
    pub chain: SignalChain,
}

/// What happened as a result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    /// A new value should be published to dependents.
    Publish(Emission),
    /// A new value was computed but not published (blocked, or the graph
    /// is not assembled yet).
    Silent { value: i64 },
    /// Some dependency has not reported a value yet.
    Incomplete,
    /// Branches disagree about `conflict`; the round is held.
    Glitch { conflict: SignalId },
    /// The operation is not valid for this signal.
    Rejected,
    /// Nothing to do: not a dependency, or still discovering.
    Ignored,
}

/// What one dependency has told this signal so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    counters: HashMap<SignalId, u64>,
    value: i64,
}

impl Provenance {
    /// Keep the highest counter seen per id, tolerating out-of-order delivery.
    fn merge(&mut self, chain: &SignalChain, value: i64) {
        for link in chain.links() {
            let counter = self.counters.entry(link.id.clone()).or_insert(link.counter);
            *counter = (*counter).max(link.counter);
        }
        self.value = value;
    }

    pub fn counter_for(&self, id: &str) -> Option<u64> {
        self.counters.get(id).copied()
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// State owned by a single signal actor.
#[derive(Debug, Clone)]
pub struct SignalState {
    id: SignalId,
    value: i64,
    operator: Option<CombineOperator>,
    tracker: DependencyTracker,
    blocked: bool,
    glitch_avoidance: bool,
    /// Outbound event counter, bumped on every emission
    counter: u64,
    /// dependency id -> what it has reported
    provenance: HashMap<SignalId, Provenance>,
    /// Diamond ids of the assembled graph
    conflicts: BTreeSet<SignalId>,
    last_emitted: Option<Emission>,
}

impl SignalState {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            id: config.id.clone(),
            value: config.initial_value.unwrap_or(0),
            operator: config.operator,
            tracker: DependencyTracker::new(config.id.clone(), config.dependencies.clone()),
            blocked: false,
            glitch_avoidance: true,
            counter: 0,
            provenance: HashMap::new(),
            conflicts: BTreeSet::new(),
            last_emitted: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// Counter stamped on the most recent emission; 0 before the first.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn glitch_avoidance(&self) -> bool {
        self.glitch_avoidance
    }

    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    pub fn graph(&self) -> Option<&SignalGraph> {
        self.tracker.graph()
    }

    pub fn is_ready(&self) -> bool {
        self.tracker.graph().is_some()
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.tracker.is_declared(id)
    }

    pub fn provenance_for(&self, dependency: &str) -> Option<&Provenance> {
        self.provenance.get(dependency)
    }

    /// Ids reachable through more than one path of the assembled graph.
    pub fn conflicts(&self) -> &BTreeSet<SignalId> {
        &self.conflicts
    }

    pub fn last_emitted(&self) -> Option<&Emission> {
        self.last_emitted.as_ref()
    }

    pub fn gather_dependencies(&mut self, requests: &mut impl GraphRequests) -> Discovery {
        let discovery = self.tracker.gather_dependencies(requests);
        if discovery == Discovery::Assembled {
            self.on_assembled();
        }
        discovery
    }

    pub fn accept_graph(&mut self, from: &str, graph: SignalGraph) -> Discovery {
        let discovery = self.tracker.accept_graph(from, graph);
        if discovery == Discovery::Assembled {
            self.on_assembled();
        }
        discovery
    }

    fn on_assembled(&mut self) {
        if let Some(graph) = self.tracker.graph() {
            self.conflicts = conflict_ids(graph);
        }
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    pub fn set_glitch_avoidance(&mut self, enabled: bool) {
        self.glitch_avoidance = enabled;
    }

    /// Bump the value of a signal with no dependencies.
    pub fn increment(&mut self) -> Propagation {
        if self.tracker.number_of_dependencies() > 0 {
            warn!(
                signal = %self.id,
                dependencies = ?self.tracker.declared(),
                "Increment rejected: signal has dependencies"
            );
            return Propagation::Rejected;
        }

        self.emit(self.value.wrapping_add(1), None)
    }

    /// Handle a value published by dependency `source`.
    pub fn apply_update(&mut self, source: &str, value: i64, chain: SignalChain) -> Propagation {
        if !self.depends_on(source) || !self.is_ready() {
            return Propagation::Ignored;
        }

        self.provenance
            .entry(source.to_string())
            .or_default()
            .merge(&chain, value);

        if self.tracker.number_of_dependencies() == 1 {
            return self.emit(value, Some(chain));
        }

        let mut values = Vec::with_capacity(self.tracker.number_of_dependencies());
        for dep in self.tracker.declared() {
            match self.provenance.get(dep) {
                Some(provenance) => values.push(provenance.value),
                None => return Propagation::Incomplete,
            }
        }

        if self.glitch_avoidance {
            if let Some(conflict) = self.find_glitch() {
                debug!(
                    signal = %self.id,
                    conflict = %conflict,
                    chain = %chain,
                    "Holding update until branches agree"
                );
                return Propagation::Glitch { conflict };
            }
        }

        let Some(operator) = self.operator else {
            warn!(signal = %self.id, "No combine operator configured");
            return Propagation::Ignored;
        };

        let mut args = values.into_iter();
        let first = args.next().unwrap_or_default();
        let combined = args.fold(first, |acc, v| operator.call(acc, v));

        self.emit(combined, Some(chain))
    }

    /// The first diamond id on which the dependencies disagree, if any.
    ///
    /// Only dependencies whose graph contains the id are consulted; a
    /// dependency that has never reported the id counts as disagreement.
    fn find_glitch(&self) -> Option<SignalId> {
        for conflict in &self.conflicts {
            let mut agreed: Option<u64> = None;

            for dep in self.tracker.dependencies() {
                if !dep.contains_id(conflict) {
                    continue;
                }

                let counter = self
                    .provenance
                    .get(dep.id())
                    .and_then(|provenance| provenance.counter_for(conflict));

                match (counter, agreed) {
                    (None, _) => return Some(conflict.clone()),
                    (Some(counter), Some(seen)) if counter != seen => {
                        return Some(conflict.clone());
                    }
                    (Some(counter), _) => agreed = Some(counter),
                }
            }
        }
        None
    }

    /// Replay of the last published value, for late subscribers.
    pub fn resend(&self) -> Option<Emission> {
        self.last_emitted.clone()
    }

    fn emit(&mut self, value: i64, upstream: Option<SignalChain>) -> Propagation {
        self.value = value;
        self.counter += 1;

        let chain = match upstream {
            Some(mut chain) => {
                chain.chain(self.id.clone(), self.counter);
                chain
            }
            None => SignalChain::new(self.id.clone(), self.counter),
        };

        info!(
            signal = %self.id,
            value,
            counter = self.counter,
            "{}: {}",
            self.id,
            value
        );

        if self.blocked || !self.is_ready() {
            return Propagation::Silent { value };
        }

        let emission = Emission { value, chain };
        self.last_emitted = Some(emission.clone());
        Propagation::Publish(emission)
    }
}

/// Union of the ids shared by every pair of distinct paths through `graph`.
pub fn conflict_ids(graph: &SignalGraph) -> BTreeSet<SignalId> {
    let paths = graph.all_paths();
    let mut conflicts = BTreeSet::new();
    for (i, path) in paths.iter().enumerate() {
        for other in &paths[i + 1..] {
            conflicts.extend(path.conflicts(other));
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(config: SignalConfig, graphs: &[SignalGraph]) -> SignalState {
        let mut state = SignalState::new(&config);
        state.gather_dependencies(&mut Vec::<SignalId>::new());
        for graph in graphs {
            state.accept_graph(graph.id(), graph.clone());
        }
        assert!(state.is_ready());
        state
    }

    /// Chain through `hops`, most upstream first.
    fn path(hops: &[(&str, u64)]) -> SignalChain {
        let mut chain = SignalChain::new(hops[0].0, hops[0].1);
        for (id, counter) in &hops[1..] {
            chain.chain(*id, *counter);
        }
        chain
    }

    /// Deliver an update whose last hop is the sending dependency.
    fn send(state: &mut SignalState, value: i64, hops: &[(&str, u64)]) -> Propagation {
        let source = hops[hops.len() - 1].0;
        state.apply_update(source, value, path(hops))
    }

    fn published(p: &Propagation) -> bool {
        matches!(p, Propagation::Publish(_))
    }

    /// `x3 = x2 + x1` where `x2 = x1`.
    fn simple_diamond() -> SignalState {
        let x1 = SignalGraph::leaf("x1");
        let x2 = SignalGraph::new("x2", vec![x1.clone()]);
        ready(
            SignalConfig::combine("x3", "x2", "x1", CombineOperator::Add),
            &[x1, x2],
        )
    }

    /// ```text
    ///              6
    ///             / \
    ///      7     1   5
    ///       \  /  \ /
    ///        2     3
    ///         \   /
    ///           4
    /// ```
    /// Seen from `4 = 2 + 3`.
    fn complicated() -> SignalState {
        let g7 = SignalGraph::leaf("7");
        let g6 = SignalGraph::leaf("6");
        let g1 = SignalGraph::new("1", vec![g6.clone()]);
        let g5 = SignalGraph::new("5", vec![g6]);
        let g2 = SignalGraph::new("2", vec![g7, g1.clone()]);
        let g3 = SignalGraph::new("3", vec![g1, g5]);
        ready(
            SignalConfig::combine("4", "2", "3", CombineOperator::Add),
            &[g2, g3],
        )
    }

    fn initialize_complicated(state: &mut SignalState) {
        send(state, 1, &[("7", 1), ("2", 1)]);
        send(state, 1, &[("6", 1), ("1", 1), ("3", 1)]);
        send(state, 1, &[("6", 1), ("5", 1), ("3", 1)]);
        let first = send(state, 1, &[("6", 1), ("1", 1), ("2", 1)]);
        assert!(published(&first));
    }

    #[test]
    fn test_increment_publishes_fresh_chain() {
        let mut x = ready(SignalConfig::leaf("x", 0), &[]);

        let Propagation::Publish(emission) = x.increment() else {
            panic!("expected a publish");
        };
        assert_eq!(x.value(), 1);
        assert_eq!(emission.value, 1);
        assert_eq!(emission.chain, SignalChain::new("x", 1));
    }

    #[test]
    fn test_increment_three_times_counts_one_two_three() {
        let mut x = ready(SignalConfig::leaf("x", 0), &[]);

        let counters: Vec<u64> = (0..3)
            .filter_map(|_| match x.increment() {
                Propagation::Publish(e) => Some(e.chain.last().counter),
                _ => None,
            })
            .collect();

        assert_eq!(x.value(), 3);
        assert_eq!(counters, vec![1, 2, 3]);
    }

    #[test]
    fn test_increment_rejected_with_dependencies() {
        let mut z = ready(
            SignalConfig::combine("z", "a", "b", CombineOperator::Add),
            &[SignalGraph::leaf("a"), SignalGraph::leaf("b")],
        );

        assert_eq!(z.increment(), Propagation::Rejected);
        assert_eq!(z.value(), 0);
        assert_eq!(z.counter(), 0);
    }

    #[test]
    fn test_single_dependency_passes_value_through() {
        let mut y = ready(SignalConfig::map("y", "a"), &[SignalGraph::leaf("a")]);

        for (counter, value) in [(1, 5), (2, -3), (3, 40)] {
            let Propagation::Publish(emission) = y.apply_update("a", value, path(&[("a", counter)]))
            else {
                panic!("expected a publish");
            };
            assert_eq!(y.value(), value);
            assert_eq!(emission.chain, path(&[("a", counter), ("y", counter)]));
        }
    }

    #[test]
    fn test_update_ignored_while_discovering() {
        let mut y = SignalState::new(&SignalConfig::map("y", "a"));
        y.gather_dependencies(&mut Vec::<SignalId>::new());

        assert_eq!(y.apply_update("a", 1, path(&[("a", 1)])), Propagation::Ignored);
        assert_eq!(y.value(), 0);
    }

    #[test]
    fn test_update_from_non_dependency_ignored() {
        let mut y = ready(SignalConfig::map("y", "a"), &[SignalGraph::leaf("a")]);
        assert_eq!(y.apply_update("b", 1, path(&[("b", 1)])), Propagation::Ignored);
        assert!(y.provenance_for("b").is_none());
    }

    #[test]
    fn test_combines_in_declared_order() {
        let mut z = ready(
            SignalConfig::combine("z", "a", "b", CombineOperator::Subtract),
            &[SignalGraph::leaf("a"), SignalGraph::leaf("b")],
        );

        // b arrives first
        assert_eq!(send(&mut z, 3, &[("b", 1)]), Propagation::Incomplete);
        assert!(published(&send(&mut z, 10, &[("a", 1)])));
        assert_eq!(z.value(), 7);
    }

    #[test]
    fn test_simple_diamond_conflicts() {
        let x3 = simple_diamond();
        assert_eq!(x3.conflicts().iter().collect::<Vec<_>>(), vec!["x1"]);
    }

    #[test]
    fn test_simple_glitch_avoidance() {
        let mut x3 = simple_diamond();

        assert!(!published(&send(&mut x3, 1, &[("x1", 1)])));
        assert!(published(&send(&mut x3, 1, &[("x1", 1), ("x2", 1)])));
        assert_eq!(x3.value(), 2);

        // glitch, must wait for x2 update
        assert_eq!(
            send(&mut x3, 2, &[("x1", 2)]),
            Propagation::Glitch {
                conflict: "x1".to_string()
            }
        );
        assert_eq!(x3.value(), 2);

        assert!(published(&send(&mut x3, 2, &[("x1", 2), ("x2", 2)])));
        assert_eq!(x3.value(), 4);
    }

    #[test]
    fn test_glitch_avoidance_disabled_combines_mismatched_rounds() {
        let mut x3 = simple_diamond();
        x3.set_glitch_avoidance(false);

        send(&mut x3, 1, &[("x1", 1)]);
        send(&mut x3, 1, &[("x1", 1), ("x2", 1)]);
        assert!(published(&send(&mut x3, 2, &[("x1", 2)])));

        // x2 still reports the old round
        assert_eq!(x3.value(), 3);
    }

    #[test]
    fn test_complicated_conflicts() {
        let state = complicated();
        let conflicts: Vec<&str> = state.conflicts().iter().map(String::as_str).collect();
        assert_eq!(conflicts, vec!["1", "2", "3", "6"]);
    }

    #[test]
    fn test_partial_initialize_missing_branch_through_1() {
        let mut state = complicated();
        send(&mut state, 1, &[("7", 1), ("2", 1)]);
        let p = send(&mut state, 1, &[("6", 1), ("5", 1), ("3", 1)]);

        // need to wait for events from 1
        assert!(matches!(p, Propagation::Glitch { .. }));
        assert_eq!(state.counter(), 0);
    }

    #[test]
    fn test_partial_initialize_missing_branch_into_2() {
        let mut state = complicated();
        send(&mut state, 1, &[("7", 1), ("2", 1)]);
        send(&mut state, 1, &[("6", 1), ("1", 1), ("3", 1)]);

        // need to wait for events from 2
        assert_eq!(state.counter(), 0);
    }

    #[test]
    fn test_initialize() {
        let mut state = complicated();
        assert_eq!(send(&mut state, 1, &[("7", 1), ("2", 1)]), Propagation::Incomplete);
        assert!(!published(&send(&mut state, 1, &[("6", 1), ("1", 1), ("3", 1)])));
        assert!(!published(&send(&mut state, 1, &[("6", 1), ("5", 1), ("3", 1)])));

        // our first update
        assert!(published(&send(&mut state, 1, &[("6", 1), ("1", 1), ("2", 1)])));
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn test_after_initialize_updates_from_7_pass() {
        let mut state = complicated();
        initialize_complicated(&mut state);

        // the other branch keeps its last report, so these recombine directly
        assert!(published(&send(&mut state, 1, &[("7", 2), ("2", 2)])));
        assert!(published(&send(&mut state, 1, &[("7", 3), ("2", 3)])));
        assert_eq!(state.counter(), 3);
    }

    #[test]
    fn test_after_initialize_update_from_6_waits_for_both_branches() {
        let mut state = complicated();
        initialize_complicated(&mut state);

        assert!(!published(&send(&mut state, 1, &[("6", 2), ("1", 2), ("2", 2)])));
        assert_eq!(state.counter(), 1);

        // 5 has not reported round 2, but it is not a diamond seen from 4
        assert!(published(&send(&mut state, 1, &[("6", 2), ("1", 2), ("3", 2)])));
        assert_eq!(state.counter(), 2);
    }

    #[test]
    fn test_after_initialize_keeps_order_straight() {
        let mut state = complicated();
        initialize_complicated(&mut state);

        assert!(!published(&send(&mut state, 1, &[("6", 2), ("1", 2), ("3", 2)])));
        // different path, but 2 still reflects round 1 of 6
        assert!(!published(&send(&mut state, 1, &[("7", 2), ("2", 2)])));
        assert!(!published(&send(&mut state, 1, &[("6", 2), ("5", 2), ("3", 2)])));

        // ok now, 2 carries 6's second round at counter 3
        assert!(published(&send(&mut state, 1, &[("6", 2), ("1", 2), ("2", 3)])));
        assert_eq!(state.counter(), 2);
    }

    #[test]
    fn test_out_of_order_delivery_keeps_highest_counter() {
        let mut x3 = simple_diamond();
        send(&mut x3, 1, &[("x1", 1)]);
        send(&mut x3, 1, &[("x1", 1), ("x2", 1)]);

        send(&mut x3, 3, &[("x1", 3)]);
        // a stale round 2 arrives late on the same branch
        send(&mut x3, 2, &[("x1", 2)]);

        let provenance = x3.provenance_for("x1").unwrap();
        assert_eq!(provenance.counter_for("x1"), Some(3));
        assert_eq!(provenance.value(), 2);
    }

    #[test]
    fn test_blocked_signal_recomputes_silently() {
        let mut x = ready(SignalConfig::leaf("x", 0), &[]);
        x.set_blocked(true);

        assert_eq!(x.increment(), Propagation::Silent { value: 1 });
        assert_eq!(x.value(), 1);
        assert_eq!(x.counter(), 1);
        assert!(x.resend().is_none());

        // unblocking does not flush the missed emission
        x.set_blocked(false);
        assert!(x.resend().is_none());

        let Propagation::Publish(emission) = x.increment() else {
            panic!("expected a publish");
        };
        assert_eq!(emission.chain, SignalChain::new("x", 2));
    }

    #[test]
    fn test_blocked_dependent_still_tracks_provenance() {
        let mut y = ready(SignalConfig::map("y", "a"), &[SignalGraph::leaf("a")]);
        y.set_blocked(true);

        assert_eq!(
            y.apply_update("a", 9, path(&[("a", 4)])),
            Propagation::Silent { value: 9 }
        );
        assert_eq!(y.provenance_for("a").unwrap().counter_for("a"), Some(4));
    }

    #[test]
    fn test_resend_replays_last_emission() {
        let mut x = ready(SignalConfig::leaf("x", 0), &[]);
        assert!(x.resend().is_none());

        x.increment();
        let Propagation::Publish(last) = x.increment() else {
            panic!("expected a publish");
        };

        assert_eq!(x.resend(), Some(last.clone()));
        // replaying does not advance the counter
        assert_eq!(x.counter(), 2);
        assert_eq!(x.last_emitted(), Some(&last));
    }

    #[test]
    fn test_counter_increments_by_one_per_emission() {
        let mut y = ready(SignalConfig::map("y", "a"), &[SignalGraph::leaf("a")]);
        let mut previous = y.counter();
        for round in 1..=5 {
            y.apply_update("a", round, path(&[("a", round as u64)]));
            assert_eq!(y.counter(), previous + 1);
            previous = y.counter();
        }
    }

    #[test]
    fn test_emit_before_assembly_is_silent() {
        let mut x = SignalState::new(&SignalConfig::leaf("x", 0));
        assert_eq!(x.increment(), Propagation::Silent { value: 1 });
    }

    #[test]
    fn test_conflict_ids_of_linear_graph_is_empty() {
        let graph = SignalGraph::new(
            "c",
            vec![SignalGraph::new("b", vec![SignalGraph::leaf("a")])],
        );
        assert!(conflict_ids(&graph).is_empty());
    }
}
