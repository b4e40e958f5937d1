//! Audio processing graph
//!
//! An [`AudioContext`] owns a set of nodes and a set of directed connections
//! between them. Rendering pulls every node that has a path to the
//! destination, in dependency order, and sums all inputs arriving at a node
//! before that node processes them. Nodes without a path to the destination
//! are silent and keep their state untouched.
//!
//! The context is a plain owned value. There is no global audio state: each
//! effects graph creates and owns its own context.

mod source;

pub use source::SourceNode;

use crate::buffer::DecodedAudio;
use crate::effects::{AudioEffect, BiquadFilter, Convolver, FilterType, Gain, PitchShifter};
use crate::error::{AudioError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Handle of a node inside one [`AudioContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Directed edge `from -> to`
pub type Connection = (NodeId, NodeId);

/// Node category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Filter,
    Gain,
    Convolver,
    PitchShifter,
    Destination,
}

enum Node {
    Source(SourceNode),
    Filter(BiquadFilter),
    Gain(Gain),
    Convolver(Box<Convolver>),
    PitchShifter(PitchShifter),
    Destination,
}

impl Node {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Source(_) => NodeKind::Source,
            Self::Filter(_) => NodeKind::Filter,
            Self::Gain(_) => NodeKind::Gain,
            Self::Convolver(_) => NodeKind::Convolver,
            Self::PitchShifter(_) => NodeKind::PitchShifter,
            Self::Destination => NodeKind::Destination,
        }
    }

    fn effect_mut(&mut self) -> Option<&mut dyn AudioEffect> {
        match self {
            Self::Filter(f) => Some(f),
            Self::Gain(g) => Some(g),
            Self::Convolver(c) => Some(c.as_mut()),
            Self::PitchShifter(p) => Some(p),
            Self::Source(_) | Self::Destination => None,
        }
    }
}

/// Node/connection graph with an offline renderer
pub struct AudioContext {
    sample_rate: u32,
    nodes: BTreeMap<NodeId, Node>,
    connections: BTreeSet<Connection>,
    destination: NodeId,
    next_id: u32,
    /// Per-node output buffers reused across render calls
    scratch: HashMap<NodeId, Vec<f32>>,
}

impl AudioContext {
    /// Create a context with a single destination node
    pub fn new(sample_rate: u32) -> Self {
        let destination = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(destination, Node::Destination);

        Self {
            sample_rate: sample_rate.max(1),
            nodes,
            connections: BTreeSet::new(),
            destination,
            next_id: 1,
            scratch: HashMap::new(),
        }
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The destination node
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn create_source(&mut self, audio: DecodedAudio) -> NodeId {
        self.add(Node::Source(SourceNode::new(audio)))
    }

    pub fn create_filter(&mut self, filter_type: FilterType, frequency: f32, q: f32) -> NodeId {
        self.add(Node::Filter(BiquadFilter::new(filter_type, frequency, q)))
    }

    pub fn create_gain(&mut self, gain: f32) -> NodeId {
        self.add(Node::Gain(Gain::new(gain)))
    }

    pub fn create_convolver(&mut self, convolver: Convolver) -> NodeId {
        self.add(Node::Convolver(Box::new(convolver)))
    }

    pub fn create_pitch_shifter(&mut self, ratio: f32) -> NodeId {
        self.add(Node::PitchShifter(PitchShifter::new(ratio)))
    }

    /// Kind of a live node
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(Node::kind)
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes, destination included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect `from -> to`
    ///
    /// Returns `false` when the edge already existed. Sources accept no input,
    /// the destination has no output, and edges that would close a cycle are
    /// rejected.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        let from_kind = self.kind(from).ok_or(AudioError::UnknownNode(from))?;
        let to_kind = self.kind(to).ok_or(AudioError::UnknownNode(to))?;

        let reject = |reason| AudioError::InvalidConnection { from, to, reason };
        if from == to {
            return Err(reject("self loop"));
        }
        if from_kind == NodeKind::Destination {
            return Err(reject("destination has no output"));
        }
        if to_kind == NodeKind::Source {
            return Err(reject("source has no input"));
        }
        if self.reaches(to, from) {
            return Err(reject("would create a cycle"));
        }

        let added = self.connections.insert((from, to));
        if added {
            tracing::trace!(%from, %to, "connect");
        }
        Ok(added)
    }

    /// Remove one edge; returns whether it existed
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> bool {
        self.connections.remove(&(from, to))
    }

    /// Remove every outgoing edge of `node`
    pub fn disconnect_outputs(&mut self, node: NodeId) -> usize {
        let before = self.connections.len();
        self.connections.retain(|&(from, _)| from != node);
        before - self.connections.len()
    }

    /// Remove every edge in the graph
    pub fn disconnect_all(&mut self) {
        self.connections.clear();
    }

    /// Drop a node and all edges touching it
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if id == self.destination || !self.nodes.contains_key(&id) {
            return Err(AudioError::UnknownNode(id));
        }
        self.nodes.remove(&id);
        self.scratch.remove(&id);
        self.connections.retain(|&(from, to)| from != id && to != id);
        Ok(())
    }

    /// Live connection set
    pub fn connections(&self) -> &BTreeSet<Connection> {
        &self.connections
    }

    /// Whether `from -> to` is connected
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.contains(&(from, to))
    }

    /// Direct inputs of `node`
    pub fn inputs_of(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.connections
            .iter()
            .filter(move |&&(_, to)| to == node)
            .map(|&(from, _)| from)
    }

    /// Whether a directed path `from -> ... -> to` exists
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                stack.extend(
                    self.connections
                        .iter()
                        .filter(|&&(f, _)| f == node)
                        .map(|&(_, t)| t),
                );
            }
        }
        false
    }

    pub fn source(&self, id: NodeId) -> Option<&SourceNode> {
        match self.nodes.get(&id) {
            Some(Node::Source(s)) => Some(s),
            _ => None,
        }
    }

    pub fn source_mut(&mut self, id: NodeId) -> Option<&mut SourceNode> {
        match self.nodes.get_mut(&id) {
            Some(Node::Source(s)) => Some(s),
            _ => None,
        }
    }

    pub fn filter(&self, id: NodeId) -> Option<&BiquadFilter> {
        match self.nodes.get(&id) {
            Some(Node::Filter(f)) => Some(f),
            _ => None,
        }
    }

    pub fn filter_mut(&mut self, id: NodeId) -> Option<&mut BiquadFilter> {
        match self.nodes.get_mut(&id) {
            Some(Node::Filter(f)) => Some(f),
            _ => None,
        }
    }

    pub fn gain(&self, id: NodeId) -> Option<&Gain> {
        match self.nodes.get(&id) {
            Some(Node::Gain(g)) => Some(g),
            _ => None,
        }
    }

    pub fn gain_mut(&mut self, id: NodeId) -> Option<&mut Gain> {
        match self.nodes.get_mut(&id) {
            Some(Node::Gain(g)) => Some(g),
            _ => None,
        }
    }

    pub fn pitch_shifter(&self, id: NodeId) -> Option<&PitchShifter> {
        match self.nodes.get(&id) {
            Some(Node::PitchShifter(p)) => Some(p),
            _ => None,
        }
    }

    pub fn pitch_shifter_mut(&mut self, id: NodeId) -> Option<&mut PitchShifter> {
        match self.nodes.get_mut(&id) {
            Some(Node::PitchShifter(p)) => Some(p),
            _ => None,
        }
    }

    /// Reset the internal state of every processing node
    pub fn reset_effects(&mut self) {
        for node in self.nodes.values_mut() {
            if let Some(effect) = node.effect_mut() {
                effect.reset();
            }
        }
    }

    /// Reset one processing node's internal state
    pub fn reset_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(AudioError::UnknownNode(id))?;
        if let Some(effect) = node.effect_mut() {
            effect.reset();
        }
        Ok(())
    }

    /// Nodes with a path to the destination, inputs before outputs
    fn render_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        // (node, inputs already expanded)
        let mut stack = vec![(self.destination, false)];

        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            for input in self.inputs_of(node) {
                if !visited.contains(&input) {
                    stack.push((input, false));
                }
            }
        }
        order
    }

    /// Render `out.len() / 2` interleaved stereo frames into `out`
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let len = out.len();
        let sample_rate = self.sample_rate;

        for id in self.render_order() {
            let mut buffer = self.scratch.remove(&id).unwrap_or_default();
            buffer.clear();
            buffer.resize(len, 0.0);

            let inputs: Vec<NodeId> = self.inputs_of(id).collect();
            for input in inputs {
                if let Some(upstream) = self.scratch.get(&input) {
                    for (acc, s) in buffer.iter_mut().zip(upstream) {
                        *acc += *s;
                    }
                }
            }

            match self.nodes.get_mut(&id) {
                Some(Node::Source(source)) => source.fill(&mut buffer, sample_rate),
                Some(Node::Destination) => out.copy_from_slice(&buffer),
                Some(node) => {
                    if let Some(effect) = node.effect_mut() {
                        effect.process(&mut buffer, sample_rate);
                    }
                }
                None => {}
            }

            self.scratch.insert(id, buffer);
        }
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("sample_rate", &self.sample_rate)
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections)
            .finish()
    }
}
