//! The discovered command hierarchy.
//!
//! The tree is an arena: nodes live in one `Vec` and refer to each other by
//! [`NodeId`]. The parent link is a lookup relation only and never implies
//! ownership. Nodes are stored in depth-first order with siblings sorted by
//! name, so iterating the arena visits commands in discovery order.

use std::collections::{BTreeMap, HashMap};

use crate::handler::Handler;
use crate::identity::CommandIdentity;
use crate::schema::Schema;

/// Index of a node in its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a command was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOrigin {
    /// The module the function was found in, e.g. `user/create`.
    pub module: String,
    pub function: String,
    /// Name of the entry-point strategy that selected the function.
    pub strategy: &'static str,
}

/// Whether a node dispatches or only groups other nodes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Command {
        handler: Handler,
        origin: CommandOrigin,
    },
}

/// One node of the command hierarchy.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub id: NodeId,
    pub identity: CommandIdentity,
    /// Display name; the root carries the program name.
    pub name: String,
    pub help: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Fields declared at this level.
    pub own_schema: Schema,
    /// Fields visible at this level, inherited ones included.
    pub schema: Schema,
}

impl CommandNode {
    pub fn is_command(&self) -> bool {
        matches!(self.kind, NodeKind::Command { .. })
    }

    pub fn is_group(&self) -> bool {
        !self.is_command()
    }

    pub fn handler(&self) -> Option<&Handler> {
        match &self.kind {
            NodeKind::Command { handler, .. } => Some(handler),
            NodeKind::Group => None,
        }
    }

    pub fn origin(&self) -> Option<&CommandOrigin> {
        match &self.kind {
            NodeKind::Command { origin, .. } => Some(origin),
            NodeKind::Group => None,
        }
    }
}

/// The immutable result of a scan.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    index: HashMap<CommandIdentity, NodeId>,
}

impl CommandTree {
    pub fn root(&self) -> &CommandNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, identity: &CommandIdentity) -> Option<&CommandNode> {
        self.index.get(identity).map(|id| self.node(*id))
    }

    /// Follows child names from the root.
    pub fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        let mut current = self.root();
        for segment in path {
            let name = segment.as_ref();
            current = current
                .children
                .iter()
                .map(|id| self.node(*id))
                .find(|child| child.name == name)?;
        }
        Some(current)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &CommandNode> {
        self.node(id).children.iter().map(move |c| self.node(*c))
    }

    pub fn parent(&self, id: NodeId) -> Option<&CommandNode> {
        self.node(id).parent.map(|p| self.node(p))
    }

    /// The nodes from the root down to `id`, both included.
    pub fn path_to(&self, id: NodeId) -> Vec<&CommandNode> {
        let mut path = vec![self.node(id)];
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            path.push(self.node(parent));
            current = self.node(parent).parent;
        }
        path.reverse();
        path
    }

    /// All nodes in depth-first, alphabetical order.
    pub fn iter(&self) -> std::slice::Iter<'_, CommandNode> {
        self.nodes.iter()
    }

    /// Leaves in depth-first, alphabetical order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandNode> {
        self.nodes.iter().filter(|n| n.is_command())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    /// A stable textual rendering of the tree: one line per node with its
    /// identity, kind and effective field names.
    pub fn outline(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| {
                let kind = if n.is_command() { "command" } else { "group" };
                format!(
                    "{}{} [{}] ({})",
                    "  ".repeat(n.identity.depth()),
                    if n.identity.is_root() {
                        "<root>".to_string()
                    } else {
                        n.identity.to_string()
                    },
                    kind,
                    n.schema.names().join(", ")
                )
            })
            .collect()
    }

    /// Flattens a finished pending tree, dropping groups that ended up
    /// without any command. The root is always kept.
    pub(crate) fn from_pending(mut root: PendingNode) -> Self {
        root.prune();
        let mut tree = CommandTree {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        tree.push(root, CommandIdentity::root(), None);
        tree
    }

    fn push(
        &mut self,
        pending: PendingNode,
        identity: CommandIdentity,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(identity.clone(), id);
        self.nodes.push(CommandNode {
            id,
            identity: identity.clone(),
            name: pending.name,
            help: pending.help,
            parent,
            children: Vec::new(),
            kind: pending.kind,
            own_schema: pending.own_schema,
            schema: pending.schema,
        });
        for (name, child) in pending.children {
            let child_id = self.push(child, identity.child(&name), Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }
}

impl<'a> IntoIterator for &'a CommandTree {
    type Item = &'a CommandNode;
    type IntoIter = std::slice::Iter<'a, CommandNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// A node under construction. Children are keyed by normalized name, which
/// keeps siblings sorted.
#[derive(Debug)]
pub(crate) struct PendingNode {
    pub name: String,
    pub help: String,
    pub kind: NodeKind,
    pub own_schema: Schema,
    pub schema: Schema,
    pub children: BTreeMap<String, PendingNode>,
}

impl PendingNode {
    pub fn group(
        name: impl Into<String>,
        help: impl Into<String>,
        own: Schema,
        schema: Schema,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: NodeKind::Group,
            own_schema: own,
            schema,
            children: BTreeMap::new(),
        }
    }

    /// Visits the commands below this node in the order they will have in
    /// the finished tree and drops the ones `keep` rejects.
    pub fn retain_commands<F>(&mut self, identity: &CommandIdentity, keep: &mut F)
    where
        F: FnMut(&CommandIdentity, &PendingNode) -> bool,
    {
        self.children.retain(|name, child| {
            let child_identity = identity.child(name);
            if matches!(child.kind, NodeKind::Command { .. }) {
                keep(&child_identity, child)
            } else {
                child.retain_commands(&child_identity, &mut *keep);
                true
            }
        });
    }

    /// Returns true if this node or a descendant is a command.
    fn prune(&mut self) -> bool {
        if matches!(self.kind, NodeKind::Command { .. }) {
            return true;
        }
        self.children.retain(|_, child| child.prune());
        !self.children.is_empty()
    }
}
