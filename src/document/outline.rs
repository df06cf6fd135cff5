//! Document outline: the renderer's linked graph and the navigation tree
//! built from it.

/// Index of a node inside an [`OutlineGraph`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutlineId(usize);

/// A node of the renderer-provided outline
#[derive(Clone, Debug)]
pub struct OutlineNode<D> {
    pub title: String,
    pub destination: Option<D>,
    pub child: Option<OutlineId>,
    pub next: Option<OutlineId>,
}

/// Outline forest linked through first-child and next-sibling pointers.
///
/// There are no parent pointers; ancestry is reconstructed by whoever
/// walks the graph.
#[derive(Clone, Debug)]
pub struct OutlineGraph<D> {
    nodes: Vec<OutlineNode<D>>,
    first: Option<OutlineId>,
}

impl<D> Default for OutlineGraph<D> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            first: None,
        }
    }
}

impl<D> OutlineGraph<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node
    pub fn add(&mut self, title: impl Into<String>, destination: Option<D>) -> OutlineId {
        let id = OutlineId(self.nodes.len());
        self.nodes.push(OutlineNode {
            title: title.into(),
            destination,
            child: None,
            next: None,
        });
        id
    }

    pub fn set_first(&mut self, id: OutlineId) {
        self.first = Some(id);
    }

    pub fn set_child(&mut self, parent: OutlineId, child: OutlineId) {
        self.nodes[parent.0].child = Some(child);
    }

    pub fn set_next(&mut self, node: OutlineId, next: OutlineId) {
        self.nodes[node.0].next = Some(next);
    }

    /// First top-level node
    pub fn first(&self) -> Option<OutlineId> {
        self.first
    }

    pub fn node(&self, id: OutlineId) -> &OutlineNode<D> {
        &self.nodes[id.0]
    }

}

/// Title of the synthetic root entry
pub const ROOT_TITLE: &str = "Index";

/// Entry of the presentation-ready navigation tree.
///
/// Clone, comparison and drop walk the tree with an explicit stack, so a
/// tree of any depth is safe to handle.
pub struct NavigationEntry {
    pub title: String,
    pub page_number: Option<usize>,
    pub children: Vec<NavigationEntry>,
}

impl NavigationEntry {
    pub fn new(title: impl Into<String>, page_number: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page_number,
            children: Vec::new(),
        }
    }

    /// Number of entries in this subtree, including `self`
    pub fn entry_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(entry) = stack.pop() {
            count += 1;
            stack.extend(entry.children.iter());
        }
        count
    }

    /// Depth-first rows for a two-column (title, page) presentation.
    ///
    /// The root itself is row 0 at depth 0.
    pub fn rows(&self) -> Vec<NavigationRow<'_>> {
        let mut rows = Vec::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((entry, depth)) = stack.pop() {
            rows.push(NavigationRow {
                depth,
                title: &entry.title,
                page_label: entry.page_number.map(|p| p.to_string()).unwrap_or_default(),
            });
            stack.extend(entry.children.iter().rev().map(|c| (c, depth + 1)));
        }
        rows
    }
}

impl Drop for NavigationEntry {
    // Outlines can nest arbitrarily deep; unlink children iteratively so the
    // default recursive drop never runs on a deep chain.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut entry) = pending.pop() {
            pending.append(&mut entry.children);
        }
    }
}

impl Clone for NavigationEntry {
    fn clone(&self) -> Self {
        let mut arena = vec![PendingEntry {
            title: self.title.clone(),
            page_number: self.page_number,
            children: Vec::new(),
        }];
        let mut stack = vec![(self, 0usize)];
        while let Some((entry, idx)) = stack.pop() {
            for child in &entry.children {
                let child_idx = arena.len();
                arena.push(PendingEntry {
                    title: child.title.clone(),
                    page_number: child.page_number,
                    children: Vec::new(),
                });
                arena[idx].children.push(child_idx);
                stack.push((child, child_idx));
            }
        }
        assemble(arena)
    }
}

impl PartialEq for NavigationEntry {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.title != b.title
                || a.page_number != b.page_number
                || a.children.len() != b.children.len()
            {
                return false;
            }
            stack.extend(a.children.iter().zip(b.children.iter()));
        }
        true
    }
}

impl Eq for NavigationEntry {}

// Only the direct child count is printed
impl std::fmt::Debug for NavigationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("title", &self.title)
            .field("page_number", &self.page_number)
            .field("children", &self.children.len())
            .finish()
    }
}

/// One line of the navigation view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRow<'a> {
    pub depth: usize,
    pub title: &'a str,
    /// Empty when the entry has no target page
    pub page_label: String,
}

/// Entry under construction, children referenced by arena index
struct PendingEntry {
    title: String,
    page_number: Option<usize>,
    children: Vec<usize>,
}

/// Flatten an outline graph into a navigation tree rooted at "Index".
///
/// The walk is iterative: descending into a child pushes the current node
/// and the entry being populated, and running out of siblings pops back to
/// the nearest ancestor so that *its* `next` pointer is followed. Sibling
/// order in the output matches the `next` chain.
pub fn build_navigation_tree<D, F>(
    outline: Option<&OutlineGraph<D>>,
    mut resolve: F,
) -> NavigationEntry
where
    F: FnMut(&D) -> Option<usize>,
{
    let mut arena = vec![PendingEntry {
        title: ROOT_TITLE.to_string(),
        page_number: None,
        children: Vec::new(),
    }];

    let Some(graph) = outline else {
        return assemble(arena);
    };
    let Some(mut current) = graph.first() else {
        return assemble(arena);
    };

    let mut parent = 0usize;
    let mut stack: Vec<(OutlineId, usize)> = Vec::new();

    loop {
        let node = graph.node(current);
        let entry = arena.len();
        arena.push(PendingEntry {
            title: node.title.clone(),
            page_number: node.destination.as_ref().and_then(&mut resolve),
            children: Vec::new(),
        });
        arena[parent].children.push(entry);

        if let Some(child) = node.child {
            stack.push((current, parent));
            parent = entry;
            current = child;
            continue;
        }

        let mut cursor = current;
        while graph.node(cursor).next.is_none() {
            match stack.pop() {
                Some((node, node_parent)) => {
                    cursor = node;
                    parent = node_parent;
                }
                None => return assemble(arena),
            }
        }

        match graph.node(cursor).next {
            Some(next) => current = next,
            None => return assemble(arena),
        }
    }
}

/// Turn the arena into an owned tree. Children always have larger indices
/// than their parent, so a reverse sweep builds every subtree before it is
/// attached.
fn assemble(arena: Vec<PendingEntry>) -> NavigationEntry {
    let mut built: Vec<Option<NavigationEntry>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (idx, pending) in arena.into_iter().enumerate().rev() {
        let mut entry = NavigationEntry::new(pending.title, pending.page_number);
        entry.children = pending
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(entry);
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| NavigationEntry::new(ROOT_TITLE, None))
}
