//! Single-pass rule traversal with ancestor-scoped guards.

use crate::cst::{Span, SyntaxNode};
use crate::error::Result;
use crate::lang::python;
use crate::matcher::Pattern;
use tracing::trace;

/// What a visit rule wants the traversal to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
}

/// The outcome of a leave rule.
#[derive(Debug)]
pub enum Rewrite {
    /// Keep the (possibly already updated) node as it is.
    Keep(SyntaxNode),
    /// Put a new node in the original node's place.
    Replace(SyntaxNode),
    /// Remove the node from its parent.
    Remove,
}

/// A pattern plus the ancestor guards that gate a rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    pattern: Pattern,
    inside: Vec<Pattern>,
    not_inside: Vec<Pattern>,
}

impl Rule {
    /// A rule firing on nodes matched by `pattern`.
    pub fn on(name: &'static str, pattern: Pattern) -> Self {
        Self {
            name,
            pattern,
            inside: Vec::new(),
            not_inside: Vec::new(),
        }
    }

    /// Only fire when some strict ancestor matches `pattern`.
    pub fn inside(mut self, pattern: Pattern) -> Self {
        self.inside.push(pattern);
        self
    }

    /// Only fire when no strict ancestor matches `pattern`.
    pub fn not_inside(mut self, pattern: Pattern) -> Self {
        self.not_inside.push(pattern);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

type VisitFn<'r, C> = Box<dyn Fn(&SyntaxNode, &mut C) -> Result<Visit> + 'r>;
type LeaveFn<'r, C> = Box<dyn Fn(&SyntaxNode, SyntaxNode, &mut C) -> Result<Rewrite> + 'r>;

struct CompiledRule<F> {
    name: &'static str,
    pattern: Pattern,
    inside: Vec<usize>,
    not_inside: Vec<usize>,
    action: F,
}

/// An ordered set of visit and leave rules applied in one traversal.
///
/// Visit rules run top-down before a node's children are walked; leave
/// rules run bottom-up after them. Leave rules are matched against the
/// original node and receive the updated one, so rewrites compose: children
/// are transformed before the parent's rules see them, and each rule sees
/// the output of the rules registered before it.
///
/// Guards are evaluated against the live ancestor chain. Each guard pattern
/// is tested once per node as it is entered, and per-guard counters answer
/// "is some ancestor matching this?" without re-walking the tree.
pub struct RuleSet<'r, C> {
    guards: Vec<Pattern>,
    visits: Vec<CompiledRule<VisitFn<'r, C>>>,
    leaves: Vec<CompiledRule<LeaveFn<'r, C>>>,
}

impl<'r, C> Default for RuleSet<'r, C> {
    fn default() -> Self {
        Self {
            guards: Vec::new(),
            visits: Vec::new(),
            leaves: Vec::new(),
        }
    }
}

impl<'r, C> RuleSet<'r, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-down rule.
    pub fn visit<F>(mut self, rule: Rule, action: F) -> Self
    where
        F: Fn(&SyntaxNode, &mut C) -> Result<Visit> + 'r,
    {
        let compiled = self.compile(rule, Box::new(action) as VisitFn<'r, C>);
        self.visits.push(compiled);
        self
    }

    /// Registers a bottom-up rewrite rule.
    pub fn leave<F>(mut self, rule: Rule, action: F) -> Self
    where
        F: Fn(&SyntaxNode, SyntaxNode, &mut C) -> Result<Rewrite> + 'r,
    {
        let compiled = self.compile(rule, Box::new(action) as LeaveFn<'r, C>);
        self.leaves.push(compiled);
        self
    }

    pub fn len(&self) -> usize {
        self.visits.len() + self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compile<F>(&mut self, rule: Rule, action: F) -> CompiledRule<F> {
        let inside = rule.inside.into_iter().map(|p| self.guard_index(p)).collect();
        let not_inside = rule.not_inside.into_iter().map(|p| self.guard_index(p)).collect();
        CompiledRule {
            name: rule.name,
            pattern: rule.pattern,
            inside,
            not_inside,
            action,
        }
    }

    fn guard_index(&mut self, pattern: Pattern) -> usize {
        self.guards.push(pattern);
        self.guards.len() - 1
    }

    /// Walks the tree running visit rules only.
    pub fn walk(&self, root: &SyntaxNode, context: &mut C) -> Result<()> {
        let mut ancestors = Ancestors::new(self.guards.len());
        self.walk_node(root, context, &mut ancestors, false)?;
        Ok(())
    }

    /// Walks the tree running visit and leave rules, returning the new root.
    ///
    /// A root removed by a rule yields `None`.
    pub fn transform(&self, root: &SyntaxNode, context: &mut C) -> Result<Option<SyntaxNode>> {
        let mut ancestors = Ancestors::new(self.guards.len());
        Ok(match self.walk_node(root, context, &mut ancestors, true)? {
            Outcome::Unchanged => Some(root.clone()),
            Outcome::Changed(node) => Some(node),
            Outcome::Removed => None,
        })
    }

    fn walk_node(
        &self,
        node: &SyntaxNode,
        context: &mut C,
        ancestors: &mut Ancestors,
        rewrite: bool,
    ) -> Result<Outcome> {
        let mut descend = true;
        for rule in &self.visits {
            if ancestors.allows(rule) && rule.pattern.is_match(node) {
                trace!(rule = rule.name, line = node.start().line, "visit");
                if (rule.action)(node, context)? == Visit::SkipChildren {
                    descend = false;
                }
            }
        }

        let mut changes = Vec::new();
        if descend && !node.children().is_empty() {
            ancestors.enter(node, &self.guards);
            for (i, child) in node.children().iter().enumerate() {
                match self.walk_node(child, context, ancestors, rewrite)? {
                    Outcome::Unchanged => {}
                    outcome => changes.push((i, outcome)),
                }
            }
            ancestors.exit();
        }

        if !rewrite {
            return Ok(Outcome::Unchanged);
        }

        let mut current = (!changes.is_empty()).then(|| splice(node, changes));
        for rule in &self.leaves {
            if !(ancestors.allows(rule) && rule.pattern.is_match(node)) {
                continue;
            }
            trace!(rule = rule.name, line = node.start().line, "leave");
            let input = current.take().unwrap_or_else(|| node.clone());
            match (rule.action)(node, input, context)? {
                Rewrite::Keep(kept) => current = Some(kept),
                Rewrite::Replace(replacement) => current = Some(replacement.placed_at(node)),
                Rewrite::Remove => return Ok(Outcome::Removed),
            }
        }

        Ok(match current {
            Some(node) => Outcome::Changed(node),
            None => Outcome::Unchanged,
        })
    }
}

enum Outcome {
    Unchanged,
    Changed(SyntaxNode),
    Removed,
}

/// A child's place in its rebuilt parent.
enum Slot {
    Kept(SyntaxNode),
    Removed(Span),
    /// Folded into a neighbouring removed span.
    Dropped,
}

/// Rebuilds `node` with its changed children in place.
///
/// A block whose statements were all removed gets `pass` where the first
/// one stood. A removed statement takes an adjacent `;` with it, the
/// following one if there is one.
fn splice(node: &SyntaxNode, changes: Vec<(usize, Outcome)>) -> SyntaxNode {
    let children = node.children();
    let mut slots: Vec<Slot> = children.iter().cloned().map(Slot::Kept).collect();
    for (i, outcome) in changes {
        slots[i] = match outcome {
            Outcome::Changed(child) => Slot::Kept(child),
            Outcome::Removed => Slot::Removed(*children[i].span()),
            Outcome::Unchanged => continue,
        };
    }

    let has_statement = slots
        .iter()
        .any(|s| matches!(s, Slot::Kept(c) if python::is_statement(c.kind())));
    if node.kind() == python::BLOCK_KIND && !has_statement {
        if let Some(i) = slots.iter().position(|s| matches!(s, Slot::Removed(_))) {
            let body = children[i].synthesize(python::EMPTY_BODY_KIND, python::EMPTY_BODY);
            trace!(line = body.start().line, "filled emptied block");
            slots[i] = Slot::Kept(body);
        }
    }

    for i in 0..slots.len() {
        let span = match &slots[i] {
            Slot::Removed(span) => *span,
            _ => continue,
        };
        if is_separator(slots.get(i + 1)) {
            slots[i] = Slot::Removed(Span::cover(&span, children[i + 1].span()));
            slots[i + 1] = Slot::Dropped;
        } else if i > 0 && is_separator(slots.get(i - 1)) {
            slots[i] = Slot::Removed(Span::cover(children[i - 1].span(), &span));
            slots[i - 1] = Slot::Dropped;
        }
    }

    let mut kept = Vec::with_capacity(slots.len());
    let mut removed = Vec::new();
    for slot in slots {
        match slot {
            Slot::Kept(child) => kept.push(child),
            Slot::Removed(span) => removed.push(span),
            Slot::Dropped => {}
        }
    }
    node.with_children(kept, removed)
}

fn is_separator(slot: Option<&Slot>) -> bool {
    matches!(slot, Some(Slot::Kept(c)) if !c.is_named() && c.kind() == python::STATEMENT_SEPARATOR)
}

/// Guard counters for the chain of nodes currently being walked.
struct Ancestors {
    counts: Vec<usize>,
    frames: Vec<Vec<usize>>,
}

impl Ancestors {
    fn new(guards: usize) -> Self {
        Self {
            counts: vec![0; guards],
            frames: Vec::new(),
        }
    }

    fn enter(&mut self, node: &SyntaxNode, guards: &[Pattern]) {
        let matched: Vec<usize> = guards
            .iter()
            .enumerate()
            .filter(|(_, guard)| guard.is_match(node))
            .map(|(i, _)| i)
            .collect();
        for &i in &matched {
            self.counts[i] += 1;
        }
        self.frames.push(matched);
    }

    fn exit(&mut self) {
        if let Some(matched) = self.frames.pop() {
            for i in matched {
                self.counts[i] -= 1;
            }
        }
    }

    fn allows<F>(&self, rule: &CompiledRule<F>) -> bool {
        rule.inside.iter().all(|&i| self.counts[i] > 0)
            && rule.not_inside.iter().all(|&i| self.counts[i] == 0)
    }
}
