//! Dependent selectors.
//!
//! A [`SelectorGraph`] holds selectors whose options come from a remote collection and may
//! depend on a parent selector (site → department → doctor). The graph keeps two rules:
//!
//! - A selector whose value is empty has every dependent reset to its placeholder, with no value
//!   and no options. Dependents never show options that belong to a stale ancestor value.
//! - Every reset or reload of a selector advances its generation. A fetch remembers the
//!   generation it started under and its response is dropped if the generation has moved on,
//!   so the last change always wins, whatever order responses arrive in.
//!
//! All state lives behind a `RefCell` and no borrow is held across an `.await`, so several
//! gestures may be in flight on the same graph from a single-threaded runtime.

use crate::error::{FetchError, SelectionError, UserSignal};
use crate::record::{OptionItem, Projection};
use crate::resource::{Query, RemoteResource};
use crate::transport::Transport;
use clinic_types::Identifier;
use std::cell::RefCell;

/// Placeholder shown by a selector with nothing to offer yet.
pub const DEFAULT_PLACEHOLDER: &str = "Seleccione...";

/// Handle to one selector of a [`SelectorGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectorId(usize);

/// Declaration of one selector.
pub struct SelectorSpec<T> {
    name: String,
    resource: RemoteResource<T>,
    projection: Projection,
    filter_param: Option<String>,
    placeholder: String,
    required: bool,
}

impl<T> SelectorSpec<T> {
    pub fn new(name: impl Into<String>, resource: RemoteResource<T>, projection: Projection) -> Self {
        Self {
            name: name.into(),
            resource,
            projection,
            filter_param: None,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            required: true,
        }
    }

    /// Query parameter under which this selector's value filters its descendants' fetches.
    pub fn filter_param(mut self, param: impl Into<String>) -> Self {
        self.filter_param = Some(param.into());
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = text.into();
        self
    }

    /// Marks the selector as not needed for a form submission.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// What a selector currently offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsState {
    /// Nothing to choose from: a single placeholder entry.
    Placeholder(String),
    Loading,
    Ready(Vec<OptionItem>),
    /// The last fetch failed; no options, an error entry instead.
    Failed(UserSignal),
}

/// Result of a (re)load that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was applied to the selector.
    Applied,
    /// The selector was reset to its placeholder without fetching.
    Cleared,
    /// A later change superseded this load; its response was dropped.
    Discarded,
}

/// Read-only snapshot of a selector for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorView {
    pub name: String,
    pub value: Option<Identifier>,
    pub state: OptionsState,
}

impl SelectorView {
    pub fn options(&self) -> &[OptionItem] {
        match &self.state {
            OptionsState::Ready(options) => options,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&UserSignal> {
        match &self.state {
            OptionsState::Failed(signal) => Some(signal),
            _ => None,
        }
    }
}

struct SelectorNode<T> {
    spec: SelectorSpec<T>,
    parent: Option<SelectorId>,
    dependents: Vec<SelectorId>,
    value: Option<Identifier>,
    state: OptionsState,
    generation: u64,
    /// Advances whenever `value` is set or cleared.
    selection: u64,
}

impl<T> SelectorNode<T> {
    fn reset(&mut self) {
        self.generation += 1;
        self.selection += 1;
        self.value = None;
        self.state = OptionsState::Placeholder(self.spec.placeholder.clone());
    }
}

pub struct SelectorGraph<T> {
    nodes: RefCell<Vec<SelectorNode<T>>>,
}

impl<T> Default for SelectorGraph<T> {
    fn default() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Transport> SelectorGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a selector, optionally depending on `parent`.
    ///
    /// Selectors start on their placeholder; roots are populated by [`SelectorGraph::refresh`].
    ///
    /// # Errors
    ///
    /// `SelectionError::UnknownSelector` if `parent` does not belong to this graph.
    pub fn bind(
        &mut self,
        spec: SelectorSpec<T>,
        parent: Option<SelectorId>,
    ) -> Result<SelectorId, SelectionError> {
        let nodes = self.nodes.get_mut();
        let id = SelectorId(nodes.len());
        if let Some(parent) = parent {
            nodes
                .get_mut(parent.0)
                .ok_or_else(|| SelectionError::UnknownSelector(format!("#{}", parent.0)))?
                .dependents
                .push(id);
        }
        let placeholder = spec.placeholder.clone();
        nodes.push(SelectorNode {
            spec,
            parent,
            dependents: Vec::new(),
            value: None,
            state: OptionsState::Placeholder(placeholder),
            generation: 0,
            selection: 0,
        });
        Ok(id)
    }

    /// Selectors in declaration order.
    pub fn ids(&self) -> Vec<SelectorId> {
        (0..self.nodes.borrow().len()).map(SelectorId).collect()
    }

    pub fn find(&self, name: &str) -> Option<SelectorId> {
        self.nodes
            .borrow()
            .iter()
            .position(|node| node.spec.name == name)
            .map(SelectorId)
    }

    pub fn name(&self, id: SelectorId) -> Option<String> {
        self.nodes.borrow().get(id.0).map(|node| node.spec.name.clone())
    }

    pub fn is_required(&self, id: SelectorId) -> bool {
        self.nodes
            .borrow()
            .get(id.0)
            .map_or(false, |node| node.spec.required)
    }

    pub fn current_selection(&self, id: SelectorId) -> Option<Identifier> {
        self.nodes.borrow().get(id.0).and_then(|node| node.value.clone())
    }

    pub fn view(&self, id: SelectorId) -> Option<SelectorView> {
        self.nodes.borrow().get(id.0).map(|node| SelectorView {
            name: node.spec.name.clone(),
            value: node.value.clone(),
            state: node.state.clone(),
        })
    }

    /// Reloads every root selector, in declaration order.
    ///
    /// # Errors
    ///
    /// The first failure; later roots are still loaded.
    pub async fn load_roots(&self) -> Result<(), SelectionError> {
        let roots: Vec<SelectorId> = self
            .nodes
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(i, _)| SelectorId(i))
            .collect();

        let mut first_error = None;
        for root in roots {
            if let Err(err) = self.refresh(root).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Re-issues the fetch of `id` with the current values of its ancestors as filters.
    pub async fn refresh(&self, id: SelectorId) -> Result<LoadOutcome, SelectionError> {
        let query = self.filter_context(id, None)?;
        self.load(id, query).await
    }

    /// Reacts to a new value of `id`'s parent.
    ///
    /// `None` resets `id` and all its descendants to their placeholders. A value reloads `id`
    /// filtered by it (and by the other ancestors), leaving `id` itself unselected.
    pub async fn on_ancestor_change(
        &self,
        id: SelectorId,
        value: Option<&Identifier>,
    ) -> Result<LoadOutcome, SelectionError> {
        match value {
            None => {
                let mut nodes = self.nodes.borrow_mut();
                if id.0 >= nodes.len() {
                    return Err(SelectionError::UnknownSelector(format!("#{}", id.0)));
                }
                reset_subtree(&mut nodes, id);
                Ok(LoadOutcome::Cleared)
            }
            Some(value) => {
                let query = self.filter_context(id, Some(value))?;
                self.load(id, query).await
            }
        }
    }

    /// The user picks `value` (or clears the selector with `None`).
    ///
    /// The value must be one of the loaded options. Direct dependents are then updated one after
    /// another; each of them resets its own subtree before fetching. If the selector's value
    /// changes again meanwhile, the remaining dependents are left to the later change.
    ///
    /// # Errors
    ///
    /// - `SelectionError::NotAnOption` if `value` is not currently offered
    /// - the first dependent reload failure; the remaining dependents are still updated
    pub async fn select(
        &self,
        id: SelectorId,
        value: Option<Identifier>,
    ) -> Result<(), SelectionError> {
        let (dependents, selection) = {
            let mut nodes = self.nodes.borrow_mut();
            let node = nodes
                .get_mut(id.0)
                .ok_or_else(|| SelectionError::UnknownSelector(format!("#{}", id.0)))?;

            if let Some(value) = &value {
                let offered = matches!(
                    &node.state,
                    OptionsState::Ready(options) if options.iter().any(|o| o.value == *value)
                );
                if !offered {
                    return Err(SelectionError::NotAnOption {
                        selector: node.spec.name.clone(),
                        value: value.to_string(),
                    });
                }
            }
            node.value = value.clone();
            node.selection += 1;
            (node.dependents.clone(), node.selection)
        };

        let mut first_error = None;
        for dependent in dependents {
            if self.nodes.borrow()[id.0].selection != selection {
                tracing::debug!(selector = id.0, "selection changed, leaving remaining dependents");
                break;
            }
            if let Err(err) = self.on_ancestor_change(dependent, value.as_ref()).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Empties every selection. Roots keep their loaded options; every other selector goes back
    /// to its placeholder. Loads still in flight are superseded.
    pub fn clear_all(&self) {
        for node in self.nodes.borrow_mut().iter_mut() {
            if node.parent.is_none() {
                node.generation += 1;
                node.selection += 1;
                node.value = None;
                if matches!(node.state, OptionsState::Loading) {
                    node.state = OptionsState::Placeholder(node.spec.placeholder.clone());
                }
            } else {
                node.reset();
            }
        }
    }

    /// Filters for a fetch of `id`: the value of every ancestor that declares a filter parameter,
    /// outermost first. `parent_value` stands in for the immediate parent's value.
    fn filter_context(
        &self,
        id: SelectorId,
        parent_value: Option<&Identifier>,
    ) -> Result<Query, SelectionError> {
        let nodes = self.nodes.borrow();
        let node = nodes
            .get(id.0)
            .ok_or_else(|| SelectionError::UnknownSelector(format!("#{}", id.0)))?;

        let mut filters = Vec::new();
        let mut ancestor = node.parent;
        let mut immediate = true;
        while let Some(current) = ancestor {
            let ancestor_node = &nodes[current.0];
            let value = if immediate {
                parent_value.cloned().or_else(|| ancestor_node.value.clone())
            } else {
                ancestor_node.value.clone()
            };
            if let (Some(param), Some(value)) = (&ancestor_node.spec.filter_param, value) {
                filters.push((param.clone(), value.to_string()));
            }
            immediate = false;
            ancestor = ancestor_node.parent;
        }

        let mut query = Query::new();
        for (param, value) in filters.into_iter().rev() {
            query.push(param, value);
        }
        Ok(query)
    }

    async fn load(&self, id: SelectorId, query: Query) -> Result<LoadOutcome, SelectionError> {
        let (resource, name, generation) = {
            let mut nodes = self.nodes.borrow_mut();
            if id.0 >= nodes.len() {
                return Err(SelectionError::UnknownSelector(format!("#{}", id.0)));
            }
            reset_subtree(&mut nodes, id);
            let node = &mut nodes[id.0];
            node.state = OptionsState::Loading;
            (node.spec.resource.clone(), node.spec.name.clone(), node.generation)
        };

        let result = resource.fetch_collection(&query).await;

        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[id.0];
        if node.generation != generation {
            tracing::warn!(
                selector = %name,
                started = generation,
                current = node.generation,
                "discarding stale options response"
            );
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(records) => {
                let options = node.spec.projection.project(&records);
                tracing::debug!(selector = %name, options = options.len(), "options loaded");
                node.state = OptionsState::Ready(options);
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                node.state = OptionsState::Failed(err.user_signal());
                Err(SelectionError::Fetch(err))
            }
        }
    }
}

/// Resets `id` and, transitively, everything that depends on it.
fn reset_subtree<T>(nodes: &mut [SelectorNode<T>], id: SelectorId) {
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        let node = &mut nodes[current.0];
        node.reset();
        pending.extend(node.dependents.iter().copied());
    }
}

impl SelectionError {
    /// The fetch failure behind this error, if any.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            SelectionError::Fetch(err) => Some(err),
            _ => None,
        }
    }
}
