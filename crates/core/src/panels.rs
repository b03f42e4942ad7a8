//! Mutually exclusive view panels.
//!
//! A [`ViewPanelSwitcher`] owns a fixed set of named panels (list, create, detail, report tabs)
//! of which exactly one is visible. The visible panel is a single index, so no caller can ever
//! observe zero or two visible panels.
//!
//! Panels that show an entity load it before they become visible. A failed load still shows
//! the panel, with the failure in place of the content, except for an expired session, which
//! leaves the view untouched and asks for a redirect.

use crate::error::{FetchError, FetchResult, NavigationError, UserSignal};
use async_trait::async_trait;
use clinic_types::{Identifier, PanelName};
use std::cell::{Cell, RefCell};

/// When a panel's content is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Static panel (forms, lists the page reloads itself).
    None,
    /// Detail panel: loads whenever it is entered with an identifier.
    OnIdentifier,
    /// Loads the first time it is entered; later visits reuse the content until invalidated.
    OnceOnEnter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    pub name: PanelName,
    /// Where [`ViewPanelSwitcher::back`] goes from this panel.
    pub parent: Option<PanelName>,
    pub title: Option<String>,
    pub load: LoadPolicy,
}

impl PanelSpec {
    /// # Errors
    ///
    /// `TextError::Empty` if `name` is blank.
    pub fn new(name: &str) -> Result<Self, clinic_types::TextError> {
        Ok(Self {
            name: PanelName::new(name)?,
            parent: None,
            title: None,
            load: LoadPolicy::None,
        })
    }

    pub fn with_parent(mut self, parent: &str) -> Result<Self, clinic_types::TextError> {
        self.parent = Some(PanelName::new(parent)?);
        Ok(self)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_load(mut self, load: LoadPolicy) -> Self {
        self.load = load;
        self
    }
}

/// Fetches the content of a panel.
#[async_trait(?Send)]
pub trait PanelLoader {
    type Content;

    async fn load(&self, panel: &PanelName, id: Option<&Identifier>)
        -> FetchResult<Self::Content>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent<C> {
    Blank,
    Ready(C),
    /// Inline error region shown where the content would be.
    Failed(UserSignal),
}

impl<C> PanelContent<C> {
    pub fn ready(&self) -> Option<&C> {
        match self {
            PanelContent::Ready(content) => Some(content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Shown,
    /// The loader hit an expired session; nothing changed on screen.
    RedirectToLogin,
    /// A later navigation started while this one was loading and took over.
    Superseded,
}

struct PanelSlot<C> {
    spec: PanelSpec,
    content: PanelContent<C>,
    loaded: bool,
}

pub struct ViewPanelSwitcher<L: PanelLoader> {
    panels: RefCell<Vec<PanelSlot<L::Content>>>,
    visible: Cell<usize>,
    entity_id: RefCell<Option<Identifier>>,
    generation: Cell<u64>,
    loader: L,
}

impl<L: PanelLoader> ViewPanelSwitcher<L> {
    /// Declares the panel set. The first panel starts visible.
    ///
    /// # Errors
    ///
    /// - `NavigationError::NoPanels` for an empty set
    /// - `NavigationError::DuplicatePanel` if a name is declared twice
    /// - `NavigationError::UnknownParent` if a parent is not in the set
    pub fn new(specs: Vec<PanelSpec>, loader: L) -> Result<Self, NavigationError> {
        if specs.is_empty() {
            return Err(NavigationError::NoPanels);
        }
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|earlier| earlier.name == spec.name) {
                return Err(NavigationError::DuplicatePanel(spec.name.clone()));
            }
        }
        for spec in &specs {
            if let Some(parent) = &spec.parent {
                if !specs.iter().any(|s| &s.name == parent) {
                    return Err(NavigationError::UnknownParent {
                        panel: spec.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let panels = specs
            .into_iter()
            .map(|spec| PanelSlot {
                spec,
                content: PanelContent::Blank,
                loaded: false,
            })
            .collect();

        Ok(Self {
            panels: RefCell::new(panels),
            visible: Cell::new(0),
            entity_id: RefCell::new(None),
            generation: Cell::new(0),
            loader,
        })
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Shows `name`, loading its content first when its policy asks for it.
    ///
    /// Navigating to the panel that is already visible is allowed and leaves it visible.
    ///
    /// # Errors
    ///
    /// `NavigationError::UnknownPanel` if `name` was not declared.
    pub async fn navigate(
        &self,
        name: &str,
        id: Option<Identifier>,
    ) -> Result<NavigationOutcome, NavigationError> {
        let (index, policy, panel, loaded) = {
            let panels = self.panels.borrow();
            let index = panels
                .iter()
                .position(|slot| slot.spec.name.as_str() == name)
                .ok_or_else(|| NavigationError::UnknownPanel(name.to_owned()))?;
            let slot = &panels[index];
            (index, slot.spec.load, slot.spec.name.clone(), slot.loaded)
        };

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let should_load = match policy {
            LoadPolicy::None => false,
            LoadPolicy::OnIdentifier => id.is_some(),
            LoadPolicy::OnceOnEnter => !loaded,
        };

        let content = if should_load {
            let result = self.loader.load(&panel, id.as_ref()).await;
            if self.generation.get() != generation {
                tracing::warn!(panel = %panel, "discarding superseded panel load");
                return Ok(NavigationOutcome::Superseded);
            }
            match result {
                Err(FetchError::Unauthenticated) => {
                    return Ok(NavigationOutcome::RedirectToLogin);
                }
                Ok(content) => Some((PanelContent::Ready(content), true)),
                Err(err) => {
                    tracing::debug!(panel = %panel, error = %err, "panel load failed");
                    Some((PanelContent::Failed(err.user_signal()), false))
                }
            }
        } else if policy == LoadPolicy::OnIdentifier {
            Some((PanelContent::Blank, false))
        } else {
            None
        };

        {
            let mut panels = self.panels.borrow_mut();
            if let Some((content, loaded)) = content {
                let slot = &mut panels[index];
                slot.content = content;
                slot.loaded = loaded;
            }
        }
        *self.entity_id.borrow_mut() = id;
        self.visible.set(index);
        Ok(NavigationOutcome::Shown)
    }

    /// Returns to the visible panel's parent and forgets the recorded identifier.
    ///
    /// # Errors
    ///
    /// `NavigationError::NoParent` when the visible panel declares no parent.
    pub async fn back(&self) -> Result<NavigationOutcome, NavigationError> {
        let parent = {
            let panels = self.panels.borrow();
            let slot = &panels[self.visible.get()];
            slot.spec
                .parent
                .clone()
                .ok_or_else(|| NavigationError::NoParent(slot.spec.name.clone()))?
        };
        self.entity_id.borrow_mut().take();
        self.navigate(parent.as_str(), None).await
    }

    pub fn visible(&self) -> PanelName {
        self.panels.borrow()[self.visible.get()].spec.name.clone()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible().as_str() == name
    }

    pub fn title(&self) -> Option<String> {
        self.panels.borrow()[self.visible.get()].spec.title.clone()
    }

    /// The identifier the visible panel was entered with.
    pub fn context(&self) -> Option<Identifier> {
        self.entity_id.borrow().clone()
    }

    /// Marks a panel's content stale so the next entry reloads it.
    pub fn invalidate(&self, name: &str) -> Result<(), NavigationError> {
        let mut panels = self.panels.borrow_mut();
        let slot = panels
            .iter_mut()
            .find(|slot| slot.spec.name.as_str() == name)
            .ok_or_else(|| NavigationError::UnknownPanel(name.to_owned()))?;
        slot.loaded = false;
        slot.content = PanelContent::Blank;
        Ok(())
    }
}

impl<L> ViewPanelSwitcher<L>
where
    L: PanelLoader,
    L::Content: Clone,
{
    pub fn content(&self, name: &str) -> Option<PanelContent<L::Content>> {
        self.panels
            .borrow()
            .iter()
            .find(|slot| slot.spec.name.as_str() == name)
            .map(|slot| slot.content.clone())
    }

    pub fn visible_content(&self) -> PanelContent<L::Content> {
        self.panels.borrow()[self.visible.get()].content.clone()
    }
}
