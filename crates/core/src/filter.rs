//! Cascading Country → Curriculum → Stage → Grade → Subject selection.
//!
//! [`FilterCascade`] is the synchronous half of the filter selector: it
//! owns the five selections and option lists and decides which option
//! list has to be (re)loaded after every change. The asynchronous half
//! (actually fetching options) lives in the client crate and feeds
//! results back through [`FilterCascade::finish_load`] /
//! [`FilterCascade::fail_load`].
//!
//! Invariant: after selecting at level `L`, every level below `L` has no
//! selection and an empty option list.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scope::SelectedScope;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Levels and nodes
// ---------------------------------------------------------------------------

/// One level of the filter hierarchy, ordered from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLevel {
    Country,
    Curriculum,
    Stage,
    Grade,
    Subject,
}

/// Number of levels in the hierarchy.
pub const LEVEL_COUNT: usize = 5;

impl FilterLevel {
    pub const ALL: [FilterLevel; LEVEL_COUNT] = [
        FilterLevel::Country,
        FilterLevel::Curriculum,
        FilterLevel::Stage,
        FilterLevel::Grade,
        FilterLevel::Subject,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn parent(self) -> Option<FilterLevel> {
        match self {
            Self::Country => None,
            Self::Curriculum => Some(Self::Country),
            Self::Stage => Some(Self::Curriculum),
            Self::Grade => Some(Self::Stage),
            Self::Subject => Some(Self::Grade),
        }
    }

    pub fn child(self) -> Option<FilterLevel> {
        match self {
            Self::Country => Some(Self::Curriculum),
            Self::Curriculum => Some(Self::Stage),
            Self::Stage => Some(Self::Grade),
            Self::Grade => Some(Self::Subject),
            Self::Subject => None,
        }
    }

    /// Human-readable label, also used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Curriculum => "curriculum",
            Self::Stage => "stage",
            Self::Grade => "grade",
            Self::Subject => "subject",
        }
    }

    /// Plural label used in "Failed to load ..." notices.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Country => "countries",
            Self::Curriculum => "curriculums",
            Self::Stage => "stages",
            Self::Grade => "grades",
            Self::Subject => "subjects",
        }
    }

    /// Every level strictly below `self`.
    pub fn descendants(self) -> impl Iterator<Item = FilterLevel> {
        Self::ALL.into_iter().filter(move |l| *l > self)
    }

    /// Parse a level name as typed on the command line.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "country" => Ok(Self::Country),
            "curriculum" => Ok(Self::Curriculum),
            "stage" => Ok(Self::Stage),
            "grade" => Ok(Self::Grade),
            "subject" => Ok(Self::Subject),
            _ => Err(CoreError::Validation(format!(
                "Invalid filter level '{s}'. Must be one of: country, curriculum, stage, grade, subject"
            ))),
        }
    }
}

/// A selectable option at any level (country, curriculum, ...).
///
/// Some backend lists label their nodes with `type` instead of `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    pub id: DbId,
    #[serde(alias = "type")]
    pub name: String,
}

impl FilterNode {
    pub fn new(id: DbId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Which selector is in use: the scope drawer stops at the grade, the
/// standalone subject page continues to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorVariant {
    GradeScope,
    SubjectScope,
}

impl SelectorVariant {
    /// Deepest level that must be selected before applying.
    pub fn deepest(self) -> FilterLevel {
        match self {
            Self::GradeScope => FilterLevel::Grade,
            Self::SubjectScope => FilterLevel::Subject,
        }
    }
}

/// Options for `level` must be fetched, parameterised by `parent_id`
/// (`None` only for countries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub level: FilterLevel,
    pub parent_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Cascade state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FilterCascade {
    variant: SelectorVariant,
    selections: [Option<FilterNode>; LEVEL_COUNT],
    options: [Vec<FilterNode>; LEVEL_COUNT],
    loading: [bool; LEVEL_COUNT],
    countries_requested: bool,
}

impl FilterCascade {
    pub fn new(variant: SelectorVariant) -> Self {
        Self {
            variant,
            selections: Default::default(),
            options: Default::default(),
            loading: [false; LEVEL_COUNT],
            countries_requested: false,
        }
    }

    pub fn variant(&self) -> SelectorVariant {
        self.variant
    }

    /// Countries are requested once per cascade instance; later calls
    /// return `None`.
    pub fn open(&mut self) -> Option<LoadRequest> {
        if self.countries_requested {
            return None;
        }
        self.countries_requested = true;
        self.loading[FilterLevel::Country.index()] = true;
        Some(LoadRequest {
            level: FilterLevel::Country,
            parent_id: None,
        })
    }

    pub fn selection(&self, level: FilterLevel) -> Option<&FilterNode> {
        self.selections[level.index()].as_ref()
    }

    pub fn options(&self, level: FilterLevel) -> &[FilterNode] {
        &self.options[level.index()]
    }

    pub fn is_loading(&self, level: FilterLevel) -> bool {
        self.loading[level.index()]
    }

    /// A level is interactive when its parent is selected and it is not
    /// waiting on an empty option list.
    pub fn is_enabled(&self, level: FilterLevel) -> bool {
        if level > self.variant.deepest() {
            return false;
        }
        let parent_selected = level
            .parent()
            .map_or(true, |p| self.selections[p.index()].is_some());
        let waiting = self.loading[level.index()] && self.options[level.index()].is_empty();
        parent_selected && !waiting
    }

    /// Apply/Start is allowed once the deepest required level is selected.
    pub fn can_apply(&self) -> bool {
        self.selections[self.variant.deepest().index()].is_some()
    }

    /// Select `node` (or clear with `None`) at `level`.
    ///
    /// Clears every selection and option list below `level`. Returns the
    /// options load that the new selection requires, if any.
    pub fn select(
        &mut self,
        level: FilterLevel,
        node: Option<FilterNode>,
    ) -> Result<Option<LoadRequest>, CoreError> {
        if level > self.variant.deepest() {
            return Err(CoreError::Validation(format!(
                "This selector does not include the {} level",
                level.label()
            )));
        }
        if let Some(parent) = level.parent() {
            if self.selections[parent.index()].is_none() {
                return Err(CoreError::Validation(format!(
                    "Select a {} before choosing a {}",
                    parent.label(),
                    level.label()
                )));
            }
        }

        let parent_id = node.as_ref().map(|n| n.id);
        self.selections[level.index()] = node;
        self.reset_below(level);

        let request = match (parent_id, level.child()) {
            (Some(id), Some(child)) if child <= self.variant.deepest() => {
                self.loading[child.index()] = true;
                Some(LoadRequest {
                    level: child,
                    parent_id: Some(id),
                })
            }
            _ => None,
        };
        Ok(request)
    }

    /// Select the option with `id` from the currently loaded list at `level`.
    pub fn select_id(
        &mut self,
        level: FilterLevel,
        id: DbId,
    ) -> Result<Option<LoadRequest>, CoreError> {
        let node = self.options[level.index()]
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(level.label(), id))?;
        self.select(level, Some(node))
    }

    /// Store the options fetched for `request`.
    ///
    /// Returns `false` (and changes nothing) when the parent selection
    /// moved on while the request was in flight.
    pub fn finish_load(&mut self, request: LoadRequest, nodes: Vec<FilterNode>) -> bool {
        if !self.is_current(request) {
            return false;
        }
        self.options[request.level.index()] = nodes;
        self.loading[request.level.index()] = false;
        true
    }

    /// Record a failed fetch: the level's options stay empty.
    pub fn fail_load(&mut self, request: LoadRequest) -> bool {
        if !self.is_current(request) {
            return false;
        }
        self.options[request.level.index()].clear();
        self.loading[request.level.index()] = false;
        true
    }

    /// Pre-populate every level from a persisted scope.
    ///
    /// Returns the loads needed to make each dropdown interactive again:
    /// countries (unless already requested) and the sibling options of
    /// every restored level.
    pub fn restore(&mut self, scope: &SelectedScope) -> Vec<LoadRequest> {
        let deepest = self.variant.deepest();
        let mut requests = Vec::new();
        if let Some(open) = self.open() {
            requests.push(open);
        }

        for level in FilterLevel::ALL {
            if level == FilterLevel::Country {
                self.selections[0] = Some(scope.country.clone());
                continue;
            }
            if level > deepest {
                self.selections[level.index()] = None;
                self.options[level.index()].clear();
                self.loading[level.index()] = false;
                continue;
            }
            self.selections[level.index()] = scope.node(level).cloned();
            self.options[level.index()].clear();

            let parent_id = level
                .parent()
                .and_then(|p| self.selections[p.index()].as_ref())
                .map(|n| n.id);
            if parent_id.is_some() {
                self.loading[level.index()] = true;
                requests.push(LoadRequest { level, parent_id });
            }
        }
        requests
    }

    /// The full selection as a scope, once applying is allowed.
    pub fn to_scope(&self) -> Result<SelectedScope, CoreError> {
        if !self.can_apply() {
            return Err(CoreError::Validation(format!(
                "Please select a {} before applying filters",
                self.variant.deepest().label()
            )));
        }
        let required = |level: FilterLevel| {
            self.selections[level.index()]
                .clone()
                .ok_or_else(|| CoreError::Internal(format!("missing {} selection", level.label())))
        };
        Ok(SelectedScope {
            country: required(FilterLevel::Country)?,
            curriculum: required(FilterLevel::Curriculum)?,
            stage: required(FilterLevel::Stage)?,
            grade: required(FilterLevel::Grade)?,
            subject: match self.variant {
                SelectorVariant::SubjectScope => Some(required(FilterLevel::Subject)?),
                SelectorVariant::GradeScope => None,
            },
        })
    }

    fn reset_below(&mut self, level: FilterLevel) {
        for below in level.descendants() {
            self.selections[below.index()] = None;
            self.options[below.index()].clear();
            self.loading[below.index()] = false;
        }
    }

    fn is_current(&self, request: LoadRequest) -> bool {
        match request.level.parent() {
            None => true,
            Some(parent) => {
                self.selections[parent.index()].as_ref().map(|n| n.id) == request.parent_id
            }
        }
    }
}
