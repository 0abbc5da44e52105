//! Position planning
//!
//! Pure computation: given a section's elements and where the new fields go,
//! produce the shifts and inserts that open gaps for them. Nothing here reads
//! or writes a store.
//!
//! Two strategies are supported:
//!
//! - **Anchored** ([`plan_anchored`]): each new field goes at the position its
//!   legacy anchor held; every element moves down by the number of anchors at
//!   or before it.
//! - **Flat** ([`plan_flat`]): all new fields go contiguously starting at one
//!   anchor; every element at or after it moves down by the number of new
//!   fields.
//!
//! Both refuse plans in which an inserted field would share a final position
//! with another element.

use crate::layout::Element;
use cmdb_store::SysId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Planning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Nothing to insert
    #[error("no new fields to place")]
    NoNewFields,

    /// Same new field requested twice
    #[error("new field {0} requested more than once")]
    DuplicateNewField(String),

    /// Inserted field would share its final position
    #[error("{incoming} would land on position {position} already held by {occupant}")]
    Collision {
        /// Contested final position
        position: i64,
        /// Element already ending up there
        occupant: String,
        /// New field that was to be inserted
        incoming: String,
    },
}

/// One new field and the legacy anchor position it takes over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSlot {
    /// Position held by the legacy anchor before the change
    pub position: i64,
    /// New field placed there
    pub field: String,
}

impl AnchorSlot {
    /// Create slot
    #[must_use]
    pub fn new(position: i64, field: impl Into<String>) -> Self {
        Self {
            position,
            field: field.into(),
        }
    }
}

/// Planned position change of an existing element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedShift {
    /// Element identifier
    pub element: SysId,
    /// Field name
    pub name: String,
    /// Position before
    pub from: i64,
    /// Position after
    pub to: i64,
}

/// Planned insertion of a new element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInsert {
    /// Field name
    pub field: String,
    /// Position to insert at
    pub position: i64,
}

/// Shifts and inserts for one section
///
/// Shifts are ordered by (old position, element identifier); inserts keep the
/// order in which the new fields were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionPlan {
    /// Position changes, elements that do not move are omitted
    pub shifts: Vec<PlannedShift>,
    /// New elements
    pub inserts: Vec<PlannedInsert>,
}

impl PositionPlan {
    /// True when the plan changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty() && self.inserts.is_empty()
    }

    /// Final `(name, position)` layout of `elements` plus the inserts, sorted
    /// by position then name
    #[must_use]
    pub fn final_layout(&self, elements: &[Element]) -> Vec<(String, i64)> {
        let moved: BTreeMap<&SysId, i64> = self.shifts.iter().map(|s| (&s.element, s.to)).collect();
        let mut layout: Vec<(String, i64)> = elements
            .iter()
            .map(|e| {
                let pos = moved.get(&e.sys_id).copied().unwrap_or(e.position);
                (e.name.clone(), pos)
            })
            .chain(self.inserts.iter().map(|i| (i.field.clone(), i.position)))
            .collect();
        layout.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        layout
    }
}

/// Number of anchors at or before `position`
#[must_use]
pub fn shift_delta(position: i64, anchors: &[i64]) -> i64 {
    let count = anchors.iter().filter(|&&a| a <= position).count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Plan one insertion per anchor slot
///
/// Each element moves to `p + shift_delta(p, anchors)`; each new field is
/// inserted at its anchor's original position.
///
/// # Errors
/// Returns [`PlanError`] if no slots are given, a field repeats, or the
/// result would put two elements on one position that were not already
/// sharing it
pub fn plan_anchored(elements: &[Element], slots: &[AnchorSlot]) -> Result<PositionPlan, PlanError> {
    check_fields(slots.iter().map(|s| s.field.as_str()))?;

    let anchors: Vec<i64> = slots.iter().map(|s| s.position).collect();
    let shifts = collect_shifts(elements, |p| p + shift_delta(p, &anchors));
    let inserts = slots
        .iter()
        .map(|s| PlannedInsert {
            field: s.field.clone(),
            position: s.position,
        })
        .collect();

    let plan = PositionPlan { shifts, inserts };
    verify(elements, &plan)?;
    Ok(plan)
}

/// Plan contiguous insertion of `fields` starting at `anchor`
///
/// Elements at or after `anchor` move down by `fields.len()`; field `i` is
/// inserted at `anchor + i`.
///
/// # Errors
/// Returns [`PlanError`] if `fields` is empty, repeats a name, or the result
/// collides
pub fn plan_flat(
    elements: &[Element],
    anchor: i64,
    fields: &[String],
) -> Result<PositionPlan, PlanError> {
    check_fields(fields.iter().map(String::as_str))?;

    let width = i64::try_from(fields.len()).unwrap_or(i64::MAX);
    let shifts = collect_shifts(elements, |p| if p >= anchor { p + width } else { p });
    let inserts = fields
        .iter()
        .zip(anchor..)
        .map(|(field, position)| PlannedInsert {
            field: field.clone(),
            position,
        })
        .collect();

    let plan = PositionPlan { shifts, inserts };
    verify(elements, &plan)?;
    Ok(plan)
}

fn check_fields<'a>(fields: impl Iterator<Item = &'a str>) -> Result<(), PlanError> {
    let mut seen = BTreeSet::new();
    for field in fields {
        if !seen.insert(field) {
            return Err(PlanError::DuplicateNewField(field.to_string()));
        }
    }
    if seen.is_empty() {
        return Err(PlanError::NoNewFields);
    }
    Ok(())
}

fn collect_shifts(elements: &[Element], target: impl Fn(i64) -> i64) -> Vec<PlannedShift> {
    let mut shifts: Vec<PlannedShift> = elements
        .iter()
        .filter_map(|e| {
            let to = target(e.position);
            (to != e.position).then(|| PlannedShift {
                element: e.sys_id.clone(),
                name: e.name.clone(),
                from: e.position,
                to,
            })
        })
        .collect();
    shifts.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.element.cmp(&b.element)));
    shifts
}

// An insert whose field already sits in the section is skipped at apply time,
// so that occupant cannot collide with it.
fn verify(elements: &[Element], plan: &PositionPlan) -> Result<(), PlanError> {
    let moved: BTreeMap<&SysId, i64> = plan.shifts.iter().map(|s| (&s.element, s.to)).collect();
    let mut occupied: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
    for e in elements {
        let pos = moved.get(&e.sys_id).copied().unwrap_or(e.position);
        occupied.entry(pos).or_default().push(&e.name);
    }

    let present: BTreeSet<&str> = elements.iter().map(|e| e.name.as_str()).collect();
    let mut claimed: BTreeMap<i64, &str> = BTreeMap::new();
    for insert in &plan.inserts {
        if present.contains(insert.field.as_str()) {
            continue;
        }
        if let Some(other) = claimed.get(&insert.position) {
            return Err(PlanError::Collision {
                position: insert.position,
                occupant: (*other).to_string(),
                incoming: insert.field.clone(),
            });
        }
        if let Some(names) = occupied.get(&insert.position) {
            if let Some(occupant) = names.iter().find(|n| **n != insert.field) {
                return Err(PlanError::Collision {
                    position: insert.position,
                    occupant: (*occupant).to_string(),
                    incoming: insert.field.clone(),
                });
            }
        }
        claimed.insert(insert.position, &insert.field);
    }
    Ok(())
}

/// Legacy anchor element found on a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorCandidate {
    /// Section holding the element
    pub section: SysId,
    /// Element identifier
    pub element: SysId,
    /// Legacy field name
    pub name: String,
    /// Element position
    pub position: i64,
}

impl From<&Element> for AnchorCandidate {
    fn from(e: &Element) -> Self {
        Self {
            section: e.section.clone(),
            element: e.sys_id.clone(),
            name: e.name.clone(),
            position: e.position,
        }
    }
}

/// Anchor preference: lower position first, then lower element identifier
#[must_use]
pub fn anchor_order(a: &AnchorCandidate, b: &AnchorCandidate) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.element.cmp(&b.element))
}

/// Preferred anchor among `candidates`
#[must_use]
pub fn select_anchor(candidates: impl IntoIterator<Item = AnchorCandidate>) -> Option<AnchorCandidate> {
    candidates.into_iter().min_by(anchor_order)
}
