//! Property group: typed storage, change tracking and publish.
//!
//! # Responsibility
//! - Own the properties of one configuration domain, keyed by id.
//! - Record which ids were written since the last publish.
//! - Notify registered change listeners on `apply`.
//!
//! # Invariants
//! - Property ids are unique and non-blank within a group.
//! - `changed_ids` only holds registered ids and is empty after `apply`.
//! - `apply` notifies every live listener, even with an empty change set.
//! - Listener entries are weak; a dropped listener is skipped and pruned.
//! - `apply` holds no interior borrow while a listener runs, so listeners may
//!   read the group back (e.g. through `Rc<RefCell<PropertyGroup>>::borrow`).
//!   Writing to the group from inside a listener is not supported.

use crate::property::listener::{ListenerError, ListenerId, PropertyGroupChangeListener};
use crate::property::value::{Property, PropertyBase};
use log::{debug, warn};
use serde::Serialize;
use std::any::type_name;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::{Rc, Weak};

/// Display name used when a group is created without one.
pub const DEFAULT_GROUP_DISPLAY_NAME: &str = "Unnamed Group";

pub type PropertyGroupResult<T> = Result<T, PropertyGroupError>;

/// Errors raised by property group operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyGroupError {
    InvalidPropertyId(String),
    DuplicateProperty(String),
    PropertyNotFound(String),
    TypeMismatch {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },
    ListenerFailed {
        group_id: String,
        failures: Vec<(ListenerId, ListenerError)>,
    },
}

impl Display for PropertyGroupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPropertyId(id) => write!(f, "property id is invalid: `{id}`"),
            Self::DuplicateProperty(id) => write!(f, "property already exists: {id}"),
            Self::PropertyNotFound(id) => write!(f, "property does not exist: {id}"),
            Self::TypeMismatch {
                id,
                expected,
                actual,
            } => write!(
                f,
                "property `{id}` holds `{expected}`, cannot be accessed as `{actual}`"
            ),
            Self::ListenerFailed { group_id, failures } => write!(
                f,
                "{} change listener(s) failed while applying group {group_id}",
                failures.len()
            ),
        }
    }
}

impl Error for PropertyGroupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ListenerFailed { failures, .. } => failures
                .first()
                .map(|(_, err)| err as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

/// Presentation metadata for one registered property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    pub id: String,
    pub display_name: String,
    pub type_name: &'static str,
}

struct ListenerEntry {
    id: ListenerId,
    listener: Weak<dyn PropertyGroupChangeListener>,
}

impl ListenerEntry {
    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }

    fn points_to<L: PropertyGroupChangeListener + 'static>(&self, listener: &Rc<L>) -> bool {
        // Compare data pointers only; vtable pointers are not guaranteed unique.
        self.listener.as_ptr() as *const () == Rc::as_ptr(listener) as *const ()
    }
}

/// A named collection of properties with its own change listener registry.
pub struct PropertyGroup {
    id: String,
    display_name: String,
    properties: BTreeMap<String, Box<dyn PropertyBase>>,
    changed: RefCell<BTreeSet<String>>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener_id: u64,
}

impl PropertyGroup {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            properties: BTreeMap::new(),
            changed: RefCell::new(BTreeSet::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: 1,
        }
    }

    /// Creates a group labelled with [`DEFAULT_GROUP_DISPLAY_NAME`].
    pub fn unnamed(id: impl Into<String>) -> Self {
        Self::new(id, DEFAULT_GROUP_DISPLAY_NAME)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns registered property ids in sorted order.
    pub fn property_ids(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Returns presentation metadata for every property, sorted by id.
    pub fn descriptors(&self) -> Vec<PropertyDescriptor> {
        self.properties
            .values()
            .map(|property| PropertyDescriptor {
                id: property.id().to_string(),
                display_name: property.display_name().to_string(),
                type_name: property.type_name(),
            })
            .collect()
    }

    /// Registers a typed property.
    ///
    /// The group stores the handle it is given; clones kept by the caller
    /// keep observing the same value cell.
    ///
    /// # Errors
    /// - `InvalidPropertyId` when the id is blank.
    /// - `DuplicateProperty` when the id is already registered.
    pub fn register_property<T: Clone + 'static>(
        &mut self,
        property: Property<T>,
    ) -> PropertyGroupResult<()> {
        self.register_base(Box::new(property))
    }

    /// Registers an already type-erased property.
    pub fn register_base(&mut self, property: Box<dyn PropertyBase>) -> PropertyGroupResult<()> {
        let id = property.id().to_string();
        if id.trim().is_empty() {
            return Err(PropertyGroupError::InvalidPropertyId(id));
        }
        if self.properties.contains_key(id.as_str()) {
            warn!(
                "event=property_register_rejected module=property group={} property={} reason=duplicate",
                self.id, id
            );
            return Err(PropertyGroupError::DuplicateProperty(id));
        }

        debug!(
            "event=property_registered module=property group={} property={} type={}",
            self.id,
            id,
            property.type_name()
        );
        self.properties.insert(id, property);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.properties.contains_key(id)
    }

    pub fn get_base(&self, id: &str) -> Option<&dyn PropertyBase> {
        self.properties.get(id).map(|property| property.as_ref())
    }

    /// Returns an aliasing handle to the stored property.
    ///
    /// Writes through the handle are visible via `get` but are not recorded
    /// as changes; use `set` for tracked writes.
    pub fn get_property<T: Clone + 'static>(&self, id: &str) -> Option<Property<T>> {
        self.get_base(id)?.downcast_ref::<T>().cloned()
    }

    /// Returns the current value when `id` exists and holds a `T`.
    ///
    /// A missing id and a type mismatch both yield `None`.
    pub fn get<T: Clone + 'static>(&self, id: &str) -> Option<T> {
        self.get_base(id)?
            .downcast_ref::<T>()
            .map(|property| property.value())
    }

    /// Overwrites the value of `id` and records it as changed.
    ///
    /// # Errors
    /// - `PropertyNotFound` when no property has this id.
    /// - `TypeMismatch` when the property holds a type other than `T`.
    pub fn set<T: Clone + 'static>(&mut self, id: &str, value: T) -> PropertyGroupResult<()> {
        let Some(base) = self.properties.get(id) else {
            warn!(
                "event=property_set_rejected module=property group={} property={} reason=not_found",
                self.id, id
            );
            return Err(PropertyGroupError::PropertyNotFound(id.to_string()));
        };
        let Some(property) = base.downcast_ref::<T>() else {
            warn!(
                "event=property_set_rejected module=property group={} property={} reason=type_mismatch",
                self.id, id
            );
            return Err(PropertyGroupError::TypeMismatch {
                id: id.to_string(),
                expected: base.type_name(),
                actual: type_name::<T>(),
            });
        };

        property.set_value(value);
        self.changed.get_mut().insert(id.to_string());
        debug!(
            "event=property_set module=property group={} property={}",
            self.id, id
        );
        Ok(())
    }

    /// Snapshot of the ids written since the last `apply`.
    pub fn changed_ids(&self) -> BTreeSet<String> {
        self.changed.borrow().clone()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changed.borrow().is_empty()
    }

    /// Registers a listener. Adding the same listener again is a no-op and
    /// returns its existing id.
    pub fn add_change_listener<L: PropertyGroupChangeListener + 'static>(
        &mut self,
        listener: &Rc<L>,
    ) -> ListenerId {
        let listeners = self.listeners.get_mut();
        if let Some(entry) = listeners.iter().find(|entry| entry.points_to(listener)) {
            return entry.id;
        }

        let id = ListenerId::new(self.next_listener_id);
        self.next_listener_id += 1;
        let weak: Weak<L> = Rc::downgrade(listener);
        let weak: Weak<dyn PropertyGroupChangeListener> = weak;
        listeners.push(ListenerEntry { id, listener: weak });
        debug!(
            "event=listener_added module=property group={} listener={}",
            self.id, id
        );
        id
    }

    /// Removes a listener. Returns false when it was not registered.
    pub fn remove_change_listener<L: PropertyGroupChangeListener + 'static>(
        &mut self,
        listener: &Rc<L>,
    ) -> bool {
        let listeners = self.listeners.get_mut();
        let before = listeners.len();
        listeners.retain(|entry| !entry.points_to(listener));
        before != listeners.len()
    }

    /// Removes the listener registered under `id`.
    pub fn remove_change_listener_by_id(&mut self, id: ListenerId) -> bool {
        let listeners = self.listeners.get_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        before != listeners.len()
    }

    pub fn remove_all_change_listeners(&mut self) {
        self.listeners.get_mut().clear();
    }

    pub fn has_change_listener<L: PropertyGroupChangeListener + 'static>(
        &self,
        listener: &Rc<L>,
    ) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|entry| entry.is_alive() && entry.points_to(listener))
    }

    /// Number of registered listeners that are still alive.
    pub fn change_listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.is_alive())
            .count()
    }

    /// Publishes accumulated changes to every live listener.
    ///
    /// Listeners run in registration order. The change set is cleared even
    /// when a listener fails, and a failing listener does not stop the ones
    /// after it. Both the change set and the listener list are snapshotted
    /// before the first callback, so listeners may read the group.
    ///
    /// # Errors
    /// - `ListenerFailed` carrying every listener failure, in order.
    pub fn apply(&self) -> PropertyGroupResult<()> {
        let changed = self.changed.take();
        let live = self.live_listeners();

        debug!(
            "event=apply module=property group={} changed={} listeners={}",
            self.id,
            changed.len(),
            live.len()
        );

        let mut failures = Vec::new();
        for (listener_id, listener) in live {
            if let Err(err) = listener.apply_properties(&self.id, &changed) {
                warn!(
                    "event=listener_failed module=property group={} listener={} error={}",
                    self.id, listener_id, err
                );
                failures.push((listener_id, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PropertyGroupError::ListenerFailed {
                group_id: self.id.clone(),
                failures,
            })
        }
    }

    /// Prunes dropped listeners and upgrades the rest, in registration order.
    fn live_listeners(&self) -> Vec<(ListenerId, Rc<dyn PropertyGroupChangeListener>)> {
        let mut listeners = self.listeners.borrow_mut();
        let mut live = Vec::with_capacity(listeners.len());
        listeners.retain(|entry| match entry.listener.upgrade() {
            Some(listener) => {
                live.push((entry.id, listener));
                true
            }
            None => {
                warn!(
                    "event=listener_pruned module=property group={} listener={} reason=dropped_without_removal",
                    self.id, entry.id
                );
                false
            }
        });
        live
    }
}

impl Debug for PropertyGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGroup")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("changed", &*self.changed.borrow())
            .field("listeners", &self.change_listener_count())
            .finish()
    }
}
