//! Typed property cells and their type-erased view.
//!
//! # Responsibility
//! - Hold one named, typed value behind a shared cell.
//! - Let differently typed properties live in one container.
//!
//! # Invariants
//! - Cloning a `Property<T>` aliases the value cell; `detached()` does not.
//! - Narrowing a `dyn PropertyBase` back to `Property<T>` checks the concrete
//!   type through `Any`, never the self-reported `value_type`, and yields
//!   `None` on mismatch.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Type-erased property contract used for heterogeneous storage.
pub trait PropertyBase {
    /// Stable id, unique within the owning group.
    fn id(&self) -> &str;

    /// Presentation-only label.
    fn display_name(&self) -> &str;

    /// Runtime descriptor of the stored value type.
    fn value_type(&self) -> TypeId;

    /// Human-readable name of the stored value type, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// The concrete property as `Any`, used for checked narrowing.
    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn PropertyBase + 'a {
    /// Returns true when the concrete property is `Property<T>`.
    ///
    /// Foreign `PropertyBase` impls never match, whatever `value_type` they
    /// report.
    pub fn is_of_type<T: 'static>(&self) -> bool {
        self.as_any().is::<Property<T>>()
    }

    /// Checked narrowing to the concrete property.
    pub fn downcast_ref<T: Clone + 'static>(&self) -> Option<&Property<T>> {
        self.as_any().downcast_ref::<Property<T>>()
    }
}

impl Debug for dyn PropertyBase + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBase")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .finish()
    }
}

/// A named property holding a value of type `T`.
///
/// Clones share one value cell, so a handle kept by a consumer observes
/// writes made through the group it was registered into.
pub struct Property<T> {
    id: String,
    display_name: String,
    value: Rc<RefCell<T>>,
}

impl<T: Clone + 'static> Property<T> {
    /// Creates a property with a fresh value cell holding `value`.
    pub fn new(id: impl Into<String>, value: T, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// Copies id, display name and current value into a fresh cell.
    pub fn detached(&self) -> Self {
        Self::new(self.id.clone(), self.value(), self.display_name.clone())
    }

    /// Stable id, unique within the owning group.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Presentation-only label.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns a copy of the current value.
    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    /// Overwrites the shared cell. Every alias sees the new value.
    pub fn set_value(&self, value: T) {
        *self.value.borrow_mut() = value;
    }

    /// Returns true when both handles point at the same value cell.
    pub fn shares_cell_with(&self, other: &Property<T>) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

// Manual Clone: shares the same Rc without requiring `T: Clone` on the cell.
impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            value: Rc::clone(&self.value),
        }
    }
}

impl<T: Debug> Debug for Property<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

impl<T: Clone + 'static> PropertyBase for Property<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
