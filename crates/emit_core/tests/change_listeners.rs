use emit_core::{
    ListenerError, Property, PropertyGroup, PropertyGroupChangeListener, PropertyGroupError,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

type Journal = Rc<RefCell<Vec<String>>>;

/// Records every callback, tagged with its own name in a shared journal.
struct RecordingListener {
    name: &'static str,
    journal: Journal,
    calls: RefCell<Vec<(String, BTreeSet<String>)>>,
}

impl RecordingListener {
    fn new(name: &'static str, journal: &Journal) -> Rc<Self> {
        Rc::new(Self {
            name,
            journal: Rc::clone(journal),
            calls: RefCell::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, BTreeSet<String>)> {
        self.calls.borrow().clone()
    }
}

impl PropertyGroupChangeListener for RecordingListener {
    fn apply_properties(
        &self,
        group_id: &str,
        changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError> {
        self.journal
            .borrow_mut()
            .push(format!("{}:{group_id}", self.name));
        self.calls
            .borrow_mut()
            .push((group_id.to_string(), changed_ids.clone()));
        Ok(())
    }
}

struct FailingListener;

impl PropertyGroupChangeListener for FailingListener {
    fn apply_properties(
        &self,
        group_id: &str,
        _changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError> {
        Err(ListenerError::new(format!("cannot react to {group_id}")))
    }
}

/// Keeps an aliasing handle and reads the fresh value on publish.
struct HeightMirror {
    height: Property<f32>,
    seen: RefCell<Vec<f32>>,
}

impl PropertyGroupChangeListener for HeightMirror {
    fn apply_properties(
        &self,
        _group_id: &str,
        changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError> {
        if changed_ids.contains(self.height.id()) {
            self.seen.borrow_mut().push(self.height.value());
        }
        Ok(())
    }
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn water_surface() -> PropertyGroup {
    let mut group = PropertyGroup::new("triton", "Water Surface");
    group
        .register_property(Property::new("height", 0.0_f32, "Ocean Height (m)"))
        .expect("register height");
    group
        .register_property(Property::new("waves", 1_u32, "Wave Count"))
        .expect("register waves");
    group
        .register_property(Property::new("foam", false, "Foam"))
        .expect("register foam");
    group
}

#[test]
fn triton_height_scenario() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = PropertyGroup::new("triton", "Water Surface");
    group
        .register_property(Property::new("height", 0.0_f32, "Ocean Height (m)"))
        .expect("register height");
    group.add_change_listener(&listener);

    group.set("height", 11.0_f32).expect("set height");
    group.apply().expect("apply");

    assert_eq!(listener.calls(), vec![("triton".to_string(), ids(&["height"]))]);
    assert_eq!(group.get::<f32>("height"), Some(11.0));
}

#[test]
fn apply_delivers_exactly_the_changed_ids() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = water_surface();
    group.add_change_listener(&listener);

    group.set("height", 2.0_f32).expect("set height");
    group.set("foam", true).expect("set foam");
    group.set("height", 3.0_f32).expect("set height again");
    group.apply().expect("apply");

    assert_eq!(
        listener.calls(),
        vec![("triton".to_string(), ids(&["foam", "height"]))]
    );
    assert!(group.changed_ids().is_empty());
}

#[test]
fn apply_without_changes_still_notifies_with_empty_set() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = water_surface();
    group.add_change_listener(&listener);

    group.set("waves", 4_u32).expect("set waves");
    group.apply().expect("first apply");
    group.apply().expect("second apply");

    let calls = listener.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, ids(&["waves"]));
    assert!(calls[1].1.is_empty());
}

#[test]
fn failed_set_is_not_reported_as_changed() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = water_surface();
    group.add_change_listener(&listener);

    assert!(group.set("waves", 1.5_f32).is_err());
    assert!(group.set("missing", 1_u32).is_err());
    group.apply().expect("apply");

    assert_eq!(listener.calls(), vec![("triton".to_string(), BTreeSet::new())]);
}

#[test]
fn adding_a_listener_twice_notifies_once() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = water_surface();

    group.add_change_listener(&listener);
    group.add_change_listener(&listener);
    assert_eq!(group.change_listener_count(), 1);

    group.apply().expect("apply");
    assert_eq!(listener.calls().len(), 1);
}

#[test]
fn listeners_run_in_registration_order() {
    let journal = Journal::default();
    let first = RecordingListener::new("first", &journal);
    let second = RecordingListener::new("second", &journal);
    let third = RecordingListener::new("third", &journal);
    let mut group = water_surface();

    group.add_change_listener(&second);
    group.add_change_listener(&first);
    group.add_change_listener(&third);
    group.apply().expect("apply");

    assert_eq!(
        *journal.borrow(),
        vec![
            "second:triton".to_string(),
            "first:triton".to_string(),
            "third:triton".to_string(),
        ]
    );
}

#[test]
fn removed_listener_is_not_notified() {
    let journal = Journal::default();
    let kept = RecordingListener::new("kept", &journal);
    let removed = RecordingListener::new("removed", &journal);
    let mut group = water_surface();
    group.add_change_listener(&kept);
    group.add_change_listener(&removed);

    assert!(group.remove_change_listener(&removed));
    assert!(!group.remove_change_listener(&removed));
    assert!(!group.has_change_listener(&removed));
    assert!(group.has_change_listener(&kept));

    group.apply().expect("apply");
    assert_eq!(kept.calls().len(), 1);
    assert!(removed.calls().is_empty());
}

#[test]
fn remove_all_leaves_no_listeners() {
    let journal = Journal::default();
    let first = RecordingListener::new("first", &journal);
    let second = RecordingListener::new("second", &journal);
    let mut group = water_surface();
    group.add_change_listener(&first);
    group.add_change_listener(&second);

    group.remove_all_change_listeners();

    assert_eq!(group.change_listener_count(), 0);
    group.apply().expect("apply without listeners");
    assert!(journal.borrow().is_empty());
}

#[test]
fn dropping_a_group_releases_registrations_without_notifying() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut water = water_surface();
    let mut sky = PropertyGroup::new("silverlining", "Sky");
    water.add_change_listener(&listener);
    sky.add_change_listener(&listener);
    water.set("foam", true).expect("set foam");
    assert_eq!(Rc::weak_count(&listener), 2);

    drop(water);

    assert_eq!(Rc::weak_count(&listener), 1);
    assert!(sky.has_change_listener(&listener));
    assert!(listener.calls().is_empty());

    drop(sky);
    assert_eq!(Rc::weak_count(&listener), 0);
}

#[test]
fn remove_all_releases_registrations() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut group = water_surface();
    group.add_change_listener(&listener);
    assert_eq!(Rc::weak_count(&listener), 1);

    group.remove_all_change_listeners();

    assert_eq!(Rc::weak_count(&listener), 0);
}

#[test]
fn dropped_listener_is_skipped_and_pruned() {
    let journal = Journal::default();
    let survivor = RecordingListener::new("survivor", &journal);
    let dropped = RecordingListener::new("dropped", &journal);
    let mut group = water_surface();
    group.add_change_listener(&dropped);
    group.add_change_listener(&survivor);

    drop(dropped);
    assert_eq!(group.change_listener_count(), 1);

    group.apply().expect("apply");
    assert_eq!(*journal.borrow(), vec!["survivor:triton".to_string()]);
}

#[test]
fn one_listener_serves_several_groups() {
    let journal = Journal::default();
    let listener = RecordingListener::new("renderer", &journal);
    let mut water = water_surface();
    let mut sky = PropertyGroup::new("silverlining", "Sky");
    sky.register_property(Property::new("brightness", 0.0_f32, "Sky Brightness"))
        .expect("register brightness");
    water.add_change_listener(&listener);
    sky.add_change_listener(&listener);

    sky.set("brightness", 0.8_f32).expect("set brightness");
    water.apply().expect("apply water");
    sky.apply().expect("apply sky");

    assert_eq!(
        listener.calls(),
        vec![
            ("triton".to_string(), BTreeSet::new()),
            ("silverlining".to_string(), ids(&["brightness"])),
        ]
    );
}

#[test]
fn failing_listener_does_not_block_the_rest() {
    let journal = Journal::default();
    let failing = Rc::new(FailingListener);
    let after = RecordingListener::new("after", &journal);
    let mut group = water_surface();
    let failing_id = group.add_change_listener(&failing);
    group.add_change_listener(&after);

    group.set("height", 1.0_f32).expect("set height");
    let err = group.apply().expect_err("failing listener must surface");

    match err {
        PropertyGroupError::ListenerFailed { group_id, failures } => {
            assert_eq!(group_id, "triton");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, failing_id);
            assert_eq!(failures[0].1.message(), "cannot react to triton");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(after.calls(), vec![("triton".to_string(), ids(&["height"]))]);
    assert!(!group.has_pending_changes());
}

#[test]
fn listener_reads_value_through_shared_cell() {
    let height = Property::new("height", 0.0_f32, "Ocean Height (m)");
    let mirror = Rc::new(HeightMirror {
        height: height.clone(),
        seen: RefCell::new(Vec::new()),
    });
    let mut group = PropertyGroup::new("triton", "Water Surface");
    group.register_property(height).expect("register height");
    group.add_change_listener(&mirror);

    group.set("height", 11.0_f32).expect("set height");
    group.apply().expect("apply");
    group.apply().expect("empty apply");

    assert_eq!(*mirror.seen.borrow(), vec![11.0]);
}

/// Reads fresh values back from its group by id while the group publishes.
struct GroupReader {
    group: Rc<RefCell<PropertyGroup>>,
    seen: RefCell<Vec<(String, Option<f32>)>>,
}

impl PropertyGroupChangeListener for GroupReader {
    fn apply_properties(
        &self,
        _group_id: &str,
        changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError> {
        let group = self.group.borrow();
        for id in changed_ids {
            self.seen
                .borrow_mut()
                .push((id.clone(), group.get::<f32>(id)));
        }
        assert!(!group.has_pending_changes());
        assert_eq!(group.change_listener_count(), 1);
        Ok(())
    }
}

#[test]
fn listener_reads_group_back_by_id_during_apply() {
    let group = Rc::new(RefCell::new(PropertyGroup::new("triton", "Water Surface")));
    group
        .borrow_mut()
        .register_property(Property::new("height", 0.0_f32, "Ocean Height (m)"))
        .expect("register height");
    let reader = Rc::new(GroupReader {
        group: Rc::clone(&group),
        seen: RefCell::new(Vec::new()),
    });
    group.borrow_mut().add_change_listener(&reader);

    group
        .borrow_mut()
        .set("height", 11.0_f32)
        .expect("set height");
    group.borrow().apply().expect("apply");

    assert_eq!(
        *reader.seen.borrow(),
        vec![("height".to_string(), Some(11.0))]
    );
}
