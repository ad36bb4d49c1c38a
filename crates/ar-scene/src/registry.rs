//! Marker anchor registry.
//!
//! Anchors pair a tracked marker id with host-owned content. The registry
//! owns the anchors; per-frame tracker events overwrite their visibility and
//! transform, and ids nothing was registered for are ignored.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use ar_scene_core::{
    BarcodeId, HitBox, MultiMarkerId, PatternId, SpinState, TrackedId, TrackerEvent,
};
use log::debug;
use nalgebra::{Matrix4, Vector2, Vector3};

/// Scene node following one tracked marker.
///
/// `visible` and `transform` are tracker-owned: they are overwritten on
/// every processed frame and reset to hidden at the start of each one.
/// `content_scale` and the spin state belong to the host.
#[derive(Debug)]
pub struct AnchorNode<C> {
    content: C,
    visible: bool,
    transform: Matrix4<f64>,
    content_scale: Vector3<f64>,
    spin: SpinState,
    hit_box: Option<HitBox>,
}

impl<C> AnchorNode<C> {
    fn new(content: C) -> Self {
        Self {
            content,
            visible: false,
            transform: Matrix4::identity(),
            content_scale: Vector3::new(1.0, 1.0, 1.0),
            spin: SpinState::new(),
            hit_box: None,
        }
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    /// Whether the marker was sighted in the last processed frame.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Marker pose relative to the camera, from the last sighting.
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Scale applied to the content relative to the marker size.
    pub fn content_scale(&self) -> Vector3<f64> {
        self.content_scale
    }

    pub fn set_content_scale(&mut self, scale: Vector3<f64>) {
        self.content_scale = scale;
    }

    pub fn spin(&self) -> &SpinState {
        &self.spin
    }

    pub fn spin_mut(&mut self) -> &mut SpinState {
        &mut self.spin
    }

    /// Screen-space box of the last sighting, before any scale adjustment.
    pub fn hit_box(&self) -> Option<HitBox> {
        self.hit_box
    }

    /// Region a click must land in: the sighting box shrunk to the content
    /// scale on each axis.
    pub fn hit_region(&self) -> Option<HitBox> {
        self.hit_box.map(|hit_box| {
            hit_box.shrunk_by_scale(Vector2::new(self.content_scale.x, self.content_scale.y))
        })
    }
}

/// One member slot of a multi-marker set.
///
/// Slots are created when the set definition finishes loading; the host can
/// attach content to any of them afterwards.
#[derive(Debug)]
pub struct SubNode<C> {
    content: Option<C>,
    visible: bool,
    transform: Matrix4<f64>,
}

impl<C> SubNode<C> {
    fn new() -> Self {
        Self {
            content: None,
            visible: false,
            transform: Matrix4::identity(),
        }
    }

    pub fn content(&self) -> Option<&C> {
        self.content.as_ref()
    }

    pub fn set_content(&mut self, content: C) {
        self.content = Some(content);
    }

    /// Whether this member was individually sighted in the last frame.
    /// Members extrapolated from the set pose stay hidden.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }
}

/// Anchor for a multi-marker set: a root node that follows the set pose plus
/// one slot per member.
#[derive(Debug)]
pub struct MultiAnchor<C> {
    node: AnchorNode<C>,
    subs: Vec<SubNode<C>>,
}

impl<C> MultiAnchor<C> {
    fn new(content: C, sub_count: usize) -> Self {
        Self {
            node: AnchorNode::new(content),
            subs: (0..sub_count).map(|_| SubNode::new()).collect(),
        }
    }

    pub fn node(&self) -> &AnchorNode<C> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut AnchorNode<C> {
        &mut self.node
    }

    pub fn subs(&self) -> &[SubNode<C>] {
        &self.subs
    }

    pub fn sub_mut(&mut self, index: usize) -> Option<&mut SubNode<C>> {
        self.subs.get_mut(index)
    }
}

/// Registry of anchors keyed by tracked marker id.
#[derive(Debug, Default)]
pub struct MarkerRegistry<C> {
    singles: BTreeMap<TrackedId, AnchorNode<C>>,
    multis: BTreeMap<MultiMarkerId, MultiAnchor<C>>,
}

impl<C> MarkerRegistry<C> {
    pub fn new() -> Self {
        Self {
            singles: BTreeMap::new(),
            multis: BTreeMap::new(),
        }
    }

    /// Register content for a trained pattern marker. Registering the same
    /// id again replaces the previous anchor.
    pub fn add_pattern_anchor(&mut self, id: PatternId, content: C) -> &mut AnchorNode<C> {
        self.add_single(TrackedId::Pattern(id), content)
    }

    /// Register content for a barcode marker. Registering the same value
    /// again replaces the previous anchor.
    pub fn add_barcode_anchor(&mut self, id: BarcodeId, content: C) -> &mut AnchorNode<C> {
        self.add_single(TrackedId::Barcode(id), content)
    }

    fn add_single(&mut self, id: TrackedId, content: C) -> &mut AnchorNode<C> {
        match self.singles.entry(id) {
            Entry::Occupied(mut slot) => {
                debug!("replaced anchor for {id:?}");
                slot.insert(AnchorNode::new(content));
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(AnchorNode::new(content)),
        }
    }

    /// Register content for a multi-marker set with `sub_count` member
    /// slots. Registering the same id again replaces the previous anchor.
    pub fn add_multi_anchor(
        &mut self,
        id: MultiMarkerId,
        sub_count: usize,
        content: C,
    ) -> &mut MultiAnchor<C> {
        match self.multis.entry(id) {
            Entry::Occupied(mut slot) => {
                debug!("replaced multi-marker anchor for {id:?}");
                slot.insert(MultiAnchor::new(content, sub_count));
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(MultiAnchor::new(content, sub_count)),
        }
    }

    pub fn single(&self, id: TrackedId) -> Option<&AnchorNode<C>> {
        self.singles.get(&id)
    }

    pub fn single_mut(&mut self, id: TrackedId) -> Option<&mut AnchorNode<C>> {
        self.singles.get_mut(&id)
    }

    pub fn multi(&self, id: MultiMarkerId) -> Option<&MultiAnchor<C>> {
        self.multis.get(&id)
    }

    pub fn multi_mut(&mut self, id: MultiMarkerId) -> Option<&mut MultiAnchor<C>> {
        self.multis.get_mut(&id)
    }

    /// All single-marker anchors in id order.
    pub fn singles(&self) -> impl Iterator<Item = (TrackedId, &AnchorNode<C>)> {
        self.singles.iter().map(|(id, anchor)| (*id, anchor))
    }

    /// All multi-marker anchors in id order.
    pub fn multis(&self) -> impl Iterator<Item = (MultiMarkerId, &MultiAnchor<C>)> {
        self.multis.iter().map(|(id, anchor)| (*id, anchor))
    }

    /// Hide every anchor. Called at the start of each processed frame so
    /// that only markers sighted in that frame come back visible.
    pub fn reset_visibility(&mut self) {
        for anchor in self.singles.values_mut() {
            anchor.visible = false;
        }
        for multi in self.multis.values_mut() {
            multi.node.visible = false;
            for sub in &mut multi.subs {
                sub.visible = false;
            }
        }
    }

    /// Apply one sighting event to the anchor it names. Events for ids or
    /// member indices nothing was registered for are ignored, as are load
    /// lifecycle events.
    pub fn apply(&mut self, event: &TrackerEvent) {
        match event {
            TrackerEvent::Marker(update) => {
                if let Some(anchor) = self.singles.get_mut(&update.id) {
                    anchor.visible = true;
                    anchor.transform = update.pose;
                    anchor.hit_box = Some(HitBox::from_vertices(&update.vertices));
                }
            }
            TrackerEvent::MultiMarker(update) => {
                if let Some(multi) = self.multis.get_mut(&update.id) {
                    multi.node.visible = true;
                    multi.node.transform = update.pose;
                }
            }
            TrackerEvent::MultiMarkerSub(update) => {
                if let Some(sub) = self
                    .multis
                    .get_mut(&update.set)
                    .and_then(|multi| multi.subs.get_mut(update.index))
                {
                    sub.visible = update.status.is_visible();
                    sub.transform = update.pose;
                }
            }
            _ => {}
        }
    }

    /// Advance every anchor's spin animation by one frame.
    pub fn step_spins(&mut self) {
        for anchor in self.singles.values_mut() {
            anchor.spin.step();
        }
        for multi in self.multis.values_mut() {
            multi.node.spin.step();
        }
    }
}
