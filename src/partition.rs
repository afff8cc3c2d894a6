//! Layer partitioning: which objects go through bloom and which are drawn crisp.

use crate::camera::Camera;
use crate::layers::{Layer, Layers};
use crate::scene::{ObjectKind, SceneGraph, VisualObject};

/// Layer mask an object of `kind` receives.
///
/// - the rotating shape and static scenery are `Base`
/// - stars and text are `Bloom`
/// - lights are enabled on every layer so both passes are lit
pub fn layers_for(kind: &ObjectKind) -> Layers {
    match kind {
        ObjectKind::Shape | ObjectKind::Scenery => Layers::only(Layer::Base),
        ObjectKind::Particle | ObjectKind::Text => Layers::only(Layer::Bloom),
        ObjectKind::Light(_) => Layers::ALL,
    }
}

/// Tag a single object. Used for objects added after construction.
pub fn tag(object: &mut VisualObject) {
    object.layers = layers_for(&object.kind);
}

/// Tag every object in the scene and enable `Bloom` on the camera alongside
/// its default layer. Returns the number of objects tagged.
pub fn assign_layers(scene: &mut SceneGraph, camera: &mut Camera) -> usize {
    let mut tagged = 0;
    for (_, object) in scene.iter_mut() {
        tag(object);
        tagged += 1;
    }
    camera.layers.enable(Layer::Bloom);
    log::debug!("partition: tagged {tagged} objects");
    tagged
}
