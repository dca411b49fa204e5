//! The scene graph: a tree of objects whose transforms compose from parent to
//! child.
//!
//! Objects live in an arena and refer to their parent and children by key. The
//! scene owns every object; the renderer's shader buckets only hold keys.
use std::{rc::Rc, time::Duration};

use glam::{EulerRot, Mat4, Quat, Vec3};
use slotmap::{new_key_type, SlotMap};
use tracing::warn;

use crate::{
    config::ObjectConfig,
    renderer::{backend::RenderBackend, models::Model, shaders::ShaderProgram, uniforms},
};

new_key_type! {
    /// Handle to an object stored in a `Scene`.
    pub struct ObjectKey;
}

/// Position, orientation and size of an object relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// Build the local matrix `T * R * S`.
    pub fn to_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );

        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// A node in the scene graph. Objects without a model are drawn as nothing but
/// still pass their transform on to their children.
#[derive(Debug)]
pub struct SceneObject {
    name: String,
    shader: String,
    transform: Transform,
    model: Option<Rc<Model>>,
    parent: Option<ObjectKey>,
    children: Vec<ObjectKey>,
    local_matrix: Mat4,
    world_matrix: Mat4,
    /// Total simulated time this object has been updated for.
    age: Duration,
}

impl SceneObject {
    /// Create a new object that is not attached to anything yet.
    pub fn new(name: &str, shader: &str, transform: Transform, model: Option<Rc<Model>>) -> Self {
        Self {
            name: name.to_owned(),
            shader: shader.to_owned(),
            transform,
            model,
            parent: None,
            children: Vec::new(),
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            age: Duration::ZERO,
        }
    }

    /// Create an object from its configuration entry. Dependants are not
    /// created here.
    pub fn from_config(config: &ObjectConfig, model: Option<Rc<Model>>) -> Self {
        let transform = Transform {
            position: config.position,
            rotation: config.rotation,
            scale: config.scale.to_vec3(),
        };

        Self::new(&config.name, &config.shader, transform, model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the shader program this object is drawn with.
    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the object's transform. Matrices are refreshed on the
    /// next `Scene::update`.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn model(&self) -> Option<&Rc<Model>> {
        self.model.as_ref()
    }

    pub fn parent(&self) -> Option<ObjectKey> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectKey] {
        &self.children
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    /// The transform from this object's local space to world space.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn age(&self) -> Duration {
        self.age
    }

    fn update(&mut self, parent_world: Mat4, delta: Duration) {
        self.local_matrix = self.transform.to_matrix();
        self.world_matrix = parent_world * self.local_matrix;
        self.age += delta;
    }

    /// Draw this object's model with `program`, which must already be the
    /// active program. Children are drawn through their own shader buckets.
    pub fn render(&self, backend: &mut dyn RenderBackend, program: &ShaderProgram) {
        program.set_mat4(backend, uniforms::MODEL_MATRIX, self.world_matrix);

        if let Some(model) = &self.model {
            model.draw(backend, program);
        }
    }
}

/// Owns every object in the world and the list of root objects.
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectKey, SceneObject>,
    roots: Vec<ObjectKey>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `object` into the scene. The object is detached until it is added
    /// as a root or as a child of another object.
    pub fn insert(&mut self, object: SceneObject) -> ObjectKey {
        self.objects.insert(object)
    }

    pub fn get(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of objects in the scene, attached or not.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn roots(&self) -> &[ObjectKey] {
        &self.roots
    }

    /// Make `key` a root of the scene. Objects that already have a parent or
    /// are already roots are refused and `false` is returned.
    pub fn add_root(&mut self, key: ObjectKey) -> bool {
        let Some(object) = self.objects.get(key) else {
            warn!("cannot add a missing object as a scene root");
            return false;
        };

        if object.parent.is_some() || self.roots.contains(&key) {
            warn!("object `{}` is already attached to the scene", object.name);
            return false;
        }

        self.roots.push(key);
        true
    }

    /// Attach `child` beneath `parent`. Nothing happens if either object is
    /// missing, and attaching an object that already has a parent, is a root,
    /// or is an ancestor of `parent` is refused. Returns `true` when the child
    /// was attached.
    pub fn add_child(&mut self, parent: ObjectKey, child: ObjectKey) -> bool {
        if !self.objects.contains_key(parent) || !self.objects.contains_key(child) {
            return false;
        }

        if self.objects[child].parent.is_some() || self.roots.contains(&child) {
            warn!(
                "object `{}` is already attached to the scene",
                self.objects[child].name
            );
            return false;
        }

        if self.is_ancestor_or_self(child, parent) {
            warn!(
                "attaching `{}` beneath `{}` would create a cycle",
                self.objects[child].name, self.objects[parent].name
            );
            return false;
        }

        self.objects[child].parent = Some(parent);
        self.objects[parent].children.push(child);
        true
    }

    fn is_ancestor_or_self(&self, ancestor: ObjectKey, mut key: ObjectKey) -> bool {
        loop {
            if key == ancestor {
                return true;
            }

            match self.objects.get(key).and_then(|object| object.parent) {
                Some(parent) => key = parent,
                None => return false,
            }
        }
    }

    /// Refresh the local and world matrices of every attached object and age
    /// them by `delta`. Parents are always visited before their children.
    /// Returns the number of objects visited.
    pub fn update(&mut self, delta: Duration) -> usize {
        let mut visited = 0;
        let mut pending: Vec<(ObjectKey, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|key| (*key, Mat4::IDENTITY))
            .collect();

        while let Some((key, parent_world)) = pending.pop() {
            let Some(object) = self.objects.get_mut(key) else {
                continue;
            };

            object.update(parent_world, delta);
            visited += 1;

            let world = object.world_matrix;
            pending.extend(object.children.iter().rev().map(|child| (*child, world)));
        }

        visited
    }

    /// Remove `key` and everything beneath it from the scene. Returns the keys
    /// that were removed, parents before children.
    pub fn destroy(&mut self, key: ObjectKey) -> Vec<ObjectKey> {
        let Some(parent) = self.objects.get(key).map(|object| object.parent) else {
            return Vec::new();
        };

        match parent {
            Some(parent) => {
                if let Some(parent) = self.objects.get_mut(parent) {
                    parent.children.retain(|child| *child != key);
                }
            }
            None => self.roots.retain(|root| *root != key),
        }

        let mut removed = Vec::new();
        let mut pending = vec![key];

        while let Some(key) = pending.pop() {
            if let Some(object) = self.objects.remove(key) {
                pending.extend(object.children.iter().rev());
                removed.push(key);
            }
        }

        removed
    }

    /// Destroy every root and its descendants. Objects that were never
    /// attached are removed as well.
    pub fn clear(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.destroy(root);
        }

        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1.0e-5;

    fn object(name: &str, position: Vec3) -> SceneObject {
        SceneObject::new(
            name,
            "basic",
            Transform {
                position,
                ..Default::default()
            },
            None,
        )
    }

    #[test]
    fn local_matrix_is_translate_rotate_scale() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::splat(2.0),
        };

        // +X scaled by 2, rotated 90 degrees about +Y to -Z, then translated.
        let point = transform.to_matrix().transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), EPSILON));
    }

    #[test]
    fn children_compose_parent_world_matrix() {
        let mut scene = Scene::new();
        let sun = scene.insert(object("sun", Vec3::new(10.0, 0.0, 0.0)));
        let earth = scene.insert(object("earth", Vec3::new(0.0, 5.0, 0.0)));
        let moon = scene.insert(object("moon", Vec3::new(0.0, 0.0, 1.0)));

        assert!(scene.add_root(sun));
        assert!(scene.add_child(sun, earth));
        assert!(scene.add_child(earth, moon));

        assert_eq!(scene.update(Duration::from_millis(16)), 3);

        let moon_world = scene.get(moon).unwrap().world_matrix();
        assert!(moon_world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(10.0, 5.0, 1.0), EPSILON));
        assert_eq!(
            scene.get(moon).unwrap().local_matrix(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn parent_rotation_carries_children() {
        let mut scene = Scene::new();
        let pivot = scene.insert(SceneObject::new(
            "pivot",
            "basic",
            Transform {
                rotation: Vec3::new(0.0, 0.0, 90.0),
                ..Default::default()
            },
            None,
        ));
        let arm = scene.insert(object("arm", Vec3::new(2.0, 0.0, 0.0)));

        scene.add_root(pivot);
        scene.add_child(pivot, arm);
        scene.update(Duration::ZERO);

        let tip = scene
            .get(arm)
            .unwrap()
            .world_matrix()
            .transform_point3(Vec3::ZERO);
        assert!(tip.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), EPSILON));
    }

    #[test]
    fn update_ages_every_attached_object() {
        let mut scene = Scene::new();
        let root = scene.insert(object("root", Vec3::ZERO));
        let child = scene.insert(object("child", Vec3::ZERO));
        let loose = scene.insert(object("loose", Vec3::ZERO));

        scene.add_root(root);
        scene.add_child(root, child);

        scene.update(Duration::from_millis(10));
        scene.update(Duration::from_millis(15));

        assert_eq!(scene.get(root).unwrap().age(), Duration::from_millis(25));
        assert_eq!(scene.get(child).unwrap().age(), Duration::from_millis(25));
        assert_eq!(scene.get(loose).unwrap().age(), Duration::ZERO);
    }

    #[test]
    fn add_child_with_missing_key_is_a_no_op() {
        let mut scene = Scene::new();
        let root = scene.insert(object("root", Vec3::ZERO));
        let gone = scene.insert(object("gone", Vec3::ZERO));
        scene.destroy(gone);

        assert!(!scene.add_child(root, gone));
        assert!(!scene.add_child(gone, root));
        assert!(scene.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn reparenting_and_cycles_are_refused() {
        let mut scene = Scene::new();
        let a = scene.insert(object("a", Vec3::ZERO));
        let b = scene.insert(object("b", Vec3::ZERO));
        let c = scene.insert(object("c", Vec3::ZERO));

        assert!(scene.add_root(a));
        assert!(scene.add_child(a, b));
        assert!(scene.add_child(b, c));

        assert!(!scene.add_child(a, c), "c already has a parent");
        assert!(!scene.add_child(c, a), "a is a root");
        assert!(!scene.add_child(c, c), "an object cannot parent itself");
        assert!(!scene.add_root(b), "b already has a parent");
        assert!(!scene.add_root(a), "a is already a root");

        assert_eq!(scene.get(a).unwrap().children(), &[b]);
        assert_eq!(scene.update(Duration::ZERO), 3);
    }

    #[test]
    fn ancestor_cannot_become_a_child() {
        let mut scene = Scene::new();
        let a = scene.insert(object("a", Vec3::ZERO));
        let b = scene.insert(object("b", Vec3::ZERO));

        assert!(scene.add_child(a, b));
        assert!(!scene.add_child(b, a));
    }

    #[test]
    fn destroy_removes_whole_subtree() {
        let mut scene = Scene::new();
        let root = scene.insert(object("root", Vec3::ZERO));
        let child = scene.insert(object("child", Vec3::ZERO));
        let grandchild = scene.insert(object("grandchild", Vec3::ZERO));
        let other = scene.insert(object("other", Vec3::ZERO));

        scene.add_root(root);
        scene.add_root(other);
        scene.add_child(root, child);
        scene.add_child(child, grandchild);

        let removed = scene.destroy(root);

        assert_eq!(removed, vec![root, child, grandchild]);
        assert_eq!(scene.roots(), &[other]);
        assert_eq!(scene.len(), 1);
        assert!(!scene.contains(grandchild));
    }

    #[test]
    fn destroy_detaches_from_parent() {
        let mut scene = Scene::new();
        let root = scene.insert(object("root", Vec3::ZERO));
        let child = scene.insert(object("child", Vec3::ZERO));

        scene.add_root(root);
        scene.add_child(root, child);
        scene.destroy(child);

        assert!(scene.get(root).unwrap().children().is_empty());
        assert_eq!(scene.update(Duration::ZERO), 1);
    }

    #[test]
    fn clear_empties_the_scene() {
        let mut scene = Scene::new();
        let root = scene.insert(object("root", Vec3::ZERO));
        let child = scene.insert(object("child", Vec3::ZERO));
        scene.insert(object("detached", Vec3::ZERO));

        scene.add_root(root);
        scene.add_child(root, child);
        scene.clear();

        assert!(scene.is_empty());
        assert!(scene.roots().is_empty());
    }
}
