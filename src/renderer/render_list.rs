use std::collections::HashMap;

use crate::scene::ObjectKey;

/// Objects grouped by the shader program they are drawn with.
///
/// Buckets are visited in the order their shader was first seen and objects
/// within a bucket keep the order they were added in, so a program is bound
/// once per frame no matter how many objects use it.
#[derive(Debug, Default)]
pub struct RenderList {
    buckets: Vec<ShaderBucket>,
    bucket_index: HashMap<String, usize>,
}

#[derive(Debug)]
struct ShaderBucket {
    shader: String,
    objects: Vec<ObjectKey>,
}

impl RenderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `object` to the bucket for `shader`, creating the bucket if this
    /// is the first object drawn with that shader.
    pub fn push(&mut self, shader: &str, object: ObjectKey) {
        let index = match self.bucket_index.get(shader) {
            Some(index) => *index,
            None => {
                self.buckets.push(ShaderBucket {
                    shader: shader.to_owned(),
                    objects: Vec::new(),
                });
                self.bucket_index
                    .insert(shader.to_owned(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        self.buckets[index].objects.push(object);
    }

    /// Get the objects drawn with `shader`.
    pub fn bucket(&self, shader: &str) -> Option<&[ObjectKey]> {
        self.bucket_index
            .get(shader)
            .map(|index| self.buckets[*index].objects.as_slice())
    }

    /// Iterate over `(shader, objects)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ObjectKey])> {
        self.buckets
            .iter()
            .map(|bucket| (bucket.shader.as_str(), bucket.objects.as_slice()))
    }

    /// Remove `object` from whichever bucket holds it. Empty buckets are kept
    /// so shader order stays stable.
    pub fn remove(&mut self, object: ObjectKey) {
        for bucket in &mut self.buckets {
            bucket.objects.retain(|key| *key != object);
        }
    }

    /// Number of shader buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of objects across every bucket.
    pub fn object_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.objects.len()).sum()
    }
}
