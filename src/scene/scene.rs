use crate::renderer::context::GpuContext;
use crate::scene::lights::LightsHandle;
use crate::scene::mesh::{Mesh, MeshId};

/// Flat list of meshes plus the three light aggregates shared with the
/// materials that read them.
///
/// Meshes draw in insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,

    pub ambient_light: Option<LightsHandle>,
    pub directional_lights: Option<LightsHandle>,
    pub point_lights: Option<LightsHandle>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ambient_light(mut self, lights: LightsHandle) -> Self {
        self.ambient_light = Some(lights);
        self
    }

    #[must_use]
    pub fn with_directional_lights(mut self, lights: LightsHandle) -> Self {
        self.directional_lights = Some(lights);
        self
    }

    #[must_use]
    pub fn with_point_lights(mut self, lights: LightsHandle) -> Self {
        self.point_lights = Some(lights);
        self
    }

    // ========================================================================
    // Meshes
    // ========================================================================

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        let id = mesh.id();
        self.meshes.push(mesh);
        id
    }

    /// Detaches the mesh without releasing its GPU resources.
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        let index = self.meshes.iter().position(|m| m.id() == id)?;
        Some(self.meshes.remove(index))
    }

    /// Detaches the mesh and disposes it. Returns `false` when `id` is not in
    /// the scene.
    pub fn remove_and_dispose(&mut self, ctx: &GpuContext, id: MeshId) -> bool {
        match self.remove(id) {
            Some(mut mesh) => {
                mesh.dispose(ctx);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    // ========================================================================
    // Frame
    // ========================================================================

    fn light_aggregates(&self) -> impl Iterator<Item = &LightsHandle> {
        [&self.ambient_light, &self.directional_lights, &self.point_lights]
            .into_iter()
            .flatten()
    }

    /// Refreshes and uploads every light aggregate: ambient, directional,
    /// then point.
    pub fn update(&self, ctx: &GpuContext) {
        for lights in self.light_aggregates() {
            let mut lights = lights.borrow_mut();
            lights.update();
            lights.bind(ctx);
        }
    }

    /// Disposes every mesh and light aggregate and empties the scene.
    pub fn dispose(&mut self, ctx: &GpuContext) {
        for mesh in &mut self.meshes {
            mesh.dispose(ctx);
        }
        self.meshes.clear();
        for lights in self.light_aggregates() {
            lights.borrow_mut().dispose(ctx);
        }
        self.ambient_light = None;
        self.directional_lights = None;
        self.point_lights = None;
    }
}
