//! Mesh
//!
//! A [`Mesh`] binds one [`Geometry`] to a (possibly shared) [`Material`]
//! and runs the per-frame draw protocol:
//!
//! 1. skip when invisible or when the material program never linked
//! 2. refresh the model and model-view matrices
//! 3. bind the program
//! 4. enable face culling when configured
//! 5. instanced path only: enable blending when configured
//! 6. upload the per-draw uniforms
//! 7. bind the vertex layout (VAO, or every attribute by hand)
//! 8. issue the indexed or non-indexed draw call
//! 9. unbind the VAO and reset the toggled state
//!
//! [`Material`]: crate::resources::material::Material

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::renderer::backend::Capability;
use crate::renderer::context::GpuContext;
use crate::renderer::vao::Vao;
use crate::resources::geometry::Geometry;
use crate::resources::material::{Material, SharedMaterial};
use crate::scene::camera::Camera;
use crate::scene::raycaster::BoundingSphere;
use crate::scene::transform::Transform;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a mesh inside a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    pub name: String,
    pub transform: Transform,
    pub visible: bool,

    geometry: Geometry,
    material: SharedMaterial,
    vao: Vao,

    instance_count: i32,
    is_instanced: bool,

    model_matrix: Mat4,
    model_view_matrix: Mat4,
    bounding_sphere: Option<BoundingSphere>,
    disposed: bool,
}

impl Mesh {
    /// Creates the material program if no other mesh did yet, then records
    /// the vertex layout into a VAO.
    pub fn new(ctx: &GpuContext, geometry: Geometry, material: SharedMaterial) -> Result<Self> {
        {
            let mut mat = material.borrow_mut();
            if !mat.is_created() {
                mat.create(ctx, &geometry)?;
            }
        }

        let mesh = Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            name: "Mesh".to_string(),
            transform: Transform::new(),
            visible: true,
            geometry,
            material,
            vao: Vao::new(ctx),
            instance_count: 0,
            is_instanced: false,
            model_matrix: Mat4::IDENTITY,
            model_view_matrix: Mat4::IDENTITY,
            bounding_sphere: None,
            disposed: false,
        };

        {
            let mut material = mesh.material.borrow_mut();
            mesh.vao.bind(ctx);
            mesh.bind_attributes(ctx, &mut material);
            mesh.bind_attributes_instanced(ctx, &mut material);
            mesh.bind_index_buffer(ctx);
            mesh.vao.unbind(ctx);
        }

        Ok(mesh)
    }

    // ========================================================================
    // Vertex layout
    // ========================================================================

    fn bind_attributes(&self, ctx: &GpuContext, material: &mut Material) {
        let gl = ctx.gl();
        for (name, attribute) in self.geometry.attributes() {
            if !attribute.is_shader_attribute() {
                continue;
            }
            let program = material.program_mut();
            program.set_attribute_location(ctx, name);
            attribute.bind(ctx);
            if let Some(location) = program.attribute_location(name) {
                gl.vertex_attrib_pointer(location, attribute.item_size(), 0, 0);
            }
        }
    }

    fn bind_attributes_instanced(&self, ctx: &GpuContext, material: &mut Material) {
        let gl = ctx.gl();
        for (name, attribute) in self.geometry.instanced_attributes() {
            let program = material.program_mut();
            program.set_attribute_location(ctx, name);
            attribute.bind(ctx);
            if let Some(location) = program.attribute_location(name) {
                gl.vertex_attrib_pointer(location, attribute.item_size(), 0, 0);
                gl.vertex_attrib_divisor(location, 1);
            }
        }
    }

    fn bind_index_buffer(&self, ctx: &GpuContext) {
        if let Some(index) = self.geometry.index_buffer() {
            index.bind(ctx);
        }
    }

    fn bind_vertex_layout(&self, ctx: &GpuContext, material: &mut Material) {
        if self.vao.is_supported() {
            self.vao.bind(ctx);
        } else {
            self.bind_attributes(ctx, material);
            self.bind_attributes_instanced(ctx, material);
            self.bind_index_buffer(ctx);
        }
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Refreshes the model matrix from the transform and the model-view
    /// matrix from `camera`.
    pub fn update_matrix(&mut self, camera: &Camera) {
        self.transform.update_matrix();
        self.model_matrix = self.transform.matrix();
        self.model_view_matrix = camera.world_inverse_matrix() * self.model_matrix;
    }

    /// Non-instanced draw. Never touches the blend state.
    pub fn draw(&mut self, ctx: &GpuContext, camera: &Camera) {
        if !self.visible || self.disposed {
            return;
        }
        let material = Rc::clone(&self.material);
        let mut material = material.borrow_mut();
        if !material.is_created() {
            return;
        }

        self.update_matrix(camera);
        let gl = ctx.gl();

        material.program().bind(ctx);

        let cull_face = material.culling().face();
        if let Some(face) = cull_face {
            gl.enable(Capability::CullFace);
            gl.cull_face(face);
        }

        material.set_uniforms(
            ctx,
            camera.projection_matrix(),
            self.model_view_matrix,
            self.model_matrix,
            Some(camera.position),
        );

        self.bind_vertex_layout(ctx, &mut material);

        let mode = material.draw_mode();
        match self.geometry.index_buffer() {
            Some(index) => gl.draw_elements(mode, index.num_items(), 0),
            None => gl.draw_arrays(mode, 0, self.geometry.vertex_count()),
        }

        self.vao.unbind(ctx);

        if cull_face.is_some() {
            gl.disable(Capability::CullFace);
        }
    }

    /// Instanced draw of [`instance_count`](Self::instance_count) copies.
    pub fn draw_instanced(&mut self, ctx: &GpuContext, camera: &Camera) {
        if !self.visible || self.disposed {
            return;
        }
        let material = Rc::clone(&self.material);
        let mut material = material.borrow_mut();
        if !material.is_created() {
            return;
        }
        if !ctx.extensions().has_instanced_arrays() {
            log::warn!("Instanced drawing is not supported by this context, skipping {}", self.name);
            return;
        }

        self.update_matrix(camera);
        let gl = ctx.gl();

        material.program().bind(ctx);
        material.set_uniforms(
            ctx,
            camera.projection_matrix(),
            self.model_view_matrix,
            self.model_matrix,
            Some(camera.position),
        );

        let cull_face = material.culling().face();
        if let Some(face) = cull_face {
            gl.enable(Capability::CullFace);
            gl.cull_face(face);
        }

        let blending = material.blending();
        if blending {
            let (src, dst) = material.blend_function();
            gl.enable(Capability::Blend);
            gl.blend_func(src, dst);
        }

        self.bind_vertex_layout(ctx, &mut material);

        let mode = material.draw_mode();
        match self.geometry.index_buffer() {
            Some(index) => {
                gl.draw_elements_instanced(mode, index.num_items(), 0, self.instance_count);
            }
            None => gl.draw_arrays_instanced(
                mode,
                0,
                self.geometry.vertex_count(),
                self.instance_count,
            ),
        }

        self.vao.unbind(ctx);

        if cull_face.is_some() {
            gl.disable(Capability::CullFace);
        }
        if blending {
            gl.disable(Capability::Blend);
        }
    }

    /// Switches the mesh to instanced drawing.
    pub fn set_instance_count(&mut self, count: i32) {
        self.instance_count = count;
        self.is_instanced = true;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> MeshId {
        self.id
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    #[must_use]
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    #[inline]
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        self.is_instanced
    }

    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> i32 {
        self.instance_count
    }

    /// Model matrix as of the last draw or [`update_matrix`](Self::update_matrix).
    #[inline]
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    #[inline]
    #[must_use]
    pub fn model_view_matrix(&self) -> Mat4 {
        self.model_view_matrix
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Local-space sphere around the origin enclosing every vertex.
    pub fn compute_bounding_sphere(&mut self) -> BoundingSphere {
        let sphere = BoundingSphere::new(Vec3::ZERO, self.geometry.bounding_radius());
        self.bounding_sphere = Some(sphere);
        sphere
    }

    /// Cached sphere, computed on first use.
    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
            .unwrap_or_else(|| BoundingSphere::new(Vec3::ZERO, self.geometry.bounding_radius()))
    }

    /// Releases the geometry buffers, the VAO and, unless another mesh still
    /// shares it, the material program.
    pub fn dispose(&mut self, ctx: &GpuContext) {
        if self.disposed {
            return;
        }
        if Rc::strong_count(&self.material) == 1 {
            self.material.borrow_mut().dispose(ctx);
        }
        self.geometry.dispose(ctx);
        self.vao.dispose(ctx);
        self.visible = false;
        self.disposed = true;
    }
}
