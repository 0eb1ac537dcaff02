//! The translator configuration surface the optimizer consumes.
//!
//! The surrounding translator owns binding discovery; the optimizer only
//! asks questions through this trait and publishes the accumulated buffer
//! masks once per [`crate::optimize`] invocation. Every query hook returns
//! `Option`: `None` means "unknown", and the asking lowering leaves the
//! node unchanged.

/// Pipeline stage of the shader being translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Compute,
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

/// Read-mostly configuration handle for one translation.
///
/// Binding indices returned by the query hooks must fit the 32-bit use
/// masks, i.e. be below 32.
pub trait TranslatorConfig {
    fn stage(&self) -> ShaderStage;

    /// The storage buffer backing the address base held at the given
    /// constant-buffer slot/offset pair, if the translator knows one.
    fn storage_buffer_binding(&self, slot: u32, offset: u32) -> Option<u32>;

    /// The texture binding resolved from a bindless handle stored at the
    /// given constant-buffer slot/offset pair.
    fn bindless_texture_binding(&self, slot: u32, offset: u32) -> Option<u32>;

    /// The binding-table entry for a texture-array base handle, for
    /// accesses indexed with a uniform array index.
    fn texture_array_binding(&self, base_handle: u32) -> Option<u32>;

    /// Sink for the accumulated `(storage buffer, bindless elimination)`
    /// use masks. Called exactly once per optimize invocation, after the
    /// one-shot lowerings.
    fn set_accessible_buffer_masks(&mut self, sb_mask: u32, ube_mask: u32);
}
