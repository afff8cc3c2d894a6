// ── Render layers ─────────────────────────────────────────────────────────────
//
// Every visual object carries a layer mask. A render pass only draws objects
// whose mask intersects the camera's mask, which is how the bloom pass and the
// base pass see different subsets of the same scene.

/// The two layers the compositor renders.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Crisp geometry drawn directly, after the depth buffer is cleared.
    Base = 0,
    /// Geometry routed through the bloom post-process chain.
    Bloom = 1,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Base, Layer::Bloom];

    #[inline]
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Bit mask of enabled layers. The default mask has only [`Layer::Base`] set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layers(u32);

impl Default for Layers {
    fn default() -> Self {
        Self(Layer::Base.bit())
    }
}

impl Layers {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    pub const fn only(layer: Layer) -> Self {
        Self(layer.bit())
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Replace the mask so that exactly `layer` is enabled.
    pub fn set(&mut self, layer: Layer) {
        self.0 = layer.bit();
    }

    pub fn enable(&mut self, layer: Layer) {
        self.0 |= layer.bit();
    }

    pub fn disable(&mut self, layer: Layer) {
        self.0 &= !layer.bit();
    }

    pub fn enable_all(&mut self) {
        self.0 = u32::MAX;
    }

    pub fn is_enabled(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    /// True when the two masks share at least one layer.
    pub fn test(self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }

    /// The single enabled layer, or `None` when zero or several are enabled.
    pub fn single(self) -> Option<Layer> {
        Layer::ALL.into_iter().find(|l| self.0 == l.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_is_base_only() {
        assert_eq!(Layers::default().single(), Some(Layer::Base));
    }

    #[test]
    fn set_replaces_enable_accumulates() {
        let mut m = Layers::default();
        m.enable(Layer::Bloom);
        assert!(m.is_enabled(Layer::Base) && m.is_enabled(Layer::Bloom));
        assert_eq!(m.single(), None);
        m.set(Layer::Bloom);
        assert_eq!(m.single(), Some(Layer::Bloom));
    }

    #[test]
    fn all_intersects_everything() {
        assert!(Layers::ALL.test(Layers::only(Layer::Base)));
        assert!(Layers::ALL.test(Layers::only(Layer::Bloom)));
        assert!(!Layers::NONE.test(Layers::ALL));
    }
}
