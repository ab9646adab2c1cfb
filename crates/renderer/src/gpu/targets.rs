use winit::dpi::PhysicalSize;

/// Format the accumulation passes blend in. Weighted sums of many 8-bit
/// frames need fractional precision and headroom, so the pair uses half
/// floats.
pub(crate) const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Source of an accumulation pass: nothing folded yet, or one of the two
/// pair slots holding the running sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccumSource {
    Empty,
    Slot(usize),
}

impl AccumSource {
    /// Destination slot for a pass reading from this source: slot 0 when
    /// nothing is accumulated yet, otherwise the other member of the pair.
    /// A pass never writes the slot it reads.
    pub(crate) fn destination(self) -> usize {
        match self {
            AccumSource::Empty => 0,
            AccumSource::Slot(index) => 1 - index,
        }
    }
}

/// Two equally sized colour targets the accumulation passes bounce between.
pub(crate) struct RenderTargetPair {
    views: [wgpu::TextureView; 2],
}

impl RenderTargetPair {
    pub(crate) fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        Self {
            views: [create_slot(device, size, 0), create_slot(device, size, 1)],
        }
    }

    pub(crate) fn view(&self, slot: usize) -> &wgpu::TextureView {
        &self.views[slot]
    }
}

fn create_slot(device: &wgpu::Device, size: PhysicalSize<u32>, index: usize) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("accumulation target {index}")),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ACCUMULATION_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_never_matches_source_slot() {
        assert_eq!(AccumSource::Empty.destination(), 0);
        assert_eq!(AccumSource::Slot(0).destination(), 1);
        assert_eq!(AccumSource::Slot(1).destination(), 0);
    }
}
