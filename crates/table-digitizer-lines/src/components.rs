use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use table_digitizer_core::GrayImage;

/// Axis-aligned bounding box of one 8-connected foreground component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub area: u32,
}

impl ComponentBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Bounding boxes of the non-zero components of `mask`, ordered by label.
pub fn component_boxes(mask: &GrayImage) -> Vec<ComponentBox> {
    let img = mask.to_luma8();
    let labels = connected_components(&img, Connectivity::Eight, Luma([0u8]));

    let mut boxes: Vec<Option<ComponentBox>> = Vec::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        if boxes.len() < label {
            boxes.resize(label, None);
        }
        let b = boxes[label - 1].get_or_insert(ComponentBox {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        });
        b.min_x = b.min_x.min(x);
        b.min_y = b.min_y.min(y);
        b.max_x = b.max_x.max(x);
        b.max_y = b.max_y.max(y);
        b.area += 1;
    }
    boxes.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pixels_join_under_eight_connectivity() {
        let mut m = GrayImage::new(6, 6);
        m.set(1, 1, 255);
        m.set(2, 2, 255);
        m.set(5, 0, 255);
        let boxes = component_boxes(&m);
        assert_eq!(boxes.len(), 2);
        let big = boxes.iter().find(|b| b.area == 2).expect("pair");
        assert_eq!((big.min_x, big.min_y, big.width(), big.height()), (1, 1, 2, 2));
    }
}
