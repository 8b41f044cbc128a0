//! Debug image of the last rendered frame.

use std::path::Path;

use image::{ImageResult, Rgb, RgbImage};

use super::raster::Raster;

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Files whose presence marks a container runtime.
const CONTAINER_MARKERS: &[&str] = &["/.dockerenv", "/run/.containerenv"];

/// Whether the process runs inside a Docker or Podman container.
pub fn running_in_container() -> bool {
    CONTAINER_MARKERS.iter().any(|p| Path::new(p).exists())
}

/// Convert the raster to RGB. Chromatic ink wins over black.
pub fn to_image(raster: &Raster) -> RgbImage {
    RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        if raster.chromatic.pixel(x, y) {
            RED
        } else if raster.black.pixel(x, y) {
            BLACK
        } else {
            PAPER
        }
    })
}

/// Write the raster as a PNG to `path`.
pub fn write_png(raster: &Raster, path: &Path) -> ImageResult<()> {
    to_image(raster).save_with_format(path, image::ImageFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::raster::Ink;

    #[test]
    fn test_to_image_colors() {
        let mut raster = Raster::new(4, 2);
        raster.plane_mut(Ink::Black).set_pixel(0, 0, true);
        raster.plane_mut(Ink::Black).set_pixel(1, 0, true);
        raster.plane_mut(Ink::Chromatic).set_pixel(1, 0, true);

        let image = to_image(&raster);
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(*image.get_pixel(0, 0), BLACK);
        assert_eq!(*image.get_pixel(1, 0), RED);
        assert_eq!(*image.get_pixel(3, 1), PAPER);
    }

    #[test]
    fn test_write_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epaper.png");

        let mut raster = Raster::new(264, 176);
        raster.plane_mut(Ink::Black).set_pixel(10, 10, true);
        write_png(&raster, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (264, 176));
        assert_eq!(*decoded.get_pixel(10, 10), BLACK);
        assert_eq!(*decoded.get_pixel(11, 10), PAPER);
    }
}
