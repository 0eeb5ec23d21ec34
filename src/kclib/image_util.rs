use std::path::Path;

use kpcoco_domain::{kcerr, KcResult, ShapeI};

/// Anything that can tell the width and height of the image at a path.
pub trait ImageShapeReader {
    fn read_shape(&self, path: &Path) -> KcResult<ShapeI>;
}

/// Reads the shape from the image header without decoding pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderShapeReader;
impl ImageShapeReader for HeaderShapeReader {
    fn read_shape(&self, path: &Path) -> KcResult<ShapeI> {
        read_image_shape(path)
    }
}

impl<F> ImageShapeReader for F
where
    F: Fn(&Path) -> KcResult<ShapeI>,
{
    fn read_shape(&self, path: &Path) -> KcResult<ShapeI> {
        self(path)
    }
}

pub fn read_image_shape(path: &Path) -> KcResult<ShapeI> {
    let (w, h) = image::image_dimensions(path)
        .map_err(|e| kcerr!("could not read shape of image {:?}. {:?}", path, e))?;
    Ok(ShapeI::new(w, h))
}

#[cfg(test)]
use crate::file_util::{self, DEFAULT_TMPDIR};

#[test]
fn test_read_image_shape() {
    let folder = DEFAULT_TMPDIR.join("test_read_image_shape");
    crate::defer_folder_removal!(&folder);
    file_util::create_folder(&folder).unwrap();
    let p = folder.join("im.png");
    image::RgbImage::new(17, 9).save(&p).unwrap();
    assert_eq!(HeaderShapeReader.read_shape(&p).unwrap(), ShapeI::new(17, 9));
    assert!(read_image_shape(&folder.join("missing.png")).is_err());
    let fixed = |_: &Path| -> KcResult<ShapeI> { Ok(ShapeI::new(3, 4)) };
    assert_eq!(fixed.read_shape(&p).unwrap(), ShapeI::new(3, 4));
}
