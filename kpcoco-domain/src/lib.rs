mod bb;
mod core;
mod keypoints;
pub mod result;
pub use bb::{BbF, BB};
pub use core::{Calc, CoordinateBox, Point, PtF, Shape, ShapeI, TPtF, TPtI};
pub use keypoints::{
    bboxes_from_keypoints, count_visible, flatten_keypoints, Keypoint, Visibility,
};
pub use result::{to_kc, KcError, KcResult};

/// Margin added on each side of the tight box around the visible keypoints of an individual
pub const DEFAULT_BBOX_MARGIN: TPtF = 20.0;

pub fn make_test_keypoints() -> Vec<Vec<Keypoint>> {
    vec![
        vec![
            Keypoint::from_coords(1.0, 2.0),
            Keypoint::from_coords(f64::NAN, f64::NAN),
        ],
        vec![
            Keypoint::from_coords(f64::NAN, f64::NAN),
            Keypoint::from_coords(f64::NAN, f64::NAN),
        ],
    ]
}

#[test]
fn test_default_margin() {
    let kps = make_test_keypoints();
    let bbs = bboxes_from_keypoints(&kps, DEFAULT_BBOX_MARGIN);
    let bb = bbs[0].unwrap();
    assert_eq!(bb.to_arr(), [-19.0, -18.0, 40.0, 40.0]);
    assert_eq!(bb.area(), 1600.0);
    assert!(bbs[1].is_none());
    assert_eq!(count_visible(&kps[1]), 0);
}
