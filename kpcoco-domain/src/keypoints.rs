use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BbF, PtF, TPtF};

/// Visibility flag of the COCO keypoint convention.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    NotLabeled,
    LabeledOccluded,
    Visible,
}
impl Visibility {
    pub fn to_num(self) -> u8 {
        match self {
            Visibility::NotLabeled => 0,
            Visibility::LabeledOccluded => 1,
            Visibility::Visible => 2,
        }
    }
}

/// A named body part position. Missing coordinates are `NaN`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Keypoint {
    pub pos: PtF,
    pub visibility: Visibility,
}
impl Keypoint {
    /// Labeled keypoints need both coordinates, a half-labeled point counts as not labeled.
    pub fn from_coords(x: TPtF, y: TPtF) -> Self {
        let pos = PtF { x, y };
        let visibility = if x.is_nan() || y.is_nan() {
            Visibility::NotLabeled
        } else {
            Visibility::Visible
        };
        Self { pos, visibility }
    }
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
    /// `[x, y, v]` with missing coordinates replaced by 0
    pub fn to_coco_triple(&self) -> [TPtF; 3] {
        let nan_to_zero = |v: TPtF| if v.is_nan() { 0.0 } else { v };
        [
            nan_to_zero(self.pos.x),
            nan_to_zero(self.pos.y),
            TPtF::from(self.visibility.to_num()),
        ]
    }
}

pub fn count_visible(keypoints: &[Keypoint]) -> usize {
    keypoints.iter().filter(|kp| kp.is_visible()).count()
}

/// Flattens keypoints into the `[x0, y0, v0, x1, y1, v1, ...]` layout of COCO.
pub fn flatten_keypoints(keypoints: &[Keypoint]) -> Vec<TPtF> {
    keypoints
        .iter()
        .flat_map(|kp| kp.to_coco_triple())
        .collect()
}

/// Computes one box per individual that encloses all its visible keypoints, grown by `slack` on
/// each side. Individuals without any visible keypoint have no box.
pub fn bboxes_from_keypoints<K>(keypoints_per_individual: &[K], slack: TPtF) -> Vec<Option<BbF>>
where
    K: AsRef<[Keypoint]>,
{
    keypoints_per_individual
        .iter()
        .enumerate()
        .map(|(idx, kps)| {
            let visible = kps
                .as_ref()
                .iter()
                .filter(|kp| kp.is_visible())
                .map(|kp| kp.pos);
            let bb = BbF::from_points_iter(visible)
                .ok()
                .map(|bb| bb.expand_slack(slack));
            if bb.is_none() {
                debug!("individual {idx} has no visible keypoints, no box");
            }
            bb
        })
        .collect()
}

#[test]
fn test_keypoint_visibility() {
    let kp = Keypoint::from_coords(1.0, 2.0);
    assert!(kp.is_visible());
    assert_eq!(kp.to_coco_triple(), [1.0, 2.0, 2.0]);
    let kp = Keypoint::from_coords(f64::NAN, 2.0);
    assert!(!kp.is_visible());
    assert_eq!(kp.to_coco_triple(), [0.0, 2.0, 0.0]);
    let kps = [
        Keypoint::from_coords(1.0, 2.0),
        Keypoint::from_coords(f64::NAN, f64::NAN),
    ];
    assert_eq!(count_visible(&kps), 1);
    assert_eq!(flatten_keypoints(&kps), vec![1.0, 2.0, 2.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_bboxes_from_keypoints() {
    let ind_1 = vec![
        Keypoint::from_coords(10.0, 5.0),
        Keypoint::from_coords(f64::NAN, f64::NAN),
        Keypoint::from_coords(30.0, 50.0),
        // not fully labeled, hence ignored
        Keypoint::from_coords(1000.0, f64::NAN),
    ];
    let ind_2 = vec![Keypoint::from_coords(f64::NAN, f64::NAN)];
    let bbs = bboxes_from_keypoints(&[ind_1, ind_2], 20.0);
    assert_eq!(bbs.len(), 2);
    assert_eq!(bbs[0], Some(BbF::from_arr(&[-10.0, -15.0, 60.0, 85.0])));
    assert_eq!(bbs[1], None);

    let bbs = bboxes_from_keypoints(&[[Keypoint::from_coords(1.0, 2.0)]], 0.0);
    assert_eq!(bbs[0], Some(BbF::from_arr(&[1.0, 2.0, 0.0, 0.0])));
}
