use serde::{Deserialize, Serialize};

use super::{
    core::{max_from_partial, min_from_partial, CoordinateBox, Max, Min},
    Calc, Point, TPtF,
};
use crate::{kcerr, result::KcResult};

pub type BbF = BB<TPtF>;

/// Axis aligned box given by its top-left corner, width and height.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BB<T> {
    pub x: T,
    pub y: T,
    pub w: T,
    pub h: T,
}

impl<T> BB<T>
where
    T: Calc + CoordinateBox,
{
    /// `[x, y, w, h]`
    pub fn from_arr(a: &[T; 4]) -> Self {
        BB {
            x: a[0],
            y: a[1],
            w: a[2],
            h: a[3],
        }
    }

    /// `[x, y, w, h]`
    pub fn to_arr(&self) -> [T; 4] {
        [self.x, self.y, self.w, self.h]
    }

    /// Tight box around all points, `NaN` coordinates are skipped by the comparators
    pub fn from_points_iter(points: impl Iterator<Item = Point<T>> + Clone) -> KcResult<Self> {
        let x_iter = points.clone().map(|p| p.x);
        let y_iter = points.map(|p| p.y);
        let min_x = x_iter
            .clone()
            .min_by(min_from_partial)
            .ok_or_else(|| kcerr!("empty iterator"))?;
        let min_y = y_iter
            .clone()
            .min_by(min_from_partial)
            .ok_or_else(|| kcerr!("empty iterator"))?;
        let max_x = x_iter
            .max_by(max_from_partial)
            .ok_or_else(|| kcerr!("empty iterator"))?;
        let max_y = y_iter
            .max_by(max_from_partial)
            .ok_or_else(|| kcerr!("empty iterator"))?;
        Ok(BB::from_points(
            Point { x: min_x, y: min_y },
            Point { x: max_x, y: max_y },
        ))
    }

    pub fn area(&self) -> T {
        self.w * self.h
    }

    pub fn from_points(p1: Point<T>, p2: Point<T>) -> Self {
        let x_min = p1.x.min(p2.x);
        let y_min = p1.y.min(p2.y);
        let x_max = p1.x.max(p2.x);
        let y_max = p1.y.max(p2.y);
        Self {
            x: x_min,
            y: y_min,
            w: x_max - x_min + T::size_addon(),
            h: y_max - y_min + T::size_addon(),
        }
    }
}

impl BbF {
    /// Grows the box by `slack` on each of the four sides. Negative coordinates are kept, the
    /// box is not clipped to any image.
    pub fn expand_slack(&self, slack: TPtF) -> Self {
        Self {
            x: self.x - slack,
            y: self.y - slack,
            w: self.w + 2.0 * slack,
            h: self.h + 2.0 * slack,
        }
    }
}

#[test]
fn test_from_points() {
    let pts: Vec<Point<TPtF>> = vec![(1.0, 2.0).into(), (4.0, -1.0).into(), (2.0, 7.0).into()];
    let bb = BbF::from_points_iter(pts.iter().copied()).unwrap();
    assert_eq!(bb, BbF::from_arr(&[1.0, -1.0, 3.0, 8.0]));
    assert_eq!(bb.area(), 24.0);
    assert!(BbF::from_points_iter(std::iter::empty()).is_err());
    let bb = BbF::from_points((5.0, 3.0).into(), (2.0, 3.0).into());
    assert_eq!(bb.to_arr(), [2.0, 3.0, 3.0, 0.0]);
}

#[test]
fn test_expand_slack() {
    let bb = BbF::from_arr(&[1.0, 2.0, 0.0, 0.0]).expand_slack(20.0);
    assert_eq!(bb.to_arr(), [-19.0, -18.0, 40.0, 40.0]);
    assert_eq!(bb.area(), 1600.0);
}
