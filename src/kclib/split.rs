use std::collections::HashSet;

use kpcoco_domain::{kcerr, KcResult};
use rand::seq::SliceRandom;
use tracing::info;

use crate::{coco_io::CocoKeypointData, seed::SeedCfg};

fn subset(data: &CocoKeypointData, image_ids: &HashSet<u32>) -> CocoKeypointData {
    CocoKeypointData {
        images: data
            .images
            .iter()
            .filter(|im| image_ids.contains(&im.id))
            .cloned()
            .collect(),
        annotations: data
            .annotations
            .iter()
            .filter(|anno| image_ids.contains(&anno.image_id))
            .cloned()
            .collect(),
        categories: data.categories.clone(),
    }
}

/// Randomly assigns `round(n_images * train_fraction)` images to the training set and the rest
/// to the test set. Annotations go wherever their image goes. Images keep their relative order.
pub fn split_train_test(
    data: &CocoKeypointData,
    train_fraction: f64,
    seed_cfg: &SeedCfg,
) -> KcResult<(CocoKeypointData, CocoKeypointData)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(kcerr!(
            "train fraction needs to be in [0, 1], got {}",
            train_fraction
        ));
    }
    let mut image_ids = data.images.iter().map(|im| im.id).collect::<Vec<_>>();
    let mut rng = seed_cfg.make_rng();
    image_ids.shuffle(&mut rng);
    let n_train = (image_ids.len() as f64 * train_fraction).round() as usize;
    let train_ids = image_ids[..n_train].iter().copied().collect::<HashSet<_>>();
    let test_ids = image_ids[n_train..].iter().copied().collect::<HashSet<_>>();
    let train = subset(data, &train_ids);
    let test = subset(data, &test_ids);
    info!(
        "split {} images into {} for training and {} for testing",
        data.images.len(),
        train.images.len(),
        test.images.len()
    );
    Ok((train, test))
}

#[cfg(test)]
use {
    crate::coco_io::{CocoImage, CocoKeypointAnnotation},
    kpcoco_domain::TPtF,
};

#[cfg(test)]
fn make_test_data(n_images: u32) -> CocoKeypointData {
    let images = (0..n_images)
        .map(|id| CocoImage {
            id,
            width: 10,
            height: 10,
            file_name: format!("im{id}.png"),
        })
        .collect();
    let annotations = (0..n_images * 2)
        .map(|i| CocoKeypointAnnotation {
            id: i + 1,
            image_id: i / 2,
            category_id: 0,
            keypoints: vec![i as TPtF, 0.0, 2.0],
            num_keypoints: 1,
            bbox: [0.0; 4],
            area: 0.0,
            iscrowd: 0,
        })
        .collect();
    CocoKeypointData {
        images,
        annotations,
        categories: vec![],
    }
}

#[test]
fn test_split_reproducible() {
    let data = make_test_data(20);
    let seed_cfg = SeedCfg::new(1);
    let (train, test) = split_train_test(&data, 0.8, &seed_cfg).unwrap();
    assert_eq!(train.images.len(), 16);
    assert_eq!(test.images.len(), 4);
    assert_eq!(train.annotations.len(), 32);
    assert_eq!(test.annotations.len(), 8);
    for anno in &test.annotations {
        assert!(test.images.iter().any(|im| im.id == anno.image_id));
    }
    let (train2, test2) = split_train_test(&data, 0.8, &seed_cfg).unwrap();
    assert_eq!(train, train2);
    assert_eq!(test, test2);
}

#[test]
fn test_split_edge_cases() {
    let data = make_test_data(5);
    let (train, test) = split_train_test(&data, 1.0, &SeedCfg::default()).unwrap();
    assert_eq!(train, data);
    assert!(test.images.is_empty() && test.annotations.is_empty());
    let (train, _) = split_train_test(&data, 0.0, &SeedCfg::default()).unwrap();
    assert!(train.images.is_empty());
    assert!(split_train_test(&data, 1.5, &SeedCfg::default()).is_err());
    let (train, test) = split_train_test(&make_test_data(0), 0.5, &SeedCfg::default()).unwrap();
    assert!(train.images.is_empty() && test.images.is_empty());
}
