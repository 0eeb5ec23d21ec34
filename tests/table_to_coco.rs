use std::path::{Path, PathBuf};

use kclib::{
    defer_folder_removal, file_util::DEFAULT_TMPDIR, get_test_folder, read_coco,
    tracing_setup::init_tracing_for_tests, write_coco, CocoKeypointData, ConversionParams,
    HeaderShapeReader, KeypointTable, SINGLE,
};

fn make_images(root: &Path, names: &[&str], w: u32, h: u32) {
    for name in names {
        let p = root.join(name);
        kclib::create_folder(p.parent().unwrap()).unwrap();
        image::RgbImage::new(w, h).save(&p).unwrap();
    }
}

fn convert(root: &Path, csv_name: &str, offset: u32) -> CocoKeypointData {
    let table = KeypointTable::from_csv_path(&get_test_folder().join(csv_name)).unwrap();
    CocoKeypointData::from_keypoint_table_default(root, &table, offset).unwrap()
}

#[test]
fn test_single_csv() {
    init_tracing_for_tests();
    let root: PathBuf = DEFAULT_TMPDIR.join("it_single_csv");
    defer_folder_removal!(&root);
    make_images(
        &root,
        &["labeled-data/v2/frame000.png", "labeled-data/v2/frame001.png"],
        64,
        48,
    );
    let data = convert(&root, "CollectedData_single.csv", 0);

    assert_eq!(data.images.len(), 3);
    assert_eq!(data.annotations.len(), 3);
    assert!(data.images.iter().all(|im| im.width == 64 && im.height == 48));
    assert!(data.images[0].file_name.ends_with("labeled-data/v2/frame000.png"));
    assert_eq!(data.categories.len(), 1);
    assert_eq!(data.categories[0].name, SINGLE);
    assert_eq!(data.categories[0].keypoints, vec!["head", "neck", "tail"]);

    let first = &data.annotations[0];
    assert_eq!(first.num_keypoints, 2);
    assert_eq!(
        first.keypoints,
        vec![1.0, 2.0, 2.0, 0.0, 0.0, 0.0, 5.5, 6.5, 2.0]
    );
    assert_eq!(first.bbox, [-19.0, -18.0, 44.5, 44.5]);
    // duplicated key resolves to the first row
    assert_eq!(data.annotations[2].keypoints, first.keypoints);
    assert_eq!(data.annotations[2].image_id, 2);
}

#[test]
fn test_multi_csv_with_offset() {
    init_tracing_for_tests();
    let root: PathBuf = DEFAULT_TMPDIR.join("it_multi_csv");
    defer_folder_removal!(&root);
    make_images(
        &root,
        &[
            "labeled-data/v1/img0.png",
            "labeled-data/v1/img1.png",
            "labeled-data/v1/img2.png",
        ],
        32,
        32,
    );
    let data = convert(&root, "CollectedData_multi.csv", 5);
    assert_eq!(data.images.len(), 3);
    assert_eq!(data.annotations.len(), 9);
    assert_eq!(
        data.images.iter().map(|im| im.id).collect::<Vec<_>>(),
        vec![5, 6, 7]
    );
    assert_eq!(
        data.annotations.iter().map(|a| a.id).collect::<Vec<_>>(),
        (1..=9).collect::<Vec<_>>()
    );
    assert_eq!(data.categories[0].name, "mus1");
    assert_eq!(data.categories[0].keypoints, vec!["snout", "tailbase"]);
    // nothing labeled in the last image
    for anno in &data.annotations[6..] {
        assert_eq!(anno.num_keypoints, 0);
        assert_eq!(anno.bbox, [0.0; 4]);
        assert_eq!(anno.area, 0.0);
        assert!(anno.keypoints.iter().all(|v| *v == 0.0));
    }

    let coco_file = root.join("annotations").join("coco.json");
    write_coco(&coco_file, &data).unwrap();
    assert_eq!(read_coco(&coco_file).unwrap(), data);
}

#[test]
fn test_json_field_names() {
    let table =
        KeypointTable::from_csv_path(&get_test_folder().join("CollectedData_multi.csv")).unwrap();
    let shape = |_: &Path| -> kpcoco_domain::KcResult<kpcoco_domain::ShapeI> {
        Ok(kpcoco_domain::ShapeI::new(2, 1))
    };
    let data = CocoKeypointData::from_keypoint_table(
        Path::new("prj"),
        &table,
        ConversionParams::default(),
        &shape,
    )
    .unwrap();
    let value = serde_json::to_value(&data).unwrap();
    let image = &value["images"][0];
    for key in ["file_name", "width", "height", "id"] {
        assert!(image.get(key).is_some(), "image misses {key}");
    }
    let anno = &value["annotations"][0];
    for key in [
        "image_id",
        "id",
        "category_id",
        "keypoints",
        "num_keypoints",
        "bbox",
        "area",
        "iscrowd",
    ] {
        assert!(anno.get(key).is_some(), "annotation misses {key}");
    }
    let cat = &value["categories"][0];
    for key in ["id", "name", "supercategory", "keypoints"] {
        assert!(cat.get(key).is_some(), "category misses {key}");
    }
}

#[test]
fn test_missing_images_abort() {
    let root = DEFAULT_TMPDIR.join("it_missing_images");
    let table =
        KeypointTable::from_csv_path(&get_test_folder().join("CollectedData_multi.csv")).unwrap();
    let res = CocoKeypointData::from_keypoint_table(
        &root,
        &table,
        ConversionParams::default(),
        &HeaderShapeReader,
    );
    assert!(res.is_err());
}
