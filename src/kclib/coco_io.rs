use std::path::Path;

use kpcoco_domain::{
    bboxes_from_keypoints, count_visible, flatten_keypoints, kcerr, to_kc, KcResult, TPtF,
    DEFAULT_BBOX_MARGIN,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    file_util::{self, path_to_str, row_key_to_path},
    image_util::{HeaderShapeReader, ImageShapeReader},
    keypoint_table::{KeypointTable, Schema, SINGLE},
    util::{is_seq_of, JsonKind, SeqKind},
};

pub const SUPERCATEGORY: &str = "animal";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CocoImage {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CocoKeypointCategory {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
    pub keypoints: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CocoKeypointAnnotation {
    pub id: u32,
    pub image_id: u32,
    pub category_id: u32,
    /// `[x0, y0, v0, x1, y1, v1, ...]`
    pub keypoints: Vec<TPtF>,
    pub num_keypoints: u32,
    /// `[x, y, w, h]`
    pub bbox: [TPtF; 4],
    pub area: TPtF,
    pub iscrowd: u8,
}

/// Keypoint annotations in Coco format.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct CocoKeypointData {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoKeypointAnnotation>,
    pub categories: Vec<CocoKeypointCategory>,
}

/// Parameters of a conversion besides the table itself
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionParams {
    pub image_id_offset: u32,
    /// slack around the tight box of the visible keypoints
    pub bbox_margin: TPtF,
}
impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            image_id_offset: 0,
            bbox_margin: DEFAULT_BBOX_MARGIN,
        }
    }
}

fn make_category(table: &KeypointTable, individuals: &[&str]) -> KcResult<CocoKeypointCategory> {
    // all individuals are assumed to be of the same kind and to share the body parts of the first
    let first = individuals
        .first()
        .ok_or_else(|| kcerr!("keypoint table has no columns"))?;
    // for 'single' these are the unique body parts, otherwise the ones every individual has
    let keypoints = table.bodyparts(first);
    Ok(CocoKeypointCategory {
        id: 0,
        name: first.to_string(),
        supercategory: SUPERCATEGORY.to_string(),
        keypoints: keypoints.into_iter().map(|bp| bp.to_string()).collect(),
    })
}

impl CocoKeypointData {
    /// Creates one image per row and one annotation per row and individual. Individuals without
    /// any labeled keypoint get an annotation, too, such that each image has the same number of
    /// annotations. Image file names are the row keys joined to `root`.
    pub fn from_keypoint_table<R>(
        root: &Path,
        table: &KeypointTable,
        params: ConversionParams,
        shape_reader: &R,
    ) -> KcResult<Self>
    where
        R: ImageShapeReader + ?Sized,
    {
        match table.schema() {
            Schema::Single => info!("table without individuals, using '{SINGLE}'"),
            Schema::MultiIndividual => (),
        }
        let individuals = table.individuals();
        let categories = vec![make_category(table, &individuals)?];
        let xy_columns = individuals
            .iter()
            .map(|ind| table.xy_columns(ind))
            .collect::<KcResult<Vec<_>>>()?;

        let duplicates = table.duplicate_keys();
        if !duplicates.is_empty() {
            warn!(
                "{} row keys appear more than once, using the first occurrence of each, e.g., {}",
                duplicates.len(),
                duplicates[0]
            );
        }
        let first_occurrences = table.first_occurrences();

        let mut images = Vec::with_capacity(table.n_rows());
        let mut annotations = Vec::with_capacity(table.n_rows() * individuals.len());
        let mut annotation_id = 0;
        for (image_idx, row_key) in table.index().iter().enumerate() {
            let image_id = u32::try_from(image_idx)
                .ok()
                .and_then(|idx| idx.checked_add(params.image_id_offset))
                .ok_or_else(|| {
                    kcerr!(
                        "image id of row {} with offset {} exceeds {}",
                        image_idx,
                        params.image_id_offset,
                        u32::MAX
                    )
                })?;
            let data_row = first_occurrences[image_idx];
            for xy in &xy_columns {
                let keypoints = table.keypoints_at(data_row, xy);
                let bb = bboxes_from_keypoints(&[&keypoints[..]], params.bbox_margin)[0];
                let (bbox, area) = match bb {
                    Some(bb) => (bb.to_arr(), bb.area()),
                    None => ([0.0; 4], 0.0),
                };
                annotation_id += 1;
                annotations.push(CocoKeypointAnnotation {
                    id: annotation_id,
                    image_id,
                    category_id: 0,
                    keypoints: flatten_keypoints(&keypoints),
                    num_keypoints: count_visible(&keypoints) as u32,
                    bbox,
                    area,
                    iscrowd: 0,
                });
            }
            let image_path = row_key_to_path(root, row_key.segments());
            let shape = shape_reader.read_shape(&image_path)?;
            images.push(CocoImage {
                id: image_id,
                width: shape.w,
                height: shape.h,
                file_name: path_to_str(&image_path)?.to_string(),
            });
        }
        info!(
            "converted {} images with {} annotations of {} individuals",
            images.len(),
            annotations.len(),
            individuals.len()
        );
        Ok(CocoKeypointData {
            images,
            annotations,
            categories,
        })
    }

    pub fn from_keypoint_table_default(
        root: &Path,
        table: &KeypointTable,
        image_id_offset: u32,
    ) -> KcResult<Self> {
        let params = ConversionParams {
            image_id_offset,
            ..ConversionParams::default()
        };
        Self::from_keypoint_table(root, table, params, &HeaderShapeReader)
    }
}

/// Each of the collections needs to be an array of objects.
fn check_coco_structure(value: &Value) -> KcResult<()> {
    for name in ["images", "annotations", "categories"] {
        let collection = value
            .get(name)
            .ok_or_else(|| kcerr!("coco data needs '{}'", name))?;
        if !is_seq_of(collection, JsonKind::Object, Some(SeqKind::Array)) {
            return Err(kcerr!("'{}' needs to be an array of objects", name));
        }
    }
    Ok(())
}

pub fn read_coco(coco_file: &Path) -> KcResult<CocoKeypointData> {
    let s = file_util::read_to_string(coco_file)?;
    let value: Value = serde_json::from_str(&s)
        .map_err(|e| kcerr!("could not parse {:?} as json due to {:?}", coco_file, e))?;
    check_coco_structure(&value)?;
    let data = serde_json::from_value(value).map_err(to_kc)?;
    info!("read coco file {coco_file:?}");
    Ok(data)
}

pub fn write_coco(coco_file: &Path, data: &CocoKeypointData) -> KcResult<()> {
    if let Some(parent) = coco_file.parent() {
        file_util::create_folder(parent)?;
    }
    let data_str = serde_json::to_string_pretty(data).map_err(to_kc)?;
    file_util::write(coco_file, data_str)?;
    info!("exported coco file to {coco_file:?}");
    Ok(())
}

#[cfg(test)]
use {
    crate::keypoint_table::{make_test_table_multi, make_test_table_single, ColumnKey},
    kpcoco_domain::ShapeI,
    std::path::PathBuf,
};

#[cfg(test)]
fn fixed_shape(_: &Path) -> KcResult<ShapeI> {
    Ok(ShapeI::new(640, 480))
}

#[test]
fn test_single_individual() {
    let table = make_test_table_single();
    let data = CocoKeypointData::from_keypoint_table(
        Path::new("/prj"),
        &table,
        ConversionParams::default(),
        &fixed_shape,
    )
    .unwrap();
    assert_eq!(data.images.len(), 1);
    assert_eq!(
        data.images[0],
        CocoImage {
            id: 0,
            width: 640,
            height: 480,
            file_name: "/prj/labeled-data/v1/img0.png".to_string()
        }
    );
    assert_eq!(data.annotations.len(), 1);
    let anno = &data.annotations[0];
    assert_eq!(anno.id, 1);
    assert_eq!(anno.num_keypoints, 1);
    assert_eq!(anno.keypoints, vec![1.0, 2.0, 2.0, 0.0, 0.0, 0.0]);
    assert_eq!(anno.bbox, [-19.0, -18.0, 40.0, 40.0]);
    assert_eq!(anno.area, 1600.0);
    assert_eq!(anno.iscrowd, 0);
    assert_eq!(data.categories.len(), 1);
    assert_eq!(data.categories[0].name, SINGLE);
    assert_eq!(data.categories[0].supercategory, SUPERCATEGORY);
    assert_eq!(data.categories[0].keypoints, vec!["head", "tail"]);
}

#[test]
fn test_multi_individual() {
    let table = make_test_table_multi();
    let params = ConversionParams {
        image_id_offset: 10,
        bbox_margin: 0.0,
    };
    let data =
        CocoKeypointData::from_keypoint_table(Path::new("prj"), &table, params, &fixed_shape)
            .unwrap();
    let n_individuals = 3;
    assert_eq!(data.images.len(), table.n_rows());
    assert_eq!(data.annotations.len(), table.n_rows() * n_individuals);
    let ids = data.annotations.iter().map(|a| a.id).collect::<Vec<_>>();
    assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    let image_ids = data.images.iter().map(|im| im.id).collect::<Vec<_>>();
    assert_eq!(image_ids, vec![10, 11, 12]);
    for (i, anno) in data.annotations.iter().enumerate() {
        assert_eq!(anno.image_id, 10 + (i / n_individuals) as u32);
        assert_eq!(anno.category_id, 0);
    }
    let cat = &data.categories[0];
    assert_eq!(cat.name, "mus1");
    assert_eq!(cat.keypoints, vec!["snout", "tailbase"]);

    // mus1 in the first image
    let anno = &data.annotations[0];
    assert_eq!(anno.bbox, [10.0, 20.0, 20.0, 20.0]);
    assert_eq!(anno.area, 400.0);
    // mus2 in the first image has no keypoints
    let anno = &data.annotations[1];
    assert_eq!(anno.num_keypoints, 0);
    assert_eq!(anno.bbox, [0.0; 4]);
    assert_eq!(anno.area, 0.0);
    assert_eq!(anno.keypoints, vec![0.0; 6]);
    // the unique body part
    let anno = &data.annotations[2];
    assert_eq!(anno.keypoints, vec![5.0, 5.0, 2.0]);
}

#[test]
fn test_duplicate_rows_use_first_occurrence() {
    let table = make_test_table_multi();
    let data = CocoKeypointData::from_keypoint_table(
        Path::new("prj"),
        &table,
        ConversionParams::default(),
        &fixed_shape,
    )
    .unwrap();
    // third row duplicates the key of the first row
    assert_eq!(data.images[2].file_name, data.images[0].file_name);
    assert_ne!(data.images[2].id, data.images[0].id);
    for ind_idx in 0..3 {
        let first = &data.annotations[ind_idx];
        let dup = &data.annotations[6 + ind_idx];
        assert_eq!(first.keypoints, dup.keypoints);
        assert_eq!(first.bbox, dup.bbox);
        assert!(!dup.keypoints.contains(&99.0));
    }
}

#[test]
fn test_deterministic() {
    let table = make_test_table_multi();
    let convert = || {
        CocoKeypointData::from_keypoint_table(
            Path::new("prj"),
            &table,
            ConversionParams::default(),
            &fixed_shape,
        )
        .unwrap()
    };
    assert_eq!(convert(), convert());
}

#[test]
fn test_missing_image_fails() {
    let table = make_test_table_single();
    let res = CocoKeypointData::from_keypoint_table_default(
        Path::new("/this/folder/does/not/exist"),
        &table,
        0,
    );
    assert!(res.is_err());
}

#[test]
fn test_image_id_overflow() {
    let table = make_test_table_multi();
    let convert = |image_id_offset| {
        let params = ConversionParams {
            image_id_offset,
            ..ConversionParams::default()
        };
        CocoKeypointData::from_keypoint_table(Path::new("prj"), &table, params, &fixed_shape)
    };
    assert!(convert(u32::MAX).is_err());
    // the last of the 3 rows still fits
    let data = convert(u32::MAX - 2).unwrap();
    assert_eq!(data.images[2].id, u32::MAX);
}

#[test]
fn test_table_without_rows() {
    let columns = vec![
        ColumnKey::new("me", Some("mus1"), "snout", "x"),
        ColumnKey::new("me", Some("mus1"), "snout", "y"),
    ];
    let table = KeypointTable::new(vec![], columns, vec![]).unwrap();
    let data = CocoKeypointData::from_keypoint_table(
        Path::new("prj"),
        &table,
        ConversionParams::default(),
        &fixed_shape,
    )
    .unwrap();
    assert!(data.images.is_empty());
    assert!(data.annotations.is_empty());
    assert_eq!(data.categories.len(), 1);
    assert_eq!(data.categories[0].name, "mus1");
    assert_eq!(data.categories[0].keypoints, vec!["snout"]);
}

#[test]
fn test_write_read_coco() {
    let table = make_test_table_multi();
    let data = CocoKeypointData::from_keypoint_table(
        Path::new("prj"),
        &table,
        ConversionParams::default(),
        &fixed_shape,
    )
    .unwrap();
    let folder: PathBuf = file_util::DEFAULT_TMPDIR.join("test_write_read_coco");
    crate::defer_folder_removal!(&folder);
    let coco_file = folder.join("sub").join("coco.json");
    write_coco(&coco_file, &data).unwrap();
    let read = read_coco(&coco_file).unwrap();
    assert_eq!(read, data);

    let broken = folder.join("broken.json");
    file_util::write(&broken, r#"{"images": [], "annotations": [1], "categories": []}"#).unwrap();
    assert!(read_coco(&broken).is_err());
    let broken = folder.join("missing.json");
    file_util::write(&broken, r#"{"images": [], "annotations": []}"#).unwrap();
    assert!(read_coco(&broken).is_err());
}
