pub mod cfg;
pub mod coco_io;
pub mod file_util;
pub mod image_util;
pub mod keypoint_table;
pub mod result;
pub mod seed;
pub mod split;
pub mod tracing_setup;
pub mod util;
pub use coco_io::{
    read_coco, write_coco, CocoImage, CocoKeypointAnnotation, CocoKeypointCategory,
    CocoKeypointData, ConversionParams,
};
pub use file_util::{create_folder, get_test_folder};
pub use image_util::{HeaderShapeReader, ImageShapeReader};
pub use keypoint_table::{ColumnKey, KeypointTable, RowKey, Schema, SINGLE};
pub use seed::SeedCfg;
pub use split::split_train_test;
pub use util::{is_seq_of, JsonKind, SeqKind};
